use actix_service::{Service, Transform};
use actix_web::{
    Error, FromRequest, HttpMessage, HttpRequest, HttpResponse,
    body::EitherBody,
    dev::{Payload, ServiceRequest, ServiceResponse},
    http::{StatusCode, header::AUTHORIZATION},
};
use futures_util::future::{LocalBoxFuture, Ready, ready};
use std::rc::Rc;
use subtle::ConstantTimeEq;
use tracing::{debug, info, trace};

use crate::api::services::response::{ErrorCode, error_response};

/// Authenticated owner of the current request, set by [`ApiAuth`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnerId(pub String);

impl FromRequest for OwnerId {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(
            req.extensions()
                .get::<OwnerId>()
                .cloned()
                .ok_or_else(|| actix_web::error::ErrorUnauthorized("owner not authenticated")),
        )
    }
}

/// Owner API authentication middleware
///
/// Requires `Authorization: Bearer <api.token>` and a non-empty owner header.
/// An empty configured token hides the whole API behind 404.
#[derive(Clone)]
pub struct ApiAuth {
    token: Rc<String>,
    owner_header: Rc<String>,
}

impl ApiAuth {
    pub fn new(token: impl Into<String>, owner_header: impl Into<String>) -> Self {
        Self {
            token: Rc::new(token.into()),
            owner_header: Rc::new(owner_header.into()),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for ApiAuth
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = ApiAuthMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(ApiAuthMiddleware {
            service: Rc::new(service),
            token: self.token.clone(),
            owner_header: self.owner_header.clone(),
        }))
    }
}

pub struct ApiAuthMiddleware<S> {
    service: Rc<S>,
    token: Rc<String>,
    owner_header: Rc<String>,
}

impl<S, B> ApiAuthMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    fn handle_missing_token(req: ServiceRequest) -> ServiceResponse<EitherBody<B>> {
        debug!("API token not configured - returning 404");
        req.into_response(
            error_response(StatusCode::NOT_FOUND, ErrorCode::NotFound, "Not Found")
                .map_into_right_body(),
        )
    }

    fn handle_unauthorized(req: ServiceRequest) -> ServiceResponse<EitherBody<B>> {
        info!("API authentication failed - invalid or missing token");
        req.into_response(
            error_response(
                StatusCode::UNAUTHORIZED,
                ErrorCode::Unauthorized,
                "Unauthorized: Invalid or missing token",
            )
            .map_into_right_body(),
        )
    }

    fn handle_missing_owner(req: ServiceRequest, header: &str) -> ServiceResponse<EitherBody<B>> {
        info!("API request without owner header");
        req.into_response(
            error_response(
                StatusCode::BAD_REQUEST,
                ErrorCode::MissingOwner,
                &format!("Missing {} header", header),
            )
            .map_into_right_body(),
        )
    }

    /// 从 Authorization header 提取 Bearer token
    fn extract_bearer_token(req: &ServiceRequest) -> Option<&str> {
        req.headers()
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .and_then(|s| s.strip_prefix("Bearer "))
            .map(str::trim)
    }

    /// 常量时间比较，避免时序侧信道
    fn token_matches(supplied: &str, expected: &str) -> bool {
        supplied.as_bytes().ct_eq(expected.as_bytes()).into()
    }

    fn extract_owner(req: &ServiceRequest, header: &str) -> Option<String> {
        req.headers()
            .get(header)
            .and_then(|h| h.to_str().ok())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    }
}

impl<S, B> Service<ServiceRequest> for ApiAuthMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(
        &self,
        ctx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.service.poll_ready(ctx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let srv = self.service.clone();
        let token = self.token.clone();
        let owner_header = self.owner_header.clone();

        Box::pin(async move {
            if token.is_empty() {
                return Ok(Self::handle_missing_token(req));
            }

            let authorized = Self::extract_bearer_token(&req)
                .is_some_and(|supplied| Self::token_matches(supplied, &token));
            if !authorized {
                return Ok(Self::handle_unauthorized(req));
            }

            let Some(owner) = Self::extract_owner(&req, &owner_header) else {
                return Ok(Self::handle_missing_owner(req, &owner_header));
            };

            trace!("API authentication successful for owner {}", owner);
            req.extensions_mut().insert(OwnerId(owner));
            let response = srv.call(req).await?.map_into_left_body();
            Ok(response)
        })
    }
}

use actix_web::http::{Method, StatusCode};
use actix_web::{HttpRequest, HttpResponse, Responder, web};
use chrono::SecondsFormat;
use serde::Deserialize;
use tracing::trace;

use super::pages::OutcomePages;
use crate::resolver::{
    AccessKind, ExternalSignal, RequestHeaders, RequestMetadata, TokenResolver,
};

/// Header carrying a visitor-supplied link password
pub const PASSWORD_HEADER: &str = "x-link-password";

#[derive(Debug, Default, Deserialize)]
struct PasswordQuery {
    pw: Option<String>,
}

pub struct RedirectService;

impl RedirectService {
    pub async fn handle_redirect(
        req: HttpRequest,
        path: web::Path<String>,
        resolver: web::Data<TokenResolver>,
        pages: web::Data<OutcomePages>,
    ) -> impl Responder {
        let token = path.into_inner();
        let request = Self::request_metadata(&req);

        let outcome = resolver.resolve(&token, &request).await;
        trace!("Resolution of {} -> {:?}", token, outcome);

        Self::respond(outcome.external(), &pages)
    }

    fn request_metadata(req: &HttpRequest) -> RequestMetadata {
        let mut metadata = RequestMetadata::from_headers(RequestHeaders::from(req.headers()));
        metadata.is_head = req.method() == Method::HEAD;

        // header 优先，其次是 ?pw= 查询参数
        let from_header = req
            .headers()
            .get(PASSWORD_HEADER)
            .and_then(|h| h.to_str().ok())
            .map(str::to_string);
        let password = from_header.or_else(|| {
            web::Query::<PasswordQuery>::from_query(req.query_string())
                .ok()
                .and_then(|q| q.into_inner().pw)
        });

        match password.filter(|p| !p.is_empty()) {
            Some(password) => metadata.with_password(password),
            None => metadata,
        }
    }

    fn respond(signal: ExternalSignal, pages: &OutcomePages) -> HttpResponse {
        match signal {
            ExternalSignal::Redirect {
                target_url,
                kind: AccessKind::Real,
            } => Self::redirect(StatusCode::TEMPORARY_REDIRECT, &target_url),
            ExternalSignal::Redirect {
                target_url,
                kind: AccessKind::Speculative,
            } => Self::redirect(StatusCode::FOUND, &target_url),
            ExternalSignal::Blocked => {
                Self::redirect(StatusCode::TEMPORARY_REDIRECT, &pages.blocked)
            }
            ExternalSignal::NotYetAvailable { reveal_at } => {
                let location = match reveal_at {
                    Some(at) => format!(
                        "{}?until={}",
                        pages.pending,
                        urlencoding::encode(&at.to_rfc3339_opts(SecondsFormat::Secs, true))
                    ),
                    None => pages.pending.clone(),
                };
                Self::redirect(StatusCode::TEMPORARY_REDIRECT, &location)
            }
        }
    }

    #[inline]
    fn redirect(status: StatusCode, location: &str) -> HttpResponse {
        HttpResponse::build(status)
            .insert_header(("Location", location))
            .insert_header(("Cache-Control", "no-store"))
            .finish()
    }
}

/// Resolution routes, mounted under the configured prefix
pub fn redirect_routes(prefix: &str) -> actix_web::Scope {
    web::scope(prefix).service(
        web::resource("/{token}")
            .route(web::get().to(RedirectService::handle_redirect))
            .route(web::head().to(RedirectService::handle_redirect)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn pages() -> OutcomePages {
        OutcomePages {
            blocked: "/expired".to_string(),
            pending: "/not-yet-available".to_string(),
        }
    }

    fn location(resp: &HttpResponse) -> &str {
        resp.headers()
            .get("Location")
            .and_then(|h| h.to_str().ok())
            .unwrap_or_default()
    }

    #[test]
    fn test_real_and_speculative_statuses() {
        let real = RedirectService::respond(
            ExternalSignal::Redirect {
                target_url: "https://example.com".to_string(),
                kind: AccessKind::Real,
            },
            &pages(),
        );
        assert_eq!(real.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(location(&real), "https://example.com");

        let speculative = RedirectService::respond(
            ExternalSignal::Redirect {
                target_url: "https://example.com".to_string(),
                kind: AccessKind::Speculative,
            },
            &pages(),
        );
        assert_eq!(speculative.status(), StatusCode::FOUND);
    }

    #[test]
    fn test_pending_carries_encoded_reveal_time() {
        let reveal_at = Utc.with_ymd_and_hms(2026, 3, 1, 13, 0, 0).unwrap();
        let resp = RedirectService::respond(
            ExternalSignal::NotYetAvailable {
                reveal_at: Some(reveal_at),
            },
            &pages(),
        );
        assert_eq!(
            location(&resp),
            "/not-yet-available?until=2026-03-01T13%3A00%3A00Z"
        );
        assert_eq!(
            resp.headers().get("Cache-Control").unwrap(),
            "no-store"
        );
    }

    #[test]
    fn test_blocked_goes_to_blocked_page() {
        let resp = RedirectService::respond(ExternalSignal::Blocked, &pages());
        assert_eq!(resp.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(location(&resp), "/expired");
    }
}

//! Owner API: `/api/v1/links`

use actix_web::http::StatusCode;
use actix_web::{Responder, web};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::response::{ErrorCode, api_result, error_response};
use crate::api::middleware::OwnerId;
use crate::resolver::LinkState;
use crate::services::{
    CreateLinkRequest, DEFAULT_PAGE_SIZE, LinkDetails, LinkPage, LinkService, PlanTier,
};
use crate::storage::ShortLink;

/// Link as returned to its owner; the password hash never leaves the server
#[derive(Debug, Clone, Serialize)]
pub struct LinkView {
    pub token: String,
    pub label: Option<String>,
    pub target_url: String,
    pub state: Option<LinkState>,
    pub plan: Option<PlanTier>,
    pub active: bool,
    pub is_phantom: bool,
    pub has_password: bool,
    pub max_clicks: Option<i64>,
    pub click_count: i64,
    pub remaining_clicks: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub reveal_at: Option<DateTime<Utc>>,
}

impl From<&ShortLink> for LinkView {
    fn from(link: &ShortLink) -> Self {
        Self {
            token: link.token.clone(),
            label: link.label.clone(),
            target_url: link.target_url.clone(),
            state: None,
            plan: None,
            active: link.active,
            is_phantom: link.is_phantom,
            has_password: link.has_password(),
            max_clicks: link.max_clicks,
            click_count: link.click_count,
            remaining_clicks: link.remaining_clicks(),
            created_at: link.created_at,
            expires_at: link.expires_at,
            reveal_at: link.reveal_at,
        }
    }
}

impl From<LinkDetails> for LinkView {
    fn from(details: LinkDetails) -> Self {
        Self {
            state: Some(details.state),
            plan: Some(details.plan),
            ..Self::from(&details.link)
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TokenRef {
    pub token: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListLinksQuery {
    #[serde(default)]
    pub page: Option<u64>,
    #[serde(default)]
    pub page_size: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PaginationInfo {
    pub page: u64,
    pub page_size: u64,
    pub total: u64,
    pub total_pages: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct LinkListView {
    pub items: Vec<LinkView>,
    pub pagination: PaginationInfo,
}

impl From<LinkPage> for LinkListView {
    fn from(page: LinkPage) -> Self {
        let pagination = PaginationInfo {
            page: page.page,
            page_size: page.page_size,
            total: page.total,
            total_pages: page.total_pages(),
        };
        Self {
            items: page.links.into_iter().map(LinkView::from).collect(),
            pagination,
        }
    }
}

pub struct LinksService;

impl LinksService {
    pub async fn create_link(
        service: web::Data<Arc<LinkService>>,
        owner: OwnerId,
        body: web::Json<CreateLinkRequest>,
    ) -> impl Responder {
        let result = service
            .create_link(&owner.0, body.into_inner())
            .await
            .map(|link| LinkView::from(&link));
        api_result(StatusCode::CREATED, result)
    }

    pub async fn list_links(
        service: web::Data<Arc<LinkService>>,
        owner: OwnerId,
        query: web::Query<ListLinksQuery>,
    ) -> impl Responder {
        let query = query.into_inner();
        let result = service
            .list_links(
                &owner.0,
                query.page.unwrap_or(1),
                query.page_size.unwrap_or(DEFAULT_PAGE_SIZE),
            )
            .await
            .map(LinkListView::from);
        api_result(StatusCode::OK, result)
    }

    pub async fn get_link(
        service: web::Data<Arc<LinkService>>,
        owner: OwnerId,
        path: web::Path<String>,
    ) -> impl Responder {
        let result = service
            .get_link(&path.into_inner(), &owner.0)
            .await
            .map(LinkView::from);
        api_result(StatusCode::OK, result)
    }

    pub async fn disable_link(
        service: web::Data<Arc<LinkService>>,
        owner: OwnerId,
        path: web::Path<String>,
    ) -> impl Responder {
        let token = path.into_inner();
        let result = service
            .disable_link(&token, &owner.0)
            .await
            .map(|_| TokenRef { token });
        api_result(StatusCode::OK, result)
    }

    pub async fn delete_link(
        service: web::Data<Arc<LinkService>>,
        owner: OwnerId,
        path: web::Path<String>,
    ) -> impl Responder {
        let token = path.into_inner();
        let result = service
            .delete_link(&token, &owner.0)
            .await
            .map(|_| TokenRef { token });
        api_result(StatusCode::OK, result)
    }
}

/// Malformed JSON bodies get the same envelope as other failures
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _| {
        let message = err.to_string();
        actix_web::error::InternalError::from_response(
            err,
            error_response(StatusCode::BAD_REQUEST, ErrorCode::BadRequest, &message),
        )
        .into()
    })
}

/// Malformed list query strings get the same envelope
fn query_config() -> web::QueryConfig {
    web::QueryConfig::default().error_handler(|err, _| {
        let message = err.to_string();
        actix_web::error::InternalError::from_response(
            err,
            error_response(StatusCode::BAD_REQUEST, ErrorCode::BadRequest, &message),
        )
        .into()
    })
}

/// 链接管理路由 `/links`
///
/// - POST /links - 创建链接
/// - GET /links?page=&page_size= - 分页列出当前 owner 的链接
/// - GET /links/{token} - 获取单个链接
/// - POST /links/{token}/disable - 停用链接
/// - DELETE /links/{token} - 删除链接
pub fn links_routes() -> actix_web::Scope {
    web::scope("/links")
        .app_data(query_config())
        .route("", web::post().to(LinksService::create_link))
        .route("", web::get().to(LinksService::list_links))
        .route("/{token}/disable", web::post().to(LinksService::disable_link))
        .route("/{token}", web::get().to(LinksService::get_link))
        .route("/{token}", web::delete().to(LinksService::delete_link))
}

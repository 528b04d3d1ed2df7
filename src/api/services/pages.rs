//! Static outcome pages
//!
//! Visitors only ever learn "blocked" or "not yet available"; both pages are
//! the same for every token and reason.

use actix_web::{HttpResponse, Responder, web};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::config::ResolverConfig;
use crate::utils::TimeParser;

/// Where blocked and pending visitors are sent
#[derive(Debug, Clone)]
pub struct OutcomePages {
    pub blocked: String,
    pub pending: String,
}

impl From<&ResolverConfig> for OutcomePages {
    fn from(config: &ResolverConfig) -> Self {
        Self {
            blocked: config.blocked_page.clone(),
            pending: config.pending_page.clone(),
        }
    }
}

impl OutcomePages {
    /// Pages served by this process; absolute URLs point elsewhere
    fn is_local(path: &str) -> bool {
        path.starts_with('/') && !path.starts_with("//")
    }
}

const BLOCKED_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head><meta charset="utf-8"><title>Link unavailable</title></head>
<body>
<h1>This link is no longer available</h1>
<p>It may have expired, reached its limit, or never existed.</p>
</body>
</html>
"#;

#[derive(Debug, Deserialize)]
pub struct PendingQuery {
    pub until: Option<String>,
}

pub struct PagesService;

impl PagesService {
    pub async fn blocked() -> impl Responder {
        Self::html(BLOCKED_HTML.to_string())
    }

    pub async fn pending(query: web::Query<PendingQuery>) -> impl Responder {
        // 只回显能解析的时间，原样输入不进页面
        let until = query
            .until
            .as_deref()
            .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
            .map(|at| at.with_timezone(&Utc));

        let detail = match until {
            Some(at) => format!(
                "<p>Available at <time datetime=\"{0}\">{0}</time> (in {1}).</p>",
                at.to_rfc3339(),
                TimeParser::format_remaining(Utc::now(), at)
            ),
            None => String::new(),
        };

        Self::html(format!(
            r#"<!DOCTYPE html>
<html lang="en">
<head><meta charset="utf-8"><title>Not yet available</title></head>
<body>
<h1>This link is not available yet</h1>
{}
</body>
</html>
"#,
            detail
        ))
    }

    fn html(body: String) -> HttpResponse {
        HttpResponse::Ok()
            .insert_header(("Content-Type", "text/html; charset=utf-8"))
            .insert_header(("Cache-Control", "no-store"))
            .body(body)
    }
}

/// Register the outcome pages that live on this host
pub fn page_routes(cfg: &mut web::ServiceConfig, pages: &OutcomePages) {
    if OutcomePages::is_local(&pages.blocked) {
        cfg.route(&pages.blocked, web::get().to(PagesService::blocked));
    }
    if OutcomePages::is_local(&pages.pending) {
        cfg.route(&pages.pending, web::get().to(PagesService::pending));
    }
}

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, Responder, web};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, trace};

use super::response::{ErrorCode, json_response};
use crate::storage::LinkStore;
use crate::utils::TimeParser;

const STORE_CHECK_TIMEOUT: Duration = Duration::from_secs(5);

/// Process-wide facts the health endpoint reports on
#[derive(Clone)]
pub struct HealthState {
    pub start_datetime: chrono::DateTime<chrono::Utc>,
    /// `None` when the process runs fail-closed
    pub store: Option<Arc<dyn LinkStore>>,
}

#[derive(Debug, Serialize)]
pub struct HealthStoreCheck {
    pub status: &'static str,
    pub backend: Option<&'static str>,
    pub links_count: Option<u64>,
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: String,
    pub uptime: u64,
    pub store: HealthStoreCheck,
    pub response_time_ms: u64,
}

/// Health Service
///
/// 直接查询 store 的 count，不经过 LinkService：探针需要快速、简单。
pub struct HealthService;

impl HealthService {
    async fn check_store(store: Option<&Arc<dyn LinkStore>>) -> HealthStoreCheck {
        let Some(store) = store else {
            return HealthStoreCheck {
                status: "unhealthy",
                backend: None,
                links_count: None,
                error: Some("store not configured".to_string()),
            };
        };

        let backend = Some(store.backend_name());
        match tokio::time::timeout(STORE_CHECK_TIMEOUT, store.count()).await {
            Ok(Ok(count)) => {
                trace!("Store health check passed, {} links found", count);
                HealthStoreCheck {
                    status: "healthy",
                    backend,
                    links_count: Some(count),
                    error: None,
                }
            }
            Ok(Err(e)) => {
                error!("Store health check failed: {}", e);
                HealthStoreCheck {
                    status: "unhealthy",
                    backend,
                    links_count: None,
                    error: Some("store error".to_string()),
                }
            }
            Err(_) => {
                error!("Store health check timeout");
                HealthStoreCheck {
                    status: "unhealthy",
                    backend,
                    links_count: None,
                    error: Some("timeout".to_string()),
                }
            }
        }
    }

    pub async fn health_check(state: web::Data<HealthState>) -> impl Responder {
        let start_time = Instant::now();
        trace!("Received health check request");

        let store = Self::check_store(state.store.as_ref()).await;
        let is_healthy = store.status == "healthy";

        let now = chrono::Utc::now();
        let uptime = (now - state.start_datetime).num_seconds().max(0) as u64;

        let health = HealthResponse {
            status: store.status,
            timestamp: now.to_rfc3339(),
            uptime,
            store,
            response_time_ms: start_time.elapsed().as_millis() as u64,
        };

        info!(
            "Health check completed in {:?}, status: {}, uptime: {}",
            start_time.elapsed(),
            health.status,
            TimeParser::format_remaining(state.start_datetime, now)
        );

        let (status, code, message) = if is_healthy {
            (StatusCode::OK, ErrorCode::Success, "OK")
        } else {
            (
                StatusCode::SERVICE_UNAVAILABLE,
                ErrorCode::ServiceUnavailable,
                "Service Unavailable",
            )
        };
        json_response(status, code, message, Some(health))
    }

    // 活跃性检查，只要进程能响应即可
    pub async fn liveness_check() -> impl Responder {
        trace!("Received liveness check request");

        HttpResponse::NoContent().finish()
    }
}

/// Health 路由配置
pub fn health_routes() -> actix_web::Scope {
    web::scope("/health")
        .route("", web::get().to(HealthService::health_check))
        .route("", web::head().to(HealthService::health_check))
        .route("/live", web::get().to(HealthService::liveness_check))
        .route("/live", web::head().to(HealthService::liveness_check))
}

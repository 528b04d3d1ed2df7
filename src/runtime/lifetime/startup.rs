use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::api::services::OutcomePages;
use crate::config::{ApiConfig, StaticConfig};
use crate::errors::LinkgateError;
use crate::resolver::{LifecycleAuthority, TokenResolver};
use crate::services::{LinkService, PlanPolicy};
use crate::storage::{LinkStore, StorageFactory};

pub struct StartupContext {
    /// `None` when the process runs fail-closed
    pub store: Option<Arc<dyn LinkStore>>,
    pub resolver: TokenResolver,
    /// Only present when a store is available
    pub link_service: Option<Arc<LinkService>>,
    pub route_config: RouteConfig,
}

#[derive(Clone, Debug)]
pub struct RouteConfig {
    pub route_prefix: String,
    pub pages: OutcomePages,
    pub api: ApiConfig,
}

impl RouteConfig {
    pub fn api_enabled(&self) -> bool {
        !self.api.token.is_empty()
    }
}

/// `/l/` and `l` both become `/l`; `/` becomes the root scope
pub fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{}", trimmed)
    }
}

/// Open the configured store.
///
/// A missing database URL yields `Ok(None)`: the caller runs fail-closed.
/// Any other failure aborts startup.
pub async fn open_store(config: &StaticConfig) -> Result<Option<Arc<dyn LinkStore>>> {
    let authority = LifecycleAuthority::new(config.resolver.delete_consumed_phantoms);

    match StorageFactory::create(&config.database, authority).await {
        Ok(store) => {
            info!("Using storage backend: {}", store.backend_name());
            Ok(Some(store))
        }
        Err(LinkgateError::DatabaseConfig(msg)) => {
            error!(
                "Store is not configured ({}); every token will be refused",
                msg
            );
            Ok(None)
        }
        Err(e) => Err(e).context("Failed to create storage backend"),
    }
}

/// 准备服务器启动的上下文
pub async fn prepare_server_startup(config: &StaticConfig) -> Result<StartupContext> {
    let start_time = std::time::Instant::now();
    debug!("Starting pre-startup processing...");

    let store = open_store(config).await?;

    let resolver = match &store {
        Some(store) => TokenResolver::new(store.clone()),
        None => TokenResolver::fail_closed(),
    }
    .with_head_is_speculative(config.resolver.head_is_speculative);

    let link_service = store.as_ref().map(|store| {
        Arc::new(LinkService::new(
            store.clone(),
            PlanPolicy::from_config(&config.plans),
            &config.links,
        ))
    });

    let route_config = RouteConfig {
        route_prefix: normalize_prefix(&config.resolver.route_prefix),
        pages: OutcomePages::from(&config.resolver),
        api: config.api.clone(),
    };

    check_component_enabled(&route_config, link_service.is_some());

    debug!(
        "Pre-startup processing completed in {} ms",
        start_time.elapsed().as_millis()
    );

    Ok(StartupContext {
        store,
        resolver,
        link_service,
        route_config,
    })
}

fn check_component_enabled(route_config: &RouteConfig, has_store: bool) {
    info!(
        "Resolution endpoint available at: {}/{{token}}",
        route_config.route_prefix
    );

    if !route_config.api_enabled() {
        info!("Owner API is disabled (api.token not set)");
    } else if !has_store {
        warn!("Owner API is disabled: no store configured");
    } else {
        if route_config.api.token.len() < 16 {
            warn!("WARNING: API token is short. Consider using a stronger token.");
        }
        info!(
            "Owner API available at: /api/v1 (owner header: {})",
            route_config.api.owner_header
        );
    }
}

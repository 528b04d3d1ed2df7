//! Server mode
//!
//! Configures and starts the HTTP server: resolution endpoint, outcome pages,
//! health, and the owner API when a store and an API token are configured.

use actix_web::{
    App, HttpServer,
    middleware::{Compress, DefaultHeaders},
    web,
};
use anyhow::{Context, Result};
use tracing::warn;

use crate::api::middleware::ApiAuth;
use crate::api::services::{
    HealthState, health_routes, json_config, links_routes, page_routes, redirect_routes,
};
use crate::config::StaticConfig;
use crate::runtime::lifetime;

/// Run the HTTP server
///
/// **Note**: Logging system must be initialized before calling this function
pub async fn run_server(config: &StaticConfig) -> Result<()> {
    let start_datetime = chrono::Utc::now();

    let startup = lifetime::startup::prepare_server_startup(config)
        .await
        .inspect_err(|e| tracing::error!("Server startup failed: {}", e))?;

    let health_state = HealthState {
        start_datetime,
        store: startup.store.clone(),
    };
    let resolver = startup.resolver.clone();
    let route = startup.route_config.clone();
    let link_service = startup
        .link_service
        .clone()
        .filter(|_| route.api_enabled());

    let cpu_count = config.server.cpu_count.clamp(1, 32);
    warn!("Using {} CPU cores for the server", cpu_count);

    let server = HttpServer::new(move || {
        let route = route.clone();
        let link_service = link_service.clone();

        App::new()
            .wrap(Compress::default())
            .wrap(
                DefaultHeaders::new()
                    .add(("Connection", "keep-alive"))
                    .add(("Keep-Alive", "timeout=30, max=1000")),
            )
            .app_data(web::Data::new(resolver.clone()))
            .app_data(web::Data::new(route.pages.clone()))
            .app_data(web::Data::new(health_state.clone()))
            .app_data(web::PayloadConfig::new(64 * 1024))
            .service(health_routes())
            .configure(|cfg| page_routes(cfg, &route.pages))
            .configure(|cfg| {
                if let Some(service) = link_service {
                    cfg.service(
                        web::scope("/api/v1")
                            .wrap(ApiAuth::new(
                                route.api.token.clone(),
                                route.api.owner_header.clone(),
                            ))
                            .app_data(web::Data::new(service))
                            .app_data(json_config())
                            .service(links_routes()),
                    );
                }
            })
            .service(redirect_routes(&route.route_prefix))
    })
    .keep_alive(std::time::Duration::from_secs(30))
    .client_request_timeout(std::time::Duration::from_millis(5000))
    .client_disconnect_timeout(std::time::Duration::from_millis(1000))
    .workers(cpu_count);

    let bind_address = format!("{}:{}", config.server.host, config.server.port);
    warn!("Starting server at http://{}", bind_address);
    let server = server
        .bind(&bind_address)
        .with_context(|| format!("Failed to bind {}", bind_address))?
        .run();

    // Wait for server or shutdown signal
    tokio::select! {
        res = server => {
            res?;
        }
        _ = lifetime::shutdown::listen_for_shutdown() => {
            warn!("Graceful shutdown complete");
        }
    }

    Ok(())
}

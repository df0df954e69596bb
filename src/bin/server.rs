//! capability-gateway HTTP server binary.
//!
//! # Environment Variables
//!
//! - `PORT`: HTTP port (default: 8080)
//! - `CAPABILITIES_CONFIG`: YAML configuration file (default: `capabilities.yaml`)
//! - `RUST_LOG`: Tracing filter (default: "info,capability_gateway=debug")
//!
//! # Usage
//!
//! ```bash
//! CAPABILITIES_CONFIG=capabilities.yaml cargo run --bin server
//! curl http://localhost:8080/var/capabilities.json
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use capability_gateway::config::GatewayConfig;
use capability_gateway::server::{app_router, AppState};
use capability_gateway::sources::HandlerCatalog;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,capability_gateway=debug".into()),
        )
        .init();

    let port = std::env::var("PORT").unwrap_or_else(|_| "8080".to_string());
    let bind_addr = format!("0.0.0.0:{}", port);
    let config_path = PathBuf::from(
        std::env::var("CAPABILITIES_CONFIG").unwrap_or_else(|_| "capabilities.yaml".to_string()),
    );

    let config = GatewayConfig::load(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;
    let catalog = Arc::new(HandlerCatalog::new());
    let gateway = config
        .build_gateway(&catalog)
        .context("building capabilities gateway")?;

    tracing::info!("{}", gateway);
    tracing::info!(
        patterns = ?gateway.path_filter().patterns(),
        "resource path allow-list"
    );

    let app = app_router(AppState::new(gateway));

    tracing::info!("capability-gateway starting on {}", bind_addr);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding {}", bind_addr))?;

    axum::serve(listener, app).await.context("server failed")?;
    Ok(())
}

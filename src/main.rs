use krib_portal::{
    AppState, HttpKribApi, PortalConfig,
    api::ApiState,
    config::Env,
    create_router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// Loads configuration, sets up logging, and serves the portal.
#[tokio::main]
async fn main() {
    // 1. Configuration (fail fast on missing production secrets)
    dotenv::dotenv().ok();
    let config = PortalConfig::load().expect("FATAL: invalid portal configuration");

    // 2. Logging
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "krib_portal=debug,tower_http=info".into());

    match config.env {
        Env::Local => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            // JSON lines for the log aggregator.
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!(
        api = %config.api_base_url,
        property_fields = ?config.property_fields,
        "Portal starting in {:?} mode",
        config.env
    );

    // 3. API client and shared state
    let api = Arc::new(HttpKribApi::new(&config.api_base_url)) as ApiState;
    let bind_addr = config.bind_addr.clone();
    let app = create_router(AppState::new(api, config));

    // 4. Server
    let listener = TcpListener::bind(&bind_addr)
        .await
        .expect("FATAL: could not bind listen address");

    tracing::info!("Listening on {bind_addr}");
    tracing::info!("API documentation available at /swagger-ui");

    axum::serve(listener, app).await.expect("server error");
}

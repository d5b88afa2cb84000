use ai_email::{OriginAllowList, build_service, config, create_app};
use tracing_subscriber::EnvFilter;

use std::sync::Arc;

#[tokio::main]
async fn main() {
    // Local .env is optional, loaded first so it can set RUST_LOG
    let dotenv = dotenvy::dotenv();

    // Log setup
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();
    ai_email::install_panic_hook();

    if let Err(e) = dotenv {
        tracing::debug!("No .env file loaded: {e}");
    }

    // Load config
    let cfg = config::load_config().expect("failed to locate or load config");
    tracing::info!(
        "Successfully loaded config for environment '{}'",
        cfg.environment
    );

    let origins = cfg.allowed_origins();
    tracing::info!("Allowed origins: {:?}", origins);
    let allow_list = OriginAllowList::new(&origins).unwrap_or_else(|e| {
        tracing::error!("Invalid origin allow-list: {e}");
        panic!("invalid origin allow-list: {e}");
    });

    // Setup service
    let service = build_service(&cfg).unwrap_or_else(|e| {
        tracing::error!("Failed to set up mail relay: {e}");
        panic!("failed to set up mail relay: {e}");
    });

    // Setup router
    let router = create_app(Arc::new(service), allow_list);

    // Start server
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", cfg.port))
        .await
        .expect("Failed to bind to address");
    let addr = listener
        .local_addr()
        .expect("Failed to read listener address");

    tracing::info!("AI email backend starting, listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Failed to start server");
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, draining connections");
}

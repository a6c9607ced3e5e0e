use anyhow::Result;
use axum::Router;
use tarifa_tracker::{api, config::Config, coordinator, telemetry};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    telemetry::init_tracing();

    let cfg = Config::load()?;

    let state = coordinator::AppState::new(cfg.clone()).await?;

    if cfg.refresh.providers.is_empty() {
        warn!(
            "no providers configured for scheduled refresh; set [refresh].providers \
             or use POST /api/v1/tariffs/{{provider}}/refresh"
        );
    }

    coordinator::spawn_refresh_tasks(&state);

    let app: Router = api::router(state, &cfg);
    let addr = cfg.server.socket_addr()?;
    info!(%addr, "starting tarifa-tracker");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(telemetry::shutdown_signal())
        .await?;

    warn!("shutdown complete");
    Ok(())
}

use backend::config::Config;
use backend::{app, telemetry, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init();

    let config = Config::from_env();
    let state = AppState::from_config(&config).await;

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    tracing::info!(addr = %config.addr, public_url = %config.public_url, "listening");
    axum::serve(listener, app(state)).await?;
    Ok(())
}

use std::sync::Arc;

use axum::Router;
use tower_http::cors::CorsLayer;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use gemini_chat::{config::Config, config::MODEL, routes, state::AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(true)
        .init();

    let addr = config.bind_addr()?;
    let state = Arc::new(AppState::new(config));

    if state.chat.is_configured() {
        info!(model = MODEL, "API key configured");
    } else {
        error!("API key missing: set GOOGLE_API_KEY, chat requests will fail until restart");
    }

    let cors = CorsLayer::very_permissive();

    let app: Router = routes::create_router()
        .with_state(state)
        .layer(cors);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!(%addr, "gemini chat running at http://{addr}");
    axum::serve(listener, app).await?;
    Ok(())
}

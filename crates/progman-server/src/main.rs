//! Binary entrypoint for the progman HTTP server.
//!
//! Configuration comes from environment variables, see [`ServerConfig`].
//! Log verbosity follows `RUST_LOG` (default: "info").

use progman_server::config::ServerConfig;
use progman_server::router::build_router;
use progman_server::state::AppState;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ServerConfig::from_env()?;
    let state = AppState::new(&config.manager)?;
    let app = build_router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("progman server starting on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

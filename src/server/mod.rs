//! HTTP service running one crawl per request
//!
//! The service is stateless: every crawl request builds its own
//! configuration, scheduler and in-memory dataset, so concurrent requests
//! never share crawl state.

mod handlers;
mod routes;

pub use routes::create_router;

use crate::config::Config;
use std::net::SocketAddr;
use std::sync::Arc;

/// Shared state for the web server.
#[derive(Clone)]
pub struct AppState {
    /// Base configuration every request starts from
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self {
            config: Arc::new(config),
        }
    }
}

/// Start the web server.
pub async fn serve(config: Config, host: &str, port: u16) -> anyhow::Result<()> {
    let app = create_router(AppState::new(config));

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    tracing::info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

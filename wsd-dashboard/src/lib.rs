//! HTTP dashboard for water surface detection time series.
//!
//! The server is a thin `axum` layer over [`views`]: every request carries
//! its own filter in the query string, the handler builds the view from the
//! read-only [`state::AppState`] and returns JSON. The page itself
//! (`assets/index.html`) and its D3 chart scripts are embedded at compile
//! time.

pub mod config;
pub mod params;
pub mod routes;
pub mod state;
pub mod views;

use anyhow::Context;
use std::sync::Arc;

pub use config::DashboardConfig;
pub use state::AppState;

/// Bind `config.bind` and serve until the process is stopped.
pub async fn serve(state: AppState, config: &DashboardConfig) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(&config.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.bind))?;
    log::info!("[WSD] server: dashboard listening on http://{}", listener.local_addr()?);
    axum::serve(listener, routes::router(Arc::new(state))).await?;
    Ok(())
}

pub mod routes;

use crate::config::Config;
use crate::session::actor::SessionHandle;
use anyhow::{Context, Result};
use axum::Router;
use std::net::{Ipv4Addr, SocketAddr};
use tokio::net::TcpListener;
use tracing::info;

pub async fn run_server(config: &Config, handle: SessionHandle) -> Result<()> {
    let port = config.api_port;
    let state = routes::ApiState {
        owner: config.owner.clone(),
        handle,
        summary_days: config.summary_days,
    };
    let app: Router = routes::router(state);

    let addr = SocketAddr::from((Ipv4Addr::LOCALHOST, port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind API server: {addr}"))?;

    info!(address = %addr, owner = %config.owner, "roadmap API server started");

    axum::serve(listener, app)
        .await
        .context("API server failed")?;

    Ok(())
}

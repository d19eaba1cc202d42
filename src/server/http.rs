//! Streamable HTTP transport, for clients that cannot spawn the server over stdio.

use std::net::SocketAddr;

use anyhow::Result;
use axum::{Json, Router, routing::get};
use rmcp::{
    serde_json::{Value, json},
    transport::streamable_http_server::{
        StreamableHttpService, session::local::LocalSessionManager,
    },
};
use tower_http::cors::CorsLayer;

use crate::server::BusServer;

pub async fn serve(server: BusServer, bind: SocketAddr) -> Result<()> {
    let service = StreamableHttpService::new(
        move || Ok(server.clone()),
        LocalSessionManager::default().into(),
        Default::default(),
    );

    let router = Router::new()
        .route("/", get(health))
        .nest_service("/mcp", service)
        .layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(bind).await?;
    tracing::info!(%bind, "MCP endpoint listening on /mcp");

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            if let Err(error) = tokio::signal::ctrl_c().await {
                tracing::error!("failed to listen for shutdown signal: {error}");
            }
        })
        .await?;
    Ok(())
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

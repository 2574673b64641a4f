//! REST API server for meetscribe.
//!
//! Provides HTTP endpoints for:
//! - Joining a meeting (POST /join-meet)
//! - Live session phases (GET /sessions)
//! - Stored meetings (GET /meetings, GET /meetings/:id)

pub mod error;
pub mod routes;

use crate::config::Config;
use crate::session::SessionRegistry;
use anyhow::Result;
use axum::{response::Json, routing::get, Router};
use serde_json::{json, Value};
use tower::ServiceBuilder;
use tracing::info;

pub use error::{ApiError, ApiResult};
pub use routes::join::{ApiCommand, JoinState};

pub struct ApiServer {
    host: String,
    port: u16,
    join_state: JoinState,
}

impl ApiServer {
    pub fn new(
        tx: tokio::sync::mpsc::Sender<ApiCommand>,
        registry: SessionRegistry,
        config: &Config,
    ) -> Self {
        Self {
            host: config.api.host.clone(),
            port: config.api.port,
            join_state: JoinState { tx, registry },
        }
    }

    pub async fn start(self) -> Result<()> {
        let app = Router::new()
            .route("/", get(status))
            .route("/version", get(version))
            .merge(routes::join::router(self.join_state))
            .layer(ServiceBuilder::new());

        let listener =
            tokio::net::TcpListener::bind(&format!("{}:{}", self.host, self.port)).await?;

        info!("API server listening on http://{}:{}", self.host, self.port);
        info!("Endpoints:");
        info!("  GET  /              - Service info");
        info!("  POST /join-meet     - Join a meeting and capture its transcript");
        info!("  GET  /sessions      - Live session phases");
        info!("  GET  /meetings      - Stored meetings");
        info!("  GET  /meetings/:id  - One meeting with transcript and summary");
        info!("  GET  /version       - Version info");

        axum::serve(listener, app).await?;

        Ok(())
    }
}

async fn status() -> Json<Value> {
    Json(json!({
        "service": "meetscribe",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running"
    }))
}

async fn version() -> Json<Value> {
    Json(json!({
        "version": env!("CARGO_PKG_VERSION"),
        "name": "meetscribe"
    }))
}

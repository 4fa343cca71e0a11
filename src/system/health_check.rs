use axum::{extract::State, Json};
use serde::Serialize;

use crate::config::SERVICE_NAME;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub proxy_configured: bool,
    pub database_connected: bool,
    pub service: &'static str,
}

/// Always 200; `database_connected` comes from a fresh round trip.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let database_connected = match state.store.ping().await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, "Database health check failed");
            false
        }
    };

    Json(HealthResponse {
        status: "healthy",
        proxy_configured: state.settings.proxy_configured(),
        database_connected,
        service: SERVICE_NAME,
    })
}

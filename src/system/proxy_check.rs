use std::time::Duration;

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::AppState;

const PROXY_CHECK_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
struct IpEcho {
    origin: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ProxyCheckResponse {
    pub proxy_configured: bool,
    /// Egress address reported by the echo service.
    pub origin: Option<String>,
}

/// Sends one request through the configured proxy and reports the egress IP.
#[tracing::instrument(name = "Proxy check", skip(state))]
pub async fn proxy_check(State(state): State<AppState>) -> Result<Json<ProxyCheckResponse>, AppError> {
    let settings = &state.settings;
    let proxy = settings
        .proxy
        .as_ref()
        .ok_or_else(|| AppError::Validation("No proxy configured".to_string()))?;

    let proxy_url = proxy.url()?;
    let client = reqwest::Client::builder()
        .proxy(reqwest::Proxy::all(proxy_url.as_str())?)
        .timeout(PROXY_CHECK_TIMEOUT)
        .build()?;

    let echo: IpEcho = client
        .get(&settings.proxy_check_url)
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;

    tracing::info!(origin = ?echo.origin, host = %proxy.host, "Proxy reachable");

    Ok(Json(ProxyCheckResponse {
        proxy_configured: true,
        origin: echo.origin,
    }))
}

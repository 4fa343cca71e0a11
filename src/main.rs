mod api;
mod config;
mod errors;
mod store;
mod system;
mod transcript;

#[cfg(test)]
mod test_support;

use std::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::get;
use axum_prometheus::PrometheusMetricLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::api::common::tracing::{
    make_custom_span, on_custom_failure, on_custom_request, on_custom_response,
};
use crate::config::Settings;
use crate::store::VideoStore;
use crate::transcript::{TranscriptFetcher, YoutubeTranscriptFetcher};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn VideoStore>,
    pub fetcher: Arc<dyn TranscriptFetcher>,
    pub settings: Arc<Settings>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "transcript_api=debug,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings = Settings::from_env()?;

    match &settings.proxy {
        Some(proxy) => tracing::info!(host = %proxy.host, port = proxy.port, "Proxy configured"),
        None => tracing::warn!("No proxy configured, transcript requests go out directly"),
    }

    let store = store::connect(&settings.database_url).await?;
    if let Err(e) = store.ensure_schema().await {
        tracing::warn!(error = %e, "Could not prepare videos table, continuing without it");
    }

    let fetcher = YoutubeTranscriptFetcher::new(settings.proxy.as_ref(), settings.fetch_timeout)?;

    let app_state = AppState {
        store,
        fetcher: Arc::new(fetcher),
        settings: Arc::new(settings),
    };
    let port = app_state.settings.port;

    let (prometheus_layer, metric_handle) = PrometheusMetricLayer::pair();

    let app = api::create_router(app_state)
        .route("/metrics", get(|| async move { metric_handle.render() }))
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(make_custom_span::<axum::body::Body>)
                .on_request(on_custom_request::<axum::body::Body>)
                .on_response(on_custom_response::<axum::body::Body>)
                .on_failure(on_custom_failure),
        )
        .layer(prometheus_layer);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}

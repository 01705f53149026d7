use crate::aggregator::Aggregator;
use crate::assembler;
use crate::config::Config;
use crate::fetcher::Fetcher;
use crate::normalizer::Normalizer;
use crate::types::{FetchConfig, Result};
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

pub struct AppState {
    aggregator: Aggregator,
    template_path: PathBuf,
}

impl AppState {
    pub fn new(aggregator: Aggregator, template_path: PathBuf) -> Self {
        Self {
            aggregator,
            template_path,
        }
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/config.yml", get(get_config))
        .route("/health", get(health))
        .with_state(state)
}

/// Build the merged configuration for one request.
///
/// Source failures never fail the request; an unreadable or malformed
/// template does, since that is a deployment problem rather than upstream
/// weather.
async fn get_config(State(state): State<Arc<AppState>>) -> Response {
    let template_text = match tokio::fs::read_to_string(&state.template_path).await {
        Ok(text) => text,
        Err(e) => {
            error!("Failed to read template {}: {}", state.template_path.display(), e);
            return (StatusCode::INTERNAL_SERVER_ERROR, "failed to read config template").into_response();
        }
    };

    let template = match assembler::parse_template(&template_text) {
        Ok(template) => template,
        Err(e) => {
            error!("Failed to parse template {}: {}", state.template_path.display(), e);
            return (StatusCode::INTERNAL_SERVER_ERROR, "failed to parse config template").into_response();
        }
    };

    let entries = state.aggregator.collect_entries().await;

    match assembler::assemble(template, entries) {
        Ok(body) => ([(header::CONTENT_TYPE, "text/yaml")], body).into_response(),
        Err(e) => {
            error!("Failed to assemble configuration: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "failed to assemble configuration").into_response()
        }
    }
}

async fn health() -> &'static str {
    "OK"
}

/// Wire the pipeline from process configuration and serve until shutdown.
pub async fn start_server(config: Config) -> Result<()> {
    let fetcher = Arc::new(Fetcher::new(FetchConfig::default())?);
    let normalizer = Normalizer::new(
        config.ignore_label_keywords.clone(),
        config.ignore_proxy_names.clone(),
    );
    let aggregator = Aggregator::new(
        fetcher,
        normalizer,
        config.subs.clone(),
        config.sub_url_template.clone(),
    );
    let state = Arc::new(AppState::new(aggregator, config.template_path.clone()));

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port)).await?;
    info!("Listening on 0.0.0.0:{}", config.port);

    axum::serve(listener, router(state)).await?;
    Ok(())
}

use std::sync::Arc;

use askama::Template;
use axum::{
    Form, Router,
    extract::State,
    http::StatusCode,
    response::Html,
    routing::get,
};
use serde::Deserialize;
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing::{info, warn};

use crate::{config::AppConfig, error::ServiceError, pipeline::GenerationPipeline};

/// Shown instead of a generated answer when the submitted query is blank.
pub const EMPTY_QUERY_MESSAGE: &str = "Please enter a query.";

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub pipeline: Arc<GenerationPipeline>,
}

#[derive(Debug, Deserialize)]
pub struct QueryForm {
    pub query: String,
}

#[derive(Template)]
#[template(path = "index.html")]
struct IndexPage<'a> {
    model: &'a str,
    query: &'a str,
    response: Option<&'a str>,
}

pub fn build_router(config: Arc<AppConfig>, pipeline: Arc<GenerationPipeline>) -> Router {
    let static_files = ServeDir::new(&config.static_dir);
    let state = AppState { config, pipeline };

    Router::new()
        .route("/", get(index).post(submit_query))
        .route("/health", get(health))
        .nest_service("/static", static_files)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

async fn index(State(state): State<AppState>) -> Result<Html<String>, ServiceError> {
    let page = IndexPage {
        model: &state.config.model,
        query: "",
        response: None,
    };
    Ok(Html(page.render()?))
}

async fn submit_query(
    State(state): State<AppState>,
    Form(form): Form<QueryForm>,
) -> Result<Html<String>, ServiceError> {
    let query = form.query.as_str();

    let response = if query.is_empty() {
        info!("empty query submitted, skipping generation");
        EMPTY_QUERY_MESSAGE.to_string()
    } else {
        state.pipeline.generate(query).await?
    };

    let page = IndexPage {
        model: &state.config.model,
        query,
        response: Some(&response),
    };
    Ok(Html(page.render()?))
}

async fn health(State(state): State<AppState>) -> (StatusCode, &'static str) {
    match state.pipeline.backend().health_check().await {
        Ok(()) => (StatusCode::OK, "ok"),
        Err(err) => {
            warn!(error = %err, "backend health check failed");
            (StatusCode::SERVICE_UNAVAILABLE, "backend unavailable")
        }
    }
}

use askama::Template;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use thiserror::Error;

use crate::pipeline::GenerationError;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Generation(#[from] GenerationError),
    #[error("failed to render page: {0}")]
    Render(#[from] askama::Error),
}

impl ServiceError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServiceError::Generation(GenerationError::Timeout(_)) => StatusCode::GATEWAY_TIMEOUT,
            ServiceError::Generation(_) => StatusCode::BAD_GATEWAY,
            ServiceError::Render(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Template)]
#[template(path = "error.html")]
struct ErrorPage<'a> {
    status: u16,
    reason: &'a str,
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status();
        tracing::error!(status = status.as_u16(), error = %self, "request failed");

        // Backend detail stays in the log; the page only names the status.
        let reason = status.canonical_reason().unwrap_or("Error");
        let page = ErrorPage {
            status: status.as_u16(),
            reason,
        };

        match page.render() {
            Ok(html) => (status, Html(html)).into_response(),
            Err(_) => (status, reason).into_response(),
        }
    }
}

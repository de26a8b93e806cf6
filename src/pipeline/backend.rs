//! Backend abstraction for text generation.
//!
//! The pipeline only ever sees a [`GenerationBackend`]; the Ollama client in
//! [`super::ollama`] is the production implementation and tests substitute
//! their own stubs.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use super::prompt::Prompt;

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("generation backend unreachable: {0}")]
    Unreachable(String),
    #[error("generation backend timed out after {0:?}")]
    Timeout(Duration),
    #[error("generation backend returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed backend response: {0}")]
    Malformed(String),
    #[error("generation backend returned an empty response")]
    EmptyResponse,
}

impl GenerationError {
    /// Whether another attempt could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            GenerationError::Unreachable(_) | GenerationError::Timeout(_)
        )
    }
}

#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Model identifier the backend generates with.
    fn model(&self) -> &str;

    /// Run one complete, non-streaming generation and return the plain text.
    async fn complete(&self, prompt: &Prompt) -> Result<String, GenerationError>;

    async fn health_check(&self) -> Result<(), GenerationError>;
}

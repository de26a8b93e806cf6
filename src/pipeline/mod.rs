mod backend;
mod ollama;
mod prompt;
mod types;

use std::{sync::Arc, time::Duration};

use tokio::time::{Instant, timeout};
use tracing::{debug, info, warn};

use crate::config::AppConfig;

pub use backend::{GenerationBackend, GenerationError};
pub use ollama::OllamaBackend;
pub use prompt::{Message, Prompt, Role, SYSTEM_INSTRUCTION};
pub use types::ModelOptions;

/// Turns a raw query into generated text through a [`GenerationBackend`].
///
/// Every call builds a fresh [`Prompt`] and holds no state between calls, so a
/// single pipeline is shared by all request handlers.
pub struct GenerationPipeline {
    backend: Arc<dyn GenerationBackend>,
    attempt_timeout: Duration,
    max_retries: u32,
}

impl GenerationPipeline {
    pub fn new(backend: Arc<dyn GenerationBackend>, config: &AppConfig) -> Self {
        Self::with_policy(backend, config.request_timeout, config.max_retries)
    }

    pub fn with_policy(
        backend: Arc<dyn GenerationBackend>,
        attempt_timeout: Duration,
        max_retries: u32,
    ) -> Self {
        Self {
            backend,
            attempt_timeout,
            max_retries,
        }
    }

    pub fn backend(&self) -> &dyn GenerationBackend {
        self.backend.as_ref()
    }

    pub async fn generate(&self, query: &str) -> Result<String, GenerationError> {
        let prompt = Prompt::for_query(query);
        let total_attempts = self.max_retries.saturating_add(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            let start = Instant::now();
            debug!(attempt, query_len = query.len(), "invoking generation backend");

            let outcome = match timeout(self.attempt_timeout, self.backend.complete(&prompt)).await
            {
                Ok(result) => result,
                Err(_) => Err(GenerationError::Timeout(self.attempt_timeout)),
            };

            match outcome {
                Ok(text) => {
                    info!(
                        model = self.backend.model(),
                        attempt,
                        elapsed_ms = start.elapsed().as_millis() as u64,
                        response_len = text.len(),
                        "generation completed"
                    );
                    return Ok(text);
                }
                Err(err) if err.is_transient() && attempt < total_attempts => {
                    warn!(attempt, error = %err, "generation attempt failed, retrying");
                }
                Err(err) => {
                    warn!(attempt, error = %err, "generation failed");
                    return Err(err);
                }
            }
        }
    }
}

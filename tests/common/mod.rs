#![allow(dead_code)]

use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use axum::{Router, body::Body, http::Request, response::Response};
use http_body_util::BodyExt;
use ollama_query_service::{
    AppConfig, GenerationBackend, GenerationError, GenerationPipeline, Prompt, build_router,
};

pub enum Behavior {
    /// Answers with `echo: <user message>`.
    Echo,
    /// Always fails as if the backend were down.
    Unreachable,
    /// Sleeps before echoing.
    Slow(Duration),
    /// Fails as unreachable for the first `n` calls, then echoes.
    FailFirst(usize),
    /// Returns a non-transient envelope error.
    Malformed,
    /// Returns an error status with an internal-looking body.
    Status,
}

pub struct StubBackend {
    behavior: Behavior,
    calls: AtomicUsize,
}

impl StubBackend {
    pub fn new(behavior: Behavior) -> Arc<Self> {
        Arc::new(Self {
            behavior,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GenerationBackend for StubBackend {
    fn model(&self) -> &str {
        "stub-model"
    }

    async fn complete(&self, prompt: &Prompt) -> Result<String, GenerationError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        let echo = format!("echo: {}", prompt.user_text());
        match &self.behavior {
            Behavior::Echo => Ok(echo),
            Behavior::Unreachable => Err(GenerationError::Unreachable("connection refused".into())),
            Behavior::Slow(delay) => {
                tokio::time::sleep(*delay).await;
                Ok(echo)
            }
            Behavior::FailFirst(n) if call < *n => {
                Err(GenerationError::Unreachable("connection refused".into()))
            }
            Behavior::FailFirst(_) => Ok(echo),
            Behavior::Malformed => Err(GenerationError::Malformed("expected value".into())),
            Behavior::Status => Err(GenerationError::Status {
                status: 404,
                body: "model 'stub-model' not found at http://10.0.0.5:11434".into(),
            }),
        }
    }

    async fn health_check(&self) -> Result<(), GenerationError> {
        match self.behavior {
            Behavior::Unreachable => Err(GenerationError::Unreachable("connection refused".into())),
            _ => Ok(()),
        }
    }
}

pub fn test_config() -> AppConfig {
    AppConfig {
        request_timeout: Duration::from_secs(5),
        static_dir: concat!(env!("CARGO_MANIFEST_DIR"), "/static").into(),
        ..AppConfig::default()
    }
}

pub fn test_app(backend: Arc<StubBackend>) -> Router {
    test_app_with(backend, test_config())
}

pub fn test_app_with(backend: Arc<StubBackend>, config: AppConfig) -> Router {
    let pipeline = Arc::new(GenerationPipeline::new(backend, &config));
    build_router(Arc::new(config), pipeline)
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

pub fn post_form(body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/")
        .header("content-type", "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub async fn body_text(response: Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

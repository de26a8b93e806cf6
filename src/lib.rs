pub mod config;
pub mod error;
pub mod pipeline;
pub mod server;

pub use config::{ApiMode, AppConfig};
pub use error::ServiceError;
pub use pipeline::{
    GenerationBackend, GenerationError, GenerationPipeline, OllamaBackend, Prompt,
};
pub use server::{AppState, EMPTY_QUERY_MESSAGE, build_router};

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::debug;

use crate::{
    config::{ApiMode, AppConfig},
    pipeline::{
        backend::{GenerationBackend, GenerationError},
        prompt::Prompt,
        types::{ChatRequest, ChatResponse, GenerateRequest, GenerateResponse, ModelOptions},
    },
};

pub struct OllamaBackend {
    client: Client,
    base_url: String,
    model: String,
    api_mode: ApiMode,
    options: ModelOptions,
    timeout: Duration,
}

impl OllamaBackend {
    pub fn new(config: &AppConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .connect_timeout(config.request_timeout)
            .build()
            .context("failed to build http client")?;

        Ok(Self {
            client,
            base_url: config.ollama_base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_mode: config.api_mode,
            options: ModelOptions {
                temperature: config.temperature,
                num_predict: config.max_new_tokens,
            },
            timeout: config.request_timeout,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/api/{path}", self.base_url)
    }

    fn options(&self) -> Option<&ModelOptions> {
        (!self.options.is_empty()).then_some(&self.options)
    }

    async fn post_json<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<String, GenerationError> {
        let url = self.endpoint(path);
        debug!(%url, model = %self.model, "sending generation request");

        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        let text = response.text().await.map_err(|e| self.transport_error(e))?;
        if !status.is_success() {
            return Err(GenerationError::Status {
                status: status.as_u16(),
                body: text,
            });
        }
        Ok(text)
    }

    fn transport_error(&self, err: reqwest::Error) -> GenerationError {
        if err.is_timeout() {
            GenerationError::Timeout(self.timeout)
        } else {
            GenerationError::Unreachable(err.to_string())
        }
    }
}

#[async_trait]
impl GenerationBackend for OllamaBackend {
    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &Prompt) -> Result<String, GenerationError> {
        match self.api_mode {
            ApiMode::Chat => {
                let request = ChatRequest {
                    model: &self.model,
                    messages: prompt.messages(),
                    stream: false,
                    options: self.options(),
                };
                let body = self.post_json("chat", &request).await?;
                extract_chat_text(&body)
            }
            ApiMode::Generate => {
                let request = GenerateRequest {
                    model: &self.model,
                    prompt: prompt.to_completion_text(),
                    stream: false,
                    options: self.options(),
                };
                let body = self.post_json("generate", &request).await?;
                extract_generate_text(&body)
            }
        }
    }

    async fn health_check(&self) -> Result<(), GenerationError> {
        let response = self
            .client
            .get(self.endpoint("tags"))
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(GenerationError::Status {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            })
        }
    }
}

fn extract_chat_text(body: &str) -> Result<String, GenerationError> {
    let envelope: ChatResponse =
        serde_json::from_str(body).map_err(|e| GenerationError::Malformed(e.to_string()))?;
    let message = envelope
        .message
        .ok_or_else(|| GenerationError::Malformed("missing 'message' field".into()))?;
    non_blank(message.content)
}

fn extract_generate_text(body: &str) -> Result<String, GenerationError> {
    let envelope: GenerateResponse =
        serde_json::from_str(body).map_err(|e| GenerationError::Malformed(e.to_string()))?;
    let text = envelope
        .response
        .ok_or_else(|| GenerationError::Malformed("missing 'response' field".into()))?;
    non_blank(text)
}

fn non_blank(text: String) -> Result<String, GenerationError> {
    if text.trim().is_empty() {
        Err(GenerationError::EmptyResponse)
    } else {
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_envelope_yields_message_content() {
        let body = r#"{"model":"llama3.2:1b","message":{"role":"assistant","content":" 4 \n"},"done":true}"#;
        assert_eq!(extract_chat_text(body).unwrap(), " 4 \n");
    }

    #[test]
    fn generate_envelope_yields_response_field() {
        let body = r#"{"model":"llama3.2:1b","response":"Four.","done":true,"eval_count":3}"#;
        assert_eq!(extract_generate_text(body).unwrap(), "Four.");
    }

    #[test]
    fn non_json_body_is_malformed() {
        let err = extract_chat_text("<html>bad gateway</html>").unwrap_err();
        assert!(matches!(err, GenerationError::Malformed(_)));
    }

    #[test]
    fn missing_text_field_is_malformed() {
        let err = extract_chat_text(r#"{"done":true}"#).unwrap_err();
        assert!(matches!(err, GenerationError::Malformed(_)));

        let err = extract_generate_text(r#"{"done":true}"#).unwrap_err();
        assert!(matches!(err, GenerationError::Malformed(_)));
    }

    #[test]
    fn blank_text_is_empty_response() {
        let err = extract_generate_text(r#"{"response":"   "}"#).unwrap_err();
        assert!(matches!(err, GenerationError::EmptyResponse));
    }

    #[test]
    fn options_are_omitted_when_unset() {
        let backend = OllamaBackend::new(&AppConfig::default()).unwrap();
        assert!(backend.options().is_none());

        let prompt = Prompt::for_query("hi");
        let request = ChatRequest {
            model: backend.model(),
            messages: prompt.messages(),
            stream: false,
            options: backend.options(),
        };
        let value = serde_json::to_value(&request).unwrap();
        assert!(value.get("options").is_none());
        assert_eq!(value["stream"], false);
        assert_eq!(value["model"], "llama3.2:1b");
    }

    #[test]
    fn configured_options_are_forwarded() {
        let config = AppConfig {
            temperature: Some(0.3),
            max_new_tokens: Some(128),
            ..AppConfig::default()
        };
        let backend = OllamaBackend::new(&config).unwrap();
        let value = serde_json::to_value(backend.options()).unwrap();
        assert_eq!(value["temperature"], 0.3);
        assert_eq!(value["num_predict"], 128);
    }
}

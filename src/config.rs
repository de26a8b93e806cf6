use std::{env, net::SocketAddr, path::PathBuf, str::FromStr, time::Duration};

use anyhow::{Context, anyhow};

/// Which Ollama endpoint the backend talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiMode {
    /// `/api/chat`, roles sent as separate messages.
    Chat,
    /// `/api/generate`, roles flattened into a single prompt string.
    Generate,
}

impl FromStr for ApiMode {
    type Err = anyhow::Error;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_lowercase().as_str() {
            "chat" => Ok(ApiMode::Chat),
            "generate" => Ok(ApiMode::Generate),
            other => Err(anyhow!("unknown api mode '{other}', expected 'chat' or 'generate'")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub listen_addr: SocketAddr,
    pub ollama_base_url: String,
    pub model: String,
    pub api_mode: ApiMode,
    pub request_timeout: Duration,
    pub max_retries: u32,
    pub temperature: Option<f64>,
    pub max_new_tokens: Option<u32>,
    pub static_dir: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([127, 0, 0, 1], 8000)),
            ollama_base_url: "http://127.0.0.1:11434".to_string(),
            model: "llama3.2:1b".to_string(),
            api_mode: ApiMode::Chat,
            request_timeout: Duration::from_secs(120),
            max_retries: 0,
            temperature: None,
            max_new_tokens: None,
            static_dir: PathBuf::from("static"),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup. Unset keys fall back to
    /// defaults; set but unparseable keys are errors.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let listen_addr = parse_var(&lookup, "SERVER_ADDR")?.unwrap_or(defaults.listen_addr);

        let ollama_base_url = match lookup("OLLAMA_BASE_URL") {
            Some(raw) => {
                reqwest::Url::parse(raw.trim())
                    .with_context(|| format!("OLLAMA_BASE_URL is not a valid url: {raw}"))?;
                raw.trim().trim_end_matches('/').to_string()
            }
            None => defaults.ollama_base_url,
        };

        let model = lookup("OLLAMA_MODEL")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or(defaults.model);
        let api_mode = parse_var(&lookup, "OLLAMA_API")?.unwrap_or(defaults.api_mode);

        let request_timeout = parse_var::<u64, _>(&lookup, "GENERATION_TIMEOUT_SECS")?
            .map(Duration::from_secs)
            .unwrap_or(defaults.request_timeout);
        if request_timeout.is_zero() {
            return Err(anyhow!("GENERATION_TIMEOUT_SECS must be greater than zero"));
        }
        let max_retries = parse_var(&lookup, "GENERATION_RETRIES")?.unwrap_or(defaults.max_retries);

        let temperature = parse_var(&lookup, "TEMPERATURE")?;
        let max_new_tokens = parse_var(&lookup, "MAX_NEW_TOKENS")?;

        let static_dir = lookup("STATIC_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.static_dir);

        Ok(Self {
            listen_addr,
            ollama_base_url,
            model,
            api_mode,
            request_timeout,
            max_retries,
            temperature,
            max_new_tokens,
            static_dir,
        })
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> anyhow::Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| anyhow!("invalid value for {key} ('{raw}'): {e}")),
    }
}

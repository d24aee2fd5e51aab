//! Shared error type, configuration and canned prompt data for the load generator.

pub type Result<T> = core::result::Result<T, LoadgenError>;

#[derive(thiserror::Error, Debug)]
pub enum LoadgenError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("failed to read config file {path}: {source}")]
    ConfigFile {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] serde_yaml::Error),
    #[error("{0}")]
    Message(String),
}

/// Which OpenAI-style streaming endpoint the harness targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Endpoint {
    #[default]
    Chat,
    Completion,
}

impl Endpoint {
    pub fn path(self) -> &'static str {
        match self {
            Endpoint::Chat => "/v1/chat/completions",
            Endpoint::Completion => "/v1/completions",
        }
    }

    /// Full request URL; a trailing slash on `base_url` is dropped.
    pub fn url(self, base_url: &str) -> String {
        format!("{}{}", base_url.trim_end_matches('/'), self.path())
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.path())
    }
}

pub mod prompts {
    pub const SYSTEM_PROMPT: &str = "You are a helpful assistant. Keep responses brief.";

    pub const DEFAULT_PROMPTS: &[&str] = &[
        "Explain what an LLM is in one sentence.",
        "Give a 3-bullet checklist for debugging Kubernetes pods.",
        "Write a haiku about GPUs.",
        "What does vLLM do?",
        "Explain concurrency in simple terms.",
    ];

    /// Prompt for the simulated client at `index`. Callers guarantee `prompts` is non-empty.
    pub fn select(prompts: &[String], index: usize) -> &str {
        &prompts[index % prompts.len()]
    }
}

pub mod config {
    use serde::Deserialize;
    use std::env;
    use std::path::Path;

    use crate::prompts::{DEFAULT_PROMPTS, SYSTEM_PROMPT};
    use crate::{Endpoint, LoadgenError, Result};

    #[derive(Debug, Clone, Deserialize)]
    #[serde(default)]
    pub struct HarnessConfig {
        pub base_url: String,
        pub model: Option<String>,
        pub concurrency: usize,
        pub max_tokens: u32,
        pub temperature: f64,
        pub timeout_secs: u64,
        pub api_key: Option<String>,
        pub endpoint: Endpoint,
        pub debug: bool,
        pub prompts: Vec<String>,
        pub system_prompt: String,
    }

    impl Default for HarnessConfig {
        fn default() -> Self {
            Self {
                base_url: "http://localhost:8000".into(),
                model: None,
                concurrency: 10,
                max_tokens: 2048,
                temperature: 0.2,
                timeout_secs: 120,
                api_key: None,
                endpoint: Endpoint::Chat,
                debug: false,
                prompts: DEFAULT_PROMPTS.iter().map(|p| p.to_string()).collect(),
                system_prompt: SYSTEM_PROMPT.into(),
            }
        }
    }

    impl HarnessConfig {
        /// Loads from `LOADGEN_CONFIG` when set, otherwise defaults with `LOADGEN_*` overrides.
        pub fn load() -> Result<Self> {
            if let Ok(path) = env::var("LOADGEN_CONFIG") {
                return Self::from_file(path);
            }
            let mut cfg = Self::default();
            if let Ok(url) = env::var("LOADGEN_BASE_URL") { cfg.base_url = url; }
            if let Ok(model) = env::var("LOADGEN_MODEL") { cfg.model = Some(model); }
            if let Ok(key) = env::var("LOADGEN_API_KEY") { cfg.api_key = Some(key); }
            if let Some(v) = env::var("LOADGEN_CONCURRENCY").ok().and_then(|v| v.parse().ok()) { cfg.concurrency = v; }
            if let Some(v) = env::var("LOADGEN_TIMEOUT_SECS").ok().and_then(|v| v.parse().ok()) { cfg.timeout_secs = v; }
            Ok(cfg)
        }

        pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
            let path = path.as_ref();
            let text = std::fs::read_to_string(path).map_err(|source| LoadgenError::ConfigFile {
                path: path.display().to_string(),
                source,
            })?;
            Self::from_yaml(&text)
        }

        pub fn from_yaml(text: &str) -> Result<Self> {
            Ok(serde_yaml::from_str(text)?)
        }

        /// Empty API keys are treated as absent.
        pub fn api_key(&self) -> Option<&str> {
            self.api_key.as_deref().filter(|k| !k.is_empty())
        }

        pub fn url(&self) -> String {
            self.endpoint.url(&self.base_url)
        }

        pub fn validate(&self) -> Result<()> {
            if self.concurrency < 1 {
                return Err(LoadgenError::InvalidConfig("concurrency must be >= 1".into()));
            }
            if self.prompts.is_empty() {
                return Err(LoadgenError::InvalidConfig("at least one prompt is required".into()));
            }
            if self.timeout_secs == 0 {
                return Err(LoadgenError::InvalidConfig("timeout must be >= 1 second".into()));
            }
            if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
                return Err(LoadgenError::InvalidConfig(format!(
                    "base url must start with http:// or https://, got {}",
                    self.base_url
                )));
            }
            Ok(())
        }
    }
}

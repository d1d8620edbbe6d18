//! Configuration for the chat service.
//!
//! Values come from environment variables (see the `ENV_*` constants). The
//! policy is strict: absent optional values take their documented default,
//! while malformed or out-of-range values are rejected so startup fails.
//! Zero is never treated as "unset".

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::chat::core::errors::{ChatError, ChatResult};

/// Default `OpenAI`-compatible endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.together.xyz/v1";
/// Default completion model.
pub const DEFAULT_MODEL: &str = "meta-llama/Llama-Vision-Free";
/// Default sampling temperature.
pub const DEFAULT_TEMPERATURE: f64 = 0.7;
/// Default completion length.
pub const DEFAULT_MAX_TOKENS: u32 = 512;
/// Default history budget in tokens.
pub const DEFAULT_TOKEN_BUDGET: usize = 4096;
/// Lower bound for `max_tokens`.
pub const MIN_MAX_TOKENS: u32 = 10;
/// Upper bound for `max_tokens`.
pub const MAX_MAX_TOKENS: u32 = 512;

/// API key variable.
pub const ENV_API_KEY: &str = "SCIENTIA_API_KEY";
/// Fallback API key variable for Together deployments.
pub const ENV_API_KEY_FALLBACK: &str = "TOGETHER_API_KEY";
/// Base URL variable.
pub const ENV_BASE_URL: &str = "SCIENTIA_BASE_URL";
/// Model variable.
pub const ENV_MODEL: &str = "SCIENTIA_MODEL";
/// Temperature variable.
pub const ENV_TEMPERATURE: &str = "SCIENTIA_TEMPERATURE";
/// Max tokens variable.
pub const ENV_MAX_TOKENS: &str = "SCIENTIA_MAX_TOKENS";
/// Token budget variable.
pub const ENV_TOKEN_BUDGET: &str = "SCIENTIA_TOKEN_BUDGET";
/// Completion timeout variable, in seconds.
pub const ENV_REQUEST_TIMEOUT_SECS: &str = "SCIENTIA_REQUEST_TIMEOUT_SECS";
/// HTTP port variable.
pub const ENV_PORT: &str = "SCIENTIA_PORT";
/// Static UI directory variable.
pub const ENV_STATIC_DIR: &str = "SCIENTIA_STATIC_DIR";
/// Session store capacity variable.
pub const ENV_SESSION_CAPACITY: &str = "SCIENTIA_SESSION_CAPACITY";
/// Metadata endpoint variable.
pub const ENV_METADATA_URL: &str = "SCIENTIA_METADATA_URL";
/// Metadata lookup switch variable.
pub const ENV_METADATA_ENABLED: &str = "SCIENTIA_METADATA_ENABLED";

/// Top-level configuration for the service.
#[derive(Clone, Debug)]
pub struct AppConfig {
    /// Completion endpoint settings.
    pub llm: LlmConfig,
    /// Generation parameters applied to new sessions.
    pub generation: GenerationConfig,
    /// HTTP server settings.
    pub server: ServerConfig,
    /// Instance metadata lookup settings.
    pub metadata: MetadataConfig,
}

impl AppConfig {
    /// Load configuration from the process environment.
    ///
    /// # Errors
    /// Returns an error if a required value is missing or any value is invalid.
    pub fn from_env() -> ChatResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    ///
    /// # Errors
    /// Returns an error if a required value is missing or any value is invalid.
    pub fn from_lookup<F>(lookup: F) -> ChatResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = read_string(&lookup, ENV_API_KEY)
            .or_else(|| read_string(&lookup, ENV_API_KEY_FALLBACK))
            .ok_or_else(|| {
                ChatError::InvalidConfig(format!(
                    "{ENV_API_KEY} (or {ENV_API_KEY_FALLBACK}) must be set"
                ))
            })?;

        let mut llm = LlmConfig::new(api_key);
        if let Some(base_url) = read_string(&lookup, ENV_BASE_URL) {
            llm.base_url = base_url;
        }
        if let Some(secs) = read_parsed::<u64, _>(&lookup, ENV_REQUEST_TIMEOUT_SECS)? {
            llm.request_timeout = Duration::from_secs(secs);
        }

        let mut generation = GenerationConfig::default();
        if let Some(model) = read_string(&lookup, ENV_MODEL) {
            generation.model = model;
        }
        if let Some(temperature) = read_parsed(&lookup, ENV_TEMPERATURE)? {
            generation.temperature = temperature;
        }
        if let Some(max_tokens) = read_parsed(&lookup, ENV_MAX_TOKENS)? {
            generation.max_tokens = max_tokens;
        }
        if let Some(budget) = read_parsed(&lookup, ENV_TOKEN_BUDGET)? {
            generation.token_budget = budget;
        }

        let mut server = ServerConfig::default();
        if let Some(port) = read_parsed(&lookup, ENV_PORT)? {
            server.port = port;
        }
        if let Some(dir) = read_string(&lookup, ENV_STATIC_DIR) {
            server.static_dir = PathBuf::from(dir);
        }
        if let Some(capacity) = read_parsed(&lookup, ENV_SESSION_CAPACITY)? {
            server.session_capacity = capacity;
        }

        let mut metadata = MetadataConfig::default();
        if let Some(endpoint) = read_string(&lookup, ENV_METADATA_URL) {
            metadata.endpoint = endpoint;
        }
        if let Some(enabled) = read_parsed(&lookup, ENV_METADATA_ENABLED)? {
            metadata.enabled = enabled;
        }

        let config = Self {
            llm,
            generation,
            server,
            metadata,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration invariants.
    ///
    /// # Errors
    /// Returns an error if any values are out of range or invalid.
    pub fn validate(&self) -> ChatResult<()> {
        self.llm.validate()?;
        self.generation.validate()?;

        if self.server.session_capacity == 0 {
            return Err(ChatError::InvalidConfig(
                "session_capacity must be > 0".to_string(),
            ));
        }

        if self.metadata.enabled {
            Url::parse(&self.metadata.endpoint)?;
        }

        Ok(())
    }
}

/// Completion endpoint settings.
#[derive(Clone)]
pub struct LlmConfig {
    /// Bearer credential.
    pub api_key: String,
    /// Base URL; `/chat/completions` is appended.
    pub base_url: String,
    /// Whole-request timeout for completions.
    pub request_timeout: Duration,
    /// TCP connect timeout.
    pub connect_timeout: Duration,
}

impl LlmConfig {
    /// Settings for `api_key` with default endpoint and timeouts.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(120),
            connect_timeout: Duration::from_secs(10),
        }
    }

    /// Point the client at another endpoint.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set the request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Validate endpoint settings.
    ///
    /// # Errors
    /// Returns an error if the key is blank, the URL is invalid or a timeout is zero.
    pub fn validate(&self) -> ChatResult<()> {
        if self.api_key.trim().is_empty() {
            return Err(ChatError::InvalidConfig("api_key must not be empty".to_string()));
        }
        Url::parse(&self.base_url)?;
        if self.request_timeout.is_zero() || self.connect_timeout.is_zero() {
            return Err(ChatError::InvalidConfig(
                "timeouts must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

impl fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("request_timeout", &self.request_timeout)
            .field("connect_timeout", &self.connect_timeout)
            .finish()
    }
}

/// Generation parameters sent with every completion request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Sampling temperature in `[0, 1]`.
    pub temperature: f64,
    /// Completion length in `[10, 512]`.
    pub max_tokens: u32,
    /// Model identifier.
    pub model: String,
    /// History budget in tokens.
    pub token_budget: usize,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            model: DEFAULT_MODEL.to_string(),
            token_budget: DEFAULT_TOKEN_BUDGET,
        }
    }
}

impl GenerationConfig {
    /// Validate parameter ranges.
    ///
    /// # Errors
    /// Returns an error if any parameter is out of range.
    pub fn validate(&self) -> ChatResult<()> {
        if !(0.0..=1.0).contains(&self.temperature) {
            return Err(ChatError::InvalidConfig(format!(
                "temperature must be within [0, 1], got {}",
                self.temperature
            )));
        }

        if !(MIN_MAX_TOKENS..=MAX_MAX_TOKENS).contains(&self.max_tokens) {
            return Err(ChatError::InvalidConfig(format!(
                "max_tokens must be within [{MIN_MAX_TOKENS}, {MAX_MAX_TOKENS}], got {}",
                self.max_tokens
            )));
        }

        if self.model.trim().is_empty() {
            return Err(ChatError::InvalidConfig("model must not be empty".to_string()));
        }

        if self.token_budget == 0 {
            return Err(ChatError::InvalidConfig(
                "token_budget must be > 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Copy of `self` with the fields present in `update` replaced.
    #[must_use]
    pub fn merged(&self, update: &ConfigUpdate) -> Self {
        Self {
            temperature: update.temperature.unwrap_or(self.temperature),
            max_tokens: update.max_tokens.unwrap_or(self.max_tokens),
            model: update.model.clone().unwrap_or_else(|| self.model.clone()),
            token_budget: update.token_budget.unwrap_or(self.token_budget),
        }
    }
}

/// Partial edit of a [`GenerationConfig`]; absent fields are left unchanged.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigUpdate {
    /// New temperature.
    #[serde(default)]
    pub temperature: Option<f64>,
    /// New completion length.
    #[serde(default)]
    pub max_tokens: Option<u32>,
    /// New model.
    #[serde(default)]
    pub model: Option<String>,
    /// New history budget.
    #[serde(default)]
    pub token_budget: Option<usize>,
}

impl ConfigUpdate {
    /// Whether the update names no field at all.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.temperature.is_none()
            && self.max_tokens.is_none()
            && self.model.is_none()
            && self.token_budget.is_none()
    }
}

/// HTTP server settings.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Listening port.
    pub port: u16,
    /// Directory served at `/`.
    pub static_dir: PathBuf,
    /// Maximum number of live sessions kept in memory.
    pub session_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            static_dir: PathBuf::from("static"),
            session_capacity: 256,
        }
    }
}

/// Instance metadata lookup settings.
#[derive(Clone, Debug)]
pub struct MetadataConfig {
    /// Whether to query the metadata service at all.
    pub enabled: bool,
    /// Metadata service root.
    pub endpoint: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: "http://169.254.169.254".to_string(),
            timeout: Duration::from_secs(1),
        }
    }
}

fn read_string<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn read_parsed<T, F>(lookup: &F, key: &str) -> ChatResult<Option<T>>
where
    T: FromStr,
    T::Err: fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    read_string(lookup, key)
        .map(|raw| {
            raw.parse::<T>()
                .map_err(|err| ChatError::InvalidConfig(format!("{key}={raw:?}: {err}")))
        })
        .transpose()
}

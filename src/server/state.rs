//! Application state shared across all request handlers.

use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};

use crate::chat::core::config::{AppConfig, GenerationConfig};
use crate::instance::InstanceIdentity;
use crate::llm::completion::{CompletionClient, OpenAiCompatClient};
use crate::llm::error::CompletionError;
use crate::llm::tokenizer::{TiktokenCounter, TokenCounter};

use super::sessions::SessionStore;

/// Shared application state.
pub struct AppState {
    /// Live chat sessions.
    pub sessions: SessionStore,
    /// Completion backend.
    pub client: Arc<dyn CompletionClient>,
    /// Directory served as the web UI.
    pub static_dir: PathBuf,
    instance: InstanceIdentity,
    instance_id: OnceLock<String>,
}

impl AppState {
    /// Build state from configuration.
    ///
    /// # Errors
    /// Returns an error if the completion client cannot be created.
    pub fn new(config: &AppConfig) -> Result<Arc<Self>, CompletionError> {
        let client = OpenAiCompatClient::new(&config.llm)?;
        tracing::info!(endpoint = client.endpoint(), model = %config.generation.model, "completion client ready");

        Ok(Self::with_parts(
            Arc::new(client),
            Arc::new(TiktokenCounter::new()),
            InstanceIdentity::new(&config.metadata),
            config.generation.clone(),
            config.server.session_capacity,
            config.server.static_dir.clone(),
        ))
    }

    /// Assemble state from explicit parts.
    #[must_use]
    pub fn with_parts(
        client: Arc<dyn CompletionClient>,
        counter: Arc<dyn TokenCounter>,
        instance: InstanceIdentity,
        defaults: GenerationConfig,
        session_capacity: usize,
        static_dir: PathBuf,
    ) -> Arc<Self> {
        let capacity = NonZeroUsize::new(session_capacity).unwrap_or(NonZeroUsize::MIN);
        Arc::new(Self {
            sessions: SessionStore::new(capacity, defaults, counter),
            client,
            static_dir,
            instance,
            instance_id: OnceLock::new(),
        })
    }

    /// Instance id, resolved at most once per process. Blocking.
    pub fn instance_id(&self) -> &str {
        self.instance_id.get_or_init(|| self.instance.instance_id())
    }
}

//! Core chat types: messages, identifiers, configuration and errors.

pub mod config;
pub mod errors;
pub mod ids;
pub mod message;

pub use config::{
    AppConfig, ConfigUpdate, GenerationConfig, LlmConfig, MetadataConfig, ServerConfig,
};
pub use errors::{ChatError, ChatResult};
pub use ids::SessionId;
pub use message::{Message, Role};

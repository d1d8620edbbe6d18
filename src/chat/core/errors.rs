//! Error types for the chat core.

use thiserror::Error;

/// Chat core error type.
#[derive(Debug, Error)]
pub enum ChatError {
    /// Invalid configuration or unsupported values.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// The default room cannot be deleted.
    #[error("room '{0}' is protected and cannot be deleted")]
    ProtectedRoom(String),
    /// No room with this name exists.
    #[error("room not found: {0}")]
    RoomNotFound(String),
    /// A room with this name already exists.
    #[error("room already exists: {0}")]
    RoomExists(String),
    /// A room name that cannot be used, such as a blank one.
    #[error("invalid room name: {0}")]
    InvalidRoomName(String),
    /// Personality lookup miss.
    #[error("unknown personality: {0}")]
    UnknownPersonality(String),
    /// A conversation holds exactly one system message, at index 0.
    #[error("system messages cannot be appended; use set_system_prompt")]
    SystemMessageAppend,
    /// URL parse error.
    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),
}

/// Convenience result alias for chat operations.
pub type ChatResult<T> = Result<T, ChatError>;

//! LLM-facing components.

pub mod completion;
pub mod error;
pub mod tokenizer;

pub use completion::{CompletionClient, OpenAiCompatClient};
pub use error::CompletionError;
pub use tokenizer::{TiktokenCounter, TokenCounter, approximate_tokens};

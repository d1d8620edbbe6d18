//! Model-aware token counting.
//!
//! Models known to `tiktoken-rs` use their own BPE encoding; everything else
//! (Llama, Mistral and other remote models) is counted with `cl100k_base`,
//! which is close enough for budget enforcement. Counting never fails: if no
//! encoding can be loaded, a length/4 approximation is used instead.

use std::sync::Arc;

use dashmap::DashMap;
use tiktoken_rs::CoreBPE;
use tiktoken_rs::tokenizer::{Tokenizer, get_tokenizer};

/// Encoding used for models `tiktoken-rs` does not recognise.
pub const DEFAULT_ENCODING: Tokenizer = Tokenizer::Cl100kBase;

/// Token counting strategy.
///
/// Implementations must be deterministic: the same `(model, content)` pair
/// always yields the same count.
pub trait TokenCounter: Send + Sync {
    /// Count the tokens of `content` as seen by `model`.
    fn count_tokens(&self, model: &str, content: &str) -> usize;
}

/// `tiktoken-rs` backed counter with a per-encoding cache.
#[derive(Default)]
pub struct TiktokenCounter {
    encodings: DashMap<String, Arc<CoreBPE>>,
}

impl TiktokenCounter {
    /// Create a counter with an empty encoding cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve the encoding for `model`, loading and caching it on first use.
    fn encoding_for(&self, model: &str) -> Option<Arc<CoreBPE>> {
        let tokenizer = get_tokenizer(model).unwrap_or(DEFAULT_ENCODING);
        let key = format!("{tokenizer:?}");

        if let Some(bpe) = self.encodings.get(&key) {
            return Some(Arc::clone(bpe.value()));
        }

        match tiktoken_rs::get_bpe_from_tokenizer(tokenizer) {
            Ok(bpe) => {
                let bpe = Arc::new(bpe);
                self.encodings.insert(key, Arc::clone(&bpe));
                tracing::debug!(model, encoding = ?tokenizer, "loaded tokenizer encoding");
                Some(bpe)
            }
            Err(err) => {
                tracing::warn!(model, "failed to load tokenizer encoding, approximating: {err}");
                None
            }
        }
    }
}

impl TokenCounter for TiktokenCounter {
    fn count_tokens(&self, model: &str, content: &str) -> usize {
        self.encoding_for(model).map_or_else(
            || approximate_tokens(content),
            |bpe| bpe.encode_ordinary(content).len(),
        )
    }
}

/// Character-based estimate: one token per four bytes, rounded up.
#[must_use]
pub const fn approximate_tokens(text: &str) -> usize {
    text.len().div_ceil(4)
}

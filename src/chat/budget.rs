//! Token budget enforcement.

use serde::Serialize;

use crate::chat::state::ConversationState;
use crate::llm::tokenizer::TokenCounter;

/// Outcome of one enforcement pass.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
pub struct BudgetReport {
    /// Messages evicted during this pass.
    pub evicted: usize,
    /// Token total after the pass.
    pub total_tokens: usize,
    /// Budget the pass enforced.
    pub budget: usize,
    /// Only the system message remains and it alone exceeds the budget.
    pub over_budget: bool,
}

/// Evict the oldest non-system messages until the history fits `budget`.
///
/// Stops early when only the system message is left, even if that message
/// alone exceeds the budget. Surviving messages keep their order and content.
pub fn enforce_budget(
    state: &mut ConversationState,
    counter: &dyn TokenCounter,
    model: &str,
    budget: usize,
) -> BudgetReport {
    let mut evicted = 0;
    let mut total = state.total_tokens(counter, model);

    while total > budget {
        let Some(message) = state.evict_oldest() else {
            break;
        };
        evicted += 1;
        tracing::debug!(
            role = %message.role(),
            total,
            budget,
            "evicted oldest message to fit token budget"
        );
        total = state.total_tokens(counter, model);
    }

    let over_budget = total > budget;
    if over_budget {
        tracing::warn!(
            total,
            budget,
            "system message alone exceeds the token budget; sending it anyway"
        );
    }

    BudgetReport {
        evicted,
        total_tokens: total,
        budget,
        over_budget,
    }
}

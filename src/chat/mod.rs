//! Conversation core.
//!
//! Layout:
//! - `core`: messages, identifiers, configuration, errors
//! - `state`: one room's message history
//! - `budget`: FIFO eviction against a token budget
//! - `personality`: closed set of system prompts
//! - `rooms`: named rooms with an active pointer
//! - `session`: explicit per-user session running the turn sequence

pub mod budget;
pub mod core;
pub mod personality;
pub mod rooms;
pub mod session;
pub mod state;

pub use budget::{BudgetReport, enforce_budget};
pub use personality::{Personality, PersonalityDefinition, PersonalityRegistry};
pub use rooms::{DEFAULT_ROOM, GREETING, Room, RoomRegistry, RoomSummary};
pub use session::{ChatSession, GENERATION_FAILED_NOTICE, TurnOutcome};
pub use state::ConversationState;

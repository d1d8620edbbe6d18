//! Per-user chat session: rooms, generation settings and the turn sequence.
//!
//! A session is an explicit value handed to every operation. It is not
//! thread-safe on its own; the server wraps each one in a mutex so that one
//! turn finishes before the next starts.

use std::sync::Arc;

use chrono::{DateTime, Local};
use serde::Serialize;

use crate::chat::budget::{BudgetReport, enforce_budget};
use crate::chat::core::config::{ConfigUpdate, GenerationConfig};
use crate::chat::core::errors::{ChatError, ChatResult};
use crate::chat::personality::Personality;
use crate::chat::rooms::{Room, RoomRegistry};
use crate::export::{ExportError, ExportFormat, ExportedFile, export_transcript};
use crate::llm::completion::CompletionClient;
use crate::llm::tokenizer::TokenCounter;

/// Notice shown to users when no reply could be produced.
pub const GENERATION_FAILED_NOTICE: &str = "Could not generate a response";

/// Result of one user turn.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TurnOutcome {
    /// The assistant replied; the reply is now part of the history.
    Replied {
        /// Assistant reply.
        reply: String,
        /// Budget pass run before the request.
        budget: BudgetReport,
    },
    /// The request failed; only the user message was recorded.
    Failed {
        /// User-facing notice.
        error: String,
        /// Underlying cause.
        detail: String,
        /// Budget pass run before the request.
        budget: BudgetReport,
    },
}

impl TurnOutcome {
    /// Whether the turn produced a reply.
    #[must_use]
    pub const fn is_reply(&self) -> bool {
        matches!(self, Self::Replied { .. })
    }
}

/// One user's rooms and settings.
pub struct ChatSession {
    rooms: RoomRegistry,
    config: GenerationConfig,
    staged: Option<GenerationConfig>,
    counter: Arc<dyn TokenCounter>,
}

impl ChatSession {
    /// Create a session with only the default room.
    #[must_use]
    pub fn new(config: GenerationConfig, counter: Arc<dyn TokenCounter>) -> Self {
        Self {
            rooms: RoomRegistry::default(),
            config,
            staged: None,
            counter,
        }
    }

    /// Run one turn in the active room.
    ///
    /// Appends the user message, enforces the budget, requests a completion
    /// and appends the reply on success. On failure nothing beyond the user
    /// message is recorded.
    pub fn send_message(
        &mut self,
        client: &dyn CompletionClient,
        text: impl Into<String>,
    ) -> TurnOutcome {
        let config = &self.config;
        let room = self.rooms.get_active_mut();
        let state = room.state_mut();

        state.push_user(text);
        let budget = enforce_budget(
            state,
            self.counter.as_ref(),
            &config.model,
            config.token_budget,
        );

        match client.complete(state.messages(), config) {
            Ok(reply) => {
                state.push_assistant(reply.as_str());
                tracing::info!(
                    room = room.name(),
                    evicted = budget.evicted,
                    tokens = budget.total_tokens,
                    "turn completed"
                );
                TurnOutcome::Replied { reply, budget }
            }
            Err(err) => {
                tracing::warn!(room = room.name(), "completion failed: {err}");
                TurnOutcome::Failed {
                    error: GENERATION_FAILED_NOTICE.to_string(),
                    detail: err.to_string(),
                    budget,
                }
            }
        }
    }

    /// Room registry.
    #[must_use]
    pub const fn rooms(&self) -> &RoomRegistry {
        &self.rooms
    }

    /// Active room.
    #[must_use]
    pub fn active_room(&self) -> &Room {
        self.rooms.get_active()
    }

    /// Create a room and make it active.
    ///
    /// # Errors
    /// Returns an error if the name is blank or taken.
    pub fn create_room(&mut self, name: Option<&str>) -> ChatResult<String> {
        let name = self.rooms.create(name)?.name().to_string();
        self.rooms.set_active(&name)?;
        tracing::info!(room = %name, "room created");
        Ok(name)
    }

    /// Delete a room.
    ///
    /// # Errors
    /// Returns an error for the protected default room or an unknown name.
    pub fn delete_room(&mut self, name: &str) -> ChatResult<()> {
        self.rooms.delete(name)?;
        tracing::info!(room = %name, "room deleted");
        Ok(())
    }

    /// Make another room active.
    ///
    /// # Errors
    /// Returns an error for an unknown name.
    pub fn switch_room(&mut self, name: &str) -> ChatResult<()> {
        self.rooms.set_active(name)
    }

    /// Clear the active room down to its system prompt.
    pub fn reset_room(&mut self) {
        self.rooms.get_active_mut().state_mut().reset();
    }

    /// Switch the active room's personality. Other rooms are untouched.
    pub fn set_personality(&mut self, personality: Personality) {
        self.rooms.get_active_mut().set_personality(personality);
    }

    /// Settings used by requests and budget enforcement.
    #[must_use]
    pub const fn config(&self) -> &GenerationConfig {
        &self.config
    }

    /// Settings edited but not yet applied.
    #[must_use]
    pub const fn staged_config(&self) -> Option<&GenerationConfig> {
        self.staged.as_ref()
    }

    /// Whether staged settings differ from applied ones.
    #[must_use]
    pub fn has_pending_changes(&self) -> bool {
        self.staged
            .as_ref()
            .is_some_and(|staged| *staged != self.config)
    }

    /// Stage a settings edit on top of any previously staged one.
    ///
    /// # Errors
    /// Returns an error if the update names no field or the resulting
    /// settings are out of range; the previous staged settings are kept in
    /// both cases.
    pub fn stage_config(&mut self, update: &ConfigUpdate) -> ChatResult<&GenerationConfig> {
        if update.is_empty() {
            return Err(ChatError::InvalidConfig(
                "update names no setting to change".to_string(),
            ));
        }
        let base = self.staged.as_ref().unwrap_or(&self.config);
        let candidate = base.merged(update);
        candidate.validate()?;
        Ok(self.staged.insert(candidate))
    }

    /// Commit staged settings. Without staged settings this is a no-op.
    pub fn apply_config(&mut self) -> &GenerationConfig {
        if let Some(staged) = self.staged.take() {
            tracing::info!(
                temperature = staged.temperature,
                max_tokens = staged.max_tokens,
                model = %staged.model,
                token_budget = staged.token_budget,
                "generation settings applied"
            );
            self.config = staged;
        }
        &self.config
    }

    /// Drop staged settings.
    pub fn discard_staged(&mut self) {
        self.staged = None;
    }

    /// Token total of the active room under the applied model.
    #[must_use]
    pub fn total_tokens(&self) -> usize {
        self.active_room()
            .state()
            .total_tokens(self.counter.as_ref(), &self.config.model)
    }

    /// Export the active room's transcript.
    ///
    /// # Errors
    /// Returns an error if the document cannot be rendered.
    pub fn export(&self, format: ExportFormat) -> Result<ExportedFile, ExportError> {
        self.export_at(format, Local::now())
    }

    /// Export the active room's transcript stamped with `now`.
    ///
    /// # Errors
    /// Returns an error if the document cannot be rendered.
    pub fn export_at(
        &self,
        format: ExportFormat,
        now: DateTime<Local>,
    ) -> Result<ExportedFile, ExportError> {
        let room = self.active_room();
        export_transcript(room.state().messages(), room.name(), format, now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::core::message::{Message, Role};
    use crate::chat::rooms::{DEFAULT_ROOM, GREETING};
    use crate::chat::state::tests::FlatCounter;
    use crate::llm::error::CompletionError;
    use std::sync::Mutex;

    /// Replies with a fixed text and records what it was sent.
    struct EchoClient {
        reply: String,
        seen: Mutex<Vec<(Vec<Message>, GenerationConfig)>>,
    }

    impl EchoClient {
        fn new(reply: &str) -> Self {
            Self {
                reply: reply.to_string(),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    impl CompletionClient for EchoClient {
        fn complete(
            &self,
            history: &[Message],
            config: &GenerationConfig,
        ) -> Result<String, CompletionError> {
            self.seen
                .lock()
                .unwrap()
                .push((history.to_vec(), config.clone()));
            Ok(self.reply.clone())
        }
    }

    struct DownClient;

    impl CompletionClient for DownClient {
        fn complete(
            &self,
            _history: &[Message],
            _config: &GenerationConfig,
        ) -> Result<String, CompletionError> {
            Err(CompletionError::Timeout)
        }
    }

    fn session_with(counter: usize, budget: usize) -> ChatSession {
        let config = GenerationConfig {
            token_budget: budget,
            ..GenerationConfig::default()
        };
        ChatSession::new(config, Arc::new(FlatCounter(counter)))
    }

    #[test]
    fn test_successful_turn_appends_both_messages() {
        let mut session = session_with(1, 1000);
        let client = EchoClient::new("Photosynthesis turns light into sugar.");

        let outcome = session.send_message(&client, "What is photosynthesis?");

        assert!(outcome.is_reply());
        let conversation = session.active_room().state().conversation();
        assert_eq!(conversation.len(), 3);
        assert_eq!(conversation[0].content(), GREETING);
        assert_eq!(conversation[1], Message::user("What is photosynthesis?"));
        assert_eq!(
            conversation[2],
            Message::assistant("Photosynthesis turns light into sugar.")
        );
    }

    #[test]
    fn test_request_carries_history_without_reply() {
        let mut session = session_with(1, 1000);
        let client = EchoClient::new("ok");

        session.send_message(&client, "hi");

        let seen = client.seen.lock().unwrap();
        let (history, _) = &seen[0];
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].role(), Role::System);
        assert_eq!(history[2], Message::user("hi"));
    }

    #[test]
    fn test_failed_turn_keeps_user_message_only() {
        let mut session = session_with(1, 1000);

        let outcome = session.send_message(&DownClient, "anyone there?");

        match &outcome {
            TurnOutcome::Failed { error, detail, .. } => {
                assert_eq!(error, GENERATION_FAILED_NOTICE);
                assert!(detail.contains("timed out"));
            }
            TurnOutcome::Replied { .. } => panic!("expected a failure"),
        }
        let conversation = session.active_room().state().conversation();
        assert_eq!(conversation.len(), 2);
        assert_eq!(conversation[1], Message::user("anyone there?"));
    }

    #[test]
    fn test_budget_enforced_before_request() {
        // 10 tokens per message, budget 30: system + two newest messages.
        let mut session = session_with(10, 30);
        let client = EchoClient::new("reply");

        session.send_message(&client, "one");
        let outcome = session.send_message(&client, "two");

        let seen = client.seen.lock().unwrap();
        let (history, _) = &seen[1];
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].role(), Role::System);
        assert_eq!(history[1], Message::assistant("reply"));
        assert_eq!(history[2], Message::user("two"));
        match outcome {
            TurnOutcome::Replied { budget, .. } => {
                assert_eq!(budget.evicted, 2);
                assert_eq!(budget.total_tokens, 30);
            }
            TurnOutcome::Failed { .. } => panic!("expected a reply"),
        }
    }

    #[test]
    fn test_staged_config_is_not_used_until_applied() {
        let mut session = session_with(1, 1000);
        let client = EchoClient::new("ok");
        let update = ConfigUpdate {
            temperature: Some(0.0),
            max_tokens: Some(64),
            ..ConfigUpdate::default()
        };

        session.stage_config(&update).unwrap();
        assert!(session.has_pending_changes());
        session.send_message(&client, "before apply");

        session.apply_config();
        assert!(!session.has_pending_changes());
        session.send_message(&client, "after apply");

        let seen = client.seen.lock().unwrap();
        assert_eq!(seen[0].1.max_tokens, GenerationConfig::default().max_tokens);
        assert_eq!(seen[1].1.max_tokens, 64);
        assert!(seen[1].1.temperature.abs() < f64::EPSILON);
    }

    #[test]
    fn test_staged_budget_does_not_affect_accounting() {
        let mut session = session_with(10, 1000);
        let client = EchoClient::new("reply");
        session.send_message(&client, "one");

        session
            .stage_config(&ConfigUpdate {
                token_budget: Some(10),
                ..ConfigUpdate::default()
            })
            .unwrap();
        let outcome = session.send_message(&client, "two");

        match outcome {
            TurnOutcome::Replied { budget, .. } => {
                assert_eq!(budget.evicted, 0);
                assert_eq!(budget.budget, 1000);
            }
            TurnOutcome::Failed { .. } => panic!("expected a reply"),
        }
    }

    #[test]
    fn test_invalid_stage_keeps_previous() {
        let mut session = session_with(1, 1000);
        session
            .stage_config(&ConfigUpdate {
                max_tokens: Some(100),
                ..ConfigUpdate::default()
            })
            .unwrap();
        let err = session
            .stage_config(&ConfigUpdate {
                temperature: Some(2.0),
                ..ConfigUpdate::default()
            })
            .unwrap_err();
        assert!(matches!(err, ChatError::InvalidConfig(_)));
        assert_eq!(session.staged_config().unwrap().max_tokens, 100);

        session.discard_staged();
        assert!(session.staged_config().is_none());
        assert_eq!(session.apply_config(), &GenerationConfig {
            token_budget: 1000,
            ..GenerationConfig::default()
        });
    }

    #[test]
    fn test_empty_update_is_rejected() {
        let mut session = session_with(1, 1000);

        let err = session.stage_config(&ConfigUpdate::default()).unwrap_err();

        assert!(matches!(err, ChatError::InvalidConfig(_)));
        assert!(session.staged_config().is_none());
        assert!(!session.has_pending_changes());
    }

    #[test]
    fn test_personality_switch_is_room_local() {
        let mut session = session_with(1, 1000);
        session.create_room(Some("A")).unwrap();
        session.set_personality(Personality::Wise);
        session.switch_room(DEFAULT_ROOM).unwrap();

        assert_eq!(
            session.active_room().state().system_prompt(),
            Personality::BonaFide.prompt()
        );
        assert_eq!(
            session.rooms().get("A").unwrap().state().system_prompt(),
            Personality::Wise.prompt()
        );
    }

    #[test]
    fn test_rooms_have_independent_histories() {
        let mut session = session_with(1, 1000);
        let client = EchoClient::new("ok");
        session.send_message(&client, "main question");
        session.create_room(None).unwrap();
        session.send_message(&client, "side question");

        assert_eq!(session.active_room().name(), "Chat Room 1");
        assert_eq!(session.active_room().state().conversation().len(), 3);
        let main = session.rooms().get(DEFAULT_ROOM).unwrap();
        assert_eq!(main.state().conversation()[1], Message::user("main question"));
    }

    #[test]
    fn test_protected_delete_leaves_active_pointer() {
        let mut session = session_with(1, 1000);
        session.create_room(Some("Side")).unwrap();
        let err = session.delete_room(DEFAULT_ROOM).unwrap_err();
        assert!(matches!(err, ChatError::ProtectedRoom(_)));
        assert_eq!(session.active_room().name(), "Side");
    }

    #[test]
    fn test_reset_room() {
        let mut session = session_with(1, 1000);
        session.send_message(&EchoClient::new("ok"), "hello");
        session.reset_room();
        assert_eq!(session.active_room().state().len(), 1);
        assert_eq!(session.total_tokens(), 1);
    }

    #[test]
    fn test_turn_outcome_json() {
        let outcome = TurnOutcome::Failed {
            error: GENERATION_FAILED_NOTICE.to_string(),
            detail: "boom".to_string(),
            budget: BudgetReport::default(),
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["error"], GENERATION_FAILED_NOTICE);
    }
}

//! Named rooms, each with an independent conversation.

use serde::Serialize;

use crate::chat::core::errors::{ChatError, ChatResult};
use crate::chat::personality::Personality;
use crate::chat::state::ConversationState;

/// Name of the protected room every session starts with.
pub const DEFAULT_ROOM: &str = "Main Chat Room";

/// Assistant greeting placed in every new room.
pub const GREETING: &str =
    "Hi there! It's Scientia, your knowledge enlightenment assistant. How may I help you?";

/// Prefix for generated room names.
const GENERATED_ROOM_PREFIX: &str = "Chat Room";

/// A conversation thread with its own personality selection.
#[derive(Clone, Debug)]
pub struct Room {
    name: String,
    personality: Personality,
    state: ConversationState,
}

impl Room {
    /// Create a room seeded with the personality prompt and the greeting.
    #[must_use]
    pub fn new(name: impl Into<String>, personality: Personality) -> Self {
        let mut state = ConversationState::new(personality.prompt());
        state.push_assistant(GREETING);
        Self {
            name: name.into(),
            personality,
            state,
        }
    }

    /// Room name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Selected personality.
    #[must_use]
    pub const fn personality(&self) -> Personality {
        self.personality
    }

    /// Conversation history.
    #[must_use]
    pub const fn state(&self) -> &ConversationState {
        &self.state
    }

    /// Mutable conversation history.
    pub fn state_mut(&mut self) -> &mut ConversationState {
        &mut self.state
    }

    /// Switch personality, replacing the system prompt in place.
    pub fn set_personality(&mut self, personality: Personality) {
        self.personality = personality;
        self.state.set_system_prompt(personality.prompt());
    }
}

/// Lightweight room listing entry.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct RoomSummary {
    /// Room name.
    pub name: String,
    /// Personality slug.
    pub personality: &'static str,
    /// Messages after the system prompt.
    pub messages: usize,
    /// Whether the room can be deleted.
    pub protected: bool,
}

/// Ordered set of rooms with an active pointer.
///
/// The default room always exists and the active pointer always names a
/// live room.
#[derive(Clone, Debug)]
pub struct RoomRegistry {
    rooms: Vec<Room>,
    active: usize,
    generated: usize,
}

impl RoomRegistry {
    /// Registry holding only the default room, which is active.
    #[must_use]
    pub fn new(personality: Personality) -> Self {
        Self {
            rooms: vec![Room::new(DEFAULT_ROOM, personality)],
            active: 0,
            generated: 0,
        }
    }

    /// Create a room. Without a name, `"Chat Room {n}"` is generated from a
    /// running counter. The new room inherits the active room's personality.
    ///
    /// # Errors
    /// Returns an error if the name is blank or already taken.
    pub fn create(&mut self, name: Option<&str>) -> ChatResult<&Room> {
        let name = match name.map(str::trim) {
            Some("") => {
                return Err(ChatError::InvalidRoomName(
                    "name must not be blank".to_string(),
                ));
            }
            Some(name) if self.position(name).is_some() => {
                return Err(ChatError::RoomExists(name.to_string()));
            }
            Some(name) => name.to_string(),
            None => self.next_generated_name(),
        };

        let personality = self.get_active().personality();
        self.rooms.push(Room::new(name, personality));
        tracing::debug!(rooms = self.rooms.len(), "room created");
        Ok(&self.rooms[self.rooms.len() - 1])
    }

    /// Delete a room. Deleting the active room makes the default room active.
    ///
    /// # Errors
    /// Returns [`ChatError::ProtectedRoom`] for the default room and
    /// [`ChatError::RoomNotFound`] for an unknown name.
    pub fn delete(&mut self, name: &str) -> ChatResult<Room> {
        if name == DEFAULT_ROOM {
            return Err(ChatError::ProtectedRoom(name.to_string()));
        }
        let index = self
            .position(name)
            .ok_or_else(|| ChatError::RoomNotFound(name.to_string()))?;

        let active_name = self.get_active().name().to_string();
        let removed = self.rooms.remove(index);
        self.active = if active_name == name {
            0
        } else {
            self.position(&active_name).unwrap_or(0)
        };
        Ok(removed)
    }

    /// Active room.
    #[must_use]
    pub fn get_active(&self) -> &Room {
        &self.rooms[self.active]
    }

    /// Mutable active room.
    pub fn get_active_mut(&mut self) -> &mut Room {
        &mut self.rooms[self.active]
    }

    /// Make `name` the active room.
    ///
    /// # Errors
    /// Returns [`ChatError::RoomNotFound`] for an unknown name.
    pub fn set_active(&mut self, name: &str) -> ChatResult<()> {
        self.active = self
            .position(name)
            .ok_or_else(|| ChatError::RoomNotFound(name.to_string()))?;
        Ok(())
    }

    /// Look up a room by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Room> {
        self.position(name).map(|index| &self.rooms[index])
    }

    /// Room names in creation order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.rooms.iter().map(Room::name).collect()
    }

    /// Listing entries in creation order.
    #[must_use]
    pub fn summaries(&self) -> Vec<RoomSummary> {
        self.rooms
            .iter()
            .map(|room| RoomSummary {
                name: room.name.clone(),
                personality: room.personality.slug(),
                messages: room.state.conversation().len(),
                protected: room.name == DEFAULT_ROOM,
            })
            .collect()
    }

    /// Number of rooms, default room included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    /// Always `false`: the default room cannot be removed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.rooms.iter().position(|room| room.name == name)
    }

    fn next_generated_name(&mut self) -> String {
        loop {
            self.generated += 1;
            let candidate = format!("{GENERATED_ROOM_PREFIX} {}", self.generated);
            if self.position(&candidate).is_none() {
                return candidate;
            }
        }
    }
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new(Personality::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_with_default_room() {
        let registry = RoomRegistry::default();
        assert_eq!(registry.names(), vec![DEFAULT_ROOM]);
        assert_eq!(registry.get_active().name(), DEFAULT_ROOM);
        let state = registry.get_active().state();
        assert_eq!(state.system_prompt(), Personality::BonaFide.prompt());
        assert_eq!(state.conversation()[0].content(), GREETING);
    }

    #[test]
    fn test_generated_names_never_collide() {
        let mut registry = RoomRegistry::default();
        registry.create(None).unwrap();
        registry.create(None).unwrap();
        registry.delete("Chat Room 1").unwrap();
        let third = registry.create(None).unwrap().name().to_string();
        assert_eq!(third, "Chat Room 3");
        assert_eq!(registry.names(), vec![DEFAULT_ROOM, "Chat Room 2", "Chat Room 3"]);
    }

    #[test]
    fn test_generated_name_skips_explicit_one() {
        let mut registry = RoomRegistry::default();
        registry.create(Some("Chat Room 1")).unwrap();
        assert_eq!(registry.create(None).unwrap().name(), "Chat Room 2");
    }

    #[test]
    fn test_duplicate_and_blank_names() {
        let mut registry = RoomRegistry::default();
        registry.create(Some("Physics")).unwrap();
        assert!(matches!(
            registry.create(Some("Physics")),
            Err(ChatError::RoomExists(_))
        ));
        assert!(matches!(
            registry.create(Some(DEFAULT_ROOM)),
            Err(ChatError::RoomExists(_))
        ));
        let blank = registry.create(Some("   ")).unwrap_err();
        assert!(matches!(blank, ChatError::InvalidRoomName(_)));
        assert_eq!(blank.to_string(), "invalid room name: name must not be blank");
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_delete_default_is_protected() {
        let mut registry = RoomRegistry::default();
        registry.create(Some("Other")).unwrap();
        registry.set_active("Other").unwrap();

        let err = registry.delete(DEFAULT_ROOM).unwrap_err();

        assert!(matches!(err, ChatError::ProtectedRoom(_)));
        assert_eq!(registry.get_active().name(), "Other");
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_delete_active_falls_back_to_default() {
        let mut registry = RoomRegistry::default();
        registry.create(Some("Biology")).unwrap();
        registry.set_active("Biology").unwrap();

        registry.delete("Biology").unwrap();

        assert_eq!(registry.get_active().name(), DEFAULT_ROOM);
        assert!(registry.get("Biology").is_none());
    }

    #[test]
    fn test_delete_inactive_keeps_active() {
        let mut registry = RoomRegistry::default();
        registry.create(Some("A")).unwrap();
        registry.create(Some("B")).unwrap();
        registry.set_active("B").unwrap();

        registry.delete("A").unwrap();

        assert_eq!(registry.get_active().name(), "B");
    }

    #[test]
    fn test_delete_unknown() {
        let mut registry = RoomRegistry::default();
        assert!(matches!(
            registry.delete("nope"),
            Err(ChatError::RoomNotFound(_))
        ));
        assert!(registry.set_active("nope").is_err());
    }

    #[test]
    fn test_personality_isolation() {
        let mut registry = RoomRegistry::default();
        registry.create(Some("A")).unwrap();
        registry.create(Some("B")).unwrap();

        registry.set_active("A").unwrap();
        registry.get_active_mut().set_personality(Personality::Humorous);

        let a = registry.get("A").unwrap();
        let b = registry.get("B").unwrap();
        assert_eq!(a.state().system_prompt(), Personality::Humorous.prompt());
        assert_eq!(b.state().system_prompt(), Personality::BonaFide.prompt());
        assert_eq!(b.personality(), Personality::BonaFide);
    }

    #[test]
    fn test_new_room_inherits_active_personality() {
        let mut registry = RoomRegistry::default();
        registry
            .get_active_mut()
            .set_personality(Personality::Minimalist);
        let room = registry.create(None).unwrap();
        assert_eq!(room.personality(), Personality::Minimalist);
    }

    #[test]
    fn test_summaries() {
        let mut registry = RoomRegistry::default();
        registry.create(Some("X")).unwrap();
        let summaries = registry.summaries();
        assert!(summaries[0].protected);
        assert!(!summaries[1].protected);
        assert_eq!(summaries[1].messages, 1);
        assert_eq!(summaries[1].personality, "bona_fide");
    }
}

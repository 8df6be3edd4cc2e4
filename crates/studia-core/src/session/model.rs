//! Session domain model.
//!
//! This module contains the core Session entity that represents
//! one study topic in the application's domain layer.

use super::file::UploadedFile;
use super::message::Message;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Represents a study session in the application's domain layer.
///
/// A session contains:
/// - The owning account
/// - A topic label
/// - The append-only message log
/// - The latest generated diagram and image (each replaced wholesale)
/// - Attached files in attachment order
/// - A pinned flag used for listing order
///
/// This is the "pure" domain model that business logic operates on,
/// independent of any specific storage format or version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Unique session identifier (UUID format)
    pub id: String,
    /// Account that owns this session
    pub account_id: String,
    /// Human-readable topic label
    pub topic: String,
    /// Conversation log, oldest first
    #[serde(default)]
    pub messages: Vec<Message>,
    /// Diagram source (Mermaid) produced by the Architect
    #[serde(default)]
    pub diagram: Option<String>,
    /// Image reference (URL or data URL) produced by the Illustrator
    #[serde(default)]
    pub image: Option<String>,
    /// Attached files, in attachment order
    #[serde(default)]
    pub files: Vec<UploadedFile>,
    /// Whether the session is pinned to the top of the list
    #[serde(default)]
    pub pinned: bool,
    /// When the session was created
    pub created_at: DateTime<Utc>,
    /// When the session was last updated
    pub updated_at: DateTime<Utc>,
}

impl Session {
    /// Creates an empty session for the given account.
    pub fn new(account_id: impl Into<String>, topic: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            account_id: account_id.into(),
            topic: topic.into(),
            messages: Vec::new(),
            diagram: None,
            image: None,
            files: Vec::new(),
            pinned: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Messages that make up the dialogue with the model (no system notices).
    pub fn conversation(&self) -> Vec<Message> {
        self.messages
            .iter()
            .filter(|m| m.is_conversational())
            .cloned()
            .collect()
    }

    /// Appends `message` to the log. Its timestamp is clamped to the last
    /// message's so the log stays non-decreasing if the clock stepped back.
    pub fn push_message(&mut self, mut message: Message) {
        if let Some(last) = self.messages.last() {
            if message.created_at < last.created_at {
                message.created_at = last.created_at;
            }
        }
        self.messages.push(message);
    }

    pub fn find_file(&self, file_id: &str) -> Option<&UploadedFile> {
        self.files.iter().find(|f| f.id == file_id)
    }
}

/// Orders sessions for display: pinned first, then most recently updated.
///
/// Ties are broken by id so the order is deterministic; the order among
/// pinned sessions with equal timestamps is otherwise not meaningful.
pub fn sort_for_listing(sessions: &mut [Session]) {
    sessions.sort_by(|a, b| {
        b.pinned
            .cmp(&a.pinned)
            .then_with(|| b.updated_at.cmp(&a.updated_at))
            .then_with(|| a.id.cmp(&b.id))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Message;
    use chrono::Duration;

    fn session_at(topic: &str, pinned: bool, minutes_ago: i64) -> Session {
        let mut session = Session::new("acct", topic);
        session.pinned = pinned;
        session.updated_at = Utc::now() - Duration::minutes(minutes_ago);
        session
    }

    #[test]
    fn test_pinned_sessions_come_first() {
        let mut sessions = vec![
            session_at("fresh", false, 0),
            session_at("old-pinned", true, 120),
            session_at("older", false, 60),
        ];

        sort_for_listing(&mut sessions);

        assert_eq!(sessions[0].topic, "old-pinned");
        assert_eq!(sessions[1].topic, "fresh");
        assert_eq!(sessions[2].topic, "older");
    }

    #[test]
    fn test_conversation_skips_system_notices() {
        let mut session = Session::new("acct", "Rome");
        session.messages.push(Message::system("Attached notes.pdf"));
        session.messages.push(Message::user("Who was Caesar?"));
        session.messages.push(Message::assistant("A Roman general."));

        let conversation = session.conversation();
        assert_eq!(conversation.len(), 2);
        assert!(conversation.iter().all(|m| m.is_conversational()));
    }
}

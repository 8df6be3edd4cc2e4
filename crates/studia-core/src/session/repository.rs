//! Session store trait.
//!
//! Defines the interface for session persistence operations.

use super::file::UploadedFile;
use super::message::Message;
use super::model::Session;
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Partial update of session fields.
///
/// `None` leaves a field untouched. Present fields replace the stored value
/// wholesale.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionPatch {
    pub topic: Option<String>,
    pub pinned: Option<bool>,
    pub diagram: Option<String>,
    pub image: Option<String>,
}

impl SessionPatch {
    pub fn topic(topic: impl Into<String>) -> Self {
        Self {
            topic: Some(topic.into()),
            ..Default::default()
        }
    }

    pub fn pinned(pinned: bool) -> Self {
        Self {
            pinned: Some(pinned),
            ..Default::default()
        }
    }

    pub fn diagram(diagram: impl Into<String>) -> Self {
        Self {
            diagram: Some(diagram.into()),
            ..Default::default()
        }
    }

    pub fn image(image: impl Into<String>) -> Self {
        Self {
            image: Some(image.into()),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.topic.is_none() && self.pinned.is_none() && self.diagram.is_none() && self.image.is_none()
    }

    /// Applies the present fields to a session.
    pub fn apply_to(&self, session: &mut Session) {
        if let Some(topic) = &self.topic {
            session.topic = topic.clone();
        }
        if let Some(pinned) = self.pinned {
            session.pinned = pinned;
        }
        if let Some(diagram) = &self.diagram {
            session.diagram = Some(diagram.clone());
        }
        if let Some(image) = &self.image {
            session.image = Some(image.clone());
        }
    }
}

/// An abstract store for session persistence.
///
/// All operations are best-effort point writes; there are no transactions
/// across calls. Callers decide whether a failure matters.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Lists the sessions of an account, pinned first, then by recency.
    async fn list_sessions(&self, account_id: &str) -> Result<Vec<Session>>;

    /// Creates and stores an empty session.
    async fn create_session(&self, account_id: &str, topic: &str) -> Result<Session>;

    /// Finds a session by its ID.
    ///
    /// - `Ok(Some(Session))`: Session found
    /// - `Ok(None)`: Session not found
    async fn find_session(&self, session_id: &str) -> Result<Option<Session>>;

    /// Replaces the fields present in `patch`.
    async fn update_session_fields(&self, session_id: &str, patch: SessionPatch) -> Result<()>;

    /// Appends a message to the session log.
    async fn append_message(&self, session_id: &str, message: Message) -> Result<()>;

    /// Attaches a file record.
    async fn append_file(&self, session_id: &str, file: UploadedFile) -> Result<()>;

    /// Replaces an attached file record (matched by id).
    async fn replace_file(&self, session_id: &str, file: UploadedFile) -> Result<()>;
}

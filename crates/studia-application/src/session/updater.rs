//! Session updater helper for store-side field updates.
//!
//! `SessionUpdater` wraps the "find → decide → patch" pattern used by the
//! rename and pin operations.

use studia_core::error::{Result, StudiaError};
use studia_core::session::{Session, SessionPatch, SessionStore};
use std::sync::Arc;

/// Helper for patching stored sessions.
///
/// `SessionUpdater` encapsulates the pattern of:
/// 1. Loading a session from the store
/// 2. Deciding the patch from its current state
/// 3. Writing the patch with `update_session_fields`
pub struct SessionUpdater {
    store: Arc<dyn SessionStore>,
}

impl SessionUpdater {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }

    /// Patches a session with the patch returned by `decide`.
    ///
    /// Returns the session as it looks after the patch.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The session doesn't exist
    /// - `decide` returns an error
    /// - Writing to the store fails
    pub async fn update<F>(&self, session_id: &str, decide: F) -> Result<Session>
    where
        F: FnOnce(&Session) -> Result<SessionPatch>,
    {
        tracing::debug!("[SessionUpdater] update() called for session_id: {}", session_id);

        let mut session = self
            .store
            .find_session(session_id)
            .await?
            .ok_or_else(|| StudiaError::not_found("Session", session_id))?;

        let patch = decide(&session)?;
        if patch.is_empty() {
            return Ok(session);
        }

        self.store.update_session_fields(session_id, patch.clone()).await?;
        patch.apply_to(&mut session);

        tracing::debug!(
            "[SessionUpdater] Patched session: id={}, topic={}, pinned={}",
            session.id,
            session.topic,
            session.pinned
        );

        Ok(session)
    }
}

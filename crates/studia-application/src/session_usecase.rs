//! Session use case implementation.
//!
//! `SessionUseCase` covers the session-level actions of the signed-in
//! account: creating, listing, switching, renaming and pinning. It keeps the
//! store and the live session consistent; the store is updated first and the
//! live view follows through the reducer.

use crate::session::{LiveSession, SessionUpdater};
use std::sync::Arc;
use studia_core::account::{Account, AccountStore};
use studia_core::error::{AuthError, Result, StudiaError};
use studia_core::session::{Session, SessionPatch, SessionStore, SessionUpdate, sort_for_listing};

/// Use case for managing the sessions of the signed-in account.
pub struct SessionUseCase {
    store: Arc<dyn SessionStore>,
    accounts: Arc<dyn AccountStore>,
    live: Arc<LiveSession>,
    updater: SessionUpdater,
}

impl SessionUseCase {
    pub fn new(
        store: Arc<dyn SessionStore>,
        accounts: Arc<dyn AccountStore>,
        live: Arc<LiveSession>,
    ) -> Self {
        Self {
            updater: SessionUpdater::new(store.clone()),
            store,
            accounts,
            live,
        }
    }

    async fn signed_in(&self) -> Result<Account> {
        self.accounts
            .current_account()
            .await
            .ok_or_else(|| AuthError::NotSignedIn.into())
    }

    /// Creates a session and makes it live.
    pub async fn create_session(&self, topic: &str) -> Result<Session> {
        let topic = validated_topic(topic)?;
        let account = self.signed_in().await?;

        let session = self.store.create_session(&account.id, topic).await?;
        tracing::info!("[SessionUseCase] Created session {} ({})", session.id, session.topic);

        self.live.load(session.clone()).await;
        Ok(session)
    }

    /// Lists the account's sessions: pinned first, then most recently updated.
    pub async fn list_sessions(&self) -> Result<Vec<Session>> {
        let account = self.signed_in().await?;
        let mut sessions = self.store.list_sessions(&account.id).await?;
        sort_for_listing(&mut sessions);
        Ok(sessions)
    }

    /// Loads a stored session into the live view.
    ///
    /// Detached results still running for the previous session are dropped
    /// when they arrive.
    pub async fn switch_session(&self, session_id: &str) -> Result<Session> {
        let account = self.signed_in().await?;
        let session = self
            .store
            .find_session(session_id)
            .await?
            .filter(|s| s.account_id == account.id)
            .ok_or_else(|| StudiaError::not_found("Session", session_id))?;

        tracing::info!("[SessionUseCase] Switching to session {}", session.id);
        self.live.load(session.clone()).await;
        Ok(session)
    }

    /// Reopens the most relevant session (first in listing order), if any.
    pub async fn resume_latest(&self) -> Result<Option<Session>> {
        let Some(session) = self.list_sessions().await?.into_iter().next() else {
            return Ok(None);
        };
        self.live.load(session.clone()).await;
        Ok(Some(session))
    }

    pub async fn rename_session(&self, session_id: &str, topic: &str) -> Result<Session> {
        let topic = validated_topic(topic)?.to_string();
        let account = self.signed_in().await?;

        let session = self
            .updater
            .update(session_id, |session| {
                ensure_owner(session, &account)?;
                Ok(SessionPatch::topic(topic.clone()))
            })
            .await?;

        self.live
            .apply_to(session_id, SessionUpdate::Rename(topic))
            .await;
        Ok(session)
    }

    /// Flips the pinned flag and returns the new value.
    pub async fn toggle_pin(&self, session_id: &str) -> Result<bool> {
        let account = self.signed_in().await?;

        let session = self
            .updater
            .update(session_id, |session| {
                ensure_owner(session, &account)?;
                Ok(SessionPatch::pinned(!session.pinned))
            })
            .await?;

        self.live
            .apply_to(session_id, SessionUpdate::SetPinned(session.pinned))
            .await;
        Ok(session.pinned)
    }
}

fn validated_topic(topic: &str) -> Result<&str> {
    let topic = topic.trim();
    if topic.is_empty() {
        return Err(StudiaError::validation("Topic must not be empty"));
    }
    Ok(topic)
}

fn ensure_owner(session: &Session, account: &Account) -> Result<()> {
    if session.account_id != account.id {
        return Err(StudiaError::not_found("Session", session.id.clone()));
    }
    Ok(())
}

//! Account store trait and observer plumbing.

use super::model::{Account, Credentials};
use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

/// Callback invoked with the signed-in account (or `None` after log-out).
pub type AccountCallback = Arc<dyn Fn(Option<Account>) + Send + Sync>;

/// Authentication and account state.
///
/// Credential failures come back as `StudiaError::Auth` so the caller can
/// show them verbatim.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Signs in with existing credentials.
    async fn authenticate(&self, credentials: &Credentials) -> Result<Account>;

    /// Creates an account and signs it in.
    async fn create_account(&self, credentials: &Credentials, display_name: &str)
    -> Result<Account>;

    /// Signs the current account out.
    async fn end_session(&self) -> Result<()>;

    /// Returns the currently signed-in account, if any.
    async fn current_account(&self) -> Option<Account>;

    /// Registers a callback for sign-in state changes.
    ///
    /// The callback fires once immediately with the current state.
    fn observe_account(&self, callback: AccountCallback) -> AccountSubscription;
}

/// Registry of account observers shared by store implementations.
#[derive(Default)]
pub struct AccountObservers {
    inner: Arc<ObserverMap>,
}

#[derive(Default)]
struct ObserverMap {
    next_id: AtomicU64,
    callbacks: Mutex<HashMap<u64, AccountCallback>>,
}

impl ObserverMap {
    fn remove(&self, id: u64) {
        let mut callbacks = self.callbacks.lock().unwrap_or_else(|e| e.into_inner());
        callbacks.remove(&id);
    }
}

impl AccountObservers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a callback and immediately delivers `current` to it.
    pub fn subscribe(&self, callback: AccountCallback, current: Option<Account>) -> AccountSubscription {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        {
            let mut callbacks = self
                .inner
                .callbacks
                .lock()
                .unwrap_or_else(|e| e.into_inner());
            callbacks.insert(id, callback.clone());
        }
        callback(current);

        AccountSubscription {
            id,
            observers: Arc::downgrade(&self.inner),
        }
    }

    /// Delivers a state change to every registered callback.
    pub fn notify(&self, account: Option<&Account>) {
        let callbacks: Vec<AccountCallback> = {
            let callbacks = self
                .inner
                .callbacks
                .lock()
                .unwrap_or_else(|e| e.into_inner());
            callbacks.values().cloned().collect()
        };

        for callback in callbacks {
            callback(account.cloned());
        }
    }
}

/// Handle returned by [`AccountStore::observe_account`].
///
/// Dropping the handle also unsubscribes.
pub struct AccountSubscription {
    id: u64,
    observers: Weak<ObserverMap>,
}

impl AccountSubscription {
    pub fn unsubscribe(self) {
        // Drop does the work.
    }
}

impl Drop for AccountSubscription {
    fn drop(&mut self) {
        if let Some(observers) = self.observers.upgrade() {
            observers.remove(self.id);
        }
    }
}

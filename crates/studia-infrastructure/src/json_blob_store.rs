//! Single-document JSON store for accounts and sessions.
//!
//! Every write is a whole-document read-modify-write of `store.json`.
//! In-process writers are serialized behind a mutex; the file itself is
//! replaced atomically, but there is no cross-process lock.

use crate::dto::{StoreSnapshot, StoredAccount, create_store_migrator};
use crate::paths::StudiaPaths;
use crate::storage::AtomicJsonFile;
use async_trait::async_trait;
use chrono::Utc;
use rand::Rng;
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use std::sync::RwLock;
use studia_core::account::{
    Account, AccountCallback, AccountObservers, AccountStore, AccountSubscription, Credentials,
};
use studia_core::error::{AuthError, Result, StudiaError};
use studia_core::session::{
    Message, Session, SessionPatch, SessionStore, UploadedFile, sort_for_listing,
};
use tokio::sync::Mutex;
use uuid::Uuid;
use version_migrate::Migrator;

/// JSON blob implementation of [`SessionStore`] and [`AccountStore`].
pub struct JsonBlobStore {
    file: AtomicJsonFile,
    migrator: Migrator,
    /// Serializes read-modify-write cycles within this process.
    write_gate: Mutex<()>,
    signed_in: RwLock<Option<Account>>,
    observers: AccountObservers,
}

impl JsonBlobStore {
    /// Opens the store at the default location (`~/.local/share/studia/store.json`).
    pub async fn default_location() -> Result<Self> {
        let path = StudiaPaths::default()
            .store_file()
            .map_err(|e| StudiaError::config(format!("Failed to resolve store path: {}", e)))?;
        Self::open(path).await
    }

    /// Opens (or lazily creates) the store at `path`.
    ///
    /// The signed-in account is restored from the document, so a sign-in
    /// survives restarts until `end_session` is called.
    pub async fn open(path: PathBuf) -> Result<Self> {
        let store = Self {
            file: AtomicJsonFile::new(path),
            migrator: create_store_migrator(),
            write_gate: Mutex::new(()),
            signed_in: RwLock::new(None),
            observers: AccountObservers::new(),
        };

        let snapshot = store.load_snapshot().await?;
        let restored = snapshot.current_account_id.as_ref().and_then(|id| {
            snapshot
                .accounts
                .iter()
                .find(|a| &a.account.id == id)
                .map(|a| a.account.clone())
        });
        if let Some(account) = &restored {
            tracing::info!("[BlobStore] Restored sign-in for account {}", account.id);
        }
        store.set_signed_in(restored);

        Ok(store)
    }

    pub fn path(&self) -> &std::path::Path {
        self.file.path()
    }

    async fn load_snapshot(&self) -> Result<StoreSnapshot> {
        let value = self
            .file
            .load()
            .await
            .map_err(|e| StudiaError::data_access(format!("Failed to read store: {}", e)))?;

        match value {
            None => Ok(StoreSnapshot::default()),
            Some(value) => self
                .migrator
                .load_flat_from("store", value)
                .map_err(|e| StudiaError::migration(format!("Failed to migrate store: {}", e))),
        }
    }

    async fn save_snapshot(&self, snapshot: StoreSnapshot) -> Result<()> {
        let serialized = self
            .migrator
            .save_domain_flat("store", snapshot)
            .map_err(|e| StudiaError::data_access(format!("Failed to serialize store: {}", e)))?;

        self.file
            .save(&serialized)
            .await
            .map_err(|e| StudiaError::data_access(format!("Failed to write store: {}", e)))
    }

    /// Loads the document, applies `f`, and writes it back.
    async fn mutate<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut StoreSnapshot) -> Result<T>,
    {
        let _gate = self.write_gate.lock().await;
        let mut snapshot = self.load_snapshot().await?;
        let result = f(&mut snapshot)?;
        self.save_snapshot(snapshot).await?;
        Ok(result)
    }

    /// Applies `f` to one session and bumps its `updated_at`.
    async fn mutate_session<F>(&self, session_id: &str, f: F) -> Result<()>
    where
        F: FnOnce(&mut Session) -> Result<()>,
    {
        self.mutate(|snapshot| {
            let session = snapshot
                .sessions
                .iter_mut()
                .find(|s| s.id == session_id)
                .ok_or_else(|| StudiaError::not_found("Session", session_id))?;
            f(session)?;
            session.updated_at = Utc::now().max(session.updated_at);
            Ok(())
        })
        .await
    }

    fn set_signed_in(&self, account: Option<Account>) {
        {
            let mut guard = self.signed_in.write().unwrap_or_else(|e| e.into_inner());
            *guard = account.clone();
        }
        self.observers.notify(account.as_ref());
    }
}

fn random_salt() -> String {
    let bytes: [u8; 16] = rand::thread_rng().r#gen();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

fn digest_password(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[async_trait]
impl SessionStore for JsonBlobStore {
    async fn list_sessions(&self, account_id: &str) -> Result<Vec<Session>> {
        let snapshot = self.load_snapshot().await?;
        let mut sessions: Vec<Session> = snapshot
            .sessions
            .into_iter()
            .filter(|s| s.account_id == account_id)
            .collect();
        sort_for_listing(&mut sessions);
        Ok(sessions)
    }

    async fn create_session(&self, account_id: &str, topic: &str) -> Result<Session> {
        let session = Session::new(account_id, topic);
        let stored = session.clone();
        self.mutate(move |snapshot| {
            snapshot.sessions.push(stored);
            Ok(())
        })
        .await?;

        tracing::debug!("[BlobStore] Created session {} ({})", session.id, session.topic);
        Ok(session)
    }

    async fn find_session(&self, session_id: &str) -> Result<Option<Session>> {
        let snapshot = self.load_snapshot().await?;
        Ok(snapshot.sessions.into_iter().find(|s| s.id == session_id))
    }

    async fn update_session_fields(&self, session_id: &str, patch: SessionPatch) -> Result<()> {
        if patch.is_empty() {
            return Ok(());
        }
        self.mutate_session(session_id, |session| {
            patch.apply_to(session);
            Ok(())
        })
        .await
    }

    async fn append_message(&self, session_id: &str, message: Message) -> Result<()> {
        self.mutate_session(session_id, |session| {
            session.push_message(message);
            Ok(())
        })
        .await
    }

    async fn append_file(&self, session_id: &str, file: UploadedFile) -> Result<()> {
        self.mutate_session(session_id, |session| {
            session.files.push(file);
            Ok(())
        })
        .await
    }

    async fn replace_file(&self, session_id: &str, file: UploadedFile) -> Result<()> {
        self.mutate_session(session_id, |session| {
            let slot = session
                .files
                .iter_mut()
                .find(|f| f.id == file.id)
                .ok_or_else(|| StudiaError::not_found("UploadedFile", file.id.clone()))?;
            *slot = file;
            Ok(())
        })
        .await
    }
}

#[async_trait]
impl AccountStore for JsonBlobStore {
    async fn authenticate(&self, credentials: &Credentials) -> Result<Account> {
        let email = credentials.normalized_email();
        let account = self
            .mutate(|snapshot| {
                let stored = snapshot
                    .accounts
                    .iter()
                    .find(|a| a.account.email == email)
                    .ok_or(AuthError::InvalidCredentials)?;

                if digest_password(&stored.salt, &credentials.password) != stored.password_digest {
                    return Err(AuthError::InvalidCredentials.into());
                }

                snapshot.current_account_id = Some(stored.account.id.clone());
                Ok(stored.account.clone())
            })
            .await?;

        tracing::info!("[BlobStore] Signed in account {}", account.id);
        self.set_signed_in(Some(account.clone()));
        Ok(account)
    }

    async fn create_account(
        &self,
        credentials: &Credentials,
        display_name: &str,
    ) -> Result<Account> {
        let email = credentials.normalized_email();
        if email.is_empty() || credentials.password.is_empty() {
            return Err(StudiaError::validation("Email and password are required"));
        }

        let account = self
            .mutate(|snapshot| {
                if snapshot.accounts.iter().any(|a| a.account.email == email) {
                    return Err(AuthError::AccountExists {
                        email: email.clone(),
                    }
                    .into());
                }

                let salt = random_salt();
                let account = Account {
                    id: Uuid::new_v4().to_string(),
                    email: email.clone(),
                    display_name: display_name.to_string(),
                    created_at: Utc::now(),
                };
                snapshot.accounts.push(StoredAccount {
                    account: account.clone(),
                    password_digest: digest_password(&salt, &credentials.password),
                    salt,
                });
                snapshot.current_account_id = Some(account.id.clone());
                Ok(account)
            })
            .await?;

        tracing::info!("[BlobStore] Created account {}", account.id);
        self.set_signed_in(Some(account.clone()));
        Ok(account)
    }

    async fn end_session(&self) -> Result<()> {
        self.mutate(|snapshot| {
            snapshot.current_account_id = None;
            Ok(())
        })
        .await?;

        self.set_signed_in(None);
        Ok(())
    }

    async fn current_account(&self) -> Option<Account> {
        self.signed_in
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn observe_account(&self, callback: AccountCallback) -> AccountSubscription {
        let current = self
            .signed_in
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        self.observers.subscribe(callback, current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex as StdMutex};
    use tempfile::TempDir;

    async fn open_store(dir: &TempDir) -> JsonBlobStore {
        JsonBlobStore::open(dir.path().join("store.json")).await.unwrap()
    }

    #[tokio::test]
    async fn test_create_account_and_authenticate() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir).await;
        let creds = Credentials::new("Ada@Example.com", "hunter2");

        let created = store.create_account(&creds, "Ada").await.unwrap();
        store.end_session().await.unwrap();
        assert!(store.current_account().await.is_none());

        let signed_in = store
            .authenticate(&Credentials::new("ada@example.com", "hunter2"))
            .await
            .unwrap();
        assert_eq!(created.id, signed_in.id);
        assert_eq!(signed_in.email, "ada@example.com");
    }

    #[tokio::test]
    async fn test_duplicate_account_is_conflict() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir).await;
        let creds = Credentials::new("ada@example.com", "hunter2");

        store.create_account(&creds, "Ada").await.unwrap();
        let err = store.create_account(&creds, "Ada again").await.unwrap_err();

        assert!(matches!(
            err,
            StudiaError::Auth(AuthError::AccountExists { .. })
        ));
    }

    #[tokio::test]
    async fn test_wrong_password_is_rejected() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir).await;
        store
            .create_account(&Credentials::new("ada@example.com", "hunter2"), "Ada")
            .await
            .unwrap();

        let err = store
            .authenticate(&Credentials::new("ada@example.com", "wrong"))
            .await
            .unwrap_err();

        assert!(matches!(err, StudiaError::Auth(AuthError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_sign_in_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let account = {
            let store = open_store(&dir).await;
            store
                .create_account(&Credentials::new("ada@example.com", "pw"), "Ada")
                .await
                .unwrap()
        };

        let reopened = open_store(&dir).await;
        assert_eq!(reopened.current_account().await.map(|a| a.id), Some(account.id));
    }

    #[tokio::test]
    async fn test_observer_sees_sign_in_and_out() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir).await;
        let seen = Arc::new(StdMutex::new(Vec::new()));
        let sink = seen.clone();

        let _sub = store.observe_account(Arc::new(move |acct: Option<Account>| {
            sink.lock().unwrap().push(acct.is_some());
        }));
        store
            .create_account(&Credentials::new("ada@example.com", "pw"), "Ada")
            .await
            .unwrap();
        store.end_session().await.unwrap();

        assert_eq!(*seen.lock().unwrap(), vec![false, true, false]);
    }

    #[tokio::test]
    async fn test_session_round_trip_through_file() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir).await;

        let session = store.create_session("acct", "Recursion").await.unwrap();
        store
            .append_message(&session.id, Message::user("Explain recursion"))
            .await
            .unwrap();
        store
            .update_session_fields(&session.id, SessionPatch::diagram("graph TD; A-->A"))
            .await
            .unwrap();

        let reopened = open_store(&dir).await;
        let loaded = reopened.find_session(&session.id).await.unwrap().unwrap();
        assert_eq!(loaded.messages.len(), 1);
        assert_eq!(loaded.diagram.as_deref(), Some("graph TD; A-->A"));
    }

    #[tokio::test]
    async fn test_list_sessions_pinned_first() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir).await;

        let first = store.create_session("acct", "First").await.unwrap();
        let second = store.create_session("acct", "Second").await.unwrap();
        store.create_session("other", "Not mine").await.unwrap();

        store
            .update_session_fields(&first.id, SessionPatch::pinned(true))
            .await
            .unwrap();
        // Touch the unpinned session so it is the most recent one.
        store
            .append_message(&second.id, Message::user("hello"))
            .await
            .unwrap();

        let sessions = store.list_sessions("acct").await.unwrap();
        let topics: Vec<_> = sessions.iter().map(|s| s.topic.as_str()).collect();
        assert_eq!(topics, vec!["First", "Second"]);
    }

    #[tokio::test]
    async fn test_replace_file_updates_summary() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir).await;
        let session = store.create_session("acct", "Files").await.unwrap();

        let mut file = UploadedFile {
            id: "f-1".to_string(),
            name: "notes.pdf".to_string(),
            size: 3,
            mime_type: "application/pdf".to_string(),
            uploaded_at: Utc::now(),
            content: "YWJj".to_string(),
            summary: None,
        };
        store.append_file(&session.id, file.clone()).await.unwrap();
        file.summary = Some("T".to_string());
        store.replace_file(&session.id, file).await.unwrap();

        let loaded = store.find_session(&session.id).await.unwrap().unwrap();
        assert_eq!(loaded.files[0].summary.as_deref(), Some("T"));
    }

    #[tokio::test]
    async fn test_appended_timestamps_never_go_backwards() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir).await;
        let session = store.create_session("acct", "Clocks").await.unwrap();

        let mut ahead = Message::user("from a fast clock");
        ahead.created_at = Utc::now() + chrono::Duration::hours(1);
        store.append_message(&session.id, ahead.clone()).await.unwrap();
        store
            .append_message(&session.id, Message::assistant("from a correct clock"))
            .await
            .unwrap();

        let reopened = open_store(&dir).await;
        let loaded = reopened.find_session(&session.id).await.unwrap().unwrap();
        assert_eq!(loaded.messages.len(), 2);
        assert_eq!(loaded.messages[1].created_at, ahead.created_at);
    }

    #[tokio::test]
    async fn test_write_to_missing_session_is_not_found() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir).await;

        let err = store
            .append_message("missing", Message::user("hi"))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }
}

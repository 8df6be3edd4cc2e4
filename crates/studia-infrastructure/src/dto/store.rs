//! Store document DTOs and migrations.
//!
//! The whole store (accounts + sessions + sign-in state) is one JSON
//! document in flat versioned format (`"version"` next to the data).
//!
//! ## Version History
//! - **1.0.0**: Initial schema (no pinning, no file summaries)
//! - **1.1.0**: Added session `pinned` flag and file `summary`

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use version_migrate::{FromDomain, IntoDomain, MigratesTo, Versioned};

use studia_core::account::Account;
use studia_core::session::{Message, Session, UploadedFile};

/// Account record with its password digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredAccount {
    #[serde(flatten)]
    pub account: Account,
    /// Hex salt mixed into the digest
    pub salt: String,
    /// Hex SHA-256 of salt + password
    pub password_digest: String,
}

/// In-memory form of the whole store document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreSnapshot {
    pub accounts: Vec<StoredAccount>,
    pub sessions: Vec<Session>,
    /// Account that stays signed in across restarts
    pub current_account_id: Option<String>,
}

// ============================================================================
// V1.0.0
// ============================================================================

/// File record DTO V1.0.0 (before summaries existed).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRecordV1_0_0 {
    pub id: String,
    pub name: String,
    pub size: u64,
    pub mime_type: String,
    pub uploaded_at: DateTime<Utc>,
    pub content: String,
}

/// Session record DTO V1.0.0 (before pinning existed).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecordV1_0_0 {
    pub id: String,
    pub account_id: String,
    pub topic: String,
    #[serde(default)]
    pub messages: Vec<Message>,
    #[serde(default)]
    pub diagram: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub files: Vec<FileRecordV1_0_0>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Store document DTO V1.0.0.
#[derive(Debug, Clone, Serialize, Deserialize, Versioned)]
#[versioned(version = "1.0.0")]
pub struct StoreDocumentV1_0_0 {
    #[serde(default)]
    pub accounts: Vec<StoredAccount>,
    #[serde(default)]
    pub sessions: Vec<SessionRecordV1_0_0>,
    #[serde(default)]
    pub current_account_id: Option<String>,
}

// ============================================================================
// V1.1.0
// ============================================================================

/// Store document DTO V1.1.0.
#[derive(Debug, Clone, Serialize, Deserialize, Versioned)]
#[versioned(version = "1.1.0")]
pub struct StoreDocumentV1_1_0 {
    #[serde(default)]
    pub accounts: Vec<StoredAccount>,
    #[serde(default)]
    pub sessions: Vec<Session>,
    #[serde(default)]
    pub current_account_id: Option<String>,
}

// ============================================================================
// Migration implementations
// ============================================================================

/// Migration from StoreDocumentV1_0_0 to StoreDocumentV1_1_0.
/// Sessions start unpinned and files start without a summary.
impl MigratesTo<StoreDocumentV1_1_0> for StoreDocumentV1_0_0 {
    fn migrate(self) -> StoreDocumentV1_1_0 {
        let sessions = self
            .sessions
            .into_iter()
            .map(|record| Session {
                id: record.id,
                account_id: record.account_id,
                topic: record.topic,
                messages: record.messages,
                diagram: record.diagram,
                image: record.image,
                files: record
                    .files
                    .into_iter()
                    .map(|file| UploadedFile {
                        id: file.id,
                        name: file.name,
                        size: file.size,
                        mime_type: file.mime_type,
                        uploaded_at: file.uploaded_at,
                        content: file.content,
                        summary: None,
                    })
                    .collect(),
                pinned: false,
                created_at: record.created_at,
                updated_at: record.updated_at,
            })
            .collect();

        StoreDocumentV1_1_0 {
            accounts: self.accounts,
            sessions,
            current_account_id: self.current_account_id,
        }
    }
}

// ============================================================================
// Domain model conversions
// ============================================================================

impl IntoDomain<StoreSnapshot> for StoreDocumentV1_1_0 {
    fn into_domain(self) -> StoreSnapshot {
        StoreSnapshot {
            accounts: self.accounts,
            sessions: self.sessions,
            current_account_id: self.current_account_id,
        }
    }
}

impl FromDomain<StoreSnapshot> for StoreDocumentV1_1_0 {
    fn from_domain(snapshot: StoreSnapshot) -> Self {
        let StoreSnapshot {
            accounts,
            sessions,
            current_account_id,
        } = snapshot;

        StoreDocumentV1_1_0 {
            accounts,
            sessions,
            current_account_id,
        }
    }
}

// ============================================================================
// Migrator factory
// ============================================================================

/// Creates and configures a Migrator instance for the store document.
///
/// # Migration Path
///
/// - V1.0.0 → V1.1.0: Adds `pinned` (false) and file `summary` (absent)
/// - V1.1.0 → StoreSnapshot: Converts DTO to the in-memory model
pub fn create_store_migrator() -> version_migrate::Migrator {
    let mut migrator = version_migrate::Migrator::builder().build();

    let store_path = version_migrate::Migrator::define("store")
        .from::<StoreDocumentV1_0_0>()
        .step::<StoreDocumentV1_1_0>()
        .into_with_save::<StoreSnapshot>();

    migrator
        .register(store_path)
        .expect("Failed to register store migration path");

    migrator
}

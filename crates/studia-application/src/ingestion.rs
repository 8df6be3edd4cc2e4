//! File ingestion pipeline.
//!
//! An upload is staged (attached and visible right away), then summarized by
//! the Historian. Only the summary ever reaches the answer context; until it
//! exists the file contributes nothing.

use crate::session::LiveSession;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use chrono::Utc;
use std::sync::Arc;
use studia_core::agent::AgentKind;
use studia_core::error::{Result, StudiaError};
use studia_core::inference::InferenceProvider;
use studia_core::session::{Message, Session, SessionStore, SessionUpdate, UploadedFile, apply};
use uuid::Uuid;

/// A file as handed over by the front end.
#[derive(Debug, Clone)]
pub struct RawFile {
    pub name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl RawFile {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }
}

/// Stages uploads into the live session and derives their summaries.
pub struct FileIngestion {
    live: Arc<LiveSession>,
    store: Arc<dyn SessionStore>,
    provider: Arc<dyn InferenceProvider>,
}

impl FileIngestion {
    pub fn new(
        live: Arc<LiveSession>,
        store: Arc<dyn SessionStore>,
        provider: Arc<dyn InferenceProvider>,
    ) -> Self {
        Self {
            live,
            store,
            provider,
        }
    }

    /// Attaches `raw` to the live session and summarizes it.
    ///
    /// Returns the owning session after ingestion. A failed summary leaves
    /// the file attached without one; that is not an error.
    pub async fn ingest_file(&self, raw: RawFile) -> Result<Session> {
        if raw.name.trim().is_empty() {
            return Err(StudiaError::validation("File name must not be empty"));
        }
        let session_id = self
            .live
            .session_id()
            .await
            .ok_or_else(|| StudiaError::validation("No active session"))?;

        let file = stage(&raw);
        let notice = Message::system(format!(
            "Attached {} ({})",
            file.name,
            human_size(file.size)
        ));

        self.live
            .apply_to(&session_id, SessionUpdate::AttachFile(file.clone()))
            .await;
        let staged = self
            .live
            .apply_to(&session_id, SessionUpdate::AppendMessage(notice.clone()))
            .await;

        if let Err(e) = self.store.append_file(&session_id, file.clone()).await {
            tracing::warn!("[FileIngestion] Failed to persist {}: {}", file.name, e);
        }
        let notice = staged
            .as_ref()
            .and_then(|s| s.messages.last().cloned())
            .unwrap_or(notice);
        if let Err(e) = self.store.append_message(&session_id, notice).await {
            tracing::warn!("[FileIngestion] Failed to persist upload notice: {}", e);
        }

        let Some(summary) = self.summarize(&raw).await else {
            return self.current_view(&session_id, staged).await;
        };

        let mut summarized = file.clone();
        summarized.summary = Some(summary.clone());
        if let Err(e) = self.store.replace_file(&session_id, summarized).await {
            tracing::warn!("[FileIngestion] Failed to persist summary of {}: {}", file.name, e);
        }

        let update = SessionUpdate::FileSummarized {
            file_id: file.id.clone(),
            summary,
        };
        match self.live.apply_to(&session_id, update.clone()).await {
            Some(session) => Ok(session),
            None => {
                tracing::info!(
                    "[FileIngestion] Session {} left the view before {} was summarized",
                    session_id,
                    file.name
                );
                let fallback = self.current_view(&session_id, staged).await?;
                Ok(apply(fallback, update))
            }
        }
    }

    async fn summarize(&self, raw: &RawFile) -> Option<String> {
        self.live
            .agent_started(AgentKind::Historian, format!("Reading {}", raw.name))
            .await;
        let result = self
            .provider
            .summarize_document(&raw.bytes, &raw.mime_type)
            .await;
        self.live.agent_finished(AgentKind::Historian).await;

        match result {
            Ok(summary) if !summary.trim().is_empty() => Some(summary),
            Ok(_) => {
                tracing::warn!("[FileIngestion] Empty summary for {}", raw.name);
                None
            }
            Err(e) => {
                tracing::warn!("[FileIngestion] Summary of {} failed: {}", raw.name, e);
                None
            }
        }
    }

    /// The session as the caller should see it now.
    async fn current_view(&self, session_id: &str, staged: Option<Session>) -> Result<Session> {
        if let Some(live) = self.live.session().await.filter(|s| s.id == session_id) {
            return Ok(live);
        }
        if let Some(staged) = staged {
            return Ok(staged);
        }
        self.store
            .find_session(session_id)
            .await?
            .ok_or_else(|| StudiaError::not_found("Session", session_id))
    }
}

fn stage(raw: &RawFile) -> UploadedFile {
    let mime_type = if raw.mime_type.trim().is_empty() {
        "application/octet-stream".to_string()
    } else {
        raw.mime_type.clone()
    };

    UploadedFile {
        id: Uuid::new_v4().to_string(),
        name: raw.name.clone(),
        size: raw.bytes.len() as u64,
        mime_type,
        uploaded_at: Utc::now(),
        content: BASE64_STANDARD.encode(&raw.bytes),
        summary: None,
    }
}

fn human_size(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    let size = bytes as f64;
    if size < KB {
        format!("{} B", bytes)
    } else if size < KB * KB {
        format!("{:.1} KB", size / KB)
    } else {
        format!("{:.1} MB", size / (KB * KB))
    }
}

//! Turn orchestration.
//!
//! A turn runs in two phases:
//!
//! 1. **Core** (ordered, awaited): append the user message, persist it,
//!    assemble the document context, generate the answer, append and
//!    persist the answer.
//! 2. **Satellites** (detached, unordered): narration, diagram and
//!    illustration. Each is tagged with the turn and merged into the live
//!    session whenever it resolves.
//!
//! Provider and store failures never escape a turn. The answer falls back to
//! an apology, the diagram stays as it was, the image falls back to a
//! placeholder, and persistence errors are logged.

use super::registry::{TaskRegistry, TurnSettled};
use crate::session::{LiveSession, NarrationStatus, TurnPhase, WriteTag};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use studia_core::agent::AgentKind;
use studia_core::config::StudiaConfig;
use studia_core::error::{Result, StudiaError};
use studia_core::inference::InferenceProvider;
use studia_core::session::{
    Message, Session, SessionPatch, SessionStore, SessionUpdate, UploadedFile,
};

/// Joins the summaries of summarized files, in attachment order, with a
/// blank line between them. Files without a summary contribute nothing.
pub fn assemble_context(files: &[UploadedFile]) -> String {
    files
        .iter()
        .filter_map(|file| file.summary.as_deref())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Degradation settings for a turn.
#[derive(Debug)]
pub struct TurnSettings {
    narration_enabled: AtomicBool,
    pub fallback_answer: String,
    pub placeholder_image: String,
}

impl TurnSettings {
    pub fn narration_enabled(&self) -> bool {
        self.narration_enabled.load(Ordering::Relaxed)
    }

    pub fn set_narration_enabled(&self, enabled: bool) {
        self.narration_enabled.store(enabled, Ordering::Relaxed);
    }
}

impl From<&StudiaConfig> for TurnSettings {
    fn from(config: &StudiaConfig) -> Self {
        Self {
            narration_enabled: AtomicBool::new(config.narration_enabled),
            fallback_answer: config.fallback_answer.clone(),
            placeholder_image: config.placeholder_image.clone(),
        }
    }
}

/// Result of a submitted turn.
#[derive(Debug, Clone)]
pub struct TurnHandle {
    turn_id: u64,
    session: Session,
    settled: TurnSettled,
}

impl TurnHandle {
    pub fn turn_id(&self) -> u64 {
        self.turn_id
    }

    /// The session as it was when the core phase completed.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// The answer appended by this turn.
    pub fn answer(&self) -> Option<&Message> {
        self.session.messages.last()
    }

    /// Waits for this turn's satellites to finish (successfully or not).
    pub async fn settled(&self) {
        self.settled.wait().await;
    }
}

/// Drives turns against the live session.
pub struct TurnOrchestrator {
    live: Arc<LiveSession>,
    store: Arc<dyn SessionStore>,
    provider: Arc<dyn InferenceProvider>,
    tasks: TaskRegistry,
    settings: Arc<TurnSettings>,
}

impl TurnOrchestrator {
    pub fn new(
        live: Arc<LiveSession>,
        store: Arc<dyn SessionStore>,
        provider: Arc<dyn InferenceProvider>,
        tasks: TaskRegistry,
        settings: Arc<TurnSettings>,
    ) -> Self {
        Self {
            live,
            store,
            provider,
            tasks,
            settings,
        }
    }

    pub fn settings(&self) -> &TurnSettings {
        &self.settings
    }

    /// Runs the core phase of a turn and launches its satellites.
    ///
    /// Returns once the answer is appended. Fails only on invalid input or
    /// when no session is live, in which case nothing changes.
    pub async fn submit_turn(&self, user_text: &str) -> Result<TurnHandle> {
        if user_text.trim().is_empty() {
            return Err(StudiaError::validation("Message must not be empty"));
        }

        // Optimistic append, visible before any I/O.
        let (tag, session) = self.live.begin_turn(Message::user(user_text)).await?;
        let Some(user_message) = session.messages.last().cloned() else {
            return Err(StudiaError::internal("Turn started without its message"));
        };
        tracing::info!(
            "[TurnOrchestrator] Turn {} started in session {}",
            tag.turn_id,
            tag.session_id
        );

        if let Err(e) = self
            .store
            .append_message(&tag.session_id, user_message.clone())
            .await
        {
            tracing::warn!("[TurnOrchestrator] Failed to persist user message: {}", e);
        }

        let history: Vec<Message> = session
            .conversation()
            .into_iter()
            .filter(|m| m.id != user_message.id)
            .collect();
        // Summaries may have landed while the question was persisted.
        let session = self
            .live
            .session()
            .await
            .filter(|live| live.id == tag.session_id)
            .unwrap_or(session);
        let context = assemble_context(&session.files);

        let answer = self
            .generate_answer(&history, user_text, &context)
            .await;
        let update = SessionUpdate::AppendMessage(Message::assistant(answer.clone()));
        // If the user switched away mid-turn, report the turn's own view.
        let session = match self.live.apply_to(&tag.session_id, update.clone()).await {
            Some(live) => live,
            None => studia_core::session::apply(session, update),
        };

        if let Some(answer_message) = session.messages.last().cloned() {
            if let Err(e) = self
                .store
                .append_message(&tag.session_id, answer_message)
                .await
            {
                tracing::warn!("[TurnOrchestrator] Failed to persist answer: {}", e);
            }
        }

        self.live
            .set_phase(&tag, TurnPhase::Settling { turn_id: tag.turn_id })
            .await;
        let settled = self.launch_satellites(&tag, &session.topic, &answer).await;

        Ok(TurnHandle {
            turn_id: tag.turn_id,
            session,
            settled,
        })
    }

    async fn generate_answer(&self, history: &[Message], user_text: &str, context: &str) -> String {
        self.live
            .agent_started(AgentKind::Teacher, "Preparing an answer")
            .await;
        let result = self.provider.complete_text(history, user_text, context).await;
        self.live.agent_finished(AgentKind::Teacher).await;

        match result {
            Ok(answer) => answer,
            Err(e) => {
                tracing::warn!("[TurnOrchestrator] Answer generation failed: {}", e);
                self.settings.fallback_answer.clone()
            }
        }
    }

    async fn launch_satellites(&self, tag: &WriteTag, topic: &str, answer: &str) -> TurnSettled {
        let tasks = self.tasks.turn(tag.turn_id);

        if self.settings.narration_enabled() {
            self.live
                .set_narration(tag, NarrationStatus::Loading { turn_id: tag.turn_id })
                .await;
            tasks.spawn(
                "narration",
                narrate(self.live.clone(), self.provider.clone(), tag.clone(), answer.to_string()),
            );
        }

        self.live
            .agent_started(AgentKind::Architect, "Drawing a diagram")
            .await;
        tasks.spawn(
            "diagram",
            regenerate_diagram(
                self.live.clone(),
                self.store.clone(),
                self.provider.clone(),
                tag.clone(),
                topic.to_string(),
                answer.to_string(),
            ),
        );

        self.live
            .agent_started(AgentKind::Illustrator, "Painting an illustration")
            .await;
        tasks.spawn(
            "illustration",
            regenerate_image(
                self.live.clone(),
                self.store.clone(),
                self.provider.clone(),
                tag.clone(),
                topic.to_string(),
                answer.to_string(),
                self.settings.placeholder_image.clone(),
            ),
        );

        let settled = tasks.seal();

        let finisher = settled.clone();
        let live = self.live.clone();
        let tag = tag.clone();
        self.tasks.spawn(async move {
            finisher.wait().await;
            live.set_phase(&tag, TurnPhase::Idle).await;
            tracing::debug!("[TurnOrchestrator] Turn {} settled", tag.turn_id);
        });

        settled
    }
}

async fn narrate(
    live: Arc<LiveSession>,
    provider: Arc<dyn InferenceProvider>,
    tag: WriteTag,
    answer: String,
) {
    let status = match provider.synthesize_speech(&answer).await {
        Ok(audio) => NarrationStatus::Ready {
            turn_id: tag.turn_id,
            audio,
        },
        Err(e) => {
            tracing::warn!("[TurnOrchestrator] Narration unavailable: {}", e);
            NarrationStatus::Unavailable { turn_id: tag.turn_id }
        }
    };
    live.set_narration(&tag, status).await;
}

async fn regenerate_diagram(
    live: Arc<LiveSession>,
    store: Arc<dyn SessionStore>,
    provider: Arc<dyn InferenceProvider>,
    tag: WriteTag,
    topic: String,
    answer: String,
) {
    let result = provider.describe_as_diagram(&topic, &answer).await;
    live.agent_finished(AgentKind::Architect).await;

    match result {
        Ok(diagram) => {
            if live
                .merge(&tag, SessionUpdate::ReplaceDiagram(diagram.clone()))
                .await
            {
                persist_patch(store.as_ref(), &tag, SessionPatch::diagram(diagram)).await;
            }
        }
        Err(e) => {
            tracing::warn!("[TurnOrchestrator] Diagram generation failed, keeping previous: {}", e);
        }
    }
}

async fn regenerate_image(
    live: Arc<LiveSession>,
    store: Arc<dyn SessionStore>,
    provider: Arc<dyn InferenceProvider>,
    tag: WriteTag,
    topic: String,
    answer: String,
    placeholder: String,
) {
    let result = provider.generate_image(&topic, &answer).await;
    live.agent_finished(AgentKind::Illustrator).await;

    let image = result.unwrap_or_else(|e| {
        tracing::warn!("[TurnOrchestrator] Illustration failed, using placeholder: {}", e);
        placeholder
    });

    if live.merge(&tag, SessionUpdate::ReplaceImage(image.clone())).await {
        persist_patch(store.as_ref(), &tag, SessionPatch::image(image)).await;
    }
}

async fn persist_patch(store: &dyn SessionStore, tag: &WriteTag, patch: SessionPatch) {
    if let Err(e) = store.update_session_fields(&tag.session_id, patch).await {
        tracing::warn!(
            "[TurnOrchestrator] Failed to persist turn {} result: {}",
            tag.turn_id,
            e
        );
    }
}

//! The live session state container.
//!
//! `LiveSession` owns the session the user is looking at together with the
//! process-local state around it (turn phase, agent board, narration). All
//! changes happen under one mutex and go through the session reducer; after
//! every change a [`LiveSnapshot`] is published on a watch channel.

use studia_core::agent::{AgentBoard, AgentKind};
use studia_core::config::StaleWritePolicy;
use studia_core::error::{Result, StudiaError};
use studia_core::inference::SpeechAudio;
use studia_core::session::{Message, Session, SessionUpdate, apply};
use tokio::sync::{Mutex, watch};

/// Identity of the turn a detached result belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteTag {
    pub session_id: String,
    pub turn_id: u64,
}

/// Where the latest turn is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TurnPhase {
    #[default]
    Idle,
    /// Core phase: the answer is being generated.
    Answering { turn_id: u64 },
    /// Answer is in; satellites may still be running.
    Settling { turn_id: u64 },
}

/// Narration state. Narration is never stored on the session.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum NarrationStatus {
    #[default]
    Idle,
    Loading { turn_id: u64 },
    Ready { turn_id: u64, audio: SpeechAudio },
    Unavailable { turn_id: u64 },
}

/// Everything an observer needs to render the current state.
#[derive(Debug, Clone, Default)]
pub struct LiveSnapshot {
    pub session: Option<Session>,
    pub latest_turn_id: u64,
    pub phase: TurnPhase,
    pub agents: AgentBoard,
    pub narration: NarrationStatus,
}

#[derive(Default)]
struct LiveState {
    session: Option<Session>,
    latest_turn_id: u64,
    phase: TurnPhase,
    agents: AgentBoard,
    narration: NarrationStatus,
}

impl LiveState {
    fn snapshot(&self) -> LiveSnapshot {
        LiveSnapshot {
            session: self.session.clone(),
            latest_turn_id: self.latest_turn_id,
            phase: self.phase,
            agents: self.agents.clone(),
            narration: self.narration.clone(),
        }
    }

    fn holds(&self, session_id: &str) -> bool {
        self.session.as_ref().is_some_and(|s| s.id == session_id)
    }

    /// Why a tagged write must be dropped, if it must.
    fn rejection(&self, tag: &WriteTag, policy: StaleWritePolicy) -> Option<&'static str> {
        if !self.holds(&tag.session_id) {
            return Some("session is no longer live");
        }
        if policy == StaleWritePolicy::DiscardStale && tag.turn_id < self.latest_turn_id {
            return Some("a newer turn has started");
        }
        None
    }
}

/// Shared container for the live session.
pub struct LiveSession {
    state: Mutex<LiveState>,
    publisher: watch::Sender<LiveSnapshot>,
    policy: StaleWritePolicy,
}

impl LiveSession {
    pub fn new(policy: StaleWritePolicy) -> Self {
        let (publisher, _) = watch::channel(LiveSnapshot::default());
        Self {
            state: Mutex::new(LiveState::default()),
            publisher,
            policy,
        }
    }

    /// Subscribes to snapshots. The receiver starts at the current value.
    pub fn subscribe(&self) -> watch::Receiver<LiveSnapshot> {
        self.publisher.subscribe()
    }

    /// Latest published snapshot.
    pub fn snapshot(&self) -> LiveSnapshot {
        self.publisher.borrow().clone()
    }

    pub async fn session(&self) -> Option<Session> {
        self.state.lock().await.session.clone()
    }

    pub async fn session_id(&self) -> Option<String> {
        self.state.lock().await.session.as_ref().map(|s| s.id.clone())
    }

    /// Makes `session` the live session and resets the process-local state.
    ///
    /// Turn ids keep counting up across loads, so tags from the previous
    /// session can never match the new one.
    pub async fn load(&self, session: Session) {
        let mut state = self.state.lock().await;
        tracing::debug!("[LiveSession] Loading session {}", session.id);
        state.session = Some(session);
        state.phase = TurnPhase::Idle;
        state.agents = AgentBoard::new();
        state.narration = NarrationStatus::Idle;
        self.publish(&state);
    }

    /// Drops the live session (e.g. on log-out).
    pub async fn clear(&self) {
        let mut state = self.state.lock().await;
        state.session = None;
        state.phase = TurnPhase::Idle;
        state.agents = AgentBoard::new();
        state.narration = NarrationStatus::Idle;
        self.publish(&state);
    }

    /// Starts a new turn by appending the user's message.
    ///
    /// Returns the tag for the turn's writes and the session after the
    /// append. Fails without any change when no session is live.
    pub async fn begin_turn(&self, message: Message) -> Result<(WriteTag, Session)> {
        let mut state = self.state.lock().await;
        let session = state
            .session
            .take()
            .ok_or_else(|| StudiaError::validation("No active session"))?;

        let session = apply(session, SessionUpdate::AppendMessage(message));
        state.latest_turn_id += 1;
        let tag = WriteTag {
            session_id: session.id.clone(),
            turn_id: state.latest_turn_id,
        };
        state.session = Some(session.clone());
        state.phase = TurnPhase::Answering {
            turn_id: tag.turn_id,
        };
        self.publish(&state);

        Ok((tag, session))
    }

    /// Applies an update if `session_id` is still live.
    ///
    /// Used for writes that belong to the ordered part of a turn or to an
    /// explicit user action, which are never stale with respect to turns.
    pub async fn apply_to(&self, session_id: &str, update: SessionUpdate) -> Option<Session> {
        let mut state = self.state.lock().await;
        if !state.holds(session_id) {
            tracing::debug!(
                "[LiveSession] Dropping {} for session {} (not live)",
                update.kind(),
                session_id
            );
            return None;
        }
        self.reduce(&mut state, update)
    }

    /// Merges a detached result, subject to the stale-write policy.
    ///
    /// Returns `true` if the update was applied.
    pub async fn merge(&self, tag: &WriteTag, update: SessionUpdate) -> bool {
        let mut state = self.state.lock().await;
        if let Some(reason) = state.rejection(tag, self.policy) {
            tracing::info!(
                "[LiveSession] Discarding {} from turn {}: {}",
                update.kind(),
                tag.turn_id,
                reason
            );
            return false;
        }
        self.reduce(&mut state, update).is_some()
    }

    /// Records narration progress for a turn, subject to the stale-write policy.
    pub async fn set_narration(&self, tag: &WriteTag, status: NarrationStatus) -> bool {
        let mut state = self.state.lock().await;
        if let Some(reason) = state.rejection(tag, self.policy) {
            tracing::debug!(
                "[LiveSession] Discarding narration from turn {}: {}",
                tag.turn_id,
                reason
            );
            return false;
        }
        state.narration = status;
        self.publish(&state);
        true
    }

    pub async fn agent_started(&self, kind: AgentKind, description: impl Into<String>) {
        let mut state = self.state.lock().await;
        state.agents.begin(kind, description);
        self.publish(&state);
    }

    pub async fn agent_finished(&self, kind: AgentKind) {
        let mut state = self.state.lock().await;
        state.agents.finish(kind);
        self.publish(&state);
    }

    /// Moves the turn to `phase` if it is still the latest turn of the live session.
    pub async fn set_phase(&self, tag: &WriteTag, phase: TurnPhase) {
        let mut state = self.state.lock().await;
        if state.holds(&tag.session_id) && tag.turn_id == state.latest_turn_id {
            state.phase = phase;
            self.publish(&state);
        }
    }

    fn reduce(&self, state: &mut LiveState, update: SessionUpdate) -> Option<Session> {
        let session = state.session.take()?;
        let session = apply(session, update);
        state.session = Some(session.clone());
        self.publish(state);
        Some(session)
    }

    fn publish(&self, state: &LiveState) {
        self.publisher.send_replace(state.snapshot());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn live_with(policy: StaleWritePolicy) -> (LiveSession, String) {
        let live = LiveSession::new(policy);
        let session = Session::new("acct", "Optics");
        let id = session.id.clone();
        live.load(session).await;
        (live, id)
    }

    #[tokio::test]
    async fn test_begin_turn_without_session_is_rejected() {
        let live = LiveSession::new(StaleWritePolicy::default());

        let err = live.begin_turn(Message::user("hi")).await.unwrap_err();
        assert!(err.is_validation());
        assert_eq!(live.snapshot().latest_turn_id, 0);
    }

    #[tokio::test]
    async fn test_begin_turn_publishes_user_message() {
        let (live, _) = live_with(StaleWritePolicy::default()).await;
        let rx = live.subscribe();

        let (tag, _) = live.begin_turn(Message::user("What is refraction?")).await.unwrap();

        let snapshot = rx.borrow().clone();
        assert_eq!(tag.turn_id, 1);
        assert_eq!(snapshot.phase, TurnPhase::Answering { turn_id: 1 });
        let session = snapshot.session.unwrap();
        assert_eq!(session.messages.last().unwrap().content, "What is refraction?");
    }

    #[tokio::test]
    async fn test_stale_merge_is_discarded_by_default() {
        let (live, _) = live_with(StaleWritePolicy::DiscardStale).await;
        let (old, _) = live.begin_turn(Message::user("one")).await.unwrap();
        let (new, _) = live.begin_turn(Message::user("two")).await.unwrap();

        assert!(live.merge(&new, SessionUpdate::ReplaceDiagram("new".into())).await);
        assert!(!live.merge(&old, SessionUpdate::ReplaceDiagram("old".into())).await);

        let session = live.session().await.unwrap();
        assert_eq!(session.diagram.as_deref(), Some("new"));
    }

    #[tokio::test]
    async fn test_last_write_wins_accepts_older_turns() {
        let (live, _) = live_with(StaleWritePolicy::LastWriteWins).await;
        let (old, _) = live.begin_turn(Message::user("one")).await.unwrap();
        let (new, _) = live.begin_turn(Message::user("two")).await.unwrap();

        assert!(live.merge(&new, SessionUpdate::ReplaceDiagram("new".into())).await);
        assert!(live.merge(&old, SessionUpdate::ReplaceDiagram("old".into())).await);

        let session = live.session().await.unwrap();
        assert_eq!(session.diagram.as_deref(), Some("old"));
    }

    #[tokio::test]
    async fn test_merge_for_other_session_is_discarded_under_any_policy() {
        for policy in [StaleWritePolicy::DiscardStale, StaleWritePolicy::LastWriteWins] {
            let (live, _) = live_with(policy).await;
            let (tag, _) = live.begin_turn(Message::user("one")).await.unwrap();
            live.load(Session::new("acct", "Another topic")).await;

            assert!(!live.merge(&tag, SessionUpdate::ReplaceImage("img".into())).await);
            assert!(live.session().await.unwrap().image.is_none());
        }
    }

    #[tokio::test]
    async fn test_set_phase_ignores_superseded_turn() {
        let (live, _) = live_with(StaleWritePolicy::default()).await;
        let (old, _) = live.begin_turn(Message::user("one")).await.unwrap();
        let (_new, _) = live.begin_turn(Message::user("two")).await.unwrap();

        live.set_phase(&old, TurnPhase::Idle).await;
        assert_eq!(live.snapshot().phase, TurnPhase::Answering { turn_id: 2 });
    }
}

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use studia_application::StudiaApp;
use studia_core::account::{
    Account, AccountCallback, AccountObservers, AccountStore, AccountSubscription, Credentials,
};
use studia_core::config::StudiaConfig;
use studia_core::error::{AuthError, Result, StudiaError};
use studia_core::inference::{InferenceProvider, SpeechAudio};
use studia_core::session::{
    Message, Session, SessionPatch, SessionStore, UploadedFile, sort_for_listing,
};
use tokio::sync::Notify;

// ============================================================================
// Inference provider
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    Answer,
    Speech,
    Diagram,
    Image,
    Summary,
}

/// One scripted provider response.
#[derive(Debug, Clone)]
pub struct Step {
    delay: Duration,
    value: Option<String>,
}

impl Step {
    pub fn ok(value: impl Into<String>) -> Self {
        Self {
            delay: Duration::ZERO,
            value: Some(value.into()),
        }
    }

    pub fn fail() -> Self {
        Self {
            delay: Duration::ZERO,
            value: None,
        }
    }

    pub fn after_ms(mut self, millis: u64) -> Self {
        self.delay = Duration::from_millis(millis);
        self
    }
}

/// A call the provider received.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub capability: Capability,
    /// new_text, topic, speech text or mime type
    pub input: String,
    pub context: String,
    pub history: Vec<Message>,
}

#[derive(Default)]
pub struct MockInferenceProvider {
    scripts: Mutex<HashMap<Capability, VecDeque<Step>>>,
    gates: Mutex<HashMap<Capability, Arc<Notify>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockInferenceProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(&self, capability: Capability, step: Step) {
        self.scripts
            .lock()
            .unwrap()
            .entry(capability)
            .or_default()
            .push_back(step);
    }

    /// Makes every call of `capability` wait for one `notify_one()` each.
    pub fn gate(&self, capability: Capability) -> Arc<Notify> {
        self.gates
            .lock()
            .unwrap()
            .entry(capability)
            .or_insert_with(|| Arc::new(Notify::new()))
            .clone()
    }

    pub fn calls(&self, capability: Capability) -> Vec<RecordedCall> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.capability == capability)
            .cloned()
            .collect()
    }

    async fn respond(
        &self,
        call: RecordedCall,
        default: impl FnOnce(&RecordedCall) -> String,
    ) -> Result<String> {
        let capability = call.capability;
        let step = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(&capability)
            .and_then(|queue| queue.pop_front());
        let gate = self.gates.lock().unwrap().get(&capability).cloned();
        let fallback = default(&call);
        self.calls.lock().unwrap().push(call);

        if let Some(gate) = gate {
            gate.notified().await;
        }

        let step = step.unwrap_or_else(|| Step::ok(fallback));
        if !step.delay.is_zero() {
            tokio::time::sleep(step.delay).await;
        }
        step.value
            .ok_or_else(|| StudiaError::inference(format!("scripted {:?} failure", capability)))
    }
}

#[async_trait]
impl InferenceProvider for MockInferenceProvider {
    async fn complete_text(
        &self,
        history: &[Message],
        new_text: &str,
        context: &str,
    ) -> Result<String> {
        let call = RecordedCall {
            capability: Capability::Answer,
            input: new_text.to_string(),
            context: context.to_string(),
            history: history.to_vec(),
        };
        self.respond(call, |c| format!("Answer to: {}", c.input)).await
    }

    async fn synthesize_speech(&self, text: &str) -> Result<SpeechAudio> {
        let call = RecordedCall {
            capability: Capability::Speech,
            input: text.to_string(),
            context: String::new(),
            history: Vec::new(),
        };
        let data = self.respond(call, |c| c.input.clone()).await?;
        Ok(SpeechAudio {
            mime_type: "audio/L16;rate=24000".to_string(),
            data: data.into_bytes(),
        })
    }

    async fn describe_as_diagram(&self, topic: &str, context: &str) -> Result<String> {
        let call = RecordedCall {
            capability: Capability::Diagram,
            input: topic.to_string(),
            context: context.to_string(),
            history: Vec::new(),
        };
        self.respond(call, |c| format!("graph TD; {}", c.input)).await
    }

    async fn generate_image(&self, topic: &str, context: &str) -> Result<String> {
        let call = RecordedCall {
            capability: Capability::Image,
            input: topic.to_string(),
            context: context.to_string(),
            history: Vec::new(),
        };
        self.respond(call, |c| format!("https://images.test/{}", c.input)).await
    }

    async fn summarize_document(&self, bytes: &[u8], mime_type: &str) -> Result<String> {
        let call = RecordedCall {
            capability: Capability::Summary,
            input: mime_type.to_string(),
            context: String::from_utf8_lossy(bytes).into_owned(),
            history: Vec::new(),
        };
        self.respond(call, |c| format!("Summary of {}", c.context)).await
    }
}

// ============================================================================
// Session store
// ============================================================================

/// In-memory session store that records every call.
#[derive(Default)]
pub struct RecordingSessionStore {
    sessions: Mutex<HashMap<String, Session>>,
    log: Mutex<Vec<String>>,
    fail_writes: AtomicBool,
    append_gate: Mutex<Option<Arc<Notify>>>,
}

impl RecordingSessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Makes every `append_message` wait for one `notify_one()` each.
    pub fn gate_appends(&self) -> Arc<Notify> {
        self.append_gate
            .lock()
            .unwrap()
            .get_or_insert_with(|| Arc::new(Notify::new()))
            .clone()
    }

    pub fn log(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    pub fn stored(&self, session_id: &str) -> Option<Session> {
        self.sessions.lock().unwrap().get(session_id).cloned()
    }

    fn record(&self, entry: String) {
        self.log.lock().unwrap().push(entry);
    }

    fn write<F>(&self, op: &str, session_id: &str, f: F) -> Result<()>
    where
        F: FnOnce(&mut Session) -> Result<()>,
    {
        self.record(format!("{op}:{session_id}"));
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StudiaError::data_access("store is offline"));
        }
        let mut sessions = self.sessions.lock().unwrap();
        let session = sessions
            .get_mut(session_id)
            .ok_or_else(|| StudiaError::not_found("Session", session_id))?;
        f(session)
    }
}

#[async_trait]
impl SessionStore for RecordingSessionStore {
    async fn list_sessions(&self, account_id: &str) -> Result<Vec<Session>> {
        self.record(format!("list_sessions:{account_id}"));
        let mut sessions: Vec<Session> = self
            .sessions
            .lock()
            .unwrap()
            .values()
            .filter(|s| s.account_id == account_id)
            .cloned()
            .collect();
        sort_for_listing(&mut sessions);
        Ok(sessions)
    }

    async fn create_session(&self, account_id: &str, topic: &str) -> Result<Session> {
        self.record(format!("create_session:{account_id}"));
        let session = Session::new(account_id, topic);
        self.sessions
            .lock()
            .unwrap()
            .insert(session.id.clone(), session.clone());
        Ok(session)
    }

    async fn find_session(&self, session_id: &str) -> Result<Option<Session>> {
        Ok(self.stored(session_id))
    }

    async fn update_session_fields(&self, session_id: &str, patch: SessionPatch) -> Result<()> {
        self.write("update_session_fields", session_id, |s| {
            patch.apply_to(s);
            Ok(())
        })
    }

    async fn append_message(&self, session_id: &str, message: Message) -> Result<()> {
        let gate = self.append_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        self.write("append_message", session_id, |s| {
            s.push_message(message);
            Ok(())
        })
    }

    async fn append_file(&self, session_id: &str, file: UploadedFile) -> Result<()> {
        self.write("append_file", session_id, |s| {
            s.files.push(file);
            Ok(())
        })
    }

    async fn replace_file(&self, session_id: &str, file: UploadedFile) -> Result<()> {
        self.write("replace_file", session_id, |s| {
            let slot = s
                .files
                .iter_mut()
                .find(|f| f.id == file.id)
                .ok_or_else(|| StudiaError::not_found("UploadedFile", file.id.clone()))?;
            *slot = file;
            Ok(())
        })
    }
}

// ============================================================================
// Account store
// ============================================================================

/// Account store with a single fixed account, signed in from the start.
pub struct MemoryAccountStore {
    account: Account,
    signed_in: Mutex<bool>,
    observers: AccountObservers,
}

impl MemoryAccountStore {
    pub fn signed_in() -> Self {
        Self {
            account: Account {
                id: "acct-1".to_string(),
                email: "student@example.com".to_string(),
                display_name: "Student".to_string(),
                created_at: chrono::Utc::now(),
            },
            signed_in: Mutex::new(true),
            observers: AccountObservers::new(),
        }
    }

    pub fn account(&self) -> &Account {
        &self.account
    }

    fn current(&self) -> Option<Account> {
        let signed_in = *self.signed_in.lock().unwrap();
        signed_in.then(|| self.account.clone())
    }
}

#[async_trait]
impl AccountStore for MemoryAccountStore {
    async fn authenticate(&self, credentials: &Credentials) -> Result<Account> {
        if credentials.normalized_email() != self.account.email {
            return Err(AuthError::InvalidCredentials.into());
        }
        *self.signed_in.lock().unwrap() = true;
        self.observers.notify(Some(&self.account));
        Ok(self.account.clone())
    }

    async fn create_account(&self, credentials: &Credentials, _display_name: &str) -> Result<Account> {
        Err(AuthError::AccountExists {
            email: credentials.normalized_email(),
        }
        .into())
    }

    async fn end_session(&self) -> Result<()> {
        *self.signed_in.lock().unwrap() = false;
        self.observers.notify(None);
        Ok(())
    }

    async fn current_account(&self) -> Option<Account> {
        self.current()
    }

    fn observe_account(&self, callback: AccountCallback) -> AccountSubscription {
        self.observers.subscribe(callback, self.current())
    }
}

// ============================================================================
// Harness
// ============================================================================

pub struct Harness {
    pub app: StudiaApp,
    pub store: Arc<RecordingSessionStore>,
    pub accounts: Arc<MemoryAccountStore>,
    pub provider: Arc<MockInferenceProvider>,
}

impl Harness {
    pub fn new(config: StudiaConfig) -> Self {
        let store = Arc::new(RecordingSessionStore::new());
        let accounts = Arc::new(MemoryAccountStore::signed_in());
        let provider = Arc::new(MockInferenceProvider::new());
        let app = StudiaApp::new(&config, store.clone(), accounts.clone(), provider.clone());
        Self {
            app,
            store,
            accounts,
            provider,
        }
    }

    /// Creates a session through the use case, which also makes it live.
    pub async fn open_session(&self, topic: &str) -> Session {
        self.app.sessions.create_session(topic).await.unwrap()
    }

    pub async fn live(&self) -> Session {
        self.app.live.session().await.unwrap()
    }
}

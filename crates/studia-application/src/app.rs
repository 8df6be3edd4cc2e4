//! Composition root for the application layer.

use crate::account_usecase::AccountUseCase;
use crate::ingestion::FileIngestion;
use crate::session::LiveSession;
use crate::session_usecase::SessionUseCase;
use crate::turn::{TaskRegistry, TurnOrchestrator, TurnSettings};
use std::sync::Arc;
use studia_core::account::AccountStore;
use studia_core::config::StudiaConfig;
use studia_core::inference::InferenceProvider;
use studia_core::session::SessionStore;

/// All application services wired around one live session.
pub struct StudiaApp {
    pub live: Arc<LiveSession>,
    pub sessions: SessionUseCase,
    pub accounts: AccountUseCase,
    pub turns: TurnOrchestrator,
    pub ingestion: FileIngestion,
    pub tasks: TaskRegistry,
}

impl StudiaApp {
    pub fn new(
        config: &StudiaConfig,
        session_store: Arc<dyn SessionStore>,
        account_store: Arc<dyn AccountStore>,
        provider: Arc<dyn InferenceProvider>,
    ) -> Self {
        let live = Arc::new(LiveSession::new(config.stale_write_policy));
        let tasks = TaskRegistry::new();
        let settings = Arc::new(TurnSettings::from(config));

        Self {
            sessions: SessionUseCase::new(session_store.clone(), account_store.clone(), live.clone()),
            accounts: AccountUseCase::new(account_store, live.clone()),
            turns: TurnOrchestrator::new(
                live.clone(),
                session_store.clone(),
                provider.clone(),
                tasks.clone(),
                settings,
            ),
            ingestion: FileIngestion::new(live.clone(), session_store, provider),
            live,
            tasks,
        }
    }

    /// Waits for detached work before the process exits.
    pub async fn shutdown(&self) {
        let pending = self.tasks.pending();
        if pending > 0 {
            tracing::info!("[StudiaApp] Waiting for {} detached task(s)", pending);
        }
        self.tasks.drain().await;
    }
}

//! Account use case: sign-up, log-in, log-out.

use crate::session::LiveSession;
use std::sync::Arc;
use studia_core::account::{Account, AccountCallback, AccountStore, AccountSubscription, Credentials};
use studia_core::error::{Result, StudiaError};

pub struct AccountUseCase {
    accounts: Arc<dyn AccountStore>,
    live: Arc<LiveSession>,
}

impl AccountUseCase {
    pub fn new(accounts: Arc<dyn AccountStore>, live: Arc<LiveSession>) -> Self {
        Self { accounts, live }
    }

    pub async fn sign_up(&self, credentials: &Credentials, display_name: &str) -> Result<Account> {
        let display_name = display_name.trim();
        let display_name = if display_name.is_empty() {
            credentials
                .normalized_email()
                .split('@')
                .next()
                .unwrap_or_default()
                .to_string()
        } else {
            display_name.to_string()
        };
        if !credentials.normalized_email().contains('@') {
            return Err(StudiaError::validation("Email address is not valid"));
        }

        let account = self.accounts.create_account(credentials, &display_name).await?;
        self.live.clear().await;
        Ok(account)
    }

    pub async fn log_in(&self, credentials: &Credentials) -> Result<Account> {
        let account = self.accounts.authenticate(credentials).await?;
        self.live.clear().await;
        Ok(account)
    }

    /// Signs out and closes the live session.
    pub async fn log_out(&self) -> Result<()> {
        self.accounts.end_session().await?;
        self.live.clear().await;
        tracing::info!("[AccountUseCase] Signed out");
        Ok(())
    }

    pub async fn current_account(&self) -> Option<Account> {
        self.accounts.current_account().await
    }

    pub fn observe_account(&self, callback: AccountCallback) -> AccountSubscription {
        self.accounts.observe_account(callback)
    }
}

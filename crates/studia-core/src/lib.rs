//! Domain layer for Studia.
//!
//! Sessions, messages, files, accounts, agent activity and the interfaces of
//! the external collaborators (session store, account store, inference
//! provider).

pub mod account;
pub mod agent;
pub mod config;
pub mod error;
pub mod inference;
pub mod session;

// Re-export common error type
pub use error::{AuthError, Result, StudiaError};

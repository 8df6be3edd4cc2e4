//! Account domain module.
//!
//! - `model`: `Account` and `Credentials`
//! - `service`: `AccountStore` trait and the observer registry

mod model;
mod service;

// Re-export public API
pub use model::{Account, Credentials};
pub use service::{AccountCallback, AccountObservers, AccountStore, AccountSubscription};

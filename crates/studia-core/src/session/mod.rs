//! Session domain module.
//!
//! This module contains all session-related domain models, the store
//! interface, and the reducer that applies field-level updates.
//!
//! # Module Structure
//!
//! - `model`: Core session domain model (`Session`)
//! - `message`: Conversation message types (`MessageRole`, `Message`)
//! - `file`: Attached files (`UploadedFile`)
//! - `update`: Field-level updates and the `apply` reducer
//! - `repository`: Store trait for session persistence

mod file;
mod message;
mod model;
mod repository;
mod update;

// Re-export public API
pub use file::UploadedFile;
pub use message::{Message, MessageRole};
pub use model::{Session, sort_for_listing};
pub use repository::{SessionPatch, SessionStore};
pub use update::{SessionUpdate, apply};

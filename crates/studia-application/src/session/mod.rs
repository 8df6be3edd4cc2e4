//! Session application services.
//!
//! This module contains the live session container the orchestrator and
//! the UI share, plus the store-side update helper.

mod live;
mod updater;

pub use live::{LiveSession, LiveSnapshot, NarrationStatus, TurnPhase, WriteTag};
pub use updater::SessionUpdater;

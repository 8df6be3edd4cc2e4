//! Application layer for Studia.
//!
//! This crate coordinates the domain and the collaborators (stores and the
//! inference provider) to run turns, ingest files and manage sessions and
//! accounts.

pub mod account_usecase;
pub mod app;
pub mod ingestion;
pub mod session;
pub mod session_usecase;
pub mod turn;

pub use account_usecase::AccountUseCase;
pub use app::StudiaApp;
pub use ingestion::{FileIngestion, RawFile};
pub use session::{LiveSession, LiveSnapshot, NarrationStatus, TurnPhase, WriteTag};
pub use session_usecase::SessionUseCase;
pub use turn::{TaskRegistry, TurnHandle, TurnOrchestrator, TurnSettings, assemble_context};

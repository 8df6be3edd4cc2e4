//! Turn orchestration and the detached-task registry.

mod orchestrator;
mod registry;

pub use orchestrator::{TurnHandle, TurnOrchestrator, TurnSettings, assemble_context};
pub use registry::{TaskRegistry, TurnSettled, TurnTasks};

//! Model-facing side of studia: the Gemini REST provider and the agent
//! prompt templates it renders.

pub mod gemini_provider;
pub mod prompts;

pub use gemini_provider::GeminiInferenceProvider;
pub use prompts::AgentPrompts;

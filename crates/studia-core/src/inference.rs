//! Inference provider interface.
//!
//! All four agents are backed by one provider. Latency and availability are
//! outside the application's control; every call may fail independently.

use crate::error::Result;
use crate::session::Message;
use async_trait::async_trait;

/// Synthesized narration audio.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechAudio {
    /// MIME type of `data` (e.g. `audio/L16;rate=24000`)
    pub mime_type: String,
    pub data: Vec<u8>,
}

/// Capabilities the orchestrator consumes from the model backend.
#[async_trait]
pub trait InferenceProvider: Send + Sync {
    /// Answers `new_text` given the prior conversation and document context.
    ///
    /// `context` is pre-processed text only; raw file bytes never reach this
    /// call.
    async fn complete_text(&self, history: &[Message], new_text: &str, context: &str)
    -> Result<String>;

    /// Reads `text` aloud.
    async fn synthesize_speech(&self, text: &str) -> Result<SpeechAudio>;

    /// Produces a diagram description (Mermaid source) of the topic.
    async fn describe_as_diagram(&self, topic: &str, context: &str) -> Result<String>;

    /// Produces an image reference (URL or data URL) illustrating the topic.
    async fn generate_image(&self, topic: &str, context: &str) -> Result<String>;

    /// Produces a dense extractive summary of a document.
    async fn summarize_document(&self, bytes: &[u8], mime_type: &str) -> Result<String>;
}

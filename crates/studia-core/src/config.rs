//! Application configuration model.
//!
//! Loaded from `config.toml` by the infrastructure layer; every field has a
//! default so a missing or partial file is fine.

use serde::{Deserialize, Serialize};

pub const DEFAULT_FALLBACK_ANSWER: &str =
    "I'm sorry, I couldn't come up with an answer just now. Please try asking again.";
pub const DEFAULT_PLACEHOLDER_IMAGE: &str =
    "https://placehold.co/800x450?text=Illustration+unavailable";

/// How detached results from older turns are merged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StaleWritePolicy {
    /// Drop results that belong to a turn older than the latest one.
    #[default]
    DiscardStale,
    /// Apply results in arrival order; the last to resolve wins.
    LastWriteWins,
}

/// Model names used by the inference provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub text_model: String,
    pub image_model: String,
    pub speech_model: String,
    pub voice: String,
    pub request_timeout_secs: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            text_model: "gemini-2.5-flash".to_string(),
            image_model: "gemini-2.5-flash-image".to_string(),
            speech_model: "gemini-2.5-flash-preview-tts".to_string(),
            voice: "Kore".to_string(),
            request_timeout_secs: 120,
        }
    }
}

/// Root configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StudiaConfig {
    /// Read every answer aloud
    pub narration_enabled: bool,
    /// Merge rule for detached results from older turns
    pub stale_write_policy: StaleWritePolicy,
    /// Assistant message used when the answer cannot be generated
    pub fallback_answer: String,
    /// Image reference used when the illustration cannot be generated
    pub placeholder_image: String,
    pub models: ModelConfig,
}

impl Default for StudiaConfig {
    fn default() -> Self {
        Self {
            narration_enabled: false,
            stale_write_policy: StaleWritePolicy::default(),
            fallback_answer: DEFAULT_FALLBACK_ANSWER.to_string(),
            placeholder_image: DEFAULT_PLACEHOLDER_IMAGE.to_string(),
            models: ModelConfig::default(),
        }
    }
}

/// Gemini API credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeminiSecret {
    pub api_key: String,
}

/// Contents of `secret.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretConfig {
    #[serde(default)]
    pub gemini: Option<GeminiSecret>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: StudiaConfig = toml::from_str(
            r#"
narration_enabled = true

[models]
voice = "Puck"
"#,
        )
        .unwrap();

        assert!(config.narration_enabled);
        assert_eq!(config.stale_write_policy, StaleWritePolicy::DiscardStale);
        assert_eq!(config.fallback_answer, DEFAULT_FALLBACK_ANSWER);
        assert_eq!(config.models.voice, "Puck");
        assert_eq!(config.models.text_model, "gemini-2.5-flash");
    }

    #[test]
    fn test_policy_names() {
        let config: StudiaConfig = toml::from_str(r#"stale_write_policy = "last_write_wins""#).unwrap();
        assert_eq!(config.stale_write_policy, StaleWritePolicy::LastWriteWins);
    }
}

//! GeminiInferenceProvider - Direct REST API implementation for Gemini.
//!
//! Every capability goes through the `generateContent` endpoint. Text, summary
//! and diagram calls use the text model; illustrations use the image model
//! with `IMAGE` output and narration uses the TTS model with `AUDIO` output.

use crate::prompts::AgentPrompts;
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use studia_core::config::ModelConfig;
use studia_core::error::{Result, StudiaError};
use studia_core::inference::{InferenceProvider, SpeechAudio};
use studia_core::session::{Message, MessageRole};
use studia_infrastructure::SecretService;

const BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const TTS_SAMPLE_RATE: u32 = 24_000;

/// Inference provider that talks to the Gemini HTTP API.
#[derive(Clone)]
pub struct GeminiInferenceProvider {
    client: Client,
    api_key: String,
    models: ModelConfig,
    base_url: String,
    prompts: std::sync::Arc<AgentPrompts>,
}

impl GeminiInferenceProvider {
    /// Creates a provider with the provided API key and model settings.
    pub fn new(api_key: impl Into<String>, models: ModelConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(models.request_timeout_secs))
            .build()
            .map_err(|e| StudiaError::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            models,
            base_url: BASE_URL.to_string(),
            prompts: std::sync::Arc::new(AgentPrompts::new()?),
        })
    }

    /// Resolves the API key from `secret.json` or `GEMINI_API_KEY`.
    pub fn from_secrets(secrets: &SecretService, models: ModelConfig) -> Result<Self> {
        Self::new(secrets.gemini_api_key()?, models)
    }

    /// Points the provider at a different API root (e.g. a proxy).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    async fn generate(&self, model: &str, body: &GenerateContentRequest) -> Result<Vec<PartResponse>> {
        let url = format!(
            "{}/{model}:generateContent?key={api_key}",
            self.base_url,
            api_key = self.api_key
        );

        tracing::debug!("[Gemini] generateContent model={}", model);
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|err| {
                StudiaError::inference(format!("Gemini API request failed: {}", err))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read Gemini error body".to_string());
            return Err(map_http_error(status, body_text));
        }

        let parsed: GenerateContentResponse = response.json().await.map_err(|err| {
            StudiaError::inference(format!("Failed to parse Gemini response: {}", err))
        })?;

        Ok(first_candidate_parts(parsed))
    }

    async fn generate_text(&self, body: &GenerateContentRequest) -> Result<String> {
        let parts = self.generate(&self.models.text_model, body).await?;
        extract_text(parts)
    }
}

#[async_trait]
impl InferenceProvider for GeminiInferenceProvider {
    async fn complete_text(
        &self,
        history: &[Message],
        new_text: &str,
        context: &str,
    ) -> Result<String> {
        let mut contents: Vec<Content> = history
            .iter()
            .filter_map(|message| {
                let role = match message.role {
                    MessageRole::User => "user",
                    MessageRole::Assistant => "model",
                    MessageRole::System => return None,
                };
                Some(Content::text(role, message.content.clone()))
            })
            .collect();
        contents.push(Content::text("user", new_text));

        let request = GenerateContentRequest {
            contents,
            system_instruction: Some(Content::text("system", self.prompts.teacher(context)?)),
            generation_config: None,
        };
        self.generate_text(&request).await
    }

    async fn synthesize_speech(&self, text: &str) -> Result<SpeechAudio> {
        let request = GenerateContentRequest {
            contents: vec![Content::text("user", text)],
            system_instruction: None,
            generation_config: Some(GenerationConfig {
                response_modalities: vec!["AUDIO".to_string()],
                speech_config: Some(SpeechConfig {
                    voice_config: VoiceConfig {
                        prebuilt_voice_config: PrebuiltVoiceConfig {
                            voice_name: self.models.voice.clone(),
                        },
                    },
                }),
            }),
        };

        let parts = self.generate(&self.models.speech_model, &request).await?;
        let inline = extract_inline_data(parts, "audio")?;
        let data = BASE64_STANDARD.decode(inline.data.as_bytes()).map_err(|e| {
            StudiaError::inference(format!("Gemini returned undecodable audio: {}", e))
        })?;

        let mime_type = if inline.mime_type.is_empty() {
            format!("audio/L16;rate={}", TTS_SAMPLE_RATE)
        } else {
            inline.mime_type
        };
        Ok(SpeechAudio { mime_type, data })
    }

    async fn describe_as_diagram(&self, topic: &str, context: &str) -> Result<String> {
        let request = GenerateContentRequest {
            contents: vec![Content::text("user", self.prompts.architect(topic, context)?)],
            system_instruction: None,
            generation_config: None,
        };
        let raw = self.generate_text(&request).await?;
        let diagram = strip_code_fence(&raw);
        if diagram.is_empty() {
            return Err(StudiaError::inference("Gemini returned an empty diagram"));
        }
        Ok(diagram)
    }

    async fn generate_image(&self, topic: &str, context: &str) -> Result<String> {
        let request = GenerateContentRequest {
            contents: vec![Content::text("user", self.prompts.illustrator(topic, context)?)],
            system_instruction: None,
            generation_config: Some(GenerationConfig {
                response_modalities: vec!["IMAGE".to_string()],
                speech_config: None,
            }),
        };

        let parts = self.generate(&self.models.image_model, &request).await?;
        let inline = extract_inline_data(parts, "image")?;
        Ok(format!("data:{};base64,{}", inline.mime_type, inline.data))
    }

    async fn summarize_document(&self, bytes: &[u8], mime_type: &str) -> Result<String> {
        let request = GenerateContentRequest {
            contents: vec![Content {
                role: "user".to_string(),
                parts: vec![
                    Part::InlineData {
                        inline_data: InlineDataPayload {
                            mime_type: mime_type.to_string(),
                            data: BASE64_STANDARD.encode(bytes),
                        },
                    },
                    Part::Text {
                        text: self.prompts.historian()?,
                    },
                ],
            }],
            system_instruction: None,
            generation_config: None,
        };
        self.generate_text(&request).await
    }
}

#[derive(Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    #[serde(rename = "generationConfig", skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Serialize)]
struct Content {
    role: String,
    parts: Vec<Part>,
}

impl Content {
    fn text(role: &str, text: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            parts: vec![Part::Text { text: text.into() }],
        }
    }
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineDataPayload,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineDataPayload {
    mime_type: String,
    data: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_modalities: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    speech_config: Option<SpeechConfig>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SpeechConfig {
    voice_config: VoiceConfig,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VoiceConfig {
    prebuilt_voice_config: PrebuiltVoiceConfig,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PrebuiltVoiceConfig {
    voice_name: String,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<ContentResponse>,
}

#[derive(Deserialize)]
struct ContentResponse {
    #[serde(default)]
    parts: Vec<PartResponse>,
}

#[derive(Deserialize)]
struct PartResponse {
    text: Option<String>,
    #[serde(rename = "inlineData")]
    inline_data: Option<InlineDataResponse>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineDataResponse {
    #[serde(default)]
    mime_type: String,
    data: String,
}

#[derive(Deserialize)]
struct ErrorWrapper {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[allow(dead_code)]
    code: Option<i32>,
    message: Option<String>,
    status: Option<String>,
}

fn first_candidate_parts(response: GenerateContentResponse) -> Vec<PartResponse> {
    response
        .candidates
        .and_then(|candidates| candidates.into_iter().next())
        .and_then(|candidate| candidate.content)
        .map(|content| content.parts)
        .unwrap_or_default()
}

fn extract_text(parts: Vec<PartResponse>) -> Result<String> {
    let text: String = parts.into_iter().filter_map(|part| part.text).collect();
    if text.trim().is_empty() {
        return Err(StudiaError::inference(
            "Gemini API returned no text in the response candidates",
        ));
    }
    Ok(text.trim().to_string())
}

fn extract_inline_data(parts: Vec<PartResponse>, kind: &str) -> Result<InlineDataResponse> {
    parts
        .into_iter()
        .find_map(|part| part.inline_data)
        .ok_or_else(|| {
            StudiaError::inference(format!("Gemini API returned no {} data", kind))
        })
}

/// Removes a surrounding Markdown code fence (e.g. ```` ```mermaid ````).
fn strip_code_fence(raw: &str) -> String {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed.to_string();
    };
    let body = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => "",
    };
    body.trim_end()
        .strip_suffix("```")
        .unwrap_or(body)
        .trim()
        .to_string()
}

fn map_http_error(status: StatusCode, body: String) -> StudiaError {
    let message = serde_json::from_str::<ErrorWrapper>(&body)
        .map(|wrapper| {
            let status_text = wrapper.error.status.unwrap_or_default();
            let msg = wrapper.error.message.unwrap_or_else(|| body.clone());
            if status_text.is_empty() {
                msg
            } else {
                format!("{status_text}: {msg}")
            }
        })
        .unwrap_or_else(|_| body.clone());

    StudiaError::inference(format!("Gemini API error ({}): {}", status.as_u16(), message))
}

use std::path::Path;

use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::error::InferenceError;
use crate::settings::Settings;

/// One image plus one prompt in, the model's free-text answer out.
#[async_trait]
pub trait VisionClient: Send + Sync {
    async fn infer(&self, image: &Path, prompt: &str) -> Result<String, InferenceError>;
}

/// Client for an OpenAI-compatible `/v1/chat/completions` endpoint
/// (LM Studio, vLLM, llama.cpp server, ...).
pub struct ChatCompletionsClient {
    http: Client,
    api_url: String,
    model: String,
    max_tokens: u32,
}

impl ChatCompletionsClient {
    pub fn new(settings: &Settings) -> Result<Self, InferenceError> {
        let mut builder = Client::builder();
        if let Some(timeout) = settings.request_timeout() {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            http: builder.build()?,
            api_url: settings.api_url.clone(),
            model: settings.model.clone(),
            max_tokens: settings.max_tokens,
        })
    }

    fn build_request<'a>(&'a self, prompt: &'a str, image_bytes: &[u8]) -> ChatRequest<'a> {
        let b64 = general_purpose::STANDARD.encode(image_bytes);
        ChatRequest {
            model: &self.model,
            messages: vec![ChatRequestMessage {
                role: "user",
                content: vec![
                    ContentPart::Text { text: prompt },
                    ContentPart::ImageUrl {
                        image_url: ImageUrl {
                            url: format!("data:image/jpeg;base64,{b64}"),
                        },
                    },
                ],
            }],
            max_tokens: self.max_tokens,
        }
    }
}

#[async_trait]
impl VisionClient for ChatCompletionsClient {
    async fn infer(&self, image: &Path, prompt: &str) -> Result<String, InferenceError> {
        let bytes = tokio::fs::read(image)
            .await
            .map_err(|source| InferenceError::ReadImage {
                path: image.to_path_buf(),
                source,
            })?;

        let body = self.build_request(prompt, &bytes);
        debug!(
            image = %image.display(),
            image_bytes = bytes.len(),
            model = %self.model,
            "Sending chat completion request"
        );

        let response = self.http.post(&self.api_url).json(&body).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(InferenceError::Status { status, body });
        }

        let raw = response.bytes().await?;
        parse_completion(&raw)
    }
}

/// Pull `choices[0].message.content` out of a completion body.
fn parse_completion(raw: &[u8]) -> Result<String, InferenceError> {
    let completion: ChatCompletion = serde_json::from_slice(raw).map_err(|e| {
        error!(raw_response = %String::from_utf8_lossy(raw), "Failed to parse completion JSON");
        InferenceError::MalformedResponse(e.to_string())
    })?;

    completion
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| InferenceError::MalformedResponse("no choices in response".into()))?
        .message
        .content
        .ok_or_else(|| InferenceError::MalformedResponse("choice has no message content".into()))
}

// ── Wire format ──

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatRequestMessage<'a>>,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatRequestMessage<'a> {
    role: &'static str,
    content: Vec<ContentPart<'a>>,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart<'a> {
    Text { text: &'a str },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Deserialize)]
struct ChatCompletion {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

//! Text-generation service clients.
//!
//! Two wire protocols cover every service the pipeline talks to:
//!
//! | Kind | Endpoint | Auth |
//! |---|---|---|
//! | `openai` | `POST {base}/chat/completions` | `Authorization: Bearer` |
//! | `gemini` | `POST {base}/models/{model}:generateContent` | `?key=` query |
//!
//! Any OpenAI-compatible vendor (ZhipuAI, SiliconFlow, DeepSeek, ...) is
//! reached by pointing `provider.base_url` at it. Clients are blocking: the
//! pipeline is sequential and makes one call per run.

use crate::config::{ConfigError, ProviderConfig, ProviderKind};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Authentication failed: {0}")]
    Auth(String),
    #[error("Rate limit exceeded: {0}")]
    RateLimit(String),
    #[error("Request failed with status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Malformed response: {0}")]
    Malformed(String),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// A service that turns a system + user prompt into raw completion text.
pub trait TextProvider {
    fn complete(&self, system: &str, user: &str) -> Result<String, ProviderError>;

    fn describe(&self) -> String;
}

impl<T: TextProvider + ?Sized> TextProvider for Box<T> {
    fn complete(&self, system: &str, user: &str) -> Result<String, ProviderError> {
        (**self).complete(system, user)
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(180);

fn build_http_client() -> Result<Client, ProviderError> {
    Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .timeout(REQUEST_TIMEOUT)
        .build()
        .map_err(|e| ProviderError::Transport(format!("Failed to create HTTP client: {e}")))
}

fn map_http_error(error: reqwest::Error) -> ProviderError {
    if error.is_timeout() {
        ProviderError::Transport(format!("Request timeout: {error}"))
    } else if error.is_connect() {
        ProviderError::Transport(format!("Connection error: {error}"))
    } else {
        ProviderError::Transport(format!("HTTP error: {error}"))
    }
}

fn status_error(status: u16, body: String) -> ProviderError {
    match status {
        401 | 403 => ProviderError::Auth(body),
        429 => ProviderError::RateLimit(body),
        _ => ProviderError::Status { status, body },
    }
}

/// Send a JSON request and return the body text of a 2xx response.
fn send_json(request: reqwest::blocking::RequestBuilder) -> Result<String, ProviderError> {
    let response = request.send().map_err(map_http_error)?;
    let status = response.status();
    let body = response
        .text()
        .map_err(|e| ProviderError::Transport(format!("Failed to read response: {e}")))?;
    if !status.is_success() {
        return Err(status_error(status.as_u16(), body));
    }
    Ok(body)
}

// OpenAI-compatible request/response structures
#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
    stream: bool,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Pull the first choice's message content out of a chat-completions body.
pub fn extract_chat_content(body: &str) -> Result<String, ProviderError> {
    let parsed: ChatCompletionResponse = serde_json::from_str(body)
        .map_err(|e| ProviderError::Malformed(format!("chat completion body: {e}")))?;
    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| ProviderError::Malformed("No choices in response".to_string()))
}

/// Client for any OpenAI-compatible chat-completions endpoint.
pub struct OpenAiCompatible {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl OpenAiCompatible {
    pub fn new(config: &ProviderConfig, api_key: String) -> Result<Self, ProviderError> {
        Ok(Self {
            client: build_http_client()?,
            base_url: config.resolved_base_url(),
            api_key,
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }
}

impl TextProvider for OpenAiCompatible {
    fn complete(&self, system: &str, user: &str) -> Result<String, ProviderError> {
        let request = ChatCompletionRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            stream: false,
        };
        let url = format!("{}/chat/completions", self.base_url);
        let body = send_json(
            self.client
                .post(&url)
                .bearer_auth(&self.api_key)
                .json(&request),
        )?;
        extract_chat_content(&body)
    }

    fn describe(&self) -> String {
        format!("openai-compatible {} at {}", self.model, self.base_url)
    }
}

// Gemini generateContent structures
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<GeminiContent<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct GeminiContent<'a> {
    parts: Vec<GeminiPart<'a>>,
}

#[derive(Serialize)]
struct GeminiPart<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

/// Pull the first candidate's first text part out of a generateContent body.
pub fn extract_gemini_text(body: &str) -> Result<String, ProviderError> {
    let parsed: GenerateContentResponse = serde_json::from_str(body)
        .map_err(|e| ProviderError::Malformed(format!("generateContent body: {e}")))?;
    parsed
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content.parts.into_iter().next())
        .and_then(|p| p.text)
        .ok_or_else(|| ProviderError::Malformed("No candidates in response".to_string()))
}

/// Client for the Gemini `generateContent` API.
///
/// Gemini has no separate system role in this call shape; the system prompt
/// is prepended to the user prompt.
pub struct Gemini {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl Gemini {
    pub fn new(config: &ProviderConfig, api_key: String) -> Result<Self, ProviderError> {
        Ok(Self {
            client: build_http_client()?,
            base_url: config.resolved_base_url(),
            api_key,
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }
}

impl TextProvider for Gemini {
    fn complete(&self, system: &str, user: &str) -> Result<String, ProviderError> {
        let prompt = format!("{system}\n\n{user}");
        let request = GenerateContentRequest {
            contents: vec![GeminiContent {
                parts: vec![GeminiPart { text: &prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: self.temperature,
                max_output_tokens: self.max_tokens,
            },
        };
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let body = send_json(
            self.client
                .post(&url)
                .query(&[("key", self.api_key.as_str())])
                .json(&request),
        )?;
        extract_gemini_text(&body)
    }

    fn describe(&self) -> String {
        format!("gemini {} at {}", self.model, self.base_url)
    }
}

/// Build the configured provider. Reads the API key from the environment.
pub fn from_config(config: &ProviderConfig) -> Result<Box<dyn TextProvider>, ProviderError> {
    let api_key = config.api_key()?;
    Ok(match config.kind {
        ProviderKind::Openai => Box::new(OpenAiCompatible::new(config, api_key)?),
        ProviderKind::Gemini => Box::new(Gemini::new(config, api_key)?),
    })
}

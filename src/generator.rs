//! Text-generation provider.
//!
//! The planner only needs "prompt in, text out". `TextGenerator` is that seam;
//! `OpenAiGenerator` implements it against any OpenAI-compatible
//! chat.completions endpoint. Calls are instrumented and log model names,
//! latencies and token usage (not contents).
//!
//! NOTE: We never log the API key.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};

use crate::config::GenerationConfig;
use crate::util::trunc_for_log;

/// Sampling parameters sent with every generation request.
#[derive(Clone, Debug, PartialEq)]
pub struct GenerationParams {
  pub model: String,
  pub temperature: f32,
  pub max_tokens: u32,
}

impl From<&GenerationConfig> for GenerationParams {
  fn from(cfg: &GenerationConfig) -> Self {
    Self { model: cfg.model.clone(), temperature: cfg.temperature, max_tokens: cfg.max_tokens }
  }
}

#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
  #[error("text generation is disabled (no API key configured)")]
  Disabled,
  #[error("request failed: {0}")]
  Http(#[from] reqwest::Error),
  #[error("provider returned HTTP {status}: {message}")]
  Status { status: u16, message: String },
  #[error("could not decode provider response: {0}")]
  Decode(String),
  #[error("provider returned an empty response")]
  EmptyResponse,
}

#[async_trait]
pub trait TextGenerator: Send + Sync {
  /// Provider name for logs.
  fn name(&self) -> &str;

  async fn generate(&self, prompt: &str, params: &GenerationParams) -> Result<String, GenerationError>;
}

#[derive(Clone)]
pub struct OpenAiGenerator {
  pub client: reqwest::Client,
  pub api_key: String,
  pub base_url: String,
}

impl OpenAiGenerator {
  /// Construct the client if an API key is found (OPENAI_API_KEY first, then
  /// the config file); otherwise, or if the HTTP client cannot be built
  /// (logged), return None. OPENAI_BASE_URL overrides the
  /// configured base URL.
  pub fn from_env(cfg: &GenerationConfig) -> Option<Self> {
    let api_key = std::env::var("OPENAI_API_KEY")
      .ok()
      .filter(|k| !k.trim().is_empty())
      .or_else(|| cfg.api_key.clone().filter(|k| !k.trim().is_empty()))?;
    let base_url = std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| cfg.base_url.clone());

    let client = build_client(cfg.timeout_secs)?;

    Some(Self { client, api_key, base_url: base_url.trim_end_matches('/').to_string() })
  }
}

/// HTTP client with the request timeout; a build failure is logged here so
/// callers can tell it apart from a missing key.
fn build_client(timeout_secs: u64) -> Option<reqwest::Client> {
  match reqwest::Client::builder().timeout(Duration::from_secs(timeout_secs)).build() {
    Ok(c) => Some(c),
    Err(e) => {
      error!(target: "lesson_planner", error = %e, "Failed to build HTTP client for text generation");
      None
    }
  }
}

#[async_trait]
impl TextGenerator for OpenAiGenerator {
  fn name(&self) -> &str {
    "openai"
  }

  #[instrument(level = "info", skip(self, prompt, params), fields(model = %params.model, prompt_len = prompt.len()))]
  async fn generate(&self, prompt: &str, params: &GenerationParams) -> Result<String, GenerationError> {
    let url = format!("{}/chat/completions", self.base_url);
    let req = ChatCompletionRequest {
      model: params.model.clone(),
      messages: vec![ChatMessageReq { role: "user".into(), content: prompt.into() }],
      temperature: params.temperature,
      max_tokens: Some(params.max_tokens),
    };

    let start = Instant::now();
    let res = self.client.post(&url)
      .header(USER_AGENT, "lesson-planner/0.1")
      .header(CONTENT_TYPE, "application/json")
      .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
      .json(&req).send().await?;

    if !res.status().is_success() {
      let status = res.status();
      let body = res.text().await.unwrap_or_default();
      let message = extract_openai_error(&body).unwrap_or(body);
      error!(status = status.as_u16(), elapsed = ?start.elapsed(), body = %trunc_for_log(&message, 300), "Provider returned an error status");
      return Err(GenerationError::Status { status: status.as_u16(), message });
    }

    let body: ChatCompletionResponse = res.json().await.map_err(|e| GenerationError::Decode(e.to_string()))?;
    if let Some(usage) = &body.usage {
      info!(prompt_tokens = ?usage.prompt_tokens, completion_tokens = ?usage.completion_tokens, total_tokens = ?usage.total_tokens, "Provider usage");
    }
    let text = body.choices.first()
      .and_then(|c| c.message.content.clone())
      .unwrap_or_default().trim().to_string();

    info!(elapsed = ?start.elapsed(), response_len = text.len(), "Model response received");
    if text.is_empty() {
      return Err(GenerationError::EmptyResponse);
    }
    Ok(text)
  }
}

// --- Chat DTOs ---

#[derive(Serialize)]
struct ChatCompletionRequest {
  model: String,
  messages: Vec<ChatMessageReq>,
  temperature: f32,
  #[serde(skip_serializing_if = "Option::is_none")]
  max_tokens: Option<u32>,
}
#[derive(Serialize)]
struct ChatMessageReq { role: String, content: String }

#[derive(Deserialize)]
struct ChatCompletionResponse {
  choices: Vec<ChatChoice>,
  #[serde(default)] usage: Option<Usage>,
}
#[derive(Deserialize)]
struct ChatChoice { message: ChatMessageResp }
#[derive(Deserialize)]
struct ChatMessageResp { content: Option<String> }
#[derive(Deserialize)]
struct Usage {
  #[serde(default)] prompt_tokens: Option<u32>,
  #[serde(default)] completion_tokens: Option<u32>,
  #[serde(default)] total_tokens: Option<u32>,
}

/// Try to extract a clean error message from an OpenAI-style error body.
fn extract_openai_error(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct EWrap { error: EObj }
  #[derive(Deserialize)]
  struct EObj { message: String }
  serde_json::from_str::<EWrap>(body).ok().map(|w| w.error.message)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn vendor_error_message_is_extracted() {
    let body = r#"{"error": {"message": "Incorrect API key provided", "type": "invalid_request_error"}}"#;
    assert_eq!(extract_openai_error(body).as_deref(), Some("Incorrect API key provided"));
    assert_eq!(extract_openai_error("<html>502</html>"), None);
  }

  #[test]
  fn request_serializes_max_tokens_and_single_user_message() {
    let req = ChatCompletionRequest {
      model: "m".into(),
      messages: vec![ChatMessageReq { role: "user".into(), content: "hola".into() }],
      temperature: 0.3,
      max_tokens: Some(2800),
    };
    let v = serde_json::to_value(&req).unwrap();
    assert_eq!(v["max_tokens"], 2800);
    assert_eq!(v["messages"][0]["role"], "user");
    assert_eq!(v["messages"].as_array().unwrap().len(), 1);
  }

  #[test]
  fn client_builds_with_configured_timeout() {
    assert!(build_client(GenerationConfig::default().timeout_secs).is_some());
  }

  #[test]
  fn params_follow_generation_config() {
    let cfg = GenerationConfig { model: "x".into(), temperature: 0.5, max_tokens: 100, ..Default::default() };
    let p = GenerationParams::from(&cfg);
    assert_eq!(p, GenerationParams { model: "x".into(), temperature: 0.5, max_tokens: 100 });
  }
}

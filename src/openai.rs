//! Minimal OpenAI-compatible client for quiz generation.
//!
//! We only call chat.completions and ask for plain text; parsing happens in the generator.
//! Calls are instrumented and log model names, latencies, and response sizes (not contents).
//!
//! NOTE: We never log the API key.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::error::QuizError;
use crate::generator::TextGenerator;

#[derive(Clone)]
pub struct OpenAI {
  pub client: reqwest::Client,
  pub api_key: String,
  pub base_url: String,
  pub model: String,
}

impl OpenAI {
  pub fn new(api_key: String, base_url: String, model: String, timeout: Duration) -> Result<Self, QuizError> {
    let client = reqwest::Client::builder()
      .timeout(timeout)
      .build()
      .map_err(|e| QuizError::Configuration(format!("could not build HTTP client: {}", e)))?;
    Ok(Self { client, api_key, base_url, model })
  }

  /// `Ok(None)` when OPENAI_API_KEY is absent; `Err` when the client itself cannot be built.
  pub fn from_env() -> Result<Option<Self>, QuizError> {
    let Some(api_key) = std::env::var("OPENAI_API_KEY").ok().filter(|k| !k.trim().is_empty()) else {
      return Ok(None);
    };
    let base_url =
      std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| "https://api.openai.com/v1".into());
    let model = std::env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".into());
    let timeout_secs = std::env::var("OPENAI_TIMEOUT_SECS")
      .ok()
      .and_then(|s| s.parse::<u64>().ok())
      .unwrap_or(60);

    Self::new(api_key, base_url, model, Duration::from_secs(timeout_secs)).map(Some)
  }

  /// Plain-text chat completion.
  #[instrument(level = "info", skip(self, system, user), fields(model = %self.model, prompt_len = user.len()))]
  async fn chat_plain(&self, system: &str, user: &str, temperature: f32) -> Result<String, QuizError> {
    let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
    let req = ChatCompletionRequest {
      model: self.model.clone(),
      messages: vec![
        ChatMessageReq { role: "system".into(), content: system.into() },
        ChatMessageReq { role: "user".into(), content: user.into() },
      ],
      temperature,
      max_tokens: None,
    };

    let start = std::time::Instant::now();
    let res = self.client.post(&url)
      .header(USER_AGENT, "quizify-backend/0.1")
      .header(CONTENT_TYPE, "application/json")
      .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
      .json(&req).send().await
      .map_err(|e| {
        if e.is_timeout() {
          QuizError::GenerationService(format!("request timed out: {}", e))
        } else {
          QuizError::GenerationService(e.to_string())
        }
      })?;

    if !res.status().is_success() {
      let status = res.status();
      let body = res.text().await.unwrap_or_default();
      let msg = extract_openai_error(&body).unwrap_or(body);
      return Err(QuizError::GenerationService(format!("OpenAI HTTP {}: {}", status, msg)));
    }

    let body: ChatCompletionResponse = res
      .json()
      .await
      .map_err(|e| QuizError::GenerationService(format!("unreadable completion envelope: {}", e)))?;
    if let Some(usage) = &body.usage {
      info!(prompt_tokens = ?usage.prompt_tokens, completion_tokens = ?usage.completion_tokens, total_tokens = ?usage.total_tokens, "OpenAI usage");
    }
    let text = body.choices.first()
      .and_then(|c| c.message.content.clone())
      .unwrap_or_default().trim().to_string();

    info!(elapsed = ?start.elapsed(), response_len = text.len(), "Model response received");
    Ok(text)
  }
}

#[async_trait]
impl TextGenerator for OpenAI {
  async fn complete(&self, system: &str, user: &str) -> Result<String, QuizError> {
    self.chat_plain(system, user, 0.4).await
  }

  fn describe(&self) -> String {
    format!("{} via {}", self.model, self.base_url)
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

/// Try to extract a clean error message from OpenAI error body.
fn extract_openai_error(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct EWrap { error: EObj }
  #[derive(Deserialize)]
  struct EObj { message: String }
  serde_json::from_str::<EWrap>(body).ok().map(|w| w.error.message)
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use axum::{http::StatusCode, routing::post, Json, Router};
  use serde_json::{json, Value};

  use super::*;
  use crate::config::Prompts;
  use crate::generator::QuestionGenerator;

  #[test]
  fn extracts_provider_error_message() {
    let body = r#"{"error":{"message":"Incorrect API key provided","type":"invalid_request_error"}}"#;
    assert_eq!(extract_openai_error(body).as_deref(), Some("Incorrect API key provided"));
    assert_eq!(extract_openai_error("<html>bad gateway</html>"), None);
  }

  #[test]
  fn request_omits_unset_max_tokens() {
    let req = ChatCompletionRequest {
      model: "m".into(),
      messages: vec![ChatMessageReq { role: "user".into(), content: "hi".into() }],
      temperature: 0.4,
      max_tokens: None,
    };
    let v = serde_json::to_value(&req).expect("serialize");
    assert!(v.get("max_tokens").is_none());
    assert_eq!(v["messages"][0]["role"], "user");
  }

  #[test]
  fn from_env_separates_missing_key_from_a_built_client() {
    // Only this test touches OPENAI_API_KEY.
    std::env::remove_var("OPENAI_API_KEY");
    assert!(matches!(OpenAI::from_env(), Ok(None)));

    std::env::set_var("OPENAI_API_KEY", "sk-test");
    let built = OpenAI::from_env();
    std::env::remove_var("OPENAI_API_KEY");
    match built {
      Ok(Some(oa)) => assert_eq!(oa.api_key, "sk-test"),
      Ok(None) => panic!("key was set"),
      Err(e) => panic!("client should build: {e}"),
    }
  }

  /// Serve `router` on an ephemeral local port and return a client pointed at it.
  async fn local_openai(router: Router, timeout: Duration) -> OpenAI {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
      let _ = axum::serve(listener, router).await;
    });
    OpenAI::new("test-key".into(), format!("http://{}/v1", addr), "test-model".into(), timeout)
      .expect("client")
  }

  #[tokio::test]
  async fn slow_provider_times_out_as_service_error() {
    let router = Router::new().route(
      "/v1/chat/completions",
      post(|| async {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Json(json!({ "choices": [] }))
      }),
    );
    let oa = local_openai(router, Duration::from_millis(200)).await;

    let err = oa.complete("system", "user").await.unwrap_err();
    assert_eq!(err.kind(), "generation_service");
    assert!(err.to_string().contains("timed out"), "{err}");
  }

  #[tokio::test]
  async fn http_error_carries_provider_message() {
    let router = Router::new().route(
      "/v1/chat/completions",
      post(|| async {
        (
          StatusCode::UNAUTHORIZED,
          Json(json!({ "error": { "message": "Incorrect API key provided", "type": "invalid_request_error" } })),
        )
      }),
    );
    let oa = local_openai(router, Duration::from_secs(5)).await;

    match oa.complete("system", "user").await.unwrap_err() {
      QuizError::GenerationService(msg) => {
        assert!(msg.contains("401"), "{msg}");
        assert!(msg.contains("Incorrect API key provided"), "{msg}");
      }
      other => panic!("unexpected error: {other:?}"),
    }
  }

  #[tokio::test]
  async fn empty_choices_are_rejected_by_the_generator() {
    let router = Router::new().route(
      "/v1/chat/completions",
      post(|| async { Json(json!({ "choices": [] })) }),
    );
    let oa = local_openai(router, Duration::from_secs(5)).await;
    let generator = QuestionGenerator::new(Arc::new(oa), Prompts::default());

    let err = generator.generate("a transcript about bees", 5).await.unwrap_err();
    assert_eq!(err.kind(), "generation_invalid");
  }

  #[tokio::test]
  async fn completion_text_is_returned_trimmed() {
    let router = Router::new().route(
      "/v1/chat/completions",
      post(|Json(req): Json<Value>| async move {
        assert_eq!(req["model"], "test-model");
        Json(json!({ "choices": [{ "message": { "content": "  [] \n" } }] }))
      }),
    );
    let oa = local_openai(router, Duration::from_secs(5)).await;
    assert_eq!(oa.complete("system", "user").await.expect("text"), "[]");
  }

  #[test]
  fn completion_envelope_tolerates_missing_usage() {
    let body = r#"{"choices":[{"message":{"content":"[]"}}]}"#;
    let parsed: ChatCompletionResponse = serde_json::from_str(body).expect("parse");
    assert!(parsed.usage.is_none());
    assert_eq!(parsed.choices[0].message.content.as_deref(), Some("[]"));
  }
}

//! Question Generator: transcript → prompt → one model call → validated `QuestionSet`.
//!
//! Flow:
//! 1) Reject blank transcripts and out-of-range counts before any network call.
//! 2) Fill the prompt template (count first, transcript last, so transcript text is never re-templated).
//! 3) Call the text-generation service exactly once.
//! 4) Strip code fences, parse as a JSON array of questions.
//! 5) Validate every question; one bad question rejects the whole set.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info, instrument, warn};

use crate::config::Prompts;
use crate::domain::{Question, QuestionSet};
use crate::error::QuizError;
use crate::util::{fill_template, trunc_for_log};

/// Free-form text generation capability (an LLM behind some API).
#[async_trait]
pub trait TextGenerator: Send + Sync {
  async fn complete(&self, system: &str, user: &str) -> Result<String, QuizError>;

  /// Short label for logs (model/provider), never secrets.
  fn describe(&self) -> String;
}

#[derive(Clone)]
pub struct QuestionGenerator {
  client: Arc<dyn TextGenerator>,
  prompts: Prompts,
}

impl QuestionGenerator {
  pub fn new(client: Arc<dyn TextGenerator>, prompts: Prompts) -> Self {
    Self { client, prompts }
  }

  pub fn describe(&self) -> String { self.client.describe() }

  /// Produce a validated question set with between 1 and `max_questions` items.
  #[instrument(level = "info", skip(self, transcript), fields(transcript_len = transcript.len(), %max_questions))]
  pub async fn generate(&self, transcript: &str, max_questions: usize) -> Result<QuestionSet, QuizError> {
    if transcript.trim().is_empty() {
      return Err(QuizError::Validation("Missing 'transcript' in request body.".into()));
    }
    if max_questions == 0 {
      return Err(QuizError::Validation("maxQuestions must be at least 1.".into()));
    }

    let user = build_user_prompt(&self.prompts, transcript, max_questions);
    let start = std::time::Instant::now();
    let raw = match self.client.complete(&self.prompts.quiz_system, &user).await {
      Ok(text) => text,
      Err(e) => {
        error!(target: "quiz", elapsed = ?start.elapsed(), error = %e, "Model call failed during quiz generation");
        return Err(e);
      }
    };

    match parse_question_set(&raw, max_questions) {
      Ok(set) => {
        info!(target: "quiz", elapsed = ?start.elapsed(), questions = set.len(), "Quiz generated");
        Ok(set)
      }
      Err(e) => {
        warn!(target: "quiz", error = %e, raw = %trunc_for_log(&raw, 400), "Model response failed validation");
        Err(e)
      }
    }
  }
}

pub fn build_user_prompt(prompts: &Prompts, transcript: &str, max_questions: usize) -> String {
  let max = max_questions.to_string();
  fill_template(
    &prompts.quiz_user_template,
    &[("max_questions", max.as_str()), ("transcript", transcript.trim())],
  )
}

/// Remove a surrounding Markdown code fence (```json ... ``` or ``` ... ```).
pub fn strip_code_fences(text: &str) -> &str {
  let mut s = text.trim();
  if let Some(rest) = s.strip_prefix("```") {
    // Drop the info string (e.g. "json") up to the first newline.
    s = match rest.find('\n') {
      Some(nl) if rest[..nl].trim().chars().all(|c| c.is_ascii_alphanumeric()) => &rest[nl + 1..],
      _ => rest.trim_start_matches(|c: char| c.is_ascii_alphabetic()),
    };
  }
  if let Some(rest) = s.trim_end().strip_suffix("```") {
    s = rest;
  }
  s.trim()
}

/// Structural parse, then explicit validation of every question.
pub fn parse_question_set(raw: &str, max_questions: usize) -> Result<QuestionSet, QuizError> {
  let cleaned = strip_code_fences(raw);
  if cleaned.is_empty() {
    return Err(QuizError::GenerationInvalid("model returned an empty response".into()));
  }
  let questions: Vec<Question> = serde_json::from_str(cleaned)
    .map_err(|e| QuizError::GenerationInvalid(format!("response was not a valid JSON question array: {}", e)))?;
  Ok(QuestionSet::try_new(questions, max_questions)?)
}

//! Test doubles for the two external collaborators.

use std::sync::{
  atomic::{AtomicUsize, Ordering},
  Mutex,
};

use async_trait::async_trait;

use crate::error::QuizError;
use crate::generator::TextGenerator;
use crate::transcript::TranscriptProvider;

/// Returns the same scripted reply on every call and records prompts.
#[derive(Debug)]
pub struct ScriptedGenerator {
  reply: Result<String, QuizError>,
  calls: AtomicUsize,
  last_prompt: Mutex<String>,
}

impl ScriptedGenerator {
  pub fn new(reply: Result<String, QuizError>) -> Self {
    Self { reply, calls: AtomicUsize::new(0), last_prompt: Mutex::new(String::new()) }
  }

  pub fn calls(&self) -> usize { self.calls.load(Ordering::SeqCst) }

  pub fn last_prompt(&self) -> String {
    self.last_prompt.lock().map(|p| p.clone()).unwrap_or_default()
  }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
  async fn complete(&self, _system: &str, user: &str) -> Result<String, QuizError> {
    self.calls.fetch_add(1, Ordering::SeqCst);
    if let Ok(mut p) = self.last_prompt.lock() {
      *p = user.to_string();
    }
    self.reply.clone()
  }

  fn describe(&self) -> String { "scripted".into() }
}

/// Answers every reference with a fixed result.
#[derive(Debug)]
pub struct StaticTranscripts {
  reply: Result<String, QuizError>,
  calls: AtomicUsize,
}

impl StaticTranscripts {
  pub fn new(reply: Result<String, QuizError>) -> Self {
    Self { reply, calls: AtomicUsize::new(0) }
  }

  pub fn calls(&self) -> usize { self.calls.load(Ordering::SeqCst) }
}

#[async_trait]
impl TranscriptProvider for StaticTranscripts {
  async fn fetch(&self, _reference: &str) -> Result<String, QuizError> {
    self.calls.fetch_add(1, Ordering::SeqCst);
    self.reply.clone()
  }
}

/// A model reply holding two valid questions (correct answers "B" and "X").
pub const TWO_QUESTIONS_JSON: &str = r#"```json
[
  {"id": 1, "question": "First?", "options": ["A", "B", "C", "D"], "correctAnswer": "B"},
  {"id": 2, "question": "Second?", "options": ["X", "Y", "Z", "W"], "correctAnswer": "X"}
]
```"#;

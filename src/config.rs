//! Loading quiz configuration (prompts, transcript process, limits) from TOML + env.
//!
//! Precedence: built-in defaults, then `QUIZ_CONFIG_PATH` (TOML), then env overrides.

use std::path::Path;

use serde::Deserialize;
use tracing::{error, info};

#[derive(Clone, Debug, Deserialize, Default)]
pub struct QuizConfig {
  #[serde(default)]
  pub prompts: Prompts,
  #[serde(default)]
  pub transcript: TranscriptSettings,
  #[serde(default)]
  pub generation: GenerationSettings,
  #[serde(default)]
  pub sessions: SessionSettings,
}

/// Prompts sent to the text-generation service.
/// The user template understands `{transcript}` and `{max_questions}`.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Prompts {
  pub quiz_system: String,
  pub quiz_user_template: String,
}

impl Default for Prompts {
  fn default() -> Self {
    Self {
      quiz_system: "You write multiple-choice quizzes from video transcripts. Respond ONLY with a JSON array.".into(),
      quiz_user_template: r#"You are creating a quiz from a YouTube video transcript.
Transcript:
{transcript}

Generate up to {max_questions} multiple-choice questions in JSON format only.
The JSON should be an array of objects, each with this shape:
{
  "id": number,
  "question": string,
  "options": string[],
  "correctAnswer": string
}

Rules:
- Do NOT include any extra text before or after the JSON.
- Each question must have exactly 4 distinct options.
- "id" values are positive integers, unique within the array.
- "correctAnswer" value must exactly match one of the options."#
        .into(),
    }
  }
}

/// How the external transcript process is launched.
/// The video id is appended as the last argument.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct TranscriptSettings {
  pub program: String,
  pub args: Vec<String>,
  pub timeout_secs: u64,
}

impl Default for TranscriptSettings {
  fn default() -> Self {
    Self {
      program: default_python(),
      args: vec!["generateTranscript.py".into()],
      timeout_secs: 60,
    }
  }
}

/// Prefer a project-local virtualenv interpreter when one exists.
fn default_python() -> String {
  [".venv/bin/python", ".venv/Scripts/python.exe"]
    .iter()
    .find(|p| Path::new(p).exists())
    .map(|p| p.to_string())
    .unwrap_or_else(|| "python3".into())
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
  pub default_max_questions: usize,
  pub max_questions_limit: usize,
}

impl Default for GenerationSettings {
  fn default() -> Self {
    Self { default_max_questions: 5, max_questions_limit: 20 }
  }
}

/// Idle sessions are dropped by a periodic sweep.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
  pub idle_ttl_secs: u64,
  pub sweep_interval_secs: u64,
}

impl Default for SessionSettings {
  fn default() -> Self {
    Self { idle_ttl_secs: 30 * 60, sweep_interval_secs: 60 }
  }
}

/// Build the effective config: TOML file (if any) plus env overrides.
pub fn load_quiz_config_from_env() -> QuizConfig {
  let mut cfg = load_toml_from_env().unwrap_or_default();
  apply_env_overrides(&mut cfg, |k| std::env::var(k).ok());
  cfg
}

/// Attempt to load `QuizConfig` from QUIZ_CONFIG_PATH. On any parsing/IO error, returns None.
fn load_toml_from_env() -> Option<QuizConfig> {
  let path = std::env::var("QUIZ_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match toml::from_str::<QuizConfig>(&s) {
      Ok(cfg) => {
        info!(target: "quizify_backend", %path, "Loaded quiz config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "quizify_backend", %path, error = %e, "Failed to parse TOML config; using defaults");
        None
      }
    },
    Err(e) => {
      error!(target: "quizify_backend", %path, error = %e, "Failed to read TOML config file; using defaults");
      None
    }
  }
}

fn apply_env_overrides(cfg: &mut QuizConfig, var: impl Fn(&str) -> Option<String>) {
  if let Some(program) = var("TRANSCRIPT_COMMAND").filter(|s| !s.trim().is_empty()) {
    cfg.transcript.program = program;
  }
  if let Some(script) = var("TRANSCRIPT_SCRIPT") {
    cfg.transcript.args = if script.trim().is_empty() { vec![] } else { vec![script] };
  }
  if let Some(secs) = var("TRANSCRIPT_TIMEOUT_SECS").and_then(|s| s.parse::<u64>().ok()) {
    cfg.transcript.timeout_secs = secs;
  }
  if let Some(secs) = var("SESSION_IDLE_TTL_SECS").and_then(|s| s.parse::<u64>().ok()) {
    cfg.sessions.idle_ttl_secs = secs;
  }
}

//! Transcript Provider boundary.
//!
//! The pipeline depends only on `TranscriptProvider`. The default implementation
//! runs an external program (a Python helper by default) and reads stdout.

use std::{process::Stdio, time::Duration};

use async_trait::async_trait;
use reqwest::Url;
use tokio::process::Command;
use tracing::{debug, info, instrument, warn};

use crate::config::TranscriptSettings;
use crate::error::QuizError;

/// Resolves a video reference (URL or id) into plain transcript text.
#[async_trait]
pub trait TranscriptProvider: Send + Sync {
  async fn fetch(&self, reference: &str) -> Result<String, QuizError>;
}

/// Reduce a YouTube URL to its video id; anything else (including a URL with no id) is returned as-is.
///
/// - `https://youtu.be/ID` → `ID`
/// - `https://www.youtube.com/watch?v=ID&t=3` → `ID`
pub fn video_id(reference: &str) -> String {
  let reference = reference.trim();
  if !(reference.contains("youtube.com") || reference.contains("youtu.be")) {
    return reference.to_string();
  }
  let Ok(url) = Url::parse(reference) else {
    return reference.to_string();
  };
  let id = if url.host_str() == Some("youtu.be") {
    url.path().trim_matches('/').to_string()
  } else {
    url
      .query_pairs()
      .find(|(k, _)| k == "v")
      .map(|(_, v)| v.trim().to_string())
      .unwrap_or_default()
  };
  // A URL without an id is handed over untouched rather than as an empty argument.
  if id.is_empty() {
    reference.to_string()
  } else {
    id
  }
}

/// Runs `program [args..] <video id>` and treats trimmed stdout as the transcript.
#[derive(Clone, Debug)]
pub struct CommandTranscriptProvider {
  pub program: String,
  pub args: Vec<String>,
  pub timeout: Duration,
}

impl CommandTranscriptProvider {
  pub fn from_settings(settings: &TranscriptSettings) -> Self {
    Self {
      program: settings.program.clone(),
      args: settings.args.clone(),
      timeout: Duration::from_secs(settings.timeout_secs),
    }
  }
}

#[async_trait]
impl TranscriptProvider for CommandTranscriptProvider {
  #[instrument(level = "info", skip(self), fields(program = %self.program))]
  async fn fetch(&self, reference: &str) -> Result<String, QuizError> {
    if reference.trim().is_empty() {
      return Err(QuizError::Validation("Missing video URL.".into()));
    }
    let video = video_id(reference);
    debug!(target: "quiz", %video, "Launching transcript process");

    let mut cmd = Command::new(&self.program);
    cmd.args(&self.args)
      .arg(&video)
      .stdin(Stdio::null())
      .kill_on_drop(true);

    let start = std::time::Instant::now();
    let output = match tokio::time::timeout(self.timeout, cmd.output()).await {
      Err(_) => {
        warn!(target: "quiz", %video, timeout = ?self.timeout, "Transcript process timed out");
        return Err(QuizError::Transcript(format!(
          "transcript extraction timed out after {}s",
          self.timeout.as_secs_f32()
        )));
      }
      Ok(Err(e)) => {
        return Err(QuizError::Transcript(format!(
          "could not start transcript process `{}`: {}",
          self.program, e
        )));
      }
      Ok(Ok(o)) => o,
    };

    let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if !output.status.success() {
      let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
      let message = if !stderr.is_empty() {
        stderr
      } else if !stdout.is_empty() {
        stdout
      } else {
        format!("transcript process exited with {}", output.status)
      };
      warn!(target: "quiz", %video, status = %output.status, "Transcript process failed");
      return Err(QuizError::Transcript(message));
    }
    if stdout.is_empty() {
      return Err(QuizError::Transcript("transcript process produced no output".into()));
    }

    info!(target: "quiz", %video, elapsed = ?start.elapsed(), transcript_len = stdout.len(), "Transcript fetched");
    Ok(stdout)
  }
}

//! Error taxonomy for the quiz pipeline.
//!
//! Every stage returns either a structured result or exactly one `QuizError`.
//! The HTTP layer turns these into status codes (see `routes::http`).

use thiserror::Error;
use uuid::Uuid;

use crate::domain::InvalidQuestionSet;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QuizError {
  /// Caller input violates a precondition. Fix the input and try again.
  #[error("{0}")]
  Validation(String),
  /// The external transcript source failed (non-zero exit, timeout, no output).
  #[error("Transcript unavailable: {0}")]
  Transcript(String),
  /// The text-generation service was unreachable or answered with an error.
  #[error("Text generation failed: {0}")]
  GenerationService(String),
  /// The text-generation service answered, but the text is not a valid question set.
  #[error("Generated quiz was rejected: {0}")]
  GenerationInvalid(String),
  #[error("Configuration error: {0}")]
  Configuration(String),
  #[error("Unknown session: {0}")]
  SessionNotFound(Uuid),
}

impl QuizError {
  /// Stable label used in logs and error payloads.
  pub fn kind(&self) -> &'static str {
    match self {
      QuizError::Validation(_) => "validation",
      QuizError::Transcript(_) => "transcript",
      QuizError::GenerationService(_) => "generation_service",
      QuizError::GenerationInvalid(_) => "generation_invalid",
      QuizError::Configuration(_) => "configuration",
      QuizError::SessionNotFound(_) => "session_not_found",
    }
  }
}

impl From<InvalidQuestionSet> for QuizError {
  fn from(e: InvalidQuestionSet) -> Self {
    QuizError::GenerationInvalid(e.to_string())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn generation_failures_keep_distinct_kinds() {
    assert_eq!(QuizError::GenerationService("down".into()).kind(), "generation_service");
    assert_eq!(QuizError::GenerationInvalid("bad json".into()).kind(), "generation_invalid");
    assert_eq!(
      QuizError::GenerationInvalid("bad json".into()).to_string(),
      "Generated quiz was rejected: bad json"
    );
  }

  #[test]
  fn invalid_question_set_becomes_generation_invalid() {
    let err: QuizError = InvalidQuestionSet::Empty.into();
    assert_eq!(err.kind(), "generation_invalid");
  }
}

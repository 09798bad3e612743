//! Domain models: questions, validated question sets, answers and score reports.
//!
//! Wire names follow the front-end contract (`question`, `correctAnswer`, ...).

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of options every multiple-choice question carries.
pub const OPTIONS_PER_QUESTION: usize = 4;

pub type QuestionId = u32;

/// User selections keyed by question id. Absent entries are unanswered.
pub type AnswerMap = BTreeMap<QuestionId, String>;

/// A single-correct-answer multiple-choice question.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
  pub id: QuestionId,
  #[serde(rename = "question")]
  pub text: String,
  pub options: Vec<String>,
  pub correct_answer: String,
}

/// Why a candidate list of questions cannot become a `QuestionSet`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvalidQuestionSet {
  #[error("question set is empty")]
  Empty,
  #[error("{count} questions returned but at most {max} were requested")]
  TooMany { count: usize, max: usize },
  #[error("question id must be positive (got 0)")]
  ZeroId,
  #[error("question id {0} appears more than once")]
  DuplicateId(QuestionId),
  #[error("question {0} has no text")]
  BlankText(QuestionId),
  #[error("question {id} has {count} options, expected 4")]
  OptionCount { id: QuestionId, count: usize },
  #[error("question {0} has a blank option")]
  BlankOption(QuestionId),
  #[error("question {id} repeats option {option:?}")]
  DuplicateOption { id: QuestionId, option: String },
  #[error("question {id}: correct answer {answer:?} is not one of its options")]
  AnswerNotAnOption { id: QuestionId, answer: String },
}

impl Question {
  fn check(&self) -> Result<(), InvalidQuestionSet> {
    let id = self.id;
    if id == 0 {
      return Err(InvalidQuestionSet::ZeroId);
    }
    if self.text.trim().is_empty() {
      return Err(InvalidQuestionSet::BlankText(id));
    }
    if self.options.len() != OPTIONS_PER_QUESTION {
      return Err(InvalidQuestionSet::OptionCount { id, count: self.options.len() });
    }
    let mut seen = HashSet::new();
    for option in &self.options {
      if option.trim().is_empty() {
        return Err(InvalidQuestionSet::BlankOption(id));
      }
      if !seen.insert(option.as_str()) {
        return Err(InvalidQuestionSet::DuplicateOption { id, option: option.clone() });
      }
    }
    // Byte-for-byte membership: no trimming, no case folding.
    if !self.options.iter().any(|o| *o == self.correct_answer) {
      return Err(InvalidQuestionSet::AnswerNotAnOption { id, answer: self.correct_answer.clone() });
    }
    Ok(())
  }
}

/// An ordered, validated, immutable list of questions.
///
/// Holds between 1 and `max` questions with unique positive ids, each with
/// exactly four distinct non-empty options, one of which is the correct answer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct QuestionSet(Vec<Question>);

impl QuestionSet {
  /// Validate every question; a single bad question rejects the whole set.
  pub fn try_new(questions: Vec<Question>, max: usize) -> Result<Self, InvalidQuestionSet> {
    if questions.is_empty() {
      return Err(InvalidQuestionSet::Empty);
    }
    if questions.len() > max {
      return Err(InvalidQuestionSet::TooMany { count: questions.len(), max });
    }
    let mut ids = HashSet::new();
    for q in &questions {
      q.check()?;
      if !ids.insert(q.id) {
        return Err(InvalidQuestionSet::DuplicateId(q.id));
      }
    }
    Ok(Self(questions))
  }

  pub fn questions(&self) -> &[Question] { &self.0 }

  pub fn len(&self) -> usize { self.0.len() }

  pub fn get(&self, id: QuestionId) -> Option<&Question> {
    self.0.iter().find(|q| q.id == id)
  }

  pub fn iter(&self) -> std::slice::Iter<'_, Question> { self.0.iter() }
}

impl<'a> IntoIterator for &'a QuestionSet {
  type Item = &'a Question;
  type IntoIter = std::slice::Iter<'a, Question>;
  fn into_iter(self) -> Self::IntoIter { self.0.iter() }
}

/// Per-question grading line.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreDetail {
  pub id: QuestionId,
  pub question: String,
  pub correct_answer: String,
  /// `None` (serialized as `null`) when the question was not answered.
  pub user_answer: Option<String>,
  pub is_correct: bool,
}

/// Grading result, recomputed from scratch on every scoring request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ScoreReport {
  pub total: usize,
  pub correct: usize,
  pub details: Vec<ScoreDetail>,
}

#[cfg(test)]
pub(crate) fn question(id: QuestionId, options: [&str; 4], correct: &str) -> Question {
  Question {
    id,
    text: format!("Question {id}?"),
    options: options.iter().map(|s| s.to_string()).collect(),
    correct_answer: correct.to_string(),
  }
}

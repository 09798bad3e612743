//! Pure scoring of an answer map against a question set.

use crate::domain::{AnswerMap, QuestionSet, ScoreDetail, ScoreReport};

/// Grade `answers` against `questions`.
///
/// Matching is exact string equality (no trimming, no case folding).
/// Answers for ids outside the set are ignored.
pub fn score(questions: &QuestionSet, answers: &AnswerMap) -> ScoreReport {
  let details: Vec<ScoreDetail> = questions
    .iter()
    .map(|q| {
      let user_answer = answers.get(&q.id).cloned();
      let is_correct = user_answer.as_deref() == Some(q.correct_answer.as_str());
      ScoreDetail {
        id: q.id,
        question: q.text.clone(),
        correct_answer: q.correct_answer.clone(),
        user_answer,
        is_correct,
      }
    })
    .collect();

  let correct = details.iter().filter(|d| d.is_correct).count();
  ScoreReport { total: questions.len(), correct, details }
}

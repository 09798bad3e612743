//! Quiz session state machine: Input → Quiz → Results, with Reset from anywhere.
//!
//! A session owns its current question set and answers. The score report is
//! derived by the scorer on submit and only kept for the Results step.

use serde::Serialize;
use uuid::Uuid;

use crate::domain::{AnswerMap, QuestionId, QuestionSet, ScoreReport};
use crate::error::QuizError;
use crate::scorer;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Input,
    Quiz,
    Results,
}

#[derive(Clone, Debug)]
enum Phase {
    Input,
    Quiz {
        questions: QuestionSet,
        answers: AnswerMap,
    },
    Results {
        questions: QuestionSet,
        answers: AnswerMap,
        report: ScoreReport,
    },
}

#[derive(Clone, Debug)]
pub struct QuizSession {
    pub id: Uuid,
    phase: Phase,
}

impl QuizSession {
    pub fn new(id: Uuid) -> Self {
        Self { id, phase: Phase::Input }
    }

    pub fn step(&self) -> Step {
        match self.phase {
            Phase::Input => Step::Input,
            Phase::Quiz { .. } => Step::Quiz,
            Phase::Results { .. } => Step::Results,
        }
    }

    pub fn questions(&self) -> Option<&QuestionSet> {
        match &self.phase {
            Phase::Input => None,
            Phase::Quiz { questions, .. } | Phase::Results { questions, .. } => Some(questions),
        }
    }

    pub fn answers(&self) -> Option<&AnswerMap> {
        match &self.phase {
            Phase::Input => None,
            Phase::Quiz { answers, .. } | Phase::Results { answers, .. } => Some(answers),
        }
    }

    pub fn report(&self) -> Option<&ScoreReport> {
        match &self.phase {
            Phase::Results { report, .. } => Some(report),
            _ => None,
        }
    }

    /// Guard used before any external call so a busy session fails fast.
    pub fn ensure_input(&self) -> Result<(), QuizError> {
        match self.phase {
            Phase::Input => Ok(()),
            _ => Err(QuizError::Validation(
                "A quiz is already in progress; reset the session before starting a new one.".into(),
            )),
        }
    }

    /// Input → Quiz with a freshly generated question set and no answers.
    pub fn begin_quiz(&mut self, questions: QuestionSet) -> Result<(), QuizError> {
        self.ensure_input()?;
        self.phase = Phase::Quiz { questions, answers: AnswerMap::new() };
        Ok(())
    }

    /// Record (or overwrite) the selection for one question.
    pub fn answer(&mut self, id: QuestionId, option: &str) -> Result<(), QuizError> {
        let Phase::Quiz { questions, answers } = &mut self.phase else {
            return Err(QuizError::Validation("Answers are only accepted while a quiz is in progress.".into()));
        };
        if questions.get(id).is_none() {
            return Err(QuizError::Validation(format!("Question {} is not part of this quiz.", id)));
        }
        if option.is_empty() {
            return Err(QuizError::Validation("Selected option must not be empty.".into()));
        }
        answers.insert(id, option.to_string());
        Ok(())
    }

    /// Quiz → Results. Every question needs a non-empty answer; otherwise nothing changes.
    pub fn submit(&mut self) -> Result<ScoreReport, QuizError> {
        let Phase::Quiz { questions, answers } = &self.phase else {
            return Err(QuizError::Validation("There is no quiz in progress to submit.".into()));
        };
        let unanswered = questions
            .iter()
            .filter(|q| answers.get(&q.id).map_or(true, |a| a.is_empty()))
            .count();
        if unanswered > 0 {
            return Err(QuizError::Validation(format!(
                "Please answer all {} questions ({} unanswered).",
                questions.len(),
                unanswered
            )));
        }

        let report = scorer::score(questions, answers);
        if let Phase::Quiz { questions, answers } = std::mem::replace(&mut self.phase, Phase::Input) {
            self.phase = Phase::Results { questions, answers, report: report.clone() };
        }
        Ok(report)
    }

    /// Back to Input from any step, dropping questions, answers and report.
    pub fn reset(&mut self) {
        self.phase = Phase::Input;
    }
}

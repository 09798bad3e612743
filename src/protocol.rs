//! Public protocol structs for WebSocket and HTTP endpoints (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{AnswerMap, Question, QuestionId, QuestionSet, ScoreReport};
use crate::session::{QuizSession, Step};

/// Messages the client can send over WebSocket.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientWsMessage {
    Ping,
    State,
    StartQuiz {
        url: String,
        #[serde(default, rename = "maxQuestions")]
        max_questions: Option<usize>,
    },
    Answer {
        #[serde(rename = "questionId")]
        question_id: QuestionId,
        option: String,
    },
    Submit,
    Reset,
}

/// Messages the server sends back over WebSocket.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerWsMessage {
    Pong,
    Session { session: SessionOut },
    Error { kind: String, message: String },
}

/// A question as shown while the quiz is running (no correct answer).
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct QuestionOut {
    pub id: QuestionId,
    pub question: String,
    pub options: Vec<String>,
}

/// Snapshot of a session for both WS and HTTP.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionOut {
    pub session_id: Uuid,
    pub step: Step,
    pub questions: Vec<QuestionOut>,
    pub answers: AnswerMap,
    pub answered: usize,
    pub total: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<ScoreReport>,
}

/// Convert a session (internal) to the public DTO.
pub fn session_out(s: &QuizSession) -> SessionOut {
    let questions: Vec<QuestionOut> = s
        .questions()
        .map(|set| {
            set.questions()
                .iter()
                .map(|q| QuestionOut {
                    id: q.id,
                    question: q.text.clone(),
                    options: q.options.clone(),
                })
                .collect()
        })
        .unwrap_or_default();
    let answers = s.answers().cloned().unwrap_or_default();

    SessionOut {
        session_id: s.id,
        step: s.step(),
        total: questions.len(),
        answered: answers.values().filter(|a| !a.is_empty()).count(),
        questions,
        answers,
        score: s.report().cloned(),
    }
}

//
// HTTP request/response DTOs
//

#[derive(Deserialize)]
pub struct TranscriptIn {
    #[serde(default)]
    pub url: String,
}
#[derive(Serialize)]
pub struct TranscriptOut {
    pub transcript: String,
}

#[derive(Deserialize)]
pub struct GenerateQuizIn {
    #[serde(default)]
    pub transcript: String,
    #[serde(default, rename = "maxQuestions")]
    pub max_questions: Option<usize>,
}
#[derive(Serialize)]
pub struct GenerateQuizOut {
    pub questions: QuestionSet,
}

#[derive(Deserialize)]
pub struct ScoreIn {
    pub questions: Vec<Question>,
    pub answers: AnswerMap,
}

#[derive(Deserialize)]
pub struct StartQuizIn {
    #[serde(default)]
    pub url: String,
    #[serde(default, rename = "maxQuestions")]
    pub max_questions: Option<usize>,
}

#[derive(Deserialize)]
pub struct AnswerIn {
    #[serde(rename = "questionId")]
    pub question_id: QuestionId,
    pub option: String,
}

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
    #[serde(rename = "generationEnabled")]
    pub generation_enabled: bool,
    pub sessions: usize,
}

#[derive(Serialize)]
pub struct ErrorOut {
    pub error: String,
    pub kind: &'static str,
}

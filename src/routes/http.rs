//! HTTP endpoint handlers. These are thin wrappers that forward to core logic.
//! Each handler is instrumented; failures are rendered as `{ error, kind }` with a
//! status code chosen by error kind.

use std::sync::Arc;
use axum::{
  extract::{rejection::JsonRejection, Path, State},
  http::StatusCode,
  response::{IntoResponse, Response},
  Json,
};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::error::QuizError;
use crate::logic::*;
use crate::protocol::*;
use crate::state::AppState;

impl IntoResponse for QuizError {
  fn into_response(self) -> Response {
    let status = match &self {
      QuizError::Validation(_) => StatusCode::BAD_REQUEST,
      QuizError::SessionNotFound(_) => StatusCode::NOT_FOUND,
      QuizError::Transcript(_) | QuizError::GenerationService(_) | QuizError::GenerationInvalid(_) => StatusCode::BAD_GATEWAY,
      QuizError::Configuration(_) => StatusCode::SERVICE_UNAVAILABLE,
    };
    if status.is_server_error() {
      error!(target: "quizify_backend", kind = self.kind(), error = %self, "Request failed");
    } else {
      warn!(target: "quizify_backend", kind = self.kind(), error = %self, "Request rejected");
    }
    (status, Json(ErrorOut { error: self.to_string(), kind: self.kind() })).into_response()
  }
}

/// Malformed JSON bodies are caller input errors like any other.
fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, QuizError> {
  payload
    .map(|Json(v)| v)
    .map_err(|e| QuizError::Validation(format!("Malformed request body: {}", e.body_text())))
}

#[instrument(level = "info", skip(state))]
pub async fn http_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  Json(HealthOut {
    ok: true,
    generation_enabled: state.generator.is_some(),
    sessions: state.session_count().await,
  })
}

#[instrument(level = "info", skip(state, payload))]
pub async fn http_post_transcript(
  State(state): State<Arc<AppState>>,
  payload: Result<Json<TranscriptIn>, JsonRejection>,
) -> Result<Json<TranscriptOut>, QuizError> {
  let req = body(payload)?;
  let transcript = get_transcript(&state, &req.url).await?;
  info!(target: "quiz", transcript_len = transcript.len(), "HTTP transcript served");
  Ok(Json(TranscriptOut { transcript }))
}

#[instrument(level = "info", skip(state, payload))]
pub async fn http_post_generate_quiz(
  State(state): State<Arc<AppState>>,
  payload: Result<Json<GenerateQuizIn>, JsonRejection>,
) -> Result<Json<GenerateQuizOut>, QuizError> {
  let req = body(payload)?;
  let questions = generate_quiz(&state, &req.transcript, req.max_questions).await?;
  info!(target: "quiz", questions = questions.len(), "HTTP quiz generated");
  Ok(Json(GenerateQuizOut { questions }))
}

#[instrument(level = "info", skip(payload))]
pub async fn http_post_score(
  payload: Result<Json<ScoreIn>, JsonRejection>,
) -> Result<impl IntoResponse, QuizError> {
  let req = body(payload)?;
  Ok(Json(score_quiz(req.questions, &req.answers)?))
}

#[instrument(level = "info", skip(state))]
pub async fn http_create_session(State(state): State<Arc<AppState>>) -> Result<Json<SessionOut>, QuizError> {
  let (id, _) = state.create_session().await;
  Ok(Json(session_snapshot(&state, id).await?))
}

#[instrument(level = "info", skip(state), fields(%id))]
pub async fn http_get_session(
  State(state): State<Arc<AppState>>,
  Path(id): Path<Uuid>,
) -> Result<Json<SessionOut>, QuizError> {
  Ok(Json(session_snapshot(&state, id).await?))
}

#[instrument(level = "info", skip(state), fields(%id))]
pub async fn http_delete_session(
  State(state): State<Arc<AppState>>,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, QuizError> {
  state.remove_session(id).await?;
  Ok(StatusCode::NO_CONTENT)
}

#[instrument(level = "info", skip(state, payload), fields(%id))]
pub async fn http_start_quiz(
  State(state): State<Arc<AppState>>,
  Path(id): Path<Uuid>,
  payload: Result<Json<StartQuizIn>, JsonRejection>,
) -> Result<Json<SessionOut>, QuizError> {
  let req = body(payload)?;
  Ok(Json(start_quiz(&state, id, &req.url, req.max_questions).await?))
}

#[instrument(level = "info", skip(state, payload), fields(%id))]
pub async fn http_post_answer(
  State(state): State<Arc<AppState>>,
  Path(id): Path<Uuid>,
  payload: Result<Json<AnswerIn>, JsonRejection>,
) -> Result<Json<SessionOut>, QuizError> {
  let req = body(payload)?;
  Ok(Json(record_answer(&state, id, req.question_id, &req.option).await?))
}

#[instrument(level = "info", skip(state), fields(%id))]
pub async fn http_submit(
  State(state): State<Arc<AppState>>,
  Path(id): Path<Uuid>,
) -> Result<Json<SessionOut>, QuizError> {
  Ok(Json(submit_answers(&state, id).await?))
}

#[instrument(level = "info", skip(state), fields(%id))]
pub async fn http_reset(
  State(state): State<Arc<AppState>>,
  Path(id): Path<Uuid>,
) -> Result<Json<SessionOut>, QuizError> {
  Ok(Json(reset_session(&state, id).await?))
}

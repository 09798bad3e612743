//! Core behaviors shared by both HTTP and WebSocket handlers (the orchestrator).
//!
//! This includes:
//!   - the stateless boundary operations: transcript, quiz generation, scoring
//!   - the session flow: start quiz (fetch → generate), answer, submit, reset
//!
//! Errors are propagated unchanged; the transport layer decides how to render them.

use tracing::{info, instrument};
use uuid::Uuid;

use crate::domain::{AnswerMap, Question, QuestionId, QuestionSet, ScoreReport};
use crate::error::QuizError;
use crate::protocol::{session_out, SessionOut};
use crate::scorer;
use crate::state::AppState;

/// Apply the default and enforce `1..=limit`.
pub fn resolve_max_questions(state: &AppState, requested: Option<usize>) -> Result<usize, QuizError> {
  let max = requested.unwrap_or(state.limits.default_max_questions);
  let limit = state.limits.max_questions_limit;
  if max == 0 || max > limit {
    return Err(QuizError::Validation(format!("maxQuestions must be between 1 and {}.", limit)));
  }
  Ok(max)
}

#[instrument(level = "info", skip(state, reference), fields(reference_len = reference.len()))]
pub async fn get_transcript(state: &AppState, reference: &str) -> Result<String, QuizError> {
  let reference = reference.trim();
  if reference.is_empty() {
    return Err(QuizError::Validation("Missing 'url' in request body.".into()));
  }
  state.transcripts.fetch(reference).await
}

#[instrument(level = "info", skip(state, transcript), fields(transcript_len = transcript.len(), ?max_questions))]
pub async fn generate_quiz(
  state: &AppState,
  transcript: &str,
  max_questions: Option<usize>,
) -> Result<QuestionSet, QuizError> {
  // Without a credential every call fails the same way, whatever the input.
  let generator = state.generator()?;
  if transcript.trim().is_empty() {
    return Err(QuizError::Validation("Missing 'transcript' in request body.".into()));
  }
  let max = resolve_max_questions(state, max_questions)?;
  generator.generate(transcript, max).await
}

/// Score a caller-supplied question list. The list must itself be a valid question set.
#[instrument(level = "info", skip(questions, answers), fields(questions = questions.len(), answers = answers.len()))]
pub fn score_quiz(questions: Vec<Question>, answers: &AnswerMap) -> Result<ScoreReport, QuizError> {
  let set = QuestionSet::try_new(questions, usize::MAX)
    .map_err(|e| QuizError::Validation(format!("Invalid 'questions': {}", e)))?;
  let report = scorer::score(&set, answers);
  info!(target: "quiz", total = report.total, correct = report.correct, "Quiz scored");
  Ok(report)
}

#[instrument(level = "info", skip(state), fields(%session_id))]
pub async fn session_snapshot(state: &AppState, session_id: Uuid) -> Result<SessionOut, QuizError> {
  let handle = state.session(session_id).await?;
  let session = handle.lock().await;
  Ok(session_out(&session))
}

/// Input → Quiz: fetch the transcript, generate questions, then begin the quiz.
/// Any failure leaves the session in Input.
#[instrument(level = "info", skip(state, reference), fields(%session_id, reference_len = reference.len(), ?max_questions))]
pub async fn start_quiz(
  state: &AppState,
  session_id: Uuid,
  reference: &str,
  max_questions: Option<usize>,
) -> Result<SessionOut, QuizError> {
  let handle = state.session(session_id).await?;
  // Held across both external calls: one in-flight request per session.
  let mut session = handle.lock().await;
  session.ensure_input()?;
  let generator = state.generator()?;
  let max = resolve_max_questions(state, max_questions)?;

  let transcript = get_transcript(state, reference).await?;
  let questions = generator.generate(&transcript, max).await?;
  let count = questions.len();
  session.begin_quiz(questions)?;

  info!(target: "quiz", session = %session_id, questions = count, "Quiz started");
  Ok(session_out(&session))
}

#[instrument(level = "info", skip(state, option), fields(%session_id, %question_id))]
pub async fn record_answer(
  state: &AppState,
  session_id: Uuid,
  question_id: QuestionId,
  option: &str,
) -> Result<SessionOut, QuizError> {
  let handle = state.session(session_id).await?;
  let mut session = handle.lock().await;
  session.answer(question_id, option)?;
  Ok(session_out(&session))
}

/// Quiz → Results, gated on every question being answered.
#[instrument(level = "info", skip(state), fields(%session_id))]
pub async fn submit_answers(state: &AppState, session_id: Uuid) -> Result<SessionOut, QuizError> {
  let handle = state.session(session_id).await?;
  let mut session = handle.lock().await;
  let report = session.submit()?;
  info!(target: "quiz", session = %session_id, total = report.total, correct = report.correct, "Quiz submitted");
  Ok(session_out(&session))
}

#[instrument(level = "info", skip(state), fields(%session_id))]
pub async fn reset_session(state: &AppState, session_id: Uuid) -> Result<SessionOut, QuizError> {
  let handle = state.session(session_id).await?;
  let mut session = handle.lock().await;
  session.reset();
  info!(target: "quiz", session = %session_id, "Session reset");
  Ok(session_out(&session))
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use super::*;
  use crate::config::{GenerationSettings, Prompts};
  use crate::domain::question;
  use crate::generator::QuestionGenerator;
  use crate::mock::{ScriptedGenerator, StaticTranscripts, TWO_QUESTIONS_JSON};
  use crate::session::Step;

  struct Harness {
    state: AppState,
    transcripts: Arc<StaticTranscripts>,
    model: Arc<ScriptedGenerator>,
  }

  fn harness(transcript: Result<String, QuizError>, reply: Result<String, QuizError>) -> Harness {
    let transcripts = Arc::new(StaticTranscripts::new(transcript));
    let model = Arc::new(ScriptedGenerator::new(reply));
    let generator = QuestionGenerator::new(model.clone(), Prompts::default());
    let state = AppState::from_parts(transcripts.clone(), Some(generator), GenerationSettings::default());
    Harness { state, transcripts, model }
  }

  fn happy() -> Harness {
    harness(Ok("the video talks about bees".into()), Ok(TWO_QUESTIONS_JSON.into()))
  }

  #[tokio::test]
  async fn session_flow_from_input_to_results_and_back() {
    let h = happy();
    let (id, _) = h.state.create_session().await;

    let out = start_quiz(&h.state, id, "https://youtu.be/abc", None).await.expect("start");
    assert_eq!(out.step, Step::Quiz);
    assert_eq!(out.questions.len(), 2);
    assert!(h.model.last_prompt().contains("the video talks about bees"));
    assert!(h.model.last_prompt().contains("Generate up to 5"));

    record_answer(&h.state, id, 1, "B").await.expect("answer 1");
    let out = record_answer(&h.state, id, 2, "Z").await.expect("answer 2");
    assert_eq!(out.answered, 2);

    let out = submit_answers(&h.state, id).await.expect("submit");
    assert_eq!(out.step, Step::Results);
    let score = out.score.expect("score");
    assert_eq!((score.total, score.correct), (2, 1));

    let out = reset_session(&h.state, id).await.expect("reset");
    assert_eq!(out.step, Step::Input);
    assert!(out.questions.is_empty());
    assert!(out.answers.is_empty());
    assert!(out.score.is_none());
  }

  #[tokio::test]
  async fn transcript_failure_keeps_session_in_input_and_skips_generation() {
    let h = harness(Err(QuizError::Transcript("no captions".into())), Ok(TWO_QUESTIONS_JSON.into()));
    let (id, _) = h.state.create_session().await;

    let err = start_quiz(&h.state, id, "abc", None).await.unwrap_err();
    assert_eq!(err, QuizError::Transcript("no captions".into()));
    assert_eq!(h.model.calls(), 0);
    assert_eq!(session_snapshot(&h.state, id).await.expect("snapshot").step, Step::Input);
  }

  #[tokio::test]
  async fn unparseable_generation_keeps_session_in_input() {
    let h = harness(Ok("text".into()), Ok("not json at all".into()));
    let (id, _) = h.state.create_session().await;

    let err = start_quiz(&h.state, id, "abc", None).await.unwrap_err();
    assert_eq!(err.kind(), "generation_invalid");
    let snap = session_snapshot(&h.state, id).await.expect("snapshot");
    assert_eq!(snap.step, Step::Input);
    assert!(snap.questions.is_empty());
  }

  #[tokio::test]
  async fn incomplete_submission_is_rejected() {
    let h = happy();
    let (id, _) = h.state.create_session().await;
    start_quiz(&h.state, id, "abc", None).await.expect("start");
    record_answer(&h.state, id, 1, "B").await.expect("answer");

    let err = submit_answers(&h.state, id).await.unwrap_err();
    assert_eq!(err.kind(), "validation");
    let snap = session_snapshot(&h.state, id).await.expect("snapshot");
    assert_eq!(snap.step, Step::Quiz);
    assert_eq!(snap.answers.len(), 1);
  }

  #[tokio::test]
  async fn starting_twice_needs_a_reset_and_does_not_call_out() {
    let h = happy();
    let (id, _) = h.state.create_session().await;
    start_quiz(&h.state, id, "abc", None).await.expect("start");
    assert_eq!(start_quiz(&h.state, id, "abc", None).await.unwrap_err().kind(), "validation");
    assert_eq!(h.transcripts.calls(), 1);
    assert_eq!(h.model.calls(), 1);
  }

  #[tokio::test]
  async fn missing_credential_fails_before_any_external_call() {
    let transcripts = Arc::new(StaticTranscripts::new(Ok("text".into())));
    let state = AppState::from_parts(transcripts.clone(), None, GenerationSettings::default());
    let (id, _) = state.create_session().await;

    assert_eq!(start_quiz(&state, id, "abc", None).await.unwrap_err().kind(), "configuration");
    assert_eq!(generate_quiz(&state, "text", None).await.unwrap_err().kind(), "configuration");
    assert_eq!(generate_quiz(&state, "  ", Some(0)).await.unwrap_err().kind(), "configuration");
    assert_eq!(start_quiz(&state, id, "abc", Some(0)).await.unwrap_err().kind(), "configuration");
    assert_eq!(transcripts.calls(), 0);
  }

  #[tokio::test]
  async fn generate_quiz_validates_inputs_first() {
    let h = happy();
    assert_eq!(generate_quiz(&h.state, "  ", Some(5)).await.unwrap_err().kind(), "validation");
    assert_eq!(generate_quiz(&h.state, "text", Some(0)).await.unwrap_err().kind(), "validation");
    assert_eq!(generate_quiz(&h.state, "text", Some(21)).await.unwrap_err().kind(), "validation");
    assert_eq!(h.model.calls(), 0);

    let set = generate_quiz(&h.state, "text", Some(3)).await.expect("set");
    assert_eq!(set.len(), 2);
  }

  #[tokio::test]
  async fn get_transcript_rejects_blank_reference() {
    let h = happy();
    assert_eq!(get_transcript(&h.state, " ").await.unwrap_err().kind(), "validation");
    assert_eq!(h.transcripts.calls(), 0);
    assert_eq!(get_transcript(&h.state, "abc").await.expect("text"), "the video talks about bees");
  }

  #[test]
  fn score_quiz_grades_and_validates_questions() {
    let questions = vec![question(1, ["A", "B", "C", "D"], "B"), question(2, ["X", "Y", "Z", "W"], "X")];
    let answers = AnswerMap::from([(1, "B".to_string()), (2, "Z".to_string())]);
    let report = score_quiz(questions, &answers).expect("report");
    assert_eq!((report.total, report.correct), (2, 1));

    let broken = vec![question(1, ["A", "B", "C", "D"], "E")];
    assert_eq!(score_quiz(broken, &answers).unwrap_err().kind(), "validation");
  }

  #[tokio::test]
  async fn unknown_session_is_reported() {
    let h = happy();
    let id = Uuid::new_v4();
    assert_eq!(submit_answers(&h.state, id).await.unwrap_err(), QuizError::SessionNotFound(id));
  }
}

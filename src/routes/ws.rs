//! WebSocket upgrade + message loop. Each connection owns one quiz session.
//! Each client message is parsed as JSON and forwarded to core logic; we reply
//! with a single JSON message per request.

use std::sync::Arc;
use axum::{
  extract::{
    ws::{Message, WebSocket},
    State, WebSocketUpgrade,
  },
  response::IntoResponse,
};
use tracing::{debug, error, info, instrument};
use uuid::Uuid;

use crate::error::QuizError;
use crate::logic::*;
use crate::protocol::{ClientWsMessage, ServerWsMessage};
use crate::state::AppState;

#[instrument(level = "info", skip(ws, state))]
pub async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
  info!(target: "quizify_backend", "WebSocket upgrade requested");
  ws.on_upgrade(move |socket| handle_ws(socket, state))
}

#[instrument(level = "info", skip(socket, state))]
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
  let (session_id, _) = state.create_session().await;
  info!(target: "quizify_backend", session = %session_id, "WebSocket connected");

  while let Some(Ok(msg)) = socket.recv().await {
    match msg {
      Message::Text(txt) => {
        // Parse, dispatch, serialize response.
        let reply_msg = match serde_json::from_str::<ClientWsMessage>(&txt) {
          Ok(incoming) => {
            debug!(target: "quizify_backend", "WS received: {:?}", &incoming);
            handle_client_ws(incoming, &state, session_id).await
          }
          Err(e) => error_message(QuizError::Validation(format!("Invalid JSON: {}", e))),
        };

        let out = serde_json::to_string(&reply_msg).unwrap_or_else(|e| {
          serde_json::json!({ "type": "error", "kind": "internal", "message": format!("Serialization error: {}", e) }).to_string()
        });

        if let Err(e) = socket.send(Message::Text(out)).await {
          error!(target: "quizify_backend", error = %e, "WS send error");
          break;
        }
      }
      Message::Ping(payload) => { let _ = socket.send(Message::Pong(payload)).await; }
      Message::Close(_) => break,
      _ => {}
    }
  }

  let _ = state.remove_session(session_id).await;
  info!(target: "quizify_backend", session = %session_id, "WebSocket disconnected");
}

fn error_message(e: QuizError) -> ServerWsMessage {
  ServerWsMessage::Error { kind: e.kind().to_string(), message: e.to_string() }
}

#[instrument(level = "info", skip(state), fields(%session_id))]
async fn handle_client_ws(msg: ClientWsMessage, state: &AppState, session_id: Uuid) -> ServerWsMessage {
  let result = match msg {
    ClientWsMessage::Ping => return ServerWsMessage::Pong,
    ClientWsMessage::State => session_snapshot(state, session_id).await,
    ClientWsMessage::StartQuiz { url, max_questions } => start_quiz(state, session_id, &url, max_questions).await,
    ClientWsMessage::Answer { question_id, option } => record_answer(state, session_id, question_id, &option).await,
    ClientWsMessage::Submit => submit_answers(state, session_id).await,
    ClientWsMessage::Reset => reset_session(state, session_id).await,
  };
  match result {
    Ok(session) => ServerWsMessage::Session { session },
    Err(e) => {
      tracing::warn!(target: "quiz", %session_id, kind = e.kind(), error = %e, "WS request failed");
      error_message(e)
    }
  }
}

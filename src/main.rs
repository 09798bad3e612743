//! Quizify · Video Quiz Backend
//!
//! - Turns a video's transcript into a multiple-choice quiz and grades answers
//! - Axum HTTP + WebSocket API, explicit per-session state
//! - Static SPA fallback (./static/index.html)
//!
//! Important env variables (a `.env` file is honoured):
//!   PORT                    : u16 (default 5000)
//!   OPENAI_API_KEY          : enables quiz generation if present
//!   OPENAI_BASE_URL         : default "https://api.openai.com/v1" (any compatible endpoint)
//!   OPENAI_MODEL            : default "gpt-4o-mini"
//!   OPENAI_TIMEOUT_SECS     : default 60
//!   TRANSCRIPT_COMMAND      : transcript program (default: .venv python, else python3)
//!   TRANSCRIPT_SCRIPT       : script passed before the video id (default "generateTranscript.py")
//!   TRANSCRIPT_TIMEOUT_SECS : default 60
//!   SESSION_IDLE_TTL_SECS   : drop sessions untouched this long (default 1800)
//!   QUIZ_CONFIG_PATH        : path to TOML config (prompts, transcript, generation limits, sessions)
//!   LOG_LEVEL               : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT              : "pretty" (default) or "json"

mod config;
mod domain;
mod error;
mod generator;
mod logic;
mod openai;
mod protocol;
mod routes;
mod scorer;
mod session;
mod state;
mod telemetry;
mod transcript;
mod util;

#[cfg(test)]
mod mock;

use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  // Missing .env is fine; real env vars win either way.
  let dotenv = dotenvy::dotenv();
  telemetry::init_tracing();
  if let Ok(path) = dotenv {
    info!(target: "quizify_backend", path = %path.display(), "Loaded .env");
  }

  // Build shared application state (session store, transcript provider, generator).
  let state = Arc::new(AppState::new());

  // Build the HTTP router with routes, CORS and tracing layers.
  let app = build_router(state.clone());

  let addr: SocketAddr = std::env::var("PORT")
    .ok()
    .and_then(|p| p.parse::<u16>().ok())
    .map(|port| SocketAddr::from(([0, 0, 0, 0], port)))
    .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 5000)));

  let listener = TcpListener::bind(addr).await?;
  info!(target: "quizify_backend", %addr, "HTTP server listening");
  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await?;
  info!(target: "quizify_backend", "Server stopped");
  Ok(())
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    warn!(target: "quizify_backend", error = %e, "Could not listen for Ctrl-C; running until killed");
    std::future::pending::<()>().await;
  }
  info!(target: "quizify_backend", "Shutdown signal received");
}

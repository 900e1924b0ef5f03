//! REST endpoint handlers.
//!
//! Every handler goes through the [`DispatcherHandle`] so reads and writes
//! are ordered with respect to `WebSocket` submissions.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/` | Minimal HTML status page |
//! | `POST` | `/reset` | Reset the session |
//! | `GET` | `/api/state` | Current snapshot and identity |
//! | `POST` | `/api/submit` | Submit a name over HTTP |
//! | `GET` | `/api/export` | Submissions as CSV |
//!
//! [`DispatcherHandle`]: crate::dispatcher::DispatcherHandle

use std::sync::Arc;

use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::{Html, IntoResponse};
use axum::Json;
use charge_core::SubmitOutcome;
use tracing::info;

use crate::error::ApiError;
use crate::export::{EXPORT_FILE_NAME, render_csv};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST /api/submit`.
#[derive(Debug, serde::Deserialize)]
pub struct SubmitRequest {
    /// The participant's name.
    #[serde(default)]
    pub name: String,
}

/// Response body for `POST /api/submit`.
#[derive(Debug, serde::Serialize)]
pub struct SubmitResponse {
    /// `accepted`, `completed`, or `ignored`.
    pub status: &'static str,
    /// Progress after an accepted submission.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<f64>,
}

impl From<SubmitOutcome> for SubmitResponse {
    fn from(outcome: SubmitOutcome) -> Self {
        match outcome {
            SubmitOutcome::Accepted { progress } => Self {
                status: "accepted",
                progress: Some(progress),
            },
            SubmitOutcome::Completed => Self {
                status: "completed",
                progress: Some(charge_types::COMPLETION_PROGRESS),
            },
            SubmitOutcome::Ignored => Self {
                status: "ignored",
                progress: None,
            },
        }
    }
}

// ---------------------------------------------------------------------------
// GET / -- minimal HTML status page
// ---------------------------------------------------------------------------

/// Serve a minimal HTML page showing the session status and join URL.
pub async fn index(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let payload = state.dispatcher.snapshot().await?;
    let progress = format!("{:.2}", payload.snapshot.progress);
    let submissions = payload.snapshot.submission_count;
    let status = if payload.snapshot.is_complete {
        "COMPLETE"
    } else {
        "CHARGING"
    };
    let join_url = payload.identity.join_url();

    Ok(Html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <title>Charge</title>
    <style>
        body {{
            background: #0d1117;
            color: #c9d1d9;
            font-family: 'Cascadia Code', 'Fira Code', 'Consolas', monospace;
            padding: 2rem;
            max-width: 800px;
            margin: 0 auto;
        }}
        h1 {{ color: #58a6ff; margin-bottom: 0.25rem; }}
        .metric {{
            display: inline-block;
            background: #161b22;
            border: 1px solid #30363d;
            border-radius: 6px;
            padding: 1rem 1.5rem;
            margin: 0.5rem 0.5rem 0.5rem 0;
            min-width: 120px;
        }}
        .metric .label {{ color: #8b949e; font-size: 0.85rem; }}
        .metric .value {{ color: #58a6ff; font-size: 1.5rem; font-weight: bold; }}
        a {{ color: #58a6ff; text-decoration: none; }}
        .status {{ color: #3fb950; font-weight: bold; }}
    </style>
</head>
<body>
    <h1>Charge</h1>
    <p>Status: <span class="status">{status}</span></p>
    <div>
        <div class="metric">
            <div class="label">Progress</div>
            <div class="value">{progress}%</div>
        </div>
        <div class="metric">
            <div class="label">Submissions</div>
            <div class="value">{submissions}</div>
        </div>
    </div>
    <p>Join: <a href="{join_url}">{join_url}</a></p>
    <p><a href="/api/state">/api/state</a> &middot; <a href="/api/export">/api/export</a></p>
</body>
</html>"#
    )))
}

// ---------------------------------------------------------------------------
// POST /reset
// ---------------------------------------------------------------------------

/// Reset the session and push a fresh `init` to every observer.
pub async fn reset(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    state.dispatcher.reset().await?;
    info!("Reset requested over HTTP");
    Ok("Reset")
}

// ---------------------------------------------------------------------------
// GET /api/state
// ---------------------------------------------------------------------------

/// Current snapshot plus network identity, as an observer would see in `init`.
pub async fn get_state(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let payload = state.dispatcher.snapshot().await?;
    Ok(Json(payload))
}

// ---------------------------------------------------------------------------
// POST /api/submit
// ---------------------------------------------------------------------------

/// Submit a name over HTTP; same semantics as the `user_submit` event.
pub async fn submit(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SubmitRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let outcome = state.dispatcher.submit(&request.name).await?;
    Ok((StatusCode::ACCEPTED, Json(SubmitResponse::from(outcome))))
}

// ---------------------------------------------------------------------------
// GET /api/export
// ---------------------------------------------------------------------------

/// Download every submission since the last reset as CSV.
pub async fn export(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let submissions = state.dispatcher.export().await?;
    let body = render_csv(&submissions);
    let disposition = format!("attachment; filename=\"{EXPORT_FILE_NAME}\"");
    Ok((
        [
            (header::CONTENT_TYPE, String::from("text/csv; charset=utf-8")),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    ))
}

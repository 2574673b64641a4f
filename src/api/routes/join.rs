//! Meeting join API endpoints.
//!
//! - `POST /join-meet`    — start a session (validated, runs in background)
//! - `GET  /sessions`     — live phase of every in-flight session
//! - `GET  /meetings`     — stored meeting rows
//! - `GET  /meetings/:id` — one stored meeting with transcript and summary

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tracing::info;

use crate::db::{self, MeetingRow, SummaryRepository};
use crate::session::{JoinRequest, SessionRegistry};

use super::super::error::{ApiError, ApiResult};

/// Commands the API sends to the service loop.
#[derive(Debug)]
pub enum ApiCommand {
    Join {
        meeting_id: i64,
        request: JoinRequest,
    },
}

/// Shared state for join routes.
#[derive(Clone)]
pub struct JoinState {
    pub tx: mpsc::Sender<ApiCommand>,
    pub registry: SessionRegistry,
}

#[derive(Debug, Deserialize)]
pub struct JoinMeetRequest {
    pub meet_link: String,
    pub duration_minutes: u32,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub limit: Option<usize>,
}

pub fn router(state: JoinState) -> Router {
    Router::new()
        .route("/join-meet", post(join_meet))
        .route("/sessions", get(list_sessions))
        .route("/meetings", get(list_meetings))
        .route("/meetings/:id", get(get_meeting))
        .with_state(state)
}

async fn join_meet(
    State(state): State<JoinState>,
    Json(body): Json<JoinMeetRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let request = JoinRequest {
        meeting_link: body.meet_link,
        duration_minutes: body.duration_minutes,
    };
    request.validate()?;

    let conn = db::init_db()?;
    let meeting_id = SummaryRepository::insert(&conn, &request.meeting_link)?;

    info!(
        "Join requested for {} ({} min), meeting id {}",
        request.meeting_link, request.duration_minutes, meeting_id
    );

    state
        .tx
        .send(ApiCommand::Join {
            meeting_id,
            request,
        })
        .await
        .map_err(|_| ApiError::internal("service loop is not running"))?;

    // The session runs in the background; the caller polls /sessions.
    Ok(accepted(meeting_id))
}

fn accepted(meeting_id: i64) -> (StatusCode, Json<Value>) {
    (
        StatusCode::ACCEPTED,
        Json(json!({
            "meeting_id": meeting_id,
            "status": "joining",
        })),
    )
}

async fn list_sessions(State(state): State<JoinState>) -> Json<Value> {
    let sessions: Vec<Value> = state
        .registry
        .snapshot()
        .await
        .into_iter()
        .map(|(id, session)| {
            json!({
                "meeting_id": id,
                "phase": session.phase.as_str(),
                "meeting_link": session.meeting_link,
                "started_at": session.started_at,
                "last_error": session.last_error,
            })
        })
        .collect();

    Json(json!({ "sessions": sessions }))
}

async fn list_meetings(Query(query): Query<ListQuery>) -> ApiResult<Json<Value>> {
    let conn = db::init_db()?;
    let rows = SummaryRepository::list_recent(&conn, query.limit.unwrap_or(20))?;
    let meetings: Vec<Value> = rows.iter().map(row_summary).collect();
    Ok(Json(json!({ "meetings": meetings })))
}

async fn get_meeting(Path(id): Path<i64>) -> ApiResult<Json<Value>> {
    let conn = db::init_db()?;
    let row = SummaryRepository::get(&conn, id)?
        .ok_or_else(|| ApiError::not_found(format!("meeting {} not found", id)))?;

    let transcript = row.transcript()?;
    let mut body = row_summary(&row);
    body["cleaned_transcript"] = serde_json::to_value(transcript).map_err(anyhow::Error::from)?;
    Ok(Json(body))
}

fn row_summary(row: &MeetingRow) -> Value {
    json!({
        "meeting_id": row.id,
        "meet_link": row.meet_link,
        "status": row.status,
        "summary": row.summary,
        "action_items": row
            .action_items
            .as_deref()
            .and_then(|s| serde_json::from_str::<Value>(s).ok()),
        "attendees": row
            .attendees
            .as_deref()
            .and_then(|s| serde_json::from_str::<Value>(s).ok()),
        "started_at": row.started_at,
        "ended_at": row.ended_at,
        "duration_seconds": row.duration_seconds,
        "error": row.error,
    })
}

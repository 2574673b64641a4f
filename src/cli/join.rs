//! One-shot join from the command line.

use anyhow::Result;
use serde_json::json;
use tracing::info;

use crate::app;
use crate::config::Config;
use crate::db::{self, SummaryRepository};
use crate::session::{JoinRequest, SessionStatusHandle};

use super::args::JoinCliArgs;

pub async fn handle_join_command(args: JoinCliArgs) -> Result<()> {
    let mut config = Config::load()?;
    if args.no_summary {
        config.summarizer.api_key = None;
    }

    let request = JoinRequest {
        meeting_link: args.meet_link,
        duration_minutes: args.duration,
    };
    request.validate()?;

    let conn = db::init_db()?;
    let meeting_id = SummaryRepository::insert(&conn, &request.meeting_link)?;
    drop(conn);

    info!(
        "Joining {} for up to {} minutes (meeting id {})",
        request.meeting_link, request.duration_minutes, meeting_id
    );

    let status = SessionStatusHandle::default();
    let outcome = app::execute_join(&config, meeting_id, &request, status).await?;

    // Re-read the stored row so the printed artifact matches persistence.
    let conn = db::init_db()?;
    let row = SummaryRepository::get(&conn, meeting_id)?;

    let output = json!({
        "meeting_id": meeting_id,
        "status": outcome.status.as_str(),
        "attendees": outcome.attendees,
        "cleaned_transcript": outcome.transcript,
        "summary": row.as_ref().and_then(|r| r.summary.clone()),
        "action_items": row
            .as_ref()
            .and_then(|r| r.action_items.as_deref())
            .and_then(|s| serde_json::from_str::<serde_json::Value>(s).ok()),
    });
    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}

//! Meeting summary persistence.
//!
//! One row per join invocation. Raw SQL with rusqlite, no ORM; the
//! transcript, action items and attendee list are stored as JSON columns.

use anyhow::{Context, Result};
use rusqlite::{params, Connection};

use crate::summarizer::MeetingSummary;
use crate::transcript::CleanedStatement;

/// A meeting row from the database.
#[derive(Debug, Clone)]
pub struct MeetingRow {
    pub id: i64,
    pub meet_link: String,
    pub status: String,
    pub summary: Option<String>,
    pub action_items: Option<String>,
    pub cleaned_transcript: Option<String>,
    pub attendees: Option<String>,
    pub started_at: String,
    pub ended_at: Option<String>,
    pub duration_seconds: Option<i64>,
    pub error: Option<String>,
}

impl MeetingRow {
    /// Decode the JSON transcript column.
    pub fn transcript(&self) -> Result<Vec<CleanedStatement>> {
        match &self.cleaned_transcript {
            Some(json) => serde_json::from_str(json).context("Invalid transcript JSON in row"),
            None => Ok(Vec::new()),
        }
    }
}

pub struct SummaryRepository;

impl SummaryRepository {
    /// Insert a new row at join start (status = joining). Returns its id.
    pub fn insert(conn: &Connection, meet_link: &str) -> Result<i64> {
        conn.execute(
            "INSERT INTO meet_summaries (meet_link, status) VALUES (?1, 'joining')",
            params![meet_link],
        )
        .context("Failed to insert meeting row")?;

        Ok(conn.last_insert_rowid())
    }

    /// Record a finished session: transcript, summary and timings.
    #[allow(clippy::too_many_arguments)]
    pub fn complete(
        conn: &Connection,
        id: i64,
        status: &str,
        transcript: &[CleanedStatement],
        summary: &MeetingSummary,
        attendees: &[String],
        duration_seconds: i64,
    ) -> Result<()> {
        conn.execute(
            "UPDATE meet_summaries SET status = ?1, cleaned_transcript = ?2, summary = ?3, \
             action_items = ?4, attendees = ?5, duration_seconds = ?6, \
             ended_at = CURRENT_TIMESTAMP WHERE id = ?7",
            params![
                status,
                serde_json::to_string(transcript)?,
                summary.summary,
                serde_json::to_string(&summary.action_items)?,
                serde_json::to_string(attendees)?,
                duration_seconds,
                id,
            ],
        )
        .context("Failed to complete meeting row")?;
        Ok(())
    }

    /// Mark a session as failed.
    pub fn fail(conn: &Connection, id: i64, error: &str) -> Result<()> {
        conn.execute(
            "UPDATE meet_summaries SET status = 'failed', error = ?1, \
             ended_at = CURRENT_TIMESTAMP WHERE id = ?2",
            params![error, id],
        )
        .context("Failed to mark meeting row as failed")?;
        Ok(())
    }

    pub fn get(conn: &Connection, id: i64) -> Result<Option<MeetingRow>> {
        let mut stmt = conn
            .prepare(
                "SELECT id, meet_link, status, summary, action_items, cleaned_transcript, \
                 attendees, started_at, ended_at, duration_seconds, error \
                 FROM meet_summaries WHERE id = ?1",
            )
            .context("Failed to prepare meeting query")?;

        let mut rows = stmt
            .query_map(params![id], Self::row_from)
            .context("Failed to query meeting")?;

        match rows.next() {
            Some(Ok(row)) => Ok(Some(row)),
            Some(Err(e)) => Err(e.into()),
            None => Ok(None),
        }
    }

    pub fn list_recent(conn: &Connection, limit: usize) -> Result<Vec<MeetingRow>> {
        let mut stmt = conn
            .prepare(
                "SELECT id, meet_link, status, summary, action_items, cleaned_transcript, \
                 attendees, started_at, ended_at, duration_seconds, error \
                 FROM meet_summaries ORDER BY started_at DESC LIMIT ?1",
            )
            .context("Failed to prepare list query")?;

        let rows = stmt
            .query_map([limit], Self::row_from)
            .context("Failed to list meetings")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("Failed to map meeting rows")?;

        Ok(rows)
    }

    fn row_from(row: &rusqlite::Row<'_>) -> rusqlite::Result<MeetingRow> {
        Ok(MeetingRow {
            id: row.get(0)?,
            meet_link: row.get(1)?,
            status: row.get(2)?,
            summary: row.get(3)?,
            action_items: row.get(4)?,
            cleaned_transcript: row.get(5)?,
            attendees: row.get(6)?,
            started_at: row.get(7)?,
            ended_at: row.get(8)?,
            duration_seconds: row.get(9)?,
            error: row.get(10)?,
        })
    }
}

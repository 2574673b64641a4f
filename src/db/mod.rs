use anyhow::{Context, Result};
use rusqlite::Connection;

mod summaries;

pub use summaries::{MeetingRow, SummaryRepository};

pub fn init_db() -> Result<Connection> {
    let db_path = crate::global::db_file()?;

    // Ensure parent directory exists
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent).context("Failed to create database directory")?;
    }

    let conn = Connection::open(&db_path).context("Failed to open database connection")?;

    migrate(&conn)?;

    Ok(conn)
}

pub fn migrate(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS meet_summaries (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            meet_link TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'joining',
            summary TEXT,
            action_items TEXT,
            cleaned_transcript TEXT,
            attendees TEXT,
            started_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            ended_at TIMESTAMP,
            duration_seconds INTEGER,
            error TEXT,
            created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )
    .context("Failed to create meet_summaries table")?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_meet_summaries_started_at \
         ON meet_summaries(started_at DESC)",
        [],
    )
    .context("Failed to create started_at index")?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_meet_summaries_status ON meet_summaries(status)",
        [],
    )
    .context("Failed to create status index")?;

    Ok(())
}

//! Transcript data model.
//!
//! Raw caption observations come out of the capture loop; the cleaner in
//! [`cleaner`] turns them into the compact, speaker-attributed transcript
//! that gets summarized and stored.

mod cleaner;

pub use cleaner::TranscriptCleaner;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One raw caption reading: what a caption slot showed for a speaker at one
/// poll tick. Immutable once created; the capture loop emits them in
/// observation order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptionObservation {
    pub speaker: String,
    pub observed_at: DateTime<Utc>,
    pub text: String,
}

impl CaptionObservation {
    pub fn new(speaker: impl Into<String>, observed_at: DateTime<Utc>, text: impl Into<String>) -> Self {
        Self {
            speaker: speaker.into(),
            observed_at,
            text: text.into(),
        }
    }
}

/// One deduplicated statement in the final transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanedStatement {
    /// `YYYY-MM-DD`, from the observation timestamp.
    pub date: String,
    /// `HH:MM:SS`, from the observation timestamp.
    pub time: String,
    pub user: String,
    pub content: String,
}

impl CleanedStatement {
    pub fn from_observation(observed_at: DateTime<Utc>, user: &str, content: String) -> Self {
        Self {
            date: observed_at.format("%Y-%m-%d").to_string(),
            time: observed_at.format("%H:%M:%S").to_string(),
            user: user.trim().to_string(),
            content,
        }
    }
}

/// Flatten a cleaned transcript into the line format handed to the
/// summarizer: one `"{user} at {time}: {content}"` line per statement.
pub fn flatten_transcript(statements: &[CleanedStatement]) -> String {
    statements
        .iter()
        .map(|s| format!("{} at {}: {}", s.user, s.time, s.content))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Distinct speakers in statement order of first appearance.
pub fn attendees(statements: &[CleanedStatement]) -> Vec<String> {
    let mut seen = Vec::new();
    for statement in statements {
        if !seen.iter().any(|s| s == &statement.user) {
            seen.push(statement.user.clone());
        }
    }
    seen
}

use anyhow::{anyhow, Result};

use crate::db::{self, SummaryRepository};
use crate::transcript::flatten_transcript;

use super::args::HistoryCliArgs;

pub fn handle_history_command(args: HistoryCliArgs) -> Result<()> {
    let conn = db::init_db()?;

    if let Some(id) = args.show {
        let row = SummaryRepository::get(&conn, id)?
            .ok_or_else(|| anyhow!("Meeting with ID {} not found", id))?;

        println!("Meeting #{} — {} ({})", row.id, row.meet_link, row.status);
        println!("Started: {}", row.started_at);
        if let Some(ended) = &row.ended_at {
            println!("Ended:   {}", ended);
        }
        if let Some(summary) = &row.summary {
            if !summary.is_empty() {
                println!("\nSummary:\n{}", summary);
            }
        }
        let transcript = row.transcript()?;
        if transcript.is_empty() {
            println!("\n(no transcript captured)");
        } else {
            println!("\nTranscript:\n{}", flatten_transcript(&transcript));
        }
        return Ok(());
    }

    let rows = SummaryRepository::list_recent(&conn, args.limit)?;

    if rows.is_empty() {
        println!("No meetings recorded yet.");
        return Ok(());
    }

    println!("Found {} meeting(s):\n", rows.len());
    for row in rows {
        let display_summary = truncate_summary(row.summary.as_deref().unwrap_or(""), 80);
        println!(
            "#{:<4} {:<20} {:<18} {}",
            row.id, row.status, row.started_at, display_summary
        );
    }

    Ok(())
}

/// Truncate on a char boundary; stored summaries are routinely non-ASCII.
fn truncate_summary(summary: &str, max_chars: usize) -> String {
    if summary.chars().count() <= max_chars {
        return summary.to_string();
    }
    let truncated: String = summary.chars().take(max_chars).collect();
    format!("{}...", truncated)
}

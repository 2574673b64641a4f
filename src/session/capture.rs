//! Live caption capture loop.
//!
//! Polls the UI adapter for visible caption slots until the session deadline
//! or an end-of-meeting signal, emitting a raw observation whenever a slot's
//! rendered text changes. This is raw-render dedup only — the UI repaints a
//! speaker's growing line every tick — real deduplication happens later in
//! the transcript cleaner.

use chrono::Utc;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::automation::MeetingUi;
use crate::transcript::CaptionObservation;

/// Poll caption slots until `deadline`. A failed tick is skipped, never
/// propagated; the buffer holds whatever was observed up to that point.
pub async fn capture_until_deadline(
    ui: &mut dyn MeetingUi,
    deadline: Instant,
    poll_interval: Duration,
) -> Vec<CaptionObservation> {
    let mut observations = Vec::new();
    // Last rendered text per slot, keyed by the speaker the slot shows.
    let mut last_rendered: HashMap<String, String> = HashMap::new();

    loop {
        if Instant::now() >= deadline {
            info!(
                "Capture window elapsed, {} observations buffered",
                observations.len()
            );
            break;
        }

        match ui.meeting_ended().await {
            Ok(true) => {
                info!("Meeting ended by host, stopping capture");
                break;
            }
            Ok(false) => {}
            Err(e) => debug!("End-of-meeting probe failed, continuing: {}", e),
        }

        match ui.read_visible_captions().await {
            Ok(slots) => {
                let now = Utc::now();
                for slot in slots {
                    let changed = last_rendered
                        .get(&slot.speaker)
                        .map(|prev| prev != &slot.text)
                        .unwrap_or(true);
                    if changed {
                        last_rendered.insert(slot.speaker.clone(), slot.text.clone());
                        observations.push(CaptionObservation::new(slot.speaker, now, slot.text));
                    }
                }
            }
            // A single bad tick (stale element, mid-repaint DOM) is noise.
            Err(e) => debug!("Caption read failed this tick: {}", e),
        }

        tokio::time::sleep(poll_interval.min(remaining(deadline))).await;
    }

    observations
}

fn remaining(deadline: Instant) -> Duration {
    deadline.saturating_duration_since(Instant::now())
}

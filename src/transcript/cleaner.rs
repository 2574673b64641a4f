//! Caption deduplication and cleanup.
//!
//! Caption UIs re-render a speaker's growing utterance on every tick, so the
//! raw observation stream is mostly buildup ("I think", "I think we", "I
//! think we should..."). Two filters remove it:
//!
//! 1. A temporal gate: observations from a still-speaking user within
//!    `gap` of their last emitted statement are dropped outright.
//! 2. A per-speaker sentence set: fragments already emitted for that speaker
//!    are never emitted again.
//!
//! Global ordering of the output is observation order, not per-speaker order,
//! so interleaved speakers stay interleaved.

use chrono::{DateTime, Duration, Utc};
use std::collections::{HashMap, HashSet};

use super::{CaptionObservation, CleanedStatement};

/// Sentence fragment delimiter. Deliberately a literal match, not sentence
/// boundary detection: captions are short and the cost of a missed split is
/// a slightly coarser dedup unit.
const SENTENCE_DELIMITER: &str = ". ";

/// Key a fragment is deduplicated under. Splitting on `". "` strips the
/// period from every fragment except the last one in a text, so the same
/// sentence shows up both with and without its trailing period as renders
/// grow. The key drops it; the emitted text keeps whatever the UI showed.
fn dedup_key(fragment: &str) -> &str {
    fragment.strip_suffix('.').unwrap_or(fragment)
}

#[derive(Debug, Default)]
struct SpeakerDedupState {
    seen_sentences: HashSet<String>,
    last_emitted_at: Option<DateTime<Utc>>,
}

/// Streaming transcript cleaner. Feed observations in capture order via
/// [`push`](Self::push); emitted statements preserve that order.
#[derive(Debug)]
pub struct TranscriptCleaner {
    gap: Duration,
    speakers: HashMap<String, SpeakerDedupState>,
}

impl TranscriptCleaner {
    pub fn new(gap_seconds: i64) -> Self {
        Self {
            gap: Duration::seconds(gap_seconds),
            speakers: HashMap::new(),
        }
    }

    /// Process one observation. Returns the cleaned statement if the
    /// observation carried content not yet attributed to this speaker.
    pub fn push(&mut self, observation: &CaptionObservation) -> Option<CleanedStatement> {
        let state = self
            .speakers
            .entry(observation.speaker.clone())
            .or_default();

        // Temporal gate: a statement within `gap` of the speaker's last
        // emitted one is buildup from a still-growing render. Dropped without
        // touching any state so the next observation is judged against the
        // original emission time.
        if let Some(last) = state.last_emitted_at {
            if observation.observed_at - last < self.gap {
                return None;
            }
        }

        let mut kept = Vec::new();
        for fragment in observation
            .text
            .split(SENTENCE_DELIMITER)
            .map(str::trim)
            .filter(|f| !f.is_empty())
        {
            if state.seen_sentences.insert(dedup_key(fragment).to_string()) {
                kept.push(fragment);
            }
        }

        if kept.is_empty() {
            // Everything was a restatement; last_emitted_at stays put.
            return None;
        }

        state.last_emitted_at = Some(observation.observed_at);
        Some(CleanedStatement::from_observation(
            observation.observed_at,
            &observation.speaker,
            kept.join(SENTENCE_DELIMITER),
        ))
    }

    /// Batch driver: clean an entire captured session in one pass.
    pub fn clean(observations: &[CaptionObservation], gap_seconds: i64) -> Vec<CleanedStatement> {
        let mut cleaner = Self::new(gap_seconds);
        observations
            .iter()
            .filter_map(|obs| cleaner.push(obs))
            .collect()
    }
}

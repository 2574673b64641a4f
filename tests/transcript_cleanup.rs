//! Transcript cleanup pipeline tests: raw caption observations in, cleaned
//! statements, flattened text, and attendee list out.

use chrono::{DateTime, Duration, TimeZone, Utc};
use meetscribe::transcript::{
    attendees, flatten_transcript, CaptionObservation, TranscriptCleaner,
};

const GAP: i64 = 10;

fn at(secs: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 2, 14, 30, 0).unwrap() + Duration::seconds(secs)
}

fn obs(speaker: &str, secs: i64, text: &str) -> CaptionObservation {
    CaptionObservation::new(speaker, at(secs), text)
}

#[test]
fn growing_render_collapses_to_first_emission() {
    let cleaned = TranscriptCleaner::clean(
        &[obs("Alice", 0, "Hi"), obs("Alice", 2, "Hi there")],
        GAP,
    );

    assert_eq!(cleaned.len(), 1);
    assert_eq!(cleaned[0].user, "Alice");
    assert_eq!(cleaned[0].content, "Hi");
}

#[test]
fn repeated_sentences_filtered_past_the_gap() {
    let cleaned = TranscriptCleaner::clean(
        &[
            obs("Alice", 0, "We should ship. We should ship the fix."),
            obs("Alice", 12, "We should ship the fix. Today."),
        ],
        GAP,
    );

    assert_eq!(cleaned.len(), 2);
    assert_eq!(
        cleaned[0].content,
        "We should ship. We should ship the fix."
    );
    assert_eq!(cleaned[1].content, "Today.");
}

#[test]
fn interleaved_speakers_both_emitted() {
    let cleaned = TranscriptCleaner::clean(
        &[obs("Alice", 0, "Hello"), obs("Bob", 1, "Hi Alice")],
        GAP,
    );

    assert_eq!(cleaned.len(), 2);
    assert_eq!(cleaned[0].user, "Alice");
    assert_eq!(cleaned[0].content, "Hello");
    assert_eq!(cleaned[1].user, "Bob");
    assert_eq!(cleaned[1].content, "Hi Alice");
}

#[test]
fn realistic_session_end_to_end() {
    // A two-speaker exchange the way a live caption UI actually renders it:
    // each speaker's line grows tick by tick, then a new utterance replaces
    // it.
    let observations = vec![
        obs("Alice", 0, "Good morning"),
        obs("Alice", 2, "Good morning everyone"),
        obs("Bob", 3, "Morning Alice"),
        obs("Alice", 4, "Good morning everyone. Let's get started"),
        obs("Alice", 11, "Good morning everyone. Let's get started."),
        obs("Bob", 14, "Morning Alice. I have one agenda item."),
        obs("Alice", 22, "Let's get started. Go ahead Bob."),
    ];

    let cleaned = TranscriptCleaner::clean(&observations, GAP);

    let emitted: Vec<(&str, &str)> = cleaned
        .iter()
        .map(|s| (s.user.as_str(), s.content.as_str()))
        .collect();
    assert_eq!(
        emitted,
        vec![
            ("Alice", "Good morning"),
            ("Bob", "Morning Alice"),
            ("Alice", "Good morning everyone. Let's get started."),
            ("Bob", "I have one agenda item."),
            ("Alice", "Go ahead Bob."),
        ]
    );

    assert_eq!(attendees(&cleaned), vec!["Alice", "Bob"]);

    let flat = flatten_transcript(&cleaned);
    let lines: Vec<&str> = flat.lines().collect();
    assert_eq!(lines.len(), 5);
    assert_eq!(lines[0], "Alice at 14:30:00: Good morning");
    assert_eq!(lines[1], "Bob at 14:30:03: Morning Alice");
    assert_eq!(lines[4], "Alice at 14:30:22: Go ahead Bob.");
}

#[test]
fn cleaned_output_preserves_observation_order() {
    // Whatever the cleaner drops, what survives keeps capture order even
    // with three interleaved speakers.
    let observations = vec![
        obs("Alice", 0, "First point."),
        obs("Bob", 1, "Noted."),
        obs("Carol", 2, "Agreed."),
        obs("Alice", 5, "First point. Second point."), // gated
        obs("Bob", 13, "Noted. Anything else?"),
        obs("Alice", 15, "First point. Second point."),
    ];

    let cleaned = TranscriptCleaner::clean(&observations, GAP);
    let users: Vec<&str> = cleaned.iter().map(|s| s.user.as_str()).collect();
    assert_eq!(users, vec!["Alice", "Bob", "Carol", "Bob", "Alice"]);
    assert_eq!(cleaned[3].content, "Anything else?");
    assert_eq!(cleaned[4].content, "Second point.");
}

#[test]
fn empty_and_whitespace_observations_emit_nothing() {
    let cleaned = TranscriptCleaner::clean(
        &[obs("Alice", 0, ""), obs("Alice", 12, "   "), obs("Bob", 13, " . ")],
        GAP,
    );
    assert!(cleaned.is_empty());
    assert!(attendees(&cleaned).is_empty());
    assert_eq!(flatten_transcript(&cleaned), "");
}

#[test]
fn observation_exactly_at_the_gap_boundary_passes() {
    let mut cleaner = TranscriptCleaner::new(GAP);
    assert!(cleaner.push(&obs("Alice", 0, "Opening.")).is_some());
    // 9s: inside the gate.
    assert!(cleaner.push(&obs("Alice", 9, "Opening. More.")).is_none());
    // Exactly GAP seconds after the last emission: passes.
    let emitted = cleaner.push(&obs("Alice", 10, "Opening. More."));
    assert_eq!(emitted.unwrap().content, "More.");
}

#[test]
fn statement_timestamps_come_from_the_observation() {
    let cleaned = TranscriptCleaner::clean(&[obs("Alice", 42, "On time.")], GAP);
    assert_eq!(cleaned[0].date, "2025-06-02");
    assert_eq!(cleaned[0].time, "14:30:42");
}

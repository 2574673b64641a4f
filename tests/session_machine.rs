//! End-to-end session machine tests against a scripted UI adapter.
//!
//! The scripted adapter plays back configured behavior per operation so the
//! whole join flow — retries, optional-step skips, admission polling,
//! capture, cleanup — runs without a browser. Tests use paused tokio time,
//! so polling loops complete instantly.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use meetscribe::audio::{HostEnvironment, NullEnvironment};
use meetscribe::automation::{CaptionSlot, MeetingUi, UiError};
use meetscribe::session::{
    JoinPhase, JoinRequest, JoinStatus, SessionConfig, SessionError, SessionMachine,
    SessionStatusHandle,
};

/// What the scripted adapter should do for each operation.
#[derive(Default, Clone)]
struct Script {
    /// Blocking dialog renders and can be dismissed.
    dialog_present: bool,
    /// Pre-join name field renders (absent = already authenticated).
    name_field_present: bool,
    /// Times the join click fails with ActionFailed before succeeding.
    join_failures: u32,
    /// Admission granted after this many polls; None = never admitted.
    admit_after: Option<u32>,
    /// Times the captions control is reported absent before it works.
    captions_absent_times: u32,
    /// Caption slots returned per capture tick; the meeting ends after the
    /// last frame.
    frames: Vec<Vec<CaptionSlot>>,
    /// Capture tick indices whose read fails.
    failing_reads: Vec<usize>,
    /// open_link dies with a driver error.
    open_link_driver_failure: bool,
}

/// Observable side effects, shared with the test after the machine consumes
/// the adapter.
#[derive(Default)]
struct Probe {
    shutdown_called: AtomicBool,
    mic_muted: AtomicBool,
    camera_muted: AtomicBool,
    admission_polls: AtomicU32,
}

struct ScriptedUi {
    script: Script,
    probe: Arc<Probe>,
    started: bool,
    join_attempts: u32,
    admission_polls: u32,
    captions_attempts: u32,
    tick: usize,
}

impl ScriptedUi {
    fn new(script: Script) -> (Self, Arc<Probe>) {
        let probe = Arc::new(Probe::default());
        (
            Self {
                script,
                probe: probe.clone(),
                started: false,
                join_attempts: 0,
                admission_polls: 0,
                captions_attempts: 0,
                tick: 0,
            },
            probe,
        )
    }
}

#[async_trait]
impl MeetingUi for ScriptedUi {
    async fn start(&mut self) -> Result<(), UiError> {
        self.started = true;
        Ok(())
    }

    async fn open_link(&mut self, _url: &str) -> Result<(), UiError> {
        if self.script.open_link_driver_failure {
            return Err(UiError::Driver("browser crashed".to_string()));
        }
        Ok(())
    }

    async fn grant_media_permissions(&mut self) -> Result<(), UiError> {
        Ok(())
    }

    async fn dismiss_blocking_dialog(&mut self) -> Result<(), UiError> {
        if self.script.dialog_present {
            Ok(())
        } else {
            Err(UiError::ElementNotFound("blocking dialog".to_string()))
        }
    }

    async fn set_microphone_muted(&mut self, muted: bool) -> Result<(), UiError> {
        self.probe.mic_muted.store(muted, Ordering::SeqCst);
        Ok(())
    }

    async fn set_camera_muted(&mut self, muted: bool) -> Result<(), UiError> {
        self.probe.camera_muted.store(muted, Ordering::SeqCst);
        Ok(())
    }

    async fn enter_display_name(&mut self, _name: &str) -> Result<(), UiError> {
        if self.script.name_field_present {
            Ok(())
        } else {
            Err(UiError::ElementNotFound("display name field".to_string()))
        }
    }

    async fn click_join(&mut self) -> Result<(), UiError> {
        self.join_attempts += 1;
        if self.join_attempts <= self.script.join_failures {
            Err(UiError::ActionFailed {
                control: "join button".to_string(),
                reason: "element intercepted".to_string(),
            })
        } else {
            Ok(())
        }
    }

    async fn is_admitted(&mut self) -> Result<bool, UiError> {
        self.admission_polls += 1;
        self.probe
            .admission_polls
            .store(self.admission_polls, Ordering::SeqCst);
        match self.script.admit_after {
            Some(after) => Ok(self.admission_polls > after),
            None => Ok(false),
        }
    }

    async fn enable_captions(&mut self) -> Result<(), UiError> {
        self.captions_attempts += 1;
        if self.captions_attempts <= self.script.captions_absent_times {
            Err(UiError::ElementNotFound("captions button".to_string()))
        } else {
            Ok(())
        }
    }

    async fn read_visible_captions(&mut self) -> Result<Vec<CaptionSlot>, UiError> {
        let tick = self.tick;
        self.tick += 1;
        if self.script.failing_reads.contains(&tick) {
            return Err(UiError::ActionFailed {
                control: "caption slots".to_string(),
                reason: "stale element reference".to_string(),
            });
        }
        Ok(self.script.frames.get(tick).cloned().unwrap_or_default())
    }

    async fn meeting_ended(&mut self) -> Result<bool, UiError> {
        Ok(self.tick >= self.script.frames.len())
    }

    async fn shutdown(&mut self) -> Result<(), UiError> {
        self.probe.shutdown_called.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Environment that always fails provisioning.
struct BrokenEnvironment;

#[async_trait]
impl HostEnvironment for BrokenEnvironment {
    async fn ensure_ready(&self) -> anyhow::Result<()> {
        anyhow::bail!("pulseaudio daemon refused to start")
    }
}

fn test_config() -> SessionConfig {
    SessionConfig {
        display_name: "Scribe".to_string(),
        step_timeout: Duration::from_secs(5),
        step_retries: 3,
        admission_window: Duration::from_secs(30),
        admission_poll: Duration::from_secs(1),
        caption_poll: Duration::from_secs(2),
        dedup_gap_seconds: 10,
    }
}

fn request() -> JoinRequest {
    JoinRequest {
        meeting_link: "https://meet.example.com/abc-defg-hij".to_string(),
        duration_minutes: 1,
    }
}

fn machine(script: Script) -> (SessionMachine, Arc<Probe>, SessionStatusHandle) {
    let (ui, probe) = ScriptedUi::new(script);
    let status = SessionStatusHandle::default();
    let machine = SessionMachine::new(
        Box::new(ui),
        Box::new(NullEnvironment),
        None,
        test_config(),
        status.clone(),
    );
    (machine, probe, status)
}

fn slot(speaker: &str, text: &str) -> CaptionSlot {
    CaptionSlot {
        speaker: speaker.to_string(),
        text: text.to_string(),
    }
}

#[tokio::test(start_paused = true)]
async fn happy_path_captures_and_cleans() {
    let script = Script {
        dialog_present: true,
        name_field_present: true,
        admit_after: Some(2),
        frames: vec![
            vec![slot("Alice", "Hello everyone")],
            vec![slot("Alice", "Hello everyone"), slot("Bob", "Hi Alice")],
        ],
        ..Script::default()
    };
    let (mut machine, probe, status) = machine(script);

    let outcome = machine.join(&request()).await.unwrap();

    assert_eq!(outcome.status, JoinStatus::Completed);
    // Alice's unchanged slot text is not re-observed; Bob's is new.
    assert_eq!(outcome.transcript.len(), 2);
    assert_eq!(outcome.transcript[0].user, "Alice");
    assert_eq!(outcome.transcript[0].content, "Hello everyone");
    assert_eq!(outcome.transcript[1].user, "Bob");
    assert_eq!(outcome.attendees, vec!["Alice", "Bob"]);

    assert!(probe.mic_muted.load(Ordering::SeqCst));
    assert!(probe.camera_muted.load(Ordering::SeqCst));
    assert!(probe.shutdown_called.load(Ordering::SeqCst));
    assert_eq!(status.get().await.phase, JoinPhase::Completed);
}

#[tokio::test(start_paused = true)]
async fn session_runs_inside_a_spawned_task() {
    // The service loop runs each session in its own tokio::spawn, so the
    // whole join future has to be Send.
    let script = Script {
        admit_after: Some(0),
        frames: vec![vec![slot("Alice", "Running detached")]],
        ..Script::default()
    };
    let (ui, probe) = ScriptedUi::new(script);
    let status = SessionStatusHandle::default();
    let mut machine = SessionMachine::new(
        Box::new(ui),
        Box::new(NullEnvironment),
        None,
        test_config(),
        status,
    );

    let handle = tokio::spawn(async move { machine.join(&request()).await });

    let outcome = handle.await.unwrap().unwrap();
    assert_eq!(outcome.status, JoinStatus::Completed);
    assert_eq!(outcome.transcript.len(), 1);
    assert!(probe.shutdown_called.load(Ordering::SeqCst));
}

#[tokio::test(start_paused = true)]
async fn optional_controls_absent_still_join() {
    // No dialog, no name field (already authenticated): both steps skip.
    let script = Script {
        admit_after: Some(0),
        frames: vec![vec![slot("Alice", "Quick note")]],
        ..Script::default()
    };
    let (mut machine, _probe, _status) = machine(script);

    let outcome = machine.join(&request()).await.unwrap();
    assert_eq!(outcome.status, JoinStatus::Completed);
    assert_eq!(outcome.transcript.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn transient_join_failures_are_retried() {
    let script = Script {
        join_failures: 2, // third attempt succeeds, budget is 3
        admit_after: Some(0),
        frames: vec![vec![slot("Alice", "Made it")]],
        ..Script::default()
    };
    let (mut machine, _probe, _status) = machine(script);

    let outcome = machine.join(&request()).await.unwrap();
    assert_eq!(outcome.status, JoinStatus::Completed);
}

#[tokio::test(start_paused = true)]
async fn exhausted_join_retries_fail_the_session() {
    let script = Script {
        join_failures: 10,
        admit_after: Some(0),
        ..Script::default()
    };
    let (mut machine, probe, status) = machine(script);

    let err = machine.join(&request()).await.unwrap_err();
    assert!(matches!(
        err,
        SessionError::StepExhausted {
            step: "click join",
            attempts: 3,
            ..
        }
    ));
    // Browser still torn down on failure.
    assert!(probe.shutdown_called.load(Ordering::SeqCst));
    assert_eq!(status.get().await.phase, JoinPhase::Failed);
}

#[tokio::test(start_paused = true)]
async fn admission_timeout_returns_empty_transcript() {
    let script = Script {
        admit_after: None, // host never lets the bot in
        ..Script::default()
    };
    let (mut machine, probe, status) = machine(script);

    let outcome = machine.join(&request()).await.unwrap();

    assert_eq!(outcome.status, JoinStatus::AdmissionTimeout);
    assert!(outcome.transcript.is_empty());
    assert!(outcome.attendees.is_empty());
    assert!(probe.admission_polls.load(Ordering::SeqCst) > 1);
    assert!(probe.shutdown_called.load(Ordering::SeqCst));
    assert_eq!(status.get().await.phase, JoinPhase::AdmissionTimeout);
}

#[tokio::test(start_paused = true)]
async fn captions_control_retried_until_it_renders() {
    let script = Script {
        admit_after: Some(0),
        captions_absent_times: 5,
        frames: vec![vec![slot("Alice", "Late captions")]],
        ..Script::default()
    };
    let (mut machine, _probe, _status) = machine(script);

    let outcome = machine.join(&request()).await.unwrap();
    assert_eq!(outcome.status, JoinStatus::Completed);
    assert_eq!(outcome.transcript.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn failed_capture_tick_is_skipped() {
    let script = Script {
        admit_after: Some(0),
        frames: vec![
            vec![slot("Alice", "Before the glitch")],
            vec![], // this read fails instead
            vec![slot("Bob", "After the glitch")],
        ],
        failing_reads: vec![1],
        ..Script::default()
    };
    let (mut machine, _probe, _status) = machine(script);

    let outcome = machine.join(&request()).await.unwrap();
    assert_eq!(outcome.status, JoinStatus::Completed);
    let users: Vec<&str> = outcome.transcript.iter().map(|s| s.user.as_str()).collect();
    assert_eq!(users, vec!["Alice", "Bob"]);
}

#[tokio::test(start_paused = true)]
async fn driver_failure_is_fatal() {
    let script = Script {
        open_link_driver_failure: true,
        ..Script::default()
    };
    let (mut machine, probe, status) = machine(script);

    let err = machine.join(&request()).await.unwrap_err();
    assert!(matches!(err, SessionError::Driver { .. }));
    assert!(probe.shutdown_called.load(Ordering::SeqCst));
    assert_eq!(status.get().await.phase, JoinPhase::Failed);
}

#[tokio::test(start_paused = true)]
async fn environment_failure_aborts_before_ui() {
    let (ui, probe) = ScriptedUi::new(Script::default());
    let status = SessionStatusHandle::default();
    let mut machine = SessionMachine::new(
        Box::new(ui),
        Box::new(BrokenEnvironment),
        None,
        test_config(),
        status.clone(),
    );

    let err = machine.join(&request()).await.unwrap_err();
    assert!(matches!(err, SessionError::Environment(_)));
    assert_eq!(status.get().await.phase, JoinPhase::Failed);
    // Shutdown is still attempted; no admission polls ever happened.
    assert_eq!(probe.admission_polls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn invalid_requests_are_rejected_before_side_effects() {
    let (mut machine, probe, _status) = machine(Script::default());

    let err = machine
        .join(&JoinRequest {
            meeting_link: String::new(),
            duration_minutes: 30,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::InvalidRequest(_)));
    assert!(!machine_touched(&probe));
}

fn machine_touched(probe: &Probe) -> bool {
    probe.shutdown_called.load(Ordering::SeqCst)
        || probe.admission_polls.load(Ordering::SeqCst) > 0
}

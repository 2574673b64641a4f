//! Meeting-join session orchestrator.
//!
//! Drives one session from "not joined" to "capturing" (or a terminal
//! failure) through the UI capability adapter. Every step gets a bounded
//! timeout and retry budget; optional controls that never rendered advance
//! the machine instead of failing it. All collaborators are injected, so
//! the whole flow runs against a scripted adapter in tests.

use chrono::{DateTime, Utc};
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::audio::{HostEnvironment, Recorder};
use crate::automation::{MeetingUi, UiError};
use crate::config::BotConfig;
use crate::transcript::{attendees, CleanedStatement, TranscriptCleaner};

use super::capture::capture_until_deadline;
use super::status::{JoinPhase, SessionStatusHandle};

/// Sleep between retries of a step whose control has not rendered yet.
const STEP_RETRY_DELAY: Duration = Duration::from_secs(2);
/// Sleep between caption-enable probes while transient UI settles.
const CAPTIONS_RETRY_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("invalid join request: {0}")]
    InvalidRequest(String),

    #[error("environment provisioning failed: {0}")]
    Environment(#[source] anyhow::Error),

    #[error("step '{step}' failed after {attempts} attempts: {source}")]
    StepExhausted {
        step: &'static str,
        attempts: u32,
        source: UiError,
    },

    #[error("driver failure during '{step}': {source}")]
    Driver { step: &'static str, source: UiError },
}

/// Input to one join invocation.
#[derive(Debug, Clone)]
pub struct JoinRequest {
    pub meeting_link: String,
    pub duration_minutes: u32,
}

impl JoinRequest {
    pub fn validate(&self) -> Result<(), SessionError> {
        if self.meeting_link.trim().is_empty() {
            return Err(SessionError::InvalidRequest(
                "meeting link is required".to_string(),
            ));
        }
        if self.duration_minutes == 0 {
            return Err(SessionError::InvalidRequest(
                "duration must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// How a session ended. Both are successful results; admission timeout
/// means the host never let the bot in and the transcript is empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinStatus {
    Completed,
    AdmissionTimeout,
}

impl JoinStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::AdmissionTimeout => "admission_timeout",
        }
    }
}

#[derive(Debug)]
pub struct JoinOutcome {
    pub status: JoinStatus,
    pub transcript: Vec<CleanedStatement>,
    pub attendees: Vec<String>,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
}

/// Join-flow tunables, lifted out of [`BotConfig`].
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub display_name: String,
    pub step_timeout: Duration,
    pub step_retries: u32,
    pub admission_window: Duration,
    pub admission_poll: Duration,
    pub caption_poll: Duration,
    pub dedup_gap_seconds: i64,
}

impl From<&BotConfig> for SessionConfig {
    fn from(bot: &BotConfig) -> Self {
        Self {
            display_name: bot.display_name.clone(),
            step_timeout: Duration::from_secs(bot.step_timeout_seconds),
            step_retries: bot.step_retries.max(1),
            admission_window: Duration::from_secs(bot.admission_window_seconds),
            admission_poll: Duration::from_secs(bot.admission_poll_seconds),
            caption_poll: Duration::from_secs(bot.caption_poll_seconds),
            dedup_gap_seconds: bot.dedup_gap_seconds,
        }
    }
}

/// Join steps the retry helper can perform. Keeping them as data lets one
/// helper own the timeout/retry/absence policy for every transition.
#[derive(Debug, Clone, Copy)]
enum StepOp {
    OpenLink,
    GrantPermissions,
    DismissDialog,
    EnterName,
    ClickJoin,
}

impl StepOp {
    fn name(&self) -> &'static str {
        match self {
            Self::OpenLink => "open link",
            Self::GrantPermissions => "grant permissions",
            Self::DismissDialog => "dismiss dialog",
            Self::EnterName => "enter display name",
            Self::ClickJoin => "click join",
        }
    }
}

enum StepResult {
    Done,
    /// Optional control absent; the step is considered already satisfied.
    Skipped,
}

pub struct SessionMachine {
    ui: Box<dyn MeetingUi>,
    environment: Box<dyn HostEnvironment>,
    recorder: Option<Box<dyn Recorder>>,
    config: SessionConfig,
    status: SessionStatusHandle,
}

impl SessionMachine {
    pub fn new(
        ui: Box<dyn MeetingUi>,
        environment: Box<dyn HostEnvironment>,
        recorder: Option<Box<dyn Recorder>>,
        config: SessionConfig,
        status: SessionStatusHandle,
    ) -> Self {
        Self {
            ui,
            environment,
            recorder,
            config,
            status,
        }
    }

    /// Run one complete join: provision, join, capture, clean. Returns the
    /// cleaned transcript (empty on admission timeout) or the single fatal
    /// error; resources are released on every path.
    pub async fn join(&mut self, request: &JoinRequest) -> Result<JoinOutcome, SessionError> {
        request.validate()?;
        self.status.begin(request.meeting_link.clone()).await;
        let started_at = Utc::now();

        let result = self.run(request).await;

        // Terminal cleanup regardless of how the session ended.
        if let Some(recorder) = self.recorder.as_mut() {
            if let Err(e) = recorder.stop().await {
                warn!("Failed to stop recorder: {}", e);
            }
        }
        if let Err(e) = self.ui.shutdown().await {
            warn!("Failed to shut down browser session: {}", e);
        }

        match result {
            Ok(status) => {
                let ended_at = Utc::now();
                let transcript = match &status {
                    RunResult::Captured(observations) => {
                        TranscriptCleaner::clean(observations, self.config.dedup_gap_seconds)
                    }
                    RunResult::NeverAdmitted => Vec::new(),
                };
                let join_status = match status {
                    RunResult::Captured(_) => JoinStatus::Completed,
                    RunResult::NeverAdmitted => JoinStatus::AdmissionTimeout,
                };
                let phase = match join_status {
                    JoinStatus::Completed => JoinPhase::Completed,
                    JoinStatus::AdmissionTimeout => JoinPhase::AdmissionTimeout,
                };
                self.status.set_phase(phase).await;
                info!(
                    "Session {} with {} cleaned statements",
                    join_status.as_str(),
                    transcript.len()
                );
                let attendees = attendees(&transcript);
                Ok(JoinOutcome {
                    status: join_status,
                    transcript,
                    attendees,
                    started_at,
                    ended_at,
                })
            }
            Err(e) => {
                self.status.fail(e.to_string()).await;
                Err(e)
            }
        }
    }

    async fn run(&mut self, request: &JoinRequest) -> Result<RunResult, SessionError> {
        // Host provisioning failures abort before any UI interaction.
        self.environment
            .ensure_ready()
            .await
            .map_err(SessionError::Environment)?;
        self.advance(JoinPhase::EnvironmentReady).await;

        self.ui.start().await.map_err(|e| SessionError::Driver {
            step: "launch browser",
            source: e,
        })?;
        self.advance(JoinPhase::BrowserReady).await;

        // Overall session deadline: everything from here on, including the
        // capture window, is bounded by it.
        let deadline = Instant::now() + Duration::from_secs(request.duration_minutes as u64 * 60);

        self.run_step(StepOp::OpenLink, request, false).await?;
        self.advance(JoinPhase::LinkOpened).await;

        self.run_step(StepOp::GrantPermissions, request, true).await?;
        self.advance(JoinPhase::PermissionsGranted).await;

        self.run_step(StepOp::DismissDialog, request, true).await?;
        self.configure_devices().await?;
        self.advance(JoinPhase::DevicesConfigured).await;

        // Absent name field means the session is already authenticated.
        self.run_step(StepOp::EnterName, request, true).await?;
        self.advance(JoinPhase::NameEntered).await;

        self.run_step(StepOp::ClickJoin, request, false).await?;
        self.advance(JoinPhase::AdmissionRequested).await;

        if !self.wait_for_admission().await? {
            info!("Admission window elapsed, host never admitted the bot");
            return Ok(RunResult::NeverAdmitted);
        }
        self.advance(JoinPhase::Admitted).await;

        if self.enable_captions_until(deadline).await? {
            self.advance(JoinPhase::CaptionsEnabled).await;
        } else {
            // Deadline beat the captions control; fall through to a capture
            // window that is already over and complete with nothing.
            warn!("Captions control never rendered before the session deadline");
        }

        self.advance(JoinPhase::Capturing).await;
        if let Some(recorder) = self.recorder.as_mut() {
            if let Err(e) = recorder.start().await {
                warn!("Recorder failed to start, continuing without it: {}", e);
            }
        }

        let observations =
            capture_until_deadline(self.ui.as_mut(), deadline, self.config.caption_poll).await;

        Ok(RunResult::Captured(observations))
    }

    /// One state-machine step: per-attempt timeout, bounded retries,
    /// optional-absence advancement, fatal passthrough.
    async fn run_step(
        &mut self,
        op: StepOp,
        request: &JoinRequest,
        optional: bool,
    ) -> Result<StepResult, SessionError> {
        let mut last_error = UiError::ElementNotFound(op.name().to_string());

        for attempt in 1..=self.config.step_retries {
            let outcome =
                tokio::time::timeout(self.config.step_timeout, self.perform(op, request)).await;

            match outcome {
                Ok(Ok(())) => return Ok(StepResult::Done),
                Ok(Err(e)) if e.is_fatal() => {
                    return Err(SessionError::Driver {
                        step: op.name(),
                        source: e,
                    })
                }
                Ok(Err(e)) if e.is_not_found() && optional => {
                    debug!("Step '{}': control absent, already satisfied", op.name());
                    return Ok(StepResult::Skipped);
                }
                Ok(Err(e)) => {
                    debug!("Step '{}' attempt {} failed: {}", op.name(), attempt, e);
                    last_error = e;
                }
                Err(_) => {
                    debug!("Step '{}' attempt {} timed out", op.name(), attempt);
                    last_error = UiError::ActionFailed {
                        control: op.name().to_string(),
                        reason: format!("timed out after {:?}", self.config.step_timeout),
                    };
                }
            }

            if attempt < self.config.step_retries {
                tokio::time::sleep(STEP_RETRY_DELAY).await;
            }
        }

        Err(SessionError::StepExhausted {
            step: op.name(),
            attempts: self.config.step_retries,
            source: last_error,
        })
    }

    async fn perform(&mut self, op: StepOp, request: &JoinRequest) -> Result<(), UiError> {
        match op {
            StepOp::OpenLink => self.ui.open_link(&request.meeting_link).await,
            StepOp::GrantPermissions => self.ui.grant_media_permissions().await,
            StepOp::DismissDialog => self.ui.dismiss_blocking_dialog().await,
            StepOp::EnterName => {
                let name = self.config.display_name.clone();
                self.ui.enter_display_name(&name).await
            }
            StepOp::ClickJoin => self.ui.click_join().await,
        }
    }

    /// Best-effort device muting. Call quality is not a correctness property
    /// of this system, so failures are logged and never block progression —
    /// except driver death, which nothing survives.
    async fn configure_devices(&mut self) -> Result<(), SessionError> {
        for (device, result) in [
            ("microphone", self.ui.set_microphone_muted(true).await),
            ("camera", self.ui.set_camera_muted(true).await),
        ] {
            match result {
                Ok(()) => {}
                Err(e) if e.is_fatal() => {
                    return Err(SessionError::Driver {
                        step: "configure devices",
                        source: e,
                    })
                }
                Err(e) if e.is_not_found() => {
                    debug!("{} toggle not present, leaving as-is", device)
                }
                Err(e) => warn!("Could not mute {}: {}", device, e),
            }
        }
        Ok(())
    }

    /// Poll admission at a fixed interval inside the admission window.
    /// Returns `false` when the window elapses without being admitted.
    async fn wait_for_admission(&mut self) -> Result<bool, SessionError> {
        let admission_deadline = Instant::now() + self.config.admission_window;

        loop {
            match self.ui.is_admitted().await {
                Ok(true) => return Ok(true),
                Ok(false) => {}
                Err(e) if e.is_fatal() => {
                    return Err(SessionError::Driver {
                        step: "admission wait",
                        source: e,
                    })
                }
                // A flaky lobby read is just another "not yet".
                Err(e) => debug!("Admission probe failed: {}", e),
            }

            if Instant::now() >= admission_deadline {
                return Ok(false);
            }
            tokio::time::sleep(self.config.admission_poll).await;
        }
    }

    /// Keep probing the captions control until it works or the session
    /// deadline arrives. There is no per-step budget here: the control often
    /// only renders once other transient UI settles. Returns whether
    /// captions were enabled.
    async fn enable_captions_until(&mut self, deadline: Instant) -> Result<bool, SessionError> {
        loop {
            if Instant::now() >= deadline {
                return Ok(false);
            }
            match self.ui.enable_captions().await {
                Ok(()) => return Ok(true),
                Err(e) if e.is_fatal() => {
                    return Err(SessionError::Driver {
                        step: "enable captions",
                        source: e,
                    })
                }
                Err(e) => debug!("Captions not ready yet: {}", e),
            }
            tokio::time::sleep(CAPTIONS_RETRY_DELAY).await;
        }
    }

    async fn advance(&mut self, phase: JoinPhase) {
        debug!("Session -> {}", phase.as_str());
        self.status.set_phase(phase).await;
    }
}

enum RunResult {
    Captured(Vec<crate::transcript::CaptionObservation>),
    NeverAdmitted,
}

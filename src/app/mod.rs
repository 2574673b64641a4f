//! Service wiring: config, host provisioning, API server, session tasks.

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::api::{ApiCommand, ApiServer};
use crate::audio::{environment_from_config, FfmpegRecorder, Recorder};
use crate::automation::MeetUi;
use crate::config::Config;
use crate::db::{self, SummaryRepository};
use crate::global;
use crate::session::{
    JoinOutcome, JoinRequest, JoinStatus, SessionConfig, SessionMachine, SessionRegistry,
    SessionStatusHandle,
};
use crate::summarizer::{summarizer_from_config, MeetingSummary};
use crate::transcript::flatten_transcript;

/// Summary text recorded when the host never admitted the bot.
const NEVER_ADMITTED_SUMMARY: &str = "Bot was never admitted to the call";

pub async fn run_service() -> Result<()> {
    info!("Starting meetscribe service");

    let config = Config::load()?;

    // Host-level audio provisioning is shared by every session and
    // idempotent; do it once up front so the first join does not pay for it.
    if let Err(e) = environment_from_config(&config.audio).ensure_ready().await {
        warn!("Host audio provisioning failed at startup: {}", e);
    }

    let (tx, mut rx) = mpsc::channel::<ApiCommand>(16);
    let registry = SessionRegistry::default();

    let api_server = ApiServer::new(tx, registry.clone(), &config);
    tokio::spawn(async move {
        if let Err(e) = api_server.start().await {
            error!("API server failed: {}", e);
        }
    });

    info!("meetscribe is ready!");
    info!(
        "Join a meeting: curl -X POST http://{}:{}/join-meet \
         -H 'Content-Type: application/json' \
         -d '{{\"meet_link\": \"https://meet.google.com/abc\", \"duration_minutes\": 30}}'",
        config.api.host, config.api.port
    );

    while let Some(command) = rx.recv().await {
        match command {
            ApiCommand::Join {
                meeting_id,
                request,
            } => {
                // Sessions are shared-nothing: each task owns its machine,
                // browser session and dedup state.
                let config = config.clone();
                let registry = registry.clone();
                let status = SessionStatusHandle::default();
                registry.register(meeting_id, status.clone()).await;

                tokio::spawn(async move {
                    match execute_join(&config, meeting_id, &request, status).await {
                        Ok(outcome) => info!(
                            "Meeting {} finished: {} ({} statements)",
                            meeting_id,
                            outcome.status.as_str(),
                            outcome.transcript.len()
                        ),
                        Err(e) => error!("Meeting {} failed: {:#}", meeting_id, e),
                    }
                    registry.remove(meeting_id).await;
                });
            }
        }
    }

    Ok(())
}

/// Run one join end to end: session, summary, persistence. Used by both the
/// service loop and the one-shot CLI command.
pub async fn execute_join(
    config: &Config,
    meeting_id: i64,
    request: &JoinRequest,
    status: SessionStatusHandle,
) -> Result<JoinOutcome> {
    let mut machine = build_machine(config, status)?;

    let result = machine.join(request).await;

    match result {
        Ok(outcome) => {
            let summary = summarize(config, &outcome).await;
            persist_outcome(meeting_id, &outcome, &summary)?;
            Ok(outcome)
        }
        Err(e) => {
            let conn = db::init_db().ok();
            if let Some(conn) = &conn {
                if let Err(db_err) = SummaryRepository::fail(conn, meeting_id, &e.to_string()) {
                    warn!("Failed to record session failure: {}", db_err);
                }
            }
            Err(e).context("meeting session failed")
        }
    }
}

fn build_machine(config: &Config, status: SessionStatusHandle) -> Result<SessionMachine> {
    let ui = Box::new(MeetUi::new(&config.browser));
    let environment = environment_from_config(&config.audio);

    let recorder: Option<Box<dyn Recorder>> = if config.audio.enabled {
        Some(Box::new(FfmpegRecorder::new(
            &config.audio,
            global::recordings_dir()?,
        )))
    } else {
        None
    };

    Ok(SessionMachine::new(
        ui,
        environment,
        recorder,
        SessionConfig::from(&config.bot),
        status,
    ))
}

/// Summarize a finished session. Summarizer failures degrade to an empty
/// summary; the transcript is the product.
async fn summarize(config: &Config, outcome: &JoinOutcome) -> MeetingSummary {
    match outcome.status {
        JoinStatus::AdmissionTimeout => MeetingSummary {
            summary: NEVER_ADMITTED_SUMMARY.to_string(),
            action_items: Vec::new(),
        },
        JoinStatus::Completed if outcome.transcript.is_empty() => {
            debug!("Transcript is empty, skipping summarization");
            MeetingSummary::default()
        }
        JoinStatus::Completed => {
            let flat = flatten_transcript(&outcome.transcript);
            match summarizer_from_config(&config.summarizer)
                .summarize(&flat)
                .await
            {
                Ok(summary) => summary,
                Err(e) => {
                    warn!("Summarization failed, storing transcript only: {}", e);
                    MeetingSummary::default()
                }
            }
        }
    }
}

fn persist_outcome(
    meeting_id: i64,
    outcome: &JoinOutcome,
    summary: &MeetingSummary,
) -> Result<()> {
    let conn = db::init_db()?;
    let duration_seconds = (outcome.ended_at - outcome.started_at).num_seconds().max(0);
    SummaryRepository::complete(
        &conn,
        meeting_id,
        outcome.status.as_str(),
        &outcome.transcript,
        summary,
        &outcome.attendees,
        duration_seconds,
    )
}

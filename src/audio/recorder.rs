//! Best-effort meeting audio recorder.
//!
//! Spawns ffmpeg against the virtual sink monitor while the session is
//! capturing. Recording failures never fail a session; the transcript is
//! the product, the recording is a bonus artifact.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::{Child, Command};
use tracing::{info, warn};

use crate::config::AudioConfig;

#[async_trait]
pub trait Recorder: Send {
    async fn start(&mut self) -> Result<()>;

    /// Stop recording. Must ask the encoder to finish cleanly and only
    /// force-kill it after the grace period.
    async fn stop(&mut self) -> Result<()>;
}

pub struct FfmpegRecorder {
    sink_name: String,
    grace: Duration,
    output_path: PathBuf,
    child: Option<Child>,
}

impl FfmpegRecorder {
    pub fn new(config: &AudioConfig, output_dir: PathBuf) -> Self {
        let output_path = output_dir.join(format!("meeting-{}.wav", uuid::Uuid::new_v4()));
        Self {
            sink_name: config.sink_name.clone(),
            grace: Duration::from_secs(config.recorder_grace_seconds),
            output_path,
            child: None,
        }
    }

    pub fn output_path(&self) -> &PathBuf {
        &self.output_path
    }
}

#[async_trait]
impl Recorder for FfmpegRecorder {
    async fn start(&mut self) -> Result<()> {
        if self.child.is_some() {
            return Ok(());
        }

        if let Some(parent) = self.output_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create recordings directory")?;
        }

        let ffmpeg = which::which("ffmpeg").context("ffmpeg not found on PATH")?;
        let child = Command::new(ffmpeg)
            .arg("-y")
            .args(["-f", "pulse"])
            .args(["-i", &format!("{}.monitor", self.sink_name)])
            .arg(&self.output_path)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .context("Failed to spawn ffmpeg")?;

        info!("Recording meeting audio to {:?}", self.output_path);
        self.child = Some(child);
        Ok(())
    }

    async fn stop(&mut self) -> Result<()> {
        let Some(mut child) = self.child.take() else {
            return Ok(());
        };

        // Ask ffmpeg to finalize the file, then wait out the grace period
        // before killing it.
        if let Some(mut stdin) = child.stdin.take() {
            let _ = stdin.write_all(b"q").await;
            let _ = stdin.shutdown().await;
        }

        match tokio::time::timeout(self.grace, child.wait()).await {
            Ok(Ok(status)) => {
                info!("Recorder exited with {}", status);
            }
            Ok(Err(e)) => {
                warn!("Failed to wait for recorder: {}", e);
            }
            Err(_) => {
                warn!(
                    "Recorder unresponsive after {}s grace, killing",
                    self.grace.as_secs()
                );
                child.start_kill().context("Failed to kill recorder")?;
                let _ = child.wait().await;
            }
        }
        Ok(())
    }
}

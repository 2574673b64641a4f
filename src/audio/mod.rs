//! Host audio collaborators.
//!
//! The meeting browser needs somewhere to route call audio even on a host
//! with no sound hardware, so the environment provisioner creates PulseAudio
//! null sinks. Provisioning is host-level and idempotent: sinks are shared
//! by every concurrent session and creating an existing one is a no-op.

mod recorder;

pub use recorder::{FfmpegRecorder, Recorder};

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

use crate::config::AudioConfig;

/// Host-level environment the session needs before launching a browser.
#[async_trait]
pub trait HostEnvironment: Send + Sync {
    /// Bring the host into a usable state. Must be idempotent; called once
    /// per session but provisions shared host resources.
    async fn ensure_ready(&self) -> Result<()>;
}

/// No-op environment for hosts with real audio devices (or tests).
pub struct NullEnvironment;

#[async_trait]
impl HostEnvironment for NullEnvironment {
    async fn ensure_ready(&self) -> Result<()> {
        Ok(())
    }
}

/// Provisions virtual PulseAudio sinks via `pactl`.
pub struct PulseAudioEnvironment {
    sink_name: String,
    mic_sink_name: String,
}

impl PulseAudioEnvironment {
    pub fn new(config: &AudioConfig) -> Self {
        Self {
            sink_name: config.sink_name.clone(),
            mic_sink_name: config.mic_sink_name.clone(),
        }
    }

    async fn pactl(args: &[&str]) -> Result<String> {
        let pactl = which::which("pactl").context("pactl not found on PATH")?;
        let output = Command::new(pactl)
            .args(args)
            .output()
            .await
            .context("Failed to run pactl")?;
        if !output.status.success() {
            bail!(
                "pactl {:?} exited with {}: {}",
                args,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    async fn sink_exists(name: &str) -> Result<bool> {
        let sinks = Self::pactl(&["list", "short", "sinks"]).await?;
        Ok(sinks.lines().any(|line| {
            line.split_whitespace()
                .nth(1)
                .map(|sink| sink == name)
                .unwrap_or(false)
        }))
    }

    async fn ensure_sink(name: &str, description: &str) -> Result<()> {
        if Self::sink_exists(name).await? {
            debug!("Sink {} already present, skipping", name);
            return Ok(());
        }
        Self::pactl(&[
            "load-module",
            "module-null-sink",
            &format!("sink_name={}", name),
            &format!("sink_properties=device.description=\"{}\"", description),
        ])
        .await?;
        info!("Created virtual sink {}", name);
        Ok(())
    }
}

#[async_trait]
impl HostEnvironment for PulseAudioEnvironment {
    async fn ensure_ready(&self) -> Result<()> {
        Self::ensure_sink(&self.sink_name, "Virtual_Dummy_Output").await?;
        Self::ensure_sink(&self.mic_sink_name, "Virtual_Microphone_Output").await?;

        // Route default capture and playback through the virtual devices so
        // the browser picks them up without per-session configuration.
        Self::pactl(&[
            "set-default-source",
            &format!("{}.monitor", self.mic_sink_name),
        ])
        .await?;
        Self::pactl(&["set-default-sink", &self.mic_sink_name]).await?;

        info!("Host audio environment ready");
        Ok(())
    }
}

/// Build the environment the config asks for.
pub fn environment_from_config(config: &AudioConfig) -> Box<dyn HostEnvironment> {
    if config.enabled {
        Box::new(PulseAudioEnvironment::new(config))
    } else {
        Box::new(NullEnvironment)
    }
}

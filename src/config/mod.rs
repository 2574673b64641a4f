use crate::global;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub bot: BotConfig,
    pub browser: BrowserConfig,
    pub audio: AudioConfig,
    pub summarizer: SummarizerConfig,
    pub api: ApiConfig,
}

/// Tunables for the join state machine and the transcript pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    /// Name shown to other participants when the bot is asked to identify itself.
    pub display_name: String,
    /// Minimum seconds between two emitted statements from the same speaker.
    pub dedup_gap_seconds: i64,
    /// Seconds between caption reads while capturing.
    pub caption_poll_seconds: u64,
    /// Timeout for a single join step (open link, click join, ...).
    pub step_timeout_seconds: u64,
    /// Attempts per join step before the session fails.
    pub step_retries: u32,
    /// How long to wait for the host to admit the bot.
    pub admission_window_seconds: u64,
    /// Seconds between admission checks while waiting.
    pub admission_poll_seconds: u64,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            display_name: "Meetscribe Notetaker".to_string(),
            dedup_gap_seconds: 10,
            caption_poll_seconds: 2,
            step_timeout_seconds: 10,
            step_retries: 3,
            admission_window_seconds: 300,
            admission_poll_seconds: 2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// WebDriver endpoint (chromedriver).
    pub webdriver_url: String,
    pub headless: bool,
    pub window_size: String,
    /// Extra Chrome switches appended to the defaults.
    pub extra_args: Vec<String>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            webdriver_url: "http://127.0.0.1:9515".to_string(),
            headless: true,
            window_size: "1920,1080".to_string(),
            extra_args: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Provision PulseAudio null sinks and record the meeting audio.
    pub enabled: bool,
    /// Name of the virtual sink meeting audio is routed to.
    pub sink_name: String,
    /// Name of the virtual microphone sink.
    pub mic_sink_name: String,
    /// Seconds to wait for the recorder to flush before killing it.
    pub recorder_grace_seconds: u64,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            sink_name: "DummyOutput".to_string(),
            mic_sink_name: "MicOutput".to_string(),
            recorder_grace_seconds: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SummarizerConfig {
    /// OpenAI-compatible chat completions endpoint.
    pub api_endpoint: Option<String>,
    /// API key. Summarization is skipped when unset.
    pub api_key: Option<String>,
    pub model: String,
    /// Extra instructions appended to the system prompt.
    pub extra_prompt: String,
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            api_endpoint: None,
            api_key: None,
            model: "gpt-4o".to_string(),
            extra_prompt: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8787,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        if !config_path.exists() {
            info!(
                "Config file not found, creating default at {:?}",
                config_path
            );
            let config = Self::default();
            config.save()?;
            return Ok(config);
        }

        let content =
            std::fs::read_to_string(&config_path).context("Failed to read config file")?;

        let config: Self = toml::from_str(&content).context("Failed to parse config file")?;

        info!("Loaded config from {:?}", config_path);
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(&config_path, content).context("Failed to write config file")?;

        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        global::config_file()
    }
}

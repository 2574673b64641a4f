//! Meeting summarization collaborator.
//!
//! The cleaned transcript is flattened to text and handed to an
//! OpenAI-compatible chat completions endpoint; the model returns a summary
//! plus action items. This is an opaque external call: no retries, no
//! partial-failure handling — a failed summary is logged by the caller and
//! the transcript still stands on its own.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::SummarizerConfig;

const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";

const SYSTEM_PROMPT: &str = "Extract a detailed summary and action items from the transcript, \
    do not add things from your end, just observe the transcript to generate summary and next \
    steps. Respond with a JSON object: {\"summary\": string, \"action_items\": [string]}.";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MeetingSummary {
    pub summary: String,
    pub action_items: Vec<String>,
}

#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, transcript: &str) -> Result<MeetingSummary>;
}

/// Summarizer used when no API key is configured: passes nothing to any
/// external service and reports an empty summary.
pub struct NoopSummarizer;

#[async_trait]
impl Summarizer for NoopSummarizer {
    async fn summarize(&self, _transcript: &str) -> Result<MeetingSummary> {
        Ok(MeetingSummary::default())
    }
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    response_format: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: String,
}

pub struct OpenAiSummarizer {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    extra_prompt: String,
}

impl OpenAiSummarizer {
    pub fn new(config: &SummarizerConfig, api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: config
                .api_endpoint
                .clone()
                .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
            api_key,
            model: config.model.clone(),
            extra_prompt: config.extra_prompt.clone(),
        }
    }
}

#[async_trait]
impl Summarizer for OpenAiSummarizer {
    async fn summarize(&self, transcript: &str) -> Result<MeetingSummary> {
        debug!(
            "Summarizing {} chars of transcript with {}",
            transcript.len(),
            self.model
        );

        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: format!("{}{}", SYSTEM_PROMPT, self.extra_prompt),
                },
                ChatMessage {
                    role: "user",
                    content: transcript.to_string(),
                },
            ],
            response_format: serde_json::json!({ "type": "json_object" }),
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .context("Failed to call summarizer API")?;

        let status = response.status();
        let body = response
            .text()
            .await
            .context("Failed to read summarizer response")?;

        if !status.is_success() {
            anyhow::bail!("Summarizer API returned {}: {}", status, body);
        }

        let parsed: ChatResponse =
            serde_json::from_str(&body).context("Failed to parse summarizer response")?;
        let content = parsed
            .choices
            .first()
            .map(|c| c.message.content.as_str())
            .context("Summarizer response contained no choices")?;

        let summary: MeetingSummary = serde_json::from_str(content)
            .context("Summarizer did not return the expected JSON object")?;

        info!(
            "Summary generated: {} chars, {} action items",
            summary.summary.len(),
            summary.action_items.len()
        );
        Ok(summary)
    }
}

/// Build the summarizer the config asks for; without an API key the
/// transcript is the only artifact.
pub fn summarizer_from_config(config: &SummarizerConfig) -> Box<dyn Summarizer> {
    match &config.api_key {
        Some(key) if !key.is_empty() => Box::new(OpenAiSummarizer::new(config, key.clone())),
        _ => Box::new(NoopSummarizer),
    }
}

//! # Judge Module
//!
//! The LLM decision capability: given a posting's title, location and
//! description, decide whether it should be kept.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::error::{ JobsiftError, Result };
use crate::markdown::{ to_plain_text, truncate_chars };

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";

/// Decides whether a posting is worth keeping.
#[async_trait]
pub trait JobJudge: Send + Sync {
    async fn decide(&self, title: &str, location: &str, description: &str) -> Result<bool>;
}

#[derive(Debug, Deserialize)]
struct KeepJob {
    keep_job: bool,
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// [`JobJudge`] backed by the OpenAI chat completions API with structured output.
pub struct OpenAiJudge {
    client: Client,
    api_key: String,
    prompt: String,
    model: String,
    base_url: String,
    max_description_chars: usize,
}

impl OpenAiJudge {
    /// Creates a judge with the default model and endpoint.
    ///
    /// # Arguments
    ///
    /// * `api_key` - Bearer token for the API.
    /// * `prompt` - User criteria appended to the system message.
    /// * `timeout` - Per-request timeout in seconds.
    pub fn new(api_key: impl Into<String>, prompt: impl Into<String>, timeout: u64) -> Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(timeout)).build()?;

        Ok(OpenAiJudge {
            client,
            api_key: api_key.into(),
            prompt: prompt.into(),
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            max_description_chars: 8_000,
        })
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_max_description_chars(mut self, max: usize) -> Self {
        self.max_description_chars = max;
        self
    }

    fn system_message(&self) -> String {
        format!(
            "You are a job filtering assistant. {} Answer keep_job = true if the job should be kept, false if it should be filtered out.",
            self.prompt.trim()
        )
    }

    fn job_info(&self, title: &str, location: &str, description: &str) -> String {
        let description = to_plain_text(description);
        format!(
            "Job Title: {}\nLocation: {}\nDescription: {}\n",
            title,
            location,
            truncate_chars(&description, self.max_description_chars)
        )
    }
}

#[async_trait]
impl JobJudge for OpenAiJudge {
    async fn decide(&self, title: &str, location: &str, description: &str) -> Result<bool> {
        let body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": self.system_message() },
                { "role": "user", "content": self.job_info(title, location, description) }
            ],
            "response_format": {
                "type": "json_schema",
                "json_schema": {
                    "name": "job_filter_response",
                    "strict": true,
                    "schema": {
                        "type": "object",
                        "properties": { "keep_job": { "type": "boolean" } },
                        "required": ["keep_job"],
                        "additionalProperties": false
                    }
                }
            }
        });

        let response = self.client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send().await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(JobsiftError::Llm(format!("{}: {}", status, text)));
        }

        let completion: ChatCompletion = response.json().await?;
        let content = completion.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| JobsiftError::Llm("response has no message content".into()))?;

        let decision: KeepJob = serde_json::from_str(&content)
            .map_err(|e| JobsiftError::Llm(format!("unparsable decision {:?}: {}", content, e)))?;

        debug!(title, keep = decision.keep_job, "LLM decision");
        Ok(decision.keep_job)
    }
}

//! Hosted chat-completion backend (OpenAI-compatible `/chat/completions`).

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

use crate::backend::Generate;
use crate::report::prompt::Prompt;
use crate::utils::{BackendError, BackendKind};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
const TEMPERATURE: f32 = 0.2;

pub struct HostedChat {
    client: reqwest::blocking::Client,
    endpoint: String,
    api_key: Option<String>,
    model: String,
    timeout: Duration,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

impl HostedChat {
    pub fn new(
        base_url: &str,
        api_key: Option<String>,
        model: &str,
        timeout: Duration,
    ) -> Result<Self, BackendError> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("agentops/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| unavailable(format!("HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            api_key,
            model: model.to_string(),
            timeout,
        })
    }

    fn classify(&self, err: reqwest::Error) -> BackendError {
        if err.is_timeout() {
            BackendError::Timeout { backend: BackendKind::Hosted, after: self.timeout }
        } else {
            unavailable(err.to_string())
        }
    }
}

impl Generate for HostedChat {
    fn kind(&self) -> BackendKind {
        BackendKind::Hosted
    }

    fn generate(&self, prompt: &Prompt) -> Result<String, BackendError> {
        let body = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage { role: "system", content: prompt.system_instruction() },
                ChatMessage { role: "user", content: prompt.text() },
            ],
            temperature: TEMPERATURE,
        };

        info!(
            model = %self.model,
            prompt_chars = prompt.text().len(),
            "requesting chat completion"
        );
        let mut req = self.client.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }

        let resp = req.send().map_err(|e| self.classify(e))?;
        let status = resp.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(unavailable(format!("authentication rejected (HTTP {})", status.as_u16())));
        }
        if !status.is_success() {
            let detail = resp.text().unwrap_or_default();
            return Err(unavailable(format!("HTTP {}: {}", status.as_u16(), detail.trim())));
        }

        let parsed: ChatResponse = resp.json().map_err(|e| self.classify(e))?;
        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| unavailable("response carried no completion".to_string()))?;

        debug!(chars = text.len(), "chat completion received");
        Ok(text)
    }
}

fn unavailable(reason: String) -> BackendError {
    BackendError::Unavailable { backend: BackendKind::Hosted, reason }
}

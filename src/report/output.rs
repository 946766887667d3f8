//! 输出层：报告送达 stdout 和可选的 webhook
//! 送达失败只记日志，不影响退出码。

use serde::Serialize;
use std::io::Write;
use std::time::Duration;
use tracing::info;

use crate::utils::{DeliveryError, Report};

/// Webhook payload limit, in characters.
pub const WEBHOOK_TEXT_LIMIT: usize = 39_000;

pub trait Deliver {
    fn name(&self) -> &'static str;
    fn deliver(&self, report: &Report) -> Result<(), DeliveryError>;
}

pub enum Sink {
    Stdout(StdoutSink),
    Webhook(WebhookSink),
}

impl Deliver for Sink {
    fn name(&self) -> &'static str {
        match self {
            Sink::Stdout(s) => s.name(),
            Sink::Webhook(s) => s.name(),
        }
    }

    fn deliver(&self, report: &Report) -> Result<(), DeliveryError> {
        match self {
            Sink::Stdout(s) => s.deliver(report),
            Sink::Webhook(s) => s.deliver(report),
        }
    }
}

// ── Stdout ──────────────────────────────────────────────────────────────────

pub struct StdoutSink {
    title: String,
}

impl StdoutSink {
    pub fn new(title: &str) -> Self {
        Self { title: title.to_string() }
    }

    pub fn render(&self, report: &Report) -> String {
        format!("\n=== {} ===\n\n{}\n", self.title, report.body)
    }
}

impl Deliver for StdoutSink {
    fn name(&self) -> &'static str {
        "stdout"
    }

    fn deliver(&self, report: &Report) -> Result<(), DeliveryError> {
        let mut out = std::io::stdout().lock();
        out.write_all(self.render(report).as_bytes())?;
        out.flush()?;
        Ok(())
    }
}

// ── Webhook ─────────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct WebhookMessage<'a> {
    text: &'a str,
}

pub struct WebhookSink {
    url: String,
    heading: String,
    timeout: Duration,
}

impl WebhookSink {
    /// `heading` is prefixed to every message, e.g. `Agentic Monitor (web-01)`.
    pub fn new(url: &str, heading: &str, timeout: Duration) -> Self {
        Self { url: url.to_string(), heading: heading.to_string(), timeout }
    }

    pub fn message(&self, report: &Report) -> String {
        let full = format!("*{}*\n{}", self.heading, report.body);
        truncate_chars(&full, WEBHOOK_TEXT_LIMIT).to_string()
    }
}

impl Deliver for WebhookSink {
    fn name(&self) -> &'static str {
        "webhook"
    }

    fn deliver(&self, report: &Report) -> Result<(), DeliveryError> {
        let text = self.message(report);
        let client = reqwest::blocking::Client::builder().timeout(self.timeout).build()?;
        let resp = client.post(&self.url).json(&WebhookMessage { text: &text }).send()?;
        if !resp.status().is_success() {
            return Err(DeliveryError::Status(resp.status().as_u16()));
        }
        info!(chars = text.chars().count(), "webhook delivered");
        Ok(())
    }
}

/// Longest prefix of `s` holding at most `limit` characters.
pub fn truncate_chars(s: &str, limit: usize) -> &str {
    match s.char_indices().nth(limit) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

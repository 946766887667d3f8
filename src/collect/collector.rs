//! 有序采集步骤
//! 每个步骤独立求值，失败只记为 unavailable / timed_out，不会中断整个采集。

use chrono::Utc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::collect::runner::{self, CommandOutcome};
use crate::collect::Collect;
use crate::utils::{DiagnosticEntry, DiagnosticPayload, EntryStatus, Payload};

/// A call into an external client. `Ok(None)` or a blank value means
/// "nothing to report".
pub type ProbeFn = Box<dyn Fn() -> anyhow::Result<Option<String>>>;

pub enum Producer {
    Command { command: String, timeout: Duration },
    Probe(ProbeFn),
}

pub struct Step {
    pub name: String,
    pub producer: Producer,
}

impl Step {
    pub fn command(name: &str, command: &str, timeout: Duration) -> Self {
        Self {
            name: name.to_string(),
            producer: Producer::Command { command: command.to_string(), timeout },
        }
    }

    pub fn probe<F>(name: &str, probe: F) -> Self
    where
        F: Fn() -> anyhow::Result<Option<String>> + 'static,
    {
        Self { name: name.to_string(), producer: Producer::Probe(Box::new(probe)) }
    }
}

// ── 公开接口 ────────────────────────────────────────────────────────────────

/// Evaluates `steps` in order. The payload always holds exactly one entry
/// per step.
pub fn collect(steps: &[Step]) -> DiagnosticPayload {
    let collected_at = Utc::now();
    let entries = steps.iter().map(evaluate).collect();
    DiagnosticPayload { collected_at, entries }
}

/// Turns a probe outcome into an entry, applying the recoverable-failure
/// policy shared by every collector.
pub fn settle(name: &str, outcome: anyhow::Result<Option<String>>) -> DiagnosticEntry {
    let entry = match outcome {
        Ok(Some(value)) if !value.trim().is_empty() => DiagnosticEntry::ok(name, value.trim()),
        Ok(_) => DiagnosticEntry::unavailable(name, ""),
        Err(e) => DiagnosticEntry::unavailable(name, format!("{:#}", e)),
    };
    log_entry(&entry);
    entry
}

/// The step list for one host-diagnostics agent.
pub struct StepCollector {
    steps: Vec<Step>,
}

impl StepCollector {
    pub fn new(steps: Vec<Step>) -> Self {
        Self { steps }
    }
}

impl Collect for StepCollector {
    fn collect(&self) -> Payload {
        Payload::Diagnostics(collect(&self.steps))
    }
}

// ── 求值 ────────────────────────────────────────────────────────────────────

fn evaluate(step: &Step) -> DiagnosticEntry {
    debug!(step = %step.name, "collecting");
    match &step.producer {
        Producer::Command { command, timeout } => {
            let entry = match runner::run_shell(command, *timeout) {
                CommandOutcome::Output(text) => DiagnosticEntry::ok(&step.name, text),
                CommandOutcome::TimedOut(text) => DiagnosticEntry::timed_out(&step.name, text),
                CommandOutcome::Failed(text) => DiagnosticEntry::unavailable(&step.name, text),
            };
            log_entry(&entry);
            entry
        }
        Producer::Probe(probe) => settle(&step.name, probe()),
    }
}

fn log_entry(entry: &DiagnosticEntry) {
    if entry.status != EntryStatus::Ok {
        warn!(
            step = %entry.name,
            status = %entry.status,
            detail = %entry.value,
            "collector step degraded"
        );
    }
}

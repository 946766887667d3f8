//! 单次运行的报告流水线
//! INIT → COLLECTING → PROMPTING → GENERATING → DELIVERING → DONE
//! 只有生成阶段会失败（→ FAILED）；采集与送达的失败都在本阶段内消化。

use chrono::Utc;
use tracing::{error, info, warn};

use crate::backend::Generate;
use crate::collect::Collect;
use crate::report::output::Deliver;
use crate::report::prompt::{self, TemplateKind};
use crate::utils::{BackendError, EntryStatus, Payload, Report};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Init,
    Collecting,
    Prompting,
    Generating,
    Delivering,
    Done,
    Failed,
}

impl std::fmt::Display for PipelineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PipelineState::Init => "INIT",
            PipelineState::Collecting => "COLLECTING",
            PipelineState::Prompting => "PROMPTING",
            PipelineState::Generating => "GENERATING",
            PipelineState::Delivering => "DELIVERING",
            PipelineState::Done => "DONE",
            PipelineState::Failed => "FAILED",
        };
        write!(f, "{}", s)
    }
}

/// Per-sink delivery result, kept for the caller's inspection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryOutcome {
    pub sink: &'static str,
    pub error: Option<String>,
}

pub struct ReportPipeline<'a> {
    template: TemplateKind,
    collector: &'a dyn Collect,
    backend: &'a dyn Generate,
    sinks: Vec<&'a dyn Deliver>,
    state: PipelineState,
    deliveries: Vec<DeliveryOutcome>,
}

impl<'a> ReportPipeline<'a> {
    pub fn new(
        template: TemplateKind,
        collector: &'a dyn Collect,
        backend: &'a dyn Generate,
        sinks: Vec<&'a dyn Deliver>,
    ) -> Self {
        Self {
            template,
            collector,
            backend,
            sinks,
            state: PipelineState::Init,
            deliveries: Vec::new(),
        }
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn deliveries(&self) -> &[DeliveryOutcome] {
        &self.deliveries
    }

    /// Runs every stage once. A backend error leaves the pipeline in
    /// `Failed` without touching any sink.
    pub fn run(&mut self) -> Result<Report, BackendError> {
        self.transition(PipelineState::Collecting);
        let payload = self.collector.collect();
        log_payload(&payload);

        self.transition(PipelineState::Prompting);
        let prompt = prompt::build(&payload, self.template);

        self.transition(PipelineState::Generating);
        let body = match self.backend.generate(&prompt) {
            Ok(body) => body,
            Err(e) => {
                self.transition(PipelineState::Failed);
                error!(backend = %e.backend(), error = %e, "generation failed");
                return Err(e);
            }
        };
        let report = Report { body, generated_at: Utc::now(), backend_used: self.backend.kind() };

        self.transition(PipelineState::Delivering);
        for sink in &self.sinks {
            let error = match sink.deliver(&report) {
                Ok(()) => None,
                Err(e) => {
                    warn!(sink = sink.name(), error = %e, "delivery failed");
                    Some(e.to_string())
                }
            };
            self.deliveries.push(DeliveryOutcome { sink: sink.name(), error });
        }

        self.transition(PipelineState::Done);
        Ok(report)
    }

    fn transition(&mut self, next: PipelineState) {
        info!(from = %self.state, to = %next, "pipeline");
        self.state = next;
    }
}

fn log_payload(payload: &Payload) {
    let entries = match payload {
        Payload::Diagnostics(p) => &p.entries,
        Payload::Cost(p) => &p.steps,
    };
    let degraded = entries.iter().filter(|e| e.status != EntryStatus::Ok).count();
    info!(entries = entries.len(), degraded, "payload collected");
}

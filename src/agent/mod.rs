//! 三个 agent 的装配：采集步骤、模板、后端、输出目标

use tracing::info;

use crate::backend::{Backend, Generate};
use crate::collect::aws::AwsCli;
use crate::collect::collector::StepCollector;
use crate::collect::cost::CostCollector;
use crate::collect::identity::InstanceMetadata;
use crate::collect::{host, Collect};
use crate::config::Config;
use crate::report::output::{Deliver, Sink, StdoutSink, WebhookSink};
use crate::report::pipeline::ReportPipeline;
use crate::report::prompt::TemplateKind;
use crate::utils::{Report, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentKind {
    Cost,
    Monitor,
    Troubleshoot,
}

impl AgentKind {
    pub fn template(&self) -> TemplateKind {
        match self {
            AgentKind::Cost => TemplateKind::CostPlan,
            AgentKind::Monitor => TemplateKind::HealthSummary,
            AgentKind::Troubleshoot => TemplateKind::Troubleshoot,
        }
    }

    /// Stdout header.
    pub fn title(&self) -> &'static str {
        match self {
            AgentKind::Cost => "Agentic FinOps Plan",
            AgentKind::Monitor => "Agentic Monitoring Summary",
            AgentKind::Troubleshoot => "Agentic Troubleshooting Report",
        }
    }

    /// Webhook heading, before the hostname.
    pub fn notice(&self) -> &'static str {
        match self {
            AgentKind::Cost => "Agentic FinOps",
            AgentKind::Monitor => "Agentic Monitor",
            AgentKind::Troubleshoot => "Agentic Troubleshoot",
        }
    }
}

/// Stdout always; the webhook only when a destination is configured.
pub fn sinks_for(kind: AgentKind, config: &Config) -> Vec<Sink> {
    let mut sinks = vec![Sink::Stdout(StdoutSink::new(kind.title()))];
    if let Some(url) = &config.webhook_url {
        let heading = format!("{} ({})", kind.notice(), host::hostname());
        sinks.push(Sink::Webhook(WebhookSink::new(url, &heading, config.http_timeout)));
    }
    sinks
}

pub fn run_agent(kind: AgentKind, config: &Config) -> Result<Report> {
    info!(agent = ?kind, backend = %config.backend_kind, "starting run");

    let backend = Backend::from_config(config)?;
    let sinks = sinks_for(kind, config);

    match kind {
        AgentKind::Cost => {
            let api = AwsCli::new(&config.region, config.http_timeout);
            let identity = InstanceMetadata::default();
            let collector = CostCollector::new(&api, &identity, config.cost);
            run_with(kind, &collector, &backend, &sinks)
        }
        AgentKind::Monitor => {
            let collector = StepCollector::new(host::health_steps(config.command_timeout));
            run_with(kind, &collector, &backend, &sinks)
        }
        AgentKind::Troubleshoot => {
            let collector = StepCollector::new(host::troubleshoot_steps(config.command_timeout));
            run_with(kind, &collector, &backend, &sinks)
        }
    }
}

fn run_with(
    kind: AgentKind,
    collector: &dyn Collect,
    backend: &dyn Generate,
    sinks: &[Sink],
) -> Result<Report> {
    let sinks: Vec<&dyn Deliver> = sinks.iter().map(|s| s as &dyn Deliver).collect();
    let mut pipeline = ReportPipeline::new(kind.template(), collector, backend, sinks);
    Ok(pipeline.run()?)
}

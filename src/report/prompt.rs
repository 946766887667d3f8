//! Prompt 渲染
//! 纯函数：相同 payload + 模板必定得到相同文本，不读时钟、不含随机内容。

use chrono::SecondsFormat;

use crate::utils::{CostPayload, DiagnosticEntry, DiagnosticPayload, Payload};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateKind {
    CostPlan,
    HealthSummary,
    Troubleshoot,
}

impl TemplateKind {
    pub fn system_instruction(&self) -> &'static str {
        match self {
            TemplateKind::CostPlan => {
                "You are a FinOps + SRE cost optimizer. \
                 Provide concrete AWS actions with CLI examples. Keep it concise."
            }
            TemplateKind::HealthSummary => {
                "You are an SRE monitor bot. \
                 Output sections: Health Summary, Risks, Actions. Be concise."
            }
            TemplateKind::Troubleshoot => {
                "You are a Linux SRE agent. Produce a crisp report: Summary, Top Findings, \
                 Exact Commands, Optional AWS Actions. Keep steps numbered."
            }
        }
    }

    fn task(&self) -> &'static str {
        match self {
            TemplateKind::CostPlan => "Create a cost optimization plan from these inputs.",
            TemplateKind::HealthSummary => {
                "Summarize server health and flag risks. Then list concrete fixes."
            }
            TemplateKind::Troubleshoot => {
                "Analyze this EC2 Linux host, find likely root causes for errors or \
                 performance issues, and propose exact fixes."
            }
        }
    }

    pub fn sections(&self) -> &'static [&'static str] {
        match self {
            TemplateKind::CostPlan => &[
                "Quick summary (<=2 lines)",
                "Rightsizing/parking suggestions (instance types, schedules) with CLI examples",
                "Savings Plans or RI ideas (1yr/3yr) with rough guidance",
                "Storage/network tips if relevant",
                "Next steps checklist",
            ],
            TemplateKind::HealthSummary => &["Health Summary", "Risks", "Actions"],
            TemplateKind::Troubleshoot => &[
                "Summary (<=2 lines)",
                "Top 3 findings (short)",
                "Commands to run (copy/paste)",
                "If relevant: AWS actions (SG rules, EBS, ALB, etc.)",
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    kind: TemplateKind,
    text: String,
}

impl Prompt {
    pub fn kind(&self) -> TemplateKind {
        self.kind
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn system_instruction(&self) -> &'static str {
        self.kind.system_instruction()
    }
}

// ── 公开接口 ────────────────────────────────────────────────────────────────

pub fn build(payload: &Payload, kind: TemplateKind) -> Prompt {
    let mut lines = vec![kind.task().to_string(), String::new(), "Return sections:".to_string()];
    for (i, section) in kind.sections().iter().enumerate() {
        lines.push(format!("{}) {}", i + 1, section));
    }
    lines.push(String::new());
    lines.push("DATA:".to_string());

    match payload {
        Payload::Diagnostics(p) => render_diagnostics(p, &mut lines),
        Payload::Cost(p) => render_cost(p, &mut lines),
    }

    Prompt { kind, text: lines.join("\n") }
}

// ── 渲染 ────────────────────────────────────────────────────────────────────

fn render_diagnostics(p: &DiagnosticPayload, lines: &mut Vec<String>) {
    lines.push(format!(
        "Collected at: {}",
        p.collected_at.to_rfc3339_opts(SecondsFormat::Secs, true)
    ));
    for entry in &p.entries {
        lines.push(String::new());
        lines.push(format!("### {} [{}] ###", entry.name.to_uppercase(), entry.status));
        lines.push(value_or_placeholder(entry).to_string());
    }
}

fn render_cost(p: &CostPayload, lines: &mut Vec<String>) {
    lines.push(format!(
        "Collected at: {}",
        p.collected_at.to_rfc3339_opts(SecondsFormat::Secs, true)
    ));
    lines.push(format!(
        "Window: {} to {} ({} days)",
        p.window_start,
        p.window_end,
        p.window_days()
    ));
    lines.push(format!("InstanceId: {}", p.instance_id.as_deref().unwrap_or("unavailable")));
    lines.push(format!(
        "Avg CPU ({}d): {}",
        p.window_days(),
        p.cpu_utilization_avg
            .map(|v| format!("{:.2}%", v))
            .unwrap_or_else(|| "unavailable".to_string())
    ));

    lines.push(format!(
        "Top Service Costs ({} of {} samples, USD):",
        p.top_costs.len(),
        p.sample_count
    ));
    if p.top_costs.is_empty() {
        lines.push("  (none)".to_string());
    }
    for (i, s) in p.top_costs.iter().enumerate() {
        lines.push(format!("  {}. {} | {} | {}", i + 1, s.period_start, s.service_name, s.amount));
    }

    lines.push("Collection status:".to_string());
    for entry in &p.steps {
        let value = value_or_placeholder(entry);
        lines.push(format!("  - {} [{}] {}", entry.name, entry.status, value));
    }
}

fn value_or_placeholder(entry: &DiagnosticEntry) -> &str {
    if entry.value.is_empty() {
        "(no data)"
    } else {
        &entry.value
    }
}

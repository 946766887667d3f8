//! AWS 成本 / 指标查询
//! 来源：aws ce get-cost-and-usage, aws cloudwatch get-metric-statistics（--output json）

use anyhow::{bail, Context};
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde::Deserialize;
use std::process::Command;
use std::time::Duration;
use tracing::debug;

use crate::collect::cost::CloudApi;
use crate::collect::runner::{self, Execution};
use crate::utils::CostSample;

const CPU_PERIOD_SECS: &str = "3600";

pub struct AwsCli {
    program: String,
    region: String,
    timeout: Duration,
}

impl AwsCli {
    pub fn new(region: &str, timeout: Duration) -> Self {
        Self { program: "aws".to_string(), region: region.to_string(), timeout }
    }

    fn invoke(&self, args: &[&str]) -> anyhow::Result<String> {
        let mut cmd = Command::new(&self.program);
        cmd.args(args).args(["--region", &self.region, "--output", "json"]);
        debug!(args = ?args, region = %self.region, "aws cli");

        let exec = runner::execute(cmd, self.timeout)
            .with_context(|| format!("{} not runnable", self.program))?;
        match exec {
            Execution::Completed { stdout, exit_code: Some(0), .. } => Ok(stdout),
            Execution::Completed { stderr, exit_code, .. } => bail!(
                "{} {} exited with {:?}: {}",
                self.program,
                args.join(" "),
                exit_code,
                stderr.trim()
            ),
            Execution::TimedOut => bail!("{}", runner::timeout_sentinel(&args.join(" "))),
        }
    }
}

impl CloudApi for AwsCli {
    fn daily_cost_by_service(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> anyhow::Result<Vec<CostSample>> {
        let period = format!("Start={},End={}", start, end);
        let out = self.invoke(&[
            "ce",
            "get-cost-and-usage",
            "--time-period",
            &period,
            "--granularity",
            "DAILY",
            "--metrics",
            "UnblendedCost",
            "--group-by",
            "Type=DIMENSION,Key=SERVICE",
        ])?;
        parse_cost_and_usage(&out)
    }

    fn cpu_utilization(
        &self,
        instance_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> anyhow::Result<Vec<f64>> {
        let dimension = format!("Name=InstanceId,Value={}", instance_id);
        let start = start.to_rfc3339_opts(SecondsFormat::Secs, true);
        let end = end.to_rfc3339_opts(SecondsFormat::Secs, true);
        let out = self.invoke(&[
            "cloudwatch",
            "get-metric-statistics",
            "--namespace",
            "AWS/EC2",
            "--metric-name",
            "CPUUtilization",
            "--dimensions",
            &dimension,
            "--start-time",
            &start,
            "--end-time",
            &end,
            "--period",
            CPU_PERIOD_SECS,
            "--statistics",
            "Average",
        ])?;
        parse_metric_statistics(&out)
    }
}

// ── JSON 解析 ───────────────────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CostAndUsage {
    #[serde(default)]
    results_by_time: Vec<ResultByTime>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ResultByTime {
    time_period: TimePeriod,
    #[serde(default)]
    groups: Vec<Group>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct TimePeriod {
    start: NaiveDate,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Group {
    keys: Vec<String>,
    metrics: Metrics,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Metrics {
    unblended_cost: MetricValue,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct MetricValue {
    amount: String,
}

fn parse_cost_and_usage(json: &str) -> anyhow::Result<Vec<CostSample>> {
    let parsed: CostAndUsage = serde_json::from_str(json).context("cost-and-usage JSON")?;
    let mut samples = Vec::new();

    for day in parsed.results_by_time {
        for group in day.groups {
            let service = group.keys.into_iter().next().unwrap_or_default();
            let amount: f64 = group
                .metrics
                .unblended_cost
                .amount
                .parse()
                .with_context(|| format!("cost amount for {}", service))?;
            if !amount.is_finite() {
                bail!("cost amount for {} is not a finite number", service);
            }
            samples.push(CostSample::new(day.time_period.start, service, amount));
        }
    }

    Ok(samples)
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct MetricStatistics {
    #[serde(default)]
    datapoints: Vec<Datapoint>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Datapoint {
    average: Option<f64>,
}

fn parse_metric_statistics(json: &str) -> anyhow::Result<Vec<f64>> {
    let parsed: MetricStatistics = serde_json::from_str(json).context("metric statistics JSON")?;
    Ok(parsed.datapoints.into_iter().filter_map(|d| d.average).collect())
}

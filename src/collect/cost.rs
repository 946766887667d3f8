//! 成本采集
//! 来源：按天、按服务分组的成本明细 + 单实例 CPU 利用率均值

use chrono::{DateTime, Duration as ChronoDuration, NaiveDate, Utc};
use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::collect::collector::settle;
use crate::collect::Collect;
use crate::utils::{CostPayload, CostSample, DiagnosticEntry, EntryStatus, Payload};

pub const DEFAULT_WINDOW_DAYS: u32 = 7;
pub const DEFAULT_TOP_N: usize = 8;

/// Read-only cost and metrics collaborator.
pub trait CloudApi {
    /// Daily cost per service over `[start, end)`.
    fn daily_cost_by_service(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> anyhow::Result<Vec<CostSample>>;

    /// Hourly CPU utilization averages for one instance.
    fn cpu_utilization(
        &self,
        instance_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> anyhow::Result<Vec<f64>>;
}

/// Resolves which instance this process runs on, if any.
pub trait HostIdentity {
    fn instance_id(&self) -> anyhow::Result<Option<String>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CostRanking {
    /// Rank the per-day, per-service rows as they come.
    Flat,
    /// Sum each service across the window, then rank.
    ByService,
}

impl CostRanking {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "flat" => Some(CostRanking::Flat),
            "service" | "by_service" => Some(CostRanking::ByService),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CostSettings {
    pub window_days: u32,
    pub top_n: usize,
    pub ranking: CostRanking,
}

impl Default for CostSettings {
    fn default() -> Self {
        Self {
            window_days: DEFAULT_WINDOW_DAYS,
            top_n: DEFAULT_TOP_N,
            ranking: CostRanking::Flat,
        }
    }
}

pub struct CostCollector<'a> {
    api: &'a dyn CloudApi,
    identity: &'a dyn HostIdentity,
    settings: CostSettings,
}

impl<'a> CostCollector<'a> {
    pub fn new(
        api: &'a dyn CloudApi,
        identity: &'a dyn HostIdentity,
        settings: CostSettings,
    ) -> Self {
        Self { api, identity, settings }
    }

    pub fn collect_at(&self, now: DateTime<Utc>) -> CostPayload {
        let window = ChronoDuration::days(i64::from(self.settings.window_days));
        let window_end = now.date_naive();
        let window_start = window_end - window;

        let mut steps = Vec::with_capacity(3);

        // ── 实例身份 ──────────────────────────────────────────────────────
        let identity = settle("instance_id", self.identity.instance_id());
        let instance_id = (identity.status == EntryStatus::Ok).then(|| identity.value.clone());
        steps.push(identity);

        // ── CPU 均值 ──────────────────────────────────────────────────────
        let cpu_utilization_avg = match &instance_id {
            Some(id) => match self.api.cpu_utilization(id, now - window, now) {
                Ok(points) => {
                    let avg = mean(&points);
                    steps.push(settle(
                        "cpu_utilization_avg",
                        Ok(avg.map(|v| format!("{:.2} ({} points)", v, points.len()))),
                    ));
                    avg
                }
                Err(e) => {
                    steps.push(settle("cpu_utilization_avg", Err(e)));
                    None
                }
            },
            None => {
                steps.push(DiagnosticEntry::unavailable(
                    "cpu_utilization_avg",
                    "no instance identity",
                ));
                None
            }
        };

        // ── 成本明细 ──────────────────────────────────────────────────────
        let samples = match self.api.daily_cost_by_service(window_start, window_end) {
            Ok(samples) => {
                steps.push(settle("service_costs", Ok(Some(format!("{} samples", samples.len())))));
                samples
            }
            Err(e) => {
                steps.push(settle("service_costs", Err(e)));
                Vec::new()
            }
        };

        let ranked = match self.settings.ranking {
            CostRanking::Flat => top_costs(&samples, self.settings.top_n),
            CostRanking::ByService => {
                top_costs(&aggregate_by_service(&samples), self.settings.top_n)
            }
        };

        CostPayload {
            collected_at: now,
            window_start,
            window_end,
            instance_id,
            cpu_utilization_avg,
            top_costs: ranked,
            sample_count: samples.len(),
            steps,
        }
    }
}

impl Collect for CostCollector<'_> {
    fn collect(&self) -> Payload {
        Payload::Cost(self.collect_at(Utc::now()))
    }
}

// ── 排序与聚合 ──────────────────────────────────────────────────────────────

/// Highest `n` samples by amount, ties broken by service name. Stable, so
/// rows equal on both keys keep their input order.
pub fn top_costs(samples: &[CostSample], n: usize) -> Vec<CostSample> {
    let mut ranked = samples.to_vec();
    ranked.sort_by(rank_order);
    ranked.truncate(n);
    ranked
}

fn rank_order(a: &CostSample, b: &CostSample) -> Ordering {
    b.amount
        .total_cmp(&a.amount)
        .then_with(|| a.service_name.cmp(&b.service_name))
}

/// One row per service, summed over the window and dated at its earliest
/// period.
pub fn aggregate_by_service(samples: &[CostSample]) -> Vec<CostSample> {
    let mut by_service: BTreeMap<&str, (NaiveDate, f64)> = BTreeMap::new();
    for s in samples {
        let slot = by_service
            .entry(s.service_name.as_str())
            .or_insert((s.period_start, 0.0));
        slot.0 = slot.0.min(s.period_start);
        slot.1 += s.amount;
    }
    by_service
        .into_iter()
        .map(|(name, (start, amount))| CostSample::new(start, name, amount))
        .collect()
}

pub fn mean(points: &[f64]) -> Option<f64> {
    if points.is_empty() {
        return None;
    }
    Some(points.iter().sum::<f64>() / points.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use chrono::TimeZone;
    use std::cell::RefCell;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, d).expect("valid date")
    }

    fn sample(d: u32, svc: &str, amount: f64) -> CostSample {
        CostSample::new(day(d), svc, amount)
    }

    struct FakeApi {
        samples: anyhow::Result<Vec<CostSample>>,
        cpu: Vec<f64>,
        cpu_calls: RefCell<Vec<String>>,
    }

    impl FakeApi {
        fn with(samples: Vec<CostSample>, cpu: Vec<f64>) -> Self {
            Self { samples: Ok(samples), cpu, cpu_calls: RefCell::new(Vec::new()) }
        }
    }

    impl CloudApi for FakeApi {
        fn daily_cost_by_service(
            &self,
            _: NaiveDate,
            _: NaiveDate,
        ) -> anyhow::Result<Vec<CostSample>> {
            match &self.samples {
                Ok(s) => Ok(s.clone()),
                Err(e) => Err(anyhow!("{}", e)),
            }
        }

        fn cpu_utilization(
            &self,
            id: &str,
            _: DateTime<Utc>,
            _: DateTime<Utc>,
        ) -> anyhow::Result<Vec<f64>> {
            self.cpu_calls.borrow_mut().push(id.to_string());
            Ok(self.cpu.clone())
        }
    }

    struct FixedIdentity(Option<&'static str>);

    impl HostIdentity for FixedIdentity {
        fn instance_id(&self) -> anyhow::Result<Option<String>> {
            Ok(self.0.map(String::from))
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 16, 12, 0, 0).single().expect("valid time")
    }

    fn collect_default(api: &FakeApi, identity: &FixedIdentity) -> CostPayload {
        CostCollector::new(api, identity, CostSettings::default()).collect_at(now())
    }

    #[test]
    fn test_top_keeps_duplicate_services_in_flat_mode() {
        let samples =
            vec![sample(10, "EC2", 120.50), sample(10, "S3", 5.10), sample(11, "EC2", 80.00)];
        let top: Vec<_> = top_costs(&samples, 2)
            .into_iter()
            .map(|s| (s.service_name, s.amount))
            .collect();
        assert_eq!(top, vec![("EC2".to_string(), 120.50), ("EC2".to_string(), 80.00)]);
    }

    #[test]
    fn test_top_breaks_ties_by_service_name() {
        let samples =
            vec![sample(10, "S3", 10.0), sample(10, "EC2", 10.0), sample(10, "Lambda", 10.0)];
        let names: Vec<_> = top_costs(&samples, 3).into_iter().map(|s| s.service_name).collect();
        assert_eq!(names, vec!["EC2", "Lambda", "S3"]);
    }

    #[test]
    fn test_top_is_idempotent() {
        let samples = vec![
            sample(10, "EC2", 3.0),
            sample(11, "RDS", 9.0),
            sample(12, "S3", 1.0),
            sample(13, "EBS", 9.0),
            sample(14, "CloudWatch", 4.0),
        ];
        let once = top_costs(&samples, 3);
        assert_eq!(top_costs(&once, 3), once);
    }

    #[test]
    fn test_top_with_n_larger_than_input() {
        let samples = vec![sample(10, "EC2", 1.0)];
        assert_eq!(top_costs(&samples, 8).len(), 1);
        assert!(top_costs(&[], 8).is_empty());
    }

    #[test]
    fn test_aggregate_sums_across_days() {
        let samples =
            vec![sample(11, "EC2", 120.50), sample(10, "S3", 5.10), sample(10, "EC2", 80.00)];
        let agg = aggregate_by_service(&samples);
        assert_eq!(agg.len(), 2);
        assert_eq!(agg[0].service_name, "EC2");
        assert!((agg[0].amount - 200.50).abs() < 1e-9);
        assert_eq!(agg[0].period_start, day(10));
    }

    #[test]
    fn test_mean() {
        assert_eq!(mean(&[]), None);
        assert_eq!(mean(&[10.0, 20.0, 30.0]), Some(20.0));
    }

    #[test]
    fn test_collect_without_identity_skips_cpu() {
        let api = FakeApi::with(vec![sample(10, "EC2", 1.0)], vec![50.0]);
        let identity = FixedIdentity(None);
        let payload = collect_default(&api, &identity);

        assert_eq!(payload.instance_id, None);
        assert_eq!(payload.cpu_utilization_avg, None);
        assert!(api.cpu_calls.borrow().is_empty());
        assert_eq!(payload.steps.len(), 3);
        assert_eq!(payload.steps[1].status, EntryStatus::Unavailable);
        assert_eq!(payload.top_costs.len(), 1);
    }

    #[test]
    fn test_collect_with_identity_averages_cpu() {
        let api = FakeApi::with(vec![], vec![10.0, 30.0]);
        let identity = FixedIdentity(Some("i-0abc"));
        let payload = collect_default(&api, &identity);

        assert_eq!(payload.instance_id.as_deref(), Some("i-0abc"));
        assert_eq!(payload.cpu_utilization_avg, Some(20.0));
        assert_eq!(*api.cpu_calls.borrow(), vec!["i-0abc".to_string()]);
    }

    #[test]
    fn test_collect_with_zero_cpu_points_is_null() {
        let api = FakeApi::with(vec![], vec![]);
        let identity = FixedIdentity(Some("i-0abc"));
        let payload = collect_default(&api, &identity);
        assert_eq!(payload.cpu_utilization_avg, None);
        assert_eq!(payload.steps[1].status, EntryStatus::Unavailable);
    }

    #[test]
    fn test_cost_api_failure_is_recorded_not_raised() {
        let api = FakeApi {
            samples: Err(anyhow!("AccessDenied")),
            cpu: vec![],
            cpu_calls: RefCell::new(vec![]),
        };
        let identity = FixedIdentity(None);
        let payload = collect_default(&api, &identity);
        assert!(payload.top_costs.is_empty());
        assert_eq!(payload.steps[2].status, EntryStatus::Unavailable);
        assert!(payload.steps[2].value.contains("AccessDenied"));
    }

    #[test]
    fn test_window_is_trailing_days() {
        let api = FakeApi::with(vec![], vec![]);
        let identity = FixedIdentity(None);
        let payload = collect_default(&api, &identity);
        assert_eq!(payload.window_end, day(16));
        assert_eq!(payload.window_start, day(9));
        assert_eq!(payload.window_days(), 7);
    }

    #[test]
    fn test_ranking_by_service_merges_before_top() {
        let api = FakeApi::with(
            vec![sample(10, "S3", 100.0), sample(10, "EC2", 60.0), sample(11, "EC2", 60.0)],
            vec![],
        );
        let identity = FixedIdentity(None);
        let settings =
            CostSettings { ranking: CostRanking::ByService, top_n: 1, ..CostSettings::default() };
        let payload = CostCollector::new(&api, &identity, settings).collect_at(now());
        assert_eq!(payload.top_costs.len(), 1);
        assert_eq!(payload.top_costs[0].service_name, "EC2");
        assert_eq!(payload.sample_count, 3);
    }

    #[test]
    fn test_ranking_parse() {
        assert_eq!(CostRanking::parse("FLAT"), Some(CostRanking::Flat));
        assert_eq!(CostRanking::parse("service"), Some(CostRanking::ByService));
        assert_eq!(CostRanking::parse("bogus"), None);
    }
}

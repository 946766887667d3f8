//! Run configuration, resolved once from the environment at start-up.

use std::time::Duration;
use tracing::warn;

use crate::backend::{hosted, local};
use crate::collect::cost::{CostRanking, CostSettings, DEFAULT_TOP_N, DEFAULT_WINDOW_DAYS};
use crate::utils::BackendKind;

const DEFAULT_REGION: &str = "us-east-1";
const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 30;
const DEFAULT_BACKEND_TIMEOUT_SECS: u64 = 120;
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 15;

#[derive(Debug, Clone)]
pub struct Config {
    pub backend_kind: BackendKind,
    pub api_key: Option<String>,
    pub api_base_url: String,
    pub hosted_model: String,
    pub local_program: String,
    pub local_model: String,
    pub webhook_url: Option<String>,
    pub region: String,
    pub command_timeout: Duration,
    pub backend_timeout: Duration,
    pub http_timeout: Duration,
    pub cost: CostSettings,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from any key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let get_or = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());
        let secs = |key: &str, default: u64| Duration::from_secs(parse_or(key, get(key), default));

        let ranking = match get("AGENT_COST_RANKING") {
            None => CostRanking::Flat,
            Some(v) => CostRanking::parse(&v).unwrap_or_else(|| {
                warn!(key = "AGENT_COST_RANKING", value = %v, "unrecognised value, using flat");
                CostRanking::Flat
            }),
        };

        Config {
            backend_kind: BackendKind::parse(&get_or("AGENT_BACKEND", "openai")),
            api_key: get("OPENAI_API_KEY"),
            api_base_url: get_or("OPENAI_BASE_URL", hosted::DEFAULT_BASE_URL),
            hosted_model: get_or("AGENT_MODEL", hosted::DEFAULT_MODEL),
            local_program: get_or("OLLAMA_BIN", local::DEFAULT_PROGRAM),
            local_model: get_or("OLLAMA_MODEL", local::DEFAULT_MODEL),
            webhook_url: get("SLACK_WEBHOOK_URL"),
            region: get_or("AWS_REGION", DEFAULT_REGION),
            command_timeout: secs("AGENT_COMMAND_TIMEOUT_SECS", DEFAULT_COMMAND_TIMEOUT_SECS),
            backend_timeout: secs("AGENT_BACKEND_TIMEOUT_SECS", DEFAULT_BACKEND_TIMEOUT_SECS),
            http_timeout: secs("AGENT_HTTP_TIMEOUT_SECS", DEFAULT_HTTP_TIMEOUT_SECS),
            cost: CostSettings {
                window_days: parse_or(
                    "AGENT_COST_WINDOW_DAYS",
                    get("AGENT_COST_WINDOW_DAYS"),
                    DEFAULT_WINDOW_DAYS,
                ),
                top_n: parse_or("AGENT_COST_TOP_N", get("AGENT_COST_TOP_N"), DEFAULT_TOP_N),
                ranking,
            },
        }
    }
}

/// Positive integer or the default; zero and garbage both fall back.
fn parse_or<T>(key: &str, raw: Option<String>, default: T) -> T
where
    T: std::str::FromStr + PartialEq + Default,
{
    let Some(raw) = raw else { return default };
    match raw.parse::<T>() {
        Ok(v) if v != T::default() => v,
        _ => {
            warn!(key, value = %raw, "invalid setting, using default");
            default
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> Config {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let c = config(&[]);
        assert_eq!(c.backend_kind, BackendKind::Hosted);
        assert_eq!(c.api_key, None);
        assert_eq!(c.webhook_url, None);
        assert_eq!(c.region, "us-east-1");
        assert_eq!(c.hosted_model, "gpt-4o-mini");
        assert_eq!(c.local_model, "llama2");
        assert_eq!(c.command_timeout, Duration::from_secs(30));
        assert_eq!(c.cost.window_days, 7);
        assert_eq!(c.cost.top_n, 8);
        assert_eq!(c.cost.ranking, CostRanking::Flat);
    }

    #[test]
    fn test_backend_selection_is_case_insensitive() {
        assert_eq!(config(&[("AGENT_BACKEND", "Ollama")]).backend_kind, BackendKind::Local);
        assert_eq!(config(&[("AGENT_BACKEND", "OPENAI")]).backend_kind, BackendKind::Hosted);
    }

    #[test]
    fn test_only_ollama_selects_local() {
        for value in ["local", "llama", "anthropic", "ollama2"] {
            let kind = config(&[("AGENT_BACKEND", value)]).backend_kind;
            assert_eq!(kind, BackendKind::Hosted, "{}", value);
        }
        assert_eq!(config(&[("AGENT_BACKEND", " ollama ")]).backend_kind, BackendKind::Local);
    }

    #[test]
    fn test_blank_values_are_unset() {
        let c = config(&[("SLACK_WEBHOOK_URL", "   "), ("OPENAI_API_KEY", " sk-1 \n")]);
        assert_eq!(c.webhook_url, None);
        assert_eq!(c.api_key.as_deref(), Some("sk-1"));
    }

    #[test]
    fn test_invalid_numbers_fall_back() {
        let c = config(&[
            ("AGENT_COMMAND_TIMEOUT_SECS", "soon"),
            ("AGENT_COST_TOP_N", "0"),
            ("AGENT_COST_WINDOW_DAYS", "14"),
            ("AGENT_COST_RANKING", "service"),
        ]);
        assert_eq!(c.command_timeout, Duration::from_secs(30));
        assert_eq!(c.cost.top_n, 8);
        assert_eq!(c.cost.window_days, 14);
        assert_eq!(c.cost.ranking, CostRanking::ByService);
    }
}

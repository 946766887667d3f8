//! 实例身份探测（EC2 instance metadata）

use anyhow::Context;
use std::time::Duration;

use crate::collect::cost::HostIdentity;

pub const METADATA_ENDPOINT: &str = "http://169.254.169.254";
pub const METADATA_TIMEOUT: Duration = Duration::from_secs(1);

pub struct InstanceMetadata {
    endpoint: String,
    timeout: Duration,
}

impl InstanceMetadata {
    pub fn new(endpoint: &str, timeout: Duration) -> Self {
        Self { endpoint: endpoint.trim_end_matches('/').to_string(), timeout }
    }
}

impl Default for InstanceMetadata {
    fn default() -> Self {
        Self::new(METADATA_ENDPOINT, METADATA_TIMEOUT)
    }
}

impl HostIdentity for InstanceMetadata {
    /// `Ok(None)` when the service answers but has no identity for us;
    /// `Err` when it cannot be reached at all (not on EC2).
    fn instance_id(&self) -> anyhow::Result<Option<String>> {
        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()
            .context("metadata client")?;

        let url = format!("{}/latest/meta-data/instance-id", self.endpoint);
        let resp = client.get(&url).send().context("instance metadata unreachable")?;
        if !resp.status().is_success() {
            return Ok(None);
        }

        let id = resp.text().context("instance metadata body")?.trim().to_string();
        Ok((!id.is_empty()).then_some(id))
    }
}

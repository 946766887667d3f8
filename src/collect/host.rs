//! 宿主机诊断步骤
//! 来源：系统命令（uptime, df, free, systemctl, journalctl, dmesg ...）

use std::time::Duration;

use crate::collect::collector::Step;

/// Monitor agent: a short health snapshot.
pub fn health_steps(timeout: Duration) -> Vec<Step> {
    vec![
        Step::command("uptime", "uptime", timeout),
        Step::command("disk", "df -h", timeout),
        Step::command("mem", "free -m || true", timeout),
        Step::command("failed_units", "systemctl --failed || true", timeout),
        Step::command("hot_errors", "journalctl -p 3 -n 80 --no-pager || true", timeout),
    ]
}

/// Troubleshoot agent: a wider sweep including kernel and system logs.
pub fn troubleshoot_steps(timeout: Duration) -> Vec<Step> {
    vec![
        Step::command("uname", "uname -a", timeout),
        Step::command("uptime", "uptime", timeout),
        Step::command("top", "COLUMNS=200 top -b -n1 | head -n 25", timeout),
        Step::command("disk", "df -h", timeout),
        Step::command("mem", "free -m || true", timeout),
        Step::command("failed_units", "systemctl --failed || true", timeout),
        Step::command("ports", "ss -tulpen | head -n 30 || true", timeout),
        Step::command(
            "dmesg_warn",
            "dmesg --ctime --level=err,warn | tail -n 150 || true",
            timeout,
        ),
        Step::command("journal_crit", "journalctl -p 3 -n 200 --no-pager || true", timeout),
        Step::command(
            "syslog",
            "tail -n 200 /var/log/syslog || tail -n 200 /var/log/messages || true",
            timeout,
        ),
    ]
}

pub fn hostname() -> String {
    nix::unistd::gethostname()
        .ok()
        .and_then(|h| h.into_string().ok())
        .map(|h| h.trim().to_string())
        .filter(|h| !h.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

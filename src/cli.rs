use clap::{Parser, Subcommand};

use crate::agent::AgentKind;

#[derive(Parser)]
#[command(name = "agentops")]
#[command(version = concat!(env!("CARGO_PKG_VERSION"), " (built ", env!("BUILD_TIME"), ")"))]
#[command(
    about = "Collect host and cloud diagnostics, have an LLM interpret them, deliver the report",
    long_about = None
)]
#[command(after_help = "Configured through the environment: \
    AGENT_BACKEND, OPENAI_API_KEY, SLACK_WEBHOOK_URL, AWS_REGION")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Clone, Copy)]
pub enum Commands {
    /// Cost optimization plan from the last week of spend and CPU usage
    Cost,

    /// Host health summary with risks and actions
    Monitor,

    /// Root-cause analysis of host errors and performance issues
    Troubleshoot,
}

impl From<Commands> for AgentKind {
    fn from(cmd: Commands) -> Self {
        match cmd {
            Commands::Cost => AgentKind::Cost,
            Commands::Monitor => AgentKind::Monitor,
            Commands::Troubleshoot => AgentKind::Troubleshoot,
        }
    }
}

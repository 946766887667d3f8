use agentops::agent;
use agentops::cli::Cli;
use agentops::config::Config;
use agentops::utils;
use clap::Parser;

fn main() {
    let cli = Cli::parse();
    utils::init_tracing();

    let config = Config::from_env();
    let result = agent::run_agent(cli.command.into(), &config);

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

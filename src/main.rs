// ABOUTME: Entry point for the scpu CLI application.
// ABOUTME: Parses arguments, runs the session and exits with its status.

mod cli;

use clap::Parser;
use cli::Cli;
use scpu::agent::SystemAgent;
use scpu::runner::Runner;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let config = Cli::parse().into_config();
    let verbose = config.verbose;

    // Logs go to stderr; stdout carries the remote session.
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let agent = Arc::new(SystemAgent::new(config.password_helper.clone()));

    let result = match Runner::new(config, agent) {
        Ok(runner) => runner.run().await,
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        if verbose || !e.is_quiet_exit() {
            eprintln!("Error: {e}");
        }
        std::process::exit(e.exit_code());
    }
    // A pending stdin read would otherwise keep the runtime alive.
    std::process::exit(0);
}

//! metric-charts CLI main entry point

use anyhow::Result;
use clap::Parser;
use metric_charts_cli::commands::{Cli, CommandExecutor};

fn main() -> Result<()> {
    // Logs go to stderr so stdout stays a clean manifest stream
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut executor = CommandExecutor::new();
    let result = match executor.execute(cli.command) {
        Ok(result) => result,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            std::process::exit(1);
        }
    };

    // Exit with appropriate code
    if result.success {
        std::process::exit(0);
    } else {
        eprintln!("{}", result.message);
        std::process::exit(1);
    }
}

//! Orca Build CLI entry point.

use clap::Parser;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

use orca_cli::commands::{dispatch, Cli};
use orca_core::LogLevel;

fn main() {
    let cli = Cli::parse();

    // RUST_LOG wins over -v/-q
    let level = LogLevel::from_flags(cli.verbose, cli.quiet);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::default().add_directive(LevelFilter::from_level(level.into()).into())
    });
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if cli.log_json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    if let Err(e) = dispatch(cli) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

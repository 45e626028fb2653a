//! CLI definition and dispatch.

mod build;

use clap::Parser;

pub use build::{parse_build_args, BuildArgs};

/// Orca Build - build OCI images from Dockerfiles without a daemon.
#[derive(Parser)]
#[command(name = "orca-build", version, about)]
pub struct Cli {
    #[command(flatten)]
    pub build: BuildArgs,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long)]
    pub quiet: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub log_json: bool,
}

/// Run the parsed command line.
pub fn dispatch(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    build::execute(cli.build)
}

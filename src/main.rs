//! multikey command-line entry point

use clap::Parser;

use multikey::cli::{self, CliArgs};

fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();
    multikey::tracing::init(args.verbose);

    tracing::debug!("Starting with {:?}", args);
    if let Some(log) = multikey::config_paths::log_file() {
        tracing::debug!("Logging to {}", log.display());
    }

    let stdout = std::io::stdout();
    cli::run(&args, &mut stdout.lock())
}

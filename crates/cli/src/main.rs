//! Epoch Core CLI - Main entry point

use anyhow::Result;
use clap::Parser;
use epochcore_cli::utils::print_error;
use epochcore_cli::{run_cli, Cli, LogFormat};
use std::process;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        print_error(&format!("{:#}", e));
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    init_tracing(&cli)?;
    run_cli(cli)?;
    Ok(())
}

/// Initialize tracing with the configured format and verbosity
fn init_tracing(cli: &Cli) -> Result<()> {
    let filter = match (cli.quiet, cli.verbose) {
        (true, _) => "error",
        (_, 0) => "warn,epochcore=info",
        (_, 1) => "info,epochcore=debug",
        (_, 2) => "debug",
        _ => "trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    let registry = tracing_subscriber::registry().with(env_filter);
    match cli.log_format {
        LogFormat::Text => registry
            .with(fmt::layer().with_target(cli.verbose >= 2).with_writer(std::io::stderr))
            .try_init()?,
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init()?,
        LogFormat::Compact => registry
            .with(fmt::layer().compact().with_writer(std::io::stderr))
            .try_init()?,
    }

    Ok(())
}

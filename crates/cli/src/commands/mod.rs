//! CLI command definitions and handlers.
//!
//! This module defines all available CLI commands using clap's derive macros.
//! Each subcommand has its own module with implementation details.

pub mod genesis;
pub mod init;
pub mod inspect;
pub mod simulate;

use clap::{Parser, Subcommand};

use crate::utils::{CliResult, LogFormat, OutputFormat};

/// Epoch Core - epoch management for a DKG-gated BFT chain
#[derive(Parser, Debug)]
#[command(name = "epochcore")]
#[command(author = "Epoch Core Team")]
#[command(version)]
#[command(about = "Epoch management core tools", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Global output format for command results
    #[arg(global = true, long, value_enum, default_value = "text")]
    pub output: OutputFormat,

    /// Log line format
    #[arg(global = true, long, value_enum, default_value = "text")]
    pub log_format: LogFormat,

    /// Enable verbose logging
    #[arg(global = true, short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(global = true, short, long)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write a default configuration with a devnet genesis set
    Init(init::InitArgs),

    /// Bootstrap the runtime from a configuration and verify the active set
    Genesis(genesis::GenesisArgs),

    /// Drive blocks and epoch transitions at a fixed block time
    Simulate(simulate::SimulateArgs),

    /// Print the state held in a runtime snapshot
    Inspect(inspect::InspectArgs),
}

/// Execute the CLI with parsed arguments
pub fn run_cli(cli: Cli) -> CliResult<()> {
    match cli.command {
        Commands::Init(args) => init::execute(args, cli.output).map(drop),
        Commands::Genesis(args) => genesis::execute(args, cli.output).map(drop),
        Commands::Simulate(args) => simulate::execute(args, cli.output).map(drop),
        Commands::Inspect(args) => inspect::execute(args, cli.output).map(drop),
    }
}

//! Genesis verification command.
//!
//! Bootstraps the runtime from a configuration exactly as the chain would at
//! height zero and prints the resulting active set, including the consensus
//! account address derived from each validator's public key.

use clap::Parser;
use epochcore_consensus::genesis::build_runtime;
use epochcore_consensus::EpochRuntime;
use epochcore_types::consensus_account_address;
use serde::Serialize;
use std::path::PathBuf;

use crate::utils::{
    format_timestamp_micros, format_with_commas, load_config, print_info, print_json,
    print_success, truncate_hex, write_snapshot, CliResult, OutputFormat,
};

/// Arguments for the genesis command
#[derive(Parser, Debug)]
pub struct GenesisArgs {
    /// Configuration file
    #[arg(short, long, default_value = crate::DEFAULT_CONFIG_FILE)]
    pub config: String,

    /// Standalone genesis JSON replacing the config's genesis section
    #[arg(long)]
    pub genesis_json: Option<String>,

    /// Write the initialized runtime state to this snapshot file
    #[arg(long)]
    pub snapshot: Option<String>,
}

/// One validator of the genesis active set
#[derive(Debug, Clone, Serialize)]
pub struct GenesisValidatorSummary {
    /// Index in the active set
    pub index: u64,
    /// Stake pool address
    pub pool: String,
    /// Display name
    pub moniker: String,
    /// Voting power recorded at genesis
    pub voting_power: u128,
    /// SHA3-256 of the consensus public key
    pub consensus_account: String,
}

/// Verification summary printed by the genesis command
#[derive(Debug, Clone, Serialize)]
pub struct GenesisSummary {
    /// Chain ID
    pub chain_id: u64,
    /// Starting epoch (always 0)
    pub epoch: u64,
    /// Genesis time in microseconds
    pub genesis_time_us: u64,
    /// Total voting power of the active set
    pub total_voting_power: u128,
    /// Active set in index order
    pub validators: Vec<GenesisValidatorSummary>,
    /// Snapshot file, if one was written
    pub snapshot: Option<String>,
}

impl GenesisSummary {
    /// Summarize a freshly initialized runtime.
    pub fn from_runtime(runtime: &EpochRuntime) -> Self {
        let validators = runtime
            .get_active_validators()
            .into_iter()
            .map(|info| {
                let moniker = runtime
                    .validators()
                    .get_validator(&info.validator)
                    .map(|record| record.moniker.clone())
                    .unwrap_or_default();
                GenesisValidatorSummary {
                    index: info.validator_index,
                    pool: info.validator.to_string(),
                    moniker,
                    voting_power: info.voting_power,
                    consensus_account: consensus_account_address(&info.consensus_pubkey)
                        .to_string(),
                }
            })
            .collect();

        Self {
            chain_id: runtime.chain_id(),
            epoch: runtime.current_epoch(),
            genesis_time_us: runtime.now_microseconds(),
            total_voting_power: runtime.total_voting_power(),
            validators,
            snapshot: None,
        }
    }
}

/// Execute the genesis command
pub fn execute(args: GenesisArgs, output_format: OutputFormat) -> CliResult<GenesisSummary> {
    let config_path = PathBuf::from(&args.config);
    let genesis_path = args.genesis_json.as_ref().map(PathBuf::from);
    print_info(&format!("Loading configuration: {}", config_path.display()));

    let config = load_config(&config_path, genesis_path.as_deref())?;
    let runtime = build_runtime(&config)?;
    let mut summary = GenesisSummary::from_runtime(&runtime);

    if let Some(path) = &args.snapshot {
        write_snapshot(&PathBuf::from(path), &runtime.snapshot())?;
        summary.snapshot = Some(path.clone());
    }

    match output_format {
        OutputFormat::Json => print_json(&summary)?,
        OutputFormat::Text => print_summary(&summary),
    }

    Ok(summary)
}

fn print_summary(summary: &GenesisSummary) {
    print_success("Genesis verified");
    println!();
    println!("  Chain ID:           {}", summary.chain_id);
    println!("  Epoch:              {}", summary.epoch);
    println!(
        "  Genesis Time:       {}",
        format_timestamp_micros(summary.genesis_time_us)
    );
    println!(
        "  Total Voting Power: {}",
        format_with_commas(summary.total_voting_power)
    );
    println!();
    println!(
        "  {:<5} {:<44} {:<20} {:>24}  {}",
        "INDEX", "POOL", "MONIKER", "VOTING POWER", "CONSENSUS ACCOUNT"
    );
    for v in &summary.validators {
        println!(
            "  {:<5} {:<44} {:<20} {:>24}  {}",
            v.index,
            v.pool,
            v.moniker,
            format_with_commas(v.voting_power),
            truncate_hex(&v.consensus_account, 6)
        );
    }
    if let Some(ref path) = summary.snapshot {
        println!();
        println!("  Snapshot:           {}", path);
    }
}

//! Configuration initialization command.
//!
//! This module handles the `epochcore init` command, which writes a default
//! `epochcore.toml` with a deterministic devnet genesis set.

use clap::Parser;
use epochcore_config::{BootstrapAdmission, Config, GenesisConfig};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::utils::{print_info, print_json, print_success, CliError, CliResult, OutputFormat};

const MICROS_PER_SEC: u64 = 1_000_000;

/// Arguments for the init command
#[derive(Parser, Debug)]
pub struct InitArgs {
    /// Path of the configuration file to write
    #[arg(short, long, default_value = crate::DEFAULT_CONFIG_FILE)]
    pub config: String,

    /// Chain ID for the network
    #[arg(long, default_value = "1")]
    pub chain_id: u64,

    /// Number of genesis validators
    #[arg(long, default_value = "4")]
    pub validators: usize,

    /// Stake of each genesis validator (defaults to the minimum bond)
    #[arg(long)]
    pub stake: Option<u128>,

    /// Epoch interval in seconds (defaults to two hours)
    #[arg(long)]
    pub epoch_interval_secs: Option<u64>,

    /// Admission policy when the prior total voting power is zero
    #[arg(long, value_enum)]
    pub bootstrap_admission: Option<AdmissionArg>,

    /// Also write the genesis set as a standalone JSON file
    #[arg(long)]
    pub genesis_json: Option<String>,

    /// Overwrite existing files
    #[arg(long)]
    pub force: bool,
}

/// Command-line spelling of [`BootstrapAdmission`]
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum AdmissionArg {
    /// Lift the cap from a zero base
    Unbounded,
    /// Apply the cap literally
    Strict,
}

impl From<AdmissionArg> for BootstrapAdmission {
    fn from(arg: AdmissionArg) -> Self {
        match arg {
            AdmissionArg::Unbounded => BootstrapAdmission::Unbounded,
            AdmissionArg::Strict => BootstrapAdmission::Strict,
        }
    }
}

/// Result of the init command
#[derive(Debug, Serialize)]
pub struct InitResult {
    /// Written configuration file
    pub config_file: String,
    /// Written genesis JSON, if requested
    pub genesis_file: Option<String>,
    /// Chain ID
    pub chain_id: u64,
    /// Number of genesis validators
    pub validators: usize,
    /// Epoch interval in microseconds
    pub epoch_interval_micros: u64,
}

/// Execute the init command
pub fn execute(args: InitArgs, output_format: OutputFormat) -> CliResult<InitResult> {
    let config_path = PathBuf::from(&args.config);
    print_info(&format!(
        "Writing configuration to: {}",
        config_path.display()
    ));

    ensure_writable(&config_path, args.force)?;
    let genesis_path = args.genesis_json.as_ref().map(PathBuf::from);
    if let Some(path) = &genesis_path {
        ensure_writable(path, args.force)?;
    }

    let config = build_config(&args)?;
    if let Some(parent) = config_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)?;
            tracing::debug!("Created directory: {}", parent.display());
        }
    }
    config.save(&config_path)?;

    if let Some(path) = &genesis_path {
        config.genesis.save_json(path)?;
        print_info(&format!("Wrote genesis: {}", path.display()));
    }

    let result = InitResult {
        config_file: config_path.to_string_lossy().to_string(),
        genesis_file: genesis_path.map(|p| p.to_string_lossy().to_string()),
        chain_id: config.chain.chain_id,
        validators: config.genesis.validators.len(),
        epoch_interval_micros: config.epoch.epoch_interval_micros,
    };

    match output_format {
        OutputFormat::Json => print_json(&result)?,
        OutputFormat::Text => {
            print_success("Configuration initialized");
            println!();
            println!("  Config File:    {}", result.config_file);
            if let Some(ref genesis) = result.genesis_file {
                println!("  Genesis File:   {}", genesis);
            }
            println!("  Chain ID:       {}", result.chain_id);
            println!("  Validators:     {}", result.validators);
            println!(
                "  Epoch Interval: {}",
                crate::utils::format_micros(result.epoch_interval_micros)
            );
            println!();
            println!("Next steps:");
            println!(
                "  1. Verify genesis:  epochcore genesis --config {}",
                result.config_file
            );
            println!(
                "  2. Run blocks:      epochcore simulate --config {} --blocks 100",
                result.config_file
            );
        }
    }

    Ok(result)
}

/// Build the configuration described by `args` and validate it.
pub fn build_config(args: &InitArgs) -> CliResult<Config> {
    if args.validators == 0 {
        return Err(CliError::InvalidArgument(
            "at least one genesis validator is required".to_string(),
        ));
    }

    let mut config = Config::default();
    config.chain.chain_id = args.chain_id;
    if let Some(secs) = args.epoch_interval_secs {
        config.epoch.epoch_interval_micros = secs.saturating_mul(MICROS_PER_SEC);
    }
    if let Some(policy) = args.bootstrap_admission {
        config.validator.bootstrap_admission = policy.into();
    }
    config.validator.max_validator_set_size = config
        .validator
        .max_validator_set_size
        .max(args.validators as u64);

    let stake = args.stake.unwrap_or(config.validator.minimum_bond);
    config.genesis = GenesisConfig::devnet(args.validators, stake);

    config.validate()?;
    Ok(config)
}

fn ensure_writable(path: &Path, force: bool) -> CliResult<()> {
    if path.exists() && !force {
        return Err(CliError::AlreadyExists(path.display().to_string()));
    }
    Ok(())
}

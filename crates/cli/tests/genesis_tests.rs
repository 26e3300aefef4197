//! Tests for commands/genesis.rs and commands/inspect.rs

use epochcore_cli::commands::genesis::{self, GenesisArgs};
use epochcore_cli::commands::init::{self, InitArgs};
use epochcore_cli::commands::inspect::{self, InspectArgs};
use epochcore_cli::utils::{read_snapshot, CliError, OutputFormat};
use epochcore_config::{Config, GenesisConfig};
use epochcore_types::{consensus_account_address, BLS_PUBKEY_LENGTH};
use std::path::Path;
use tempfile::tempdir;

fn write_config(dir: &Path, validators: usize) -> String {
    let path = dir.join("epochcore.toml");
    init::execute(
        InitArgs {
            config: path.to_string_lossy().to_string(),
            chain_id: 7,
            validators,
            stake: None,
            epoch_interval_secs: Some(10),
            bootstrap_admission: None,
            genesis_json: None,
            force: false,
        },
        OutputFormat::Json,
    )
    .unwrap();
    path.to_string_lossy().to_string()
}

#[test]
fn test_genesis_summary() {
    let dir = tempdir().unwrap();
    let config = write_config(dir.path(), 3);

    let summary = genesis::execute(
        GenesisArgs {
            config: config.clone(),
            genesis_json: None,
            snapshot: None,
        },
        OutputFormat::Json,
    )
    .unwrap();

    let minimum_bond = Config::load(Path::new(&config))
        .unwrap()
        .validator
        .minimum_bond;
    assert_eq!(summary.chain_id, 7);
    assert_eq!(summary.epoch, 0);
    assert_eq!(summary.total_voting_power, 3 * minimum_bond);
    assert_eq!(summary.validators.len(), 3);
    for (i, v) in summary.validators.iter().enumerate() {
        let seed = i as u8 + 1;
        assert_eq!(v.index, i as u64);
        assert_eq!(v.moniker, format!("validator-{i}"));
        assert_eq!(v.voting_power, minimum_bond);
        assert_eq!(
            v.consensus_account,
            consensus_account_address(&vec![seed; BLS_PUBKEY_LENGTH]).to_string()
        );
    }
    assert!(summary.snapshot.is_none());
}

#[test]
fn test_genesis_snapshot_then_inspect() {
    let dir = tempdir().unwrap();
    let config = write_config(dir.path(), 2);
    let snapshot = dir.path().join("state").join("genesis.json");

    genesis::execute(
        GenesisArgs {
            config,
            genesis_json: None,
            snapshot: Some(snapshot.to_string_lossy().to_string()),
        },
        OutputFormat::Json,
    )
    .unwrap();

    let stored = read_snapshot(&snapshot).unwrap();
    assert_eq!(stored.chain_id, 7);
    assert!(stored.orchestrator.is_initialized());

    let report = inspect::execute(
        InspectArgs {
            snapshot: snapshot.to_string_lossy().to_string(),
            all: true,
        },
        OutputFormat::Json,
    )
    .unwrap();
    assert_eq!(report.epoch, 0);
    assert_eq!(report.active.len(), 2);
    assert_eq!(report.next_validator_set.len(), 2);
    assert!(report.active.iter().all(|v| v.status == "active"));
    assert_eq!(report.registered.as_ref().map(Vec::len), Some(2));
    assert!(!report.transition_in_progress);
    assert_eq!(report.remaining_time_us, 10_000_000);
    assert!(report.dkg_in_progress.is_none());
    assert!(report.dkg_last_completed.is_none());
    assert!(!report.staged_config_changes);
}

#[test]
fn test_genesis_from_json_override() {
    let dir = tempdir().unwrap();
    let config = write_config(dir.path(), 2);
    let genesis_path = dir.path().join("genesis.json");
    let minimum_bond = Config::default().validator.minimum_bond;
    GenesisConfig::devnet(5, minimum_bond)
        .save_json(&genesis_path)
        .unwrap();

    let summary = genesis::execute(
        GenesisArgs {
            config,
            genesis_json: Some(genesis_path.to_string_lossy().to_string()),
            snapshot: None,
        },
        OutputFormat::Json,
    )
    .unwrap();
    assert_eq!(summary.validators.len(), 5);
}

#[test]
fn test_genesis_rejects_invalid_config() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("epochcore.toml");
    let mut config = Config::default();
    config.genesis = GenesisConfig::devnet(1, config.validator.minimum_bond);
    config.genesis.validators[0].moniker = "x".repeat(64);
    std::fs::write(&path, config.to_toml_string().unwrap()).unwrap();

    let err = genesis::execute(
        GenesisArgs {
            config: path.to_string_lossy().to_string(),
            genesis_json: None,
            snapshot: None,
        },
        OutputFormat::Json,
    )
    .unwrap_err();
    assert!(matches!(err, CliError::Config(_)));
}

#[test]
fn test_inspect_missing_snapshot() {
    let dir = tempdir().unwrap();
    let err = inspect::execute(
        InspectArgs {
            snapshot: dir.path().join("none.json").to_string_lossy().to_string(),
            all: false,
        },
        OutputFormat::Text,
    )
    .unwrap_err();
    assert!(matches!(err, CliError::FileNotFound(_)));
}

//! Snapshot inspection command.

use clap::Parser;
use epochcore_consensus::{EpochPerformance, EpochRuntime};
use epochcore_types::{DkgSessionInfo, ValidatorConsensusInfo, ValidatorRecord};
use serde::Serialize;
use std::path::PathBuf;

use crate::utils::{
    format_micros, format_timestamp_micros, format_with_commas, print_json, read_snapshot,
    CliResult, OutputFormat,
};

/// Arguments for the inspect command
#[derive(Parser, Debug)]
pub struct InspectArgs {
    /// Snapshot file to read
    #[arg(default_value = crate::DEFAULT_SNAPSHOT_FILE)]
    pub snapshot: String,

    /// List every registered validator, not only the active set
    #[arg(long)]
    pub all: bool,
}

/// A validator as shown by `inspect`
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ValidatorView {
    /// Index in the set, if the validator holds one
    pub index: Option<u64>,
    /// Stake pool address
    pub pool: String,
    /// Display name
    pub moniker: String,
    /// Lifecycle status
    pub status: String,
    /// Voting power
    pub voting_power: u128,
}

/// Proposal counters of one active-set index for the current epoch
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ProposerView {
    /// Active-set index
    pub index: u64,
    /// Blocks proposed
    pub successful_proposals: u64,
    /// Rounds missed
    pub failed_proposals: u64,
    /// Share of opportunities that produced a block
    pub success_ratio: f64,
}

/// State summary read from a snapshot
#[derive(Debug, Clone, Serialize)]
pub struct InspectReport {
    /// Chain ID
    pub chain_id: u64,
    /// Current epoch
    pub epoch: u64,
    /// Global time in microseconds
    pub time_us: u64,
    /// Whether a transition is running
    pub transition_in_progress: bool,
    /// Age of the running transition
    pub transition_age_us: Option<u64>,
    /// Time until the next transition may start
    pub remaining_time_us: u64,
    /// Total voting power of the active set
    pub total_voting_power: u128,
    /// Active set in index order
    pub active: Vec<ValidatorView>,
    /// Validators waiting for promotion
    pub pending_active: Vec<String>,
    /// Validators leaving at the next pass
    pub pending_inactive: Vec<String>,
    /// Projected set after the next epoch pass
    pub next_validator_set: Vec<ValidatorView>,
    /// Every registered validator, when requested
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registered: Option<Vec<ValidatorView>>,
    /// Running DKG session
    pub dkg_in_progress: Option<DkgSessionInfo>,
    /// Last completed DKG session
    pub dkg_last_completed: Option<DkgSessionInfo>,
    /// Whether governance has staged config changes
    pub staged_config_changes: bool,
    /// Proposer counters for the current epoch
    pub proposers: Vec<ProposerView>,
    /// NIL blocks in the current epoch
    pub nil_blocks: u64,
    /// Summaries of recent finished epochs, oldest first
    pub performance_history: Vec<EpochPerformance>,
}

impl InspectReport {
    /// Summarize `runtime`.
    pub fn from_runtime(runtime: &EpochRuntime, all: bool) -> Self {
        let validators = runtime.validators();
        let configs = runtime.configs();
        let performance = runtime.performance();
        let view = |info: ValidatorConsensusInfo| {
            let record = validators.get_validator(&info.validator);
            ValidatorView {
                index: Some(info.validator_index),
                pool: info.validator.to_string(),
                moniker: record.map(|r| r.moniker.clone()).unwrap_or_default(),
                status: record.map(|r| r.status.to_string()).unwrap_or_default(),
                voting_power: info.voting_power,
            }
        };

        Self {
            chain_id: runtime.chain_id(),
            epoch: runtime.current_epoch(),
            time_us: runtime.now_microseconds(),
            transition_in_progress: runtime.is_transition_in_progress(),
            transition_age_us: runtime.transition_age(),
            remaining_time_us: runtime.remaining_time(),
            total_voting_power: runtime.total_voting_power(),
            active: runtime.get_active_validators().into_iter().map(view).collect(),
            pending_active: validators
                .pending_active()
                .iter()
                .map(ToString::to_string)
                .collect(),
            pending_inactive: validators
                .pending_inactive()
                .iter()
                .map(ToString::to_string)
                .collect(),
            next_validator_set: runtime.next_validator_set().into_iter().map(view).collect(),
            registered: all.then(|| validators.validators().map(record_view).collect()),
            dkg_in_progress: runtime.dkg().in_progress_session().cloned(),
            dkg_last_completed: runtime.dkg().last_completed_session().cloned(),
            staged_config_changes: configs.pending_epoch().is_some()
                || configs.pending_validator().is_some()
                || configs.pending_randomness().is_some(),
            proposers: performance
                .validators()
                .iter()
                .enumerate()
                .map(|(index, p)| ProposerView {
                    index: index as u64,
                    successful_proposals: p.successful_proposals,
                    failed_proposals: p.failed_proposals,
                    success_ratio: p.success_ratio(),
                })
                .collect(),
            nil_blocks: performance.nil_blocks(),
            performance_history: performance.history().to_vec(),
        }
    }
}

fn record_view(record: &ValidatorRecord) -> ValidatorView {
    ValidatorView {
        index: record.validator_index,
        pool: record.validator.to_string(),
        moniker: record.moniker.clone(),
        status: record.status.to_string(),
        voting_power: record.bond,
    }
}

/// Execute the inspect command
pub fn execute(args: InspectArgs, output_format: OutputFormat) -> CliResult<InspectReport> {
    let snapshot = read_snapshot(&PathBuf::from(&args.snapshot))?;
    let runtime = EpochRuntime::from_snapshot(snapshot);
    let report = InspectReport::from_runtime(&runtime, args.all);

    match output_format {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Text => print_report(&report),
    }

    Ok(report)
}

fn print_report(report: &InspectReport) {
    println!("Chain {}", report.chain_id);
    println!("  Epoch:              {}", report.epoch);
    println!(
        "  Time:               {}",
        format_timestamp_micros(report.time_us)
    );
    match report.transition_age_us {
        Some(age) => println!("  Transition:         running for {}", format_micros(age)),
        None => println!(
            "  Next Transition In: {}",
            format_micros(report.remaining_time_us)
        ),
    }
    println!(
        "  Total Voting Power: {}",
        format_with_commas(report.total_voting_power)
    );
    if report.staged_config_changes {
        println!("  Staged Configs:     yes");
    }

    print_validators("Active Set", &report.active);
    print_validators("Next Set", &report.next_validator_set);
    if let Some(ref registered) = report.registered {
        print_validators("Registered", registered);
    }

    if !report.pending_active.is_empty() {
        println!();
        println!("Pending Active:");
        for pool in &report.pending_active {
            println!("  {}", pool);
        }
    }
    if !report.pending_inactive.is_empty() {
        println!();
        println!("Pending Inactive:");
        for pool in &report.pending_inactive {
            println!("  {}", pool);
        }
    }

    println!();
    println!("Proposers (NIL blocks: {}):", report.nil_blocks);
    for p in &report.proposers {
        println!(
            "  {:<5} {:>8} proposed {:>8} missed {:>7.1}%",
            p.index,
            p.successful_proposals,
            p.failed_proposals,
            p.success_ratio * 100.0
        );
    }
    if !report.performance_history.is_empty() {
        println!();
        println!("Previous Epochs:");
        for epoch in &report.performance_history {
            println!(
                "  #{:<4} {} validators, {} proposed, {} missed, {} NIL",
                epoch.sequence,
                epoch.validators,
                epoch.successful_proposals,
                epoch.failed_proposals,
                epoch.nil_blocks
            );
        }
    }

    println!();
    println!("DKG:");
    print_session("In Progress", report.dkg_in_progress.as_ref());
    print_session("Last Completed", report.dkg_last_completed.as_ref());
}

fn print_validators(title: &str, validators: &[ValidatorView]) {
    println!();
    println!("{} ({}):", title, validators.len());
    for v in validators {
        let index = v
            .index
            .map(|i| i.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  {:<5} {:<44} {:<20} {:<16} {:>24}",
            index,
            v.pool,
            v.moniker,
            v.status,
            format_with_commas(v.voting_power)
        );
    }
}

fn print_session(label: &str, session: Option<&DkgSessionInfo>) {
    match session {
        Some(s) => println!(
            "  {:<15} dealer epoch {}, {} dealers, {} targets, {:?}, started {}",
            format!("{}:", label),
            s.dealer_epoch,
            s.dealer_count,
            s.target_count,
            s.config_variant,
            format_timestamp_micros(s.start_time_us)
        ),
        None => println!("  {:<15} none", format!("{}:", label)),
    }
}

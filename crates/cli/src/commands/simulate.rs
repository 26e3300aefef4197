//! Block simulation command.
//!
//! Drives the runtime the way a consensus engine would: one block prologue
//! per height at a fixed block time, with the DKG session of a started
//! transition completed on the following block. No ceremony runs; the
//! transcript is a deterministic digest of the chain ID and dealer epoch.

use alloy_primitives::Bytes;
use clap::Parser;
use epochcore_consensus::genesis::build_runtime;
use epochcore_consensus::EpochRuntime;
use epochcore_types::address::{GOVERNANCE_ADDR, SYSTEM_CALLER};
use epochcore_types::{Epoch, NIL_PROPOSER_INDEX};
use serde::Serialize;
use sha3::{Digest, Keccak256};
use std::path::PathBuf;
use tracing::{debug, info};

use crate::utils::{
    format_timestamp_micros, format_with_commas, load_config, print_info, print_json, print_success,
    print_warning, read_snapshot, write_snapshot, CliError, CliResult, OutputFormat,
};

/// Arguments for the simulate command
#[derive(Parser, Debug)]
pub struct SimulateArgs {
    /// Configuration file used to bootstrap genesis
    #[arg(short, long, default_value = crate::DEFAULT_CONFIG_FILE)]
    pub config: String,

    /// Resume from a snapshot instead of bootstrapping from the config
    #[arg(long, conflicts_with = "config")]
    pub from_snapshot: Option<String>,

    /// Number of blocks to run
    #[arg(short, long, default_value = "100")]
    pub blocks: u64,

    /// Block time in milliseconds
    #[arg(long, default_value = "1000")]
    pub block_time_ms: u64,

    /// Make every N-th block a NIL block
    #[arg(long)]
    pub nil_every: Option<u64>,

    /// End transitions through governance with an empty result
    #[arg(long)]
    pub governance_finish: bool,

    /// Write the final runtime state to this snapshot file
    #[arg(long)]
    pub snapshot: Option<String>,
}

/// Parameters of one simulation run
#[derive(Debug, Clone, Copy)]
pub struct SimulationPlan {
    /// Number of blocks to run
    pub blocks: u64,
    /// Block time in microseconds
    pub block_time_us: u64,
    /// Make every N-th block a NIL block
    pub nil_every: Option<u64>,
    /// End transitions through governance with an empty result
    pub governance_finish: bool,
}

/// One completed epoch transition
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TransitionRecord {
    /// Height whose prologue started the transition
    pub started_at_height: u64,
    /// Height before whose prologue the transition finished
    pub finished_at_height: u64,
    /// Epoch that was closed
    pub from_epoch: Epoch,
    /// Epoch that was entered
    pub to_epoch: Epoch,
    /// Time of the start in microseconds
    pub started_at_us: u64,
    /// Whether a transcript accompanied the completion
    pub with_transcript: bool,
    /// Active validators after the transition
    pub active_validators: usize,
    /// Total voting power after the transition
    pub total_voting_power: u128,
}

/// Outcome of a simulation run
#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    /// Chain ID
    pub chain_id: u64,
    /// Blocks run
    pub blocks: u64,
    /// NIL blocks among them
    pub nil_blocks: u64,
    /// Epoch before the first block
    pub start_epoch: Epoch,
    /// Epoch after the last block
    pub final_epoch: Epoch,
    /// Global time after the last block
    pub final_time_us: u64,
    /// Completed transitions in order
    pub transitions: Vec<TransitionRecord>,
    /// Whether a transition was still running at the end
    pub transition_in_progress: bool,
    /// Number of events emitted
    pub events: usize,
    /// Snapshot file, if one was written
    pub snapshot: Option<String>,
}

/// Execute the simulate command
pub fn execute(args: SimulateArgs, output_format: OutputFormat) -> CliResult<SimulationReport> {
    if args.block_time_ms == 0 {
        return Err(CliError::InvalidArgument(
            "block time must be positive".to_string(),
        ));
    }

    let mut runtime = match &args.from_snapshot {
        Some(path) => {
            print_info(&format!("Resuming from snapshot: {}", path));
            EpochRuntime::from_snapshot(read_snapshot(&PathBuf::from(path))?)
        }
        None => {
            print_info(&format!("Bootstrapping genesis from: {}", args.config));
            build_runtime(&load_config(&PathBuf::from(&args.config), None)?)?
        }
    };

    if args.governance_finish {
        print_warning("Transitions will be force-ended by governance without a transcript");
    }

    let plan = SimulationPlan {
        blocks: args.blocks,
        block_time_us: args.block_time_ms.saturating_mul(1_000),
        nil_every: args.nil_every,
        governance_finish: args.governance_finish,
    };
    let mut report = run(&mut runtime, &plan)?;

    if let Some(path) = &args.snapshot {
        write_snapshot(&PathBuf::from(path), &runtime.snapshot())?;
        report.snapshot = Some(path.clone());
    }

    match output_format {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Text => print_report(&report),
    }

    Ok(report)
}

/// Run `plan` against `runtime`.
///
/// Proposers rotate through the active set by height. A transition started
/// at height `h` is finished right before the prologue of `h + 1`. A
/// transition already running when the run begins is finished before the
/// first block.
pub fn run(runtime: &mut EpochRuntime, plan: &SimulationPlan) -> CliResult<SimulationReport> {
    let start_epoch = runtime.current_epoch();
    let mut transitions = Vec::new();
    let mut nil_blocks = 0;
    let mut events = 0;
    let mut started: Option<(u64, u64)> = runtime
        .orchestrator()
        .state()
        .transition_started_at_us
        .map(|at| (0, at));

    for height in 1..=plan.blocks {
        if let Some((started_at_height, started_at_us)) = started.take() {
            let from_epoch = runtime.current_epoch();
            finish(runtime, plan.governance_finish)?;
            let record = TransitionRecord {
                started_at_height,
                finished_at_height: height,
                from_epoch,
                to_epoch: runtime.current_epoch(),
                started_at_us,
                with_transcript: !plan.governance_finish,
                active_validators: runtime.validators().active_count(),
                total_voting_power: runtime.total_voting_power(),
            };
            info!(
                epoch = record.to_epoch,
                height,
                validators = record.active_validators,
                "Simulated transition finished"
            );
            transitions.push(record);
        }

        let nil = plan.nil_every.is_some_and(|n| n > 0 && height % n == 0);
        let (index, timestamp_us) = if nil {
            nil_blocks += 1;
            (NIL_PROPOSER_INDEX, runtime.now_microseconds())
        } else {
            let active = runtime.validators().active_count() as u64;
            if active == 0 {
                return Err(CliError::InvalidArgument(
                    "active validator set is empty; only NIL blocks are possible".to_string(),
                ));
            }
            (
                height % active,
                runtime.now_microseconds().saturating_add(plan.block_time_us),
            )
        };

        let outcome = runtime.on_block_start(SYSTEM_CALLER, index, Vec::new(), timestamp_us)?;
        debug!(height, proposer = %outcome.proposer, epoch = outcome.epoch, "Simulated block");
        if outcome.transition_started {
            started = Some((height, outcome.timestamp_us));
        }
        events += runtime.drain_events().len();
    }

    events += runtime.drain_events().len();
    Ok(SimulationReport {
        chain_id: runtime.chain_id(),
        blocks: plan.blocks,
        nil_blocks,
        start_epoch,
        final_epoch: runtime.current_epoch(),
        final_time_us: runtime.now_microseconds(),
        transitions,
        transition_in_progress: runtime.is_transition_in_progress(),
        events,
        snapshot: None,
    })
}

fn finish(runtime: &mut EpochRuntime, governance: bool) -> CliResult<()> {
    if governance {
        runtime.finish_transition(GOVERNANCE_ADDR, Bytes::new())?;
        return Ok(());
    }
    let dealer_epoch = runtime
        .dkg()
        .in_progress_session()
        .map(|session| session.dealer_epoch)
        .unwrap_or_else(|| runtime.current_epoch());
    let transcript = transcript_for(runtime.chain_id(), dealer_epoch);
    runtime.finish_transition(SYSTEM_CALLER, transcript)?;
    Ok(())
}

/// Deterministic stand-in transcript: `keccak256(chain_id || dealer_epoch)`.
pub fn transcript_for(chain_id: u64, dealer_epoch: Epoch) -> Bytes {
    let mut hasher = Keccak256::new();
    hasher.update(chain_id.to_be_bytes());
    hasher.update(dealer_epoch.to_be_bytes());
    Bytes::from(hasher.finalize().to_vec())
}

fn print_report(report: &SimulationReport) {
    print_success(&format!(
        "Simulated {} blocks ({} NIL)",
        report.blocks, report.nil_blocks
    ));
    println!();
    println!("  Chain ID:       {}", report.chain_id);
    println!(
        "  Epochs:         {} -> {}",
        report.start_epoch, report.final_epoch
    );
    println!(
        "  Final Time:     {}",
        format_timestamp_micros(report.final_time_us)
    );
    println!("  Events:         {}", report.events);
    if report.transition_in_progress {
        println!("  Transition:     in progress");
    }

    if report.transitions.is_empty() {
        return;
    }
    println!();
    println!(
        "  {:<7} {:<12} {:<12} {:<11} {:>10}  {}",
        "EPOCH", "STARTED", "FINISHED", "TRANSCRIPT", "VALIDATORS", "VOTING POWER"
    );
    for t in &report.transitions {
        println!(
            "  {:<7} {:<12} {:<12} {:<11} {:>10}  {}",
            format!("{}->{}", t.from_epoch, t.to_epoch),
            t.started_at_height,
            t.finished_at_height,
            if t.with_transcript { "yes" } else { "no" },
            t.active_validators,
            format_with_commas(t.total_voting_power)
        );
    }
}


//! # Epoch Core Consensus
//!
//! Epoch orchestration for a BFT chain whose validator set changes only at
//! epoch boundaries and whose boundaries are gated on a DKG ceremony.
//!
//! This crate implements the four core components and the runtime that
//! composes them:
//!
//! - **Epoch Orchestrator** ([`epoch`]): Idle / DkgInProgress state machine,
//!   owns the epoch counter
//! - **Block Prologue** ([`block`]): per-block time, performance and
//!   transition polling
//! - **Validator Set Manager** ([`validator_set`]): lifecycle of every
//!   validator, admission cap, index assignment
//! - **DKG Session Manager** ([`dkg`]): one in-progress and one
//!   last-completed session record
//!
//! ## Transition Flow
//!
//! ```text
//! every block:
//!   on_block_start(proposer, failed, ts)
//!     ├─ update global time
//!     ├─ record proposer performance
//!     └─ check_and_start_transition()
//!          └─ if now >= last + interval:
//!               clear stale DKG, renew active lockups,
//!               snapshot dealers/targets,
//!               start DKG, state = DkgInProgress
//!
//! off-ledger engine finishes DKG:
//!   finish_transition(transcript)
//!     ├─ finish / clear DKG session
//!     ├─ apply staged configs
//!     ├─ auto-evict underperformers
//!     ├─ validator epoch pass (demote, promote, reindex)
//!     ├─ reset performance counters
//!     └─ epoch += 1, state = Idle
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use epochcore_config::{Config, GenesisConfig};
//! use epochcore_consensus::genesis::build_runtime;
//! use epochcore_types::{address::SYSTEM_CALLER, Bytes};
//!
//! let mut config = Config::default();
//! config.genesis = GenesisConfig::devnet(4, config.validator.minimum_bond);
//! let mut runtime = build_runtime(&config)?;
//!
//! let interval = config.epoch.epoch_interval_micros;
//! let outcome = runtime.on_block_start(SYSTEM_CALLER, 0, vec![], interval)?;
//! assert!(outcome.transition_started);
//!
//! runtime.finish_transition(SYSTEM_CALLER, Bytes::from_static(b"transcript"))?;
//! assert_eq!(runtime.current_epoch(), 1);
//! ```
//!
//! ## Access Control
//!
//! Every entry point checks its caller against a fixed system identity
//! (see [`epochcore_types::address`]). There are no locks: the runtime is
//! single-threaded per call and restores its prior state when a call fails.

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod block;
pub mod dkg;
pub mod epoch;
pub mod events;
pub mod genesis;
pub mod performance;
pub mod reconfig;
pub mod runtime;
pub mod timestamp;
pub mod validator_set;

pub use block::{BlockContext, BlockError, BlockOutcome, BlockPrologue, BlockResult};
pub use dkg::{DkgError, DkgResult, DkgSessionManager};
pub use epoch::{
    EpochError, EpochOrchestrator, EpochResult, EpochState, TransitionContext, TransitionState,
};
pub use events::EventLog;
pub use performance::{EpochPerformance, IndividualPerformance, PerformanceTracker};
pub use reconfig::{ConfigBuffer, OnChainConfigs, ReconfigError, ReconfigResult};
pub use runtime::{EpochRuntime, RuntimeError, RuntimeResult, RuntimeSnapshot};
pub use timestamp::Timestamp;
pub use validator_set::{
    EpochPlan, RegistrationParams, ValidatorSetContext, ValidatorSetError, ValidatorSetManager,
    ValidatorSetResult,
};

//! Block prologue.
//!
//! Runs once at the start of every block, before any user transaction:
//! resolves the proposer, advances the global clock, records proposer
//! performance and polls the orchestrator for a due epoch transition.

use alloy_primitives::Address;
use epochcore_core::{PerformanceStore, StakeRegistry, TimeError, TimeSource};
use epochcore_types::address::{BLOCK_ADDR, GENESIS_ADDR, SYSTEM_CALLER};
use epochcore_types::{ensure_caller, AccessError, Epoch, SystemEvent, NIL_PROPOSER_INDEX};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::dkg::DkgSessionManager;
use crate::epoch::{EpochError, EpochOrchestrator, TransitionContext};
use crate::events::EventLog;
use crate::reconfig::OnChainConfigs;
use crate::validator_set::ValidatorSetManager;

/// Block prologue errors
#[derive(Debug, Error)]
pub enum BlockError {
    /// Caller is not the execution runtime
    #[error(transparent)]
    Access(#[from] AccessError),

    /// Prologue already initialized
    #[error("block prologue already initialized")]
    AlreadyInitialized,

    /// Prologue not initialized
    #[error("block prologue not initialized")]
    NotInitialized,

    /// Proposer index does not name an active validator
    #[error("proposer index {index} out of range for {active_count} active validators")]
    UnknownProposerIndex {
        /// Supplied index
        index: u64,
        /// Active set size
        active_count: usize,
    },

    /// Block timestamp rejected
    #[error("timestamp: {0}")]
    Time(#[from] TimeError),

    /// Transition check failed
    #[error("epoch: {0}")]
    Epoch(#[from] EpochError),
}

/// Result type for block prologue calls
pub type BlockResult<T> = Result<T, BlockError>;

/// Collaborators the prologue drives for one block.
pub struct BlockContext<'a> {
    /// Global clock
    pub time: &'a mut dyn TimeSource,
    /// Epoch orchestrator
    pub orchestrator: &'a mut EpochOrchestrator,
    /// Voting-power oracle
    pub staking: &'a mut dyn StakeRegistry,
    /// Proposer performance counters
    pub performance: &'a mut dyn PerformanceStore,
    /// On-chain parameters
    pub configs: &'a mut OnChainConfigs,
    /// Validator set manager
    pub validators: &'a mut ValidatorSetManager,
    /// DKG session manager
    pub dkg: &'a mut DkgSessionManager,
    /// Event sink
    pub events: &'a mut EventLog,
}

/// What happened in one prologue call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockOutcome {
    /// Resolved proposer (the system caller for NIL blocks)
    pub proposer: Address,
    /// Epoch the block belongs to
    pub epoch: Epoch,
    /// Global time after the update
    pub timestamp_us: u64,
    /// Whether this block started an epoch transition
    pub transition_started: bool,
}

/// Per-block entry point. Holds only its initialization flag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockPrologue {
    initialized: bool,
}

impl BlockPrologue {
    /// Uninitialized prologue
    pub fn new() -> Self {
        Self::default()
    }

    /// Genesis only.
    pub fn initialize(&mut self, caller: Address) -> BlockResult<()> {
        ensure_caller(caller, GENESIS_ADDR, "initialize_block_prologue")?;
        if self.initialized {
            return Err(BlockError::AlreadyInitialized);
        }
        self.initialized = true;
        Ok(())
    }

    /// Whether genesis initialization ran.
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Processes the start of a block. Execution runtime only.
    ///
    /// `proposer_index` is the active-set index of the proposer, or
    /// [`NIL_PROPOSER_INDEX`] for blocks without a real proposer.
    pub fn on_block_start(
        &self,
        caller: Address,
        proposer_index: u64,
        failed_proposer_indices: Vec<u64>,
        timestamp_us: u64,
        ctx: &mut BlockContext<'_>,
    ) -> BlockResult<BlockOutcome> {
        ensure_caller(caller, SYSTEM_CALLER, "on_block_start")?;
        if !self.initialized {
            return Err(BlockError::NotInitialized);
        }

        let (proposer, index) = if proposer_index == NIL_PROPOSER_INDEX {
            (SYSTEM_CALLER, None)
        } else {
            let proposer = ctx.validators.validator_by_index(proposer_index).ok_or(
                BlockError::UnknownProposerIndex {
                    index: proposer_index,
                    active_count: ctx.validators.active_count(),
                },
            )?;
            (proposer, Some(proposer_index))
        };

        ctx.time.update_global_time(proposer, timestamp_us)?;
        ctx.performance.record(index, &failed_proposer_indices);

        let now_us = ctx.time.now_microseconds();
        let transition_started = ctx.orchestrator.check_and_start_transition(
            BLOCK_ADDR,
            &mut TransitionContext {
                now_us,
                staking: &mut *ctx.staking,
                performance: &mut *ctx.performance,
                configs: &mut *ctx.configs,
                validators: &mut *ctx.validators,
                dkg: &mut *ctx.dkg,
                events: &mut *ctx.events,
            },
        )?;

        let epoch = ctx.orchestrator.current_epoch();
        debug!(
            proposer = %proposer,
            epoch,
            timestamp_us = now_us,
            failed = failed_proposer_indices.len(),
            transition_started,
            "Block prologue"
        );
        ctx.events.emit(SystemEvent::NewBlock {
            proposer,
            epoch,
            timestamp_us: now_us,
            failed_proposer_indices,
        });

        Ok(BlockOutcome {
            proposer,
            epoch,
            timestamp_us: now_us,
            transition_started,
        })
    }
}

//! Epoch Orchestrator
//!
//! Drives the two-phase epoch transition and owns the epoch counter.
//!
//! # State Machine
//!
//! ```text
//!          check_and_start_transition (interval elapsed)
//!   Idle ---------------------------------------------> DkgInProgress
//!    ^                                                       |
//!    +------------------ finish_transition ------------------+
//! ```
//!
//! A transition starts from the block prologue once `now >= last + interval`.
//! Starting snapshots the current and projected next validator sets into a
//! DKG session. The off-ledger engine runs the ceremony and later calls
//! [`EpochOrchestrator::finish_transition`], which applies every
//! epoch-boundary side effect in a fixed order:
//!
//! 1. complete the DKG session (if a transcript was supplied), then clear any
//!    session still incomplete
//! 2. apply staged on-chain configuration
//! 3. auto-evict underperforming validators
//! 4. run the validator lifecycle pass
//! 5. reset performance counters for the new active count
//! 6. increment the epoch and record the transition time
//!
//! Eviction reads the new config and the old epoch's counters; evicted
//! validators leave the active set within the same transition.
//!
//! # Downtime
//!
//! After a halt spanning many intervals exactly one transition fires on
//! resume. The epoch advances by one regardless of how much time passed.

use alloy_primitives::Bytes;
use epochcore_core::{PerformanceStore, StakeRegistry};
use epochcore_types::address::{
    BLOCK_ADDR, GENESIS_ADDR, GOVERNANCE_ADDR, RECONFIGURATION_ADDR, SYSTEM_CALLER,
};
use epochcore_types::{
    ensure_any_caller, ensure_caller, AccessError, Address, DkgSessionMetadata, Epoch,
    SystemEvent,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::dkg::{DkgError, DkgSessionManager};
use crate::events::EventLog;
use crate::reconfig::{OnChainConfigs, ReconfigError};
use crate::validator_set::{ValidatorSetContext, ValidatorSetError, ValidatorSetManager};

/// Errors that can occur during epoch orchestration
#[derive(Debug, Error)]
pub enum EpochError {
    /// Caller is not the permitted identity
    #[error(transparent)]
    Access(#[from] AccessError),

    /// Orchestrator already initialized
    #[error("epoch orchestrator already initialized")]
    AlreadyInitialized,

    /// Orchestrator not initialized
    #[error("epoch orchestrator not initialized")]
    NotInitialized,

    /// Finish requested while idle
    #[error("no epoch transition in progress (epoch {epoch})")]
    NotInProgress {
        /// Current epoch
        epoch: Epoch,
    },

    /// Validator set step failed
    #[error("validator set: {0}")]
    ValidatorSet(#[from] ValidatorSetError),

    /// DKG step failed
    #[error("dkg: {0}")]
    Dkg(#[from] DkgError),

    /// Config apply failed
    #[error("reconfiguration: {0}")]
    Reconfig(#[from] ReconfigError),
}

/// Result type for epoch operations
pub type EpochResult<T> = Result<T, EpochError>;

/// Transition phase
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionState {
    /// No transition running
    #[default]
    Idle,
    /// Waiting for the DKG result
    DkgInProgress,
}

/// Persistent orchestrator state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpochState {
    /// Current epoch, never decreases
    pub current_epoch: Epoch,
    /// Completion time of the last transition (genesis time initially)
    pub last_transition_time_us: u64,
    /// Current phase
    pub transition_state: TransitionState,
    /// When the running transition started
    pub transition_started_at_us: Option<u64>,
}

/// Components the orchestrator sequences during a transition.
///
/// The orchestrator never stores validator or DKG state itself; it borrows
/// the owning components for the duration of one call.
pub struct TransitionContext<'a> {
    /// Current global time in microseconds
    pub now_us: u64,
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

/// The epoch orchestrator
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpochOrchestrator {
    initialized: bool,
    state: EpochState,
}

impl EpochOrchestrator {
    /// Uninitialized orchestrator
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets epoch 0, Idle, with `genesis_time_us` as the last transition time.
    /// Genesis only.
    pub fn initialize(&mut self, caller: Address, genesis_time_us: u64) -> EpochResult<()> {
        ensure_caller(caller, GENESIS_ADDR, "initialize_epoch")?;
        if self.initialized {
            return Err(EpochError::AlreadyInitialized);
        }
        self.state = EpochState {
            current_epoch: 0,
            last_transition_time_us: genesis_time_us,
            transition_state: TransitionState::Idle,
            transition_started_at_us: None,
        };
        self.initialized = true;
        info!(genesis_time_us, "Epoch orchestrator initialized");
        Ok(())
    }

    /// Starts a transition if the epoch interval has elapsed. Block prologue only.
    ///
    /// Returns `Ok(false)` without side effects while a transition is already
    /// running or before the interval has elapsed.
    pub fn check_and_start_transition(
        &mut self,
        caller: Address,
        ctx: &mut TransitionContext<'_>,
    ) -> EpochResult<bool> {
        ensure_caller(caller, BLOCK_ADDR, "check_and_start_transition")?;
        self.ensure_initialized()?;

        if self.is_in_progress() {
            return Ok(false);
        }
        let now_us = ctx.now_us;
        let interval = ctx.configs.epoch().epoch_interval_micros;
        if !self.can_trigger(now_us, interval) {
            return Ok(false);
        }

        ctx.dkg.clear_incomplete(RECONFIGURATION_ADDR, ctx.events)?;
        ctx.validators.renew_lockups(&mut *ctx.staking, now_us)?;

        let metadata = DkgSessionMetadata {
            dealer_epoch: self.state.current_epoch,
            config_variant: ctx.configs.randomness().variant,
            dealer_validator_set: ctx.validators.get_active_validators(),
            target_validator_set: ctx.validators.next_validator_set(
                &*ctx.staking,
                now_us,
                ctx.configs.validator(),
            ),
        };
        ctx.dkg
            .start(RECONFIGURATION_ADDR, metadata, now_us, ctx.events)?;

        self.state.transition_state = TransitionState::DkgInProgress;
        self.state.transition_started_at_us = Some(now_us);

        info!(
            epoch = self.state.current_epoch,
            now_us,
            overdue_us = now_us
                .saturating_sub(self.state.last_transition_time_us.saturating_add(interval)),
            "Epoch transition started"
        );
        ctx.events.emit(SystemEvent::EpochTransitionStarted {
            epoch: self.state.current_epoch,
            at_us: now_us,
        });
        Ok(true)
    }

    /// Completes the running transition.
    ///
    /// Called by the consensus engine with the DKG transcript, or by
    /// governance to force-end a stuck session (typically with an empty
    /// result).
    pub fn finish_transition(
        &mut self,
        caller: Address,
        dkg_result: Bytes,
        ctx: &mut TransitionContext<'_>,
    ) -> EpochResult<()> {
        ensure_any_caller(caller, &[SYSTEM_CALLER, GOVERNANCE_ADDR], "finish_transition")?;
        self.ensure_initialized()?;
        if !self.is_in_progress() {
            return Err(EpochError::NotInProgress {
                epoch: self.state.current_epoch,
            });
        }
        if caller == GOVERNANCE_ADDR {
            warn!(
                epoch = self.state.current_epoch,
                with_transcript = !dkg_result.is_empty(),
                "Governance force-ending epoch transition"
            );
        }

        let now_us = ctx.now_us;
        let with_transcript = !dkg_result.is_empty();
        if with_transcript {
            ctx.dkg.finish(RECONFIGURATION_ADDR, dkg_result, ctx.events)?;
        }
        ctx.dkg.clear_incomplete(RECONFIGURATION_ADDR, ctx.events)?;

        ctx.configs.apply_pending(RECONFIGURATION_ADDR, ctx.events)?;

        {
            let mut vctx = ValidatorSetContext {
                now_us,
                config: ctx.configs.validator(),
                staking: &mut *ctx.staking,
                events: &mut *ctx.events,
                transition_in_progress: true,
            };
            let evicted = ctx.validators.evict_underperforming(
                RECONFIGURATION_ADDR,
                &*ctx.performance,
                &mut vctx,
            )?;
            if !evicted.is_empty() {
                debug!(count = evicted.len(), "Auto-eviction applied");
            }
            ctx.validators
                .on_new_epoch(RECONFIGURATION_ADDR, &mut vctx)?;
        }

        ctx.performance
            .reset_for_epoch(ctx.validators.active_count());

        self.state.current_epoch += 1;
        self.state.last_transition_time_us = now_us;
        self.state.transition_state = TransitionState::Idle;
        self.state.transition_started_at_us = None;

        info!(
            epoch = self.state.current_epoch,
            active = ctx.validators.active_count(),
            total_voting_power = ctx.validators.total_voting_power(),
            with_transcript,
            "Epoch transitioned"
        );
        ctx.events.emit(SystemEvent::EpochTransitioned {
            new_epoch: self.state.current_epoch,
            at_us: now_us,
            with_transcript,
        });
        Ok(())
    }

    /// Whether the interval has elapsed at `now_us`.
    pub fn can_trigger(&self, now_us: u64, epoch_interval_micros: u64) -> bool {
        now_us >= self.next_transition_time(epoch_interval_micros)
    }

    /// Microseconds until a transition may start; zero once due.
    pub fn remaining_time(&self, now_us: u64, epoch_interval_micros: u64) -> u64 {
        self.next_transition_time(epoch_interval_micros)
            .saturating_sub(now_us)
    }

    /// Earliest time the next transition may start.
    pub fn next_transition_time(&self, epoch_interval_micros: u64) -> u64 {
        self.state
            .last_transition_time_us
            .saturating_add(epoch_interval_micros)
    }

    /// How long the running transition has been waiting for its DKG result.
    pub fn transition_age(&self, now_us: u64) -> Option<u64> {
        self.state
            .transition_started_at_us
            .map(|started| now_us.saturating_sub(started))
    }

    /// Whether a transition is running.
    pub fn is_in_progress(&self) -> bool {
        self.state.transition_state == TransitionState::DkgInProgress
    }

    /// Whether genesis initialization ran.
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Current epoch.
    pub fn current_epoch(&self) -> Epoch {
        self.state.current_epoch
    }

    /// Completion time of the last transition.
    pub fn last_transition_time(&self) -> u64 {
        self.state.last_transition_time_us
    }

    /// Full state.
    pub fn state(&self) -> EpochState {
        self.state
    }

    fn ensure_initialized(&self) -> EpochResult<()> {
        if self.initialized {
            Ok(())
        } else {
            Err(EpochError::NotInitialized)
        }
    }
}

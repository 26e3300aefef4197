//! # Epoch Runtime
//!
//! Owns every component of the epoch core and exposes the external entry
//! points: the per-block prologue, transition completion, validator
//! lifecycle requests, stake operations and governance config staging.
//!
//! Each entry point is all-or-nothing. The call runs against the live state
//! and, on error, the state captured before the call is restored and the
//! events it emitted are dropped. No partial effects survive a failed call.
//!
//! ```rust,ignore
//! use epochcore_consensus::{genesis, EpochRuntime};
//! use epochcore_config::Config;
//! use epochcore_types::{address::SYSTEM_CALLER, Bytes};
//!
//! let mut runtime = genesis::build_runtime(&Config::default())?;
//! let outcome = runtime.on_block_start(SYSTEM_CALLER, 0, vec![], t)?;
//! if outcome.transition_started {
//!     runtime.finish_transition(SYSTEM_CALLER, Bytes::from_static(b"transcript"))?;
//! }
//! for event in runtime.drain_events() { /* ... */ }
//! ```

use alloy_primitives::{Address, Bytes};
use epochcore_config::{ConfigError, EpochConfig, RandomnessConfig, ValidatorConfig};
use epochcore_core::{StakeRegistry, StakingError, TimeError, TimeSource};
use epochcore_staking::StakingLedger;
use epochcore_types::address::GENESIS_ADDR;
use epochcore_types::{
    ensure_caller, AccessError, Epoch, SystemEvent, ValidatorConsensusInfo, VotingPower,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::block::{BlockContext, BlockError, BlockOutcome, BlockPrologue};
use crate::dkg::{DkgError, DkgSessionManager};
use crate::epoch::{EpochError, EpochOrchestrator, TransitionContext};
use crate::events::EventLog;
use crate::performance::PerformanceTracker;
use crate::reconfig::{OnChainConfigs, ReconfigError};
use crate::timestamp::Timestamp;
use crate::validator_set::{
    RegistrationParams, ValidatorSetContext, ValidatorSetError, ValidatorSetManager,
};

/// Any failure surfaced by a runtime entry point.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// Caller is not the permitted identity
    #[error(transparent)]
    Access(#[from] AccessError),

    /// Block prologue failure
    #[error(transparent)]
    Block(#[from] BlockError),

    /// Orchestrator failure
    #[error(transparent)]
    Epoch(#[from] EpochError),

    /// Validator set failure
    #[error(transparent)]
    ValidatorSet(#[from] ValidatorSetError),

    /// DKG failure
    #[error(transparent)]
    Dkg(#[from] DkgError),

    /// Config staging failure
    #[error(transparent)]
    Reconfig(#[from] ReconfigError),

    /// Stake registry failure
    #[error(transparent)]
    Staking(#[from] StakingError),

    /// Clock failure
    #[error(transparent)]
    Time(#[from] TimeError),

    /// Invalid configuration
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Result type for runtime entry points.
pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// Serializable copy of the complete runtime state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuntimeSnapshot<S = StakingLedger> {
    /// Chain identifier
    pub chain_id: u64,
    /// Global clock
    pub timestamp: Timestamp,
    /// Active and staged parameters
    pub configs: OnChainConfigs,
    /// Proposer performance counters
    pub performance: PerformanceTracker,
    /// Stake registry
    pub staking: S,
    /// Validator records and sets
    pub validators: ValidatorSetManager,
    /// DKG session slots
    pub dkg: DkgSessionManager,
    /// Epoch state
    pub orchestrator: EpochOrchestrator,
    /// Block prologue flag
    pub prologue: BlockPrologue,
}

/// The epoch core.
#[derive(Debug, Clone)]
pub struct EpochRuntime<S = StakingLedger> {
    chain_id: u64,
    timestamp: Timestamp,
    configs: OnChainConfigs,
    performance: PerformanceTracker,
    staking: S,
    validators: ValidatorSetManager,
    dkg: DkgSessionManager,
    orchestrator: EpochOrchestrator,
    prologue: BlockPrologue,
    events: EventLog,
}

impl<S: StakeRegistry + Clone> EpochRuntime<S> {
    /// Uninitialized runtime over `staking`, with the clock at `genesis_time_us`.
    pub fn new(chain_id: u64, configs: OnChainConfigs, staking: S, genesis_time_us: u64) -> Self {
        Self {
            chain_id,
            timestamp: Timestamp::new(genesis_time_us),
            configs,
            performance: PerformanceTracker::default(),
            staking,
            validators: ValidatorSetManager::new(),
            dkg: DkgSessionManager::new(),
            orchestrator: EpochOrchestrator::new(),
            prologue: BlockPrologue::new(),
            events: EventLog::new(),
        }
    }

    /// One-time genesis initialization. Genesis only.
    ///
    /// Activates `validators` with indices `0..n`, starts epoch 0 at the
    /// current clock, sizes the performance counters and arms the block
    /// prologue.
    pub fn initialize(
        &mut self,
        caller: Address,
        validators: Vec<RegistrationParams>,
    ) -> RuntimeResult<()> {
        self.atomically(|rt| {
            ensure_caller(caller, GENESIS_ADDR, "initialize_runtime")?;
            let now_us = rt.timestamp.now_microseconds();

            let mut ctx = ValidatorSetContext {
                now_us,
                config: rt.configs.validator(),
                staking: &mut rt.staking,
                events: &mut rt.events,
                transition_in_progress: false,
            };
            rt.validators.initialize(caller, validators, &mut ctx)?;
            rt.orchestrator.initialize(caller, now_us)?;
            rt.prologue.initialize(caller)?;
            rt.performance = PerformanceTracker::new(rt.validators.active_count());

            info!(
                chain_id = rt.chain_id,
                genesis_time_us = now_us,
                active = rt.validators.active_count(),
                total_voting_power = rt.validators.total_voting_power(),
                "Epoch runtime initialized"
            );
            Ok(())
        })
    }

    // ------------------------------------------------------------------
    // Consensus engine / execution runtime
    // ------------------------------------------------------------------

    /// Block prologue entry point. Execution runtime only.
    pub fn on_block_start(
        &mut self,
        caller: Address,
        proposer_index: u64,
        failed_proposer_indices: Vec<u64>,
        timestamp_us: u64,
    ) -> RuntimeResult<BlockOutcome> {
        self.atomically(|rt| {
            let outcome = rt.prologue.on_block_start(
                caller,
                proposer_index,
                failed_proposer_indices,
                timestamp_us,
                &mut BlockContext {
                    time: &mut rt.timestamp,
                    orchestrator: &mut rt.orchestrator,
                    staking: &mut rt.staking,
                    performance: &mut rt.performance,
                    configs: &mut rt.configs,
                    validators: &mut rt.validators,
                    dkg: &mut rt.dkg,
                    events: &mut rt.events,
                },
            )?;
            Ok(outcome)
        })
    }

    /// Completes the running transition. Consensus engine or governance.
    pub fn finish_transition(&mut self, caller: Address, dkg_result: Bytes) -> RuntimeResult<()> {
        self.atomically(|rt| {
            let now_us = rt.timestamp.now_microseconds();
            rt.orchestrator.finish_transition(
                caller,
                dkg_result,
                &mut TransitionContext {
                    now_us,
                    staking: &mut rt.staking,
                    performance: &mut rt.performance,
                    configs: &mut rt.configs,
                    validators: &mut rt.validators,
                    dkg: &mut rt.dkg,
                    events: &mut rt.events,
                },
            )?;
            Ok(())
        })
    }

    // ------------------------------------------------------------------
    // Validator operators
    // ------------------------------------------------------------------

    /// Registers a funded pool as a validator. Pool operator only.
    pub fn register_validator(
        &mut self,
        caller: Address,
        params: RegistrationParams,
    ) -> RuntimeResult<()> {
        self.with_validator_ctx(|validators, ctx| {
            validators.register_validator(caller, params, ctx)
        })
    }

    /// Requests activation at the next epoch. Pool operator only.
    pub fn join_validator_set(&mut self, caller: Address, pool: Address) -> RuntimeResult<()> {
        self.with_validator_ctx(|validators, ctx| validators.join_validator_set(caller, &pool, ctx))
    }

    /// Leaves the set, or cancels a pending join. Pool operator only.
    pub fn leave_validator_set(&mut self, caller: Address, pool: Address) -> RuntimeResult<()> {
        self.with_validator_ctx(|validators, ctx| validators.leave_validator_set(caller, &pool, ctx))
    }

    /// Stages a fee recipient change. Pool operator only.
    pub fn update_fee_recipient(
        &mut self,
        caller: Address,
        pool: Address,
        fee_recipient: Address,
    ) -> RuntimeResult<()> {
        self.with_validator_ctx(|validators, ctx| {
            validators.update_fee_recipient(caller, &pool, fee_recipient, ctx)
        })
    }

    /// Replaces consensus key material. Pool operator only.
    pub fn rotate_consensus_key(
        &mut self,
        caller: Address,
        pool: Address,
        consensus_pubkey: Bytes,
        consensus_pop: Bytes,
    ) -> RuntimeResult<()> {
        self.with_validator_ctx(|validators, ctx| {
            validators.rotate_consensus_key(caller, &pool, consensus_pubkey, consensus_pop, ctx)
        })
    }

    // ------------------------------------------------------------------
    // Governance
    // ------------------------------------------------------------------

    /// Stages an epoch config for the next transition. Governance only.
    pub fn set_epoch_config(&mut self, caller: Address, config: EpochConfig) -> RuntimeResult<()> {
        self.atomically(|rt| {
            rt.configs.set_epoch_for_next_epoch(caller, config)?;
            config
                .check_lockup(rt.staking.lockup_duration_micros())
                .map_err(|source| ReconfigError::Invalid {
                    name: "epoch",
                    source,
                })?;
            Ok(())
        })
    }

    /// Stages a validator config for the next transition. Governance only.
    pub fn set_validator_config(
        &mut self,
        caller: Address,
        config: ValidatorConfig,
    ) -> RuntimeResult<()> {
        self.atomically(|rt| Ok(rt.configs.set_validator_for_next_epoch(caller, config)?))
    }

    /// Stages a randomness config for the next transition. Governance only.
    pub fn set_randomness_config(
        &mut self,
        caller: Address,
        config: RandomnessConfig,
    ) -> RuntimeResult<()> {
        self.atomically(|rt| Ok(rt.configs.set_randomness_for_next_epoch(caller, config)?))
    }

    // ------------------------------------------------------------------
    // Views
    // ------------------------------------------------------------------

    /// Chain identifier.
    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// Current epoch.
    pub fn current_epoch(&self) -> Epoch {
        self.orchestrator.current_epoch()
    }

    /// Whether a transition is running.
    pub fn is_transition_in_progress(&self) -> bool {
        self.orchestrator.is_in_progress()
    }

    /// Whether the epoch interval has elapsed at the current time.
    pub fn can_trigger(&self) -> bool {
        self.orchestrator.can_trigger(
            self.timestamp.now_microseconds(),
            self.configs.epoch().epoch_interval_micros,
        )
    }

    /// Microseconds until the next transition may start.
    pub fn remaining_time(&self) -> u64 {
        self.orchestrator.remaining_time(
            self.timestamp.now_microseconds(),
            self.configs.epoch().epoch_interval_micros,
        )
    }

    /// Age of the running transition at the current time.
    pub fn transition_age(&self) -> Option<u64> {
        self.orchestrator
            .transition_age(self.timestamp.now_microseconds())
    }

    /// Current global time in microseconds.
    pub fn now_microseconds(&self) -> u64 {
        self.timestamp.now_microseconds()
    }

    /// Consensus view of the active set in index order.
    pub fn get_active_validators(&self) -> Vec<ValidatorConsensusInfo> {
        self.validators.get_active_validators()
    }

    /// Projected set after the next epoch pass, at the current time.
    pub fn next_validator_set(&self) -> Vec<ValidatorConsensusInfo> {
        self.validators.next_validator_set(
            &self.staking,
            self.timestamp.now_microseconds(),
            self.configs.validator(),
        )
    }

    /// Total voting power of the active set.
    pub fn total_voting_power(&self) -> VotingPower {
        self.validators.total_voting_power()
    }

    /// Validator set manager.
    pub fn validators(&self) -> &ValidatorSetManager {
        &self.validators
    }

    /// DKG session manager.
    pub fn dkg(&self) -> &DkgSessionManager {
        &self.dkg
    }

    /// Epoch orchestrator.
    pub fn orchestrator(&self) -> &EpochOrchestrator {
        &self.orchestrator
    }

    /// On-chain parameters.
    pub fn configs(&self) -> &OnChainConfigs {
        &self.configs
    }

    /// Proposer performance counters.
    pub fn performance(&self) -> &PerformanceTracker {
        &self.performance
    }

    /// Stake registry.
    pub fn staking(&self) -> &S {
        &self.staking
    }

    /// Events emitted since the last drain.
    pub fn events(&self) -> &[SystemEvent] {
        self.events.events()
    }

    /// Removes and returns pending events.
    pub fn drain_events(&mut self) -> Vec<SystemEvent> {
        self.events.drain()
    }

    // ------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------

    /// Copy of the complete state. Pending events are not included.
    pub fn snapshot(&self) -> RuntimeSnapshot<S> {
        RuntimeSnapshot {
            chain_id: self.chain_id,
            timestamp: self.timestamp,
            configs: self.configs.clone(),
            performance: self.performance.clone(),
            staking: self.staking.clone(),
            validators: self.validators.clone(),
            dkg: self.dkg.clone(),
            orchestrator: self.orchestrator.clone(),
            prologue: self.prologue,
        }
    }

    /// Runtime restored from a snapshot, with an empty event log.
    pub fn from_snapshot(snapshot: RuntimeSnapshot<S>) -> Self {
        Self {
            chain_id: snapshot.chain_id,
            timestamp: snapshot.timestamp,
            configs: snapshot.configs,
            performance: snapshot.performance,
            staking: snapshot.staking,
            validators: snapshot.validators,
            dkg: snapshot.dkg,
            orchestrator: snapshot.orchestrator,
            prologue: snapshot.prologue,
            events: EventLog::new(),
        }
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn with_validator_ctx<T>(
        &mut self,
        f: impl FnOnce(
            &mut ValidatorSetManager,
            &mut ValidatorSetContext<'_>,
        ) -> Result<T, ValidatorSetError>,
    ) -> RuntimeResult<T> {
        self.atomically(|rt| {
            let mut ctx = ValidatorSetContext {
                now_us: rt.timestamp.now_microseconds(),
                config: rt.configs.validator(),
                staking: &mut rt.staking,
                events: &mut rt.events,
                transition_in_progress: rt.orchestrator.is_in_progress(),
            };
            Ok(f(&mut rt.validators, &mut ctx)?)
        })
    }

    /// Runs `f` and restores the prior state if it fails.
    ///
    /// The backup is a full clone of every component except the event log,
    /// which is only truncated back to its length before the call. Cost per
    /// call therefore grows with the number of registered validators and pools.
    fn atomically<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> RuntimeResult<T>,
    ) -> RuntimeResult<T> {
        let mark = self.events.len();
        let events = std::mem::take(&mut self.events);
        let backup = self.clone();
        self.events = events;

        match f(self) {
            Ok(value) => Ok(value),
            Err(err) => {
                debug!(error = %err, "Call rejected, state restored");
                let mut events = std::mem::take(&mut self.events);
                events.truncate(mark);
                *self = backup;
                self.events = events;
                Err(err)
            }
        }
    }
}

impl EpochRuntime<StakingLedger> {
    /// Opens a stake pool funded by `owner`.
    pub fn create_pool(
        &mut self,
        owner: Address,
        operator: Address,
        amount: u128,
    ) -> RuntimeResult<Address> {
        self.atomically(|rt| {
            let now_us = rt.timestamp.now_microseconds();
            Ok(rt.staking.create_pool(owner, operator, amount, now_us)?)
        })
    }

    /// Adds stake to a pool. Pool owner only.
    pub fn add_stake(&mut self, caller: Address, pool: Address, amount: u128) -> RuntimeResult<u128> {
        self.atomically(|rt| {
            let now_us = rt.timestamp.now_microseconds();
            Ok(rt.staking.add_stake(caller, &pool, amount, now_us)?)
        })
    }

    /// Replaces a pool operator. Pool owner only.
    ///
    /// The validator record picks up the new operator at the next epoch pass.
    pub fn set_operator(
        &mut self,
        caller: Address,
        pool: Address,
        operator: Address,
    ) -> RuntimeResult<()> {
        self.atomically(|rt| Ok(rt.staking.set_operator(caller, &pool, operator)?))
    }

    /// Withdraws bonded stake into unbonding. Pool owner only.
    ///
    /// Rejected if the pool's validator is Active or PendingInactive and the
    /// remaining stake would fall below the minimum bond.
    pub fn unstake(&mut self, caller: Address, pool: Address, amount: u128) -> RuntimeResult<u128> {
        self.atomically(|rt| {
            let status = rt.validators.status_of(&pool);
            let minimum_bond = rt.configs.validator().minimum_bond;
            Ok(rt
                .staking
                .unstake(caller, &pool, amount, status, minimum_bond)?)
        })
    }
}

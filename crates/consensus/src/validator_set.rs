//! # Validator Set Manager
//!
//! Owns every [`ValidatorRecord`] and the three ordered collections consensus
//! depends on:
//!
//! - **active**: validators holding an index; index = position
//! - **pending-active**: join requests waiting for the next epoch pass
//! - **pending-inactive**: leave requests (or evictions) waiting for the next
//!   epoch pass; they keep their index and stay in the active array until then
//!
//! # Lifecycle
//!
//! ```text
//! Inactive --join--> PendingActive --epoch pass--> Active --leave--> PendingInactive
//!    ^  ^                  |                                              |
//!    |  +---- cancel ------+                                              |
//!    +--------------------------- epoch pass ----------------------------+
//! ```
//!
//! # Epoch Pass
//!
//! [`ValidatorSetManager::on_new_epoch`] runs once per transition, called only
//! by the orchestrator:
//!
//! 1. demote PendingInactive validators to Inactive
//! 2. promote PendingActive validators within the voting-power admission cap;
//!    those over budget stay pending, those below the minimum bond go Inactive
//! 3. renew lockups of the resulting active set
//! 4. apply staged fee recipients
//! 5. re-sync cached owner / operator references
//! 6. reassign indices `0..n` in active-array order
//! 7. record the new total voting power and advance the epoch counter

use std::collections::BTreeMap;

use alloy_primitives::{Address, Bytes};
use epochcore_config::ValidatorConfig;
use epochcore_core::{PerformanceStore, StakeRegistry, StakingError};
use epochcore_types::address::{GENESIS_ADDR, RECONFIGURATION_ADDR};
use epochcore_types::{
    ensure_caller, AccessError, Epoch, SystemEvent, ValidatorConsensusInfo, ValidatorRecord,
    ValidatorStatus, VotingPower, BLS_POP_LENGTH, BLS_PUBKEY_LENGTH, MAX_MONIKER_LENGTH,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::events::EventLog;

/// Errors raised by the validator set manager.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidatorSetError {
    /// Caller is not the permitted identity.
    #[error(transparent)]
    Access(#[from] AccessError),

    /// The stake registry rejected a lookup or renewal.
    #[error(transparent)]
    Staking(#[from] StakingError),

    /// Genesis initialization already ran.
    #[error("validator set manager already initialized")]
    AlreadyInitialized,

    /// Genesis initialization has not run.
    #[error("validator set manager not initialized")]
    NotInitialized,

    /// An epoch transition is in progress.
    #[error("validator set changes are frozen while an epoch transition is in progress")]
    TransitionInProgress,

    /// Governance has disabled join / leave requests.
    #[error("validator set changes are disabled")]
    ValidatorSetChangeDisabled,

    /// Caller is not the pool operator.
    #[error("caller {caller} is not the operator {operator} of validator {validator}")]
    NotOperator {
        /// Stake pool address
        validator: Address,
        /// Rejected caller
        caller: Address,
        /// Actual operator
        operator: Address,
    },

    /// The pool is already registered.
    #[error("validator {validator} is already registered")]
    AlreadyRegistered {
        /// Stake pool address
        validator: Address,
    },

    /// No record for this pool.
    #[error("validator {validator} is not registered")]
    ValidatorNotFound {
        /// Stake pool address
        validator: Address,
    },

    /// Display name over the length bound.
    #[error("moniker is {length} bytes, limit is {max}")]
    MonikerTooLong {
        /// Actual length
        length: usize,
        /// Limit
        max: usize,
    },

    /// Key material of the wrong length.
    #[error("invalid {field}: expected {expected} bytes, got {actual}")]
    InvalidConsensusKey {
        /// Offending field
        field: &'static str,
        /// Required length
        expected: usize,
        /// Actual length
        actual: usize,
    },

    /// Voting power below the minimum bond.
    #[error("validator {validator} has voting power {voting_power}, minimum is {minimum}")]
    InsufficientVotingPower {
        /// Stake pool address
        validator: Address,
        /// Current admissible power
        voting_power: VotingPower,
        /// Minimum bond
        minimum: VotingPower,
    },

    /// Active plus pending-active validators already at capacity.
    #[error("validator set full: {active} active + {pending_active} pending, max {max}")]
    ValidatorSetFull {
        /// Active array length
        active: usize,
        /// Pending-active length
        pending_active: usize,
        /// Configured maximum
        max: u64,
    },

    /// The request does not apply to the validator's current status.
    #[error("cannot {operation} validator {validator} with status {status}")]
    InvalidStatus {
        /// Stake pool address
        validator: Address,
        /// Current status
        status: ValidatorStatus,
        /// Attempted operation
        operation: &'static str,
    },

    /// Leaving would empty the active set.
    #[error("validator {validator} is the last active validator and cannot leave")]
    CannotRemoveLastValidator {
        /// Stake pool address
        validator: Address,
    },
}

/// Result type for validator set operations.
pub type ValidatorSetResult<T> = Result<T, ValidatorSetError>;

/// Collaborators and parameters for one call into the manager.
pub struct ValidatorSetContext<'a> {
    /// Current global time in microseconds
    pub now_us: u64,
    /// Active validator config
    pub config: &'a ValidatorConfig,
    /// Voting-power oracle
    pub staking: &'a mut dyn StakeRegistry,
    /// Event sink
    pub events: &'a mut EventLog,
    /// Whether the orchestrator is mid-transition
    pub transition_in_progress: bool,
}

/// Registration request for a funded stake pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationParams {
    /// Stake pool address
    pub pool: Address,
    /// Display name
    pub moniker: String,
    /// BLS public key
    pub consensus_pubkey: Bytes,
    /// BLS proof of possession
    pub consensus_pop: Bytes,
    /// Validator network addresses
    pub network_addresses: Bytes,
    /// Fullnode network addresses
    pub fullnode_addresses: Bytes,
    /// Fee recipient; defaults to the pool owner
    pub fee_recipient: Option<Address>,
}

impl RegistrationParams {
    fn validate(&self) -> ValidatorSetResult<()> {
        if self.moniker.len() > MAX_MONIKER_LENGTH {
            return Err(ValidatorSetError::MonikerTooLong {
                length: self.moniker.len(),
                max: MAX_MONIKER_LENGTH,
            });
        }
        check_key_lengths(&self.consensus_pubkey, &self.consensus_pop)
    }
}

fn check_key_lengths(pubkey: &[u8], pop: &[u8]) -> ValidatorSetResult<()> {
    if pubkey.len() != BLS_PUBKEY_LENGTH {
        return Err(ValidatorSetError::InvalidConsensusKey {
            field: "consensus_pubkey",
            expected: BLS_PUBKEY_LENGTH,
            actual: pubkey.len(),
        });
    }
    if pop.len() != BLS_POP_LENGTH {
        return Err(ValidatorSetError::InvalidConsensusKey {
            field: "consensus_pop",
            expected: BLS_POP_LENGTH,
            actual: pop.len(),
        });
    }
    Ok(())
}

/// Outcome of planning one epoch pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EpochPlan {
    /// PendingInactive validators that become Inactive
    pub demoted: Vec<Address>,
    /// PendingActive validators admitted, with their power
    pub promoted: Vec<(Address, VotingPower)>,
    /// PendingActive validators left pending: (pool, power, budget left)
    pub deferred: Vec<(Address, VotingPower, VotingPower)>,
    /// PendingActive validators that fell below the minimum bond
    pub dropped: Vec<(Address, VotingPower)>,
}

/// Validator lifecycle state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorSetManager {
    initialized: bool,
    validators: BTreeMap<Address, ValidatorRecord>,
    active: Vec<Address>,
    pending_active: Vec<Address>,
    pending_inactive: Vec<Address>,
    total_voting_power: VotingPower,
    current_epoch: Epoch,
}

impl ValidatorSetManager {
    /// Uninitialized manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Activates the genesis set with indices `0..n`. Genesis only.
    ///
    /// Genesis validators bypass the admission cap but must meet the
    /// minimum bond. An empty genesis set leaves the total voting power at
    /// zero, so the first epoch pass runs under the bootstrap admission
    /// policy.
    pub fn initialize(
        &mut self,
        caller: Address,
        genesis: Vec<RegistrationParams>,
        ctx: &mut ValidatorSetContext<'_>,
    ) -> ValidatorSetResult<()> {
        ensure_caller(caller, GENESIS_ADDR, "initialize_validator_set")?;
        if self.initialized {
            return Err(ValidatorSetError::AlreadyInitialized);
        }
        for params in genesis {
            let pool = params.pool;
            self.insert_record(params, ctx)?;
            let voting_power = self.require_minimum_power(&pool, ctx)?;

            let index = self.active.len() as u64;
            if let Some(record) = self.validators.get_mut(&pool) {
                record.status = ValidatorStatus::Active;
                record.validator_index = Some(index);
                record.bond = voting_power;
            }
            self.active.push(pool);
            self.total_voting_power = self.total_voting_power.saturating_add(voting_power);
            ctx.events.emit(SystemEvent::ValidatorActivated {
                validator: pool,
                voting_power,
            });
        }

        self.initialized = true;
        info!(
            active = self.active.len(),
            total_voting_power = self.total_voting_power,
            "Genesis validator set activated"
        );
        ctx.events.emit(SystemEvent::ValidatorSetUpdated {
            epoch: self.current_epoch,
            active_count: self.active.len() as u64,
            total_voting_power: self.total_voting_power,
        });
        Ok(())
    }

    /// Registers a funded pool as an Inactive validator. Pool operator only.
    pub fn register_validator(
        &mut self,
        caller: Address,
        params: RegistrationParams,
        ctx: &mut ValidatorSetContext<'_>,
    ) -> ValidatorSetResult<()> {
        self.ensure_initialized()?;
        if ctx.transition_in_progress {
            return Err(ValidatorSetError::TransitionInProgress);
        }
        if self.validators.contains_key(&params.pool) {
            return Err(ValidatorSetError::AlreadyRegistered {
                validator: params.pool,
            });
        }
        ensure_operator(caller, &params.pool, &*ctx.staking)?;
        params.validate()?;
        self.require_minimum_power(&params.pool, ctx)?;
        self.insert_record(params, ctx)
    }

    /// Requests activation at the next epoch pass. Pool operator only.
    pub fn join_validator_set(
        &mut self,
        caller: Address,
        pool: &Address,
        ctx: &mut ValidatorSetContext<'_>,
    ) -> ValidatorSetResult<()> {
        self.ensure_set_change_allowed(ctx)?;
        ensure_operator(caller, pool, &*ctx.staking)?;

        let status = self.record(pool)?.status;
        if status != ValidatorStatus::Inactive {
            return Err(ValidatorSetError::InvalidStatus {
                validator: *pool,
                status,
                operation: "join",
            });
        }

        let voting_power = self.require_minimum_power(pool, ctx)?;

        let max = ctx.config.max_validator_set_size;
        if (self.active.len() + self.pending_active.len()) as u64 >= max {
            return Err(ValidatorSetError::ValidatorSetFull {
                active: self.active.len(),
                pending_active: self.pending_active.len(),
                max,
            });
        }

        self.set_status(pool, ValidatorStatus::PendingActive);
        self.pending_active.push(*pool);

        info!(validator = %pool, voting_power, "Validator requested to join");
        ctx.events.emit(SystemEvent::ValidatorJoinRequested {
            validator: *pool,
            voting_power,
        });
        Ok(())
    }

    /// Leaves the set. Pool operator only.
    ///
    /// A PendingActive validator reverts to Inactive immediately; an Active
    /// validator becomes PendingInactive until the next epoch pass.
    pub fn leave_validator_set(
        &mut self,
        caller: Address,
        pool: &Address,
        ctx: &mut ValidatorSetContext<'_>,
    ) -> ValidatorSetResult<()> {
        self.ensure_set_change_allowed(ctx)?;
        ensure_operator(caller, pool, &*ctx.staking)?;

        match self.record(pool)?.status {
            ValidatorStatus::PendingActive => {
                self.pending_active.retain(|p| p != pool);
                self.set_status(pool, ValidatorStatus::Inactive);
                info!(validator = %pool, "Join request cancelled");
                ctx.events
                    .emit(SystemEvent::ValidatorJoinCancelled { validator: *pool });
            }
            ValidatorStatus::Active => {
                if self.remaining_active_count() <= 1 {
                    return Err(ValidatorSetError::CannotRemoveLastValidator { validator: *pool });
                }
                self.set_status(pool, ValidatorStatus::PendingInactive);
                self.pending_inactive.push(*pool);
                info!(validator = %pool, "Validator requested to leave");
                ctx.events
                    .emit(SystemEvent::ValidatorLeaveRequested { validator: *pool });
            }
            status => {
                return Err(ValidatorSetError::InvalidStatus {
                    validator: *pool,
                    status,
                    operation: "leave",
                });
            }
        }
        Ok(())
    }

    /// Stages a fee recipient for the next epoch pass. Pool operator only.
    pub fn update_fee_recipient(
        &mut self,
        caller: Address,
        pool: &Address,
        fee_recipient: Address,
        ctx: &mut ValidatorSetContext<'_>,
    ) -> ValidatorSetResult<()> {
        self.ensure_initialized()?;
        ensure_operator(caller, pool, &*ctx.staking)?;
        let record = self.record_mut(pool)?;
        record.pending_fee_recipient = Some(fee_recipient);

        debug!(validator = %pool, fee_recipient = %fee_recipient, "Fee recipient staged");
        ctx.events.emit(SystemEvent::FeeRecipientUpdated {
            validator: *pool,
            fee_recipient,
            applied: false,
        });
        Ok(())
    }

    /// Replaces the consensus key material. Pool operator only.
    pub fn rotate_consensus_key(
        &mut self,
        caller: Address,
        pool: &Address,
        consensus_pubkey: Bytes,
        consensus_pop: Bytes,
        ctx: &mut ValidatorSetContext<'_>,
    ) -> ValidatorSetResult<()> {
        self.ensure_initialized()?;
        if ctx.transition_in_progress {
            return Err(ValidatorSetError::TransitionInProgress);
        }
        ensure_operator(caller, pool, &*ctx.staking)?;
        check_key_lengths(&consensus_pubkey, &consensus_pop)?;

        let record = self.record_mut(pool)?;
        record.consensus_pubkey = consensus_pubkey;
        record.consensus_pop = consensus_pop;

        info!(validator = %pool, "Consensus key rotated");
        ctx.events
            .emit(SystemEvent::ConsensusKeyRotated { validator: *pool });
        Ok(())
    }

    /// Moves underperforming Active validators to PendingInactive.
    /// Orchestrator only.
    ///
    /// A validator is underperforming when it had at least one proposal
    /// opportunity this epoch and fewer successful proposals than
    /// `auto_evict_threshold`. The last remaining Active validator is never
    /// evicted.
    pub fn evict_underperforming(
        &mut self,
        caller: Address,
        performance: &dyn PerformanceStore,
        ctx: &mut ValidatorSetContext<'_>,
    ) -> ValidatorSetResult<Vec<Address>> {
        ensure_caller(caller, RECONFIGURATION_ADDR, "evict_underperforming")?;
        self.ensure_initialized()?;

        let mut evicted = Vec::new();
        if !ctx.config.auto_evict_enabled {
            return Ok(evicted);
        }

        let threshold = ctx.config.auto_evict_threshold;
        let mut remaining = self.remaining_active_count();
        let candidates: Vec<Address> = self.active.clone();

        for pool in candidates {
            let Some(record) = self.validators.get(&pool) else {
                continue;
            };
            if record.status != ValidatorStatus::Active {
                continue;
            }
            let Some(counters) = record
                .validator_index
                .and_then(|index| performance.performance_of(index))
            else {
                continue;
            };
            if counters.opportunities() == 0 || counters.successful_proposals >= threshold {
                continue;
            }
            if remaining <= 1 {
                warn!(validator = %pool, "Skipping eviction of the last active validator");
                break;
            }

            self.set_status(&pool, ValidatorStatus::PendingInactive);
            self.pending_inactive.push(pool);
            remaining -= 1;
            evicted.push(pool);

            warn!(
                validator = %pool,
                successful = counters.successful_proposals,
                failed = counters.failed_proposals,
                threshold,
                "Evicting underperforming validator"
            );
            ctx.events.emit(SystemEvent::ValidatorEvicted {
                validator: pool,
                successful_proposals: counters.successful_proposals,
                failed_proposals: counters.failed_proposals,
            });
        }

        Ok(evicted)
    }

    /// Computes the next epoch pass without applying it.
    pub fn plan_epoch(
        &self,
        staking: &dyn StakeRegistry,
        now_us: u64,
        config: &ValidatorConfig,
    ) -> EpochPlan {
        let mut plan = EpochPlan {
            demoted: self.pending_inactive.clone(),
            ..EpochPlan::default()
        };

        let budget = config.admission_budget(self.total_voting_power);
        let mut admitted: VotingPower = 0;

        for pool in &self.pending_active {
            let power = staking.voting_power(pool, now_us);
            if power < config.minimum_bond {
                plan.dropped.push((*pool, power));
                continue;
            }
            if let Some(limit) = budget {
                let remaining = limit.saturating_sub(admitted);
                if power > remaining {
                    plan.deferred.push((*pool, power, remaining));
                    continue;
                }
            }
            admitted = admitted.saturating_add(power);
            plan.promoted.push((*pool, power));
        }

        plan
    }

    /// The validator set the next epoch pass would produce, with current
    /// voting powers. Used as the DKG target set.
    pub fn next_validator_set(
        &self,
        staking: &dyn StakeRegistry,
        now_us: u64,
        config: &ValidatorConfig,
    ) -> Vec<ValidatorConsensusInfo> {
        let plan = self.plan_epoch(staking, now_us, config);
        self.active
            .iter()
            .filter(|pool| !plan.demoted.contains(pool))
            .chain(plan.promoted.iter().map(|(pool, _)| pool))
            .filter_map(|pool| self.validators.get(pool))
            .enumerate()
            .map(|(index, record)| {
                record.consensus_info(index as u64, staking.voting_power(&record.validator, now_us))
            })
            .collect()
    }

    /// Renews the lockup of every validator in the active array.
    ///
    /// Runs at each transition start as well as in the epoch pass, so a halt
    /// longer than the lockup does not announce a zero-power target set.
    pub(crate) fn renew_lockups(
        &self,
        staking: &mut dyn StakeRegistry,
        now_us: u64,
    ) -> ValidatorSetResult<()> {
        for pool in &self.active {
            staking.renew_lockup(pool, now_us)?;
        }
        Ok(())
    }

    /// The epoch-boundary lifecycle pass. Orchestrator only.
    pub fn on_new_epoch(
        &mut self,
        caller: Address,
        ctx: &mut ValidatorSetContext<'_>,
    ) -> ValidatorSetResult<()> {
        ensure_caller(caller, RECONFIGURATION_ADDR, "on_new_epoch")?;
        self.ensure_initialized()?;

        let now_us = ctx.now_us;
        let plan = self.plan_epoch(&*ctx.staking, now_us, ctx.config);

        // (1) demote leavers
        for pool in &plan.demoted {
            if let Some(record) = self.validators.get_mut(pool) {
                record.status = ValidatorStatus::Inactive;
                record.validator_index = None;
                record.bond = 0;
            }
            info!(validator = %pool, "Validator deactivated");
            ctx.events
                .emit(SystemEvent::ValidatorDeactivated { validator: *pool });
        }
        self.active.retain(|pool| !plan.demoted.contains(pool));
        self.pending_inactive.clear();

        // (2) promote within the admission budget
        for (pool, voting_power) in &plan.promoted {
            if let Some(record) = self.validators.get_mut(pool) {
                record.status = ValidatorStatus::Active;
                record.bond = *voting_power;
            }
            self.active.push(*pool);
            info!(validator = %pool, voting_power, "Validator activated");
            ctx.events.emit(SystemEvent::ValidatorActivated {
                validator: *pool,
                voting_power: *voting_power,
            });
        }
        for (pool, voting_power) in &plan.dropped {
            self.set_status(pool, ValidatorStatus::Inactive);
            warn!(
                validator = %pool,
                voting_power,
                minimum = ctx.config.minimum_bond,
                "Pending validator fell below minimum bond"
            );
            ctx.events
                .emit(SystemEvent::ValidatorDeactivated { validator: *pool });
        }
        for (pool, voting_power, remaining_budget) in &plan.deferred {
            warn!(
                validator = %pool,
                voting_power,
                remaining_budget,
                "Admission deferred by voting power increase limit"
            );
            ctx.events.emit(SystemEvent::ValidatorAdmissionDeferred {
                validator: *pool,
                voting_power: *voting_power,
                remaining_budget: *remaining_budget,
            });
        }
        self.pending_active
            .retain(|pool| plan.deferred.iter().any(|(deferred, _, _)| deferred == pool));

        // (3) keep voting power from lapsing mid-epoch
        self.renew_lockups(&mut *ctx.staking, now_us)?;

        // (4) staged fee recipients, (5) owner / operator resync
        for record in self.validators.values_mut() {
            if let Some(fee_recipient) = record.pending_fee_recipient.take() {
                record.fee_recipient = fee_recipient;
                ctx.events.emit(SystemEvent::FeeRecipientUpdated {
                    validator: record.validator,
                    fee_recipient,
                    applied: true,
                });
            }
            if ctx.staking.pool_exists(&record.validator) {
                record.owner = ctx.staking.owner_of(&record.validator)?;
                record.operator = ctx.staking.operator_of(&record.validator)?;
            }
        }

        // (6) contiguous indices, (7) totals
        let mut total: VotingPower = 0;
        for (index, pool) in self.active.iter().enumerate() {
            let power = ctx.staking.voting_power(pool, now_us);
            if let Some(record) = self.validators.get_mut(pool) {
                record.validator_index = Some(index as u64);
                record.bond = power;
            }
            total = total.saturating_add(power);
        }
        self.total_voting_power = total;
        self.current_epoch += 1;

        info!(
            epoch = self.current_epoch,
            active = self.active.len(),
            pending_active = self.pending_active.len(),
            total_voting_power = total,
            "Validator epoch pass complete"
        );
        ctx.events.emit(SystemEvent::ValidatorSetUpdated {
            epoch: self.current_epoch,
            active_count: self.active.len() as u64,
            total_voting_power: total,
        });
        Ok(())
    }

    // ------------------------------------------------------------------
    // Views
    // ------------------------------------------------------------------

    /// Whether genesis initialization ran.
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Record for `pool`.
    pub fn get_validator(&self, pool: &Address) -> Option<&ValidatorRecord> {
        self.validators.get(pool)
    }

    /// Status of `pool`; Inactive for unknown pools.
    pub fn status_of(&self, pool: &Address) -> ValidatorStatus {
        self.validators
            .get(pool)
            .map(|r| r.status)
            .unwrap_or_default()
    }

    /// Every record, ordered by pool address.
    pub fn validators(&self) -> impl Iterator<Item = &ValidatorRecord> {
        self.validators.values()
    }

    /// Consensus view of the current active set, in index order, with the
    /// voting powers fixed at the last epoch pass.
    pub fn get_active_validators(&self) -> Vec<ValidatorConsensusInfo> {
        self.active
            .iter()
            .enumerate()
            .filter_map(|(index, pool)| {
                self.validators
                    .get(pool)
                    .map(|record| record.consensus_info(index as u64, record.bond))
            })
            .collect()
    }

    /// Active array (index = position).
    pub fn active_validators(&self) -> &[Address] {
        &self.active
    }

    /// Pending-active queue.
    pub fn pending_active(&self) -> &[Address] {
        &self.pending_active
    }

    /// Pending-inactive queue.
    pub fn pending_inactive(&self) -> &[Address] {
        &self.pending_inactive
    }

    /// Pool at active index `index`.
    pub fn validator_by_index(&self, index: u64) -> Option<Address> {
        self.active.get(usize::try_from(index).ok()?).copied()
    }

    /// Number of validators in the active array.
    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Total voting power recorded at the last epoch pass.
    pub fn total_voting_power(&self) -> VotingPower {
        self.total_voting_power
    }

    /// Number of epoch passes run.
    pub fn current_epoch(&self) -> Epoch {
        self.current_epoch
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn ensure_initialized(&self) -> ValidatorSetResult<()> {
        if self.initialized {
            Ok(())
        } else {
            Err(ValidatorSetError::NotInitialized)
        }
    }

    fn ensure_set_change_allowed(&self, ctx: &ValidatorSetContext<'_>) -> ValidatorSetResult<()> {
        self.ensure_initialized()?;
        if ctx.transition_in_progress {
            return Err(ValidatorSetError::TransitionInProgress);
        }
        if !ctx.config.allow_validator_set_change {
            return Err(ValidatorSetError::ValidatorSetChangeDisabled);
        }
        Ok(())
    }

    /// Active validators not already leaving.
    fn remaining_active_count(&self) -> usize {
        self.active.len() - self.pending_inactive.len()
    }

    fn record(&self, pool: &Address) -> ValidatorSetResult<&ValidatorRecord> {
        self.validators
            .get(pool)
            .ok_or(ValidatorSetError::ValidatorNotFound { validator: *pool })
    }

    fn record_mut(&mut self, pool: &Address) -> ValidatorSetResult<&mut ValidatorRecord> {
        self.validators
            .get_mut(pool)
            .ok_or(ValidatorSetError::ValidatorNotFound { validator: *pool })
    }

    fn set_status(&mut self, pool: &Address, status: ValidatorStatus) {
        if let Some(record) = self.validators.get_mut(pool) {
            record.status = status;
        }
    }

    fn require_minimum_power(
        &self,
        pool: &Address,
        ctx: &ValidatorSetContext<'_>,
    ) -> ValidatorSetResult<VotingPower> {
        let voting_power = ctx.staking.voting_power(pool, ctx.now_us);
        if voting_power < ctx.config.minimum_bond {
            return Err(ValidatorSetError::InsufficientVotingPower {
                validator: *pool,
                voting_power,
                minimum: ctx.config.minimum_bond,
            });
        }
        Ok(voting_power)
    }

    fn insert_record(
        &mut self,
        params: RegistrationParams,
        ctx: &mut ValidatorSetContext<'_>,
    ) -> ValidatorSetResult<()> {
        if self.validators.contains_key(&params.pool) {
            return Err(ValidatorSetError::AlreadyRegistered {
                validator: params.pool,
            });
        }
        params.validate()?;

        let owner = ctx.staking.owner_of(&params.pool)?;
        let operator = ctx.staking.operator_of(&params.pool)?;
        let record = ValidatorRecord {
            validator: params.pool,
            moniker: params.moniker,
            status: ValidatorStatus::Inactive,
            validator_index: None,
            bond: 0,
            consensus_pubkey: params.consensus_pubkey,
            consensus_pop: params.consensus_pop,
            network_addresses: params.network_addresses,
            fullnode_addresses: params.fullnode_addresses,
            fee_recipient: params.fee_recipient.unwrap_or(owner),
            pending_fee_recipient: None,
            owner,
            operator,
            registered_at_us: ctx.now_us,
        };

        info!(validator = %record.validator, moniker = %record.moniker, "Validator registered");
        ctx.events.emit(SystemEvent::ValidatorRegistered {
            validator: record.validator,
            moniker: record.moniker.clone(),
        });
        self.validators.insert(record.validator, record);
        Ok(())
    }
}

fn ensure_operator(
    caller: Address,
    pool: &Address,
    staking: &dyn StakeRegistry,
) -> ValidatorSetResult<()> {
    let operator = staking.operator_of(pool)?;
    if caller != operator {
        return Err(ValidatorSetError::NotOperator {
            validator: *pool,
            caller,
            operator,
        });
    }
    Ok(())
}

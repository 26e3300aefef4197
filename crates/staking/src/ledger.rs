//! Stake pools and the voting-power oracle.

use std::collections::BTreeMap;

use alloy_primitives::Address;
use epochcore_config::{StakingConfig, ValidatorConfig};
use epochcore_core::{StakeRegistry, StakingError, StakingResult};
use epochcore_types::{derive_pool_address, ValidatorStatus, VotingPower};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Registry parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakingParams {
    /// Minimum stake to open a pool
    pub minimum_stake: u128,
    /// Voting power cap per pool
    pub maximum_bond: u128,
    /// Lockup granted by staking or renewal, in microseconds
    pub lockup_duration_micros: u64,
}

impl StakingParams {
    /// Parameters from the `[validator]` and `[staking]` config sections.
    pub fn from_config(validator: &ValidatorConfig, staking: &StakingConfig) -> Self {
        Self {
            minimum_stake: staking.minimum_stake,
            maximum_bond: validator.maximum_bond,
            lockup_duration_micros: staking.lockup_duration_micros,
        }
    }
}

/// One stake pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakePool {
    /// Owner; controls stake and operator
    pub owner: Address,
    /// Operator; manages the validator
    pub operator: Address,
    /// Bonded stake
    pub stake: u128,
    /// Total amount moved out of bonded stake
    pub unbonding: u128,
    /// Lockup expiry in microseconds
    pub locked_until_us: u64,
}

/// In-memory stake registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakingLedger {
    params: StakingParams,
    pools: BTreeMap<Address, StakePool>,
    /// Next pool nonce per owner
    nonces: BTreeMap<Address, u64>,
}

impl StakingLedger {
    /// Creates an empty registry.
    pub fn new(params: StakingParams) -> Self {
        Self {
            params,
            pools: BTreeMap::new(),
            nonces: BTreeMap::new(),
        }
    }

    /// Registry parameters.
    pub fn params(&self) -> &StakingParams {
        &self.params
    }

    /// Looks up a pool.
    pub fn pool(&self, pool: &Address) -> Option<&StakePool> {
        self.pools.get(pool)
    }

    /// Number of pools.
    pub fn pool_count(&self) -> usize {
        self.pools.len()
    }

    /// Opens a new pool for `owner` and returns its address.
    pub fn create_pool(
        &mut self,
        owner: Address,
        operator: Address,
        amount: u128,
        now_us: u64,
    ) -> StakingResult<Address> {
        if amount < self.params.minimum_stake {
            return Err(StakingError::StakeBelowMinimum {
                amount,
                minimum: self.params.minimum_stake,
            });
        }

        let nonce = self.nonces.get(&owner).copied().unwrap_or(0);
        let pool = derive_pool_address(&owner, nonce);
        if self.pools.contains_key(&pool) {
            return Err(StakingError::PoolAlreadyExists { pool });
        }

        self.pools.insert(
            pool,
            StakePool {
                owner,
                operator,
                stake: amount,
                unbonding: 0,
                locked_until_us: now_us.saturating_add(self.params.lockup_duration_micros),
            },
        );
        self.nonces.insert(owner, nonce + 1);

        info!(pool = %pool, owner = %owner, operator = %operator, amount, "Stake pool created");
        Ok(pool)
    }

    /// Adds stake to a pool and extends its lockup.
    pub fn add_stake(
        &mut self,
        caller: Address,
        pool: &Address,
        amount: u128,
        now_us: u64,
    ) -> StakingResult<u128> {
        if amount == 0 {
            return Err(StakingError::ZeroAmount);
        }
        let lockup = self.params.lockup_duration_micros;
        let entry = self.owned_pool_mut(caller, pool)?;

        entry.stake = entry
            .stake
            .checked_add(amount)
            .ok_or(StakingError::Overflow { pool: *pool })?;
        entry.locked_until_us = entry.locked_until_us.max(now_us.saturating_add(lockup));

        debug!(pool = %pool, amount, stake = entry.stake, "Stake added");
        Ok(entry.stake)
    }

    /// Replaces the pool operator.
    pub fn set_operator(
        &mut self,
        caller: Address,
        pool: &Address,
        operator: Address,
    ) -> StakingResult<()> {
        let entry = self.owned_pool_mut(caller, pool)?;
        entry.operator = operator;
        info!(pool = %pool, operator = %operator, "Pool operator changed");
        Ok(())
    }

    /// Moves `amount` from bonded stake into unbonding.
    ///
    /// `status` is the pool's validator status and `minimum_bond` the bond
    /// protected while the validator holds an index.
    pub fn unstake(
        &mut self,
        caller: Address,
        pool: &Address,
        amount: u128,
        status: ValidatorStatus,
        minimum_bond: u128,
    ) -> StakingResult<u128> {
        if amount == 0 {
            return Err(StakingError::ZeroAmount);
        }
        let entry = self.owned_pool_mut(caller, pool)?;

        let remaining = entry
            .stake
            .checked_sub(amount)
            .ok_or(StakingError::InsufficientStake {
                pool: *pool,
                requested: amount,
                available: entry.stake,
            })?;

        if status.holds_index() && remaining < minimum_bond {
            return Err(StakingError::BelowMinimumBond {
                pool: *pool,
                remaining,
                minimum: minimum_bond,
            });
        }

        entry.stake = remaining;
        entry.unbonding = entry.unbonding.saturating_add(amount);

        debug!(pool = %pool, amount, remaining, "Stake moved to unbonding");
        Ok(remaining)
    }

    fn owned_pool_mut(&mut self, caller: Address, pool: &Address) -> StakingResult<&mut StakePool> {
        let entry = self
            .pools
            .get_mut(pool)
            .ok_or(StakingError::PoolNotFound { pool: *pool })?;
        if entry.owner != caller {
            return Err(StakingError::NotOwner {
                pool: *pool,
                caller,
            });
        }
        Ok(entry)
    }
}

impl StakeRegistry for StakingLedger {
    fn pool_exists(&self, pool: &Address) -> bool {
        self.pools.contains_key(pool)
    }

    fn owner_of(&self, pool: &Address) -> StakingResult<Address> {
        self.pools
            .get(pool)
            .map(|p| p.owner)
            .ok_or(StakingError::PoolNotFound { pool: *pool })
    }

    fn operator_of(&self, pool: &Address) -> StakingResult<Address> {
        self.pools
            .get(pool)
            .map(|p| p.operator)
            .ok_or(StakingError::PoolNotFound { pool: *pool })
    }

    fn voting_power(&self, pool: &Address, at_us: u64) -> VotingPower {
        match self.pools.get(pool) {
            Some(p) if at_us < p.locked_until_us => p.stake.min(self.params.maximum_bond),
            _ => 0,
        }
    }

    fn renew_lockup(&mut self, pool: &Address, now_us: u64) -> StakingResult<u64> {
        let lockup = self.params.lockup_duration_micros;
        let entry = self
            .pools
            .get_mut(pool)
            .ok_or(StakingError::PoolNotFound { pool: *pool })?;
        entry.locked_until_us = entry.locked_until_us.max(now_us.saturating_add(lockup));
        Ok(entry.locked_until_us)
    }

    fn lockup_duration_micros(&self) -> u64 {
        self.params.lockup_duration_micros
    }
}

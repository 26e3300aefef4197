//! Voting-power oracle backed by stake pools.

use alloy_primitives::Address;
use epochcore_types::VotingPower;
use thiserror::Error;

/// Errors raised by the stake registry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StakingError {
    /// The pool does not exist.
    #[error("stake pool {pool} not found")]
    PoolNotFound {
        /// Pool address
        pool: Address,
    },

    /// A pool already exists at this address.
    #[error("stake pool {pool} already exists")]
    PoolAlreadyExists {
        /// Pool address
        pool: Address,
    },

    /// Only the pool owner may perform this operation.
    #[error("caller {caller} is not the owner of pool {pool}")]
    NotOwner {
        /// Pool address
        pool: Address,
        /// Rejected caller
        caller: Address,
    },

    /// Zero amounts are rejected.
    #[error("amount must be non-zero")]
    ZeroAmount,

    /// Initial stake is below the registry minimum.
    #[error("stake {amount} is below the minimum stake {minimum}")]
    StakeBelowMinimum {
        /// Offered stake
        amount: u128,
        /// Required minimum
        minimum: u128,
    },

    /// Not enough stake to withdraw.
    #[error("pool {pool} has {available} staked, cannot unstake {requested}")]
    InsufficientStake {
        /// Pool address
        pool: Address,
        /// Requested amount
        requested: u128,
        /// Currently staked
        available: u128,
    },

    /// Unstaking would leave an active validator below the minimum bond.
    #[error("unstaking would leave pool {pool} with {remaining}, below the minimum bond {minimum}")]
    BelowMinimumBond {
        /// Pool address
        pool: Address,
        /// Stake that would remain
        remaining: u128,
        /// Protected minimum
        minimum: u128,
    },

    /// Amount arithmetic overflowed.
    #[error("stake overflow in pool {pool}")]
    Overflow {
        /// Pool address
        pool: Address,
    },
}

/// Result type for staking operations.
pub type StakingResult<T> = Result<T, StakingError>;

/// The staking collaborator as seen by the validator set manager.
pub trait StakeRegistry {
    /// Returns true if a pool exists at `pool`.
    fn pool_exists(&self, pool: &Address) -> bool;

    /// Current owner of the pool.
    fn owner_of(&self, pool: &Address) -> StakingResult<Address>;

    /// Current operator of the pool.
    fn operator_of(&self, pool: &Address) -> StakingResult<Address>;

    /// Admissible voting power of `pool` at `at_us`, already capped at the
    /// configured maximum bond. Unknown pools have zero power.
    fn voting_power(&self, pool: &Address, at_us: u64) -> VotingPower;

    /// Extends the pool's lockup so its voting power stays valid through the
    /// next epoch. Returns the new lockup expiry.
    fn renew_lockup(&mut self, pool: &Address, now_us: u64) -> StakingResult<u64>;

    /// Lockup granted by a renewal, in microseconds.
    fn lockup_duration_micros(&self) -> u64;
}

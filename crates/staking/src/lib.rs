//! # Epoch Core Staking
//!
//! In-memory stake registry backing the voting-power oracle.
//!
//! Each validator identity is a stake pool with an owner, an operator, a
//! bonded amount and a lockup expiry. Voting power is the bonded amount while
//! the lockup is live, capped at the configured maximum bond. The validator
//! set manager renews lockups for active validators at every transition start
//! and epoch pass.
//!
//! The registry also guards the minimum-bond invariant: stake cannot be
//! withdrawn from a pool whose validator is Active or PendingInactive if that
//! would leave it below the minimum bond.
//!
//! ## Example
//!
//! ```rust
//! use alloy_primitives::Address;
//! use epochcore_core::StakeRegistry;
//! use epochcore_staking::{StakingLedger, StakingParams};
//!
//! let mut ledger = StakingLedger::new(StakingParams {
//!     minimum_stake: 10,
//!     maximum_bond: 1_000,
//!     lockup_duration_micros: 100,
//! });
//! let owner = Address::repeat_byte(1);
//! let pool = ledger.create_pool(owner, owner, 5_000, 0).unwrap();
//!
//! // Capped at the maximum bond while locked, zero once the lockup lapses.
//! assert_eq!(ledger.voting_power(&pool, 50), 1_000);
//! assert_eq!(ledger.voting_power(&pool, 100), 0);
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod ledger;

pub use ledger::{StakePool, StakingLedger, StakingParams};

//! # Epoch Core Types
//!
//! Shared type definitions for the epoch management core.
//!
//! This crate provides the types passed between the orchestrator, the block
//! prologue, the validator set manager and the DKG session manager:
//! - [`address`] - well-known system caller identities and address derivation
//! - [`ValidatorRecord`] and [`ValidatorStatus`] - per-validator lifecycle state
//! - [`ValidatorConsensusInfo`] - the consensus-facing view of an active validator
//! - [`DkgSessionInfo`] and [`DkgSessionMetadata`] - persisted vs. announced DKG sessions
//! - [`SystemEvent`] - notifications emitted by the core
//!
//! ## Example
//!
//! ```rust
//! use epochcore_types::{address, ensure_caller};
//!
//! // Only the block prologue may poll the orchestrator.
//! assert!(ensure_caller(address::BLOCK_ADDR, address::BLOCK_ADDR, "check_and_start_transition").is_ok());
//! assert!(ensure_caller(address::GOVERNANCE_ADDR, address::BLOCK_ADDR, "check_and_start_transition").is_err());
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod access;
pub mod address;
pub mod dkg;
pub mod event;
pub mod validator;

pub use access::{ensure_any_caller, ensure_caller, AccessError};
pub use address::{consensus_account_address, derive_pool_address};
pub use dkg::{DkgSessionInfo, DkgSessionMetadata, RandomnessVariant};
pub use event::SystemEvent;
pub use validator::{
    ValidatorConsensusInfo, ValidatorRecord, ValidatorStatus, BLS_POP_LENGTH,
    BLS_PUBKEY_LENGTH, MAX_MONIKER_LENGTH,
};

/// Re-export alloy primitives for convenience
pub use alloy_primitives::{Address, Bytes, B256};

/// Epoch number
pub type Epoch = u64;

/// Consensus weight of a validator, in base stake units
pub type VotingPower = u128;

/// Proposer index used by the execution runtime for blocks with no real proposer.
pub const NIL_PROPOSER_INDEX: u64 = u64::MAX;

//! # Epoch Core - Collaborator Abstractions
//!
//! This crate defines the interfaces the epoch management core consumes from
//! its surroundings:
//!
//! - **Time**: a monotonically non-decreasing microsecond clock
//! - **Staking**: the voting-power oracle backed by stake pools
//! - **Performance**: per-validator proposal counters
//!
//! # Design Philosophy
//!
//! 1. **Trait-based seams**: the core depends on these traits rather than on
//!    concrete collaborators, so tests can drive it with mocks.
//!
//! 2. **Synchronous**: execution is single-threaded and strictly sequential
//!    per block. There are no suspension points inside the core.
//!
//! 3. **Object safe**: components receive collaborators as `&dyn` / `&mut dyn`.
//!
//! | Collaborator | Trait | Default Impl |
//! |--------------|-------|--------------|
//! | Time | `TimeSource` | `epochcore_consensus::Timestamp` |
//! | Staking | `StakeRegistry` | `epochcore_staking::StakingLedger` |
//! | Performance | `PerformanceStore` | `epochcore_consensus::PerformanceTracker` |

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]

pub mod traits;

pub use traits::{
    // Performance
    PerformanceStore, ProposalCounters,
    // Staking
    StakeRegistry, StakingError, StakingResult,
    // Time
    TimeError, TimeResult, TimeSource,
};

//! Collaborator traits for the epoch management core.
//!
//! Other crates depend on these traits rather than concrete implementations.
//!
//! ```ignore
//! use epochcore_core::traits::{StakeRegistry, TimeSource};
//!
//! fn admissible_power(staking: &dyn StakeRegistry, time: &dyn TimeSource, pool: &Address) -> u128 {
//!     staking.voting_power(pool, time.now_microseconds())
//! }
//! ```

mod performance;
mod staking;
mod time;

pub use performance::*;
pub use staking::*;
pub use time::*;

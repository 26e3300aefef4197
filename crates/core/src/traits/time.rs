//! Global time source.

use alloy_primitives::Address;
use epochcore_types::address::SYSTEM_CALLER;
use thiserror::Error;

/// Microseconds per second.
pub const MICROS_PER_SECOND: u64 = 1_000_000;

/// Errors raised when a block timestamp violates the clock contract.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TimeError {
    /// A block with a real proposer must strictly advance time.
    #[error("timestamp {proposed} does not advance current time {current}")]
    NotAdvanced {
        /// Current global time
        current: u64,
        /// Timestamp carried by the block
        proposed: u64,
    },

    /// A NIL block must keep time unchanged.
    #[error("NIL block timestamp {proposed} differs from current time {current}")]
    NilBlockChangedTime {
        /// Current global time
        current: u64,
        /// Timestamp carried by the block
        proposed: u64,
    },
}

/// Result type for time operations.
pub type TimeResult<T> = Result<T, TimeError>;

/// Monotonically non-decreasing microsecond clock.
pub trait TimeSource {
    /// Current global time in microseconds.
    fn now_microseconds(&self) -> u64;

    /// Current global time in whole seconds.
    fn now_seconds(&self) -> u64 {
        self.now_microseconds() / MICROS_PER_SECOND
    }

    /// Applies a block timestamp.
    ///
    /// Blocks proposed by [`SYSTEM_CALLER`] are NIL blocks and must carry the
    /// current time unchanged; every other block must strictly advance it.
    fn update_global_time(&mut self, proposer: Address, timestamp_us: u64) -> TimeResult<()>;
}

/// Checks a block timestamp against the clock contract without applying it.
pub fn check_block_timestamp(current: u64, proposer: Address, proposed: u64) -> TimeResult<()> {
    if proposer == SYSTEM_CALLER {
        if proposed != current {
            return Err(TimeError::NilBlockChangedTime { current, proposed });
        }
    } else if proposed <= current {
        return Err(TimeError::NotAdvanced { current, proposed });
    }
    Ok(())
}

//! Global on-chain clock.

use alloy_primitives::Address;
use epochcore_core::traits::check_block_timestamp;
use epochcore_core::{TimeResult, TimeSource};
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Microsecond clock advanced once per block by the block prologue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timestamp {
    microseconds: u64,
}

impl Timestamp {
    /// Clock starting at `microseconds`.
    pub fn new(microseconds: u64) -> Self {
        Self { microseconds }
    }
}

impl TimeSource for Timestamp {
    fn now_microseconds(&self) -> u64 {
        self.microseconds
    }

    fn update_global_time(&mut self, proposer: Address, timestamp_us: u64) -> TimeResult<()> {
        check_block_timestamp(self.microseconds, proposer, timestamp_us)?;
        trace!(from = self.microseconds, to = timestamp_us, "Global time updated");
        self.microseconds = timestamp_us;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use epochcore_core::TimeError;
    use epochcore_types::address::SYSTEM_CALLER;

    #[test]
    fn test_normal_blocks_strictly_advance() {
        let proposer = Address::repeat_byte(1);
        let mut time = Timestamp::new(100);
        time.update_global_time(proposer, 101).unwrap();
        assert_eq!(time.now_microseconds(), 101);

        assert_eq!(
            time.update_global_time(proposer, 101),
            Err(TimeError::NotAdvanced {
                current: 101,
                proposed: 101
            })
        );
        assert_eq!(time.now_microseconds(), 101);
    }

    #[test]
    fn test_nil_blocks_keep_time() {
        let mut time = Timestamp::new(5_000_000);
        time.update_global_time(SYSTEM_CALLER, 5_000_000).unwrap();
        assert_eq!(time.now_seconds(), 5);
        assert!(time.update_global_time(SYSTEM_CALLER, 5_000_001).is_err());
    }
}

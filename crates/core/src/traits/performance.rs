//! Per-validator proposal counters.

/// Success / failure counts for one validator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProposalCounters {
    /// Blocks this validator proposed
    pub successful_proposals: u64,
    /// Rounds this validator failed to propose
    pub failed_proposals: u64,
}

impl ProposalCounters {
    /// Total proposal opportunities.
    pub fn opportunities(&self) -> u64 {
        self.successful_proposals.saturating_add(self.failed_proposals)
    }
}

/// Proposal outcome store, indexed by active-set position.
///
/// Counters cover the current epoch only and are resized to the new active
/// count at every transition.
pub trait PerformanceStore {
    /// Records a block outcome. `proposer_index` is `None` for NIL blocks.
    /// Indices outside the tracked range are ignored.
    fn record(&mut self, proposer_index: Option<u64>, failed_proposer_indices: &[u64]);

    /// Zeroes all counters and sizes them for `active_count` validators.
    fn reset_for_epoch(&mut self, active_count: usize);

    /// Counters for the validator at `index`, if tracked.
    fn performance_of(&self, index: u64) -> Option<ProposalCounters>;

    /// Number of tracked validators.
    fn tracked_validators(&self) -> usize;
}

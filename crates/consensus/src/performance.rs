//! # Proposer Performance Tracker
//!
//! Counts successful and failed proposals per active-set index for the
//! current epoch. The block prologue records every block outcome; the
//! orchestrator reads the counters during auto-eviction and then resets them,
//! sized to the new active count, once per transition.
//!
//! The tracker keeps a short history of per-epoch summaries so operators can
//! inspect how previous epochs went after the counters were reset.
//!
//! ## Example
//!
//! ```rust,ignore
//! use epochcore_consensus::performance::PerformanceTracker;
//! use epochcore_core::PerformanceStore;
//!
//! let mut tracker = PerformanceTracker::new(4);
//!
//! // Validator 0 proposed; validators 2 and 3 missed their rounds.
//! tracker.record(Some(0), &[2, 3]);
//!
//! let counters = tracker.performance_of(2).unwrap();
//! assert_eq!(counters.failed_proposals, 1);
//!
//! // New epoch with five validators
//! tracker.reset_for_epoch(5);
//! assert_eq!(tracker.tracked_validators(), 5);
//! ```

use epochcore_core::{PerformanceStore, ProposalCounters};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

/// Number of epoch summaries retained.
pub const MAX_HISTORY_EPOCHS: usize = 10;

/// Counters for one validator index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndividualPerformance {
    /// Blocks proposed
    pub successful_proposals: u64,
    /// Rounds missed
    pub failed_proposals: u64,
}

impl IndividualPerformance {
    /// Fraction of opportunities that produced a block (1.0 with no opportunities).
    pub fn success_ratio(&self) -> f64 {
        let total = self.successful_proposals + self.failed_proposals;
        if total == 0 {
            1.0
        } else {
            self.successful_proposals as f64 / total as f64
        }
    }
}

impl From<IndividualPerformance> for ProposalCounters {
    fn from(p: IndividualPerformance) -> Self {
        ProposalCounters {
            successful_proposals: p.successful_proposals,
            failed_proposals: p.failed_proposals,
        }
    }
}

/// Summary of one finished epoch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochPerformance {
    /// Sequence number of the reset that closed the epoch
    pub sequence: u64,
    /// Validators tracked during the epoch
    pub validators: usize,
    /// Blocks proposed by tracked validators
    pub successful_proposals: u64,
    /// Rounds missed by tracked validators
    pub failed_proposals: u64,
    /// Blocks without a real proposer
    pub nil_blocks: u64,
}

/// Per-index proposal counters for the current epoch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceTracker {
    validators: Vec<IndividualPerformance>,
    nil_blocks: u64,
    resets: u64,
    history: Vec<EpochPerformance>,
}

impl PerformanceTracker {
    /// Tracker sized for `active_count` validators.
    pub fn new(active_count: usize) -> Self {
        Self {
            validators: vec![IndividualPerformance::default(); active_count],
            nil_blocks: 0,
            resets: 0,
            history: Vec::new(),
        }
    }

    /// Counters for every tracked index.
    pub fn validators(&self) -> &[IndividualPerformance] {
        &self.validators
    }

    /// NIL blocks seen this epoch.
    pub fn nil_blocks(&self) -> u64 {
        self.nil_blocks
    }

    /// Summaries of previous epochs, oldest first.
    pub fn history(&self) -> &[EpochPerformance] {
        &self.history
    }

    /// Aggregate of the current epoch.
    pub fn current_summary(&self) -> EpochPerformance {
        EpochPerformance {
            sequence: self.resets,
            validators: self.validators.len(),
            successful_proposals: self.validators.iter().map(|v| v.successful_proposals).sum(),
            failed_proposals: self.validators.iter().map(|v| v.failed_proposals).sum(),
            nil_blocks: self.nil_blocks,
        }
    }

    fn prune_history(&mut self) {
        if self.history.len() > MAX_HISTORY_EPOCHS {
            let excess = self.history.len() - MAX_HISTORY_EPOCHS;
            self.history.drain(..excess);
        }
    }
}

impl Default for PerformanceTracker {
    fn default() -> Self {
        Self::new(0)
    }
}

impl PerformanceStore for PerformanceTracker {
    fn record(&mut self, proposer_index: Option<u64>, failed_proposer_indices: &[u64]) {
        match proposer_index {
            Some(index) => match self.validators.get_mut(index as usize) {
                Some(entry) => entry.successful_proposals += 1,
                None => trace!(index, "Proposer index outside tracked range"),
            },
            None => self.nil_blocks += 1,
        }

        for &index in failed_proposer_indices {
            match self.validators.get_mut(index as usize) {
                Some(entry) => entry.failed_proposals += 1,
                None => trace!(index, "Failed proposer index outside tracked range"),
            }
        }
    }

    fn reset_for_epoch(&mut self, active_count: usize) {
        let summary = self.current_summary();
        debug!(
            validators = summary.validators,
            successful = summary.successful_proposals,
            failed = summary.failed_proposals,
            nil_blocks = summary.nil_blocks,
            next_active_count = active_count,
            "Resetting proposer performance"
        );
        self.history.push(summary);
        self.prune_history();

        self.validators = vec![IndividualPerformance::default(); active_count];
        self.nil_blocks = 0;
        self.resets += 1;
    }

    fn performance_of(&self, index: u64) -> Option<ProposalCounters> {
        self.validators.get(index as usize).copied().map(Into::into)
    }

    fn tracked_validators(&self) -> usize {
        self.validators.len()
    }
}

//! DKG session records.
//!
//! A session exists in two shapes:
//! - [`DkgSessionMetadata`] is the announcement emitted when a session
//!   starts. It carries the full dealer and target sets so the off-ledger
//!   consensus engine can run the ceremony. It is never stored.
//! - [`DkgSessionInfo`] is the persisted record. It keeps only counts, the
//!   start time and the opaque transcript.

use alloy_primitives::Bytes;
use serde::{Deserialize, Serialize};

use crate::validator::ValidatorConsensusInfo;
use crate::Epoch;

/// Randomness configuration variant in effect for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RandomnessVariant {
    /// On-chain randomness disabled
    Off,
    /// Weighted threshold DKG with fast path
    #[default]
    V2,
}

/// Transient announcement of a newly started session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DkgSessionMetadata {
    /// Epoch whose validator set deals
    pub dealer_epoch: Epoch,
    /// Randomness variant in effect at start
    pub config_variant: RandomnessVariant,
    /// Current validator set
    pub dealer_validator_set: Vec<ValidatorConsensusInfo>,
    /// Projected next validator set
    pub target_validator_set: Vec<ValidatorConsensusInfo>,
}

/// Persisted session record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DkgSessionInfo {
    /// Epoch whose validator set deals
    pub dealer_epoch: Epoch,
    /// Randomness variant in effect at start
    pub config_variant: RandomnessVariant,
    /// Number of dealers
    pub dealer_count: u64,
    /// Number of targets
    pub target_count: u64,
    /// Start time in microseconds
    pub start_time_us: u64,
    /// Opaque transcript, empty until completion
    pub transcript: Bytes,
}

impl DkgSessionInfo {
    /// Persisted form of an announcement.
    pub fn from_metadata(metadata: &DkgSessionMetadata, start_time_us: u64) -> Self {
        Self {
            dealer_epoch: metadata.dealer_epoch,
            config_variant: metadata.config_variant,
            dealer_count: metadata.dealer_validator_set.len() as u64,
            target_count: metadata.target_validator_set.len() as u64,
            start_time_us,
            transcript: Bytes::new(),
        }
    }

    /// True once a transcript has been stored.
    pub fn is_complete(&self) -> bool {
        !self.transcript.is_empty()
    }
}

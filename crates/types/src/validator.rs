//! Validator lifecycle records.

use std::fmt;

use alloy_primitives::{Address, Bytes};
use serde::{Deserialize, Serialize};

use crate::VotingPower;

/// Maximum display-name length in bytes.
pub const MAX_MONIKER_LENGTH: usize = 31;

/// Length of a compressed BLS12-381 public key.
pub const BLS_PUBKEY_LENGTH: usize = 48;

/// Length of a BLS12-381 proof of possession.
pub const BLS_POP_LENGTH: usize = 96;

/// Lifecycle status of a validator.
///
/// ```text
/// Inactive --join--> PendingActive --epoch pass--> Active
///    ^                    |                          |
///    +------ cancel ------+                        leave
///    |                                               v
///    +------------- epoch pass ------------- PendingInactive
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ValidatorStatus {
    /// Registered but not part of the validator set
    #[default]
    Inactive,
    /// Waiting for the next epoch pass to be promoted
    PendingActive,
    /// Part of the active set
    Active,
    /// Leaving at the next epoch pass
    PendingInactive,
}

impl ValidatorStatus {
    /// True while the validator occupies an index in the active array.
    pub fn holds_index(self) -> bool {
        matches!(self, Self::Active | Self::PendingInactive)
    }
}

impl fmt::Display for ValidatorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Inactive => "inactive",
            Self::PendingActive => "pending_active",
            Self::Active => "active",
            Self::PendingInactive => "pending_inactive",
        };
        f.write_str(s)
    }
}

/// Persistent per-validator record, keyed by stake pool address.
///
/// Records are never destroyed, only deactivated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorRecord {
    /// Stake pool address (stable identity)
    pub validator: Address,
    /// Display name
    pub moniker: String,
    /// Lifecycle status
    pub status: ValidatorStatus,
    /// Position in the active array; `None` unless Active or PendingInactive
    pub validator_index: Option<u64>,
    /// Voting power recorded at the last epoch pass
    pub bond: VotingPower,
    /// BLS public key
    pub consensus_pubkey: Bytes,
    /// BLS proof of possession
    pub consensus_pop: Bytes,
    /// Validator network addresses
    pub network_addresses: Bytes,
    /// Fullnode network addresses
    pub fullnode_addresses: Bytes,
    /// Recipient of block fees
    pub fee_recipient: Address,
    /// Fee recipient taking effect at the next epoch pass
    pub pending_fee_recipient: Option<Address>,
    /// Cached pool owner, re-synced every epoch pass
    pub owner: Address,
    /// Cached pool operator, re-synced every epoch pass
    pub operator: Address,
    /// Registration time in microseconds
    pub registered_at_us: u64,
}

impl ValidatorRecord {
    /// Builds the consensus view of this record.
    ///
    /// `voting_power` is passed in because the view is computed for a given
    /// point in time, not from the last recorded bond.
    pub fn consensus_info(&self, index: u64, voting_power: VotingPower) -> ValidatorConsensusInfo {
        ValidatorConsensusInfo {
            validator: self.validator,
            consensus_pubkey: self.consensus_pubkey.clone(),
            consensus_pop: self.consensus_pop.clone(),
            voting_power,
            validator_index: index,
            network_addresses: self.network_addresses.clone(),
            fullnode_addresses: self.fullnode_addresses.clone(),
        }
    }
}

/// What consensus needs to know about one validator of a set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorConsensusInfo {
    /// Stake pool address
    pub validator: Address,
    /// BLS public key
    pub consensus_pubkey: Bytes,
    /// BLS proof of possession
    pub consensus_pop: Bytes,
    /// Voting power
    pub voting_power: VotingPower,
    /// Index in the set
    pub validator_index: u64,
    /// Validator network addresses
    pub network_addresses: Bytes,
    /// Fullnode network addresses
    pub fullnode_addresses: Bytes,
}

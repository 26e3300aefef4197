//! Notifications emitted by the core.

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};

use crate::dkg::{DkgSessionInfo, DkgSessionMetadata};
use crate::{Epoch, VotingPower};

/// Events emitted by the core components, in emission order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SystemEvent {
    /// A block prologue ran.
    NewBlock {
        /// Resolved proposer (the system caller for NIL blocks)
        proposer: Address,
        /// Epoch the block belongs to
        epoch: Epoch,
        /// Block timestamp in microseconds
        timestamp_us: u64,
        /// Indices of validators that failed to propose
        failed_proposer_indices: Vec<u64>,
    },
    /// The orchestrator left Idle and started a DKG session.
    EpochTransitionStarted {
        /// Epoch being closed
        epoch: Epoch,
        /// Trigger time in microseconds
        at_us: u64,
    },
    /// The orchestrator finished a transition.
    EpochTransitioned {
        /// Newly entered epoch
        new_epoch: Epoch,
        /// Completion time in microseconds
        at_us: u64,
        /// Whether a DKG transcript accompanied the completion
        with_transcript: bool,
    },
    /// A DKG session started; carries the full dealer and target sets.
    DkgStarted {
        /// Announcement payload
        metadata: DkgSessionMetadata,
        /// Start time in microseconds
        start_time_us: u64,
    },
    /// A DKG session completed with a transcript.
    DkgCompleted {
        /// The completed session
        session: DkgSessionInfo,
    },
    /// An incomplete DKG session was discarded.
    DkgSessionCleared {
        /// Dealer epoch of the discarded session
        dealer_epoch: Epoch,
    },
    /// A validator registered.
    ValidatorRegistered {
        /// Stake pool address
        validator: Address,
        /// Display name
        moniker: String,
    },
    /// A validator asked to join the set.
    ValidatorJoinRequested {
        /// Stake pool address
        validator: Address,
        /// Voting power at request time
        voting_power: VotingPower,
    },
    /// A pending-active validator withdrew its join request.
    ValidatorJoinCancelled {
        /// Stake pool address
        validator: Address,
    },
    /// An active validator asked to leave the set.
    ValidatorLeaveRequested {
        /// Stake pool address
        validator: Address,
    },
    /// A validator became active at an epoch pass.
    ValidatorActivated {
        /// Stake pool address
        validator: Address,
        /// Voting power admitted
        voting_power: VotingPower,
    },
    /// A validator became inactive at an epoch pass.
    ValidatorDeactivated {
        /// Stake pool address
        validator: Address,
    },
    /// A pending validator stayed pending because the admission budget ran out.
    ValidatorAdmissionDeferred {
        /// Stake pool address
        validator: Address,
        /// Voting power that did not fit
        voting_power: VotingPower,
        /// Budget left when it was considered
        remaining_budget: VotingPower,
    },
    /// An active validator was evicted for poor proposal performance.
    ValidatorEvicted {
        /// Stake pool address
        validator: Address,
        /// Successful proposals this epoch
        successful_proposals: u64,
        /// Failed proposals this epoch
        failed_proposals: u64,
    },
    /// A validator's consensus key was rotated.
    ConsensusKeyRotated {
        /// Stake pool address
        validator: Address,
    },
    /// A fee recipient change was staged or applied.
    FeeRecipientUpdated {
        /// Stake pool address
        validator: Address,
        /// New recipient
        fee_recipient: Address,
        /// False while staged, true once applied at an epoch pass
        applied: bool,
    },
    /// The epoch pass produced a new active set.
    ValidatorSetUpdated {
        /// Validator manager epoch after the pass
        epoch: Epoch,
        /// Active validators after the pass
        active_count: u64,
        /// Total voting power after the pass
        total_voting_power: VotingPower,
    },
    /// Staged on-chain configuration took effect.
    ConfigApplied {
        /// Name of the config that changed
        name: String,
    },
}

impl SystemEvent {
    /// Short event name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::NewBlock { .. } => "new_block",
            Self::EpochTransitionStarted { .. } => "epoch_transition_started",
            Self::EpochTransitioned { .. } => "epoch_transitioned",
            Self::DkgStarted { .. } => "dkg_started",
            Self::DkgCompleted { .. } => "dkg_completed",
            Self::DkgSessionCleared { .. } => "dkg_session_cleared",
            Self::ValidatorRegistered { .. } => "validator_registered",
            Self::ValidatorJoinRequested { .. } => "validator_join_requested",
            Self::ValidatorJoinCancelled { .. } => "validator_join_cancelled",
            Self::ValidatorLeaveRequested { .. } => "validator_leave_requested",
            Self::ValidatorActivated { .. } => "validator_activated",
            Self::ValidatorDeactivated { .. } => "validator_deactivated",
            Self::ValidatorAdmissionDeferred { .. } => "validator_admission_deferred",
            Self::ValidatorEvicted { .. } => "validator_evicted",
            Self::ConsensusKeyRotated { .. } => "consensus_key_rotated",
            Self::FeeRecipientUpdated { .. } => "fee_recipient_updated",
            Self::ValidatorSetUpdated { .. } => "validator_set_updated",
            Self::ConfigApplied { .. } => "config_applied",
        }
    }
}

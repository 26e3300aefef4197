//! # DKG Session Manager
//!
//! Bookkeeping for the distributed key generation ceremony that seeds the
//! next epoch's randomness. The ceremony itself runs off-ledger in the
//! consensus engine; this module only tracks which session is running and
//! stores the transcript the engine hands back.
//!
//! At most one session is in progress at any time. A completed session stays
//! available through [`DkgSessionManager::last_completed_session`] until the next one
//! completes.

use alloy_primitives::{Address, Bytes};
use epochcore_types::address::RECONFIGURATION_ADDR;
use epochcore_types::{
    ensure_caller, AccessError, DkgSessionInfo, DkgSessionMetadata, Epoch, SystemEvent,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::events::EventLog;

/// Errors raised by the DKG session manager.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DkgError {
    /// Caller is not the orchestrator.
    #[error(transparent)]
    Access(#[from] AccessError),

    /// A session is already running.
    #[error("DKG session for dealer epoch {dealer_epoch} already in progress")]
    SessionInProgress {
        /// Dealer epoch of the running session
        dealer_epoch: Epoch,
    },

    /// No session to finish.
    #[error("no DKG session in progress")]
    NoSessionInProgress,

    /// Completion without a transcript.
    #[error("DKG transcript is empty")]
    EmptyTranscript,
}

/// Result type for DKG operations.
pub type DkgResult<T> = Result<T, DkgError>;

/// In-progress and last completed session records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DkgSessionManager {
    in_progress: Option<DkgSessionInfo>,
    last_completed: Option<DkgSessionInfo>,
}

impl DkgSessionManager {
    /// Manager with no sessions.
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a session and announces it with the full dealer and target sets.
    pub fn start(
        &mut self,
        caller: Address,
        metadata: DkgSessionMetadata,
        start_time_us: u64,
        events: &mut EventLog,
    ) -> DkgResult<()> {
        ensure_caller(caller, RECONFIGURATION_ADDR, "start_dkg_session")?;
        if let Some(running) = &self.in_progress {
            return Err(DkgError::SessionInProgress {
                dealer_epoch: running.dealer_epoch,
            });
        }

        let session = DkgSessionInfo::from_metadata(&metadata, start_time_us);
        info!(
            dealer_epoch = session.dealer_epoch,
            variant = ?session.config_variant,
            dealers = session.dealer_count,
            targets = session.target_count,
            "DKG session started"
        );
        self.in_progress = Some(session);
        events.emit(SystemEvent::DkgStarted {
            metadata,
            start_time_us,
        });
        Ok(())
    }

    /// Stores the transcript and moves the session to last-completed.
    pub fn finish(
        &mut self,
        caller: Address,
        transcript: Bytes,
        events: &mut EventLog,
    ) -> DkgResult<()> {
        ensure_caller(caller, RECONFIGURATION_ADDR, "finish_dkg_session")?;
        if transcript.is_empty() {
            return Err(DkgError::EmptyTranscript);
        }
        let mut session = self.in_progress.take().ok_or(DkgError::NoSessionInProgress)?;
        session.transcript = transcript;

        info!(
            dealer_epoch = session.dealer_epoch,
            transcript_len = session.transcript.len(),
            "DKG session completed"
        );
        events.emit(SystemEvent::DkgCompleted {
            session: session.clone(),
        });
        self.last_completed = Some(session);
        Ok(())
    }

    /// Discards the in-progress session, if any.
    pub fn clear_incomplete(&mut self, caller: Address, events: &mut EventLog) -> DkgResult<()> {
        ensure_caller(caller, RECONFIGURATION_ADDR, "clear_incomplete_dkg_session")?;
        if let Some(session) = self.in_progress.take() {
            warn!(dealer_epoch = session.dealer_epoch, "Discarding incomplete DKG session");
            events.emit(SystemEvent::DkgSessionCleared {
                dealer_epoch: session.dealer_epoch,
            });
        }
        Ok(())
    }

    /// Whether a session is running.
    pub fn is_in_progress(&self) -> bool {
        self.in_progress.is_some()
    }

    /// The running session.
    pub fn in_progress_session(&self) -> Option<&DkgSessionInfo> {
        self.in_progress.as_ref()
    }

    /// The most recently completed session.
    pub fn last_completed_session(&self) -> Option<&DkgSessionInfo> {
        self.last_completed.as_ref()
    }

    /// Dealer epoch of the running session.
    pub fn dealer_epoch(&self) -> Option<Epoch> {
        self.in_progress.as_ref().map(|s| s.dealer_epoch)
    }
}

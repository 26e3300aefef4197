//! On-chain configuration with next-epoch staging.
//!
//! Governance stages new values at any time; they take effect only when the
//! orchestrator applies them as the first step of an epoch transition. The
//! core reads every parameter through [`OnChainConfigs`] rather than holding
//! its own copy.

use alloy_primitives::Address;
use epochcore_config::{Config, ConfigError, EpochConfig, RandomnessConfig, ValidatorConfig};
use epochcore_types::address::{GOVERNANCE_ADDR, RECONFIGURATION_ADDR};
use epochcore_types::{ensure_caller, AccessError, SystemEvent};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::events::EventLog;

/// Errors raised while staging or applying configuration.
#[derive(Debug, Error)]
pub enum ReconfigError {
    /// Caller is not allowed to stage or apply configuration.
    #[error(transparent)]
    Access(#[from] AccessError),

    /// The staged value failed validation.
    #[error("invalid {name} config: {source}")]
    Invalid {
        /// Config name
        name: &'static str,
        /// Validation failure
        #[source]
        source: ConfigError,
    },
}

/// Result type for configuration changes.
pub type ReconfigResult<T> = Result<T, ReconfigError>;

/// Active value plus an optional value staged for the next epoch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigBuffer<T> {
    current: T,
    pending: Option<T>,
}

impl<T: Clone> ConfigBuffer<T> {
    /// Buffer with `current` active and nothing staged.
    pub fn new(current: T) -> Self {
        Self {
            current,
            pending: None,
        }
    }

    /// Value in effect.
    pub fn current(&self) -> &T {
        &self.current
    }

    /// Value staged for the next epoch.
    pub fn pending(&self) -> Option<&T> {
        self.pending.as_ref()
    }

    /// Stages `value`, replacing any earlier staged value.
    pub fn set_for_next_epoch(&mut self, value: T) {
        self.pending = Some(value);
    }

    /// Promotes the staged value. Returns true if one was staged.
    pub fn apply_pending(&mut self) -> bool {
        match self.pending.take() {
            Some(value) => {
                self.current = value;
                true
            }
            None => false,
        }
    }
}

/// Every parameter set the core consumes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnChainConfigs {
    epoch: ConfigBuffer<EpochConfig>,
    validator: ConfigBuffer<ValidatorConfig>,
    randomness: ConfigBuffer<RandomnessConfig>,
}

impl OnChainConfigs {
    /// Configs with the given active values.
    pub fn new(epoch: EpochConfig, validator: ValidatorConfig, randomness: RandomnessConfig) -> Self {
        Self {
            epoch: ConfigBuffer::new(epoch),
            validator: ConfigBuffer::new(validator),
            randomness: ConfigBuffer::new(randomness),
        }
    }

    /// Configs taken from a loaded config file.
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.epoch,
            config.validator.clone(),
            config.randomness.clone(),
        )
    }

    /// Active epoch config.
    pub fn epoch(&self) -> &EpochConfig {
        self.epoch.current()
    }

    /// Active validator config.
    pub fn validator(&self) -> &ValidatorConfig {
        self.validator.current()
    }

    /// Active randomness config.
    pub fn randomness(&self) -> &RandomnessConfig {
        self.randomness.current()
    }

    /// Staged epoch config, if any.
    pub fn pending_epoch(&self) -> Option<&EpochConfig> {
        self.epoch.pending()
    }

    /// Staged validator config, if any.
    pub fn pending_validator(&self) -> Option<&ValidatorConfig> {
        self.validator.pending()
    }

    /// Staged randomness config, if any.
    pub fn pending_randomness(&self) -> Option<&RandomnessConfig> {
        self.randomness.pending()
    }

    /// Stages a new epoch config. Governance only.
    pub fn set_epoch_for_next_epoch(
        &mut self,
        caller: Address,
        config: EpochConfig,
    ) -> ReconfigResult<()> {
        ensure_caller(caller, GOVERNANCE_ADDR, "set_epoch_config")?;
        config
            .validate()
            .map_err(|source| ReconfigError::Invalid { name: "epoch", source })?;
        info!(epoch_interval_micros = config.epoch_interval_micros, "Epoch config staged");
        self.epoch.set_for_next_epoch(config);
        Ok(())
    }

    /// Stages a new validator config. Governance only.
    pub fn set_validator_for_next_epoch(
        &mut self,
        caller: Address,
        config: ValidatorConfig,
    ) -> ReconfigResult<()> {
        ensure_caller(caller, GOVERNANCE_ADDR, "set_validator_config")?;
        config
            .validate()
            .map_err(|source| ReconfigError::Invalid { name: "validator", source })?;
        info!(
            allow_validator_set_change = config.allow_validator_set_change,
            auto_evict_enabled = config.auto_evict_enabled,
            "Validator config staged"
        );
        self.validator.set_for_next_epoch(config);
        Ok(())
    }

    /// Stages a new randomness config. Governance only.
    pub fn set_randomness_for_next_epoch(
        &mut self,
        caller: Address,
        config: RandomnessConfig,
    ) -> ReconfigResult<()> {
        ensure_caller(caller, GOVERNANCE_ADDR, "set_randomness_config")?;
        config
            .validate()
            .map_err(|source| ReconfigError::Invalid { name: "randomness", source })?;
        info!(variant = ?config.variant, "Randomness config staged");
        self.randomness.set_for_next_epoch(config);
        Ok(())
    }

    /// Applies every staged value. Orchestrator only.
    pub fn apply_pending(&mut self, caller: Address, events: &mut EventLog) -> ReconfigResult<()> {
        ensure_caller(caller, RECONFIGURATION_ADDR, "apply_pending_configs")?;

        let applied = [
            ("epoch", self.epoch.apply_pending()),
            ("validator", self.validator.apply_pending()),
            ("randomness", self.randomness.apply_pending()),
        ];
        for (name, changed) in applied {
            if changed {
                info!(config = name, "Staged config applied");
                events.emit(SystemEvent::ConfigApplied {
                    name: name.to_string(),
                });
            }
        }
        Ok(())
    }
}

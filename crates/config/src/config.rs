//! Main configuration module for the epoch management core
//!
//! All settings are defined in one `epochcore.toml` file.

use crate::error::{ConfigError, ConfigResult};
use crate::genesis::GenesisConfig;
use epochcore_types::RandomnessVariant;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

/// One microsecond-denominated hour.
const HOUR_MICROS: u64 = 3_600 * 1_000_000;

/// One microsecond-denominated day.
const DAY_MICROS: u64 = 24 * HOUR_MICROS;

/// 1.0 in 64.64 fixed-point.
pub const FIXED_POINT_ONE: u128 = 1u128 << 64;

/// Main configuration struct.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Chain identity configuration
    pub chain: ChainConfig,

    /// Epoch timing
    pub epoch: EpochConfig,

    /// Validator admission and lifecycle parameters
    pub validator: ValidatorConfig,

    /// Staking parameters
    pub staking: StakingConfig,

    /// Randomness / DKG parameters
    pub randomness: RandomnessConfig,

    /// Logging configuration
    pub logging: LoggingConfig,

    /// Genesis validator set
    pub genesis: GenesisConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the TOML configuration file
    ///
    /// # Returns
    ///
    /// The parsed and validated configuration, or an error if loading fails.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        info!("Loading configuration from {:?}", path);

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: Config = toml::from_str(&content)?;

        debug!("Configuration parsed successfully, validating...");
        config.validate()?;

        info!(
            chain_id = config.chain.chain_id,
            genesis_validators = config.genesis.validators.len(),
            "Configuration loaded"
        );

        Ok(config)
    }

    /// Load configuration from a TOML string.
    ///
    /// Useful for testing or when configuration is provided as a string.
    pub fn from_str(content: &str) -> ConfigResult<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Render the configuration as TOML.
    pub fn to_toml_string(&self) -> ConfigResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Write the configuration to a TOML file.
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        let content = self.to_toml_string()?;
        std::fs::write(path, content).map_err(|e| ConfigError::FileWrite {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Validate the configuration.
    ///
    /// Checks that all values are within acceptable ranges and that
    /// the genesis set is consistent with the validator and staking rules.
    pub fn validate(&self) -> ConfigResult<()> {
        self.chain.validate()?;
        self.epoch.validate()?;
        self.validator.validate()?;
        self.staking.validate()?;
        self.epoch.check_lockup(self.staking.lockup_duration_micros)?;
        self.randomness.validate()?;
        self.logging.validate()?;
        self.genesis.validate(&self.validator, &self.staking)?;
        Ok(())
    }
}

// =============================================================================
// Chain Configuration
// =============================================================================

/// Chain identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainConfig {
    /// Chain ID
    pub chain_id: u64,

    /// Human-readable chain name
    pub chain_name: String,
}

impl ChainConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        if self.chain_id == 0 {
            return Err(ConfigError::InvalidChainId);
        }
        Ok(())
    }
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            chain_id: 1,
            chain_name: "epochcore-devnet".to_string(),
        }
    }
}

// =============================================================================
// Epoch Configuration
// =============================================================================

/// Epoch timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpochConfig {
    /// Minimum time between two epoch transitions, in microseconds
    pub epoch_interval_micros: u64,
}

impl EpochConfig {
    /// Creates an epoch config with the given interval.
    pub fn new(epoch_interval_micros: u64) -> ConfigResult<Self> {
        let config = Self {
            epoch_interval_micros,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.epoch_interval_micros == 0 {
            return Err(ConfigError::InvalidEpochInterval);
        }
        Ok(())
    }

    /// Rejects a lockup that could lapse before the next transition starts.
    ///
    /// Lockups are renewed once per transition, so they must outlast a full
    /// interval or every validator's voting power drops to zero mid-epoch.
    pub fn check_lockup(&self, lockup_duration_micros: u64) -> ConfigResult<()> {
        if lockup_duration_micros <= self.epoch_interval_micros {
            return Err(ConfigError::LockupNotLongerThanEpoch {
                lockup_duration_micros,
                epoch_interval_micros: self.epoch_interval_micros,
            });
        }
        Ok(())
    }
}

impl Default for EpochConfig {
    fn default() -> Self {
        Self {
            epoch_interval_micros: 2 * HOUR_MICROS,
        }
    }
}

// =============================================================================
// Validator Configuration
// =============================================================================

/// Admission policy when the prior epoch's total voting power is zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BootstrapAdmission {
    /// Lift the percentage cap while the prior total is zero.
    #[default]
    Unbounded,
    /// Apply the cap literally; nothing is admitted from a zero base.
    Strict,
}

/// Validator admission and lifecycle parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorConfig {
    /// Minimum voting power to register, join and stay promoted
    #[serde(deserialize_with = "deserialize_u128", serialize_with = "serialize_u128")]
    pub minimum_bond: u128,

    /// Voting power cap per validator
    #[serde(deserialize_with = "deserialize_u128", serialize_with = "serialize_u128")]
    pub maximum_bond: u128,

    /// Governance switch for join / leave requests
    pub allow_validator_set_change: bool,

    /// Max new voting power admitted per epoch, as a percentage of the prior total
    pub voting_power_increase_limit_pct: u64,

    /// Upper bound on active + pending-active validators
    pub max_validator_set_size: u64,

    /// Evict underperforming proposers at each transition
    pub auto_evict_enabled: bool,

    /// Minimum successful proposals per epoch before eviction
    pub auto_evict_threshold: u64,

    /// Admission behavior from a zero prior total
    #[serde(default)]
    pub bootstrap_admission: BootstrapAdmission,
}

impl ValidatorConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        if self.minimum_bond == 0 || self.minimum_bond > self.maximum_bond {
            return Err(ConfigError::InvalidBondRange {
                minimum: self.minimum_bond,
                maximum: self.maximum_bond,
            });
        }

        if self.voting_power_increase_limit_pct == 0 || self.voting_power_increase_limit_pct > 100
        {
            return Err(ConfigError::InvalidPercentage {
                name: "voting_power_increase_limit_pct",
                value: self.voting_power_increase_limit_pct,
            });
        }

        if self.max_validator_set_size == 0 {
            return Err(ConfigError::InvalidSetSize);
        }

        Ok(())
    }

    /// Voting power that may be admitted on top of `prior_total`.
    ///
    /// `None` means no cap applies (zero prior total under
    /// [`BootstrapAdmission::Unbounded`]).
    pub fn admission_budget(&self, prior_total: u128) -> Option<u128> {
        if prior_total == 0 && self.bootstrap_admission == BootstrapAdmission::Unbounded {
            return None;
        }
        Some(prior_total.saturating_mul(self.voting_power_increase_limit_pct as u128) / 100)
    }
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            // 1,000 tokens (18 decimals)
            minimum_bond: 1_000_000_000_000_000_000_000,
            // 1,000,000,000 tokens
            maximum_bond: 1_000_000_000_000_000_000_000_000_000,
            allow_validator_set_change: true,
            voting_power_increase_limit_pct: 20,
            max_validator_set_size: 100,
            auto_evict_enabled: false,
            auto_evict_threshold: 1,
            bootstrap_admission: BootstrapAdmission::Unbounded,
        }
    }
}

// =============================================================================
// Staking Configuration
// =============================================================================

/// Stake registry parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakingConfig {
    /// Minimum stake to open a pool
    #[serde(deserialize_with = "deserialize_u128", serialize_with = "serialize_u128")]
    pub minimum_stake: u128,

    /// Lockup granted by staking or renewal, in microseconds
    pub lockup_duration_micros: u64,
}

impl StakingConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        if self.minimum_stake == 0 {
            return Err(ConfigError::InvalidMinStake);
        }
        if self.lockup_duration_micros == 0 {
            return Err(ConfigError::InvalidLockupDuration);
        }
        Ok(())
    }
}

impl Default for StakingConfig {
    fn default() -> Self {
        Self {
            // 1 token
            minimum_stake: 1_000_000_000_000_000_000,
            lockup_duration_micros: 14 * DAY_MICROS,
        }
    }
}

// =============================================================================
// Randomness Configuration
// =============================================================================

/// DKG parameters. Thresholds are 64.64 fixed-point fractions of total power.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RandomnessConfig {
    /// Randomness variant
    pub variant: RandomnessVariant,

    /// Power fraction that learns nothing about the secret
    #[serde(deserialize_with = "deserialize_u128", serialize_with = "serialize_u128")]
    pub secrecy_threshold: u128,

    /// Power fraction able to reconstruct the secret
    #[serde(deserialize_with = "deserialize_u128", serialize_with = "serialize_u128")]
    pub reconstruction_threshold: u128,

    /// Secrecy threshold used by the fast path
    #[serde(deserialize_with = "deserialize_u128", serialize_with = "serialize_u128")]
    pub fast_path_secrecy_threshold: u128,
}

impl RandomnessConfig {
    /// Randomness disabled.
    pub fn off() -> Self {
        Self {
            variant: RandomnessVariant::Off,
            secrecy_threshold: 0,
            reconstruction_threshold: 0,
            fast_path_secrecy_threshold: 0,
        }
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.variant == RandomnessVariant::Off {
            return Ok(());
        }

        let ordered = self.secrecy_threshold > 0
            && self.secrecy_threshold < self.reconstruction_threshold
            && self.reconstruction_threshold <= FIXED_POINT_ONE
            && self.fast_path_secrecy_threshold <= FIXED_POINT_ONE;
        if !ordered {
            return Err(ConfigError::InvalidRandomnessThresholds {
                secrecy: self.secrecy_threshold,
                reconstruction: self.reconstruction_threshold,
                fast_path: self.fast_path_secrecy_threshold,
            });
        }
        Ok(())
    }
}

impl Default for RandomnessConfig {
    fn default() -> Self {
        Self {
            variant: RandomnessVariant::V2,
            secrecy_threshold: FIXED_POINT_ONE / 2,
            reconstruction_threshold: FIXED_POINT_ONE * 2 / 3,
            fast_path_secrecy_threshold: FIXED_POINT_ONE * 2 / 3,
        }
    }
}

// =============================================================================
// Logging Configuration
// =============================================================================

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json, compact)
    pub format: String,
}

impl LoggingConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.level.to_lowercase().as_str()) {
            return Err(ConfigError::InvalidLogLevel(self.level.clone()));
        }

        let valid_formats = ["text", "json", "compact"];
        if !valid_formats.contains(&self.format.to_lowercase().as_str()) {
            return Err(ConfigError::InvalidLogFormat(self.format.clone()));
        }

        Ok(())
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
        }
    }
}

/// Custom deserializer for u128 amounts stored as decimal strings
pub(crate) fn deserialize_u128<'de, D>(deserializer: D) -> Result<u128, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: String = serde::Deserialize::deserialize(deserializer)?;
    s.trim().parse::<u128>().map_err(serde::de::Error::custom)
}

/// Custom serializer for u128 amounts to decimal strings
pub(crate) fn serialize_u128<S>(value: &u128, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(&value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admission_budget() {
        let config = ValidatorConfig::default();
        assert_eq!(config.admission_budget(1000), Some(200));
        assert_eq!(config.admission_budget(0), None);

        let strict = ValidatorConfig {
            bootstrap_admission: BootstrapAdmission::Strict,
            ..ValidatorConfig::default()
        };
        assert_eq!(strict.admission_budget(0), Some(0));
        assert_eq!(strict.admission_budget(4), Some(0));
    }

    #[test]
    fn test_admission_budget_saturates() {
        let config = ValidatorConfig {
            voting_power_increase_limit_pct: 100,
            ..ValidatorConfig::default()
        };
        assert_eq!(config.admission_budget(u128::MAX), Some(u128::MAX / 100));
    }

    #[test]
    fn test_default_randomness_is_valid() {
        assert!(RandomnessConfig::default().validate().is_ok());
        assert!(RandomnessConfig::off().validate().is_ok());
    }
}

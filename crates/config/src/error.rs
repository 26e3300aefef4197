//! Configuration error types

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during configuration loading and validation
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file
    #[error("Failed to read config file at {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to write configuration file
    #[error("Failed to write config file at {path}: {source}")]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse TOML configuration
    #[error("Failed to parse TOML config: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// Failed to render TOML configuration
    #[error("Failed to serialize TOML config: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// Failed to parse JSON (genesis)
    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// Invalid chain ID (must be non-zero)
    #[error("Invalid chain ID: chain_id must be non-zero")]
    InvalidChainId,

    /// Invalid epoch interval
    #[error("Invalid epoch interval: epoch_interval_micros must be positive")]
    InvalidEpochInterval,

    /// Minimum / maximum bond out of order
    #[error("Invalid bond range: minimum_bond={minimum} must be non-zero and <= maximum_bond={maximum}")]
    InvalidBondRange { minimum: u128, maximum: u128 },

    /// Invalid percentage value
    #[error("Invalid {name}: must be between 1 and 100, got {value}")]
    InvalidPercentage { name: &'static str, value: u64 },

    /// Invalid validator set size
    #[error("Invalid max_validator_set_size: must be at least 1")]
    InvalidSetSize,

    /// Invalid minimum stake
    #[error("Invalid minimum stake: minimum_stake cannot be zero")]
    InvalidMinStake,

    /// Invalid lockup duration
    #[error("Invalid lockup duration: lockup_duration_micros must be positive")]
    InvalidLockupDuration,

    /// Lockup would lapse before the next transition
    #[error("Lockup duration {lockup_duration_micros}us must exceed the epoch interval {epoch_interval_micros}us")]
    LockupNotLongerThanEpoch {
        lockup_duration_micros: u64,
        epoch_interval_micros: u64,
    },

    /// Randomness thresholds out of order
    #[error("Invalid randomness thresholds: secrecy={secrecy}, reconstruction={reconstruction}, fast_path={fast_path}")]
    InvalidRandomnessThresholds {
        secrecy: u128,
        reconstruction: u128,
        fast_path: u128,
    },

    /// Invalid log level
    #[error("Invalid log level: {0}")]
    InvalidLogLevel(String),

    /// Invalid log format
    #[error("Invalid log format: {0}")]
    InvalidLogFormat(String),

    /// No genesis validators configured
    #[error("No genesis validators configured: at least one validator required")]
    NoValidators,

    /// More genesis validators than the set may hold
    #[error("Too many genesis validators: {count} exceeds max_validator_set_size {max}")]
    TooManyValidators { count: usize, max: u64 },

    /// Duplicate genesis validator
    #[error("Duplicate genesis validator: {0}")]
    DuplicateValidator(String),

    /// Genesis validator stake below minimum
    #[error("Genesis validator {address} has stake {stake} below minimum {min_stake}")]
    ValidatorStakeBelowMinimum {
        address: String,
        stake: u128,
        min_stake: u128,
    },

    /// Invalid consensus key material
    #[error("Invalid {field} for {moniker}: expected {expected} bytes, got {actual}")]
    InvalidKeyLength {
        moniker: String,
        field: &'static str,
        expected: usize,
        actual: usize,
    },

    /// Moniker too long
    #[error("Moniker {moniker:?} is {length} bytes, limit is {max}")]
    MonikerTooLong {
        moniker: String,
        length: usize,
        max: usize,
    },
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

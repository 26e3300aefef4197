//! Genesis configuration: the initial validator set.
//!
//! Field names accept both the snake_case used in `epochcore.toml` and the
//! camelCase used by standalone genesis JSON files.

use crate::config::{deserialize_u128, serialize_u128, StakingConfig, ValidatorConfig};
use crate::error::{ConfigError, ConfigResult};
use alloy_primitives::{Address, Bytes};
use epochcore_types::{derive_pool_address, BLS_POP_LENGTH, BLS_PUBKEY_LENGTH, MAX_MONIKER_LENGTH};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info};

/// Genesis configuration containing the initial validator set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct GenesisConfig {
    /// Global time at genesis, in microseconds
    #[serde(default, alias = "initialTimestampMicros")]
    pub initial_timestamp_micros: u64,

    /// Initial validators, activated directly with indices `0..n`
    #[serde(default)]
    pub validators: Vec<GenesisValidator>,
}

impl GenesisConfig {
    /// Load genesis configuration from a JSON file.
    ///
    /// This is an alternative to embedding genesis in the TOML config,
    /// useful for sharing genesis state across multiple nodes.
    pub fn load_json(path: &Path) -> ConfigResult<Self> {
        info!("Loading genesis from JSON file: {:?}", path);

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;

        let genesis: GenesisConfig = serde_json::from_str(&content)?;
        Ok(genesis)
    }

    /// Save genesis configuration to a JSON file.
    pub fn save_json(&self, path: &Path) -> ConfigResult<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|e| ConfigError::FileWrite {
            path: path.to_path_buf(),
            source: e,
        })?;
        Ok(())
    }

    /// Deterministic devnet genesis with `count` validators of `stake` each.
    ///
    /// Key material is patterned filler of the right length, not real BLS keys.
    pub fn devnet(count: usize, stake: u128) -> Self {
        let validators = (0..count)
            .map(|i| {
                let seed = (i as u8).wrapping_add(1);
                let owner = Address::repeat_byte(seed);
                let operator = Address::with_last_byte(seed);
                GenesisValidator {
                    operator,
                    owner,
                    stake_amount: stake,
                    moniker: format!("validator-{i}"),
                    consensus_pubkey: Bytes::from(vec![seed; BLS_PUBKEY_LENGTH]),
                    consensus_pop: Bytes::from(vec![seed; BLS_POP_LENGTH]),
                    network_addresses: format!("/ip4/127.0.0.1/tcp/{}", 2024 + i),
                    fullnode_addresses: format!("/ip4/127.0.0.1/tcp/{}", 6180 + i),
                    fee_recipient: None,
                }
            })
            .collect();

        Self {
            initial_timestamp_micros: 0,
            validators,
        }
    }

    /// Validate the genesis configuration.
    pub fn validate(
        &self,
        validator_config: &ValidatorConfig,
        staking_config: &StakingConfig,
    ) -> ConfigResult<()> {
        debug!("Validating genesis configuration");

        if self.validators.is_empty() {
            return Err(ConfigError::NoValidators);
        }

        if self.validators.len() as u64 > validator_config.max_validator_set_size {
            return Err(ConfigError::TooManyValidators {
                count: self.validators.len(),
                max: validator_config.max_validator_set_size,
            });
        }

        let min_stake = validator_config
            .minimum_bond
            .max(staking_config.minimum_stake);
        let mut owners = HashSet::new();
        let mut pubkeys = HashSet::new();

        for validator in &self.validators {
            if !owners.insert(validator.owner) {
                return Err(ConfigError::DuplicateValidator(format!(
                    "owner {}",
                    validator.owner
                )));
            }
            if !pubkeys.insert(validator.consensus_pubkey.clone()) {
                return Err(ConfigError::DuplicateValidator(format!(
                    "consensus key of {}",
                    validator.moniker
                )));
            }

            if validator.stake_amount < min_stake {
                return Err(ConfigError::ValidatorStakeBelowMinimum {
                    address: validator.owner.to_string(),
                    stake: validator.stake_amount,
                    min_stake,
                });
            }

            validator.validate_metadata()?;
        }

        info!(
            "Genesis configuration valid: {} validators",
            self.validators.len()
        );

        Ok(())
    }
}

/// A genesis validator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisValidator {
    /// Pool operator
    pub operator: Address,

    /// Pool owner
    pub owner: Address,

    /// Initial stake
    #[serde(
        alias = "stakeAmount",
        deserialize_with = "deserialize_u128",
        serialize_with = "serialize_u128"
    )]
    pub stake_amount: u128,

    /// Display name
    pub moniker: String,

    /// BLS public key
    #[serde(alias = "consensusPubkey")]
    pub consensus_pubkey: Bytes,

    /// BLS proof of possession
    #[serde(alias = "consensusPop")]
    pub consensus_pop: Bytes,

    /// Validator network addresses
    #[serde(default, alias = "networkAddresses")]
    pub network_addresses: String,

    /// Fullnode network addresses
    #[serde(default, alias = "fullnodeAddresses")]
    pub fullnode_addresses: String,

    /// Fee recipient; defaults to the owner
    #[serde(default, alias = "feeRecipient", skip_serializing_if = "Option::is_none")]
    pub fee_recipient: Option<Address>,
}

impl GenesisValidator {
    /// Stake pool address of this validator (the owner's first pool).
    pub fn pool_address(&self) -> Address {
        derive_pool_address(&self.owner, 0)
    }

    /// Fee recipient, falling back to the owner.
    pub fn fee_recipient(&self) -> Address {
        self.fee_recipient.unwrap_or(self.owner)
    }

    fn validate_metadata(&self) -> ConfigResult<()> {
        if self.moniker.len() > MAX_MONIKER_LENGTH {
            return Err(ConfigError::MonikerTooLong {
                moniker: self.moniker.clone(),
                length: self.moniker.len(),
                max: MAX_MONIKER_LENGTH,
            });
        }
        if self.consensus_pubkey.len() != BLS_PUBKEY_LENGTH {
            return Err(ConfigError::InvalidKeyLength {
                moniker: self.moniker.clone(),
                field: "consensus_pubkey",
                expected: BLS_PUBKEY_LENGTH,
                actual: self.consensus_pubkey.len(),
            });
        }
        if self.consensus_pop.len() != BLS_POP_LENGTH {
            return Err(ConfigError::InvalidKeyLength {
                moniker: self.moniker.clone(),
                field: "consensus_pop",
                expected: BLS_POP_LENGTH,
                actual: self.consensus_pop.len(),
            });
        }
        Ok(())
    }
}

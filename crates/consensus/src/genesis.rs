//! Genesis bootstrap.
//!
//! Builds an initialized [`EpochRuntime`] from a validated [`Config`]: one
//! stake pool per genesis validator, every validator Active with indices in
//! listing order, epoch 0 starting at the genesis timestamp.

use alloy_primitives::{Address, Bytes};
use epochcore_config::{Config, GenesisValidator};
use epochcore_staking::{StakingLedger, StakingParams};
use epochcore_types::address::GENESIS_ADDR;
use tracing::{debug, info};

use crate::reconfig::OnChainConfigs;
use crate::runtime::{EpochRuntime, RuntimeResult};
use crate::validator_set::RegistrationParams;

/// Validates `config` and returns a runtime at epoch 0.
pub fn build_runtime(config: &Config) -> RuntimeResult<EpochRuntime<StakingLedger>> {
    config.validate()?;

    let genesis_time_us = config.genesis.initial_timestamp_micros;
    let mut staking = StakingLedger::new(StakingParams::from_config(
        &config.validator,
        &config.staking,
    ));

    let mut registrations = Vec::with_capacity(config.genesis.validators.len());
    for validator in &config.genesis.validators {
        let pool = staking.create_pool(
            validator.owner,
            validator.operator,
            validator.stake_amount,
            genesis_time_us,
        )?;
        debug!(pool = %pool, moniker = %validator.moniker, "Genesis pool created");
        registrations.push(registration(validator, pool));
    }

    let mut runtime = EpochRuntime::new(
        config.chain.chain_id,
        OnChainConfigs::from_config(config),
        staking,
        genesis_time_us,
    );
    runtime.initialize(GENESIS_ADDR, registrations)?;

    info!(
        chain_id = config.chain.chain_id,
        validators = runtime.validators().active_count(),
        total_voting_power = runtime.total_voting_power(),
        "Genesis complete"
    );
    Ok(runtime)
}

fn registration(validator: &GenesisValidator, pool: Address) -> RegistrationParams {
    RegistrationParams {
        pool,
        moniker: validator.moniker.clone(),
        consensus_pubkey: validator.consensus_pubkey.clone(),
        consensus_pop: validator.consensus_pop.clone(),
        network_addresses: Bytes::from(validator.network_addresses.clone().into_bytes()),
        fullnode_addresses: Bytes::from(validator.fullnode_addresses.clone().into_bytes()),
        fee_recipient: Some(validator.fee_recipient()),
    }
}

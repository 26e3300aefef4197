//! Integration tests for epoch transitions through the runtime.

use epochcore_config::{
    Config, ConfigError, EpochConfig, GenesisConfig, RandomnessConfig, ValidatorConfig,
};
use epochcore_consensus::genesis::build_runtime;
use epochcore_consensus::{
    EpochError, EpochRuntime, OnChainConfigs, ReconfigError, RegistrationParams, RuntimeError,
    RuntimeSnapshot, TransitionState, ValidatorSetError,
};
use epochcore_core::{StakeRegistry, StakingError};
use epochcore_staking::{StakingLedger, StakingParams};
use epochcore_types::address::{GENESIS_ADDR, GOVERNANCE_ADDR, SYSTEM_CALLER};
use epochcore_types::{
    Address, Bytes, RandomnessVariant, SystemEvent, ValidatorStatus, BLS_POP_LENGTH,
    BLS_PUBKEY_LENGTH,
};

const INTERVAL: u64 = 1_000_000;
const BLOCK_TIME: u64 = 100_000;
const MIN_BOND: u128 = 100;
const GENESIS_STAKE: u128 = 1_000;

fn test_config(validators: usize) -> Config {
    let mut config = Config::default();
    config.epoch.epoch_interval_micros = INTERVAL;
    config.validator.minimum_bond = MIN_BOND;
    config.validator.maximum_bond = 1_000_000;
    config.staking.minimum_stake = 1;
    config.staking.lockup_duration_micros = 1_000_000_000_000;
    config.genesis = GenesisConfig::devnet(validators, GENESIS_STAKE);
    config
}

fn runtime(validators: usize) -> EpochRuntime<StakingLedger> {
    build_runtime(&test_config(validators)).unwrap()
}

fn transcript() -> Bytes {
    Bytes::from_static(b"dkg-transcript")
}

/// Proposes one block from index 0 at `timestamp_us`.
fn block(rt: &mut EpochRuntime<StakingLedger>, timestamp_us: u64) -> bool {
    rt.on_block_start(SYSTEM_CALLER, 0, vec![], timestamp_us)
        .unwrap()
        .transition_started
}

fn params(pool: Address, n: u8) -> RegistrationParams {
    RegistrationParams {
        pool,
        moniker: format!("joiner-{n}"),
        consensus_pubkey: Bytes::from(vec![0xa0 | n; BLS_PUBKEY_LENGTH]),
        consensus_pop: Bytes::from(vec![0xa0 | n; BLS_POP_LENGTH]),
        network_addresses: Bytes::new(),
        fullnode_addresses: Bytes::new(),
        fee_recipient: None,
    }
}

/// Funds, registers and requests a join for a new validator.
fn add_joiner(rt: &mut EpochRuntime<StakingLedger>, n: u8, stake: u128) -> Address {
    let owner = Address::repeat_byte(n);
    let operator = Address::with_last_byte(n);
    let pool = rt.create_pool(owner, operator, stake).unwrap();
    rt.register_validator(operator, params(pool, n)).unwrap();
    rt.join_validator_set(operator, pool).unwrap();
    pool
}

// =============================================================================
// Scenarios
// =============================================================================

#[test]
fn test_full_transition_cycle() {
    let mut rt = runtime(4);
    assert_eq!(rt.current_epoch(), 0);
    assert!(!rt.is_transition_in_progress());

    assert!(block(&mut rt, INTERVAL));
    assert!(rt.is_transition_in_progress());
    assert_eq!(
        rt.orchestrator().state().transition_state,
        TransitionState::DkgInProgress
    );
    assert!(rt.dkg().is_in_progress());

    rt.finish_transition(SYSTEM_CALLER, transcript()).unwrap();
    assert_eq!(rt.current_epoch(), 1);
    assert!(!rt.is_transition_in_progress());
    assert_eq!(rt.orchestrator().last_transition_time(), INTERVAL);

    let completed = rt.dkg().last_completed_session().unwrap();
    assert_eq!(completed.dealer_epoch, 0);
    assert_eq!(completed.dealer_count, 4);
    assert_eq!(completed.target_count, 4);
    assert_eq!(completed.transcript, transcript());
}

#[test]
fn test_no_transition_before_interval() {
    let mut rt = runtime(2);

    assert!(!block(&mut rt, INTERVAL - 1));
    assert!(!rt.is_transition_in_progress());
    assert_eq!(rt.current_epoch(), 0);
    assert_eq!(rt.remaining_time(), 1);
    assert!(!rt.can_trigger());
    assert!(rt.dkg().in_progress_session().is_none());
}

#[test]
fn test_downtime_advances_one_epoch() {
    let mut rt = runtime(3);

    assert!(block(&mut rt, 10 * INTERVAL));
    rt.finish_transition(SYSTEM_CALLER, transcript()).unwrap();
    assert_eq!(rt.current_epoch(), 1);

    // The interval restarts from the completion time, not from genesis.
    assert!(!block(&mut rt, 10 * INTERVAL + BLOCK_TIME));
    assert_eq!(rt.remaining_time(), INTERVAL - BLOCK_TIME);
}

// =============================================================================
// Properties
// =============================================================================

#[test]
fn test_start_is_mutually_exclusive() {
    let mut rt = runtime(2);

    assert!(block(&mut rt, INTERVAL));
    assert!(!block(&mut rt, INTERVAL + BLOCK_TIME));
    assert!(!block(&mut rt, 5 * INTERVAL));

    let started = rt
        .events()
        .iter()
        .filter(|e| matches!(e, SystemEvent::EpochTransitionStarted { .. }))
        .count();
    assert_eq!(started, 1);
}

#[test]
fn test_epoch_increases_by_one_per_transition() {
    let mut rt = runtime(3);
    let mut now = 0;
    let mut last_epoch = 0;

    for cycle in 1..=5u64 {
        loop {
            now += BLOCK_TIME;
            if block(&mut rt, now) {
                break;
            }
            assert_eq!(rt.current_epoch(), last_epoch);
        }
        // A few blocks while the DKG runs.
        for _ in 0..3 {
            now += BLOCK_TIME;
            assert!(!block(&mut rt, now));
        }
        rt.finish_transition(SYSTEM_CALLER, transcript()).unwrap();
        assert_eq!(rt.current_epoch(), cycle);
        assert!(rt.current_epoch() >= last_epoch);
        last_epoch = rt.current_epoch();
    }
    assert_eq!(rt.validators().current_epoch(), 5);
}

#[test]
fn test_finish_requires_transition_and_caller() {
    let mut rt = runtime(2);

    let err = rt
        .finish_transition(SYSTEM_CALLER, transcript())
        .unwrap_err();
    assert!(matches!(
        err,
        RuntimeError::Epoch(EpochError::NotInProgress { epoch: 0 })
    ));

    assert!(block(&mut rt, INTERVAL));
    let err = rt
        .finish_transition(Address::repeat_byte(0x42), transcript())
        .unwrap_err();
    assert!(matches!(err, RuntimeError::Epoch(EpochError::Access(_))));
    assert!(rt.is_transition_in_progress());
}

#[test]
fn test_governance_force_end() {
    let mut rt = runtime(2);
    assert!(block(&mut rt, INTERVAL));
    assert_eq!(rt.transition_age(), Some(0));

    block(&mut rt, INTERVAL + 3 * BLOCK_TIME);
    assert_eq!(rt.transition_age(), Some(3 * BLOCK_TIME));

    rt.finish_transition(GOVERNANCE_ADDR, Bytes::new()).unwrap();
    assert_eq!(rt.current_epoch(), 1);
    assert!(!rt.dkg().is_in_progress());
    assert!(rt.dkg().last_completed_session().is_none());
    assert!(rt
        .events()
        .iter()
        .any(|e| matches!(e, SystemEvent::DkgSessionCleared { dealer_epoch: 0 })));
    assert!(rt.events().iter().any(|e| matches!(
        e,
        SystemEvent::EpochTransitioned {
            new_epoch: 1,
            with_transcript: false,
            ..
        }
    )));
}

// =============================================================================
// Transition side effects
// =============================================================================

#[test]
fn test_dkg_announcement_carries_dealer_and_target_sets() {
    let mut rt = runtime(2);
    let joiner = add_joiner(&mut rt, 9, 300);
    rt.drain_events();

    assert!(block(&mut rt, INTERVAL));
    let metadata = rt
        .events()
        .iter()
        .find_map(|e| match e {
            SystemEvent::DkgStarted { metadata, .. } => Some(metadata.clone()),
            _ => None,
        })
        .unwrap();

    assert_eq!(metadata.dealer_epoch, 0);
    assert_eq!(metadata.config_variant, RandomnessVariant::V2);
    assert_eq!(metadata.dealer_validator_set.len(), 2);
    assert_eq!(metadata.target_validator_set.len(), 3);
    assert_eq!(metadata.target_validator_set[2].validator, joiner);
    assert_eq!(metadata.target_validator_set[2].validator_index, 2);

    // Only counts are persisted.
    let session = rt.dkg().in_progress_session().unwrap();
    assert_eq!(session.dealer_count, 2);
    assert_eq!(session.target_count, 3);
    assert!(session.transcript.is_empty());

    rt.finish_transition(SYSTEM_CALLER, transcript()).unwrap();
    assert_eq!(rt.validators().status_of(&joiner), ValidatorStatus::Active);
    assert_eq!(rt.performance().validators().len(), 3);
}

#[test]
fn test_validator_changes_frozen_during_transition() {
    let mut rt = runtime(3);
    let owner = Address::repeat_byte(9);
    let operator = Address::with_last_byte(9);
    let pool = rt.create_pool(owner, operator, 300).unwrap();

    assert!(block(&mut rt, INTERVAL));
    let err = rt
        .register_validator(operator, params(pool, 9))
        .unwrap_err();
    assert!(matches!(
        err,
        RuntimeError::ValidatorSet(ValidatorSetError::TransitionInProgress)
    ));

    let genesis_operator = Address::with_last_byte(1);
    let genesis_pool = rt.get_active_validators()[0].validator;
    let err = rt
        .leave_validator_set(genesis_operator, genesis_pool)
        .unwrap_err();
    assert!(matches!(
        err,
        RuntimeError::ValidatorSet(ValidatorSetError::TransitionInProgress)
    ));

    rt.finish_transition(SYSTEM_CALLER, transcript()).unwrap();
    rt.register_validator(operator, params(pool, 9)).unwrap();
}

#[test]
fn test_staged_configs_apply_at_finish() {
    let mut rt = runtime(2);

    rt.set_epoch_config(
        GOVERNANCE_ADDR,
        EpochConfig {
            epoch_interval_micros: 2 * INTERVAL,
        },
    )
    .unwrap();
    rt.set_randomness_config(GOVERNANCE_ADDR, RandomnessConfig::off())
        .unwrap();
    assert!(rt
        .set_randomness_config(SYSTEM_CALLER, RandomnessConfig::off())
        .is_err());

    // Staged values do not affect the running epoch.
    assert_eq!(rt.configs().epoch().epoch_interval_micros, INTERVAL);
    assert!(block(&mut rt, INTERVAL));
    assert_eq!(
        rt.dkg().in_progress_session().unwrap().config_variant,
        RandomnessVariant::V2
    );

    rt.finish_transition(SYSTEM_CALLER, transcript()).unwrap();
    assert_eq!(rt.configs().epoch().epoch_interval_micros, 2 * INTERVAL);
    assert!(rt.configs().pending_epoch().is_none());

    assert!(!block(&mut rt, 2 * INTERVAL));
    assert!(block(&mut rt, 3 * INTERVAL));
    assert_eq!(
        rt.dkg().in_progress_session().unwrap().config_variant,
        RandomnessVariant::Off
    );
}

#[test]
fn test_auto_eviction_completes_within_one_transition() {
    let mut rt = runtime(4);
    let evictee = rt.get_active_validators()[3].validator;

    let config = ValidatorConfig {
        auto_evict_enabled: true,
        auto_evict_threshold: 1,
        ..rt.configs().validator().clone()
    };
    rt.set_validator_config(GOVERNANCE_ADDR, config).unwrap();

    // Index 3 misses every slot; the others propose at least once.
    let mut now = 0;
    for proposer in [0u64, 1, 2, 0, 1, 2] {
        now += BLOCK_TIME;
        rt.on_block_start(SYSTEM_CALLER, proposer, vec![3], now)
            .unwrap();
    }
    assert_eq!(rt.performance().validators()[3].failed_proposals, 6);

    assert!(block(&mut rt, INTERVAL));
    rt.finish_transition(SYSTEM_CALLER, transcript()).unwrap();

    assert_eq!(rt.validators().status_of(&evictee), ValidatorStatus::Inactive);
    assert_eq!(rt.validators().active_count(), 3);
    assert_eq!(rt.total_voting_power(), 3 * GENESIS_STAKE);
    assert_eq!(rt.performance().validators().len(), 3);
    assert!(rt
        .performance()
        .validators()
        .iter()
        .all(|p| p.successful_proposals == 0 && p.failed_proposals == 0));
}

// =============================================================================
// Atomicity, persistence and staking guards
// =============================================================================

#[test]
fn test_failed_call_leaves_no_trace() {
    let config = test_config(1);
    let mut rt = EpochRuntime::new(
        1,
        OnChainConfigs::from_config(&config),
        StakingLedger::new(StakingParams::from_config(
            &config.validator,
            &config.staking,
        )),
        0,
    );
    let funded = rt
        .create_pool(Address::repeat_byte(1), Address::with_last_byte(1), 500)
        .unwrap();
    let missing = Address::repeat_byte(0xdd);
    let before = rt.snapshot();

    // The first validator is applied before the second fails.
    let err = rt
        .initialize(GENESIS_ADDR, vec![params(funded, 1), params(missing, 2)])
        .unwrap_err();
    assert!(matches!(
        err,
        RuntimeError::ValidatorSet(ValidatorSetError::Staking(StakingError::PoolNotFound { .. }))
    ));
    assert_eq!(rt.snapshot(), before);
    assert!(rt.events().is_empty());

    rt.initialize(GENESIS_ADDR, vec![params(funded, 1)]).unwrap();
    assert_eq!(rt.validators().active_count(), 1);
}

#[test]
fn test_failed_call_keeps_earlier_events() {
    let mut rt = runtime(2);
    rt.drain_events();
    block(&mut rt, BLOCK_TIME);
    let pending = rt.events().to_vec();
    assert!(!pending.is_empty());

    assert!(rt.finish_transition(SYSTEM_CALLER, transcript()).is_err());
    assert_eq!(rt.events(), pending.as_slice());

    block(&mut rt, 2 * BLOCK_TIME);
    assert!(rt.events().len() > pending.len());
}

#[test]
fn test_snapshot_round_trip_through_json() {
    let mut rt = runtime(3);
    add_joiner(&mut rt, 9, 200);
    assert!(block(&mut rt, INTERVAL));

    let json = serde_json::to_string_pretty(&rt.snapshot()).unwrap();
    let restored: RuntimeSnapshot = serde_json::from_str(&json).unwrap();
    assert_eq!(restored, rt.snapshot());

    let mut resumed = EpochRuntime::from_snapshot(restored);
    assert!(resumed.is_transition_in_progress());
    resumed
        .finish_transition(SYSTEM_CALLER, transcript())
        .unwrap();
    assert_eq!(resumed.current_epoch(), 1);
    assert_eq!(resumed.validators().active_count(), 4);
}

#[test]
fn test_unstake_respects_minimum_bond() {
    let mut rt = runtime(2);
    let owner = Address::repeat_byte(1);
    let pool = rt.get_active_validators()[0].validator;

    let err = rt
        .unstake(owner, pool, GENESIS_STAKE - MIN_BOND + 1)
        .unwrap_err();
    assert!(matches!(
        err,
        RuntimeError::Staking(StakingError::BelowMinimumBond { .. })
    ));
    assert_eq!(
        rt.unstake(owner, pool, GENESIS_STAKE - MIN_BOND).unwrap(),
        MIN_BOND
    );

    // Voting power used by consensus is fixed until the next epoch pass.
    assert_eq!(rt.get_active_validators()[0].voting_power, GENESIS_STAKE);
    assert!(block(&mut rt, INTERVAL));
    rt.finish_transition(SYSTEM_CALLER, transcript()).unwrap();
    assert_eq!(rt.get_active_validators()[0].voting_power, MIN_BOND);
}

// =============================================================================
// Lockup coverage
// =============================================================================

fn started_target_powers(rt: &EpochRuntime<StakingLedger>) -> Vec<u128> {
    rt.events()
        .iter()
        .find_map(|e| match e {
            SystemEvent::DkgStarted { metadata, .. } => Some(
                metadata
                    .target_validator_set
                    .iter()
                    .map(|v| v.voting_power)
                    .collect(),
            ),
            _ => None,
        })
        .unwrap()
}

#[test]
fn test_lockup_shorter_than_interval_is_rejected() {
    let mut config = test_config(2);
    config.staking.lockup_duration_micros = INTERVAL / 2;
    assert!(matches!(
        build_runtime(&config).map(drop).unwrap_err(),
        RuntimeError::Config(ConfigError::LockupNotLongerThanEpoch { .. })
    ));

    // Governance cannot stage an interval the lockup would not cover.
    let mut config = test_config(2);
    config.staking.lockup_duration_micros = 3 * INTERVAL;
    let mut rt = build_runtime(&config).unwrap();
    let err = rt
        .set_epoch_config(
            GOVERNANCE_ADDR,
            EpochConfig {
                epoch_interval_micros: 3 * INTERVAL,
            },
        )
        .unwrap_err();
    assert!(matches!(
        err,
        RuntimeError::Reconfig(ReconfigError::Invalid { name: "epoch", .. })
    ));
    assert!(rt.configs().pending_epoch().is_none());
}

#[test]
fn test_voting_power_survives_halt_longer_than_lockup() {
    let mut config = test_config(2);
    config.staking.lockup_duration_micros = 2 * INTERVAL;
    let mut rt = build_runtime(&config).unwrap();
    rt.drain_events();

    // Resume well past every genesis lockup.
    let resumed_at = 10 * INTERVAL;
    assert!(block(&mut rt, resumed_at));
    assert_eq!(started_target_powers(&rt), vec![GENESIS_STAKE; 2]);

    rt.finish_transition(SYSTEM_CALLER, transcript()).unwrap();
    assert_eq!(rt.total_voting_power(), 2 * GENESIS_STAKE);

    // Still live just before the next transition is due.
    let pool = rt.get_active_validators()[0].validator;
    let late = resumed_at + INTERVAL + BLOCK_TIME;
    assert_eq!(rt.staking().voting_power(&pool, late), GENESIS_STAKE);
    rt.drain_events();
    assert!(block(&mut rt, late));
    assert_eq!(started_target_powers(&rt), vec![GENESIS_STAKE; 2]);
}

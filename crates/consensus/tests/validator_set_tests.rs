//! Integration tests for the validator set manager lifecycle.

use epochcore_config::{BootstrapAdmission, ValidatorConfig};
use epochcore_consensus::{
    EventLog, PerformanceTracker, RegistrationParams, ValidatorSetContext, ValidatorSetError,
    ValidatorSetManager, ValidatorSetResult,
};
use epochcore_core::{PerformanceStore, StakeRegistry, StakingError};
use epochcore_staking::{StakingLedger, StakingParams};
use epochcore_types::address::{GENESIS_ADDR, RECONFIGURATION_ADDR};
use epochcore_types::{
    Address, Bytes, SystemEvent, ValidatorStatus, BLS_POP_LENGTH, BLS_PUBKEY_LENGTH,
};

const MIN_BOND: u128 = 100;
const LOCKUP: u64 = 1_000_000_000;

fn owner(n: u8) -> Address {
    Address::repeat_byte(n)
}

fn operator(n: u8) -> Address {
    Address::with_last_byte(n)
}

fn params(pool: Address, n: u8) -> RegistrationParams {
    RegistrationParams {
        pool,
        moniker: format!("validator-{n}"),
        consensus_pubkey: Bytes::from(vec![n; BLS_PUBKEY_LENGTH]),
        consensus_pop: Bytes::from(vec![n; BLS_POP_LENGTH]),
        network_addresses: Bytes::from_static(b"/ip4/127.0.0.1/tcp/2024"),
        fullnode_addresses: Bytes::new(),
        fee_recipient: None,
    }
}

fn validator_config(limit_pct: u64, bootstrap: BootstrapAdmission) -> ValidatorConfig {
    ValidatorConfig {
        minimum_bond: MIN_BOND,
        maximum_bond: 1_000_000,
        voting_power_increase_limit_pct: limit_pct,
        bootstrap_admission: bootstrap,
        ..ValidatorConfig::default()
    }
}

struct Harness {
    staking: StakingLedger,
    config: ValidatorConfig,
    events: EventLog,
    manager: ValidatorSetManager,
    now_us: u64,
    transition_in_progress: bool,
}

impl Harness {
    fn new(config: ValidatorConfig) -> Self {
        Self {
            staking: StakingLedger::new(StakingParams {
                minimum_stake: 1,
                maximum_bond: config.maximum_bond,
                lockup_duration_micros: LOCKUP,
            }),
            config,
            events: EventLog::new(),
            manager: ValidatorSetManager::new(),
            now_us: 0,
            transition_in_progress: false,
        }
    }

    fn call<T>(
        &mut self,
        f: impl FnOnce(&mut ValidatorSetManager, &mut ValidatorSetContext<'_>) -> T,
    ) -> T {
        let mut ctx = ValidatorSetContext {
            now_us: self.now_us,
            config: &self.config,
            staking: &mut self.staking,
            events: &mut self.events,
            transition_in_progress: self.transition_in_progress,
        };
        f(&mut self.manager, &mut ctx)
    }

    fn fund(&mut self, n: u8, amount: u128) -> Address {
        self.staking
            .create_pool(owner(n), operator(n), amount, self.now_us)
            .unwrap()
    }

    fn genesis(&mut self, members: &[(u8, u128)]) -> Vec<Address> {
        let pools: Vec<Address> = members
            .iter()
            .map(|&(n, amount)| self.fund(n, amount))
            .collect();
        let registrations = pools
            .iter()
            .zip(members)
            .map(|(&pool, &(n, _))| params(pool, n))
            .collect();
        self.call(|m, ctx| m.initialize(GENESIS_ADDR, registrations, ctx))
            .unwrap();
        pools
    }

    fn register(&mut self, n: u8, amount: u128) -> Address {
        let pool = self.fund(n, amount);
        self.call(|m, ctx| m.register_validator(operator(n), params(pool, n), ctx))
            .unwrap();
        pool
    }

    fn join(&mut self, n: u8, pool: Address) -> ValidatorSetResult<()> {
        self.call(|m, ctx| m.join_validator_set(operator(n), &pool, ctx))
    }

    fn leave(&mut self, n: u8, pool: Address) -> ValidatorSetResult<()> {
        self.call(|m, ctx| m.leave_validator_set(operator(n), &pool, ctx))
    }

    fn epoch_pass(&mut self) {
        self.call(|m, ctx| m.on_new_epoch(RECONFIGURATION_ADDR, ctx))
            .unwrap();
    }

    fn status(&self, pool: Address) -> ValidatorStatus {
        self.manager.status_of(&pool)
    }
}

fn assert_indices_contiguous(manager: &ValidatorSetManager) {
    for (position, pool) in manager.active_validators().iter().enumerate() {
        let record = manager.get_validator(pool).unwrap();
        assert_eq!(record.validator_index, Some(position as u64));
        assert!(record.status.holds_index());
    }
    for record in manager.validators() {
        if !record.status.holds_index() {
            assert_eq!(record.validator_index, None, "{}", record.validator);
        }
    }
    let infos = manager.get_active_validators();
    let indices: Vec<u64> = infos.iter().map(|i| i.validator_index).collect();
    let expected: Vec<u64> = (0..infos.len() as u64).collect();
    assert_eq!(indices, expected);
}

// =============================================================================
// Bootstrap admission (zero prior total)
// =============================================================================

fn zero_base_with_three_joiners(bootstrap: BootstrapAdmission) -> (Harness, Vec<Address>) {
    let mut h = Harness::new(validator_config(20, bootstrap));
    h.genesis(&[]);
    assert_eq!(h.manager.total_voting_power(), 0);

    let pools: Vec<Address> = [(1u8, 100u128), (2, 200), (3, 150)]
        .iter()
        .map(|&(n, amount)| h.register(n, amount))
        .collect();
    for (i, pool) in pools.iter().enumerate() {
        h.join(i as u8 + 1, *pool).unwrap();
    }
    (h, pools)
}

#[test]
fn test_zero_base_unbounded_admits_all_joiners() {
    let (mut h, pools) = zero_base_with_three_joiners(BootstrapAdmission::Unbounded);
    h.epoch_pass();

    assert_eq!(h.manager.active_validators(), pools.as_slice());
    assert!(h.manager.pending_active().is_empty());
    assert_eq!(h.manager.total_voting_power(), 450);
    assert_indices_contiguous(&h.manager);
}

#[test]
fn test_zero_base_strict_admits_nobody() {
    let (mut h, pools) = zero_base_with_three_joiners(BootstrapAdmission::Strict);
    h.epoch_pass();

    assert_eq!(h.manager.active_count(), 0);
    assert_eq!(h.manager.pending_active(), pools.as_slice());
    for pool in &pools {
        assert_eq!(h.status(*pool), ValidatorStatus::PendingActive);
    }
    let deferred = h
        .events
        .events()
        .iter()
        .filter(|e| {
            matches!(
                e,
                SystemEvent::ValidatorAdmissionDeferred {
                    remaining_budget: 0,
                    ..
                }
            )
        })
        .count();
    assert_eq!(deferred, 3);
}

// =============================================================================
// Lifecycle transitions
// =============================================================================

#[test]
fn test_pending_active_leave_reverts_immediately() {
    let mut h = Harness::new(validator_config(100, BootstrapAdmission::Unbounded));
    h.genesis(&[(1, 500)]);
    let pool = h.register(2, 200);
    h.join(2, pool).unwrap();
    assert_eq!(h.status(pool), ValidatorStatus::PendingActive);

    h.leave(2, pool).unwrap();
    assert_eq!(h.status(pool), ValidatorStatus::Inactive);
    assert!(h.manager.pending_active().is_empty());
    assert!(matches!(
        h.events.events().last(),
        Some(SystemEvent::ValidatorJoinCancelled { validator }) if *validator == pool
    ));

    // Nothing to promote at the next pass.
    h.epoch_pass();
    assert_eq!(h.manager.active_count(), 1);
    assert_eq!(h.status(pool), ValidatorStatus::Inactive);
}

#[test]
fn test_active_leave_waits_for_epoch_pass() {
    let mut h = Harness::new(validator_config(100, BootstrapAdmission::Unbounded));
    let pools = h.genesis(&[(1, 500), (2, 300)]);

    h.leave(1, pools[0]).unwrap();
    assert_eq!(h.status(pools[0]), ValidatorStatus::PendingInactive);
    // Still in the active set with its index until the pass.
    assert_eq!(h.manager.validator_by_index(0), Some(pools[0]));

    h.epoch_pass();
    assert_eq!(h.status(pools[0]), ValidatorStatus::Inactive);
    assert_eq!(h.manager.active_validators(), &[pools[1]]);
    assert_eq!(h.manager.total_voting_power(), 300);
    assert_indices_contiguous(&h.manager);
}

#[test]
fn test_last_validator_cannot_leave() {
    let mut h = Harness::new(validator_config(100, BootstrapAdmission::Unbounded));
    let pools = h.genesis(&[(1, 500), (2, 300)]);

    h.leave(1, pools[0]).unwrap();
    let before = h.manager.clone();
    assert_eq!(
        h.leave(2, pools[1]),
        Err(ValidatorSetError::CannotRemoveLastValidator {
            validator: pools[1]
        })
    );
    assert_eq!(h.manager, before);
    assert_eq!(h.status(pools[1]), ValidatorStatus::Active);
}

#[test]
fn test_index_contiguity_after_mixed_changes() {
    let mut h = Harness::new(validator_config(100, BootstrapAdmission::Unbounded));
    let pools = h.genesis(&[(1, 400), (2, 400), (3, 400), (4, 400)]);
    assert_indices_contiguous(&h.manager);

    h.leave(2, pools[1]).unwrap();
    let newcomer = h.register(5, 300);
    h.join(5, newcomer).unwrap();
    h.epoch_pass();

    assert_eq!(
        h.manager.active_validators(),
        &[pools[0], pools[2], pools[3], newcomer]
    );
    assert_indices_contiguous(&h.manager);
    assert_eq!(h.manager.get_validator(&newcomer).unwrap().validator_index, Some(3));
    assert_eq!(h.manager.current_epoch(), 1);
}

// =============================================================================
// Admission cap
// =============================================================================

#[test]
fn test_admission_cap_defers_and_keeps_order() {
    let mut h = Harness::new(validator_config(20, BootstrapAdmission::Unbounded));
    h.genesis(&[(1, 2_000)]);

    let a = h.register(2, 250);
    let b = h.register(3, 200);
    let c = h.register(4, 150);
    h.join(2, a).unwrap();
    h.join(3, b).unwrap();
    h.join(4, c).unwrap();

    // Budget 400: a fits (250), b does not (150 left), c still fits.
    h.epoch_pass();
    assert_eq!(h.status(a), ValidatorStatus::Active);
    assert_eq!(h.status(b), ValidatorStatus::PendingActive);
    assert_eq!(h.status(c), ValidatorStatus::Active);
    assert_eq!(h.manager.total_voting_power(), 2_400);
    assert_eq!(h.manager.pending_active(), &[b]);
    assert_eq!(&h.manager.active_validators()[1..], &[a, c]);

    // Budget 480 from the new total.
    h.epoch_pass();
    assert_eq!(h.status(b), ValidatorStatus::Active);
    assert_eq!(h.manager.total_voting_power(), 2_600);
    assert_eq!(&h.manager.active_validators()[1..], &[a, c, b]);
    assert_indices_contiguous(&h.manager);
}

#[test]
fn test_admitted_power_never_exceeds_budget() {
    let mut h = Harness::new(validator_config(30, BootstrapAdmission::Unbounded));
    h.genesis(&[(1, 1_000), (2, 700)]);

    for n in 10..20u8 {
        let pool = h.register(n, 100 + u128::from(n) * 7);
        h.join(n, pool).unwrap();
    }

    for _ in 0..6 {
        let prior = h.manager.total_voting_power();
        let budget = prior * 30 / 100;
        let before: Vec<Address> = h.manager.active_validators().to_vec();
        h.epoch_pass();

        let admitted: u128 = h
            .manager
            .active_validators()
            .iter()
            .filter(|p| !before.contains(p))
            .map(|p| h.staking.voting_power(p, h.now_us))
            .sum();
        assert!(admitted <= budget, "admitted {admitted} > budget {budget}");
        assert_indices_contiguous(&h.manager);
    }
    assert!(h.manager.pending_active().is_empty());
}

#[test]
fn test_pending_validator_below_minimum_is_dropped() {
    let mut h = Harness::new(validator_config(100, BootstrapAdmission::Unbounded));
    h.genesis(&[(1, 1_000)]);
    let pool = h.register(2, 150);
    h.join(2, pool).unwrap();

    // PendingActive does not hold an index, so the bond is unprotected.
    let status = h.status(pool);
    h.staking
        .unstake(owner(2), &pool, 100, status, MIN_BOND)
        .unwrap();
    h.epoch_pass();

    assert_eq!(h.status(pool), ValidatorStatus::Inactive);
    assert!(h.manager.pending_active().is_empty());
    assert_eq!(h.manager.active_count(), 1);
}

// =============================================================================
// Admission errors
// =============================================================================

#[test]
fn test_registration_errors() {
    let mut h = Harness::new(validator_config(100, BootstrapAdmission::Unbounded));
    h.genesis(&[(1, 1_000)]);

    let pool = h.fund(2, 150);
    let err = h
        .call(|m, ctx| m.register_validator(owner(2), params(pool, 2), ctx))
        .unwrap_err();
    assert!(matches!(err, ValidatorSetError::NotOperator { .. }));

    let mut long = params(pool, 2);
    long.moniker = "x".repeat(32);
    let err = h
        .call(|m, ctx| m.register_validator(operator(2), long, ctx))
        .unwrap_err();
    assert_eq!(err, ValidatorSetError::MonikerTooLong { length: 32, max: 31 });

    let weak = h.fund(3, 99);
    let err = h
        .call(|m, ctx| m.register_validator(operator(3), params(weak, 3), ctx))
        .unwrap_err();
    assert_eq!(
        err,
        ValidatorSetError::InsufficientVotingPower {
            validator: weak,
            voting_power: 99,
            minimum: MIN_BOND
        }
    );

    h.call(|m, ctx| m.register_validator(operator(2), params(pool, 2), ctx))
        .unwrap();
    let err = h
        .call(|m, ctx| m.register_validator(operator(2), params(pool, 2), ctx))
        .unwrap_err();
    assert_eq!(err, ValidatorSetError::AlreadyRegistered { validator: pool });

    let unfunded = Address::repeat_byte(0xee);
    let err = h
        .call(|m, ctx| m.register_validator(operator(9), params(unfunded, 9), ctx))
        .unwrap_err();
    assert!(matches!(
        err,
        ValidatorSetError::Staking(StakingError::PoolNotFound { .. })
    ));
}

#[test]
fn test_join_gates() {
    let mut config = validator_config(100, BootstrapAdmission::Unbounded);
    config.max_validator_set_size = 2;
    let mut h = Harness::new(config);
    h.genesis(&[(1, 1_000)]);
    let a = h.register(2, 200);
    let b = h.register(3, 200);

    h.transition_in_progress = true;
    assert_eq!(h.join(2, a), Err(ValidatorSetError::TransitionInProgress));
    h.transition_in_progress = false;

    h.config.allow_validator_set_change = false;
    assert_eq!(h.join(2, a), Err(ValidatorSetError::ValidatorSetChangeDisabled));
    h.config.allow_validator_set_change = true;

    h.join(2, a).unwrap();
    assert!(matches!(
        h.join(2, a),
        Err(ValidatorSetError::InvalidStatus {
            status: ValidatorStatus::PendingActive,
            ..
        })
    ));
    assert_eq!(
        h.join(3, b),
        Err(ValidatorSetError::ValidatorSetFull {
            active: 1,
            pending_active: 1,
            max: 2
        })
    );
}

#[test]
fn test_epoch_pass_is_orchestrator_only() {
    let mut h = Harness::new(validator_config(100, BootstrapAdmission::Unbounded));
    h.genesis(&[(1, 1_000)]);
    let err = h
        .call(|m, ctx| m.on_new_epoch(GENESIS_ADDR, ctx))
        .unwrap_err();
    assert!(matches!(err, ValidatorSetError::Access(_)));
    assert_eq!(h.manager.current_epoch(), 0);
}

// =============================================================================
// Minimum bond
// =============================================================================

#[test]
fn test_active_validator_stake_protected() {
    let mut h = Harness::new(validator_config(100, BootstrapAdmission::Unbounded));
    let pools = h.genesis(&[(1, 150), (2, 150)]);

    let status = h.status(pools[0]);
    let err = h
        .staking
        .unstake(owner(1), &pools[0], 60, status, MIN_BOND)
        .unwrap_err();
    assert_eq!(
        err,
        StakingError::BelowMinimumBond {
            pool: pools[0],
            remaining: 90,
            minimum: MIN_BOND
        }
    );
    h.staking
        .unstake(owner(1), &pools[0], 50, status, MIN_BOND)
        .unwrap();

    // Still protected while leaving.
    h.leave(1, pools[0]).unwrap();
    let status = h.status(pools[0]);
    assert_eq!(status, ValidatorStatus::PendingInactive);
    assert!(h
        .staking
        .unstake(owner(1), &pools[0], 1, status, MIN_BOND)
        .is_err());

    h.epoch_pass();
    let status = h.status(pools[0]);
    h.staking
        .unstake(owner(1), &pools[0], 100, status, MIN_BOND)
        .unwrap();
}

#[test]
fn test_epoch_pass_renews_lockups() {
    let mut h = Harness::new(validator_config(100, BootstrapAdmission::Unbounded));
    let pools = h.genesis(&[(1, 500)]);

    h.now_us = LOCKUP - 10;
    h.epoch_pass();
    assert_eq!(
        h.staking.pool(&pools[0]).unwrap().locked_until_us,
        LOCKUP - 10 + LOCKUP
    );

    h.now_us = LOCKUP + 5;
    assert_eq!(h.staking.voting_power(&pools[0], h.now_us), 500);
    h.epoch_pass();
    assert_eq!(h.manager.total_voting_power(), 500);
}

// =============================================================================
// Auto-eviction
// =============================================================================

#[test]
fn test_eviction_of_underperformers() {
    let mut config = validator_config(100, BootstrapAdmission::Unbounded);
    config.auto_evict_enabled = true;
    config.auto_evict_threshold = 1;
    let mut h = Harness::new(config);
    let pools = h.genesis(&[(1, 500), (2, 500), (3, 500)]);

    let mut perf = PerformanceTracker::new(3);
    perf.record(Some(0), &[1]);
    perf.record(Some(0), &[1]);

    let evicted = h
        .call(|m, ctx| m.evict_underperforming(RECONFIGURATION_ADDR, &perf, ctx))
        .unwrap();
    // Index 2 had no opportunities.
    assert_eq!(evicted, vec![pools[1]]);
    assert_eq!(h.status(pools[1]), ValidatorStatus::PendingInactive);

    h.epoch_pass();
    assert_eq!(h.status(pools[1]), ValidatorStatus::Inactive);
    assert_eq!(h.manager.active_validators(), &[pools[0], pools[2]]);
    assert_indices_contiguous(&h.manager);
}

#[test]
fn test_eviction_spares_last_validator() {
    let mut config = validator_config(100, BootstrapAdmission::Unbounded);
    config.auto_evict_enabled = true;
    let mut h = Harness::new(config);
    let pools = h.genesis(&[(1, 500)]);

    let mut perf = PerformanceTracker::new(1);
    perf.record(None, &[0]);

    let evicted = h
        .call(|m, ctx| m.evict_underperforming(RECONFIGURATION_ADDR, &perf, ctx))
        .unwrap();
    assert!(evicted.is_empty());
    assert_eq!(h.status(pools[0]), ValidatorStatus::Active);
}

#[test]
fn test_eviction_disabled_by_default() {
    let mut h = Harness::new(validator_config(100, BootstrapAdmission::Unbounded));
    h.genesis(&[(1, 500), (2, 500)]);
    let mut perf = PerformanceTracker::new(2);
    perf.record(Some(0), &[1, 1, 1]);

    let evicted = h
        .call(|m, ctx| m.evict_underperforming(RECONFIGURATION_ADDR, &perf, ctx))
        .unwrap();
    assert!(evicted.is_empty());
}

// =============================================================================
// Operator settings
// =============================================================================

#[test]
fn test_fee_recipient_and_operator_sync_at_pass() {
    let mut h = Harness::new(validator_config(100, BootstrapAdmission::Unbounded));
    let pools = h.genesis(&[(1, 500)]);
    let recipient = Address::repeat_byte(0x77);
    let new_operator = Address::repeat_byte(0x88);

    h.call(|m, ctx| m.update_fee_recipient(operator(1), &pools[0], recipient, ctx))
        .unwrap();
    h.staking
        .set_operator(owner(1), &pools[0], new_operator)
        .unwrap();

    let record = h.manager.get_validator(&pools[0]).unwrap();
    assert_eq!(record.fee_recipient, owner(1));
    assert_eq!(record.operator, operator(1));

    h.epoch_pass();
    let record = h.manager.get_validator(&pools[0]).unwrap();
    assert_eq!(record.fee_recipient, recipient);
    assert_eq!(record.pending_fee_recipient, None);
    assert_eq!(record.operator, new_operator);
    assert!(h.events.events().iter().any(|e| matches!(
        e,
        SystemEvent::FeeRecipientUpdated { applied: true, .. }
    )));
}

#[test]
fn test_consensus_key_rotation() {
    let mut h = Harness::new(validator_config(100, BootstrapAdmission::Unbounded));
    let pools = h.genesis(&[(1, 500)]);

    let err = h
        .call(|m, ctx| {
            m.rotate_consensus_key(
                operator(1),
                &pools[0],
                Bytes::from(vec![9u8; 47]),
                Bytes::from(vec![9u8; BLS_POP_LENGTH]),
                ctx,
            )
        })
        .unwrap_err();
    assert!(matches!(err, ValidatorSetError::InvalidConsensusKey { .. }));

    let key = Bytes::from(vec![9u8; BLS_PUBKEY_LENGTH]);
    h.call(|m, ctx| {
        m.rotate_consensus_key(
            operator(1),
            &pools[0],
            key.clone(),
            Bytes::from(vec![9u8; BLS_POP_LENGTH]),
            ctx,
        )
    })
    .unwrap();
    assert_eq!(h.manager.get_active_validators()[0].consensus_pubkey, key);
}

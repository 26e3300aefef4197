//! Well-known system identities and address derivation.
//!
//! Every core component is reachable only through a fixed caller identity.
//! Capability checks compare the caller against these constants instead of
//! holding locks: the execution model is single-threaded, so the call graph
//! itself is the concurrency control.

use alloy_primitives::{address, Address, B256};
use sha3::{Digest, Keccak256, Sha3_256};

/// The execution runtime / consensus engine.
///
/// Also used as the resolved proposer for NIL blocks.
pub const SYSTEM_CALLER: Address = address!("00000000000000000000000000000001625F0000");

/// One-time genesis initializer.
pub const GENESIS_ADDR: Address = address!("00000000000000000000000000000001625F0001");

/// Global time source.
pub const TIMESTAMP_ADDR: Address = address!("00000000000000000000000000000001625F1000");

/// Staking parameter storage.
pub const STAKE_CONFIG_ADDR: Address = address!("00000000000000000000000000000001625F1001");

/// Validator parameter storage.
pub const VALIDATOR_CONFIG_ADDR: Address = address!("00000000000000000000000000000001625F1002");

/// Randomness / DKG parameter storage.
pub const RANDOMNESS_CONFIG_ADDR: Address = address!("00000000000000000000000000000001625F1003");

/// Epoch interval storage.
pub const EPOCH_CONFIG_ADDR: Address = address!("00000000000000000000000000000001625F1005");

/// Stake registry.
pub const STAKING_ADDR: Address = address!("00000000000000000000000000000001625F2000");

/// Validator set manager.
pub const VALIDATOR_MANAGER_ADDR: Address = address!("00000000000000000000000000000001625F2001");

/// DKG session manager.
pub const DKG_ADDR: Address = address!("00000000000000000000000000000001625F2002");

/// Epoch orchestrator.
pub const RECONFIGURATION_ADDR: Address = address!("00000000000000000000000000000001625F2003");

/// Block prologue handler.
pub const BLOCK_ADDR: Address = address!("00000000000000000000000000000001625F2004");

/// Governance executor.
pub const GOVERNANCE_ADDR: Address = address!("00000000000000000000000000000001625F3000");

/// Derives the stake pool address for `owner`'s `nonce`-th pool.
///
/// The pool address is the last 20 bytes of `keccak256(owner || nonce_be)`.
pub fn derive_pool_address(owner: &Address, nonce: u64) -> Address {
    let mut hasher = Keccak256::new();
    hasher.update(owner.as_slice());
    hasher.update(nonce.to_be_bytes());
    let digest = hasher.finalize();
    Address::from_slice(&digest[12..])
}

/// Account address bound to a consensus public key (SHA3-256 of the key bytes).
pub fn consensus_account_address(consensus_pubkey: &[u8]) -> B256 {
    B256::from_slice(&Sha3_256::digest(consensus_pubkey))
}

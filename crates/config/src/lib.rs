//! # Epoch Core Configuration
//!
//! This crate provides configuration parsing and genesis handling for the epoch
//! management core.
//!
//! All chain settings live in one `epochcore.toml` file. Values consumed by the
//! core at runtime (epoch interval, validator admission rules, randomness
//! thresholds) are injected from here rather than held as internal globals, so
//! every component can be driven by mock configuration in tests.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use epochcore_config::Config;
//! use std::path::Path;
//!
//! let config = Config::load(Path::new("epochcore.toml"))?;
//! println!("Epoch interval: {}us", config.epoch.epoch_interval_micros);
//! println!("Genesis validators: {}", config.genesis.validators.len());
//! ```
//!
//! ## Configuration Sections
//!
//! - `[chain]` - Chain identity
//! - `[epoch]` - Epoch interval
//! - `[validator]` - Bonds, admission cap, set size, auto-eviction
//! - `[staking]` - Minimum stake and lockup duration
//! - `[randomness]` - DKG variant and thresholds
//! - `[logging]` - Log level and format
//! - `[genesis]` / `[[genesis.validators]]` - Initial validator set

mod config;
mod error;
mod genesis;

pub use config::*;
pub use error::*;
pub use genesis::*;

/// Re-export alloy primitives for convenience
pub use alloy_primitives::{Address, Bytes};

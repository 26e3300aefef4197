//! # Epoch Core CLI
//!
//! Command-line tools for bootstrapping and exercising the epoch management
//! core without a consensus engine attached.
//!
//! ## Available Commands
//!
//! - `init` - Write a default configuration with a devnet genesis set
//! - `genesis` - Bootstrap the runtime from a configuration and verify the active set
//! - `simulate` - Drive blocks and epoch transitions at a fixed block time
//! - `inspect` - Print the state held in a runtime snapshot
//!
//! ## Example Usage
//!
//! ```bash
//! # Write epochcore.toml with four devnet validators and 10s epochs
//! epochcore init --validators 4 --epoch-interval-secs 10
//!
//! # Verify genesis and save the initial state
//! epochcore genesis --config epochcore.toml --snapshot genesis.json
//!
//! # Run 100 one-second blocks, then look at the result
//! epochcore simulate --config epochcore.toml --blocks 100 --snapshot state.json
//! epochcore inspect state.json
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod commands;
pub mod utils;

// Re-export the main CLI types for convenience
pub use commands::{run_cli, Cli, Commands};
pub use utils::{CliError, CliResult, LogFormat, OutputFormat};

/// Version information for the CLI
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// CLI application name
pub const APP_NAME: &str = "epochcore";

/// Default configuration file name
pub const DEFAULT_CONFIG_FILE: &str = "epochcore.toml";

/// Default snapshot file name
pub const DEFAULT_SNAPSHOT_FILE: &str = "snapshot.json";

/// Get the default configuration file path (relative to the working directory)
pub fn default_config_path() -> std::path::PathBuf {
    std::path::PathBuf::from(DEFAULT_CONFIG_FILE)
}

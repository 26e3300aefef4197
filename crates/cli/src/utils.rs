//! Shared utilities for CLI commands.
//!
//! This module provides common functionality used across CLI commands:
//! - Error types and result handling
//! - Output formatting
//! - Config and snapshot file handling
//! - Display formatting helpers

use clap::ValueEnum;
use epochcore_config::{Config, ConfigError, GenesisConfig};
use epochcore_consensus::{RuntimeError, RuntimeSnapshot};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// CLI error types
#[derive(Error, Debug)]
pub enum CliError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Runtime call rejected
    #[error("Runtime error: {0}")]
    Runtime(#[from] RuntimeError),

    /// Invalid argument
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// File not found
    #[error("File not found: {0}")]
    FileNotFound(String),

    /// File already exists
    #[error("{0} already exists. Use --force to overwrite.")]
    AlreadyExists(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// CLI result type alias
pub type CliResult<T> = Result<T, CliError>;

// ============================================================================
// Output Formatting
// ============================================================================

/// Output format options
#[derive(Debug, Clone, Copy, ValueEnum, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable text output
    #[default]
    Text,
    /// JSON output for scripting
    Json,
}

/// Log line format
#[derive(Debug, Clone, Copy, ValueEnum, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable text
    #[default]
    Text,
    /// Structured JSON
    Json,
    /// Compact single-line text
    Compact,
}

/// Print an info message to stderr (so JSON output stays clean)
pub fn print_info(msg: &str) {
    use console::style;
    eprintln!("{} {}", style("[INFO]").cyan().bold(), msg);
}

/// Print a success message to stderr
pub fn print_success(msg: &str) {
    use console::style;
    eprintln!("{} {}", style("[OK]").green().bold(), msg);
}

/// Print a warning message to stderr
pub fn print_warning(msg: &str) {
    use console::style;
    eprintln!("{} {}", style("[WARN]").yellow().bold(), msg);
}

/// Print an error message to stderr
pub fn print_error(msg: &str) {
    use console::style;
    eprintln!("{} {}", style("[ERROR]").red().bold(), msg);
}

/// Print a value as pretty JSON on stdout
pub fn print_json<T: serde::Serialize>(value: &T) -> CliResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// ============================================================================
// Files
// ============================================================================

/// Load a config file, optionally replacing its genesis section with a
/// standalone genesis JSON file.
///
/// Validation happens when the runtime is built, so a config without a
/// genesis section is accepted here when `genesis_json` supplies one.
pub fn load_config(path: &Path, genesis_json: Option<&Path>) -> CliResult<Config> {
    if !path.exists() {
        return Err(CliError::FileNotFound(path.display().to_string()));
    }

    let Some(genesis_path) = genesis_json else {
        return Ok(Config::load(path)?);
    };
    if !genesis_path.exists() {
        return Err(CliError::FileNotFound(genesis_path.display().to_string()));
    }

    let content = std::fs::read_to_string(path)?;
    let mut config: Config = toml::from_str(&content).map_err(ConfigError::from)?;
    config.genesis = GenesisConfig::load_json(genesis_path)?;
    tracing::debug!(
        genesis = %genesis_path.display(),
        validators = config.genesis.validators.len(),
        "Genesis replaced from JSON"
    );
    Ok(config)
}

/// Write a runtime snapshot as pretty JSON, creating parent directories.
pub fn write_snapshot(path: &Path, snapshot: &RuntimeSnapshot) -> CliResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, serde_json::to_string_pretty(snapshot)?)?;
    tracing::debug!(path = %path.display(), "Snapshot written");
    Ok(())
}

/// Read a runtime snapshot written by [`write_snapshot`].
pub fn read_snapshot(path: &Path) -> CliResult<RuntimeSnapshot> {
    if !path.exists() {
        return Err(CliError::FileNotFound(path.display().to_string()));
    }
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

// ============================================================================
// Display helpers
// ============================================================================

/// Format a number with thousand separators
pub fn format_with_commas(n: u128) -> String {
    let s = n.to_string();
    let mut result = String::new();
    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result.chars().rev().collect()
}

/// Format a microsecond timestamp as UTC
pub fn format_timestamp_micros(micros: u64) -> String {
    use chrono::{TimeZone, Utc};
    let secs = (micros / 1_000_000) as i64;
    let nanos = ((micros % 1_000_000) * 1_000) as u32;
    match Utc.timestamp_opt(secs, nanos) {
        chrono::LocalResult::Single(dt) => dt.format("%Y-%m-%d %H:%M:%S%.3f UTC").to_string(),
        _ => micros.to_string(),
    }
}

/// Format a duration for display
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else if secs < 86400 {
        format!("{}h {}m", secs / 3600, (secs % 3600) / 60)
    } else {
        format!("{}d {}h", secs / 86400, (secs % 86400) / 3600)
    }
}

/// Format a microsecond span for display
pub fn format_micros(micros: u64) -> String {
    format_duration(Duration::from_micros(micros))
}

/// Shorten a hex string to `0x1234…abcd` form
pub fn truncate_hex(hex: &str, keep: usize) -> String {
    let body = hex.strip_prefix("0x").unwrap_or(hex);
    if body.len() <= keep * 2 {
        return format!("0x{}", body);
    }
    format!("0x{}…{}", &body[..keep], &body[body.len() - keep..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_hex() {
        assert_eq!(truncate_hex("0x1234", 4), "0x1234");
        assert_eq!(truncate_hex("0x1234567890abcdef", 4), "0x1234…cdef");
        assert_eq!(truncate_hex("abcdef0123456789", 2), "0xab…89");
    }

    #[test]
    fn test_format_micros() {
        assert_eq!(format_micros(1_500_000), "1s");
        assert_eq!(format_micros(7_200_000_000), "2h 0m");
    }
}

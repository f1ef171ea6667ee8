//! Configuration loading and schema definitions for fern-junit-client.
//!
//! This module provides types and functions for loading configuration from
//! TOML files or strings. Everything in the file can also be given on the
//! command line.

pub mod schema;

pub use schema::*;

use std::path::Path;

use anyhow::{Context, Result};

/// Default configuration file, read from the working directory if present.
pub const DEFAULT_CONFIG_FILE: &str = "fern.toml";

/// Loads configuration from a TOML file.
///
/// # Errors
///
/// Returns an error if:
/// - The file cannot be read (e.g., doesn't exist or permission denied)
/// - The file contains invalid TOML syntax
/// - The configuration doesn't match the expected schema
///
/// # Example
///
/// ```no_run
/// use fern_junit_client::config::load_config;
/// use std::path::Path;
///
/// let config = load_config(Path::new("fern.toml"))?;
/// println!("Publishing to {}", config.fern_url());
/// # Ok::<(), anyhow::Error>(())
/// ```
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

    Ok(config)
}

/// Loads configuration from a TOML string.
///
/// # Example
///
/// ```
/// use fern_junit_client::config::load_config_str;
///
/// let config = load_config_str(r#"
///     [fern]
///     url = "https://fern.example.com"
///     project_name = "web"
///     report_paths = ["build/test-results/**/*.xml"]
/// "#)?;
///
/// assert_eq!(config.fern.project_name, "web");
/// # Ok::<(), anyhow::Error>(())
/// ```
pub fn load_config_str(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).context("Failed to parse config")?;

    Ok(config)
}

//! Configuration schema definitions for fern-junit-client.
//!
//! This module defines the configuration types that can be deserialized from
//! a TOML file. Every section is optional; command-line flags fill in or
//! override whatever the file leaves out.
//!
//! # Schema Overview
//!
//! ```text
//! Config (root)
//! ├── FernConfig       - Target instance, project identity, report paths, tags
//! └── PublishConfig    - Retry policy for the upload
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{FernError, FernResult};
use crate::publish::{DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_DELAY};

/// Root configuration structure.
///
/// # TOML Structure
///
/// ```toml
/// [fern]
/// url = "https://fern.example.com"
/// project_name = "my-project"
/// report_paths = ["build/test-results/**/*.xml"]
/// tags = ["nightly", "linux"]
///
/// [publish]
/// max_attempts = 3
/// retry_delay_ms = 500
/// ```
///
/// # Example
///
/// ```
/// use fern_junit_client::config::Config;
///
/// let config: Config = toml::from_str(r#"
///     [fern]
///     url = "http://localhost:8080/"
///     project_id = "a1b2"
///     report_paths = ["target/reports/*.xml"]
/// "#).unwrap();
///
/// assert_eq!(config.fern_url(), "http://localhost:8080");
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    /// Where to publish and what to read.
    #[serde(default)]
    pub fern: FernConfig,

    /// Upload retry settings (optional, has defaults).
    #[serde(default)]
    pub publish: PublishConfig,
}

/// Target instance, project identity and report selection.
///
/// # Defaults
///
/// | Field | Default |
/// |-------|---------|
/// | `url` | empty (required) |
/// | `project_name` / `project_id` | empty (one required) |
/// | `report_paths` | empty (required) |
/// | `tags` | none |
/// | `project_dir` | None (current directory) |
/// | `verbose` | false |
/// | `fail_on_error` | true |
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FernConfig {
    /// Base URL of the Fern instance, e.g. `https://fern.example.com`.
    #[serde(default)]
    pub url: String,

    /// Name of the project the run belongs to.
    #[serde(default)]
    pub project_name: String,

    /// ID of the project the run belongs to.
    #[serde(default)]
    pub project_id: String,

    /// Report file patterns, processed in order.
    ///
    /// See [`crate::discovery`] for the pattern rules.
    #[serde(default)]
    pub report_paths: Vec<String>,

    /// Labels attached to every spec of the run.
    #[serde(default)]
    pub tags: Vec<String>,

    /// Directory report patterns are relative to.
    pub project_dir: Option<PathBuf>,

    /// Log per-file and per-suite detail.
    #[serde(default)]
    pub verbose: bool,

    /// Abort on the first report path that fails, and fail the process if
    /// publishing fails. When false, failing paths are skipped with a
    /// warning and a publish failure is only logged.
    ///
    /// Default: true
    #[serde(default = "default_true")]
    pub fail_on_error: bool,
}

impl Default for FernConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            project_name: String::new(),
            project_id: String::new(),
            report_paths: Vec::new(),
            tags: Vec::new(),
            project_dir: None,
            verbose: false,
            fail_on_error: true,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Upload retry policy.
///
/// # Example
///
/// ```toml
/// [publish]
/// max_attempts = 5
/// retry_delay_ms = 1000
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PublishConfig {
    /// Send cycles allowed. Redirects within a cycle do not count.
    ///
    /// Default: 3
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Pause after a failed attempt, in milliseconds.
    ///
    /// Default: 500
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}

fn default_retry_delay_ms() -> u64 {
    DEFAULT_RETRY_DELAY.as_millis() as u64
}

impl Config {
    /// The Fern base URL without a trailing `/`.
    pub fn fern_url(&self) -> &str {
        self.fern.url.trim_end_matches('/')
    }

    /// Tags joined into the comma-separated form the run builder takes.
    pub fn tag_string(&self) -> String {
        self.fern.tags.join(",")
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.publish.retry_delay_ms)
    }

    /// Checks that the configuration is complete enough to publish.
    ///
    /// # Errors
    ///
    /// Returns [`FernError::Config`] if:
    /// - the URL is empty or does not start with `http`
    /// - both project name and project ID are blank
    /// - no report path is given
    /// - `max_attempts` is zero
    pub fn validate(&self) -> FernResult<()> {
        let url = self.fern_url();
        if url.is_empty() {
            return Err(FernError::Config("Fern URL must be specified".to_string()));
        }
        if !url.starts_with("http") {
            return Err(FernError::Config(
                "Fern URL must start with 'http' or 'https'".to_string(),
            ));
        }
        if self.fern.project_name.trim().is_empty() && self.fern.project_id.trim().is_empty() {
            return Err(FernError::Config(
                "a projectId or a projectName must be specified".to_string(),
            ));
        }
        if self.fern.report_paths.is_empty() {
            return Err(FernError::Config(
                "No report paths provided. Cannot publish results.".to_string(),
            ));
        }
        if self.publish.max_attempts == 0 {
            return Err(FernError::Config(
                "publish.max_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

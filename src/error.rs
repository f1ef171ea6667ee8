//! Error types shared by discovery, parsing, run building and publishing.
//!
//! Every fallible operation in this crate returns [`FernResult`], so callers
//! only ever match on one error type regardless of which stage failed.

use std::path::PathBuf;

/// Result type for all report ingestion and publishing operations.
pub type FernResult<T> = Result<T, FernError>;

/// Errors that can occur while collecting, converting or publishing reports.
///
/// # Error Categories
///
/// - **Discovery**: [`FernError::NotFound`], [`FernError::Io`]
/// - **Parsing**: [`FernError::Parse`], [`FernError::TimeParse`], [`FernError::DurationParse`]
/// - **Publishing**: [`FernError::Protocol`], [`FernError::UnexpectedStatus`],
///   [`FernError::Transport`], [`FernError::Serialize`]
#[derive(Debug, thiserror::Error)]
pub enum FernError {
    /// A report pattern resolved to zero files.
    #[error("No files found for pattern {pattern} with baseDir {}", base_dir.display())]
    NotFound { pattern: String, base_dir: PathBuf },

    /// A report file or directory could not be read.
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The report is not well-formed XML.
    #[error("Failed to parse {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    /// A suite `timestamp` attribute is not an ISO-8601 instant.
    #[error("Failed to parse start time {value:?} of suite {suite:?} in {}: {reason}", path.display())]
    TimeParse {
        path: PathBuf,
        suite: String,
        value: String,
        reason: String,
    },

    /// A `time` attribute is not a finite number of seconds.
    #[error("Invalid duration format: {value:?} on {element} in {}", path.display())]
    DurationParse {
        path: PathBuf,
        element: String,
        value: String,
    },

    /// The server answered in a way the client cannot follow.
    #[error("Protocol error: {message}")]
    Protocol { message: String },

    /// The final response after all attempts had a status code >= 300.
    #[error("Unexpected response code: {status}")]
    UnexpectedStatus { status: u16 },

    /// The HTTP request could not be sent or its response not received.
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The run could not be encoded as JSON.
    #[error("Failed to serialize test run: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl FernError {
    /// Whether the error came from reading reports rather than publishing them.
    ///
    /// Report errors are scoped to a single report path and may be skipped
    /// when the caller is not failing fast.
    pub fn is_report_error(&self) -> bool {
        matches!(
            self,
            Self::NotFound { .. }
                | Self::Io { .. }
                | Self::Parse { .. }
                | Self::TimeParse { .. }
                | Self::DurationParse { .. }
        )
    }
}

//! fern-junit-client: publish JUnit XML test reports to Fern.
//!
//! This crate reads JUnit-style XML reports produced by any test runner,
//! normalizes them into a single test run record, and uploads that record to
//! a Fern reporting instance.
//!
//! # Architecture
//!
//! The main components are:
//!
//! - **Discovery**: Resolve file patterns into report files ([`discovery`])
//! - **JUnit**: Parse report XML into a structural model ([`junit`])
//! - **Ingest**: Build suite and spec runs with a synthetic timeline ([`ingest`])
//! - **Publish**: Upload the run with redirect-following and retry ([`publish`])
//!
//! ```text
//!  pattern ──► discovery ──► files ──► junit ──► TestSuite ──► ingest ──► TestRun
//!                                                                           │
//!                                                                  publish ◄┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use fern_junit_client::clock::SystemClock;
//! use fern_junit_client::model::{TestRun, random_seed};
//! use fern_junit_client::{parse_reports_into, publish};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut run = TestRun::new("my-project", "", random_seed());
//!     parse_reports_into(&mut run, "build/test-results/**/*.xml", None, "ci", &SystemClock)?;
//!     publish(&run, "https://fern.example.com").await?;
//!     Ok(())
//! }
//! ```

pub mod clock;
pub mod config;
pub mod discovery;
pub mod error;
pub mod ingest;
pub mod junit;
pub mod model;
pub mod publish;
pub mod report;

// Re-export commonly used types
pub use config::{Config, load_config};
pub use error::{FernError, FernResult};
pub use ingest::{RunBuilder, parse_reports_into};
pub use model::{SpecRun, SpecStatus, SuiteRun, Tag, TestRun};
pub use publish::{Publisher, publish};

//! Converting parsed reports into the published run.
//!
//! JUnit XML records a start timestamp and a duration for each suite, but
//! only a duration for each test case. Spec timings are therefore rebuilt as
//! a synthetic timeline: the first case starts when its suite starts, and
//! every following case starts when the previous one ended.
//!
//! ```text
//! suite  |------------------------------| start + time
//! case A |--------|                       start .. start + a
//! case B          |-----------|           .. + b
//! case C                      |-----|     .. + c
//! ```
//!
//! # Example
//!
//! ```no_run
//! use fern_junit_client::clock::SystemClock;
//! use fern_junit_client::ingest::parse_reports_into;
//! use fern_junit_client::model::{TestRun, random_seed};
//!
//! let mut run = TestRun::new("my-project", "", random_seed());
//! parse_reports_into(&mut run, "build/test-results/**/*.xml", None, "nightly,linux", &SystemClock)?;
//! println!("{} suites", run.suite_runs.len());
//! # Ok::<(), fern_junit_client::FernError>(())
//! ```

use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeDelta, Utc};
use tracing::{debug, info};

use crate::clock::{Clock, SystemClock};
use crate::discovery::ReportPattern;
use crate::error::{FernError, FernResult};
use crate::junit::{self, TestSuite};
use crate::model::{SpecRun, SuiteRun, Tag, TestRun};

/// Splits a comma-separated tag string, dropping empty segments.
///
/// ```
/// use fern_junit_client::ingest::parse_tags;
///
/// let tags: Vec<_> = parse_tags("a,b,,c").into_iter().map(|t| t.name).collect();
/// assert_eq!(tags, vec!["a", "b", "c"]);
/// ```
pub fn parse_tags(tags: &str) -> Vec<Tag> {
    tags.split(',')
        .filter(|segment| !segment.is_empty())
        .map(Tag::new)
        .collect()
}

/// `start` plus `seconds` (a decimal number of seconds), rounded to the
/// millisecond. Negative durations count as zero so the timeline never
/// runs backwards.
///
/// `path` and `element` only describe the attribute in the error.
///
/// # Errors
///
/// Returns [`FernError::DurationParse`] if `seconds` is empty, not a number,
/// or not finite.
pub fn end_time(
    start: DateTime<Utc>,
    seconds: &str,
    path: &Path,
    element: &str,
) -> FernResult<DateTime<Utc>> {
    let invalid = || FernError::DurationParse {
        path: path.to_path_buf(),
        element: element.to_string(),
        value: seconds.to_string(),
    };

    let secs: f64 = seconds.trim().parse().map_err(|_| invalid())?;
    if !secs.is_finite() {
        return Err(invalid());
    }

    let millis = (secs.max(0.0) * 1000.0).round() as i64;
    let delta = TimeDelta::try_milliseconds(millis).ok_or_else(invalid)?;
    start.checked_add_signed(delta).ok_or_else(invalid)
}

/// Start of a suite: its `timestamp` attribute, or `clock.now()` when empty.
///
/// Timestamps without a trailing `Z` are read as UTC.
///
/// # Errors
///
/// Returns [`FernError::TimeParse`] if the timestamp is not an ISO-8601
/// instant.
pub fn suite_start_time(suite: &TestSuite, clock: &dyn Clock) -> FernResult<DateTime<Utc>> {
    if suite.timestamp.is_empty() {
        return Ok(clock.now());
    }

    let timestamp = if suite.timestamp.ends_with('Z') {
        suite.timestamp.clone()
    } else {
        format!("{}Z", suite.timestamp)
    };

    DateTime::parse_from_rfc3339(&timestamp)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| FernError::TimeParse {
            path: suite.source.clone(),
            suite: suite.name.clone(),
            value: suite.timestamp.clone(),
            reason: e.to_string(),
        })
}

/// Builds [`SuiteRun`]s from parsed reports.
///
/// Holds the invocation-wide settings: the tag list every spec receives, the
/// directory report patterns are relative to, and the clock used for suites
/// without a timestamp.
#[derive(Debug, Clone)]
pub struct RunBuilder<C = SystemClock> {
    clock: C,
    tags: Vec<Tag>,
    project_dir: Option<PathBuf>,
}

impl RunBuilder<SystemClock> {
    /// A builder with no tags, no project directory and the system clock.
    pub fn new() -> Self {
        Self {
            clock: SystemClock,
            tags: Vec::new(),
            project_dir: None,
        }
    }
}

impl Default for RunBuilder<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> RunBuilder<C> {
    /// Replaces the clock.
    pub fn with_clock<D: Clock>(self, clock: D) -> RunBuilder<D> {
        RunBuilder {
            clock,
            tags: self.tags,
            project_dir: self.project_dir,
        }
    }

    /// Sets the tags from a comma-separated string.
    pub fn with_tags(mut self, tags: &str) -> Self {
        self.tags = parse_tags(tags);
        self
    }

    /// Resolves report patterns relative to `dir`.
    pub fn with_project_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.project_dir = Some(dir.into());
        self
    }

    pub fn tags(&self) -> &[Tag] {
        &self.tags
    }

    /// Converts one parsed suite.
    ///
    /// # Errors
    ///
    /// - [`FernError::TimeParse`] for a bad suite timestamp
    /// - [`FernError::DurationParse`] for a bad suite or case `time`
    pub fn suite_run(&self, suite: &TestSuite) -> FernResult<SuiteRun> {
        debug!("Parsing TestSuite: {}", suite.name);

        let start_time = suite_start_time(suite, &self.clock)?;
        let end = end_time(
            start_time,
            &suite.time,
            &suite.source,
            &format!("testsuite {:?}", suite.name),
        )?;

        let mut spec_runs = Vec::with_capacity(suite.cases.len());
        let mut case_start = start_time;
        for case in &suite.cases {
            let case_end = end_time(
                case_start,
                &case.time,
                &suite.source,
                &format!("testcase {:?}", case.name),
            )?;

            let spec = SpecRun {
                spec_description: case.name.clone(),
                status: case.status(),
                message: case.message(),
                tags: self.tags.clone(),
                start_time: case_start,
                end_time: case_end,
            };
            debug!(
                "Resulting SpecRun: {} [{:?}] {} .. {}",
                spec.spec_description, spec.status, spec.start_time, spec.end_time
            );
            spec_runs.push(spec);
            case_start = case_end;
        }

        Ok(SuiteRun {
            suite_name: suite.name.clone(),
            start_time,
            end_time: end,
            spec_runs,
        })
    }

    /// Parses every suite of the report at `path`.
    pub fn parse_report(&self, path: &Path) -> FernResult<Vec<SuiteRun>> {
        junit::parse_report(path)?
            .iter()
            .map(|suite| self.suite_run(suite))
            .collect()
    }

    /// Resolves `file_pattern`, parses every matching report and appends the
    /// suites to `run`.
    ///
    /// The run is only modified if every file of the pattern converted
    /// successfully.
    ///
    /// # Errors
    ///
    /// - [`FernError::NotFound`] if the pattern matched no file
    /// - any parse or conversion error of a matched file
    pub fn parse_reports_into(&self, run: &mut TestRun, file_pattern: &str) -> FernResult<()> {
        let pattern = ReportPattern::new(file_pattern, self.project_dir.as_deref())?;
        let files = pattern.resolve()?;
        debug!(
            "Pattern {} matched {} file(s) under {}",
            file_pattern,
            files.len(),
            pattern.base_dir().display()
        );

        let mut suites = Vec::new();
        for file in &files {
            suites.extend(self.parse_report(file)?);
        }

        info!(
            "Parsed {} suite(s) from {} file(s) matching {}",
            suites.len(),
            files.len(),
            file_pattern
        );
        for suite in suites {
            run.push_suite(suite);
        }

        debug!("TestRun start time: {:?}", run.start_time);
        debug!("TestRun end time: {:?}", run.end_time);
        Ok(())
    }
}

/// Parses every report matching `file_pattern` into `run`.
///
/// `tags` is a comma-separated list applied to every spec. See
/// [`RunBuilder::parse_reports_into`].
pub fn parse_reports_into(
    run: &mut TestRun,
    file_pattern: &str,
    project_dir: Option<&Path>,
    tags: &str,
    clock: &dyn Clock,
) -> FernResult<()> {
    let mut builder = RunBuilder::new().with_clock(clock).with_tags(tags);
    if let Some(dir) = project_dir {
        builder = builder.with_project_dir(dir);
    }
    builder.parse_reports_into(run, file_pattern)
}

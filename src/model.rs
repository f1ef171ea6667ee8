//! The run record published to Fern.
//!
//! These types are both the in-memory domain model and the wire format:
//! serializing a [`TestRun`] with `serde_json` yields the request body the
//! `/api/testrun/` endpoint expects. Every field is always present.
//!
//! ```json
//! {
//!   "test_project_name": "my-project",
//!   "test_project_id": "",
//!   "test_seed": 4217,
//!   "start_time": "2023-01-01T09:00:00Z",
//!   "end_time": "2023-01-01T09:00:01.500Z",
//!   "suite_runs": [
//!     {
//!       "suite_name": "S",
//!       "start_time": "2023-01-01T09:00:00Z",
//!       "end_time": "2023-01-01T09:00:01.500Z",
//!       "spec_runs": [
//!         {
//!           "spec_description": "A",
//!           "status": "passed",
//!           "message": "",
//!           "tags": [{ "name": "nightly" }],
//!           "start_time": "2023-01-01T09:00:00Z",
//!           "end_time": "2023-01-01T09:00:00.500Z"
//!         }
//!       ]
//!     }
//!   ]
//! }
//! ```

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// One invocation's aggregated results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestRun {
    pub test_project_name: String,
    pub test_project_id: String,
    /// Distinguishes otherwise identical runs.
    pub test_seed: i64,
    /// Earliest suite start seen so far.
    pub start_time: Option<DateTime<Utc>>,
    /// Latest suite end seen so far.
    pub end_time: Option<DateTime<Utc>>,
    /// Suites in discovery order.
    pub suite_runs: Vec<SuiteRun>,
}

/// Results of one `<testsuite>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuiteRun {
    pub suite_name: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub spec_runs: Vec<SpecRun>,
}

/// Result of one `<testcase>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecRun {
    pub spec_description: String,
    pub status: SpecStatus,
    /// Empty unless the spec failed.
    pub message: String,
    pub tags: Vec<Tag>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

/// Outcome of a spec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpecStatus {
    Passed,
    Failed,
    Skipped,
}

/// A label applied to every spec of an invocation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
}

impl Tag {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Pass/fail/skip totals across a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunCounts {
    pub suites: usize,
    pub specs: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
}

/// A random non-negative 63-bit seed.
pub fn random_seed() -> i64 {
    rand::thread_rng().gen_range(0..i64::MAX)
}

impl TestRun {
    /// Creates an empty run.
    pub fn new(project_name: impl Into<String>, project_id: impl Into<String>, seed: i64) -> Self {
        Self {
            test_project_name: project_name.into(),
            test_project_id: project_id.into(),
            test_seed: seed,
            start_time: None,
            end_time: None,
            suite_runs: Vec::new(),
        }
    }

    /// Appends a suite and widens the run's time bounds to cover it.
    pub fn push_suite(&mut self, suite: SuiteRun) {
        if self.start_time.is_none_or(|start| suite.start_time < start) {
            self.start_time = Some(suite.start_time);
        }
        if self.end_time.is_none_or(|end| suite.end_time > end) {
            self.end_time = Some(suite.end_time);
        }
        self.suite_runs.push(suite);
    }

    /// Returns `true` if no suite has been added.
    pub fn is_empty(&self) -> bool {
        self.suite_runs.is_empty()
    }

    /// Total number of specs across all suites.
    pub fn spec_count(&self) -> usize {
        self.suite_runs.iter().map(|s| s.spec_runs.len()).sum()
    }

    pub fn counts(&self) -> RunCounts {
        let mut counts = RunCounts {
            suites: self.suite_runs.len(),
            ..RunCounts::default()
        };
        for spec in self.suite_runs.iter().flat_map(|s| &s.spec_runs) {
            counts.specs += 1;
            match spec.status {
                SpecStatus::Passed => counts.passed += 1,
                SpecStatus::Failed => counts.failed += 1,
                SpecStatus::Skipped => counts.skipped += 1,
            }
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2023, 1, 1, 9, 0, secs).unwrap()
    }

    fn suite(name: &str, start: u32, end: u32) -> SuiteRun {
        SuiteRun {
            suite_name: name.to_string(),
            start_time: at(start),
            end_time: at(end),
            spec_runs: Vec::new(),
        }
    }

    #[test]
    fn test_bounds_track_min_start_and_max_end() {
        let mut run = TestRun::new("proj", "", 1);
        assert_eq!(run.start_time, None);
        assert_eq!(run.end_time, None);

        run.push_suite(suite("b", 10, 20));
        assert_eq!(run.start_time, Some(at(10)));
        assert_eq!(run.end_time, Some(at(20)));

        run.push_suite(suite("a", 5, 8));
        run.push_suite(suite("c", 12, 30));
        assert_eq!(run.start_time, Some(at(5)));
        assert_eq!(run.end_time, Some(at(30)));

        let names: Vec<_> = run.suite_runs.iter().map(|s| s.suite_name.as_str()).collect();
        assert_eq!(names, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_bounds_independent_of_append_order() {
        let suites = [suite("x", 3, 9), suite("y", 1, 4), suite("z", 7, 8)];

        let mut forward = TestRun::new("p", "", 1);
        suites.iter().cloned().for_each(|s| forward.push_suite(s));
        let mut backward = TestRun::new("p", "", 1);
        suites.iter().rev().cloned().for_each(|s| backward.push_suite(s));

        assert_eq!(forward.start_time, Some(at(1)));
        assert_eq!(forward.end_time, Some(at(9)));
        assert_eq!(forward.start_time, backward.start_time);
        assert_eq!(forward.end_time, backward.end_time);
    }

    #[test]
    fn test_wire_field_names() {
        let mut run = TestRun::new("proj", "id-1", 42);
        run.push_suite(SuiteRun {
            suite_name: "S".to_string(),
            start_time: at(0),
            end_time: at(1),
            spec_runs: vec![SpecRun {
                spec_description: "A".to_string(),
                status: SpecStatus::Failed,
                message: "boom\ntrace".to_string(),
                tags: vec![Tag::new("nightly")],
                start_time: at(0),
                end_time: at(1),
            }],
        });

        let json = serde_json::to_value(&run).unwrap();
        assert_eq!(json["test_project_name"], "proj");
        assert_eq!(json["test_project_id"], "id-1");
        assert_eq!(json["test_seed"], 42);
        assert_eq!(json["start_time"], "2023-01-01T09:00:00Z");
        let spec = &json["suite_runs"][0]["spec_runs"][0];
        assert_eq!(spec["spec_description"], "A");
        assert_eq!(spec["status"], "failed");
        assert_eq!(spec["tags"][0]["name"], "nightly");
        assert_eq!(spec["end_time"], "2023-01-01T09:00:01Z");
    }

    #[test]
    fn test_empty_run_serializes_null_bounds() {
        let json = serde_json::to_value(TestRun::new("proj", "", 0)).unwrap();
        assert!(json["start_time"].is_null());
        assert!(json["end_time"].is_null());
        assert_eq!(json["suite_runs"], serde_json::json!([]));
    }

    #[test]
    fn test_random_seed_is_non_negative() {
        for _ in 0..100 {
            assert!(random_seed() >= 0);
        }
    }

    #[test]
    fn test_counts() {
        let mut run = TestRun::new("p", "", 0);
        let mut s = suite("s", 0, 3);
        for status in [SpecStatus::Passed, SpecStatus::Failed, SpecStatus::Skipped, SpecStatus::Passed] {
            s.spec_runs.push(SpecRun {
                spec_description: "t".to_string(),
                status,
                message: String::new(),
                tags: Vec::new(),
                start_time: at(0),
                end_time: at(0),
            });
        }
        run.push_suite(s);
        let counts = run.counts();
        assert_eq!(counts.suites, 1);
        assert_eq!(counts.specs, 4);
        assert_eq!(counts.passed, 2);
        assert_eq!(counts.failed, 1);
        assert_eq!(counts.skipped, 1);
        assert_eq!(run.spec_count(), 4);
    }
}

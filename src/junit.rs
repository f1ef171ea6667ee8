//! JUnit XML parsing.
//!
//! Reads a report into a small structural model ([`TestSuite`] and friends)
//! that mirrors the XML. Converting that model into the published run lives
//! in [`crate::ingest`].
//!
//! # Accepted Shapes
//!
//! ```xml
//! <testsuites>
//!   <testsuite name="math" timestamp="2023-01-01T09:00:00" time="0.250">
//!     <testcase name="test_add" time="0.100"/>
//!     <testcase name="test_sub" time="0.150">
//!       <failure message="AssertionError">assert 2 - 1 == 0</failure>
//!     </testcase>
//!   </testsuite>
//! </testsuites>
//! ```
//!
//! A bare `<testsuite>` root is accepted as well. Documents with any other
//! root element are well-formed but contain no suites.
//!
//! Attributes that are absent read as empty strings; whether an empty value
//! is acceptable is decided during conversion.

use std::path::{Path, PathBuf};

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use tracing::debug;

use crate::error::{FernError, FernResult};
use crate::model::SpecStatus;

/// One `<testsuite>` element.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestSuite {
    /// Report file the suite was read from.
    pub source: PathBuf,
    pub name: String,
    /// Raw `timestamp` attribute.
    pub timestamp: String,
    /// Raw `time` attribute, in seconds.
    pub time: String,
    pub cases: Vec<TestCase>,
}

/// One `<testcase>` element.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestCase {
    pub name: String,
    /// Raw `time` attribute, in seconds.
    pub time: String,
    pub failures: Vec<Failure>,
    pub errors: Vec<TestError>,
    pub skips: Vec<Skip>,
}

/// A `<failure>` element: the test ran and an assertion did not hold.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Failure {
    pub message: String,
    /// Concatenated text content, CDATA included.
    pub content: String,
}

/// An `<error>` element: the test could not complete.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestError {
    pub message: String,
    /// Concatenated text content, CDATA included.
    pub content: String,
}

/// A `<skipped>` element.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Skip {
    pub message: String,
}

impl TestCase {
    /// Outcome of the case: any failure or error fails it, otherwise any
    /// skip skips it.
    pub fn status(&self) -> SpecStatus {
        if !self.failures.is_empty() || !self.errors.is_empty() {
            SpecStatus::Failed
        } else if !self.skips.is_empty() {
            SpecStatus::Skipped
        } else {
            SpecStatus::Passed
        }
    }

    /// `"<message>\n<content>"` of the first failure, else of the first
    /// error, else empty.
    pub fn message(&self) -> String {
        if let Some(failure) = self.failures.first() {
            format!("{}\n{}", failure.message, failure.content)
        } else if let Some(error) = self.errors.first() {
            format!("{}\n{}", error.message, error.content)
        } else {
            String::new()
        }
    }
}

/// Reads and parses the report at `path`.
///
/// # Errors
///
/// - [`FernError::Io`] if the file cannot be read as UTF-8
/// - [`FernError::Parse`] if the content is not well-formed XML
pub fn parse_report(path: &Path) -> FernResult<Vec<TestSuite>> {
    debug!("Reading {}", path.display());
    let content = std::fs::read_to_string(path).map_err(|source| FernError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    debug!("Parsing file: {}", path.display());
    parse_junit_str(&content, path)
}

/// Parses JUnit XML `content`. `source` is recorded on every suite and used
/// in error messages.
///
/// # Errors
///
/// Returns [`FernError::Parse`] if the document is not well-formed.
pub fn parse_junit_str(content: &str, source: &Path) -> FernResult<Vec<TestSuite>> {
    let mut reader = Reader::from_str(content);
    let mut walker = Walker::new(source);

    loop {
        let position = reader.buffer_position() as u64;
        let event = reader.read_event().map_err(|e| FernError::Parse {
            path: source.to_path_buf(),
            message: format!("{} (at byte {})", e, reader.error_position() as u64),
        })?;

        match event {
            Event::Start(e) => walker.open(&e, position)?,
            Event::Empty(e) => {
                walker.open(&e, position)?;
                walker.close();
            }
            Event::End(_) => walker.close(),
            Event::Text(t) => {
                let text = t.unescape().map_err(|e| walker.error(e, position))?;
                walker.text(&text);
            }
            Event::CData(c) => {
                let text = std::str::from_utf8(&c).map_err(|e| walker.error(e, position))?;
                walker.text(text);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    walker.finish()
}

/// Which kind of element an open tag is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Frame {
    Suite,
    Case,
    Failure,
    Error,
    Other,
}

/// Tracks open elements while events stream past.
struct Walker<'a> {
    source: &'a Path,
    /// Name of the document element, once seen.
    root: Option<Vec<u8>>,
    frames: Vec<Frame>,
    /// Suites in document order, filled in as their children arrive.
    suites: Vec<TestSuite>,
    /// Indexes into `suites` of the currently open suite elements.
    open_suites: Vec<usize>,
    /// The open test case and the suite it belongs to.
    open_case: Option<(usize, TestCase)>,
}

impl<'a> Walker<'a> {
    fn new(source: &'a Path) -> Self {
        Self {
            source,
            root: None,
            frames: Vec::new(),
            suites: Vec::new(),
            open_suites: Vec::new(),
            open_case: None,
        }
    }

    fn error(&self, err: impl std::fmt::Display, position: u64) -> FernError {
        FernError::Parse {
            path: self.source.to_path_buf(),
            message: format!("{} (at byte {})", err, position),
        }
    }

    fn attr(&self, element: &BytesStart<'_>, key: &str, position: u64) -> FernResult<String> {
        match element
            .try_get_attribute(key)
            .map_err(|e| self.error(e, position))?
        {
            Some(attr) => Ok(attr
                .unescape_value()
                .map_err(|e| self.error(e, position))?
                .into_owned()),
            None => Ok(String::new()),
        }
    }

    fn collecting_suites(&self) -> bool {
        matches!(
            self.root.as_deref(),
            Some(b"testsuites") | Some(b"testsuite")
        )
    }

    fn open(&mut self, element: &BytesStart<'_>, position: u64) -> FernResult<()> {
        let name = element.name();
        let name = name.as_ref();

        if self.frames.is_empty() {
            if self.root.is_some() {
                return Err(self.error("multiple root elements", position));
            }
            self.root = Some(name.to_vec());
        }

        let frame = if !self.collecting_suites() {
            Frame::Other
        } else {
            match name {
                b"testsuite" => {
                    let suite = TestSuite {
                        source: self.source.to_path_buf(),
                        name: self.attr(element, "name", position)?,
                        timestamp: self.attr(element, "timestamp", position)?,
                        time: self.attr(element, "time", position)?,
                        cases: Vec::new(),
                    };
                    self.open_suites.push(self.suites.len());
                    self.suites.push(suite);
                    Frame::Suite
                }
                b"testcase" if self.open_case.is_none() => match self.open_suites.last() {
                    Some(&suite) => {
                        let case = TestCase {
                            name: self.attr(element, "name", position)?,
                            time: self.attr(element, "time", position)?,
                            ..TestCase::default()
                        };
                        self.open_case = Some((suite, case));
                        Frame::Case
                    }
                    None => Frame::Other,
                },
                b"failure" if self.open_case.is_some() => {
                    let message = self.attr(element, "message", position)?;
                    if let Some((_, case)) = self.open_case.as_mut() {
                        case.failures.push(Failure {
                            message,
                            content: String::new(),
                        });
                    }
                    Frame::Failure
                }
                b"error" if self.open_case.is_some() => {
                    let message = self.attr(element, "message", position)?;
                    if let Some((_, case)) = self.open_case.as_mut() {
                        case.errors.push(TestError {
                            message,
                            content: String::new(),
                        });
                    }
                    Frame::Error
                }
                b"skipped" if self.open_case.is_some() => {
                    let message = self.attr(element, "message", position)?;
                    if let Some((_, case)) = self.open_case.as_mut() {
                        case.skips.push(Skip { message });
                    }
                    Frame::Other
                }
                _ => Frame::Other,
            }
        };

        self.frames.push(frame);
        Ok(())
    }

    fn close(&mut self) {
        match self.frames.pop() {
            Some(Frame::Suite) => {
                self.open_suites.pop();
            }
            Some(Frame::Case) => {
                if let Some((suite, case)) = self.open_case.take() {
                    self.suites[suite].cases.push(case);
                }
            }
            _ => {}
        }
    }

    fn text(&mut self, text: &str) {
        let target = self
            .frames
            .iter()
            .rev()
            .find(|f| matches!(f, Frame::Failure | Frame::Error))
            .copied();

        if let Some((_, case)) = self.open_case.as_mut() {
            match target {
                Some(Frame::Failure) => {
                    if let Some(failure) = case.failures.last_mut() {
                        failure.content.push_str(text);
                    }
                }
                Some(Frame::Error) => {
                    if let Some(error) = case.errors.last_mut() {
                        error.content.push_str(text);
                    }
                }
                _ => {}
            }
        }
    }

    fn finish(self) -> FernResult<Vec<TestSuite>> {
        if self.root.is_none() {
            return Err(FernError::Parse {
                path: self.source.to_path_buf(),
                message: "document has no root element".to_string(),
            });
        }
        if !self.frames.is_empty() {
            return Err(FernError::Parse {
                path: self.source.to_path_buf(),
                message: format!("unexpected end of document, {} element(s) left open", self.frames.len()),
            });
        }
        Ok(self.suites)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(xml: &str) -> Vec<TestSuite> {
        parse_junit_str(xml, Path::new("TEST-sample.xml")).unwrap()
    }

    #[test]
    fn test_bare_testsuite_root() {
        let suites = parse(
            r#"<?xml version="1.0" encoding="UTF-8"?>
            <testsuite name="SampleTest" tests="2" time="1.234" timestamp="2024-03-01T10:00:00">
                <testcase name="testOne" time="0.5"/>
                <testcase name="testTwo" time="0.7"/>
            </testsuite>"#,
        );
        assert_eq!(suites.len(), 1);
        let suite = &suites[0];
        assert_eq!(suite.name, "SampleTest");
        assert_eq!(suite.time, "1.234");
        assert_eq!(suite.timestamp, "2024-03-01T10:00:00");
        assert_eq!(suite.source, PathBuf::from("TEST-sample.xml"));
        assert_eq!(suite.cases.len(), 2);
        assert_eq!(suite.cases[1].name, "testTwo");
        assert_eq!(suite.cases[1].time, "0.7");
        assert!(suite.cases.iter().all(|c| c.status() == SpecStatus::Passed));
    }

    #[test]
    fn test_testsuites_root_keeps_document_order() {
        let suites = parse(
            r#"<testsuites>
                <testsuite name="first" time="0.1"><testcase name="a" time="0.1"/></testsuite>
                <testsuite name="second" time="0.2"><testcase name="b" time="0.2"/></testsuite>
            </testsuites>"#,
        );
        let names: Vec<_> = suites.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["first", "second"]);
    }

    #[test]
    fn test_unrecognized_root_yields_no_suites() {
        let suites = parse(r#"<results><testsuite name="ignored" time="1"/></results>"#);
        assert!(suites.is_empty());
    }

    #[test]
    fn test_missing_attributes_read_as_empty() {
        let suites = parse(r#"<testsuite><testcase/></testsuite>"#);
        assert_eq!(suites[0].name, "");
        assert_eq!(suites[0].timestamp, "");
        assert_eq!(suites[0].cases[0].time, "");
    }

    #[test]
    fn test_failure_message_and_content() {
        let suites = parse(
            r#"<testsuite name="s" time="1">
                <testcase name="t" time="1">
                    <failure message="expected 1 but was 2" type="AssertionError">at Foo.bar(Foo.java:10)</failure>
                    <failure message="second">ignored</failure>
                </testcase>
            </testsuite>"#,
        );
        let case = &suites[0].cases[0];
        assert_eq!(case.status(), SpecStatus::Failed);
        assert_eq!(case.failures.len(), 2);
        assert_eq!(case.message(), "expected 1 but was 2\nat Foo.bar(Foo.java:10)");
    }

    #[test]
    fn test_error_counts_as_failed() {
        let suites = parse(
            r#"<testsuite name="s" time="1">
                <testcase name="t" time="1"><error message="boom"><![CDATA[trace <here>]]></error></testcase>
            </testsuite>"#,
        );
        let case = &suites[0].cases[0];
        assert_eq!(case.status(), SpecStatus::Failed);
        assert_eq!(case.message(), "boom\ntrace <here>");
    }

    #[test]
    fn test_failure_takes_precedence_over_error_and_skip() {
        let suites = parse(
            r#"<testsuite name="s" time="1">
                <testcase name="t" time="1">
                    <skipped/>
                    <error message="err">e</error>
                    <failure message="fail">f</failure>
                </testcase>
            </testsuite>"#,
        );
        let case = &suites[0].cases[0];
        assert_eq!(case.status(), SpecStatus::Failed);
        assert_eq!(case.message(), "fail\nf");
    }

    #[test]
    fn test_skipped_case() {
        let suites = parse(
            r#"<testsuite name="s" time="1">
                <testcase name="t" time="0"><skipped message="not today"/></testcase>
            </testsuite>"#,
        );
        let case = &suites[0].cases[0];
        assert_eq!(case.status(), SpecStatus::Skipped);
        assert_eq!(case.message(), "");
        assert_eq!(case.skips[0].message, "not today");
    }

    #[test]
    fn test_escaped_text_is_unescaped() {
        let suites = parse(
            r#"<testsuite name="a &amp; b" time="1">
                <testcase name="t" time="1"><failure message="&lt;1&gt;">x &amp;&amp; y</failure></testcase>
            </testsuite>"#,
        );
        assert_eq!(suites[0].name, "a & b");
        assert_eq!(suites[0].cases[0].message(), "<1>\nx && y");
    }

    #[test]
    fn test_system_out_is_not_message_content() {
        let suites = parse(
            r#"<testsuite name="s" time="1">
                <testcase name="t" time="1">
                    <system-out>noise</system-out>
                    <failure message="m">body</failure>
                </testcase>
            </testsuite>"#,
        );
        assert_eq!(suites[0].cases[0].message(), "m\nbody");
    }

    #[test]
    fn test_nested_suites_own_their_cases() {
        let suites = parse(
            r#"<testsuite name="outer" time="2">
                <testcase name="o1" time="1"/>
                <testsuite name="inner" time="1"><testcase name="i1" time="1"/></testsuite>
            </testsuite>"#,
        );
        assert_eq!(suites.len(), 2);
        assert_eq!(suites[0].name, "outer");
        assert_eq!(suites[0].cases.len(), 1);
        assert_eq!(suites[1].name, "inner");
        assert_eq!(suites[1].cases[0].name, "i1");
    }

    #[test]
    fn test_malformed_xml_reports_path() {
        let err = parse_junit_str(
            r#"<testsuite name="s"><testcase></testsuite>"#,
            Path::new("reports/broken.xml"),
        )
        .unwrap_err();
        match err {
            FernError::Parse { path, .. } => assert_eq!(path, PathBuf::from("reports/broken.xml")),
            other => panic!("expected Parse, got {other:?}"),
        }
    }

    #[test]
    fn test_truncated_document_is_parse_error() {
        let err = parse_junit_str(r#"<testsuite name="s"><testcase name="t">"#, Path::new("t.xml"))
            .unwrap_err();
        assert!(matches!(err, FernError::Parse { .. }));
    }

    #[test]
    fn test_empty_document_is_parse_error() {
        let err = parse_junit_str("", Path::new("empty.xml")).unwrap_err();
        assert!(matches!(err, FernError::Parse { .. }));
    }

    #[test]
    fn test_parse_report_missing_file_is_io_error() {
        let err = parse_report(Path::new("/definitely/not/here.xml")).unwrap_err();
        assert!(matches!(err, FernError::Io { .. }));
    }
}

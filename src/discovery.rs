//! Report discovery: turning a file pattern into the report files it names.
//!
//! A pattern is split at its first `*`. Everything before it is the directory
//! that gets walked; the rest decides which walked files are accepted.
//!
//! | Pattern | Walked directory | Accepts |
//! |---------|------------------|---------|
//! | `build/**/*.xml` | `build/` | glob `**/*.xml` |
//! | `build/**/TEST-*.xml` | `build/` | any `.xml` file below `build/` |
//! | `build/*.xml` | `build/` | any `.xml` file below `build/`, subdirectories included |
//! | `build/report.xml` | `build/report.xml` | that exact file |
//! | `*` | current directory | every file |
//!
//! Note that `build/*.xml` is recursive. Tools that only emit a single
//! wildcard still expect their nested report directories to be picked up,
//! so a single-level wildcard behaves like `**`.
//!
//! Results are sorted, so the same tree always yields the same sequence.
//!
//! # Example
//!
//! ```no_run
//! use fern_junit_client::discovery::resolve_reports;
//!
//! let files = resolve_reports("build/test-results/**/*.xml", None)?;
//! for file in &files {
//!     println!("{}", file.display());
//! }
//! # Ok::<(), fern_junit_client::FernError>(())
//! ```

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use globset::{GlobBuilder, GlobMatcher};
use regex::Regex;
use tracing::debug;
use walkdir::WalkDir;

use crate::error::{FernError, FernResult};

/// The glob every `**` pattern collapses to when it selects all XML files.
const ALL_XML_GLOB: &str = "**/*.xml";

/// How walked paths are tested against a pattern.
#[derive(Debug, Clone)]
enum Matcher {
    /// Accept every file.
    Any,
    /// Accept files whose path matches the glob.
    Glob(GlobMatcher),
    /// Accept files whose path matches the regex.
    Regex(Regex),
}

/// A parsed report pattern, ready to be resolved against the filesystem.
#[derive(Debug, Clone)]
pub struct ReportPattern {
    /// The pattern as the user wrote it.
    raw: String,
    /// The effective glob derived from `raw`.
    pattern: String,
    /// Directory (or file) the walk starts from.
    base_dir: PathBuf,
    matcher: Matcher,
}

impl ReportPattern {
    /// Parses `file_pattern`, optionally prefixed with `project_dir`.
    ///
    /// # Errors
    ///
    /// Returns [`FernError::Config`] if the derived glob is not valid.
    pub fn new(file_pattern: &str, project_dir: Option<&Path>) -> FernResult<Self> {
        let mut base = match project_dir {
            Some(dir) => dir.to_string_lossy().into_owned(),
            None => String::new(),
        };
        if !base.trim().is_empty() && !base.ends_with('/') {
            base.push('/');
        }

        let (before_star, after_star) = match file_pattern.find('*') {
            Some(idx) => (&file_pattern[..idx], &file_pattern[idx + 1..]),
            None => (file_pattern, ""),
        };
        base.push_str(before_star);

        let pattern = if file_pattern.contains("**") {
            format!("*{}", after_star)
        } else {
            base.clone()
        };

        let matcher = if file_pattern == "*" {
            Matcher::Any
        } else if file_pattern.contains("*.xml") && pattern != ALL_XML_GLOB {
            let re = Regex::new(r".*\.xml$")
                .map_err(|e| FernError::Config(format!("Invalid regex pattern: {}", e)))?;
            Matcher::Regex(re)
        } else {
            let glob = GlobBuilder::new(&pattern)
                .literal_separator(true)
                .build()
                .map_err(|e| {
                    FernError::Config(format!("Invalid report pattern {:?}: {}", file_pattern, e))
                })?;
            Matcher::Glob(glob.compile_matcher())
        };

        Ok(Self {
            raw: file_pattern.to_string(),
            pattern,
            base_dir: PathBuf::from(base),
            matcher,
        })
    }

    /// The pattern as originally supplied.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// The effective pattern used for matching.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// The directory the walk starts from.
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Returns `true` if `path` is accepted by this pattern.
    pub fn matches(&self, path: &Path) -> bool {
        match &self.matcher {
            Matcher::Any => true,
            Matcher::Glob(glob) => glob.is_match(path),
            Matcher::Regex(re) => re.is_match(&path.to_string_lossy()),
        }
    }

    /// Walks the base directory and returns every accepted file, sorted.
    ///
    /// A base directory that does not exist is treated as empty.
    ///
    /// # Errors
    ///
    /// - [`FernError::NotFound`] if no file matched
    /// - [`FernError::Io`] if part of the tree could not be read
    pub fn resolve(&self) -> FernResult<Vec<PathBuf>> {
        let root = if self.base_dir.as_os_str().is_empty() {
            Path::new(".")
        } else {
            self.base_dir.as_path()
        };

        let mut files = Vec::new();
        // Symlinked directories are not descended into, which keeps link
        // loops out of the walk. Symlinked files still count.
        for entry in WalkDir::new(root).follow_links(false) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) if e.io_error().map(|io| io.kind()) == Some(ErrorKind::NotFound) => {
                    debug!("Skipping missing path: {}", e);
                    continue;
                }
                Err(e) => {
                    let path = e.path().unwrap_or(root).to_path_buf();
                    let source = e
                        .into_io_error()
                        .unwrap_or_else(|| std::io::Error::other("directory walk failed"));
                    return Err(FernError::Io { path, source });
                }
            };

            let is_file = entry.file_type().is_file()
                || (entry.path_is_symlink() && entry.path().is_file());
            if !is_file {
                continue;
            }

            let path = if self.base_dir.as_os_str().is_empty() {
                entry
                    .path()
                    .strip_prefix(".")
                    .unwrap_or(entry.path())
                    .to_path_buf()
            } else {
                entry.into_path()
            };

            if self.matches(&path) {
                debug!("Matched report file: {}", path.display());
                files.push(path);
            }
        }

        files.sort();
        files.dedup();

        if files.is_empty() {
            return Err(FernError::NotFound {
                pattern: self.pattern.clone(),
                base_dir: self.base_dir.clone(),
            });
        }

        Ok(files)
    }
}

/// Resolves `file_pattern` (relative to `project_dir`, if given) into a
/// sorted, deduplicated list of existing files.
///
/// # Errors
///
/// Returns [`FernError::NotFound`] if nothing matched, carrying the effective
/// pattern and base directory.
pub fn resolve_reports(file_pattern: &str, project_dir: Option<&Path>) -> FernResult<Vec<PathBuf>> {
    ReportPattern::new(file_pattern, project_dir)?.resolve()
}

//! Errors produced by suitewalk.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// A deadline elapsed before the guarded operation settled.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
#[error("Test timed out after {ms}ms")]
pub struct TimeoutError {
    /// The deadline that elapsed, in milliseconds.
    pub ms: u64,
}

impl TimeoutError {
    pub(crate) fn new(limit: Duration) -> Self {
        Self {
            ms: u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
        }
    }
}

/// A suite description that cannot be walked.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DescriptionError {
    /// An entry uses one of the names reserved for suite hooks.
    #[error("`{name}` is reserved for suite hooks and cannot name an entry (at {path})")]
    ReservedName { name: String, path: String },
    /// An entry has an empty name.
    #[error("entry names must not be empty (at {path})")]
    EmptyName { path: String },
}

/// A skip date that could not be parsed.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("invalid skip date `{input}` (expected RFC 3339 or YYYY-MM-DD)")]
pub struct SkipDateError {
    input: String,
}

impl SkipDateError {
    pub(crate) fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
        }
    }
}

/// A failure escaping a single suite node.
///
/// Per-test failures never surface as a `WalkError`; they are recorded and iteration continues.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum WalkError {
    /// The node's teardown failed after its children ran.
    #[error("Teardown failed with: '{0}'")]
    Teardown(String),
    /// The node's body exceeded the group-level budget.
    #[error(transparent)]
    Timeout(#[from] TimeoutError),
    /// Something panicked while the node's body was being iterated.
    #[error("Group execution failed with: '{0}'")]
    Group(String),
}

/// A failure of a whole top-level run.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("invalid suite description")]
    Description(#[from] DescriptionError),
    #[error(transparent)]
    Walk(#[from] WalkError),
    #[error("failed to create async runtime")]
    Runtime(#[source] std::io::Error),
    #[error("failed to write report to {}", path.display())]
    WriteOutput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Invalid run configuration.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unknown reporter `{0}` (expected one of: console, junit, tap, json, mocha-json)")]
    UnknownReporter(String),
    #[error("unknown CI kind `{0}` (expected one of: jenkins, azure, gitlab, github, console)")]
    UnknownCi(String),
}

/// Error type for suite file loading operations.
#[derive(Debug, Error)]
pub enum LoadError {
    /// Failed to read the file.
    #[error("failed to read file: {0}")]
    Io(#[from] std::io::Error),
    /// Failed to parse YAML.
    #[error("invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    /// Failed to parse TOML.
    #[error("invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),
    /// Unsupported file extension.
    #[error("unsupported file format: {0} (expected .yaml, .yml, or .toml)")]
    UnsupportedFormat(String),
    /// The discovery pattern is not a valid regex.
    #[error("invalid file pattern: {0}")]
    Pattern(#[from] regex::Error),
    /// A `skip.until` value could not be parsed.
    #[error(transparent)]
    SkipDate(#[from] SkipDateError),
    /// The loaded suite failed validation.
    #[error(transparent)]
    Description(#[from] DescriptionError),
}

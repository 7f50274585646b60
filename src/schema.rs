//! Schema definitions for suitewalk suite files.
//!
//! A suite file mirrors a suite description. The reserved keys `setup`, `teardown`, `skip` and
//! `timeout` configure the suite; every other key is an entry, in file order. An entry holding
//! `run` (and optionally `expect`) is a test; any other mapping is a nested suite.

use crate::config::{CiKind, ReporterKind};
use indexmap::IndexMap;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;

/// Project-level configuration loaded from `suitewalk.yaml` in the suite directory.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct ProjectConfig {
    /// Reporter used when neither the CLI nor the environment selects one.
    #[serde(default)]
    pub reporter: Option<ReporterKind>,

    /// File the rendered report is written to.
    #[serde(default)]
    pub output_file: Option<PathBuf>,

    /// CI platform for failure annotations.
    #[serde(default)]
    pub ci: Option<CiKind>,

    /// Values seeding the root context of every suite file.
    #[serde(default)]
    pub context: IndexMap<String, Value>,
}

/// A suite: hooks plus named entries.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct SuiteSpec {
    /// Runs before the entries; its `context` is merged into the inherited context.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub setup: Option<SetupSpec>,

    /// Command run after all entries, unless the suite was skipped.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub teardown: Option<CommandSpec>,

    /// Skip this suite and everything below it until a date.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip: Option<SkipSpec>,

    /// Timeout in milliseconds for tests and nested suites below this suite.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,

    /// Tests and nested suites, in declaration order.
    #[serde(flatten)]
    pub entries: IndexMap<String, EntrySpec>,
}

/// A named entry inside a suite.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum EntrySpec {
    Test(TestSpec),
    Suite(SuiteSpec),
}

/// A test running one command.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct TestSpec {
    /// The command to execute.
    pub run: CommandSpec,

    /// Expected outcomes (default: exit code 0).
    #[serde(default)]
    pub expect: Expect,
}

/// Suite setup.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct SetupSpec {
    /// Values added to the context handed to the suite's entries.
    #[serde(default)]
    pub context: IndexMap<String, Value>,

    /// Command that must succeed before the entries run.
    #[serde(default)]
    pub run: Option<CommandSpec>,
}

/// A time-bounded skip.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SkipSpec {
    /// Why the suite is skipped.
    pub reason: String,

    /// When the skip expires (RFC 3339 or YYYY-MM-DD). Afterwards the suite fails.
    pub until: String,
}

/// Command execution configuration.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CommandSpec {
    /// The command/binary to execute. `${VAR}` is interpolated.
    pub cmd: String,

    /// Command arguments. `${VAR}` is interpolated.
    #[serde(default)]
    pub args: Vec<String>,

    /// Additional environment variables for this command.
    #[serde(default)]
    pub env: HashMap<String, String>,

    /// Run through shell (default: false).
    #[serde(default)]
    pub shell: bool,
}

/// Expected outcomes from a test execution.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct Expect {
    /// Expected exit code (default: 0).
    #[serde(default)]
    pub exit: Option<i32>,

    /// Expected stdout content.
    #[serde(default)]
    pub stdout: Option<OutputMatch>,

    /// Expected stderr content.
    #[serde(default)]
    pub stderr: Option<OutputMatch>,
}

/// Matching rules for stdout/stderr.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum OutputMatch {
    /// Exact string match.
    Exact(String),

    /// Structured match with multiple options.
    Structured(OutputMatchStructured),
}

/// Structured output matching with multiple match types.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct OutputMatchStructured {
    /// Exact string match.
    #[serde(default)]
    pub equals: Option<String>,

    /// Substring match.
    #[serde(default)]
    pub contains: Option<String>,

    /// Regular expression match.
    #[serde(default)]
    pub regex: Option<String>,
}

/// Generate the JSON Schema for suite files.
pub fn generate_schema() -> schemars::schema::RootSchema {
    schemars::schema_for!(SuiteSpec)
}

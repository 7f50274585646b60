//! Run configuration.
//!
//! Values come from, in order of precedence: explicit settings (CLI flags), the environment,
//! the project config file, and defaults.

use crate::errors::ConfigError;
use crate::schema::ProjectConfig;
use clap::ValueEnum;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Environment variable selecting the reporter.
pub const REPORTER_ENV: &str = "SUITEWALK_REPORTER";
/// Environment variable naming the report output file.
pub const OUTPUT_FILE_ENV: &str = "SUITEWALK_OUTPUT_FILE";
/// Environment variable selecting the CI annotation style.
pub const CI_ENV: &str = "SUITEWALK_CI";

/// Which reporter renders the results.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema, ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum ReporterKind {
    /// Human-readable tree with checkmarks
    #[default]
    Console,
    /// JUnit XML for CI systems
    Junit,
    /// Test Anything Protocol
    Tap,
    /// Machine-readable JSON
    Json,
    /// Mocha's JSON reporter format
    MochaJson,
}

impl ReporterKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ReporterKind::Console => "console",
            ReporterKind::Junit => "junit",
            ReporterKind::Tap => "tap",
            ReporterKind::Json => "json",
            ReporterKind::MochaJson => "mocha-json",
        }
    }
}

impl FromStr for ReporterKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "console" => Ok(ReporterKind::Console),
            "junit" => Ok(ReporterKind::Junit),
            "tap" => Ok(ReporterKind::Tap),
            "json" => Ok(ReporterKind::Json),
            "mocha-json" | "mocha_json" | "mochajson" => Ok(ReporterKind::MochaJson),
            _ => Err(ConfigError::UnknownReporter(s.to_string())),
        }
    }
}

impl fmt::Display for ReporterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// CI platform whose annotation format is used for failures.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum CiKind {
    Jenkins,
    Azure,
    Gitlab,
    Github,
    Console,
}

impl CiKind {
    pub fn as_str(self) -> &'static str {
        match self {
            CiKind::Jenkins => "jenkins",
            CiKind::Azure => "azure",
            CiKind::Gitlab => "gitlab",
            CiKind::Github => "github",
            CiKind::Console => "console",
        }
    }

    /// Detect the CI platform from the process environment.
    pub fn detect() -> Option<Self> {
        Self::detect_from(|key| std::env::var(key).ok())
    }

    /// Detect the CI platform from the variables each platform sets on its runners.
    pub fn detect_from(lookup: impl Fn(&str) -> Option<String>) -> Option<Self> {
        let set = |key: &str| lookup(key).is_some_and(|v| !v.is_empty() && v != "false");
        if set("GITHUB_ACTIONS") {
            Some(CiKind::Github)
        } else if set("GITLAB_CI") {
            Some(CiKind::Gitlab)
        } else if set("TF_BUILD") {
            Some(CiKind::Azure)
        } else if set("JENKINS_URL") {
            Some(CiKind::Jenkins)
        } else {
            None
        }
    }
}

impl FromStr for CiKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "jenkins" => Ok(CiKind::Jenkins),
            "azure" => Ok(CiKind::Azure),
            "gitlab" => Ok(CiKind::Gitlab),
            "github" => Ok(CiKind::Github),
            "console" => Ok(CiKind::Console),
            _ => Err(ConfigError::UnknownCi(s.to_string())),
        }
    }
}

impl fmt::Display for CiKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Settings for one top-level run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RunConfig {
    pub reporter: ReporterKind,
    /// Write the rendered report here instead of leaving it to the caller.
    pub output_file: Option<PathBuf>,
    /// Emit failure annotations in this CI platform's format.
    pub ci: Option<CiKind>,
}

/// Partially specified settings, merged by precedence.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub reporter: Option<ReporterKind>,
    pub output_file: Option<PathBuf>,
    pub ci: Option<CiKind>,
}

impl ConfigOverrides {
    /// Read overrides from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read overrides through `lookup`, ignoring empty values.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Ok(Self {
            reporter: get(REPORTER_ENV).map(|v| v.parse()).transpose()?,
            output_file: get(OUTPUT_FILE_ENV).map(PathBuf::from),
            ci: get(CI_ENV).map(|v| v.parse()).transpose()?,
        })
    }

    /// Fill unset values from `other`.
    pub fn or(self, other: ConfigOverrides) -> Self {
        Self {
            reporter: self.reporter.or(other.reporter),
            output_file: self.output_file.or(other.output_file),
            ci: self.ci.or(other.ci),
        }
    }
}

impl From<&ProjectConfig> for ConfigOverrides {
    fn from(project: &ProjectConfig) -> Self {
        Self {
            reporter: project.reporter,
            output_file: project.output_file.clone(),
            ci: project.ci,
        }
    }
}

impl RunConfig {
    /// Configuration from the environment alone.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self::resolve(ConfigOverrides::from_env()?))
    }

    /// Configuration from variables read through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        Ok(Self::resolve(ConfigOverrides::from_lookup(lookup)?))
    }

    /// Apply defaults to whatever is still unset.
    pub fn resolve(overrides: ConfigOverrides) -> Self {
        Self {
            reporter: overrides.reporter.unwrap_or_default(),
            output_file: overrides.output_file,
            ci: overrides.ci,
        }
    }
}

//! Suite file loader.
//!
//! Loads and parses suite files and the project config from disk.

use crate::command::build_suite;
use crate::description::Suite;
use crate::errors::LoadError;
use crate::schema::{ProjectConfig, SuiteSpec};
use regex::Regex;
use std::path::{Path, PathBuf};

/// The name of the project configuration file.
pub const SUITE_CONFIG_FILENAME: &str = "suitewalk.yaml";

/// File names matching this pattern are treated as suite files.
pub const DEFAULT_SPEC_PATTERN: &str = r"\.(ya?ml|toml)$";

/// Compile a discovery pattern, falling back to [`DEFAULT_SPEC_PATTERN`].
pub fn spec_pattern(pattern: Option<&str>) -> Result<Regex, LoadError> {
    Ok(Regex::new(pattern.unwrap_or(DEFAULT_SPEC_PATTERN))?)
}

/// Load a suite file from a path.
pub fn load_spec(path: &Path) -> Result<SuiteSpec, LoadError> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    let contents = std::fs::read_to_string(path)?;

    match ext {
        "yaml" | "yml" => Ok(serde_yaml::from_str(&contents)?),
        "toml" => Ok(toml::from_str(&contents)?),
        other => Err(LoadError::UnsupportedFormat(other.to_string())),
    }
}

/// Load a suite file and build a runnable suite. Commands run in the file's directory.
pub fn load_suite(path: &Path) -> Result<Suite, LoadError> {
    let spec = load_spec(path)?;
    let base_dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    build_suite(&spec, base_dir)
}

/// Load the project config from a directory.
///
/// Looks for `suitewalk.yaml` in the given directory.
/// Returns `None` if the file doesn't exist, `Err` if it exists but is invalid.
pub fn load_project_config(dir: &Path) -> Result<Option<ProjectConfig>, LoadError> {
    let config_path = dir.join(SUITE_CONFIG_FILENAME);

    if !config_path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&config_path)?;
    let config: ProjectConfig = serde_yaml::from_str(&contents)?;
    Ok(Some(config))
}

/// Find all suite files in a directory whose file name matches `pattern`, or return the single
/// file.
pub fn find_specs(path: &Path, pattern: &Regex) -> Result<Vec<PathBuf>, LoadError> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }

    let mut specs = Vec::new();
    collect_specs_recursive(path, pattern, &mut specs)?;
    specs.sort();
    Ok(specs)
}

fn collect_specs_recursive(
    dir: &Path,
    pattern: &Regex,
    specs: &mut Vec<PathBuf>,
) -> Result<(), LoadError> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();

        if path.is_dir() {
            collect_specs_recursive(&path, pattern, specs)?;
        } else if let Some(name) = path.file_name().and_then(|f| f.to_str())
            && name != SUITE_CONFIG_FILENAME
            && pattern.is_match(name)
        {
            specs.push(path);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::EntrySpec;
    use std::io::Write;
    use tempfile::tempdir;

    fn default_pattern() -> Regex {
        spec_pattern(None).unwrap()
    }

    #[test]
    fn invalid_pattern_is_a_load_error() {
        assert!(matches!(spec_pattern(Some("(")), Err(LoadError::Pattern(_))));
    }

    #[test]
    fn load_valid_spec() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.yaml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            r#"
smoke:
  starts:
    run:
      cmd: "true"
    expect:
      exit: 0
"#
        )
        .unwrap();

        let spec = load_spec(&path).unwrap();
        assert_eq!(spec.entries.len(), 1);
        assert!(matches!(spec.entries["smoke"], EntrySpec::Suite(_)));
    }

    #[test]
    fn load_invalid_yaml() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.yaml");
        std::fs::write(&path, "invalid: [yaml: {").unwrap();

        let result = load_spec(&path);
        assert!(matches!(result, Err(LoadError::Yaml(_))));
    }

    #[test]
    fn unsupported_format() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.txt");
        std::fs::write(&path, "").unwrap();

        let result = load_spec(&path);
        assert!(matches!(result, Err(LoadError::UnsupportedFormat(_))));
    }

    #[test]
    fn load_valid_toml_spec() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.toml");
        std::fs::write(
            &path,
            r#"
[test1.run]
cmd = "echo"

[test1.expect]
exit = 0
"#,
        )
        .unwrap();

        let spec = load_spec(&path).unwrap();
        assert_eq!(spec.entries.len(), 1);
        assert!(matches!(spec.entries["test1"], EntrySpec::Test(_)));
    }

    #[test]
    fn load_invalid_toml() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "invalid = [toml").unwrap();

        let result = load_spec(&path);
        assert!(matches!(result, Err(LoadError::Toml(_))));
    }

    #[test]
    fn load_suite_builds_the_tree() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("suite.yaml");
        std::fs::write(
            &path,
            r#"
a: { run: { cmd: "true" } }
G:
  b: { run: { cmd: "true" } }
  H:
    c: { run: { cmd: "true" } }
"#,
        )
        .unwrap();

        let suite = load_suite(&path).unwrap();
        assert_eq!(suite.test_count(), 3);
    }

    #[test]
    fn load_suite_rejects_bad_skip_date() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("suite.yaml");
        std::fs::write(
            &path,
            "skip: { reason: wip, until: tomorrow }\na: { run: { cmd: \"true\" } }\n",
        )
        .unwrap();

        assert!(matches!(load_suite(&path), Err(LoadError::SkipDate(_))));
    }

    #[test]
    fn find_specs_in_directory() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("a.yaml"), "").unwrap();
        std::fs::write(dir.path().join("b.yml"), "").unwrap();
        std::fs::write(dir.path().join("c.toml"), "").unwrap();
        std::fs::write(dir.path().join("d.txt"), "").unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("nested").join("e.yaml"), "").unwrap();

        let specs = find_specs(dir.path(), &default_pattern()).unwrap();
        assert_eq!(specs.len(), 4);
    }

    #[test]
    fn find_specs_with_custom_pattern() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("api.spec.yaml"), "").unwrap();
        std::fs::write(dir.path().join("fixtures.yaml"), "").unwrap();

        let pattern = Regex::new(r"\.spec\.yaml$").unwrap();
        let specs = find_specs(dir.path(), &pattern).unwrap();
        assert_eq!(specs.len(), 1);
        assert!(specs[0].ends_with("api.spec.yaml"));
    }

    #[test]
    fn find_specs_excludes_project_config() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("a.yaml"), "").unwrap();
        std::fs::write(dir.path().join(SUITE_CONFIG_FILENAME), "").unwrap();

        let specs = find_specs(dir.path(), &default_pattern()).unwrap();
        assert_eq!(specs.len(), 1);
        assert!(specs[0].file_name().unwrap() != SUITE_CONFIG_FILENAME);
    }

    #[test]
    fn find_specs_returns_a_single_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("only.txt");
        std::fs::write(&path, "").unwrap();

        let specs = find_specs(&path, &default_pattern()).unwrap();
        assert_eq!(specs, [path]);
    }

    #[test]
    fn load_project_config_not_found() {
        let dir = tempdir().unwrap();
        let result = load_project_config(dir.path()).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn load_project_config_valid() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join(SUITE_CONFIG_FILENAME),
            r#"
reporter: tap
context:
  API_URL: http://localhost:8080
"#,
        )
        .unwrap();

        let config = load_project_config(dir.path()).unwrap().unwrap();
        assert_eq!(config.reporter, Some(crate::config::ReporterKind::Tap));
        assert_eq!(config.context["API_URL"], "http://localhost:8080");
    }

    #[test]
    fn load_project_config_invalid() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join(SUITE_CONFIG_FILENAME), "invalid: [yaml: {").unwrap();

        let result = load_project_config(dir.path());
        assert!(matches!(result, Err(LoadError::Yaml(_))));
    }
}

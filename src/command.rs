//! Suites whose tests and hooks run external commands.
//!
//! Every context value is exported to the command's environment, and `${VAR}` references in
//! the command line are interpolated from the context. Commands run in the suite file's
//! directory and are killed if their test times out.

use crate::context::{Context, SharedContext};
use crate::description::{SkipDeclaration, Suite};
use crate::errors::LoadError;
use crate::interpolate::{env_value, interpolate};
use crate::schema::{
    CommandSpec, EntrySpec, Expect, OutputMatch, OutputMatchStructured, SuiteSpec, TestSpec,
};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;

/// Build a runnable suite from a parsed suite file.
///
/// `base_dir` is the working directory for every command.
pub fn build_suite(spec: &SuiteSpec, base_dir: &Path) -> Result<Suite, LoadError> {
    let suite = build(spec, &Arc::new(base_dir.to_path_buf()))?;
    suite.validate()?;
    Ok(suite)
}

fn build(spec: &SuiteSpec, base_dir: &Arc<PathBuf>) -> Result<Suite, LoadError> {
    let mut suite = Suite::new();

    if let Some(setup) = &spec.setup {
        let setup = Arc::new(setup.clone());
        let dir = Arc::clone(base_dir);
        suite = suite.setup(move |ctx: SharedContext| {
            let setup = Arc::clone(&setup);
            let dir = Arc::clone(&dir);
            async move {
                if let Some(run) = &setup.run {
                    run_hook_command(run, &ctx, &dir).await?;
                }
                Ok::<_, String>(ctx.merged(setup.context.clone()))
            }
        });
    }

    if let Some(teardown) = &spec.teardown {
        let teardown = Arc::new(teardown.clone());
        let dir = Arc::clone(base_dir);
        suite = suite.teardown(move |ctx: SharedContext| {
            let teardown = Arc::clone(&teardown);
            let dir = Arc::clone(&dir);
            async move { run_hook_command(&teardown, &ctx, &dir).await }
        });
    }

    if let Some(skip) = &spec.skip {
        let declaration = SkipDeclaration::parse(skip.reason.clone(), &skip.until)?;
        suite = suite.skip(move || Some(declaration.clone()));
    }

    if let Some(ms) = spec.timeout {
        suite = suite.timeout(Duration::from_millis(ms));
    }

    for (name, entry) in &spec.entries {
        suite = match entry {
            EntrySpec::Test(test) => {
                let test = Arc::new(test.clone());
                let dir = Arc::clone(base_dir);
                suite.test(name.clone(), move |ctx: SharedContext| {
                    let test = Arc::clone(&test);
                    let dir = Arc::clone(&dir);
                    async move { run_test_command(&test, &ctx, &dir).await }
                })
            }
            EntrySpec::Suite(child) => suite.suite(name.clone(), build(child, base_dir)?),
        };
    }

    Ok(suite)
}

struct CommandOutput {
    /// Exit code if process exited normally.
    exit_code: Option<i32>,
    stdout: String,
    stderr: String,
}

async fn run_command(
    run: &CommandSpec,
    ctx: &Context,
    dir: &Path,
) -> Result<CommandOutput, String> {
    let program = interpolate(&run.cmd, ctx)?;
    let args = run
        .args
        .iter()
        .map(|arg| interpolate(arg, ctx))
        .collect::<Result<Vec<_>, _>>()?;

    let mut cmd = if run.shell {
        let mut c = Command::new("sh");
        c.arg("-c");
        c.arg(format!("{program} {}", args.join(" ")).trim_end());
        c
    } else {
        let mut c = Command::new(&program);
        c.args(&args);
        c
    };

    cmd.current_dir(dir);
    for (key, value) in ctx.iter() {
        if is_exportable(key) {
            cmd.env(key, env_value(value));
        }
    }
    for (key, value) in &run.env {
        cmd.env(key, interpolate(value, ctx)?);
    }
    cmd.stdin(Stdio::null());
    cmd.kill_on_drop(true);

    let output = cmd
        .output()
        .await
        .map_err(|e| format!("Failed to spawn {program}: {e}"))?;

    Ok(CommandOutput {
        exit_code: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
    })
}

fn is_exportable(key: &str) -> bool {
    !key.is_empty() && !key.contains('=') && !key.contains('\0')
}

async fn run_hook_command(run: &CommandSpec, ctx: &Context, dir: &Path) -> Result<(), String> {
    let output = run_command(run, ctx, dir).await?;
    if output.exit_code != Some(0) {
        return Err(format!(
            "Command {} failed with exit code {:?}: {}",
            run.cmd,
            output.exit_code,
            output.stderr.trim()
        ));
    }
    Ok(())
}

async fn run_test_command(test: &TestSpec, ctx: &Context, dir: &Path) -> Result<(), String> {
    let output = run_command(&test.run, ctx, dir).await?;
    let failures = check_expectations(&test.expect, &output);
    if failures.is_empty() {
        Ok(())
    } else {
        Err(failures.join("\n"))
    }
}

fn check_expectations(expect: &Expect, output: &CommandOutput) -> Vec<String> {
    let mut failures = Vec::new();

    let expected_exit = expect.exit.unwrap_or(0);
    match output.exit_code {
        Some(actual) if actual == expected_exit => {}
        Some(actual) => failures.push(format!(
            "Exit code: expected {expected_exit}, got {actual}"
        )),
        None => failures.push(format!(
            "Exit code: expected {expected_exit}, but process was terminated by a signal"
        )),
    }

    if let Some(matcher) = &expect.stdout
        && let Err(e) = check_output_match("stdout", &output.stdout, matcher)
    {
        failures.push(e);
    }

    if let Some(matcher) = &expect.stderr
        && let Err(e) = check_output_match("stderr", &output.stderr, matcher)
    {
        failures.push(e);
    }

    failures
}

fn check_output_match(name: &str, actual: &str, matcher: &OutputMatch) -> Result<(), String> {
    match matcher {
        OutputMatch::Exact(expected) => {
            if actual != expected {
                Err(format!(
                    "{name}: expected exact match\n  expected: {expected:?}\n  got: {actual:?}"
                ))
            } else {
                Ok(())
            }
        }
        OutputMatch::Structured(s) => check_structured_match(name, actual, s),
    }
}

fn check_structured_match(
    name: &str,
    actual: &str,
    matcher: &OutputMatchStructured,
) -> Result<(), String> {
    if let Some(expected) = &matcher.equals
        && actual != expected
    {
        return Err(format!(
            "{name}: expected exact match\n  expected: {expected:?}\n  got: {actual:?}"
        ));
    }

    if let Some(substring) = &matcher.contains
        && !actual.contains(substring)
    {
        return Err(format!(
            "{name}: expected to contain {substring:?}\n  got: {actual:?}"
        ));
    }

    if let Some(pattern) = &matcher.regex {
        let re = regex::Regex::new(pattern)
            .map_err(|e| format!("{name}: invalid regex {pattern:?}: {e}"))?;
        if !re.is_match(actual) {
            return Err(format!(
                "{name}: expected to match regex {pattern:?}\n  got: {actual:?}"
            ));
        }
    }

    Ok(())
}

use clap::{Parser, Subcommand};
use std::error::Error;
use std::path::{Path, PathBuf};
use suitewalk::config::{CiKind, ConfigOverrides, ReporterKind, RunConfig};
use suitewalk::context::Context;
use suitewalk::loader;
use suitewalk::runner::Runner;
use suitewalk::schema;
use tracing::debug;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;

/// Environment variable holding the log filter.
const LOG_ENV: &str = "SUITEWALK_LOG";

#[derive(Parser)]
#[command(name = "suitewalk")]
#[command(about = "Run nested test suites with cascading context, timeouts and expiring skips")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Execute suite files
    Run {
        /// Path to suite files (file or directory)
        path: PathBuf,
        /// Report format [env: SUITEWALK_REPORTER]
        #[arg(short, long)]
        reporter: Option<ReporterKind>,
        /// Write the report to this file instead of stdout [env: SUITEWALK_OUTPUT_FILE]
        #[arg(short, long)]
        output_file: Option<PathBuf>,
        /// Emit failure annotations for this CI platform [env: SUITEWALK_CI]
        #[arg(long)]
        ci: Option<CiKind>,
        /// Regex selecting suite files by file name
        #[arg(short, long)]
        pattern: Option<String>,
        /// Log engine progress to stderr
        #[arg(short, long)]
        verbose: bool,
    },
    /// Validate suite files without running them
    Validate {
        /// Path to suite files (file or directory)
        path: PathBuf,
        /// Regex selecting suite files by file name
        #[arg(short, long)]
        pattern: Option<String>,
    },
    /// Output the suite file schema
    Schema,
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Command::Run {
            path,
            reporter,
            output_file,
            ci,
            pattern,
            verbose,
        } => {
            init_logging(verbose);
            let cli_overrides = ConfigOverrides {
                reporter,
                output_file,
                ci,
            };
            if let Err(e) = run(&path, cli_overrides, pattern.as_deref()) {
                exit_with(&*e);
            }
        }
        Command::Validate { path, pattern } => {
            init_logging(false);
            if let Err(e) = validate(&path, pattern.as_deref()) {
                exit_with(&*e);
            }
        }
        Command::Schema => {
            let schema = schema::generate_schema();
            match serde_json::to_string_pretty(&schema) {
                Ok(json) => println!("{json}"),
                Err(e) => exit_with(&e),
            }
        }
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default));

    let layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(filter);
    tracing_subscriber::registry().with(layer).init();
}

/// Print `error` and its causes, then exit with status 1.
fn exit_with(error: &dyn Error) -> ! {
    eprintln!("error: {error}");
    let mut source = error.source();
    while let Some(cause) = source {
        eprintln!("  caused by: {cause}");
        source = cause.source();
    }
    std::process::exit(1);
}

fn discover(path: &Path, pattern: Option<&str>) -> Result<Vec<PathBuf>, Box<dyn Error>> {
    let pattern = loader::spec_pattern(pattern)?;
    let specs = loader::find_specs(path, &pattern)?;
    if specs.is_empty() {
        return Err(format!("no suite files found at: {}", path.display()).into());
    }
    Ok(specs)
}

fn run(
    path: &Path,
    cli_overrides: ConfigOverrides,
    pattern: Option<&str>,
) -> Result<(), Box<dyn Error>> {
    // Determine the root directory holding the project config
    let test_root = if path.is_file() {
        path.parent().unwrap_or(path)
    } else {
        path
    };
    let project = loader::load_project_config(test_root)?.unwrap_or_default();

    let overrides = cli_overrides
        .or(ConfigOverrides::from_env()?)
        .or(ConfigOverrides::from(&project));
    let mut config = RunConfig::resolve(overrides);
    if config.ci.is_none() {
        config.ci = CiKind::detect();
    }
    debug!(?config, "resolved configuration");

    let context: Context = project.context.into_iter().collect();
    let specs = discover(path, pattern)?;
    let per_file_output = specs.len() > 1;

    let mut failed = false;
    for spec_path in &specs {
        let suite = match loader::load_suite(spec_path) {
            Ok(suite) => suite,
            Err(e) => {
                eprintln!("✗ Failed to load {}: {e}", spec_path.display());
                failed = true;
                continue;
            }
        };

        let mut file_config = config.clone();
        if per_file_output {
            file_config.output_file = config
                .output_file
                .as_deref()
                .map(|out| output_path_for(out, spec_path));
        }

        let report = Runner::new(spec_path.display().to_string())
            .with_config(file_config.clone())
            .with_context(context.clone())
            .run_blocking(&suite)?;

        match &file_config.output_file {
            Some(out) if report.fatal.is_none() => {
                eprintln!("Report written to {}", out.display());
            }
            Some(_) => {}
            None => print!("{}", report.output),
        }
        for line in &report.annotations {
            eprintln!("{line}");
        }
        if let Some(fatal) = &report.fatal {
            eprintln!("✗ {}: {fatal}", report.label);
            if let Some(cause) = fatal.source() {
                eprintln!("  caused by: {cause}");
            }
        }
        failed |= report.exit_status() != 0;
    }

    if failed {
        std::process::exit(1);
    }
    Ok(())
}

fn validate(path: &Path, pattern: Option<&str>) -> Result<(), Box<dyn Error>> {
    let specs = discover(path, pattern)?;

    let mut errors = 0;
    for spec_path in &specs {
        match loader::load_suite(spec_path) {
            Ok(suite) => {
                println!("✓ {} ({} tests)", spec_path.display(), suite.test_count());
            }
            Err(e) => {
                eprintln!("✗ {}: {e}", spec_path.display());
                errors += 1;
            }
        }
    }

    if errors > 0 {
        return Err(format!("{errors} suite file(s) failed validation").into());
    }
    println!("\nAll {} suite file(s) valid", specs.len());
    Ok(())
}

/// `out/report.xml` for `api.yaml` becomes `out/report.api.xml`.
fn output_path_for(output: &Path, spec_path: &Path) -> PathBuf {
    let stem = spec_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let base = output
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let file_name = match output.extension() {
        Some(ext) => format!("{base}.{stem}.{}", ext.to_string_lossy()),
        None => format!("{base}.{stem}"),
    };
    output.with_file_name(file_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_path_inserts_spec_stem() {
        assert_eq!(
            output_path_for(Path::new("out/report.xml"), Path::new("suites/api.yaml")),
            PathBuf::from("out/report.api.xml")
        );
        assert_eq!(
            output_path_for(Path::new("report"), Path::new("db.toml")),
            PathBuf::from("report.db")
        );
    }
}

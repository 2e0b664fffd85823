//! `qgate` command surface.
//!
//! [`run_cli`] parses nothing itself: callers hand it a parsed [`Cli`] and get
//! back the process exit code. Threshold flags become one implicit ruleset
//! ahead of the configured ones; results are ingested from `*-result.json`
//! files while the realtime gate watches for a fast-fail trip.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use qgate_core::config::{CliOverrides, QgateConfig};
use qgate_core::constants::{EXIT_FAILURE, EXIT_NOT_CONFIGURED, EXIT_SUCCESS};
use qgate_core::errors::{GateError, QgateErrorCode, RunError};
use qgate_core::events::{BatchOptions, EventBus};
use qgate_core::traits::Cancellable;
use qgate_core::types::{TestResult, ValidationResult};
use qgate_engine::store::{load_known_issues, read_result_file, result_files};
use qgate_engine::{
    InMemoryStore, QualityGate, QualityGateOutcome, RealtimeOptions, RealtimeQualityGate,
    ResultStore, ValidateParams,
};
use tracing::{debug, error, info, warn};

#[derive(Debug, Parser)]
#[command(name = "qgate")]
#[command(about = "Quality gate runner for test result directories")]
#[command(version = qgate_core::constants::VERSION)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Read result directories and check them against the quality gate.
    Run(RunArgs),
}

#[derive(Debug, Clone, Args)]
pub struct RunArgs {
    /// Directories holding `*-result.json` files.
    pub results_dirs: Vec<PathBuf>,

    /// Config file to use instead of `qgate.toml` in the current directory.
    #[arg(long)]
    pub config: Option<PathBuf>,

    #[arg(long)]
    pub max_failures: Option<u64>,

    #[arg(long)]
    pub min_tests_count: Option<u64>,

    /// Required share of passed tests, between 0 and 1.
    #[arg(long)]
    pub success_rate: Option<f64>,

    /// Stop reading results as soon as a threshold flag fails.
    #[arg(long)]
    pub fast_fail: bool,

    /// JSON file listing known failures by history id.
    #[arg(long)]
    pub known_issues: Option<PathBuf>,

    #[arg(long)]
    pub environment: Option<String>,

    #[arg(long)]
    pub batch_timeout_ms: Option<u64>,

    /// Also print failed rules as JSON on stdout.
    #[arg(long)]
    pub json: bool,
}

impl RunArgs {
    fn overrides(&self) -> CliOverrides {
        CliOverrides {
            max_failures: self.max_failures,
            min_tests_count: self.min_tests_count,
            success_rate: self.success_rate,
            fast_fail: self.fast_fail.then_some(true),
            known_issues: self
                .known_issues
                .as_ref()
                .map(|path| path.display().to_string()),
            environment: self.environment.clone(),
            batch_timeout_ms: self.batch_timeout_ms,
        }
    }
}

/// Execute a parsed command line and return the process exit code.
pub fn run_cli(cli: Cli) -> Result<i32> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .context("failed to start async runtime")?;

    match cli.command {
        Command::Run(args) => {
            let cwd = std::env::current_dir().context("failed to read current directory")?;
            runtime.block_on(run(&args, &cwd))
        }
    }
}

/// `qgate run` rooted at `root` (project config lookup and relative paths).
pub async fn run(args: &RunArgs, root: &Path) -> Result<i32> {
    match execute(args, root).await {
        Ok(outcome) => {
            print_results(&outcome.results, args.json)?;
            Ok(if outcome.passed() {
                EXIT_SUCCESS
            } else {
                EXIT_FAILURE
            })
        }
        Err(RunError::Gate(GateError::NotConfigured)) => {
            eprintln!("quality gate is not configured");
            Ok(EXIT_NOT_CONFIGURED)
        }
        Err(RunError::Gate(err)) => Ok(report_gate_error(&err)),
        Err(RunError::NoResults) => {
            eprintln!("no results directories found");
            Ok(EXIT_FAILURE)
        }
        Err(RunError::FastFailed { results }) => {
            warn!(failures = results.len(), "run aborted by fast-fail");
            print_results(&results, args.json)?;
            Ok(EXIT_FAILURE)
        }
        Err(err) => Err(anyhow::Error::new(err).context("qgate run failed")),
    }
}

/// Load config, ingest every results directory, and return the final verdict.
async fn execute(args: &RunArgs, root: &Path) -> Result<QualityGateOutcome, RunError> {
    let overrides = args.overrides();
    let config = match &args.config {
        Some(path) => QgateConfig::load_file(path, Some(&overrides))?,
        None => QgateConfig::load(root, Some(&overrides))?,
    };
    if !config.quality_gate.is_configured() {
        return Err(GateError::NotConfigured.into());
    }
    let gate = Arc::new(QualityGate::with_built_in_rules(config.quality_gate.clone())?);

    let dirs: Vec<&PathBuf> = args.results_dirs.iter().filter(|dir| dir.is_dir()).collect();
    if dirs.is_empty() {
        return Err(RunError::NoResults);
    }

    let store = Arc::new(InMemoryStore::new());
    if let Some(path) = &config.known_issues {
        let known = load_known_issues(&root.join(path))?;
        info!(count = known.len(), "known issues loaded");
        store.set_known_issues(known);
    }

    let bus = Arc::new(EventBus::new());
    let realtime = config.realtime.effective_enabled().then(|| {
        RealtimeQualityGate::attach(
            Arc::clone(&bus),
            Arc::clone(&store) as Arc<dyn ResultStore>,
            Arc::clone(&gate),
            RealtimeOptions {
                batch: BatchOptions::with_max_timeout(config.realtime.effective_batch_timeout()),
                environment: config.environment.clone(),
            },
        )
    });

    let ingested = ingest(&dirs, &store, &bus, realtime.as_ref()).await?;
    info!(results = ingested, "results read");

    match &realtime {
        Some(realtime) => {
            if let Some(err) = realtime.config_error() {
                return Err(err.into());
            }
            if realtime.is_fast_failed() {
                return Err(RunError::FastFailed {
                    results: realtime.fast_fail_results(),
                });
            }
            realtime.detach();
            Ok(realtime.final_validate()?)
        }
        None => {
            let results: Vec<TestResult> = store.all_test_results(false);
            let known_issues = store.all_known_issues();
            let mut params = ValidateParams::new(&results).known_issues(&known_issues);
            if let Some(env) = config.environment.as_deref() {
                params = params.environment(env);
            }
            Ok(gate.validate(params)?)
        }
    }
}

/// Load every result file into the store and announce it on the bus. Stops
/// early once the realtime gate aborts the run.
async fn ingest(
    dirs: &[&PathBuf],
    store: &InMemoryStore,
    bus: &EventBus,
    realtime: Option<&RealtimeQualityGate>,
) -> Result<usize, RunError> {
    let abort = realtime.map(RealtimeQualityGate::abort_token);
    let mut count = 0;

    for dir in dirs {
        for path in result_files(dir)? {
            if abort.as_ref().is_some_and(|token| token.is_cancelled()) {
                warn!(read = count, "ingestion stopped by the quality gate");
                return Ok(count);
            }

            let mut result = match read_result_file(&path) {
                Ok(result) => result,
                Err(err) => {
                    warn!(error = %err, "skipping unreadable result file");
                    continue;
                }
            };
            if result.id.is_empty() {
                result.id = fallback_id(&path);
            }
            let id = result.id.clone();
            if store.insert(result).is_some() {
                // Already announced; the store now holds the newer copy.
                warn!(id = %id, path = %path.display(), "duplicate result id replaces an earlier file");
                continue;
            }
            bus.send_test_result(id);
            count += 1;

            // Let due batch windows run between files.
            tokio::task::yield_now().await;
        }
    }

    if let Some(realtime) = realtime {
        // One last window so a trip on the tail of the run still aborts.
        realtime.flush().await;
    }
    Ok(count)
}

fn fallback_id(path: &Path) -> String {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(|name| name.trim_end_matches(qgate_core::constants::RESULT_FILE_SUFFIX))
        .unwrap_or_default()
        .to_string()
}

fn report_gate_error(err: &GateError) -> i32 {
    error!(code = err.error_code(), error = %err, "quality gate configuration error");
    eprintln!("error: {}", err.coded_string());
    EXIT_FAILURE
}

fn print_results(results: &[ValidationResult], json: bool) -> Result<()> {
    for result in results {
        eprintln!("{result}");
    }
    if json {
        let rendered =
            serde_json::to_string_pretty(results).context("failed to render results as JSON")?;
        println!("{rendered}");
    }
    debug!(failures = results.len(), "results reported");
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn run_flags_map_to_overrides() {
        let cli = Cli::try_parse_from([
            "qgate",
            "run",
            "out/a",
            "out/b",
            "--max-failures",
            "2",
            "--success-rate",
            "0.9",
            "--fast-fail",
        ])
        .unwrap();
        let Command::Run(args) = cli.command;
        assert_eq!(args.results_dirs.len(), 2);

        let overrides = args.overrides();
        assert_eq!(overrides.max_failures, Some(2));
        assert_eq!(overrides.success_rate, Some(0.9));
        assert_eq!(overrides.fast_fail, Some(true));
        assert_eq!(overrides.min_tests_count, None);
    }

    #[test]
    fn fast_fail_is_unset_when_the_flag_is_absent() {
        let cli = Cli::try_parse_from(["qgate", "run"]).unwrap();
        let Command::Run(args) = cli.command;
        assert_eq!(args.overrides().fast_fail, None);
    }

    #[test]
    fn fallback_id_strips_the_suffix() {
        assert_eq!(fallback_id(Path::new("out/abc-result.json")), "abc");
    }
}

// crates/perf-ledger-cli/src/main.rs
// ============================================================================
// Module: Perf Ledger CLI Entry Point
// Description: Ingests one audit report into a history store.
// Purpose: Provide the pipeline-facing command for report ingestion.
// Dependencies: clap, perf-ledger-config, perf-ledger-core, serde_json, thiserror
// ============================================================================

//! ## Overview
//! `perf-ledger` runs in one of two modes:
//!
//! - `perf-ledger REPORT STORE TARGET DATE DEVICE` names everything explicitly.
//! - `perf-ledger --from-env REPORT` reads `TARGET`, `DEVICE_TYPE`, and `DATE`
//!   from the environment and takes the store path from configuration.
//!
//! On success the normalized record is printed to stdout as JSON and the
//! process exits 0. On failure `error[<category>]: <message>` is printed to
//! stderr and the process exits 1. Structured events go to the configured
//! sink.

// ============================================================================
// SECTION: Modules
// ============================================================================


// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::ArgAction;
use clap::Parser;
use perf_ledger_cli::t;
use perf_ledger_config::ConfigError;
use perf_ledger_config::EnvContext;
use perf_ledger_config::LogSink;
use perf_ledger_config::PerfLedgerConfig;
use perf_ledger_core::FileEventSink;
use perf_ledger_core::IngestEventSink;
use perf_ledger_core::IngestRequest;
use perf_ledger_core::NoopEventSink;
use perf_ledger_core::StderrEventSink;
use perf_ledger_core::ingest;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Positional arguments in the explicit mode.
const EXPLICIT_ARG_COUNT: usize = 5;
/// Error category for argument problems.
const USAGE_CATEGORY: &str = "usage";
/// Error category for configuration problems.
const CONFIG_CATEGORY: &str = "config";
/// Error category for output failures.
const OUTPUT_CATEGORY: &str = "output";

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(
    name = "perf-ledger",
    about = "Ingest a performance audit report into a bounded history store.",
    disable_version_flag = true
)]
struct Cli {
    /// Print version information and exit.
    #[arg(long = "version", action = ArgAction::SetTrue)]
    show_version: bool,
    /// Read TARGET, DEVICE_TYPE, and DATE from the environment.
    #[arg(long = "from-env", action = ArgAction::SetTrue)]
    from_env: bool,
    /// Config file path (defaults to `PERF_LEDGER_CONFIG`, then perf-ledger.toml).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Number of distinct dates to retain (overrides config).
    #[arg(long, value_name = "DAYS")]
    retention_days: Option<usize>,
    /// REPORT STORE TARGET DATE DEVICE, or REPORT alone with --from-env.
    #[arg(value_name = "ARGS", num_args = 0 ..= EXPLICIT_ARG_COUNT)]
    args: Vec<String>,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error carrying a diagnostic category and a rendered message.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Category label printed in the diagnostic.
    category: &'static str,
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`].
    const fn new(category: &'static str, message: String) -> Self {
        Self {
            category,
            message,
        }
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => emit_error(&err),
    }
}

/// Parses arguments and runs one ingestion.
fn run() -> CliResult<ExitCode> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) if err.use_stderr() => {
            return Err(CliError::new(USAGE_CATEGORY, err.render().to_string().trim().to_string()));
        }
        Err(err) => {
            err.print().map_err(|err| output_error("stdout", &err))?;
            return Ok(ExitCode::SUCCESS);
        }
    };

    if cli.show_version {
        let version = env!("CARGO_PKG_VERSION");
        write_stdout_line(&t!("main.version", version = version))
            .map_err(|err| output_error("stdout", &err))?;
        return Ok(ExitCode::SUCCESS);
    }

    let config = PerfLedgerConfig::load(cli.config.as_deref()).map_err(config_error)?;
    let request = build_request(&cli, &config, |key| std::env::var(key).ok())?;
    let sink = open_sink(&config)?;
    let outcome = ingest(&request, sink.as_ref())
        .map_err(|err| CliError::new(err.category(), t!("ingest.failed", error = err)))?;

    let json = serde_json::to_string_pretty(&outcome.record).map_err(|err| {
        CliError::new(OUTPUT_CATEGORY, t!("ingest.serialize_failed", error = err))
    })?;
    write_stdout_line(&json).map_err(|err| output_error("stdout", &err))?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Request Assembly
// ============================================================================

/// Builds the ingestion request from arguments, config, and environment.
fn build_request<F>(cli: &Cli, config: &PerfLedgerConfig, lookup: F) -> CliResult<IngestRequest>
where
    F: Fn(&str) -> Option<String>,
{
    let mut request = if cli.from_env {
        let [report] = cli.args.as_slice() else {
            return Err(CliError::new(
                USAGE_CATEGORY,
                t!("usage.from_env_count", count = cli.args.len()),
            ));
        };
        let context = EnvContext::resolve(config, lookup).map_err(|err| {
            CliError::new(USAGE_CATEGORY, t!("env.resolve_failed", error = err))
        })?;
        IngestRequest::new(
            report,
            &config.store.path,
            context.target,
            context.date,
            context.device_type,
        )
    } else {
        let [report, store, target, date, device] = cli.args.as_slice() else {
            return Err(CliError::new(
                USAGE_CATEGORY,
                t!("usage.positional_count", count = cli.args.len()),
            ));
        };
        IngestRequest::new(report, store, target, date, device)
    };

    let retention_days = cli.retention_days.unwrap_or(config.store.retention_days);
    if retention_days == 0 {
        return Err(CliError::new(USAGE_CATEGORY, t!("usage.retention_zero")));
    }
    request.retention_days = retention_days;
    request.lock_timeout = config.store.lock_timeout();
    request.report_base_dir = config.report_base_dir().map(PathBuf::from);
    request.allowed_devices.clone_from(&config.defaults.device_types);
    Ok(request)
}

/// Opens the configured event sink.
fn open_sink(config: &PerfLedgerConfig) -> CliResult<Box<dyn IngestEventSink>> {
    match (config.logging.sink, &config.logging.path) {
        (LogSink::Stderr, _) => Ok(Box::new(StderrEventSink)),
        (LogSink::None, _) => Ok(Box::new(NoopEventSink)),
        (LogSink::File, Some(path)) => FileEventSink::new(path)
            .map(|sink| Box::new(sink) as Box<dyn IngestEventSink>)
            .map_err(|err| {
                CliError::new(
                    CONFIG_CATEGORY,
                    t!("logging.open_failed", path = path.display(), error = err),
                )
            }),
        (LogSink::File, None) => Err(config_error(ConfigError::Invalid(
            "logging.path is required for the file sink".to_string(),
        ))),
    }
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Writes a single line to stdout.
fn write_stdout_line(message: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
}

/// Writes a single line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Wraps a configuration failure.
fn config_error(err: ConfigError) -> CliError {
    CliError::new(CONFIG_CATEGORY, t!("config.load_failed", error = err))
}

/// Formats an output failure.
fn output_error(stream: &str, error: &std::io::Error) -> CliError {
    let stream_label = match stream {
        "stdout" => t!("output.stream.stdout"),
        "stderr" => t!("output.stream.stderr"),
        _ => t!("output.stream.unknown"),
    };
    CliError::new(OUTPUT_CATEGORY, t!("output.write_failed", stream = stream_label, error = error))
}

/// Emits an error diagnostic to stderr and returns a failure exit code.
fn emit_error(err: &CliError) -> ExitCode {
    let _ = write_stderr_line(&t!("main.error", category = err.category, message = err.message));
    ExitCode::FAILURE
}

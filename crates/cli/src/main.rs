// ledgercheck CLI - upload a SPED ledger and its reference book, print the reconciliation

mod exit_codes;

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use chrono::{DateTime, Utc};
use clap::{ArgAction, Args, Parser, Subcommand};
use serde::Serialize;

use ledgercheck_cli::controller::{ControllerError, Receipt, UploadController};
use ledgercheck_cli::terminal::render_dashboard;
use ledgercheck_client::{hash_bytes, ReconClient};
use ledgercheck_config::{ConfigError, Settings};
use ledgercheck_report::format::{format_amount, with_currency};
use ledgercheck_report::ledger::{
    extract_codes, ADJUSTMENT_CODE_FIELD, ADJUSTMENT_RECORD, PAYABLE_AMOUNT_FIELD, PAYABLE_RECORD,
};
use ledgercheck_report::{apply_report, sum_block_values, Dashboard, ReconReport, RowFilter, Variant};

use exit_codes::{
    EXIT_SUCCESS, EXIT_ERROR, EXIT_USAGE, EXIT_DIVERGENT, EXIT_BACKEND, EXIT_MALFORMED_REPORT,
    EXIT_CONFIG, controller_exit_code,
};

#[derive(Parser)]
#[command(name = "ledgercheck")]
#[command(about = "Reconcile a SPED fiscal ledger against its reference book")]
#[command(version)]
struct Cli {
    /// Settings file (default: <config dir>/ledgercheck/settings.toml)
    #[arg(long, global = true, env = "LEDGERCHECK_CONFIG", value_name = "PATH")]
    config: Option<PathBuf>,

    /// More log output (-v info, -vv debug). RUST_LOG takes precedence.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Presentation flags shared by `run` and `render`.
#[derive(Args)]
struct ViewArgs {
    /// Backend contract: legacy (A) or combined (B)
    #[arg(long)]
    variant: Option<Variant>,

    /// Ledger table filter: all, e110, e111, e116 or e001
    #[arg(long, value_name = "FILTER")]
    filter: Option<RowFilter>,

    /// Print the section index
    #[arg(long)]
    sidebar: bool,

    /// Expand the raw ledger records panel (combined variant)
    #[arg(long)]
    records: bool,

    /// Print the dashboard as JSON
    #[arg(long)]
    json: bool,

    /// Exit 3 when any section diverged
    #[arg(long)]
    strict: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload both documents and print the reconciliation
    #[command(after_help = "\
Examples:
  ledgercheck run --ledger sped.txt --book livro.pdf
  ledgercheck run --ledger sped.txt --book livro.pdf --variant combined --records
  ledgercheck run --ledger sped.txt --book livro.pdf --filter e116 --strict
  ledgercheck run --ledger sped.txt --book livro.pdf --json -o report.json")]
    Run {
        /// SPED ledger (.txt)
        #[arg(long, value_name = "FILE")]
        ledger: Option<PathBuf>,

        /// Reference book (.pdf)
        #[arg(long, value_name = "FILE")]
        book: Option<PathBuf>,

        /// Backend base URL (overrides settings)
        #[arg(long, value_name = "URL")]
        server: Option<String>,

        /// Request timeout in seconds (default: wait indefinitely)
        #[arg(long, value_name = "SECS")]
        timeout: Option<u64>,

        /// Save the raw backend response for `ledgercheck render`
        #[arg(long, short = 'o', value_name = "FILE")]
        output: Option<PathBuf>,

        /// Print nothing on success; rely on the exit code
        #[arg(long, short = 'q')]
        quiet: bool,

        #[command(flatten)]
        view: ViewArgs,
    },

    /// Render a saved backend response without contacting the backend
    Render {
        /// Response body saved with `run --output`
        report: PathBuf,

        #[command(flatten)]
        view: ViewArgs,
    },

    /// Sum one field of a ledger record type locally
    #[command(after_help = "\
Examples:
  ledgercheck sum sped.txt
  ledgercheck sum sped.txt --code E110 --field 2")]
    Sum {
        /// SPED ledger (.txt)
        ledger: PathBuf,

        /// Record code to sum
        #[arg(long, default_value = PAYABLE_RECORD)]
        code: String,

        /// Field position in the pipe split (1 is the record code)
        #[arg(long, default_value_t = PAYABLE_AMOUNT_FIELD)]
        field: usize,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print effective settings
    Config {
        /// Write a settings file with the defaults
        #[arg(long)]
        init: bool,

        /// Overwrite an existing settings file (with --init)
        #[arg(long)]
        force: bool,
    },
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config_path = cli.config.clone().unwrap_or_else(Settings::config_path);

    let result = match cli.command {
        Commands::Run { ledger, book, server, timeout, output, quiet, view } => {
            load_settings(&config_path).and_then(|settings| {
                cmd_run(&settings, ledger, book, server, timeout, output, quiet, view)
            })
        }
        Commands::Render { report, view } => {
            load_settings(&config_path).and_then(|settings| cmd_render(&settings, report, view))
        }
        Commands::Sum { ledger, code, field, json } => cmd_sum(ledger, code, field, json),
        Commands::Config { init, force } => cmd_config(&config_path, init, force),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn usage(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self { code: EXIT_ERROR, message: msg.into(), hint: None }
    }

    pub fn config(err: ConfigError) -> Self {
        Self {
            code: EXIT_CONFIG,
            message: err.to_string(),
            hint: Some("check the settings file (ledgercheck config) and LEDGERCHECK_* variables".to_string()),
        }
    }

    /// Create error from a controller failure with the proper exit code.
    pub fn controller(err: &ControllerError, server: &str) -> Self {
        let hint = match err {
            ControllerError::Validation(_) => {
                Some("pass both --ledger <sped.txt> and --book <livro.pdf>".to_string())
            }
            ControllerError::Client(ledgercheck_client::ClientError::Network(_)) => Some(format!(
                "is the backend running at {}? set --server or LEDGERCHECK_SERVER",
                server
            )),
            ControllerError::Report(_) => {
                Some("check --variant matches the backend endpoint".to_string())
            }
            _ => None,
        };
        Self { code: controller_exit_code(err), message: err.to_string(), hint }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

fn load_settings(path: &Path) -> Result<Settings, CliError> {
    Settings::load_with_env(path, |key| std::env::var(key).ok()).map_err(CliError::config)
}

fn resolve_filter(view: &ViewArgs, settings: &Settings) -> Result<RowFilter, CliError> {
    match view.filter {
        Some(filter) => Ok(filter),
        None => settings.filter().map_err(CliError::config),
    }
}

fn apply_view(dashboard: &mut Dashboard, view: &ViewArgs, filter: RowFilter) {
    dashboard.set_filter(filter);
    if view.sidebar {
        dashboard.toggle_sidebar();
    }
    if view.records {
        dashboard.toggle_records();
    }
}

// ============================================================================
// Output
// ============================================================================

#[derive(Serialize)]
struct DashboardOutput<'a> {
    variant: Variant,
    #[serde(skip_serializing_if = "Option::is_none")]
    submitted_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    ledger_fingerprint: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    book_fingerprint: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    diverged: bool,
    dashboard: &'a Dashboard,
}

fn emit(
    dashboard: &Dashboard,
    variant: Variant,
    json: bool,
    receipt: Option<&Receipt>,
    error: Option<&ControllerError>,
) -> Result<(), CliError> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();

    if json {
        let output = DashboardOutput {
            variant,
            submitted_at: receipt.map(|r| r.submitted_at),
            ledger_fingerprint: receipt.map(|r| r.ledger_fingerprint.as_str()),
            book_fingerprint: receipt.map(|r| r.book_fingerprint.as_str()),
            error: error.map(ControllerError::failure_message),
            diverged: dashboard.has_divergence(),
            dashboard,
        };
        let text = serde_json::to_string_pretty(&output)
            .map_err(|e| CliError::io(format!("cannot serialize dashboard: {}", e)))?;
        writeln!(handle, "{}", text).map_err(|e| CliError::io(e.to_string()))
    } else {
        write!(handle, "{}", render_dashboard(dashboard, variant)).map_err(|e| CliError::io(e.to_string()))
    }
}

fn check_strict(dashboard: &Dashboard, strict: bool) -> Result<(), CliError> {
    if strict && dashboard.has_divergence() {
        return Err(CliError {
            code: EXIT_DIVERGENT,
            message: "reconciliation found divergences".to_string(),
            hint: None,
        });
    }
    Ok(())
}

// ============================================================================
// run
// ============================================================================

#[allow(clippy::too_many_arguments)]
fn cmd_run(
    settings: &Settings,
    ledger: Option<PathBuf>,
    book: Option<PathBuf>,
    server: Option<String>,
    timeout: Option<u64>,
    output: Option<PathBuf>,
    quiet: bool,
    view: ViewArgs,
) -> Result<(), CliError> {
    let variant = view.variant.unwrap_or(settings.variant);
    let filter = resolve_filter(&view, settings)?;
    if timeout == Some(0) {
        return Err(CliError::usage("--timeout must be positive"));
    }
    let timeout = timeout.map(Duration::from_secs).or_else(|| settings.timeout());
    let server = server.unwrap_or_else(|| settings.server_url.clone());

    let client = ReconClient::new(server, timeout).map_err(|e| CliError {
        code: EXIT_BACKEND,
        message: e.to_string(),
        hint: None,
    })?;
    let base_url = client.base_url().to_string();
    let mut controller = UploadController::new(client, variant);

    let pending = controller
        .begin(ledger.as_deref(), book.as_deref())
        .map_err(|err| CliError::controller(&err, &base_url))?;
    if !quiet {
        eprintln!("{}", controller.dashboard().status_line);
    }

    let result = controller.dispatch(pending);
    apply_view(controller.dashboard_mut(), &view, filter);

    if let (Ok(receipt), Some(path)) = (&result, &output) {
        std::fs::write(path, &receipt.body)
            .map_err(|e| CliError::io(format!("cannot write {}: {}", path.display(), e)))?;
        log::info!("saved response to {}", path.display());
    }

    if !quiet {
        emit(controller.dashboard(), variant, view.json, result.as_ref().ok(), result.as_ref().err())?;
    }

    result.map_err(|err| CliError::controller(&err, &base_url))?;
    check_strict(controller.dashboard(), view.strict)
}

// ============================================================================
// render
// ============================================================================

fn cmd_render(settings: &Settings, report: PathBuf, view: ViewArgs) -> Result<(), CliError> {
    let variant = view.variant.unwrap_or(settings.variant);
    let filter = resolve_filter(&view, settings)?;

    let body = std::fs::read(&report)
        .map_err(|e| CliError::usage(format!("cannot read {}: {}", report.display(), e)))?;
    let decoded = ReconReport::decode(variant, &body).map_err(|e| CliError {
        code: EXIT_MALFORMED_REPORT,
        message: format!("{}: {}", report.display(), e),
        hint: Some("pass --variant to match the endpoint the response came from".to_string()),
    })?;

    let mut dashboard = Dashboard::new();
    apply_report(&mut dashboard, &decoded);
    dashboard.status_line = format!("Rendered from {}", report.display());
    apply_view(&mut dashboard, &view, filter);

    emit(&dashboard, variant, view.json, None, None)?;
    check_strict(&dashboard, view.strict)
}

// ============================================================================
// sum
// ============================================================================

#[derive(Serialize)]
struct SumOutput {
    record: String,
    field: usize,
    total: f64,
    formatted: String,
    adjustment_codes: Vec<String>,
    fingerprint: String,
}

fn cmd_sum(ledger: PathBuf, code: String, field: usize, json: bool) -> Result<(), CliError> {
    if field < 2 {
        return Err(CliError::usage(format!("--field {} selects no value", field))
            .with_hint("field 1 is the record code; amounts start at 2"));
    }

    let bytes = std::fs::read(&ledger)
        .map_err(|e| CliError::usage(format!("cannot read {}: {}", ledger.display(), e)))?;
    // SPED files are often Latin-1; non-UTF-8 bytes only affect description fields.
    let text = String::from_utf8_lossy(&bytes);

    let record = code.trim().to_ascii_uppercase();
    let total = sum_block_values(Some(&*text), &record, field);
    let output = SumOutput {
        formatted: with_currency(format_amount(total)),
        adjustment_codes: extract_codes(Some(&*text), ADJUSTMENT_RECORD, ADJUSTMENT_CODE_FIELD),
        fingerprint: hash_bytes(&bytes),
        record,
        field,
        total,
    };

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    if json {
        let text = serde_json::to_string_pretty(&output)
            .map_err(|e| CliError::io(e.to_string()))?;
        writeln!(handle, "{}", text).map_err(|e| CliError::io(e.to_string()))?;
    } else {
        writeln!(handle, "{} field {}: {}", output.record, output.field, output.formatted)
            .map_err(|e| CliError::io(e.to_string()))?;
        if !output.adjustment_codes.is_empty() {
            writeln!(handle, "{} codes: {}", ADJUSTMENT_RECORD, output.adjustment_codes.join(", "))
                .map_err(|e| CliError::io(e.to_string()))?;
        }
    }
    Ok(())
}

// ============================================================================
// config
// ============================================================================

fn cmd_config(path: &Path, init: bool, force: bool) -> Result<(), CliError> {
    if init {
        if path.exists() && !force {
            return Err(CliError::usage(format!("{} already exists", path.display()))
                .with_hint("use --force to overwrite it"));
        }
        Settings::default().save_to(path).map_err(CliError::config)?;
        println!("wrote {}", path.display());
        return Ok(());
    }

    let settings = load_settings(path)?;
    let text = toml::to_string_pretty(&settings)
        .map_err(|e| CliError::io(format!("cannot serialize settings: {}", e)))?;
    println!("# {}", path.display());
    print!("{}", text);
    Ok(())
}

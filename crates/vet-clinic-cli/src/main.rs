// crates/vet-clinic-cli/src/main.rs
// ============================================================================
// Module: Vet Clinic CLI Entry Point
// Description: Command dispatcher for serving and configuration workflows.
// Purpose: Start the HTTP server, validate configuration, and probe health.
// Dependencies: clap, reqwest, tokio, tracing-subscriber, vet-clinic-config, vet-clinic-server
// ============================================================================

//! ## Overview
//! The `vet-clinic` binary loads `vet-clinic.toml` (or `--config`, or the
//! `VET_CLINIC_CONFIG` override), installs a `tracing` subscriber filtered by
//! `RUST_LOG` or `[logging] level`, and dispatches one subcommand. All output
//! goes through explicit stdout/stderr writers and failures map to a non-zero
//! exit code.

// ============================================================================
// SECTION: Modules
// ============================================================================

#[cfg(test)]
mod main_tests;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::net::IpAddr;
use std::net::Ipv4Addr;
use std::net::SocketAddr;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Args;
use clap::Parser;
use clap::Subcommand;
use serde_json::Value;
use thiserror::Error;
use tracing::info;
use tracing_subscriber::EnvFilter;
use vet_clinic_config::VetClinicConfig;
use vet_clinic_config::config_toml_example;
use vet_clinic_server::VetClinicServer;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Environment variable holding a tracing filter directive.
const LOG_ENV: &str = "RUST_LOG";
/// Request timeout for the health probe.
const HEALTH_TIMEOUT: Duration = Duration::from_secs(10);

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "vet-clinic", version, disable_help_subcommand = true)]
struct Cli {
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the HTTP server.
    Serve(ConfigArgs),
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
    /// Query `/health` on a running server.
    Health(HealthCommand),
}

/// Shared `--config` argument.
#[derive(Args, Debug)]
struct ConfigArgs {
    /// Optional config file path (defaults to vet-clinic.toml or env override).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Parse and validate a configuration file.
    Validate(ConfigArgs),
    /// Validate a configuration file and resolve its secrets from the environment.
    Check(ConfigArgs),
    /// Print an annotated example configuration.
    Example,
}

/// Arguments for the `health` command.
#[derive(Args, Debug)]
struct HealthCommand {
    /// Config file used to derive the server address.
    #[command(flatten)]
    config: ConfigArgs,
    /// Base URL of the server (overrides the configured bind address).
    #[arg(long, value_name = "URL")]
    url: Option<String>,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper carrying a user-facing message.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`].
    const fn new(message: String) -> Self {
        Self {
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
#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
async fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Serve(args) => command_serve(&args).await,
        Commands::Config {
            command,
        } => command_config(command),
        Commands::Health(command) => command_health(&command).await,
    }
}

// ============================================================================
// SECTION: Serve Command
// ============================================================================

/// Executes the `serve` command.
async fn command_serve(args: &ConfigArgs) -> CliResult<ExitCode> {
    let config = load_config(args.config.as_deref())?;
    init_tracing(&config)?;
    let server = tokio::task::spawn_blocking(move || VetClinicServer::from_config(config))
        .await
        .map_err(|err| CliError::new(format!("server init failed: init join failed: {err}")))?
        .map_err(|err| CliError::new(format!("server init failed: {err}")))?;
    server.serve().await.map_err(|err| CliError::new(format!("server failed: {err}")))?;
    info!("vet clinic server stopped");
    Ok(ExitCode::SUCCESS)
}

/// Installs the global tracing subscriber on stderr.
fn init_tracing(config: &VetClinicConfig) -> CliResult<()> {
    let env_value = std::env::var(LOG_ENV).ok();
    let directive = log_directive(env_value.as_deref(), &config.logging.level);
    let filter = EnvFilter::try_new(&directive)
        .map_err(|err| CliError::new(format!("invalid log filter {directive}: {err}")))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| CliError::new(format!("logging init failed: {err}")))
}

/// Chooses the filter directive: a non-blank `RUST_LOG` wins over config.
fn log_directive(env_value: Option<&str>, config_level: &str) -> String {
    env_value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| config_level.trim())
        .to_string()
}

// ============================================================================
// SECTION: Config Commands
// ============================================================================

/// Dispatches config subcommands.
fn command_config(command: ConfigCommand) -> CliResult<ExitCode> {
    match command {
        ConfigCommand::Validate(args) => command_config_validate(&args),
        ConfigCommand::Check(args) => command_config_check(&args),
        ConfigCommand::Example => {
            write_stdout_bytes(config_toml_example().as_bytes())
                .map_err(|err| CliError::new(output_error("stdout", &err)))?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Executes the config validation command.
fn command_config_validate(args: &ConfigArgs) -> CliResult<ExitCode> {
    let _config = load_config(args.config.as_deref())?;
    write_stdout_line("config ok").map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(ExitCode::SUCCESS)
}

/// Validates configuration and resolves every secret it references.
fn command_config_check(args: &ConfigArgs) -> CliResult<ExitCode> {
    let config = load_config(args.config.as_deref())?;
    config
        .document
        .resolved_uri()
        .map_err(|err| CliError::new(format!("document store secret: {err}")))?;
    config.cipher.passphrase().map_err(|err| CliError::new(format!("cipher passphrase: {err}")))?;
    write_stdout_line("config ok; secrets resolved")
        .map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(ExitCode::SUCCESS)
}

/// Loads and validates configuration.
fn load_config(path: Option<&Path>) -> CliResult<VetClinicConfig> {
    VetClinicConfig::load(path).map_err(|err| CliError::new(format!("config load failed: {err}")))
}

// ============================================================================
// SECTION: Health Command
// ============================================================================

/// Fetches `/health` and prints the response envelope.
async fn command_health(command: &HealthCommand) -> CliResult<ExitCode> {
    let base = match &command.url {
        Some(url) => url.trim_end_matches('/').to_string(),
        None => {
            let config = load_config(command.config.config.as_deref())?;
            let addr = config
                .server
                .bind_addr()
                .map_err(|err| CliError::new(format!("config load failed: {err}")))?;
            base_url(addr)
        }
    };
    let client = reqwest::Client::builder()
        .timeout(HEALTH_TIMEOUT)
        .build()
        .map_err(|err| CliError::new(format!("http client init failed: {err}")))?;
    let response = client
        .get(format!("{base}/health"))
        .send()
        .await
        .map_err(|err| CliError::new(format!("health request failed: {err}")))?;
    let status = response.status();
    let body: Value = response
        .json()
        .await
        .map_err(|err| CliError::new(format!("health response invalid: {err}")))?;
    let rendered = serde_json::to_string_pretty(&body)
        .map_err(|err| CliError::new(format!("health response invalid: {err}")))?;
    write_stdout_line(&rendered).map_err(|err| CliError::new(output_error("stdout", &err)))?;
    if status.is_success() {
        Ok(ExitCode::SUCCESS)
    } else {
        Err(CliError::new(format!("server unhealthy: {status}")))
    }
}

/// Builds a loopback-reachable base URL for a bind address.
fn base_url(addr: SocketAddr) -> String {
    let ip = match addr.ip() {
        IpAddr::V4(ip) if ip.is_unspecified() => IpAddr::V4(Ipv4Addr::LOCALHOST),
        IpAddr::V6(ip) if ip.is_unspecified() => IpAddr::V4(Ipv4Addr::LOCALHOST),
        ip => ip,
    };
    format!("http://{}", SocketAddr::new(ip, addr.port()))
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Writes a single line to stdout.
fn write_stdout_line(message: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
}

/// Writes raw bytes to stdout without adding a newline.
fn write_stdout_bytes(bytes: &[u8]) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    stdout.write_all(bytes)
}

/// Writes a single line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Formats an output error message.
fn output_error(stream: &str, error: &std::io::Error) -> String {
    format!("failed to write to {stream}: {error}")
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}

//! # cxinfo-cli
//!
//! Look up Chrome Web Store extension metadata from the command line.
//!
//! Each argument is an extension ID or a listing URL. Records print as a short
//! summary or, with `--json`, as the full export.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use cxinfo_core::error::{ExtensionInfoError, ExtensionResult};
use cxinfo_store::{ClientConfig, ExtensionClient};

mod output;

use output::OutputHandler;

/// Look up Chrome Web Store extension metadata
#[derive(Parser, Debug)]
#[command(name = "cxinfo", version, about = "Look up Chrome Web Store extension metadata")]
pub struct Cli {
    /// Extension IDs or listing URLs
    #[arg(value_name = "ID_OR_URL", required = true)]
    pub inputs: Vec<String>,

    /// Print the full record as JSON
    #[arg(long)]
    pub json: bool,

    /// Configuration file (TOML)
    #[arg(short, long, value_name = "FILE", env = "CXINFO_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    setup_logging(cli.verbose);
    setup_panic_handler();

    info!("Starting cxinfo v{}", env!("CARGO_PKG_VERSION"));

    let output = OutputHandler::new();
    match run_cli(cli, &output) {
        Ok(0) => ExitCode::SUCCESS,
        Ok(_) => ExitCode::from(1),
        Err(e) => {
            output.error(&e);
            ExitCode::from(2)
        }
    }
}

/// Run every lookup; returns the number of failed inputs
fn run_cli(cli: Cli, output: &OutputHandler) -> ExtensionResult<usize> {
    // Create Tokio runtime for async operations
    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| ExtensionInfoError::io("Failed to create async runtime".to_string(), e))?;

    rt.block_on(async {
        let config = load_config(cli.config.as_deref()).await?;
        let client = ExtensionClient::builder().config(config).build()?;

        let mut failures = 0;
        for input in &cli.inputs {
            // IDs and listing URLs are both accepted on the command line
            let lookup = match client.config().urls.normalize(input) {
                Ok(id) => client.get(&id).await,
                Err(e) => Err(e),
            };
            match lookup {
                Ok(record) => output.record(&record, cli.json),
                Err(e) => {
                    error!(input = %input, "lookup failed: {}", e);
                    output.error(&e);
                    failures += 1;
                }
            }
        }

        debug!(stats = ?client.cache_stats(), "lookups finished");
        Ok(failures)
    })
}

async fn load_config(path: Option<&std::path::Path>) -> ExtensionResult<ClientConfig> {
    let config = match path {
        Some(path) => ClientConfig::load_from_file(path).await?,
        None => ClientConfig::default(),
    };
    let config = config.apply_env();
    config.validate()?;
    Ok(config)
}

fn setup_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };

    // RUST_LOG takes precedence over the verbosity flag
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "cxinfo={level},cxinfo_core={level},cxinfo_store={level}"
        ))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn setup_panic_handler() {
    std::panic::set_hook(Box::new(|panic_info| {
        error!("cxinfo encountered an unexpected error: {}", panic_info);
        eprintln!("cxinfo crashed! This is a bug.");
        eprintln!("Error: {}", panic_info);
    }));
}

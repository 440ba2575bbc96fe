use std::fs::File;
use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use rusty_masternode::{NetworkParams, PaymentDb, PaymentDbConfig, PaymentsConfig};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

mod offline;
mod report;

const APP_NAME: &str = "rusty-coin";
const CONFIG_NAME: &str = "mnpayments";

/// Rusty Coin masternode payment snapshot tool
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Directory holding mnpayments.dat
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// Network the snapshot belongs to (mainnet, testnet, regtest)
    #[arg(long)]
    network: Option<String>,

    /// Read settings from this file instead of the default configuration path
    #[arg(long)]
    config: Option<PathBuf>,

    /// Set logging level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Path to the log file (optional). If not provided, logs will only go to stderr.
    #[arg(long)]
    log_file: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the snapshot contents as JSON
    Inspect {
        /// Only list the newest N heights
        #[arg(long)]
        last: Option<usize>,
    },
    /// Check checksum, magic and network of the snapshot
    Verify,
    /// Load the snapshot and write it out again
    Rewrite {
        /// Write into this directory instead of the source directory
        #[arg(long)]
        output: Option<PathBuf>,
        /// Tag the written snapshot with another network
        #[arg(long)]
        to_network: Option<String>,
    },
}

#[derive(Debug, Serialize, Deserialize)]
struct ToolConfig {
    data_dir: PathBuf,
    network: String,
    payments: PaymentsConfig,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("."),
            network: "mainnet".to_string(),
            payments: PaymentsConfig::default(),
        }
    }
}

fn network_by_name(name: &str) -> Result<NetworkParams> {
    NetworkParams::by_name(name).ok_or_else(|| anyhow!("unknown network '{}'", name))
}

fn load_config(args: &Args) -> ToolConfig {
    let loaded = match &args.config {
        Some(path) => confy::load_path(path),
        None => confy::load(APP_NAME, CONFIG_NAME),
    };
    let mut cfg: ToolConfig = match loaded {
        Ok(cfg) => cfg,
        Err(e) => {
            warn!("Failed to load configuration: {:?}. Using default.", e);
            ToolConfig::default()
        }
    };

    // Override config with CLI arguments if provided
    if let Some(data_dir) = &args.data_dir {
        cfg.data_dir = data_dir.clone();
    }
    if let Some(network) = &args.network {
        cfg.network = network.clone();
    }
    cfg
}

fn init_logging(args: &Args) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    let builder = FmtSubscriber::builder().with_env_filter(filter).with_writer(std::io::stderr);

    match &args.log_file {
        Some(log_file_path) => {
            let file = File::create(log_file_path)
                .with_context(|| format!("failed to create log file {}", log_file_path))?;
            let (non_blocking_writer, guard) = tracing_appender::non_blocking(file);
            builder
                .with_writer(non_blocking_writer)
                .try_init()
                .map_err(|e| anyhow!("setting default subscriber failed: {}", e))?;
            Ok(Some(guard))
        }
        None => {
            builder.try_init().map_err(|e| anyhow!("setting default subscriber failed: {}", e))?;
            Ok(None)
        }
    }
}

fn inspect(db: &PaymentDb, last: Option<usize>) -> Result<()> {
    let snapshot = db.read().with_context(|| format!("reading {}", db.path().display()))?;
    let report = report::build_report(&snapshot, last);
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn verify(db: &PaymentDb) -> Result<()> {
    match db.read() {
        Ok(snapshot) => {
            let report = report::build_report(&snapshot, Some(0));
            println!("{}: ok ({})", db.path().display(), report.summary);
            Ok(())
        }
        Err(e) => {
            error!("{} failed verification: {}", db.path().display(), e);
            bail!("{}: {}", db.path().display(), e)
        }
    }
}

fn rewrite(cfg: &ToolConfig, source: &PaymentDb, output: Option<PathBuf>, to_network: Option<String>) -> Result<()> {
    let ledger = offline::offline_ledger(cfg.payments.clone());
    source
        .load(&ledger, true)
        .with_context(|| format!("loading {}", source.path().display()))?;

    let network = match &to_network {
        Some(name) => network_by_name(name)?,
        None => cfg.payments.network.clone(),
    };
    let target_config = PaymentDbConfig {
        data_dir: output.unwrap_or_else(|| cfg.data_dir.clone()),
        ..PaymentDbConfig::default()
    };
    let target = PaymentDb::new(&target_config, network.network_magic);
    target
        .dump(&ledger)
        .with_context(|| format!("writing {}", target.path().display()))?;

    info!("Rewrote {} to {} ({})", source.path().display(), target.path().display(), ledger.summary());
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    let _log_guard = init_logging(&args)?;

    let mut cfg = load_config(&args);
    cfg.payments.network = network_by_name(&cfg.network)?;
    info!("Using {} snapshot in {}", cfg.network, cfg.data_dir.display());

    let db_config = PaymentDbConfig { data_dir: cfg.data_dir.clone(), ..PaymentDbConfig::default() };
    let db = PaymentDb::new(&db_config, cfg.payments.network.network_magic);

    match args.command {
        Command::Inspect { last } => inspect(&db, last),
        Command::Verify => verify(&db),
        Command::Rewrite { output, to_network } => rewrite(&cfg, &db, output, to_network),
    }
}

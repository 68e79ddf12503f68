//! SectorFlow CLI — run the pipeline once and inspect its output.
//!
//! Commands:
//! - `run` — one invocation: fetch listing, transform, save, notify
//! - `config` — print the effective configuration as TOML
//! - `inspect` — read a saved result back and print it

mod logging;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use sectorflow_core::{ReqwestTransport, ThreadSleeper};
use sectorflow_runner::{
    EnvParameterStore, FileParameterStore, LogSink, NotificationSink, NotifyKind,
    ObjectStoreBlobs, ParameterStore, Pipeline, PipelineClients, PipelineConfig, SinkWriter,
    StorageConfig, StorageKind, WebhookSink,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(
    name = "sectorflow",
    about = "SectorFlow — sector aggregate ETL over a file-listing API"
)]
struct Cli {
    /// Log level when RUST_LOG is not set.
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one pipeline invocation and print the result JSON.
    Run {
        /// Path to a TOML config file. Defaults apply when omitted.
        #[arg(long)]
        config: Option<PathBuf>,

        /// TOML file of parameter values.
        #[arg(long, conflicts_with = "env_prefix")]
        params: Option<PathBuf>,

        /// Read parameters from environment variables with this prefix.
        #[arg(long)]
        env_prefix: Option<String>,

        #[command(flatten)]
        storage: StorageArgs,

        /// Notification sink (overrides the config file).
        #[arg(long, value_enum)]
        notify: Option<NotifyArg>,
    },
    /// Print the effective configuration as TOML.
    Config {
        /// Path to a TOML config file.
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Read a saved result back and print it as CSV.
    Inspect {
        /// Path to a TOML config file.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Bucket to read from. Defaults to the configured output bucket.
        #[arg(long)]
        bucket: Option<String>,

        /// Key to read. Defaults to the configured output key.
        #[arg(long)]
        key: Option<String>,

        #[command(flatten)]
        storage: StorageArgs,
    },
}

#[derive(clap::Args)]
struct StorageArgs {
    /// Storage backend (overrides the config file).
    #[arg(long, value_enum)]
    storage: Option<StorageArg>,

    /// Root directory for local storage.
    #[arg(long)]
    root: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
enum StorageArg {
    S3,
    Local,
}

#[derive(Clone, Copy, ValueEnum)]
enum NotifyArg {
    Webhook,
    Log,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(&cli.log_level);

    match cli.command {
        Commands::Run {
            config,
            params,
            env_prefix,
            storage,
            notify,
        } => run_pipeline(config.as_deref(), params, env_prefix, &storage, notify),
        Commands::Config { config } => {
            let config = load_config(config.as_deref())?;
            print!("{}", config.to_toml()?);
            Ok(())
        }
        Commands::Inspect {
            config,
            bucket,
            key,
            storage,
        } => run_inspect(config.as_deref(), bucket, key, &storage),
    }
}

fn load_config(path: Option<&Path>) -> Result<PipelineConfig> {
    match path {
        Some(path) => PipelineConfig::from_file(path)
            .with_context(|| format!("loading config from {}", path.display())),
        None => Ok(PipelineConfig::default()),
    }
}

fn apply_storage(config: &mut StorageConfig, args: &StorageArgs) -> Result<()> {
    if let Some(kind) = args.storage {
        config.kind = match kind {
            StorageArg::S3 => StorageKind::S3,
            StorageArg::Local => StorageKind::Local,
        };
    }
    if let Some(root) = &args.root {
        config.root = Some(root.clone());
    }
    // A process-local store is gone when the command exits.
    if config.kind == StorageKind::Memory {
        bail!("memory storage is not available from the CLI; use s3 or local");
    }
    if config.kind == StorageKind::Local && config.root.is_none() {
        bail!("--root is required for local storage");
    }
    Ok(())
}

fn run_pipeline(
    config_path: Option<&Path>,
    params: Option<PathBuf>,
    env_prefix: Option<String>,
    storage: &StorageArgs,
    notify: Option<NotifyArg>,
) -> Result<()> {
    let mut config = load_config(config_path)?;
    apply_storage(&mut config.storage, storage)?;
    if let Some(notify) = notify {
        config.notify.kind = match notify {
            NotifyArg::Webhook => NotifyKind::Webhook,
            NotifyArg::Log => NotifyKind::Log,
        };
    }
    config.validate()?;

    let parameters: Arc<dyn ParameterStore> = match params {
        Some(path) => Arc::new(FileParameterStore::new(path)),
        None => Arc::new(EnvParameterStore::new(env_prefix.unwrap_or_default())),
    };
    let notifications: Arc<dyn NotificationSink> = match config.notify.kind {
        NotifyKind::Webhook => Arc::new(WebhookSink::new(config.fetch.timeout())?),
        NotifyKind::Log => Arc::new(LogSink),
    };
    let blobs = Arc::new(ObjectStoreBlobs::from_config(&config.storage)?);

    info!(
        parameters = parameters.name(),
        notifications = notifications.name(),
        storage = ?config.storage.kind,
        "starting run"
    );

    let clients = PipelineClients {
        parameters,
        notifications,
        transport: Arc::new(ReqwestTransport::new(config.fetch.timeout())?),
        sleeper: Arc::new(ThreadSleeper),
        blobs,
    };
    let result = Pipeline::new(config, clients).run();

    println!("{}", serde_json::to_string_pretty(&result)?);
    if !result.is_success() {
        std::process::exit(1);
    }
    Ok(())
}

fn run_inspect(
    config_path: Option<&Path>,
    bucket: Option<String>,
    key: Option<String>,
    storage: &StorageArgs,
) -> Result<()> {
    let mut config = load_config(config_path)?;
    apply_storage(&mut config.storage, storage)?;

    let bucket = bucket.unwrap_or(config.output.bucket);
    let key = key.unwrap_or(config.output.key);
    let writer = SinkWriter::new(Arc::new(ObjectStoreBlobs::from_config(&config.storage)?));
    let table = writer
        .load(&bucket, &key)
        .with_context(|| format!("reading {bucket}/{key}"))?;

    println!("{bucket}/{key}: {} sectors", table.len());
    print!("{}", sectorflow_core::encode_csv(&table)?);
    Ok(())
}

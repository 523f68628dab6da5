//! Thermal processor service.
//!
//! Accepts file-arrival notifications over HTTP and reconstructs a blackbody
//! temperature map for every hyperspectral capture once all of its files
//! have landed.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use thermal_processor::{
    analyze_once, scan_existing, spawn_eviction, start_server, AppState, ConfigOverrides,
    ServiceConfig,
};

#[derive(Parser, Debug)]
#[command(name = "thermal-processor")]
#[command(about = "Blackbody temperature reconstruction for hyperspectral captures")]
struct Args {
    /// Configuration file path
    #[arg(short, long, env = "THERMAL_CONFIG")]
    config: Option<PathBuf>,

    /// Directory holding one sub-directory per capture
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Directory results are written to
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// HTTP listen port
    #[arg(short, long)]
    port: Option<u16>,

    /// Side length of the spatial averaging block
    #[arg(long)]
    chunk_size: Option<usize>,

    /// Fitting threads (0 = one per core)
    #[arg(long)]
    workers: Option<usize>,

    /// Log level
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Replay captures already in the data directory before serving
    #[arg(long)]
    scan_existing: bool,

    /// Analyze one capture and exit
    #[arg(long, value_name = "DATASET_ID")]
    analyze: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Initialize tracing
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_thread_ids(true)
        .json()
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    // Load configuration
    let mut config = ServiceConfig::load(args.config.as_deref())?;
    ConfigOverrides {
        data_dir: args.data_dir,
        output_dir: args.output_dir,
        port: args.port,
        chunk_size: args.chunk_size,
        workers: args.workers,
    }
    .apply(&mut config);
    config.validate()?;

    info!(
        data_dir = %config.data_dir.display(),
        output_dir = %config.output_dir.display(),
        chunk_size = config.processor.chunk_size,
        "Loaded configuration"
    );

    if let Some(dataset_id) = &args.analyze {
        let outcome = analyze_once(&config, dataset_id).await?;
        info!(dataset = %dataset_id, outcome = ?outcome, "Analysis complete");
        return Ok(());
    }

    let state = Arc::new(AppState::from_config(&config)?);

    if args.scan_existing {
        scan_existing(&state.coordinator, &config.data_dir).await;
    }

    let eviction = spawn_eviction(
        state.coordinator.clone(),
        config.eviction_interval(),
        config.retention(),
    );

    let result = start_server(state, config.port).await;
    eviction.abort();
    result
}

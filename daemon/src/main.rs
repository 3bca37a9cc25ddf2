//! Zonemap daemon: entry point for running the block processor.

mod source;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::io::{AsyncBufRead, BufReader};
use tokio::sync::mpsc;
use tracing::Instrument;
use zonemap_processor::{
    init_logging, tracing_spans, BlockProcessor, ErrorKind, JsonTxDecoder, ProcessorConfig,
    ProcessorMetrics, ShutdownController,
};
use zonemap_store_lmdb::LmdbEnvironment;

use crate::source::read_blocks;

#[derive(Parser)]
#[command(name = "zonemap-daemon", about = "Map of Zones block processor daemon")]
struct Cli {
    /// Path to a TOML configuration file. If provided, file settings
    /// are used as the base; CLI flags and env vars override them.
    #[arg(long, env = "ZONEMAP_CONFIG")]
    config: Option<PathBuf>,

    /// Data directory for the LMDB environment.
    #[arg(long, env = "ZONEMAP_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// NDJSON block input; "-" reads stdin.
    #[arg(long, env = "ZONEMAP_INPUT")]
    input: Option<PathBuf>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "ZONEMAP_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format: "human" or "json".
    #[arg(long, env = "ZONEMAP_LOG_FORMAT")]
    log_format: Option<String>,

    /// Blocks buffered between the reader and the processor.
    #[arg(long, env = "ZONEMAP_CHANNEL_CAPACITY")]
    channel_capacity: Option<usize>,

    /// Collect Prometheus metrics and print them on exit.
    #[arg(long, env = "ZONEMAP_ENABLE_METRICS")]
    metrics: bool,

    /// Subcommand.
    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, clap::Subcommand)]
enum Command {
    /// Process blocks until the input ends, a signal arrives, or a fatal error.
    Run,
    /// Print the effective configuration (file, env and flags merged) as TOML.
    Config,
}

impl Cli {
    /// File config (or defaults) with every given flag applied on top.
    fn into_config(self) -> anyhow::Result<ProcessorConfig> {
        let mut config = match &self.config {
            Some(path) => ProcessorConfig::from_toml_file(path)
                .with_context(|| format!("loading config {}", path.display()))?,
            None => ProcessorConfig::default(),
        };

        if let Some(data_dir) = self.data_dir {
            config.data_dir = data_dir;
        }
        if let Some(input) = self.input {
            config.input = Some(input);
        }
        if let Some(level) = self.log_level {
            config.log_level = level;
        }
        if let Some(format) = self.log_format {
            config.log_format = format;
        }
        if let Some(capacity) = self.channel_capacity {
            config.channel_capacity = capacity;
        }
        config.enable_metrics |= self.metrics;

        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let command = cli.command;
    let config = cli.into_config()?;

    match command {
        Command::Run => {
            init_logging(config.log_format()?, &config.log_level)?;
            run(config).await
        }
        Command::Config => {
            print!("{}", config.to_toml_string()?);
            Ok(())
        }
    }
}

async fn run(config: ProcessorConfig) -> anyhow::Result<()> {
    tracing::info!(
        data_dir = %config.data_dir.display(),
        map_size_mb = config.map_size_mb,
        "opening LMDB environment"
    );
    let env = LmdbEnvironment::open(
        &config.data_dir,
        LmdbEnvironment::DATABASE_COUNT,
        config.map_size_bytes(),
    )
    .with_context(|| format!("opening LMDB at {}", config.data_dir.display()))?;
    let env = Arc::new(env);

    let metrics = config.enable_metrics.then(|| Arc::new(ProcessorMetrics::new()));
    let mut processor = BlockProcessor::new(Arc::clone(&env), JsonTxDecoder);
    if let Some(metrics) = &metrics {
        processor = processor.with_metrics(Arc::clone(metrics));
    }

    let shutdown = Arc::new(ShutdownController::new());
    let (blocks_tx, blocks_rx) = mpsc::channel(config.channel_capacity);

    let input_name = config
        .input_path()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "stdin".to_string());
    let input = open_input(&config).await?;
    let reader_shutdown = shutdown.subscribe();
    let reader = tokio::spawn(
        read_blocks(input, blocks_tx, reader_shutdown)
            .instrument(tracing_spans::source_span(&input_name)),
    );

    let signals = Arc::clone(&shutdown);
    tokio::spawn(async move { signals.wait_for_signal().await });

    let result = processor.run(blocks_rx, shutdown.subscribe()).await;
    let interrupted = shutdown.is_triggered();
    shutdown.shutdown();
    let summary = reader.await.context("block reader panicked")?;

    if let Some(metrics) = &metrics {
        match metrics.render() {
            Ok(text) => tracing::info!(metrics = %text, "final metrics"),
            Err(e) => tracing::warn!(error = %e, "failed to render metrics"),
        }
    }

    match result {
        Ok(()) => {
            tracing::info!("zonemap daemon exited cleanly");
            Ok(())
        }
        Err(err) if err.kind() == ErrorKind::SourceClosed => {
            let summary = summary.context("reading block input")?;
            if interrupted {
                tracing::info!("stopped by signal, zonemap daemon exited cleanly");
                Ok(())
            } else if summary.exhausted {
                tracing::info!(
                    blocks = summary.forwarded,
                    "input exhausted, zonemap daemon exited cleanly"
                );
                Ok(())
            } else {
                Err(err.into())
            }
        }
        Err(err) => Err(err.into()),
    }
}

async fn open_input(config: &ProcessorConfig) -> anyhow::Result<Box<dyn AsyncBufRead + Unpin + Send>> {
    Ok(match config.input_path() {
        Some(path) => {
            let file = tokio::fs::File::open(path)
                .await
                .with_context(|| format!("opening input {}", path.display()))?;
            Box::new(BufReader::new(file))
        }
        None => Box::new(BufReader::new(tokio::io::stdin())),
    })
}

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tracing::{info, warn};

use adsearch_coordinator::{build_adapter, IndexingCoordinator};
use adsearch_core::config::{expand_path, Config, Settings};
use adsearch_core::seed::load_records;
use adsearch_core::telemetry::init_logging;
use adsearch_core::{BulkOutcome, CancelSource, CancelToken, DocFailure, Envelope, Record};

#[derive(Parser)]
#[command(name = "adsearch")]
#[command(about = "Index and search classified ads", long_about = None)]
struct Cli {
    /// Override the configured backend (tantivy | elastic | sql)
    #[arg(short, long)]
    backend: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reset the backend and load the gzip NDJSON master data
    Seed {
        #[arg(short, long)]
        file: Option<PathBuf>,

        #[arg(long)]
        batch_size: Option<usize>,
    },

    /// Index a JSON array of records
    Index {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Keyword search
    Search {
        #[arg(value_name = "KEYWORD")]
        keyword: String,
    },

    /// Ping the backend
    Health,
}

#[derive(Debug, Serialize)]
struct SeedSummary {
    file: String,
    loaded: usize,
    skipped: usize,
    failed_items: Vec<DocFailure>,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    let mut settings = Config::load()?.settings()?;
    if let Some(backend) = cli.backend {
        settings.backend = backend;
        settings.validate()?;
    }
    init_logging(&settings.log_level);

    let adapter = build_adapter(&settings).await.context("failed to initialize backend")?;
    let coordinator = IndexingCoordinator::new(adapter);

    let shutdown = CancelSource::new();
    let signal = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling");
            signal.cancel();
        }
    });
    let cancel = shutdown.token();

    let ok = match cli.command {
        Commands::Seed { file, batch_size } => respond(seed(&coordinator, &settings, file, batch_size, &cancel).await)?,
        Commands::Index { file } => respond(index_file(&coordinator, &file, &cancel).await)?,
        Commands::Search { keyword } => respond(coordinator.search(&keyword, &cancel).await)?,
        Commands::Health => {
            let report = coordinator.health().await;
            let ok = report.is_ok();
            print_json(&Envelope::success(vec![report]))?;
            ok
        }
    };
    Ok(if ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn respond<T: Serialize>(result: adsearch_core::Result<T>) -> anyhow::Result<bool> {
    match result {
        Ok(data) => {
            print_json(&Envelope::success(data))?;
            Ok(true)
        }
        Err(e) => {
            print_json(&Envelope::<()>::failure(&e))?;
            Ok(false)
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn index_file(coordinator: &IndexingCoordinator, file: &Path, cancel: &CancelToken) -> adsearch_core::Result<BulkOutcome> {
    let text = std::fs::read_to_string(file)?;
    let records: Vec<Record> = serde_json::from_str(&text)?;
    coordinator.index_batch(&records, cancel).await
}

async fn seed(
    coordinator: &IndexingCoordinator,
    settings: &Settings,
    file: Option<PathBuf>,
    batch_size: Option<usize>,
    cancel: &CancelToken,
) -> adsearch_core::Result<SeedSummary> {
    let path = file.unwrap_or_else(|| expand_path(&settings.seed.master_data_path));
    let batch_size = batch_size.unwrap_or(settings.seed.batch_size).max(1);
    let data = load_records(&path)?;

    if let Err(e) = coordinator.ready().await {
        warn!(backend = coordinator.backend(), error = %e, "backend not ready, seeding anyway");
    }
    coordinator.reset().await?;

    info!("Seeding {} records into {} in batches of {}", data.records.len(), coordinator.backend(), batch_size);
    let pb = ProgressBar::new(data.records.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} records ({percent}%) {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );
    let mut failed_items = Vec::new();
    for chunk in data.records.chunks(batch_size) {
        let outcome = coordinator.index_batch(chunk, cancel).await;
        if outcome.is_err() {
            pb.abandon_with_message("seed aborted");
        }
        failed_items.extend(outcome?.failed_items);
        pb.inc(chunk.len() as u64);
    }
    pb.finish_with_message("done");

    Ok(SeedSummary { file: path.display().to_string(), loaded: data.records.len(), skipped: data.skipped, failed_items })
}

//! Gravity CLI — run the ingest pipeline and manage its encrypted store.
//!
//! Commands:
//! - `run <DATE>` — plan, fetch, enrich, persist and quality-check matches
//! - `inspect` — decrypt the store and report table row counts
//! - `keygen` — print a fresh storage key

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use gravity_core::audit::{AuditSink, JsonlAudit};
use gravity_core::data::{MatchSource, StatsBombClient};
use gravity_core::scoring::LogisticXg;
use gravity_core::store::{EncryptedStore, Vault, EVENTS_TABLE, MATCHES_TABLE};
use gravity_runner::{
    encryption_key_from_env, Collaborators, Pipeline, PipelineConfig, RunSummary, TargetDate,
    ENCRYPTION_KEY_VAR,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "gravity",
    about = "Football Gravity — encrypted sports-event ingest pipeline"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the pipeline for one target date.
    Run {
        /// `today` or YYYY-MM-DD.
        date: TargetDate,

        /// Path to a TOML config file. Defaults are used when omitted.
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Decrypt the store and print table row counts.
    Inspect {
        /// Path to a TOML config file. Defaults are used when omitted.
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Print a new URL-safe base64 storage key.
    Keygen,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("gravity=info".parse()?))
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run { date, config } => run_pipeline(date, config.as_deref()).await,
        Commands::Inspect { config } => run_inspect(config.as_deref()),
        Commands::Keygen => {
            println!("{}", Vault::generate_key());
            Ok(())
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<PipelineConfig> {
    let config = match path {
        Some(path) => {
            tracing::info!(path = %path.display(), "loading config");
            PipelineConfig::from_file(path)?
        }
        None => {
            let config = PipelineConfig::default();
            config.validate()?;
            config
        }
    };
    Ok(config)
}

fn open_store(config: &PipelineConfig) -> Result<EncryptedStore> {
    let key = encryption_key_from_env()
        .with_context(|| format!("set {ENCRYPTION_KEY_VAR} (generate one with `gravity keygen`)"))?;
    let vault = Vault::from_base64(&key)?;
    Ok(EncryptedStore::new(&config.storage.data_dir, vault))
}

async fn run_pipeline(date: TargetDate, config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;
    let store = open_store(&config)?;

    let audit: Arc<dyn AuditSink> = Arc::new(JsonlAudit::new(&config.audit.path));
    let source: Arc<dyn MatchSource> = Arc::new(StatsBombClient::new(
        config.source.base_url.clone(),
        config.source.timeout(),
        config.retry,
        audit.clone(),
    )?);

    println!("[*] Football Gravity pipeline, target date {date}");
    let pipeline = Pipeline::new(
        config,
        Collaborators {
            source,
            scorer: Arc::new(LogisticXg::default()),
            storage: Arc::new(store),
            audit,
        },
    );
    let summary = pipeline.run(date).await;
    print_summary(&summary);

    if !summary.succeeded() {
        std::process::exit(1);
    }
    Ok(())
}

fn print_summary(summary: &RunSummary) {
    println!("[*] Final status: {}", summary.status);
    println!(
        "[*] Units completed: {}   records dropped: {}",
        summary.units_completed, summary.dropped_records
    );
    for report in &summary.quality_reports {
        let verdict = if report.passed { "PASS" } else { "FAIL" };
        println!(
            "    match {:<10} {verdict}  events={:<5} shots={:<3} xG {:.2} - {:.2}",
            report.match_id, report.total_events, report.total_shots, report.home_xg, report.away_xg
        );
        for anomaly in &report.anomalies {
            println!("        - {anomaly}");
        }
    }
    if !summary.errors.is_empty() {
        println!("[!] Errors during run:");
        for err in &summary.errors {
            println!("    - {err}");
        }
    }
}

fn run_inspect(config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;
    let store = open_store(&config)?;
    let snapshot = store
        .snapshot()
        .with_context(|| format!("decrypt store at {}", store.dir().display()))?;

    println!("Store: {}", store.dir().display());
    match &snapshot.manifest {
        Some(manifest) => println!("Last flush: {}", manifest.flushed_at.to_rfc3339()),
        None => println!("Last flush: never"),
    }
    println!("  {:<8} {:>8} rows", MATCHES_TABLE, snapshot.matches.len());
    println!("  {:<8} {:>8} rows", EVENTS_TABLE, snapshot.events.len());
    Ok(())
}

use anyhow::Context;
use chrono::{Duration as ChronoDuration, Utc};
use clap::{ArgAction, Parser, Subcommand};
use nf_core::{ArticleStorage, SourceDescriptor};
use nf_organizer::{DataOrganizer, OrganizeSummary};
use nf_scrapers::{
    default_sources, init_logging, load_sources, CollectionReport, CollectorConfig, LogConfig, RunState,
    ScraperManager,
};
use nf_storage::{create_storage, StorageKind};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Roughly ten thousand years, well inside chrono's range.
const MAX_DAYS: i64 = 3_650_000;
const MAX_LOOKBACK_HOURS: i64 = MAX_DAYS * 24;

#[derive(Parser, Debug)]
#[command(author, version, about = "Collect news articles and file them by source and date", long_about = None)]
pub struct Cli {
    /// SQLite database file
    #[arg(long, global = true, env = "NEWSFOLD_DB", default_value = "db/news_data.db")]
    db: PathBuf,
    /// Root of the organized folder tree
    #[arg(long, global = true, env = "NEWSFOLD_DATA_DIR", default_value = "news_data")]
    data_dir: PathBuf,
    /// Storage backend: sqlite or memory
    #[arg(long, global = true, default_value_t = StorageKind::Sqlite)]
    storage: StorageKind,
    /// JSON file replacing the built-in source list
    #[arg(long, global = true)]
    sources: Option<PathBuf>,
    /// How far back the first collection reaches
    #[arg(long, global = true, default_value_t = 24, value_parser = clap::value_parser!(u32).range(1..=MAX_LOOKBACK_HOURS))]
    lookback_hours: u32,
    #[arg(long, global = true, default_value = "db/scraper_state.json")]
    state_file: PathBuf,
    /// Also write logs to a daily file in this directory
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Commands {
    /// Collect new articles, then organize everything in the store
    Run,
    /// Collect, then organize only what was collected in the last DAYS days
    Quick {
        #[arg(default_value_t = 30, value_parser = clap::value_parser!(u32).range(1..=MAX_DAYS))]
        days: u32,
    },
    /// Report store and folder statistics without collecting
    Status,
    /// List the active news sources
    Sources,
}

impl Cli {
    fn registry(&self) -> anyhow::Result<Vec<SourceDescriptor>> {
        match &self.sources {
            Some(path) => load_sources(path).with_context(|| format!("failed to load sources from {}", path.display())),
            None => Ok(default_sources()),
        }
    }

    fn collector_config(&self, lookback: ChronoDuration) -> CollectorConfig {
        CollectorConfig {
            lookback,
            state_file: Some(self.state_file.clone()),
            ..Default::default()
        }
    }

    async fn open_storage(&self) -> anyhow::Result<Arc<dyn ArticleStorage>> {
        create_storage(self.storage, &self.db)
            .await
            .with_context(|| format!("failed to open {} storage at {}", self.storage, self.db.display()))
    }
}

fn print_report(report: &CollectionReport) {
    let kind = if report.first_run { "first run" } else { "incremental" };
    println!(
        "Collection window ({}): {} -> {}",
        kind,
        report.window.from.to_rfc3339(),
        report.window.to.to_rfc3339()
    );
    for outcome in &report.sources {
        match &outcome.error {
            Some(error) => println!("  ❌ {}: {}", outcome.source, error),
            None => println!(
                "  ✅ {}: {} links, {} extracted, {} new",
                outcome.source, outcome.candidates, outcome.extracted, outcome.inserted
            ),
        }
    }
    println!(
        "New articles: {} ({} available in window)",
        report.new_articles,
        report.articles.len()
    );
}

fn print_summary(summary: &OrganizeSummary, organizer: &DataOrganizer) {
    let total: usize = summary.values().sum();
    println!("Organized {} articles into {}", total, organizer.root().display());
    for (source, count) in summary {
        println!("  {}: {}", source, count);
    }
}

async fn collect(cli: &Cli, lookback: ChronoDuration) -> anyhow::Result<Arc<dyn ArticleStorage>> {
    let storage = cli.open_storage().await?;
    let sources = cli.registry()?;
    info!("🦗 Scrapers initialized: {}", sources.iter().map(|s| s.name.as_str()).collect::<Vec<_>>().join(", "));

    let manager = ScraperManager::with_http(storage.clone(), sources, cli.collector_config(lookback))?;
    let report = manager.run_collection(Utc::now()).await?;
    print_report(&report);
    Ok(storage)
}

async fn status(cli: &Cli) -> anyhow::Result<()> {
    println!("Storage: {}", cli.storage);
    if cli.storage == StorageKind::Sqlite && !cli.db.exists() {
        println!("Database: {} (not created yet)", cli.db.display());
    } else {
        let storage = cli.open_storage().await?;
        if cli.storage == StorageKind::Sqlite {
            let bytes = std::fs::metadata(&cli.db).map(|m| m.len()).unwrap_or(0);
            println!("Database: {} ({} bytes)", cli.db.display(), bytes);
        }
        println!("Articles stored: {}", storage.count().await?);
        match storage.last_collected_at().await? {
            Some(at) => println!("Last collected: {}", at.to_rfc3339()),
            None => println!("Last collected: never"),
        }
    }

    match RunState::load(&cli.state_file)? {
        Some(state) => println!("Last run state:\n{}", serde_json::to_string_pretty(&state)?),
        None => println!("Last run state: none"),
    }

    let organizer = DataOrganizer::new(&cli.data_dir);
    let stats = organizer.statistics()?;
    println!(
        "Organized files: {} across {} sources in {}",
        stats.total_articles,
        stats.total_sources(),
        organizer.root().display()
    );
    for (source, source_stats) in &stats.sources {
        println!("  {}: {}", source, source_stats.total);
    }
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(
        LogConfig {
            log_dir: cli.log_dir.clone(),
            ..Default::default()
        }
        .with_verbosity(cli.verbose),
    )?;

    match &cli.command {
        Commands::Run => {
            let lookback = ChronoDuration::hours(i64::from(cli.lookback_hours));
            let storage = collect(&cli, lookback).await?;
            let organizer = DataOrganizer::new(&cli.data_dir);
            let summary = organizer.organize_all(storage.as_ref(), Utc::now()).await?;
            print_summary(&summary, &organizer);
        }
        Commands::Quick { days } => {
            let storage = collect(&cli, ChronoDuration::days(i64::from(*days))).await?;
            let organizer = DataOrganizer::new(&cli.data_dir);
            let summary = organizer.organize_recent(storage.as_ref(), *days, Utc::now()).await?;
            print_summary(&summary, &organizer);
        }
        Commands::Status => status(&cli).await?,
        Commands::Sources => {
            for source in cli.registry()? {
                println!("{} ({}), up to {} articles", source.name, source.url, source.max_articles);
            }
        }
    }
    Ok(())
}

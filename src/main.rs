use facewatch::{
    core::registry::{IdentityUpdate, Registration, Registry, WatchlistSpec},
    AlertDispatcher, AnalyticsEngine, EngineConfig, FileIdentityStore, FileSightingStore,
    FileWatchlistStore, ForensicSearchEngine, IdentityResolver, Severity, WatchlistType,
};

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "facewatch")]
#[command(about = "Face identity engine: watchlist alerting and forensic search")]
struct Cli {
    /// Engine config file (TOML); defaults apply when omitted
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Verbose logging
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register an identity from an embedding file (JSON array of floats)
    Register {
        #[arg(short, long)]
        name: String,
        #[arg(short, long)]
        embedding: PathBuf,
        /// External user reference
        #[arg(long)]
        user_id: Option<String>,
        /// Watchlist classification: VIP, Blacklist, Unauthorized or Staff
        #[arg(long)]
        watchlist: Option<String>,
        /// Severity: Low, Medium, High or Critical (default: Medium)
        #[arg(long)]
        severity: Option<String>,
        #[arg(long)]
        notes: Option<String>,
    },
    /// List enrolled identities with watchlist status
    List,
    /// Rename and/or reclassify an identity
    Update {
        #[arg(short, long)]
        id: String,
        #[arg(short, long)]
        name: Option<String>,
        #[arg(long)]
        watchlist: Option<String>,
        #[arg(long)]
        severity: Option<String>,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Purge an identity and its watchlist entry (sightings are kept)
    Purge {
        #[arg(short, long)]
        id: String,
    },
    /// Remove watchlist entries whose identity no longer exists
    Reconcile,
    /// Resolve a probe embedding against the registry
    Resolve {
        #[arg(short, long)]
        embedding: PathBuf,
    },
    /// Forensic search over the audit trail
    Search {
        #[arg(short, long)]
        embedding: PathBuf,
        #[arg(short, long)]
        threshold: Option<f32>,
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// Recent sightings, newest first
    History {
        #[arg(short, long, default_value = "1")]
        page: usize,
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },
    /// Trailing-24h intelligence summary
    Stats,
    /// Sightings and per-name summary for a date range
    Report {
        /// Start date (YYYY-MM-DD)
        #[arg(long)]
        start: String,
        /// End date (YYYY-MM-DD), inclusive
        #[arg(long)]
        end: String,
        #[arg(short, long, default_value = "1")]
        page: usize,
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose);

    let config = match &cli.config {
        Some(path) => EngineConfig::load_from_path(path)?,
        None => EngineConfig::default(),
    };

    let data_dir = cli.data_dir.clone().or_else(|| config.storage.data_dir.clone());
    let (identities, watchlist, sightings) = open_stores(data_dir)?;
    let registry = Registry::new(
        identities.clone(),
        watchlist.clone(),
        config.matching.embedding_dim,
    );

    match cli.command {
        Commands::Register {
            name,
            embedding,
            user_id,
            watchlist,
            severity,
            notes,
        } => {
            let embedding = read_embedding(&embedding)?;
            let spec = watchlist_spec(watchlist, severity, notes)?;
            let identity = registry.register(Registration {
                name,
                embedding,
                user_id,
                source_image: None,
                watchlist: spec,
            })?;
            println!("Registered {} ({})", identity.name, identity.id);
        }
        Commands::List => {
            let identities = registry.list()?;
            println!("{}", serde_json::to_string_pretty(&identities)?);
        }
        Commands::Update {
            id,
            name,
            watchlist,
            severity,
            notes,
        } => {
            let spec = watchlist_spec(watchlist, severity, notes)?;
            let identity = registry.update(&id, IdentityUpdate { name, watchlist: spec })?;
            println!("Updated {} ({})", identity.name, identity.id);
        }
        Commands::Purge { id } => {
            let outcome = registry.purge(&id)?;
            if !outcome.identity_removed {
                println!("No identity with id {}", id);
            } else if outcome.watchlist_cleanup_failed {
                println!("Identity purged; watchlist cleanup failed, run `facewatch reconcile`");
            } else {
                println!("Identity purged");
            }
        }
        Commands::Reconcile => {
            let removed = registry.reconcile()?;
            println!("Removed {} orphaned watchlist entr{}", removed, if removed == 1 { "y" } else { "ies" });
        }
        Commands::Resolve { embedding } => {
            let probe = read_embedding(&embedding)?;
            let resolver =
                IdentityResolver::new(identities.clone(), config.matching.resolve_threshold);
            let resolution = resolver.resolve(&probe)?;
            if let Some(alert) =
                AlertDispatcher::new(watchlist.clone()).dispatch(resolution.identity_id.as_deref())
            {
                println!("{}", serde_json::to_string_pretty(&alert)?);
            }
            println!("{}", serde_json::to_string_pretty(&resolution)?);
        }
        Commands::Search {
            embedding,
            threshold,
            limit,
        } => {
            let probe = read_embedding(&embedding)?;
            let engine = ForensicSearchEngine::new(sightings.clone(), config.search.clone());
            let matches = engine.search_with(
                &probe,
                threshold.unwrap_or(config.search.threshold),
                limit.unwrap_or(config.search.limit),
            )?;
            println!("Found {} match(es)", matches.len());
            println!("{}", serde_json::to_string_pretty(&matches)?);
        }
        Commands::History { page, limit } => {
            let analytics = AnalyticsEngine::new(sightings.clone());
            let history = analytics.history(page, limit)?;
            println!("{}", serde_json::to_string_pretty(&history)?);
        }
        Commands::Stats => {
            let analytics = AnalyticsEngine::new(sightings.clone());
            let stats = analytics.advanced_stats()?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        Commands::Report {
            start,
            end,
            page,
            limit,
        } => {
            let analytics = AnalyticsEngine::new(sightings.clone());
            let report =
                analytics.report(parse_day_start(&start)?, parse_day_end(&end)?, page, limit)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}

#[allow(clippy::type_complexity)]
fn open_stores(
    data_dir: Option<PathBuf>,
) -> Result<(
    Arc<FileIdentityStore>,
    Arc<FileWatchlistStore>,
    Arc<FileSightingStore>,
)> {
    let stores = match data_dir {
        Some(base) => (
            FileIdentityStore::open(base.join("identities"))?,
            FileWatchlistStore::open(base.join("watchlist"))?,
            FileSightingStore::open(base.join("sightings"))?,
        ),
        None => (
            FileIdentityStore::open_default()?,
            FileWatchlistStore::open_default()?,
            FileSightingStore::open_default()?,
        ),
    };
    Ok((Arc::new(stores.0), Arc::new(stores.1), Arc::new(stores.2)))
}

fn read_embedding(path: &PathBuf) -> Result<Vec<f32>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read embedding file {:?}", path))?;
    let embedding: Vec<f32> = serde_json::from_str(&contents)
        .with_context(|| format!("Embedding file {:?} is not a JSON array of floats", path))?;
    Ok(embedding)
}

fn watchlist_spec(
    kind: Option<String>,
    severity: Option<String>,
    notes: Option<String>,
) -> Result<Option<WatchlistSpec>> {
    let kind = match kind {
        Some(kind) => kind.parse::<WatchlistType>()?,
        None => {
            if severity.is_some() || notes.is_some() {
                return Err(anyhow!("--severity/--notes require --watchlist"));
            }
            return Ok(None);
        }
    };
    let severity = severity.map(|s| s.parse::<Severity>()).transpose()?;
    Ok(Some(WatchlistSpec {
        kind,
        severity,
        nickname: None,
        notes,
    }))
}

fn parse_day_start(day: &str) -> Result<DateTime<Utc>> {
    let date = NaiveDate::parse_from_str(day, "%Y-%m-%d")
        .with_context(|| format!("Invalid date: {}", day))?;
    let start = date
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| anyhow!("Invalid date: {}", day))?;
    Ok(Utc.from_utc_datetime(&start))
}

fn parse_day_end(day: &str) -> Result<DateTime<Utc>> {
    let date = NaiveDate::parse_from_str(day, "%Y-%m-%d")
        .with_context(|| format!("Invalid date: {}", day))?;
    let end = date
        .and_hms_opt(23, 59, 59)
        .ok_or_else(|| anyhow!("Invalid date: {}", day))?;
    Ok(Utc.from_utc_datetime(&end))
}

fn setup_logging(verbose: bool) {
    if verbose {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_file(true)
            .with_line_number(true)
            .with_thread_ids(true)
            .init();
    } else {
        tracing_subscriber::fmt::init();
    }
}

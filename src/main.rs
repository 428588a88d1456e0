use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use planet::bookmark::BookmarkClient;
use planet::config::Config;
use planet::ingest::{self, oracle::ScoreOracle};
use planet::storage::{Database, SourceKind};
use planet::util::url::{extract_site_url, normalize_feed_url};

#[derive(Parser, Debug)]
#[command(name = "planet", about = "Blog feed aggregator with popularity tracking")]
struct Args {
    /// Path to the config file
    #[arg(long, value_name = "FILE", default_value = "planet.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch all registered feeds and store new posts
    Ingest,

    /// Recompute per-source bookmark totals from the relationship rows
    ReconcileTotals,

    /// Register a feed source (the URL is normalized before storage)
    AddSource {
        /// Feed URL; a missing scheme defaults to https
        url: String,

        /// Display title; defaults to the normalized URL
        #[arg(long)]
        title: Option<String>,

        /// Register as a slide source instead of a blog
        #[arg(long)]
        slide: bool,

        /// Mark the source as an official/vendor feed
        #[arg(long)]
        official: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let config = Config::load(&args.config).context("Failed to load configuration")?;

    let db = Database::open(&config.database_path)
        .await
        .with_context(|| format!("Failed to open database at '{}'", config.database_path))?;

    match args.command {
        Command::Ingest => {
            let http = reqwest::Client::builder()
                .user_agent(&config.user_agent)
                .build()
                .context("Failed to build HTTP client")?;
            let bookmarks = BookmarkClient::new(
                http.clone(),
                &config.bookmark_api_endpoint,
                Duration::from_millis(config.bookmark_delay_ms),
            );
            let oracle = config
                .score_oracle_url
                .as_deref()
                .map(|url| ScoreOracle::new(http.clone(), url));

            let stats = ingest::run_ingest(&db, &http, &bookmarks, oracle.as_ref(), &config)
                .await
                .context("Ingestion run failed")?;
            println!(
                "Ingested {} sources ({} failed): {} new posts, {} skipped",
                stats.sources_ok, stats.sources_failed, stats.posts_inserted, stats.posts_skipped
            );
        }

        Command::ReconcileTotals => {
            let corrected = db
                .reconcile_source_totals()
                .await
                .context("Failed to reconcile source totals")?;
            println!("Corrected {corrected} drifted source totals");
        }

        Command::AddSource {
            url,
            title,
            slide,
            official,
        } => {
            let feed_url = normalize_feed_url(&url);
            let site_url = extract_site_url(&url);
            let title = title.unwrap_or_else(|| feed_url.clone());
            let kind = if slide {
                SourceKind::Slide
            } else {
                SourceKind::Blog
            };

            let id = db
                .upsert_source(&feed_url, &title, Some(&site_url), kind, official)
                .await
                .with_context(|| format!("Failed to register source '{feed_url}'"))?;
            println!("Registered source #{id}: {feed_url}");
        }
    }

    Ok(())
}

//! # sentinel-cli
//!
//! Pipeline driver binary — wires the stores and services together and runs
//! one batch step per invocation, or the HTTP server under `serve`.

#![deny(unsafe_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use sentinel_analytics::AnalyticsAggregator;
use sentinel_core::{ContentId, Platform};
use sentinel_guard::{kill_switch, EnvKeyProvider, SecurityGuard};
use sentinel_publisher::{
    BearerTokenSource, PlatformClient, PublisherSimulator, SimulatedPlatform,
};
use sentinel_scheduler::Scheduler;
use sentinel_server::SentinelServer;
use sentinel_settings::{
    get_settings, init_settings, load_settings, load_settings_from_path, SentinelSettings,
};
use sentinel_store::{ConnectionConfig, ContentStore, Store};

/// Sentinel content pipeline.
#[derive(Parser, Debug)]
#[command(name = "sentinel", about = "Content publishing pipeline")]
struct Cli {
    /// Settings file (defaults to ~/.sentinel/settings.json).
    #[arg(long)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Screen every loaded content item and persist the verdicts.
    Screen,
    /// Plan a publish action for one item.
    Schedule {
        /// The content item to schedule.
        content_id: String,
        /// Target platform (twitter, instagram, linkedin, sanatan).
        platform: String,
        /// Explicit publish time (RFC 3339); omitted means the default cadence slot.
        #[arg(long)]
        at: Option<String>,
    },
    /// Drain the due queue once through the publisher pool.
    PublishDue,
    /// Rebuild the strategy suggestion snapshot from publish records.
    Recompute,
    /// Run the HTTP serving boundary.
    Serve,
    /// Irreversibly erase all pipeline state.
    KillSwitch {
        /// Skip the confirmation check.
        #[arg(long)]
        yes: bool,
    },
}

fn load(cli_settings: Option<&Path>) -> Result<SentinelSettings> {
    let settings = match cli_settings {
        Some(path) => load_settings_from_path(path)
            .with_context(|| format!("failed to load settings from {}", path.display()))?,
        None => load_settings().unwrap_or_default(),
    };
    Ok(settings)
}

fn init_logging(settings: &SentinelSettings) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(settings.logging.level.clone()));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn open_store(settings: &SentinelSettings) -> Result<Arc<Store>> {
    let path = PathBuf::from(&settings.storage.db_path);
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
    }
    let config = ConnectionConfig {
        pool_size: settings.storage.pool_size,
        busy_timeout_ms: u32::try_from(settings.storage.busy_timeout_ms).unwrap_or(30_000),
    };
    let store = Store::open(&path, &config)
        .with_context(|| format!("failed to open store at {}", path.display()))?;
    Ok(Arc::new(store))
}

fn load_content(settings: &SentinelSettings) -> Result<Arc<ContentStore>> {
    let dir = PathBuf::from(&settings.storage.content_dir);
    if !dir.exists() {
        tracing::warn!(dir = %dir.display(), "content directory missing, starting empty");
        return Ok(Arc::new(ContentStore::default()));
    }
    let content = ContentStore::load(&dir)
        .with_context(|| format!("failed to load content from {}", dir.display()))?;
    Ok(Arc::new(content))
}

fn build_guard(store: &Arc<Store>, settings: &SentinelSettings) -> Result<Arc<SecurityGuard>> {
    let keys = Arc::new(EnvKeyProvider::new(&settings.guard.archive_key_env));
    let guard = SecurityGuard::new(Arc::clone(store), &settings.guard, keys)?;
    Ok(Arc::new(guard))
}

fn build_publisher(
    store: &Arc<Store>,
    content: &Arc<ContentStore>,
    settings: &SentinelSettings,
) -> Arc<PublisherSimulator> {
    Arc::new(PublisherSimulator::new(
        Arc::clone(store),
        Arc::clone(content),
        Arc::new(SimulatedPlatform::new()) as Arc<dyn PlatformClient>,
        BearerTokenSource::new(&settings.server.jwt_secret_env, settings.server.token_ttl_secs),
        settings.publisher.clone(),
    ))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    if init_settings(load(cli.settings.as_deref())?).is_err() {
        bail!("settings already initialized");
    }
    let settings = get_settings();
    init_logging(settings);
    settings.validate().context("invalid settings")?;

    match cli.command {
        Command::Screen => {
            let store = open_store(settings)?;
            let content = load_content(settings)?;
            let guard = build_guard(&store, settings)?;
            let verdicts = guard.screen_all(&content.items_sorted())?;
            for verdict in &verdicts {
                println!(
                    "{}: {}",
                    verdict.content_id.as_str(),
                    verdict.status.as_str()
                );
            }
            println!("screened {} items", verdicts.len());
        }
        Command::Schedule {
            content_id,
            platform,
            at,
        } => {
            let Some(platform) = Platform::from_str_opt(&platform) else {
                bail!("unknown platform {platform}");
            };
            let requested_at = match at {
                Some(raw) => Some(
                    DateTime::parse_from_rfc3339(&raw)
                        .map(|t| t.with_timezone(&Utc))
                        .with_context(|| format!("invalid --at timestamp {raw}"))?,
                ),
                None => None,
            };
            let store = open_store(settings)?;
            let scheduler = Scheduler::new(Arc::clone(&store), settings.scheduler.clone());
            let entry = scheduler.schedule(
                &ContentId::from(content_id.as_str()),
                platform,
                requested_at,
            )?;
            println!(
                "scheduled {} on {} at {} (entry {})",
                entry.content_id.as_str(),
                entry.platform,
                entry.planned_at.to_rfc3339(),
                entry.id.as_str()
            );
        }
        Command::PublishDue => {
            let store = open_store(settings)?;
            let content = load_content(settings)?;
            let publisher = build_publisher(&store, &content, settings);
            let scheduler = Arc::new(Scheduler::new(
                Arc::clone(&store),
                settings.scheduler.clone(),
            ));
            let report = publisher.publish_due(&scheduler, Utc::now()).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Recompute => {
            let store = open_store(settings)?;
            let aggregator = AnalyticsAggregator::new(store, settings.analytics.clone());
            let suggestions = aggregator.recompute()?;
            println!("{}", serde_json::to_string_pretty(&suggestions)?);
        }
        Command::Serve => {
            let store = open_store(settings)?;
            let content = load_content(settings)?;
            let guard = build_guard(&store, settings)?;
            let publisher = build_publisher(&store, &content, settings);
            let analytics = Arc::new(AnalyticsAggregator::new(
                Arc::clone(&store),
                settings.analytics.clone(),
            ));
            let server = SentinelServer::new(
                store,
                content,
                guard,
                publisher,
                analytics,
                settings.server.clone(),
            );
            server.serve().await?;
        }
        Command::KillSwitch { yes } => {
            if !yes {
                bail!("kill-switch is irreversible; pass --yes to confirm");
            }
            let store = open_store(settings)?;
            let report = kill_switch(&store, Path::new(&settings.storage.content_dir))?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }
    Ok(())
}

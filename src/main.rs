use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::Duration;

use episode_sync::config::Config;
use episode_sync::enrich::attach_summary;
use episode_sync::storage::{Database, DatabaseError, EpisodeRecord, EpisodeStore};
use episode_sync::sync::{ChannelSync, FeedSource, SyncError, SyncOutcome};

/// Get the config directory path (~/.config/episode-sync/)
fn get_config_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    let config_dir = PathBuf::from(home).join(".config").join("episode-sync");
    Ok(config_dir)
}

/// Create the config directory with user-only permissions.
fn ensure_private_dir(dir: &Path) -> Result<()> {
    if !dir.exists() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create directory {}", dir.display()))?;
        tracing::info!(path = %dir.display(), "Created config directory");
    }

    // SEC-007: Set directory permissions on Unix (user-only access)
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Err(e) = std::fs::set_permissions(dir, std::fs::Permissions::from_mode(0o700)) {
            tracing::warn!(
                path = %dir.display(),
                error = %e,
                "Failed to set config directory permissions to 0700"
            );
        }
    }
    Ok(())
}

#[derive(Parser, Debug)]
#[command(
    name = "episode-sync",
    about = "Keep a local episode store in sync with a YouTube channel feed"
)]
struct Args {
    /// Config file (default: ~/.config/episode-sync/config.toml)
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Episode database, overriding the config file and environment
    #[arg(long, value_name = "FILE", global = true)]
    database: Option<PathBuf>,

    /// Channel id, overriding the config file and environment
    #[arg(long, value_name = "ID", global = true)]
    channel: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch the channel feed and upsert every episode
    Sync,

    /// List stored episodes, newest first
    List,

    /// Print one stored episode as JSON
    Show {
        #[arg(long, conflicts_with = "video_id", required_unless_present = "video_id")]
        slug: Option<String>,

        #[arg(long)]
        video_id: Option<String>,
    },

    /// Attach a generated summary to a stored episode
    Summary { video_id: String, text: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing for debug logging
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config_dir = get_config_dir()?;
    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| config_dir.join("config.toml"));
    let mut config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?
        .with_env_overrides();
    if let Some(channel) = &args.channel {
        config.channel_id = Some(channel.clone());
    }
    if let Some(database) = &args.database {
        config.database_path = Some(database.clone());
    }

    let db_path = match &config.database_path {
        Some(path) => path.clone(),
        None => {
            ensure_private_dir(&config_dir)?;
            config_dir.join("episodes.db")
        }
    };
    let db = open_database(&db_path).await?;

    let result = run(args.command, &config, &db).await;
    db.close().await;
    result
}

async fn open_database(path: &Path) -> Result<Database> {
    let path_str = path
        .to_str()
        .ok_or_else(|| anyhow::anyhow!("Invalid UTF-8 in database path"))?;
    match Database::open(path_str).await {
        Ok(db) => Ok(db),
        Err(DatabaseError::InstanceLocked) => {
            eprintln!("Error: The episode database is locked by another process. Try again shortly.");
            std::process::exit(1);
        }
        Err(e) => Err(anyhow::anyhow!("Failed to open database: {}", e)),
    }
}

async fn run(command: Command, config: &Config, db: &Database) -> Result<()> {
    match command {
        Command::Sync => run_sync(config, db).await,
        Command::List => {
            let episodes = db.list_all().await.context("Failed to list episodes")?;
            for episode in &episodes {
                println!(
                    "{}\t{}\t{}\t{}",
                    episode.video_id, episode.slug, episode.published_time_text, episode.title
                );
            }
            tracing::debug!(count = episodes.len(), "Listed episodes");
            Ok(())
        }
        Command::Show { slug, video_id } => {
            let found = match (slug.as_deref(), video_id.as_deref()) {
                (Some(slug), _) => db.get_by_slug(slug).await,
                (None, Some(video_id)) => db.get_by_video_id(video_id).await,
                (None, None) => anyhow::bail!("Either --slug or --video-id is required"),
            }
            .context("Failed to look up episode")?;
            match found {
                Some(episode) => print_json(&episode),
                None => {
                    eprintln!("Error: No such episode");
                    std::process::exit(1);
                }
            }
        }
        Command::Summary { video_id, text } => {
            let episode: EpisodeRecord = attach_summary(db, &video_id, &text).await?;
            print_json(&episode)
        }
    }
}

async fn run_sync(config: &Config, db: &Database) -> Result<()> {
    let channel_id = config.channel_id.clone().ok_or_else(|| {
        anyhow::anyhow!(
            "No channel configured: set channel_id in the config file, {} or --channel",
            episode_sync::config::CHANNEL_ID_ENV
        )
    })?;

    let mut client = reqwest::Client::builder();
    if config.request_timeout_secs > 0 {
        client = client.timeout(Duration::from_secs(config.request_timeout_secs));
    }
    let client = client.build().context("Failed to build HTTP client")?;

    let sync = ChannelSync::new(
        client,
        FeedSource {
            base_url: config.feed_base_url.clone(),
            channel_id,
        },
    )
    .context("Invalid feed_base_url")?;
    tracing::debug!(url = %sync.feed_url(), "Syncing channel feed");

    match sync.sync(db).await {
        Ok(outcome) => print_json(&outcome),
        Err(SyncError::Persistence(e)) => {
            print_json(&SyncOutcome {
                success: false,
                count: 0,
                dropped: 0,
            })?;
            Err(e.context("Sync failed"))
        }
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string(value).context("Failed to serialize output")?;
    println!("{}", json);
    Ok(())
}

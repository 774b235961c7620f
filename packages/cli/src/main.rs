//! `podcast-tracker` -- terminal front end for the podcast processing backend.
//!
//! Submits episodes for processing, follows job progress and inspects the
//! processed results held in the Result Store.
//!
//! # Environment variables
//!
//! | Variable                     | Default                  | Description                        |
//! |------------------------------|--------------------------|------------------------------------|
//! | `PODCAST_API_BASE_URL`       | `http://localhost:5000`  | Processing backend                 |
//! | `POLL_INTERVAL_SECS`         | `5`                      | Seconds between status polls       |
//! | `RESULT_CACHE_COOLDOWN_SECS` | `5`                      | Result Store cache cooldown        |
//! | `JOB_STALL_TIMEOUT_SECS`     | `1800`                   | Stalled-job warning, `0` disables  |
//! | `HTTP_TIMEOUT_SECS`          | `30`                     | Per-request timeout, `0` disables  |
//! | `STORAGE_BACKEND`, `S3_*`    |                          | Result Store location              |
//! | `RESULT_STORE_KEY`           | `processed_podcasts.json`| Aggregate document key             |

mod render;

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use actors::{ConfigError, TrackerConfig, TrackerError, TrackerHandle, start_tracker};
use api::{ApiError, HttpBackend};
use clap::{Parser, Subcommand};
use podcast_core::{JobId, PodcastInfo};
use storage::{ResultStore, StorageError};
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "podcast-tracker")]
#[command(about = "Submit podcast episodes for processing and track their progress", version)]
struct Cli {
    /// Processing backend base URL (overrides PODCAST_API_BASE_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search the podcast directory
    Search { query: String },

    /// List the episodes of a feed with their submission index
    Episodes { feed_url: String },

    /// Submit one episode for processing
    Process {
        feed_url: String,

        /// Index from `episodes` output
        episode_index: usize,

        /// Follow the job until it finishes
        #[arg(long)]
        watch: bool,
    },

    /// Show jobs the backend still has in flight
    Jobs,

    /// Follow in-flight jobs until all of them finish
    Watch,

    /// Delete or cancel a job
    DeleteJob { job_id: String },

    /// Show processed episodes and auto-processed feeds
    Processed {
        /// Bypass the cache cooldown
        #[arg(long)]
        refresh: bool,
    },

    /// Remove a processed episode from the Result Store
    DeleteEpisode {
        podcast_title: String,
        episode_title: String,
    },

    /// Automatic processing of new episodes
    Auto {
        #[command(subcommand)]
        action: AutoCommands,
    },

    /// Print the rewritten RSS document of a feed
    Rss { feed_url: String },

    /// LLM prompts used for content detection
    Prompts {
        #[command(subcommand)]
        action: PromptCommands,
    },

    /// Presign a download URL for a stored artifact
    Link {
        /// Artifact locator from `processed` output
        key: String,

        /// Lifetime of the URL in seconds
        #[arg(long, default_value_t = 3600)]
        ttl_secs: u64,
    },
}

#[derive(Subcommand)]
enum AutoCommands {
    /// Enroll a feed
    Enable {
        feed_url: String,

        /// Display name to remember for the feed
        #[arg(long)]
        name: Option<String>,

        /// Cover image to remember for the feed
        #[arg(long)]
        image_url: Option<String>,
    },

    /// Withdraw a feed
    Delete { feed_url: String },
}

#[derive(Subcommand)]
enum PromptCommands {
    /// Print the current prompts
    Show,

    /// Replace one or both prompts; omitted ones keep their current text
    Set {
        #[arg(long)]
        openai: Option<String>,

        #[arg(long)]
        gemini: Option<String>,
    },
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Tracker(#[from] TrackerError),
    #[error("failed to start tracker: {0}")]
    Spawn(#[from] ractor::SpawnErr),
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "podcast_cli=info,actors=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Command failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let mut config = TrackerConfig::from_env()?;
    if let Some(api_url) = cli.api_url {
        config.api_base_url = api_url;
    }

    let store = ResultStore::from_env().await?;
    if let Commands::Link { key, ttl_secs } = &cli.command {
        let url = store
            .storage()
            .signed_url(key, Duration::from_secs(*ttl_secs))
            .await?;
        println!("{}", url);
        return Ok(());
    }

    let backend = HttpBackend::new(&config.api_base_url, config.http_timeout)?;
    tracing::debug!(api = %backend.base_url(), "Using processing backend");
    let (tracker, actor) = start_tracker(&config, Arc::new(backend), Arc::new(store)).await?;

    let result = dispatch(&tracker, cli.command).await;
    tracker.shutdown();
    let _ = actor.await;
    result
}

async fn dispatch(tracker: &TrackerHandle, command: Commands) -> Result<(), CliError> {
    match command {
        Commands::Search { query } => {
            render::podcasts(&tracker.search(&query).await?);
        }

        Commands::Episodes { feed_url } => {
            let episodes = tracker.fetch_episodes(&feed_url).await?;
            render::episodes(&feed_url, &episodes);
        }

        Commands::Process {
            feed_url,
            episode_index,
            watch,
        } => {
            // Podcast names come from the Result Store lookup; submit without it if unreachable.
            let _ = tracker.processed_data(false).await;
            let job = tracker.submit_job(&feed_url, episode_index).await?;
            println!("Submitted {} as job {}", job.episode_title, job.job_id);
            if watch {
                follow(tracker).await?;
            }
        }

        Commands::Jobs => {
            tracker.load().await?;
            render::jobs(&tracker.view());
        }

        Commands::Watch => {
            tracker.load().await?;
            follow(tracker).await?;
        }

        Commands::DeleteJob { job_id } => {
            tracker.delete_job(&JobId::new(job_id.clone())).await?;
            println!("Deleted job {}", job_id);
        }

        Commands::Processed { refresh } => {
            render::processed(&tracker.processed_data(refresh).await?);
        }

        Commands::DeleteEpisode {
            podcast_title,
            episode_title,
        } => {
            tracker
                .delete_processed_episode(&podcast_title, &episode_title)
                .await?;
            println!("Deleted {} - {}", podcast_title, episode_title);
        }

        Commands::Auto { action } => match action {
            AutoCommands::Enable {
                feed_url,
                name,
                image_url,
            } => {
                let _ = tracker.processed_data(false).await;
                let info = name.map(|name| PodcastInfo::new(name, image_url));
                let entry = tracker.enable_auto_processing(&feed_url, info).await?;
                println!("Auto-processing enabled for {}", entry.feed_url);
            }
            AutoCommands::Delete { feed_url } => {
                tracker.delete_auto_processed_podcast(&feed_url).await?;
                println!("Auto-processing removed for {}", feed_url);
            }
        },

        Commands::Rss { feed_url } => {
            println!("{}", tracker.modified_feed(&feed_url).await?);
        }

        Commands::Prompts { action } => match action {
            PromptCommands::Show => render::prompts(&tracker.prompts().await?),
            PromptCommands::Set { openai, gemini } => {
                let mut prompts = tracker.prompts().await?;
                if let Some(openai) = openai {
                    prompts.openai = openai;
                }
                if let Some(gemini) = gemini {
                    prompts.gemini = gemini;
                }
                tracker.save_prompts(&prompts).await?;
                println!("Prompts saved");
            }
        },

        Commands::Link { .. } => {}
    }

    Ok(())
}

/// Print notifications until nothing is in flight or Ctrl-C.
async fn follow(tracker: &TrackerHandle) -> Result<(), CliError> {
    let mut events = tracker.events();
    let mut view = tracker.subscribe();
    render::jobs(&view.borrow_and_update());

    while !view.borrow().is_idle() {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted, jobs keep running on the backend");
                break;
            }
            event = events.recv() => match event {
                Ok(event) => println!("{}", event.description()),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Missed tracker notifications");
                }
                Err(RecvError::Closed) => break,
            },
            changed = view.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
    }

    // Drain what the last poll emitted.
    while let Ok(event) = events.try_recv() {
        println!("{}", event.description());
    }
    Ok(())
}

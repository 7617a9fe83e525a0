//! Coursemark CLI - drive a course progress session from the command line.
//!
//! Each invocation is one learner session: connect to the LMS bridge (or fall
//! back to the local store), hydrate, run the command, terminate.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::{Parser, Subcommand};
use coursemark_core::{CourseMap, SuspendPatch};
use coursemark_progress::{
    ConnectOutcome, LanguagePreference, LoadOptions, NavigateOutcome, ProgressStore, RouteTracker,
    StoreConfig,
};
use coursemark_storage::{HttpHost, LocalStore, MemoryHost};
use serde::Deserialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "coursemark")]
#[command(about = "Course progress persistence", long_about = None)]
struct Cli {
    /// JSON config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory holding the local progress file
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Base URL of the LMS bridge; runs standalone when absent
    #[arg(long)]
    host_url: Option<String>,

    /// Protocol version requested from the host
    #[arg(long)]
    protocol: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show progress and the resume prompt state
    Status,
    /// Report a navigation to a course route
    Visit {
        /// Route path, e.g. /section1/
        path: String,
    },
    /// Resume where the learner left off
    Resume {
        /// Route the learner is on now
        #[arg(long, default_value = "/")]
        from: String,
    },
    /// Start the course over
    Restart,
    /// Store a field in the suspend payload
    Set {
        /// Field name
        key: String,
        /// Value (JSON, or taken as a plain string)
        value: String,
    },
    /// Record the learner's language
    Lang {
        /// Language code
        code: String,
    },
    /// Record a score out of 100
    Score {
        /// Raw score
        value: f64,
    },
    /// Mark the course completed
    Complete,
    /// Show the learner reported by the LMS
    Learner,
    /// List the course routes
    Routes,
}

/// Contents of the `--config` file.
#[derive(Debug, Deserialize)]
#[serde(default)]
struct CliConfig {
    routes: Vec<String>,
    data_dir: PathBuf,
    host_url: Option<String>,
    store: StoreConfig,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            routes: vec!["/".to_string()],
            data_dir: PathBuf::from(".coursemark"),
            host_url: None,
            store: StoreConfig::default(),
        }
    }
}

/// Language loads are reported in the log; the CLI has no UI to switch.
struct LoggedLanguage;

#[async_trait]
impl LanguagePreference for LoggedLanguage {
    async fn load(&self, lang: &str, options: LoadOptions) -> anyhow::Result<()> {
        info!(lang, persist = options.persist, "Language preference restored");
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => CliConfig::default(),
    };
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }
    if let Some(url) = cli.host_url {
        config.host_url = Some(url);
    }
    if let Some(version) = cli.protocol {
        config.store.protocol_version = version;
    }

    let course = CourseMap::new(&config.routes).context("Invalid course routes")?;
    let local = LocalStore::open(config.data_dir.join("progress.json")).await?;

    let store = match &config.host_url {
        Some(url) => ProgressStore::new(HttpHost::new(url), local),
        None => ProgressStore::new(MemoryHost::unavailable(), local),
    };
    let mut store = store
        .with_config(config.store.clone())
        .with_language_preference(Arc::new(LoggedLanguage));

    if store.connect().await == ConnectOutcome::Fallback {
        store.hydrate_from_persistence().await;
    }

    let mut tracker = RouteTracker::new(course);

    match cli.command {
        Commands::Status => {
            let snapshot = store.snapshot();
            println!("Session: {}", snapshot.session);
            println!("  Connected: {}", snapshot.connected);
            if snapshot.connected {
                println!("  Protocol: {}", snapshot.protocol_version);
            }
            match snapshot.location.and_then(|loc| tracker.course().route(loc).map(|r| (loc, r))) {
                Some((loc, route)) => println!("  Location: {} ({})", loc, route),
                None => println!("  Location: {}", format_location(snapshot.location)),
            }
            println!("  Resume available: {}", snapshot.resume_available);
            if snapshot.should_prompt() {
                println!("  Prompt: resume or restart?");
            }
        }
        Commands::Visit { path } => match tracker.on_navigate(&mut store, &path).await? {
            NavigateOutcome::UnknownRoute => println!("Not a course route: {}", path),
            NavigateOutcome::Advanced(loc) => println!("Advanced to {}", loc),
            NavigateOutcome::Unchanged(loc) => {
                println!("At {}, furthest is {}", loc, format_location(store.location()))
            }
        },
        Commands::Resume { from } => {
            store.resume_course();
            match tracker.resume_redirect(&store, &from) {
                Some(route) => println!("Resume at {}", route),
                None => println!("Nothing to resume from {}", from),
            }
        }
        Commands::Restart => {
            store.restart_course().await?;
            println!("Progress cleared");
        }
        Commands::Set { key, value } => {
            let value = serde_json::from_str(&value).unwrap_or(serde_json::Value::String(value));
            store.set_suspend_data(SuspendPatch::new().field(key, value)).await?;
            if let Some(encoded) = store.encoded_suspend_data() {
                println!("{}", encoded);
            }
        }
        Commands::Lang { code } => {
            store.set_suspend_data(SuspendPatch::new().language(code)).await?;
            println!("Language saved");
        }
        Commands::Score { value } => {
            require_host(&store)?;
            store.set_score(value).await?;
            println!("Score recorded: {}", value);
        }
        Commands::Complete => {
            require_host(&store)?;
            store.set_complete().await?;
            println!("Course marked complete");
        }
        Commands::Learner => {
            require_host(&store)?;
            let name = store.get_student_name().await.unwrap_or_default();
            let id = store.get_student_id().await.unwrap_or_default();
            println!("Learner: {} ({})", name, id);
            if let Some(score) = store.get_score().await {
                println!("  Score: {}", score);
            }
        }
        Commands::Routes => {
            for (ordinal, route) in tracker.course().iter() {
                println!("  {} {}", ordinal, route);
            }
        }
    }

    store.terminate().await;
    Ok(())
}

fn load_config(path: &Path) -> Result<CliConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("Invalid config {}", path.display()))
}

fn require_host(store: &ProgressStore) -> Result<()> {
    if !store.connected() {
        anyhow::bail!("No LMS connection; pass --host-url or set host_url in the config");
    }
    Ok(())
}

fn format_location(location: Option<u32>) -> String {
    location.map_or_else(|| "none".to_string(), |loc| loc.to_string())
}

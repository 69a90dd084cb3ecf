//! Tyria daemon entry point.
//!
//! Loads TOML configuration, opens the SQLite store, builds the GW2
//! API client, and wires the session tracker. `run` ingests presence
//! events as JSON lines on stdin (one [`PresenceUpdate`] per line,
//! the shape the chat adapter emits) until ctrl-c; the remaining
//! subcommands expose the user-facing commands for direct use.

mod commands;

use anyhow::Result;
use api::{AchievementCache, Gw2Api};
use clap::{Parser, Subcommand};
use sqlite::SqliteStore;
use std::sync::Arc;
use tcore::{BotConfig, PresenceUpdate, Report, SessionStore};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    signal,
};
use tracing_subscriber::EnvFilter;
use tracker::{LogNotifier, Tracker};

#[derive(Parser)]
#[command(name = "tyriad", about = "GW2 companion bot daemon", version)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "tyria.toml")]
    config: String,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Track presence events from stdin until ctrl-c (the default).
    Run,
    /// Validate a GW2 API key and register it for a user.
    Register { user_id: String, token: String },
    /// Remove a user's registered key.
    Forget { user_id: String },
    /// Account overview: age, server, ranks, achievement points.
    Account { user_id: String },
    /// Characters with professions and death counts.
    Characters { user_id: String },
    /// Current WvW match for the user's world.
    Match { user_id: String },
    /// Resolve world or team ids to names.
    Worlds { ids: Vec<u32> },
    /// Diff report for the user's newest play session.
    Report { user_id: String },
    /// Enable or disable session tracking for a guild.
    Tracking { guild_id: String, enabled: bool },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing from RUST_LOG.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = if std::path::Path::new(&cli.config).exists() {
        let config = BotConfig::load(&cli.config)?;
        tracing::info!("loaded configuration from {}", cli.config);
        config
    } else {
        tracing::info!("no config at {}, using defaults", cli.config);
        BotConfig::default()
    };

    let db_path = config.db_path();
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let store = Arc::new(SqliteStore::open(&db_path)?);
    tracing::info!("opened session store at {}", db_path.display());

    let gw2 = Gw2Api::new(reqwest::Client::new(), &config.api);

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => run(gw2, store, &config).await,
        Command::Register { user_id, token } => {
            let key = commands::register_key(&store, &gw2, &user_id, &token).await?;
            println!(
                "registered key \"{}\" for {} on {}",
                key.name, key.account_name, key.world
            );
            Ok(())
        }
        Command::Forget { user_id } => {
            commands::forget_key(&store, &user_id)?;
            println!("key removed");
            Ok(())
        }
        Command::Account { user_id } => {
            let achievements = AchievementCache::new();
            let report = commands::account_summary(&store, &gw2, &achievements, &user_id).await?;
            print_report(&report);
            Ok(())
        }
        Command::Characters { user_id } => {
            let report = commands::character_list(&store, &gw2, &user_id).await?;
            print_report(&report);
            Ok(())
        }
        Command::Match { user_id } => {
            let report = commands::match_info(&store, &gw2, &user_id).await?;
            print_report(&report);
            Ok(())
        }
        Command::Worlds { ids } => {
            let report = commands::world_list(&gw2, &ids).await?;
            print_report(&report);
            Ok(())
        }
        Command::Report { user_id } => {
            // This tracker saw no presence events, so its playing set
            // is empty: an open session reads as "still updating"
            // here. The in-progress distinction only exists for an
            // in-process adapter that also feeds presence.
            let tracker = Tracker::new(gw2, store, LogNotifier, config.tracker.clone());
            let report = commands::session_report(&tracker, &user_id)?;
            print_report(&report);
            Ok(())
        }
        Command::Tracking { guild_id, enabled } => {
            store.set_session_tracking(&guild_id, enabled)?;
            println!(
                "session tracking {} for {guild_id}",
                if enabled { "enabled" } else { "disabled" }
            );
            Ok(())
        }
    }
}

/// The tracking loop: presence events in, sessions out.
async fn run(gw2: Gw2Api, store: Arc<SqliteStore>, config: &BotConfig) -> Result<()> {
    let tracker = Tracker::new(gw2, store, LogNotifier, config.tracker.clone());
    tracing::info!("session tracker running, reading presence events from stdin");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => match line? {
                Some(line) if line.trim().is_empty() => {}
                Some(line) => match serde_json::from_str::<PresenceUpdate>(&line) {
                    Ok(update) => tracker.handle_presence(&update),
                    Err(err) => tracing::warn!("unparseable presence event: {err}"),
                },
                None => {
                    tracing::info!("presence stream closed");
                    break;
                }
            },
            _ = signal::ctrl_c() => {
                tracing::info!("received shutdown signal");
                break;
            }
        }
    }

    let backlog = tracker.retry_backlog();
    tracker.shutdown();
    tracing::info!("tracker shut down, {backlog} background retries aborted");
    Ok(())
}

fn print_report(report: &Report) {
    println!("# {}", report.title);
    for field in &report.fields {
        if field.value.contains('\n') {
            println!("{}:", field.label);
            for line in field.value.lines() {
                println!("  {line}");
            }
        } else {
            println!("{}: {}", field.label, field.value);
        }
    }
}

//! Core types and helpers for the Tyria GW2 companion bot.
//!
//! This crate holds the domain model shared by the API client, the
//! session tracker, and the storage backend: snapshots, sessions,
//! API keys, presence events, structured reports, the [`SessionStore`]
//! trait, and the pure formatting helpers (gold, durations, rank
//! titles).

pub mod config;
pub mod format;
pub mod key;
pub mod presence;
pub mod report;
pub mod session;
pub mod snapshot;
pub mod store;

pub use config::BotConfig;
pub use key::{Permission, UserKey};
pub use presence::{Activity, ActivityKind, PresenceUpdate};
pub use report::{Field, Report};
pub use session::{CharacterSample, DeathRecord, Session};
pub use snapshot::Snapshot;
pub use store::{GuildConfig, SessionStore};

/// Chat-platform user identifier.
pub type UserId = compact_str::CompactString;

/// Chat-platform guild (community server) identifier.
pub type GuildId = compact_str::CompactString;

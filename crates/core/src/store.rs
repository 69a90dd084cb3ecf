//! Storage seam for sessions, keys, and guild configuration.
//!
//! The tracker only ever talks to [`SessionStore`]; the concrete
//! backend (SQLite in `tyria-sqlite`, or an in-memory test double)
//! lives behind this trait.

use crate::{CharacterSample, DeathRecord, GuildId, Session, Snapshot, UserKey};
use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Per-guild feature flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuildConfig {
    pub guild_id: GuildId,
    /// Whether play-session tracking is enabled for this guild.
    pub session_tracking: bool,
}

impl GuildConfig {
    /// Config for a guild with no stored row. Tracking is opt-in.
    pub fn defaults(guild_id: GuildId) -> Self {
        Self {
            guild_id,
            session_tracking: false,
        }
    }
}

/// Persistence operations the session engine requires.
///
/// Implementations may fail; callers log and carry on without
/// touching in-memory state.
pub trait SessionStore: Send + Sync {
    /// The user's registered key, if any. Exactly one per user.
    fn user_key(&self, user_id: &str) -> Result<Option<UserKey>>;

    /// Insert or atomically replace the user's key.
    fn set_user_key(&self, key: &UserKey) -> Result<()>;

    /// Delete the user's key. Returns whether a key existed.
    fn delete_user_key(&self, user_id: &str) -> Result<bool>;

    /// The user's most recent session by creation time, open or closed.
    fn last_session(&self, user_id: &str) -> Result<Option<Session>>;

    /// Create a new open session and return its id. When the user
    /// already has an open session (a duplicate start, or an end that
    /// was never observed), that session is reused: its start snapshot
    /// and death samples are replaced instead of opening a second one.
    /// A user never has more than one open session.
    fn insert_start_session(&self, user_id: &str, snapshot: &Snapshot) -> Result<i64>;

    /// Set the end snapshot on the user's open session and return its
    /// id, or `None` when no open session exists (a lost start). The
    /// store never creates a session implicitly here.
    fn update_end_session(&self, user_id: &str, snapshot: &Snapshot) -> Result<Option<i64>>;

    /// Record one character's death count for one side of a session.
    /// Idempotent per (session, character name, side).
    fn insert_death_record(
        &self,
        session_id: i64,
        sample: &CharacterSample,
        is_start: bool,
    ) -> Result<()>;

    /// Start and end samples merged by character name.
    fn death_records(&self, session_id: i64) -> Result<Vec<DeathRecord>>;

    /// Guild flags, falling back to [`GuildConfig::defaults`] when the
    /// guild has no stored row.
    fn guild_config(&self, guild_id: &str) -> Result<GuildConfig>;

    /// Toggle session tracking for a guild, creating its row if needed.
    fn set_session_tracking(&self, guild_id: &str, enabled: bool) -> Result<()>;
}

impl<T: SessionStore> SessionStore for std::sync::Arc<T> {
    fn user_key(&self, user_id: &str) -> Result<Option<UserKey>> {
        (**self).user_key(user_id)
    }

    fn set_user_key(&self, key: &UserKey) -> Result<()> {
        (**self).set_user_key(key)
    }

    fn delete_user_key(&self, user_id: &str) -> Result<bool> {
        (**self).delete_user_key(user_id)
    }

    fn last_session(&self, user_id: &str) -> Result<Option<Session>> {
        (**self).last_session(user_id)
    }

    fn insert_start_session(&self, user_id: &str, snapshot: &Snapshot) -> Result<i64> {
        (**self).insert_start_session(user_id, snapshot)
    }

    fn update_end_session(&self, user_id: &str, snapshot: &Snapshot) -> Result<Option<i64>> {
        (**self).update_end_session(user_id, snapshot)
    }

    fn insert_death_record(
        &self,
        session_id: i64,
        sample: &CharacterSample,
        is_start: bool,
    ) -> Result<()> {
        (**self).insert_death_record(session_id, sample, is_start)
    }

    fn death_records(&self, session_id: i64) -> Result<Vec<DeathRecord>> {
        (**self).death_records(session_id)
    }

    fn guild_config(&self, guild_id: &str) -> Result<GuildConfig> {
        (**self).guild_config(guild_id)
    }

    fn set_session_tracking(&self, guild_id: &str, enabled: bool) -> Result<()> {
        (**self).set_session_tracking(guild_id, enabled)
    }
}

//! SQLite-backed session store for the Tyria bot.
//!
//! Provides [`SqliteStore`], a persistent [`SessionStore`] implementation.
//! Snapshots persist as JSON columns; timestamps as RFC 3339 strings.
//!
//! All SQL lives in `sql/*.sql` files, loaded via `include_str!`.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use std::{path::Path, sync::Mutex};
use tcore::{
    CharacterSample, DeathRecord, GuildConfig, Session, SessionStore, Snapshot, UserKey,
};

const SQL_SCHEMA: &str = include_str!("../sql/schema.sql");
const SQL_SELECT_KEY: &str = include_str!("../sql/select_key.sql");
const SQL_UPSERT_KEY: &str = include_str!("../sql/upsert_key.sql");
const SQL_DELETE_KEY: &str = include_str!("../sql/delete_key.sql");
const SQL_SELECT_LAST_SESSION: &str = include_str!("../sql/select_last_session.sql");
const SQL_INSERT_SESSION: &str = include_str!("../sql/insert_session.sql");
const SQL_SELECT_OPEN_SESSION: &str = include_str!("../sql/select_open_session.sql");
const SQL_UPDATE_END_SESSION: &str = include_str!("../sql/update_end_session.sql");
const SQL_REUSE_OPEN_SESSION: &str = include_str!("../sql/reuse_open_session.sql");
const SQL_INSERT_DEATH: &str = include_str!("../sql/insert_death.sql");
const SQL_DELETE_DEATHS: &str = include_str!("../sql/delete_deaths.sql");
const SQL_SELECT_DEATHS: &str = include_str!("../sql/select_deaths.sql");
const SQL_SELECT_GUILD: &str = include_str!("../sql/select_guild.sql");
const SQL_UPSERT_GUILD: &str = include_str!("../sql/upsert_guild.sql");

/// SQLite-backed store.
///
/// Wraps a `rusqlite::Connection` in a `Mutex` for thread safety.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create a database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory database (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(SQL_SCHEMA)?;
        Ok(())
    }
}

fn decode_session(
    id: i64,
    user_id: String,
    acc_name: String,
    start: String,
    end: Option<String>,
    created_at: String,
) -> Result<Session> {
    Ok(Session {
        id,
        user_id: user_id.into(),
        account_name: acc_name,
        start: serde_json::from_str(&start).context("decoding start snapshot")?,
        end: end
            .map(|raw| serde_json::from_str(&raw))
            .transpose()
            .context("decoding end snapshot")?,
        created_at: created_at
            .parse::<DateTime<Utc>>()
            .context("parsing created_at")?,
    })
}

impl SessionStore for SqliteStore {
    fn user_key(&self, user_id: &str) -> Result<Option<UserKey>> {
        let conn = self.conn.lock().unwrap();
        let row = conn
            .query_row(SQL_SELECT_KEY, [user_id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, String>(5)?,
                ))
            })
            .optional()?;
        row.map(|(user_id, token, name, account_name, world, permissions)| {
            Ok(UserKey {
                user_id: user_id.into(),
                token,
                name,
                account_name,
                world,
                permissions: serde_json::from_str(&permissions)
                    .context("decoding key permissions")?,
            })
        })
        .transpose()
    }

    fn set_user_key(&self, key: &UserKey) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let permissions = serde_json::to_string(&key.permissions)?;
        conn.execute(
            SQL_UPSERT_KEY,
            params![
                key.user_id.as_str(),
                key.token,
                key.name,
                key.account_name,
                key.world,
                permissions
            ],
        )?;
        Ok(())
    }

    fn delete_user_key(&self, user_id: &str) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let deleted = conn.execute(SQL_DELETE_KEY, [user_id])?;
        Ok(deleted > 0)
    }

    fn last_session(&self, user_id: &str) -> Result<Option<Session>> {
        let conn = self.conn.lock().unwrap();
        let row = conn
            .query_row(SQL_SELECT_LAST_SESSION, [user_id], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, Option<String>>(4)?,
                    row.get::<_, String>(5)?,
                ))
            })
            .optional()?;
        row.map(|(id, user_id, acc_name, start, end, created_at)| {
            decode_session(id, user_id, acc_name, start, end, created_at)
        })
        .transpose()
    }

    fn insert_start_session(&self, user_id: &str, snapshot: &Snapshot) -> Result<i64> {
        let conn = self.conn.lock().unwrap();
        let start = serde_json::to_string(snapshot)?;
        let now = Utc::now().to_rfc3339();

        // A still-open session (duplicate start, or an end the bot
        // never saw) is reused so a user has at most one open session.
        let open: Option<i64> = conn
            .query_row(SQL_SELECT_OPEN_SESSION, [user_id], |row| row.get(0))
            .optional()?;
        if let Some(session_id) = open {
            conn.execute(
                SQL_REUSE_OPEN_SESSION,
                params![session_id, snapshot.account_name, start, now],
            )?;
            conn.execute(SQL_DELETE_DEATHS, [session_id])?;
            return Ok(session_id);
        }

        conn.execute(
            SQL_INSERT_SESSION,
            params![user_id, snapshot.account_name, start, now],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn update_end_session(&self, user_id: &str, snapshot: &Snapshot) -> Result<Option<i64>> {
        let conn = self.conn.lock().unwrap();
        let open: Option<i64> = conn
            .query_row(SQL_SELECT_OPEN_SESSION, [user_id], |row| row.get(0))
            .optional()?;
        let Some(session_id) = open else {
            return Ok(None);
        };
        let end = serde_json::to_string(snapshot)?;
        conn.execute(SQL_UPDATE_END_SESSION, params![session_id, end])?;
        Ok(Some(session_id))
    }

    fn insert_death_record(
        &self,
        session_id: i64,
        sample: &CharacterSample,
        is_start: bool,
    ) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            SQL_INSERT_DEATH,
            params![
                session_id,
                sample.name,
                sample.profession,
                is_start,
                sample.deaths
            ],
        )?;
        Ok(())
    }

    fn death_records(&self, session_id: i64) -> Result<Vec<DeathRecord>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(SQL_SELECT_DEATHS)?;
        let rows = stmt.query_map([session_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, bool>(2)?,
                row.get::<_, i64>(3)?,
            ))
        })?;

        // Rows arrive ordered by character name; fold the start and
        // end samples of each character into one record.
        let mut records: Vec<DeathRecord> = Vec::new();
        for row in rows {
            let (name, profession, is_start, deaths) = row?;
            match records.last_mut() {
                Some(record) if record.name == name => {
                    if is_start {
                        record.start = Some(deaths);
                    } else {
                        record.end = Some(deaths);
                    }
                }
                _ => records.push(DeathRecord {
                    name,
                    profession,
                    start: is_start.then_some(deaths),
                    end: (!is_start).then_some(deaths),
                }),
            }
        }
        Ok(records)
    }

    fn guild_config(&self, guild_id: &str) -> Result<GuildConfig> {
        let conn = self.conn.lock().unwrap();
        let row = conn
            .query_row(SQL_SELECT_GUILD, [guild_id], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, bool>(1)?))
            })
            .optional()?;
        Ok(match row {
            Some((guild_id, session_tracking)) => GuildConfig {
                guild_id: guild_id.into(),
                session_tracking,
            },
            None => GuildConfig::defaults(guild_id.into()),
        })
    }

    fn set_session_tracking(&self, guild_id: &str, enabled: bool) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(SQL_UPSERT_GUILD, params![guild_id, enabled])?;
        Ok(())
    }
}

//! Per-user session state machine.
//!
//! One worker runs per user at a time. While it runs, later events for
//! that user land in a single pending slot: a repeat of the same
//! action coalesces, an opposite action replaces it and executes once
//! the current transition resolves. Different users proceed in
//! parallel.

use crate::{
    Notifier, SnapshotSource,
    detector::{Transition, detect_transition},
    report::render_session,
    retry::RetrySet,
};
use parking_lot::Mutex;
use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
    time::Duration,
};
use tcore::{
    GuildId, PresenceUpdate, Report, SessionStore, Snapshot, UserId, config::TrackerConfig,
};
use thiserror::Error;

/// Why a session report could not be produced.
#[derive(Debug, Error)]
pub enum ReportError {
    /// The user never registered an API key.
    #[error("no API key registered")]
    NoKey,
    /// The user has no recorded sessions.
    #[error("no sessions recorded")]
    NoSession,
    /// The newest session is open and the user is still playing.
    #[error("session in progress")]
    InProgress,
    /// The newest session is open but the user stopped playing; the
    /// background retry is still working on the end snapshot.
    #[error("session still updating")]
    StillUpdating,
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

/// The session tracking engine. Cheap to clone.
pub struct Tracker<C, S, N> {
    inner: Arc<Inner<C, S, N>>,
}

impl<C, S, N> Clone for Tracker<C, S, N> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

struct Inner<C, S, N> {
    source: C,
    store: S,
    notifier: N,
    config: TrackerConfig,
    /// user -> pending slot. Presence of a key means a worker owns
    /// that user; the slot holds at most one deferred action.
    pending: Mutex<HashMap<UserId, Option<Transition>>>,
    /// Users currently detected in-game.
    playing: Mutex<HashSet<UserId>>,
    retries: RetrySet,
}

impl<C, S, N> Tracker<C, S, N>
where
    C: SnapshotSource,
    S: SessionStore + 'static,
    N: Notifier,
{
    pub fn new(source: C, store: S, notifier: N, config: TrackerConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                source,
                store,
                notifier,
                config,
                pending: Mutex::new(HashMap::new()),
                playing: Mutex::new(HashSet::new()),
                retries: RetrySet::new(),
            }),
        }
    }

    /// Feed a raw presence change through the detector and, when it
    /// yields a transition, hand it to the per-user worker.
    pub fn handle_presence(&self, update: &PresenceUpdate) {
        let Some(transition) = detect_transition(&update.before, &update.after) else {
            return;
        };
        {
            let mut playing = self.inner.playing.lock();
            match transition {
                Transition::Start => playing.insert(update.user_id.clone()),
                Transition::End => playing.remove(&update.user_id),
            };
        }
        self.submit(
            update.user_id.clone(),
            update.guild_id.clone(),
            transition,
        );
    }

    /// Whether the user is currently detected in-game.
    pub fn is_playing(&self, user_id: &str) -> bool {
        self.inner.playing.lock().contains(user_id)
    }

    /// In-flight background retry count. Mostly for tests and metrics.
    pub fn retry_backlog(&self) -> usize {
        self.inner.retries.len()
    }

    /// Hand a transition to the user's worker, starting one if the
    /// user has none.
    pub fn submit(&self, user_id: UserId, guild_id: GuildId, transition: Transition) {
        {
            let mut pending = self.inner.pending.lock();
            if let Some(slot) = pending.get_mut(&user_id) {
                // A worker owns this user: park the action. Same
                // action coalesces, a flip replaces the earlier flip.
                *slot = Some(transition);
                return;
            }
            pending.insert(user_id.clone(), None);
        }

        let inner = self.inner.clone();
        tokio::spawn(async move {
            let mut action = transition;
            loop {
                inner.execute(&user_id, &guild_id, action).await;
                let next = {
                    let mut pending = inner.pending.lock();
                    match pending.get_mut(&user_id).and_then(Option::take) {
                        Some(next) => Some(next),
                        None => {
                            // Removal happens under the same lock an
                            // arriving event takes, so no event can
                            // slip between the check and the removal.
                            pending.remove(&user_id);
                            None
                        }
                    }
                };
                match next {
                    Some(next) => action = next,
                    None => break,
                }
            }
        });
    }

    /// Produce the diff report for the user's newest session.
    pub fn session_report(&self, user_id: &str) -> Result<Report, ReportError> {
        let key = self
            .inner
            .store
            .user_key(user_id)?
            .ok_or(ReportError::NoKey)?;
        let session = self
            .inner
            .store
            .last_session(user_id)?
            .ok_or(ReportError::NoSession)?;
        let Some(end) = &session.end else {
            return Err(if self.is_playing(user_id) {
                ReportError::InProgress
            } else {
                ReportError::StillUpdating
            });
        };
        let deaths = self.inner.store.death_records(session.id)?;
        Ok(render_session(&session.start, end, &deaths, &key.world))
    }

    /// Abort outstanding background retries. Their final-failure DM
    /// path never runs.
    pub fn shutdown(&self) {
        self.inner.retries.abort_all();
    }
}

impl<C, S, N> Inner<C, S, N>
where
    C: SnapshotSource,
    S: SessionStore + 'static,
    N: Notifier,
{
    async fn execute(self: &Arc<Self>, user_id: &str, guild_id: &str, action: Transition) {
        let config = match self.store.guild_config(guild_id) {
            Ok(config) => config,
            Err(err) => {
                tracing::warn!("guild config for {guild_id} unavailable: {err:#}");
                return;
            }
        };
        if !config.session_tracking {
            return;
        }

        let key = match self.store.user_key(user_id) {
            Ok(Some(key)) => key,
            Ok(None) => return,
            Err(err) => {
                tracing::warn!("key lookup for {user_id} failed: {err:#}");
                return;
            }
        };

        match self.source.snapshot(&key.token).await {
            Ok(mut snapshot) => {
                snapshot.stamp();
                self.persist(user_id, action, &snapshot, &key.token).await;
            }
            Err(err) => {
                tracing::warn!("snapshot for {user_id} failed ({err}), scheduling retry");
                self.schedule_retry(user_id.into(), action, key.token);
            }
        }
    }

    /// The DB writes for a resolved transition. Shared by the worker
    /// and the background retry.
    async fn persist(&self, user_id: &str, action: Transition, snapshot: &Snapshot, token: &str) {
        let session_id = match action {
            Transition::Start => match self.store.insert_start_session(user_id, snapshot) {
                Ok(id) => id,
                Err(err) => {
                    tracing::error!("storing start session for {user_id} failed: {err:#}");
                    return;
                }
            },
            Transition::End => match self.store.update_end_session(user_id, snapshot) {
                Ok(Some(id)) => id,
                Ok(None) => {
                    tracing::warn!("no open session for {user_id}; end snapshot dropped");
                    return;
                }
                Err(err) => {
                    tracing::error!("storing end session for {user_id} failed: {err:#}");
                    return;
                }
            },
        };

        // Death sampling is best-effort; the session itself is safe.
        let is_start = action == Transition::Start;
        match self.source.character_deaths(token).await {
            Ok(samples) => {
                for sample in &samples {
                    if let Err(err) = self.store.insert_death_record(session_id, sample, is_start) {
                        tracing::warn!("death record for {} failed: {err:#}", sample.name);
                    }
                }
            }
            Err(err) => {
                tracing::warn!("character sampling for {user_id} failed: {err}");
            }
        }
    }

    /// Keep re-attempting the snapshot in the background; on final
    /// failure, tell the user their session record may be incomplete.
    fn schedule_retry(self: &Arc<Self>, user_id: UserId, action: Transition, token: String) {
        let inner = self.clone();
        let delay = Duration::from_secs(self.config.background_retry_delay_secs);
        let max_attempts = self.config.background_max_attempts.max(1);
        self.retries.spawn(async move {
            let mut attempt = 0;
            loop {
                attempt += 1;
                tokio::time::sleep(delay).await;
                match inner.source.snapshot(&token).await {
                    Ok(mut snapshot) => {
                        snapshot.stamp();
                        inner.persist(&user_id, action, &snapshot, &token).await;
                        return;
                    }
                    Err(err) if attempt < max_attempts => {
                        tracing::debug!("retry {attempt} for {user_id} failed: {err}");
                    }
                    Err(err) => {
                        tracing::error!(
                            "giving up on {user_id} snapshot after {attempt} attempts: {err}"
                        );
                        // The user may have DMs disabled; a failed
                        // notification is swallowed.
                        let _ = inner
                            .notifier
                            .direct_message(
                                &user_id,
                                "The GW2 API was unreachable for a while; \
                                 your play session record may be incomplete.",
                            )
                            .await;
                        return;
                    }
                }
            }
        });
    }
}

//! Presence-driven play-session tracking.
//!
//! The engine watches presence transitions, snapshots the player's
//! GW2 account state at session start and end, persists both sides,
//! and renders the diff on demand. Outages of the GW2 API are absorbed
//! by background retries.

pub mod coordinator;
pub mod detector;
pub mod report;
mod retry;

pub use coordinator::{ReportError, Tracker};
pub use detector::{Transition, detect_transition};
pub use report::render_session;

use api::{Gw2Api, Gw2Error};
use tcore::{CharacterSample, Snapshot};

/// Where the tracker gets its snapshots. Implemented by [`Gw2Api`];
/// tests substitute a scripted double.
pub trait SnapshotSource: Send + Sync + 'static {
    /// A full account snapshot, or a classified failure.
    fn snapshot(&self, token: &str)
    -> impl Future<Output = Result<Snapshot, Gw2Error>> + Send;

    /// Per-character death counters.
    fn character_deaths(
        &self,
        token: &str,
    ) -> impl Future<Output = Result<Vec<CharacterSample>, Gw2Error>> + Send;
}

impl SnapshotSource for Gw2Api {
    async fn snapshot(&self, token: &str) -> Result<Snapshot, Gw2Error> {
        self.collect_snapshot(token).await
    }

    async fn character_deaths(&self, token: &str) -> Result<Vec<CharacterSample>, Gw2Error> {
        self.collect_character_deaths(token).await
    }
}

/// Outbound direct messages, used only for final retry failures.
pub trait Notifier: Send + Sync + 'static {
    fn direct_message(
        &self,
        user_id: &str,
        text: &str,
    ) -> impl Future<Output = anyhow::Result<()>> + Send;
}

/// Notifier that only logs; used when the chat adapter offers no DM
/// channel.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    async fn direct_message(&self, user_id: &str, text: &str) -> anyhow::Result<()> {
        tracing::info!("dm to {user_id}: {text}");
        Ok(())
    }
}

//! Presence events from the chat platform.
//!
//! The chat adapter translates its native presence payloads into
//! [`PresenceUpdate`] values; the session tracker derives play
//! start/stop transitions from them.

use crate::{GuildId, UserId};
use serde::{Deserialize, Serialize};

/// What kind of activity a presence element describes.
///
/// `Custom` is a user-set status text and never counts as playing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityKind {
    Playing,
    Streaming,
    Listening,
    Watching,
    Competing,
    Custom,
}

/// One activity in a user's presence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activity {
    pub kind: ActivityKind,
    /// Application or status name, e.g. `Guild Wars 2`.
    pub name: String,
}

impl Activity {
    pub fn new(kind: ActivityKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }
}

/// A raw presence change: the activity lists before and after.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresenceUpdate {
    pub user_id: UserId,
    pub guild_id: GuildId,
    #[serde(default)]
    pub before: Vec<Activity>,
    #[serde(default)]
    pub after: Vec<Activity>,
}

/// The first non-custom activity in a list, if any.
pub fn primary_activity(activities: &[Activity]) -> Option<&Activity> {
    activities.iter().find(|a| a.kind != ActivityKind::Custom)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primary_skips_custom_status() {
        let activities = vec![
            Activity::new(ActivityKind::Custom, "afk, brb"),
            Activity::new(ActivityKind::Playing, "Guild Wars 2"),
        ];
        let primary = primary_activity(&activities).unwrap();
        assert_eq!(primary.name, "Guild Wars 2");
    }

    #[test]
    fn update_decodes_from_json_line() {
        let line = r#"{"user_id":"u1","guild_id":"g1","after":[{"kind":"playing","name":"Guild Wars 2"}]}"#;
        let update: PresenceUpdate = serde_json::from_str(line).unwrap();
        assert!(update.before.is_empty());
        assert_eq!(update.after[0].kind, ActivityKind::Playing);
    }

    #[test]
    fn primary_none_when_only_custom() {
        let activities = vec![Activity::new(ActivityKind::Custom, "afk")];
        assert!(primary_activity(&activities).is_none());
        assert!(primary_activity(&[]).is_none());
    }
}

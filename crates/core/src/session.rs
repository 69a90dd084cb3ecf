//! Play sessions and per-character death samples.

use crate::{Snapshot, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One play episode: a start snapshot and, once the user stops
/// playing, an end snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Store-assigned session id.
    pub id: i64,
    /// User the session belongs to.
    pub user_id: UserId,
    /// GW2 account name at session start.
    pub account_name: String,
    /// State when the user started playing.
    pub start: Snapshot,
    /// State when the user stopped playing; `None` while the session
    /// is still open.
    pub end: Option<Snapshot>,
    /// When the session row was created.
    pub created_at: DateTime<Utc>,
}

impl Session {
    /// Whether the session has no end snapshot yet.
    pub fn is_open(&self) -> bool {
        self.end.is_none()
    }
}

/// A character's death counter sampled at one end of a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterSample {
    /// Character name, unique per account.
    pub name: String,
    /// Profession, e.g. `Engineer`.
    pub profession: String,
    /// Lifetime death count at sampling time.
    pub deaths: i64,
}

/// Start and end death counts for one character, merged by name.
///
/// Either side may be missing: the character may have been created or
/// deleted mid-session, or one sampling pass may have failed.
#[derive(Debug, Clone, PartialEq)]
pub struct DeathRecord {
    pub name: String,
    pub profession: String,
    pub start: Option<i64>,
    pub end: Option<i64>,
}

impl DeathRecord {
    /// Deaths during the session, when both samples exist and differ.
    pub fn delta(&self) -> Option<i64> {
        match (self.start, self.end) {
            (Some(s), Some(e)) if e != s => Some(e - s),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(start: Option<i64>, end: Option<i64>) -> DeathRecord {
        DeathRecord {
            name: "Rifle Jack".into(),
            profession: "Engineer".into(),
            start,
            end,
        }
    }

    #[test]
    fn delta_requires_both_sides() {
        assert_eq!(record(Some(3), Some(7)).delta(), Some(4));
        assert_eq!(record(Some(3), Some(3)).delta(), None);
        assert_eq!(record(None, Some(7)).delta(), None);
        assert_eq!(record(Some(3), None).delta(), None);
    }
}

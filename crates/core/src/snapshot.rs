//! Point-in-time capture of a user's GW2 account state.
//!
//! A [`Snapshot`] is taken when a play session starts and again when it
//! ends. The wallet and achievement maps are always fully populated:
//! every key from the compile-time tables is present, with 0 for
//! anything the API omitted. The diff renderer relies on that.

use chrono::{DateTime, Utc};
use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// GW2 currency id -> wallet key.
///
/// Gold (id 1) is stored in copper: 1 gold = 100 silver = 10000 copper.
pub const WALLET_IDS: &[(u32, &str)] = &[
    (1, "gold"),
    (2, "karma"),
    (3, "laurels"),
    (4, "gems"),
    (15, "badges_honor"),
    (16, "guild_commendations"),
    (18, "transmutation_charges"),
    (23, "spirit_shards"),
    (26, "wvw_tickets"),
    (31, "proof_heroics"),
    (32, "unbound_magic"),
    (36, "test_heroics"),
    (45, "volatile_magic"),
];

/// WvW achievement id -> stat key.
pub const ACHIEVEMENT_IDS: &[(u32, &str)] = &[
    (283, "players"),
    (285, "yaks_scorted"),
    (288, "yaks"),
    (291, "camps"),
    (294, "castles"),
    (297, "towers"),
    (300, "keeps"),
];

/// Display names for wallet and achievement keys, used by the renderer.
pub const DISPLAY_NAMES: &[(&str, &str)] = &[
    ("gold", "Gold"),
    ("karma", "Karma"),
    ("laurels", "Laurels"),
    ("gems", "Gems"),
    ("badges_honor", "Badges of Honor"),
    ("guild_commendations", "Guild Commendations"),
    ("transmutation_charges", "Transmutation Charges"),
    ("spirit_shards", "Spirit Shards"),
    ("wvw_tickets", "WvW Skirmish Claim Tickets"),
    ("proof_heroics", "Proofs of Heroics"),
    ("test_heroics", "Testimonies of Heroics"),
    ("unbound_magic", "Unbound Magic"),
    ("volatile_magic", "Volatile Magic"),
    ("players", "Players Killed"),
    ("yaks_scorted", "Yaks Escorted"),
    ("yaks", "Yaks Killed"),
    ("camps", "Camps Captured"),
    ("castles", "Castles Captured"),
    ("towers", "Towers Captured"),
    ("keeps", "Keeps Captured"),
];

/// Look up the wallet key for a GW2 currency id.
pub fn wallet_key(id: u32) -> Option<&'static str> {
    WALLET_IDS.iter().find(|(i, _)| *i == id).map(|(_, k)| *k)
}

/// Look up the stat key for a WvW achievement id.
pub fn achievement_key(id: u32) -> Option<&'static str> {
    ACHIEVEMENT_IDS
        .iter()
        .find(|(i, _)| *i == id)
        .map(|(_, k)| *k)
}

/// Human-readable label for a wallet or achievement key.
///
/// Falls back to the key itself for anything outside the tables.
pub fn display_name(key: &str) -> &str {
    DISPLAY_NAMES
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, n)| *n)
        .unwrap_or(key)
}

/// A complete point-in-time view of a user's GW2 state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// GW2 account name, e.g. `Ruler.1234`.
    pub account_name: String,
    /// Account age in minutes, as reported by the API.
    pub age_minutes: i64,
    /// Current WvW rank.
    pub wvw_rank: i64,
    /// Wall-clock UTC time the snapshot was stamped.
    pub timestamp: DateTime<Utc>,
    /// Currency-key -> balance, fully populated from [`WALLET_IDS`].
    pub wallet: BTreeMap<CompactString, i64>,
    /// Stat-key -> current count, fully populated from [`ACHIEVEMENT_IDS`].
    pub achievements: BTreeMap<CompactString, i64>,
}

impl Snapshot {
    /// Create a snapshot with every wallet and achievement key zeroed.
    pub fn zeroed(account_name: impl Into<String>) -> Self {
        let wallet = WALLET_IDS
            .iter()
            .map(|(_, k)| (CompactString::const_new(k), 0))
            .collect();
        let achievements = ACHIEVEMENT_IDS
            .iter()
            .map(|(_, k)| (CompactString::const_new(k), 0))
            .collect();
        Self {
            account_name: account_name.into(),
            age_minutes: 0,
            wvw_rank: 0,
            timestamp: Utc::now(),
            wallet,
            achievements,
        }
    }

    /// Stamp the snapshot with the current UTC time.
    pub fn stamp(&mut self) {
        self.timestamp = Utc::now();
    }
}

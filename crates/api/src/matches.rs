//! WvW match statistics.

use crate::{Gw2Api, error::Gw2Error};
use serde::Deserialize;
use serde_json::Value;

/// Per-colour values in a match (scores, kills, deaths).
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
pub struct SideStats {
    #[serde(default)]
    pub red: i64,
    #[serde(default)]
    pub blue: i64,
    #[serde(default)]
    pub green: i64,
}

/// Per-colour world/team assignment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
pub struct SideWorlds {
    #[serde(default)]
    pub red: u32,
    #[serde(default)]
    pub blue: u32,
    #[serde(default)]
    pub green: u32,
}

/// A decoded `wvw/matches` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct WvwMatch {
    pub id: String,
    #[serde(default)]
    pub scores: SideStats,
    #[serde(default)]
    pub kills: SideStats,
    #[serde(default)]
    pub deaths: SideStats,
    #[serde(default)]
    pub worlds: SideWorlds,
}

impl WvwMatch {
    /// Kill/death ratio for one colour, 2 decimal places.
    pub fn kd(&self, kills: i64, deaths: i64) -> f64 {
        if deaths == 0 {
            kills as f64
        } else {
            (kills as f64 / deaths as f64 * 100.0).round() / 100.0
        }
    }
}

impl Gw2Api {
    /// The current match for a world or WR team id.
    pub async fn wvw_match(&self, world_id: u32) -> Result<WvwMatch, Gw2Error> {
        let value = self
            .call(&format!("wvw/matches?world={world_id}"), None)
            .await?;
        // The world filter yields a single object, but older mirrors
        // return a one-element array.
        let entry: Value = match value {
            Value::Array(mut entries) if !entries.is_empty() => entries.remove(0),
            other => other,
        };
        serde_json::from_value(entry).map_err(|err| Gw2Error::Key(format!("match decode: {err}")))
    }
}

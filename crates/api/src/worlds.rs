//! World-name resolution, including World-Restructuring teams.
//!
//! Legacy world ids resolve via `worlds?ids=...`. WR team ids
//! (11xxx NA, 12xxx EU) are not served by that endpoint and resolve
//! from a static table, with `"Team {id}"` for ids in range the
//! table does not know.

use crate::{Gw2Api, error::Gw2Error};
use serde_json::Value;
use std::collections::HashMap;

/// World-Restructuring team names, NA then EU.
const WR_TEAMS: &[(u32, &str)] = &[
    // NA (11001..=11012)
    (11001, "Moogooloo"),
    (11002, "Rall's Rest"),
    (11003, "Domain of Torment"),
    (11004, "Yohlon Haven"),
    (11005, "Tombs of Drascir"),
    (11006, "Hall of Judgment"),
    (11007, "Throne of Balthazar"),
    (11008, "Dwayna's Temple"),
    (11009, "Abaddon's Prison"),
    (11010, "Cathedral of Blood"),
    (11011, "Lutgardis Conservatory"),
    (11012, "Mosswood"),
    // EU (12001..=12015)
    (12001, "Skrittsburgh"),
    (12002, "Fortune's Vale"),
    (12003, "Silent Woods"),
    (12004, "Ettin's Back"),
    (12005, "Domain of Anguish"),
    (12006, "Palawadan"),
    (12007, "Bloodstone Gulch"),
    (12008, "Frost Citadel"),
    (12009, "Dragrimmar"),
    (12010, "Grenth's Door"),
    (12011, "Mirror of Lyssa"),
    (12012, "Melandru's Dome"),
    (12013, "Kormir's Library"),
    (12014, "Great House Aviary"),
    (12015, "Bava Nisos"),
];

/// Whether an id falls in the WR team ranges.
pub fn is_wr_team(id: u32) -> bool {
    (11001..=11012).contains(&id) || (12001..=12015).contains(&id)
}

/// Name for a WR team id, `"Team {id}"` for unknown ids in range.
pub fn wr_team_name(id: u32) -> String {
    WR_TEAMS
        .iter()
        .find(|(i, _)| *i == id)
        .map(|(_, name)| name.to_string())
        .unwrap_or_else(|| format!("Team {id}"))
}

impl Gw2Api {
    /// Resolve world/team ids to names, preserving input order.
    ///
    /// Legacy ids go to the API in one batch; WR team ids come from
    /// the static table. Legacy ids the API does not return resolve
    /// to `"Unknown"`.
    pub async fn world_names(&self, ids: &[u32]) -> Result<Vec<String>, Gw2Error> {
        let legacy: Vec<u32> = ids.iter().copied().filter(|id| !is_wr_team(*id)).collect();

        let mut api_names: HashMap<u32, String> = HashMap::new();
        if !legacy.is_empty() {
            let joined = legacy
                .iter()
                .map(u32::to_string)
                .collect::<Vec<_>>()
                .join(",");
            let worlds = self.call(&format!("worlds?ids={joined}"), None).await?;
            for world in worlds.as_array().into_iter().flatten() {
                let (Some(id), Some(name)) = (
                    world.get("id").and_then(Value::as_u64),
                    world.get("name").and_then(Value::as_str),
                ) else {
                    continue;
                };
                api_names.insert(id as u32, name.to_owned());
            }
        }

        Ok(ids
            .iter()
            .map(|id| {
                if is_wr_team(*id) {
                    wr_team_name(*id)
                } else {
                    api_names
                        .get(id)
                        .cloned()
                        .unwrap_or_else(|| "Unknown".into())
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wr_ranges() {
        assert!(is_wr_team(11001));
        assert!(is_wr_team(11012));
        assert!(is_wr_team(12015));
        assert!(!is_wr_team(11013));
        assert!(!is_wr_team(12016));
        assert!(!is_wr_team(2006));
    }

    #[test]
    fn wr_names_with_fallback() {
        assert_eq!(wr_team_name(11001), "Moogooloo");
        assert_eq!(wr_team_name(12001), "Skrittsburgh");
        // In range but absent from the table.
        assert_eq!(wr_team_name(11999), "Team 11999");
    }
}

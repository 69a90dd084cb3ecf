//! Account, PvP, and guild lookups for the account command.

use crate::{Gw2Api, error::Gw2Error};
use serde::Deserialize;
use serde_json::Value;

/// Decoded `account` response fields the bot cares about.
#[derive(Debug, Clone, Deserialize)]
pub struct AccountInfo {
    pub name: String,
    pub world: u32,
    /// Account age in minutes.
    #[serde(default)]
    pub age: i64,
    #[serde(default)]
    pub created: String,
    #[serde(default)]
    pub guilds: Vec<String>,
    #[serde(default)]
    pub fractal_level: i64,
}

/// Decoded `pvp/stats` summary.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PvpStats {
    #[serde(default)]
    pub pvp_rank: i64,
    #[serde(default)]
    pub pvp_rank_rollovers: i64,
}

impl PvpStats {
    /// Effective rank including rollovers past 80.
    pub fn effective_rank(&self) -> i64 {
        self.pvp_rank + self.pvp_rank_rollovers
    }
}

impl Gw2Api {
    /// The account behind a token, plus its WvW rank.
    pub async fn account(&self, token: &str) -> Result<(AccountInfo, i64), Gw2Error> {
        let value = self.call("account", Some(token)).await?;
        let rank = value
            .get("wvw")
            .and_then(|wvw| wvw.get("rank"))
            .and_then(Value::as_i64)
            .or_else(|| value.get("wvw_rank").and_then(Value::as_i64))
            .unwrap_or(0);
        let info = serde_json::from_value(value)
            .map_err(|err| Gw2Error::Key(format!("account decode: {err}")))?;
        Ok((info, rank))
    }

    /// PvP statistics; requires the `pvp` scope.
    pub async fn pvp_stats(&self, token: &str) -> Result<PvpStats, Gw2Error> {
        let value = self.call("pvp/stats", Some(token)).await?;
        serde_json::from_value(value).map_err(|err| Gw2Error::Key(format!("pvp decode: {err}")))
    }

    /// A guild's name and tag; requires the `guilds` scope.
    pub async fn guild_name(&self, guild_id: &str, token: &str) -> Result<String, Gw2Error> {
        let value = self.call(&format!("guild/{guild_id}"), Some(token)).await?;
        let name = value.get("name").and_then(Value::as_str).unwrap_or("?");
        let tag = value.get("tag").and_then(Value::as_str).unwrap_or("");
        Ok(if tag.is_empty() {
            name.to_owned()
        } else {
            format!("{name} [{tag}]")
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn account_decodes_with_defaults() {
        let value = json!({"name": "Ruler.1234", "world": 2006});
        let info: AccountInfo = serde_json::from_value(value).unwrap();
        assert_eq!(info.name, "Ruler.1234");
        assert_eq!(info.world, 2006);
        assert_eq!(info.age, 0);
        assert!(info.guilds.is_empty());
    }

    #[test]
    fn pvp_effective_rank_includes_rollovers() {
        let stats = PvpStats {
            pvp_rank: 80,
            pvp_rank_rollovers: 120,
        };
        assert_eq!(stats.effective_rank(), 200);
    }
}

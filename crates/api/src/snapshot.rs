//! Snapshot collection: fan-out across account, wallet, and
//! achievement endpoints.

use crate::{Gw2Api, error::Gw2Error};
use serde_json::Value;
use tcore::{
    CharacterSample, Snapshot,
    snapshot::{ACHIEVEMENT_IDS, achievement_key, wallet_key},
};

impl Gw2Api {
    /// Build a complete [`Snapshot`] with three concurrent requests.
    ///
    /// Any individual failure fails the whole snapshot; partial
    /// collection is never returned. Keys the endpoints omitted stay
    /// at 0, so the result is always fully populated.
    pub async fn collect_snapshot(&self, token: &str) -> Result<Snapshot, Gw2Error> {
        let achievement_ids = ACHIEVEMENT_IDS
            .iter()
            .map(|(id, _)| id.to_string())
            .collect::<Vec<_>>()
            .join(",");
        let achievements_path = format!("account/achievements?ids={achievement_ids}");
        let (account, wallet, achievements) = tokio::try_join!(
            self.call("account", Some(token)),
            self.call("account/wallet", Some(token)),
            self.call(&achievements_path, Some(token)),
        )?;

        let name = account
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| Gw2Error::Key("account response missing name".into()))?;

        let mut snapshot = Snapshot::zeroed(name);
        snapshot.age_minutes = account.get("age").and_then(Value::as_i64).unwrap_or(0);
        snapshot.wvw_rank = wvw_rank(&account);

        for entry in wallet.as_array().into_iter().flatten() {
            let Some(id) = entry.get("id").and_then(Value::as_u64) else {
                continue;
            };
            let Some(key) = wallet_key(id as u32) else {
                continue;
            };
            let value = entry.get("value").and_then(Value::as_i64).unwrap_or(0);
            snapshot.wallet.insert(key.into(), value);
        }

        for entry in achievements.as_array().into_iter().flatten() {
            let Some(id) = entry.get("id").and_then(Value::as_u64) else {
                continue;
            };
            let Some(key) = achievement_key(id as u32) else {
                continue;
            };
            let current = entry.get("current").and_then(Value::as_i64).unwrap_or(0);
            snapshot.achievements.insert(key.into(), current);
        }

        Ok(snapshot)
    }

    /// Sample every character's lifetime death counter.
    ///
    /// Ordering is whatever the API returns; the store deduplicates
    /// on insert.
    pub async fn collect_character_deaths(
        &self,
        token: &str,
    ) -> Result<Vec<CharacterSample>, Gw2Error> {
        let characters = self.call("characters?ids=all", Some(token)).await?;
        let samples = characters
            .as_array()
            .into_iter()
            .flatten()
            .filter_map(|c| {
                Some(CharacterSample {
                    name: c.get("name")?.as_str()?.to_owned(),
                    profession: c
                        .get("profession")
                        .and_then(Value::as_str)
                        .unwrap_or("Unknown")
                        .to_owned(),
                    deaths: c.get("deaths").and_then(Value::as_i64).unwrap_or(0),
                })
            })
            .collect();
        Ok(samples)
    }
}

/// WvW rank from an account payload: prefer the nested `wvw.rank`
/// field, fall back to legacy `wvw_rank`, default 0.
fn wvw_rank(account: &Value) -> i64 {
    account
        .get("wvw")
        .and_then(|wvw| wvw.get("rank"))
        .and_then(Value::as_i64)
        .or_else(|| account.get("wvw_rank").and_then(Value::as_i64))
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn wvw_rank_prefers_nested_field() {
        let account = json!({"wvw": {"rank": 512}, "wvw_rank": 100});
        assert_eq!(wvw_rank(&account), 512);
    }

    #[test]
    fn wvw_rank_falls_back_to_legacy() {
        let account = json!({"wvw_rank": 100});
        assert_eq!(wvw_rank(&account), 100);
        assert_eq!(wvw_rank(&json!({})), 0);
        // Nested object without a rank still falls through.
        assert_eq!(wvw_rank(&json!({"wvw": {}, "wvw_rank": 7})), 7);
    }
}

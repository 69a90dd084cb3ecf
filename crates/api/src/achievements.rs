//! Achievement definitions and achievement-point totals.
//!
//! Definitions are effectively immutable game data, so they live in a
//! process-wide read-through cache and are never evicted. Misses are
//! fetched in batches of 200 ids with at most 5 batches in flight.

use crate::{Gw2Api, error::Gw2Error};
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::Value;
use std::{collections::HashMap, sync::Arc};
use tokio::sync::Semaphore;

/// Ids per `achievements?ids=` request.
const BATCH_SIZE: usize = 200;
/// In-flight batch cap.
const MAX_IN_FLIGHT: usize = 5;

/// One reward tier of an achievement.
#[derive(Debug, Clone, Deserialize)]
pub struct Tier {
    pub count: i64,
    pub points: i64,
}

/// Decoded achievement definition.
#[derive(Debug, Clone, Deserialize)]
pub struct AchievementDef {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub tiers: Vec<Tier>,
    /// Point cap for repeatable achievements; `-1` means uncapped.
    #[serde(default)]
    pub point_cap: Option<i64>,
}

impl AchievementDef {
    /// Points across all tiers, i.e. one full completion.
    pub fn total_points(&self) -> i64 {
        self.tiers.iter().map(|t| t.points).sum()
    }

    /// Points earned given account progress on this achievement.
    pub fn earned_points(&self, current: i64, done: bool, repeated: i64) -> i64 {
        let total = self.total_points();
        let base = if done {
            total
        } else {
            self.tiers
                .iter()
                .filter(|t| current >= t.count)
                .map(|t| t.points)
                .sum()
        };
        let mut points = base + repeated * total;
        if let Some(cap) = self.point_cap
            && cap >= 0
        {
            points = points.min(cap);
        }
        points
    }
}

/// Process-wide read-through cache of achievement definitions.
#[derive(Clone, Default)]
pub struct AchievementCache {
    defs: Arc<Mutex<HashMap<u64, AchievementDef>>>,
}

impl AchievementCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Definitions for the given ids, fetching anything not cached.
    ///
    /// Ids the API does not know are simply absent from the result.
    pub async fn definitions(
        &self,
        api: &Gw2Api,
        ids: &[u64],
    ) -> Result<HashMap<u64, AchievementDef>, Gw2Error> {
        let missing: Vec<u64> = {
            let cached = self.defs.lock();
            ids.iter()
                .copied()
                .filter(|id| !cached.contains_key(id))
                .collect()
        };

        if !missing.is_empty() {
            let semaphore = Arc::new(Semaphore::new(MAX_IN_FLIGHT));
            let batches = missing.chunks(BATCH_SIZE).map(|chunk| {
                let semaphore = semaphore.clone();
                async move {
                    // Closed only on drop, so acquire cannot fail here.
                    let _permit = semaphore.acquire().await.expect("semaphore closed");
                    let joined = chunk
                        .iter()
                        .map(u64::to_string)
                        .collect::<Vec<_>>()
                        .join(",");
                    api.call(&format!("achievements?ids={joined}"), None).await
                }
            });
            let responses = futures_util::future::try_join_all(batches).await?;

            let mut cached = self.defs.lock();
            for response in responses {
                for value in response.as_array().into_iter().flatten() {
                    if let Ok(def) = serde_json::from_value::<AchievementDef>(value.clone()) {
                        cached.insert(def.id, def);
                    }
                }
            }
        }

        let cached = self.defs.lock();
        Ok(ids
            .iter()
            .filter_map(|id| cached.get(id).map(|def| (*id, def.clone())))
            .collect())
    }

    /// Total achievement points for the account behind `token`.
    pub async fn total_points(&self, api: &Gw2Api, token: &str) -> Result<i64, Gw2Error> {
        let progress = api.call("account/achievements", Some(token)).await?;
        let entries: Vec<&Value> = progress.as_array().into_iter().flatten().collect();

        let ids: Vec<u64> = entries
            .iter()
            .filter_map(|e| e.get("id").and_then(Value::as_u64))
            .collect();
        let defs = self.definitions(api, &ids).await?;

        let mut total = 0;
        for entry in entries {
            let Some(id) = entry.get("id").and_then(Value::as_u64) else {
                continue;
            };
            let Some(def) = defs.get(&id) else {
                continue;
            };
            let current = entry.get("current").and_then(Value::as_i64).unwrap_or(0);
            let done = entry.get("done").and_then(Value::as_bool).unwrap_or(false);
            let repeated = entry.get("repeated").and_then(Value::as_i64).unwrap_or(0);
            total += def.earned_points(current, done, repeated);
        }
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn def(tiers: &[(i64, i64)], point_cap: Option<i64>) -> AchievementDef {
        AchievementDef {
            id: 1,
            name: "Realm Avenger".into(),
            tiers: tiers
                .iter()
                .map(|(count, points)| Tier {
                    count: *count,
                    points: *points,
                })
                .collect(),
            point_cap,
        }
    }

    #[test]
    fn earned_points_by_tier_progress() {
        let d = def(&[(10, 1), (100, 5), (1000, 10)], None);
        assert_eq!(d.earned_points(0, false, 0), 0);
        assert_eq!(d.earned_points(10, false, 0), 1);
        assert_eq!(d.earned_points(500, false, 0), 6);
        assert_eq!(d.earned_points(0, true, 0), 16);
    }

    #[test]
    fn repeats_count_full_completions() {
        let d = def(&[(10, 5)], None);
        assert_eq!(d.earned_points(10, false, 2), 15);
    }

    #[test]
    fn point_cap_limits_repeats() {
        let d = def(&[(10, 5)], Some(12));
        assert_eq!(d.earned_points(10, false, 10), 12);
        // Negative cap means uncapped.
        let uncapped = def(&[(10, 5)], Some(-1));
        assert_eq!(uncapped.earned_points(10, false, 10), 55);
    }
}

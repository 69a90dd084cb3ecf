//! Guild Wars 2 REST API client.
//!
//! [`Gw2Api`] issues GETs against `https://api.guildwars2.com/v2`,
//! classifies failures into [`Gw2Error`], and retries gateway errors.
//! On top of the raw transport sit the snapshot collector, world-name
//! resolution, WvW match decoding, and the achievement-definition
//! cache.

pub mod account;
pub mod achievements;
pub mod client;
pub mod error;
pub mod matches;
pub mod snapshot;
pub mod worlds;

pub use account::{AccountInfo, PvpStats};
pub use achievements::{AchievementCache, AchievementDef};
pub use client::{BASE_URL, Gw2Api, TokenInfo};
pub use error::Gw2Error;
pub use matches::WvwMatch;

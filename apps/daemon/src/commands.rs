//! Command-facing surfaces.
//!
//! Each command returns a transport-neutral [`Report`] or a
//! [`CommandError`] whose `Display` text is what the user sees. The
//! chat adapter only relays them.

use api::{AchievementCache, Gw2Api, Gw2Error};
use tcore::{
    Permission, Report, SessionStore, UserKey,
    format::{format_duration, pvp_rank_title, wvw_rank_title},
};
use thiserror::Error;
use tracker::{Notifier, ReportError, SnapshotSource, Tracker};

/// User-visible command failures.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("No API key registered. Create one at account.arena.net and register it first.")]
    MissingKey,

    #[error("Your API key is missing the required permissions: {0}.")]
    MissingPermissions(String),

    #[error("That API key is invalid. Check it and register again.")]
    InvalidKey,

    #[error("The GW2 API is currently unavailable. Please try again later.")]
    ApiDown,

    #[error("You have no recorded play sessions yet.")]
    NoSession,

    #[error("Your session is still in progress. Ask again once you stop playing.")]
    SessionInProgress,

    #[error("Still fetching your session's end state from the GW2 API. Ask again in a bit.")]
    SessionUpdating,

    #[error("Something went wrong: {0}")]
    Internal(String),
}

impl From<Gw2Error> for CommandError {
    fn from(err: Gw2Error) -> Self {
        match err {
            Gw2Error::InvalidKey(_) => CommandError::InvalidKey,
            Gw2Error::Forbidden(message) => CommandError::MissingPermissions(message),
            err if err.is_api_down() => CommandError::ApiDown,
            err => CommandError::Internal(err.to_string()),
        }
    }
}

impl From<anyhow::Error> for CommandError {
    fn from(err: anyhow::Error) -> Self {
        CommandError::Internal(format!("{err:#}"))
    }
}

fn require_permissions(key: &UserKey, required: &[Permission]) -> Result<(), CommandError> {
    let missing = key.missing_permissions(required);
    if missing.is_empty() {
        return Ok(());
    }
    let list = missing
        .iter()
        .map(Permission::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    Err(CommandError::MissingPermissions(list))
}

fn load_key(store: &impl SessionStore, user_id: &str) -> Result<UserKey, CommandError> {
    store.user_key(user_id)?.ok_or(CommandError::MissingKey)
}

/// Validate and register (or replace) a user's API key.
pub async fn register_key(
    store: &impl SessionStore,
    gw2: &Gw2Api,
    user_id: &str,
    token: &str,
) -> Result<UserKey, CommandError> {
    let info = gw2.validate_token(token).await?;
    let (account, _) = gw2.account(token).await?;
    let world = gw2
        .world_names(&[account.world])
        .await?
        .into_iter()
        .next()
        .unwrap_or_else(|| "Unknown".into());

    let key = UserKey {
        user_id: user_id.into(),
        token: token.into(),
        name: info.name,
        account_name: account.name,
        world,
        permissions: info.permissions,
    };
    store.set_user_key(&key)?;
    Ok(key)
}

/// Remove the user's registered key.
pub fn forget_key(store: &impl SessionStore, user_id: &str) -> Result<(), CommandError> {
    if store.delete_user_key(user_id)? {
        Ok(())
    } else {
        Err(CommandError::MissingKey)
    }
}

/// Account overview: age, server, ranks, achievement points.
pub async fn account_summary(
    store: &impl SessionStore,
    gw2: &Gw2Api,
    achievements: &AchievementCache,
    user_id: &str,
) -> Result<Report, CommandError> {
    let key = load_key(store, user_id)?;
    require_permissions(&key, &[Permission::Account])?;

    let (info, wvw_rank) = gw2.account(&key.token).await?;
    let mut report = Report::new(info.name.clone());
    report.push("Server", &key.world, true);
    report.push("Age", format_duration(info.age * 60), true);
    if !info.created.is_empty() {
        report.push("Created", &info.created, true);
    }
    if wvw_rank > 0 {
        report.push(
            "WvW Rank",
            format!("{wvw_rank} ({})", wvw_rank_title(wvw_rank)),
            true,
        );
    }
    if info.fractal_level > 0 {
        report.push("Fractal Level", info.fractal_level.to_string(), true);
    }

    if key.has_permission(Permission::Progression) {
        let points = achievements.total_points(gw2, &key.token).await?;
        report.push("Achievement Points", points.to_string(), true);
    }
    if key.has_permission(Permission::Pvp) {
        let stats = gw2.pvp_stats(&key.token).await?;
        let rank = stats.effective_rank();
        if rank > 0 {
            report.push("PvP Rank", format!("{rank} ({})", pvp_rank_title(rank)), true);
        }
    }
    if key.has_permission(Permission::Guilds) && !info.guilds.is_empty() {
        let mut names = Vec::with_capacity(info.guilds.len());
        for guild_id in &info.guilds {
            names.push(gw2.guild_name(guild_id, &key.token).await?);
        }
        report.push("Guilds", names.join("\n"), true);
    }
    Ok(report)
}

/// List the account's characters with professions and deaths.
pub async fn character_list(
    store: &impl SessionStore,
    gw2: &Gw2Api,
    user_id: &str,
) -> Result<Report, CommandError> {
    let key = load_key(store, user_id)?;
    require_permissions(&key, &[Permission::Characters])?;

    let characters = gw2.collect_character_deaths(&key.token).await?;
    let mut report = Report::new(format!("Characters of {}", key.account_name));
    let body = characters
        .iter()
        .map(|c| format!("{} ({}), {} deaths", c.name, c.profession, c.deaths))
        .collect::<Vec<_>>()
        .join("\n");
    report.push(
        "Characters",
        if body.is_empty() { "none".into() } else { body },
        false,
    );
    Ok(report)
}

/// Current WvW match overview for the user's world.
pub async fn match_info(
    store: &impl SessionStore,
    gw2: &Gw2Api,
    user_id: &str,
) -> Result<Report, CommandError> {
    let key = load_key(store, user_id)?;
    require_permissions(&key, &[Permission::Account])?;

    let (info, _) = gw2.account(&key.token).await?;
    let wvw_match = gw2.wvw_match(info.world).await?;
    let names = gw2
        .world_names(&[
            wvw_match.worlds.green,
            wvw_match.worlds.blue,
            wvw_match.worlds.red,
        ])
        .await?;

    let mut report = Report::new(format!("WvW Match {}", wvw_match.id));
    let sides = [
        (&names[0], wvw_match.scores.green, wvw_match.kills.green, wvw_match.deaths.green),
        (&names[1], wvw_match.scores.blue, wvw_match.kills.blue, wvw_match.deaths.blue),
        (&names[2], wvw_match.scores.red, wvw_match.kills.red, wvw_match.deaths.red),
    ];
    for (name, score, kills, deaths) in sides {
        report.push(
            name.as_str(),
            format!(
                "Score: {score}\nKills: {kills}\nDeaths: {deaths}\nK/D: {}",
                wvw_match.kd(kills, deaths)
            ),
            true,
        );
    }
    Ok(report)
}

/// Resolve a list of world or WR-team ids to names.
pub async fn world_list(gw2: &Gw2Api, ids: &[u32]) -> Result<Report, CommandError> {
    let names = gw2.world_names(ids).await?;
    let mut report = Report::new("Worlds");
    let body = ids
        .iter()
        .zip(&names)
        .map(|(id, name)| format!("{id}: {name}"))
        .collect::<Vec<_>>()
        .join("\n");
    report.push("Worlds", body, false);
    Ok(report)
}

/// The session report, with the open-session states mapped to
/// user-visible messages.
pub fn session_report<C, S, N>(
    tracker: &Tracker<C, S, N>,
    user_id: &str,
) -> Result<Report, CommandError>
where
    C: SnapshotSource,
    S: SessionStore + 'static,
    N: Notifier,
{
    tracker.session_report(user_id).map_err(|err| match err {
        ReportError::NoKey => CommandError::MissingKey,
        ReportError::NoSession => CommandError::NoSession,
        ReportError::InProgress => CommandError::SessionInProgress,
        ReportError::StillUpdating => CommandError::SessionUpdating,
        ReportError::Store(err) => CommandError::Internal(format!("{err:#}")),
    })
}

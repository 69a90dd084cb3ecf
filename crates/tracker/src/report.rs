//! Session diff rendering.
//!
//! Turns a start/end snapshot pair plus merged death records into a
//! structured [`Report`]. Keys missing from either side are silently
//! skipped, so stale or partial snapshots never break rendering.

use tcore::{
    DeathRecord, Report, Snapshot,
    format::{format_duration, format_gold},
    snapshot::{ACHIEVEMENT_IDS, WALLET_IDS, display_name},
};

/// Render the comparison report for a finished session.
pub fn render_session(
    start: &Snapshot,
    end: &Snapshot,
    deaths: &[DeathRecord],
    home_world: &str,
) -> Report {
    let mut report = Report::new("Session Report");
    report.push("Account", &end.account_name, true);
    report.push("Server", home_world, true);

    let seconds = (end.timestamp - start.timestamp).num_seconds();
    report.push("Playtime", format_duration(seconds), true);

    // Gold gets base-100 formatting; the sign is applied exactly once.
    if let (Some(before), Some(after)) = (start.wallet.get("gold"), end.wallet.get("gold"))
        && before != after
    {
        let diff = after - before;
        let formatted = format_gold(&diff.abs().to_string());
        let value = if diff > 0 {
            format!("+{formatted}")
        } else if formatted.starts_with('-') {
            formatted
        } else {
            format!("-{formatted}")
        };
        report.push(display_name("gold"), value, true);
    }

    for (_, key) in WALLET_IDS.iter().filter(|(_, k)| *k != "gold") {
        let (Some(before), Some(after)) = (start.wallet.get(*key), end.wallet.get(*key)) else {
            continue;
        };
        if before != after {
            report.push(display_name(key), format!("{:+}", after - before), true);
        }
    }

    if start.wvw_rank != end.wvw_rank {
        report.push(
            "WvW Rank",
            (end.wvw_rank - start.wvw_rank).to_string(),
            true,
        );
    }

    for (_, key) in ACHIEVEMENT_IDS {
        let (Some(before), Some(after)) = (start.achievements.get(*key), end.achievements.get(*key))
        else {
            continue;
        };
        // These counters never decrease; if one somehow did, the raw
        // signed value goes out as-is.
        if before != after {
            report.push(display_name(key), (after - before).to_string(), true);
        }
    }

    if let Some(body) = render_deaths(deaths) {
        report.push("Deaths", body, false);
    }

    report
}

/// Death lines plus a total, or `None` when no character died.
fn render_deaths(deaths: &[DeathRecord]) -> Option<String> {
    let mut lines = Vec::new();
    let mut total = 0;
    let mut seen: Vec<&str> = Vec::new();

    for record in deaths {
        // First occurrence of a name wins.
        if seen.contains(&record.name.as_str()) {
            continue;
        }
        seen.push(&record.name);
        let Some(delta) = record.delta() else {
            continue;
        };
        lines.push(format!("{} ({}): {}", record.name, record.profession, delta));
        total += delta.max(0);
    }

    if lines.is_empty() {
        return None;
    }
    lines.push(format!("Total: {total}"));
    Some(lines.join("\n"))
}

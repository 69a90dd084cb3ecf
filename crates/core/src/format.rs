//! Pure formatting helpers: gold amounts, durations, rank titles.

/// Format a signed copper amount (as a decimal string) into
/// `"{gold} Gold {silver} Silver {copper} Copper"`, dropping zero
/// segments.
///
/// The last two digits are copper, the two before that silver, the
/// rest gold. The sign is applied once to the whole string, so the
/// output never contains a doubled minus. Input that is not a plain
/// decimal integer is returned untouched.
pub fn format_gold(amount: &str) -> String {
    let s = amount.trim();
    let (negative, digits) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s),
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return s.to_string();
    }

    let len = digits.len();
    let copper = if len >= 2 { &digits[len - 2..] } else { digits };
    let silver = if len >= 4 {
        &digits[len - 4..len - 2]
    } else if len > 2 {
        &digits[..len - 2]
    } else {
        ""
    };
    let gold = if len > 4 { &digits[..len - 4] } else { "" };

    let mut parts: Vec<String> = Vec::new();
    if nonzero(gold) {
        parts.push(format!("{gold} Gold"));
    }
    if nonzero(silver) {
        parts.push(format!("{silver} Silver"));
    }
    if nonzero(copper) {
        parts.push(format!("{copper} Copper"));
    }

    let out = parts.join(" ");
    if negative && !out.is_empty() {
        format!("-{out}")
    } else {
        out
    }
}

fn nonzero(segment: &str) -> bool {
    !segment.is_empty() && segment.chars().any(|c| c != '0')
}

/// Render a duration in seconds as `"1d 2h 30m 5s"`, omitting zero
/// components. Zero or negative durations render as `"0s"`.
pub fn format_duration(total_seconds: i64) -> String {
    if total_seconds <= 0 {
        return "0s".into();
    }
    let days = total_seconds / 86400;
    let hours = (total_seconds % 86400) / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    let mut parts = Vec::new();
    if days > 0 {
        parts.push(format!("{days}d"));
    }
    if hours > 0 {
        parts.push(format!("{hours}h"));
    }
    if minutes > 0 {
        parts.push(format!("{minutes}m"));
    }
    if seconds > 0 {
        parts.push(format!("{seconds}s"));
    }
    parts.join(" ")
}

/// Title ladder applied within each WvW rank tier.
const WVW_TITLES: &[(i64, &str)] = &[
    (1, "Invader"),
    (5, "Assaulter"),
    (10, "Raider"),
    (15, "Recruit"),
    (20, "Scout"),
    (30, "Soldier"),
    (40, "Footman"),
    (50, "Knight"),
    (60, "Major"),
    (70, "Colonel"),
    (80, "General"),
    (90, "Veteran"),
    (100, "Champion"),
    (150, "Legend"),
];

/// Tier prefixes and the ranks they start at. Diamond runs to the
/// rank cap of 10000.
const WVW_TIERS: &[(i64, &str)] = &[
    (150, "Bronze"),
    (620, "Silver"),
    (1395, "Gold"),
    (2545, "Platinum"),
    (4095, "Mithril"),
    (6445, "Diamond"),
];

const WVW_RANK_CAP: i64 = 10000;

fn wvw_base_title(position: i64) -> &'static str {
    WVW_TITLES
        .iter()
        .rev()
        .find(|(threshold, _)| position >= *threshold)
        .map(|(_, title)| *title)
        .unwrap_or("Invader")
}

/// Title for a WvW rank, e.g. `"Silver Colonel"`.
///
/// Sub-150 ranks get only the base title; rank 0 is empty. Within a
/// tier, the position is scaled onto the base 1..150 ladder so every
/// tier walks the full Invader..Legend progression.
pub fn wvw_rank_title(rank: i64) -> String {
    if rank <= 0 {
        return String::new();
    }
    let tier = WVW_TIERS
        .iter()
        .enumerate()
        .rev()
        .find(|(_, (start, _))| rank >= *start);
    match tier {
        None => wvw_base_title(rank).to_string(),
        Some((idx, (start, prefix))) => {
            let end = WVW_TIERS
                .get(idx + 1)
                .map(|(next, _)| *next)
                .unwrap_or(WVW_RANK_CAP);
            let span = (end - start).max(2);
            let position = 1 + (rank - start).min(span - 1) * 149 / (span - 1);
            format!("{prefix} {}", wvw_base_title(position))
        }
    }
}

/// PvP rank titles by rank decade.
const PVP_TITLES: &[(i64, &str)] = &[
    (1, "Rabbit"),
    (10, "Deer"),
    (20, "Dolyak"),
    (30, "Wolf"),
    (40, "Tiger"),
    (50, "Bear"),
    (60, "Shark"),
    (70, "Phoenix"),
    (80, "Dragon"),
];

/// Title for a PvP rank; rank 0 is empty.
pub fn pvp_rank_title(rank: i64) -> String {
    if rank <= 0 {
        return String::new();
    }
    PVP_TITLES
        .iter()
        .rev()
        .find(|(threshold, _)| rank >= *threshold)
        .map(|(_, title)| title.to_string())
        .unwrap_or_default()
}

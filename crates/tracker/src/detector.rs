//! Presence-to-transition detection.
//!
//! Converts raw before/after activity lists into "started playing" /
//! "stopped playing" transitions. Custom statuses never participate.

use tcore::presence::{Activity, primary_activity};

/// A session transition for one user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Start,
    End,
}

const GAME_NAME: &str = "guild wars 2";

fn is_gw2(activity: &Activity) -> bool {
    activity.name.to_lowercase().contains(GAME_NAME)
}

/// Decide whether a presence change starts or ends a play session.
///
/// The first non-custom activity on each side is consulted; if neither
/// side names the game, nothing is emitted.
pub fn detect_transition(before: &[Activity], after: &[Activity]) -> Option<Transition> {
    let before_gw2 = primary_activity(before).is_some_and(is_gw2);
    let after_gw2 = primary_activity(after).is_some_and(is_gw2);
    match (before_gw2, after_gw2) {
        (false, true) => Some(Transition::Start),
        (true, false) => Some(Transition::End),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tcore::presence::ActivityKind;

    fn playing(name: &str) -> Vec<Activity> {
        vec![Activity::new(ActivityKind::Playing, name)]
    }

    #[test]
    fn start_and_end_detection() {
        assert_eq!(
            detect_transition(&[], &playing("Guild Wars 2")),
            Some(Transition::Start)
        );
        assert_eq!(
            detect_transition(&playing("Guild Wars 2"), &[]),
            Some(Transition::End)
        );
    }

    #[test]
    fn name_match_is_case_insensitive() {
        assert_eq!(
            detect_transition(&[], &playing("GUILD WARS 2")),
            Some(Transition::Start)
        );
        assert_eq!(
            detect_transition(&[], &playing("guild wars 2 (steam)")),
            Some(Transition::Start)
        );
    }

    #[test]
    fn still_playing_and_unrelated_games_are_quiet() {
        let gw2 = playing("Guild Wars 2");
        assert_eq!(detect_transition(&gw2, &gw2), None);
        assert_eq!(detect_transition(&playing("Factorio"), &[]), None);
        assert_eq!(detect_transition(&[], &playing("Factorio")), None);
        assert_eq!(detect_transition(&[], &[]), None);
    }

    #[test]
    fn custom_status_is_ignored() {
        let custom_gw2 = vec![Activity::new(ActivityKind::Custom, "Guild Wars 2")];
        assert_eq!(detect_transition(&[], &custom_gw2), None);

        // The first non-custom activity is the one that counts.
        let mixed = vec![
            Activity::new(ActivityKind::Custom, "afk"),
            Activity::new(ActivityKind::Playing, "Guild Wars 2"),
        ];
        assert_eq!(detect_transition(&[], &mixed), Some(Transition::Start));
    }

    #[test]
    fn switching_games_ends_the_session() {
        assert_eq!(
            detect_transition(&playing("Guild Wars 2"), &playing("Factorio")),
            Some(Transition::End)
        );
        assert_eq!(
            detect_transition(&playing("Factorio"), &playing("Guild Wars 2")),
            Some(Transition::Start)
        );
    }
}

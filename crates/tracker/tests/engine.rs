//! Session engine tests: presence-driven start/stop, concurrent
//! flips, API outages, and lost starts, against the real SQLite store
//! and a scripted snapshot source.

use sqlite::SqliteStore;
use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
    time::Duration,
};
use tcore::{
    Activity, CharacterSample, PresenceUpdate, SessionStore, Snapshot, UserKey,
    config::TrackerConfig, presence::ActivityKind,
};
use tracker::{Notifier, ReportError, SnapshotSource, Tracker, Transition};

/// Snapshot source driven by a queue of scripted outcomes.
#[derive(Clone, Default)]
struct ScriptedSource {
    snapshots: Arc<Mutex<VecDeque<Result<Snapshot, api::Gw2Error>>>>,
    deaths: Arc<Mutex<VecDeque<Vec<CharacterSample>>>>,
    delay: Arc<Mutex<Duration>>,
}

impl ScriptedSource {
    fn push_snapshot(&self, result: Result<Snapshot, api::Gw2Error>) {
        self.snapshots.lock().unwrap().push_back(result);
    }

    fn push_deaths(&self, samples: Vec<CharacterSample>) {
        self.deaths.lock().unwrap().push_back(samples);
    }

    fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = delay;
    }
}

impl SnapshotSource for ScriptedSource {
    async fn snapshot(&self, _token: &str) -> Result<Snapshot, api::Gw2Error> {
        let delay = *self.delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.snapshots
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(api::Gw2Error::Inactive("script exhausted".into())))
    }

    async fn character_deaths(&self, _token: &str) -> Result<Vec<CharacterSample>, api::Gw2Error> {
        Ok(self.deaths.lock().unwrap().pop_front().unwrap_or_default())
    }
}

#[derive(Clone, Default)]
struct RecordingNotifier {
    messages: Arc<Mutex<Vec<String>>>,
}

impl Notifier for RecordingNotifier {
    async fn direct_message(&self, user_id: &str, text: &str) -> anyhow::Result<()> {
        self.messages.lock().unwrap().push(format!("{user_id}: {text}"));
        Ok(())
    }
}

struct Harness {
    tracker: Tracker<ScriptedSource, Arc<SqliteStore>, RecordingNotifier>,
    source: ScriptedSource,
    store: Arc<SqliteStore>,
    notifier: RecordingNotifier,
}

fn harness() -> Harness {
    let store = Arc::new(SqliteStore::in_memory().unwrap());
    store.set_session_tracking("g1", true).unwrap();
    store
        .set_user_key(&UserKey {
            user_id: "u1".into(),
            token: "TOKEN".into(),
            name: "bot key".into(),
            account_name: "Ruler.1234".into(),
            world: "Gandara".into(),
            permissions: vec![
                "account".into(),
                "characters".into(),
                "progression".into(),
                "wallet".into(),
            ],
        })
        .unwrap();

    let source = ScriptedSource::default();
    let notifier = RecordingNotifier::default();
    let config = TrackerConfig {
        background_retry_delay_secs: 0,
        background_max_attempts: 3,
    };
    let tracker = Tracker::new(source.clone(), store.clone(), notifier.clone(), config);
    Harness {
        tracker,
        source,
        store,
        notifier,
    }
}

fn gw2() -> Vec<Activity> {
    vec![Activity::new(ActivityKind::Playing, "Guild Wars 2")]
}

fn presence(before: Vec<Activity>, after: Vec<Activity>) -> PresenceUpdate {
    PresenceUpdate {
        user_id: "u1".into(),
        guild_id: "g1".into(),
        before,
        after,
    }
}

fn snapshot(gold: i64, karma: i64, rank: i64, yaks: i64) -> Snapshot {
    let mut snap = Snapshot::zeroed("Ruler.1234");
    snap.wallet.insert("gold".into(), gold);
    snap.wallet.insert("karma".into(), karma);
    snap.wvw_rank = rank;
    snap.achievements.insert("yaks".into(), yaks);
    snap
}

fn sample(name: &str, deaths: i64) -> CharacterSample {
    CharacterSample {
        name: name.into(),
        profession: "Engineer".into(),
        deaths,
    }
}

/// Poll until the condition holds or a deadline passes.
async fn settle(what: &str, condition: impl Fn() -> bool) {
    for _ in 0..300 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("timed out waiting for: {what}");
}

#[tokio::test]
async fn clean_session_produces_full_report() {
    let h = harness();

    h.source.push_snapshot(Ok(snapshot(100000, 50000, 500, 10)));
    h.source.push_deaths(vec![sample("Rifle Jack", 3)]);
    h.tracker.handle_presence(&presence(vec![], gw2()));
    let store = h.store.clone();
    settle("start session stored", || {
        store.last_session("u1").unwrap().is_some()
    })
    .await;
    assert!(h.tracker.is_playing("u1"));

    // While the session is open and the user plays, the report says so.
    assert!(matches!(
        h.tracker.session_report("u1"),
        Err(ReportError::InProgress)
    ));

    h.source.push_snapshot(Ok(snapshot(150000, 55000, 502, 15)));
    h.source.push_deaths(vec![sample("Rifle Jack", 7)]);
    h.tracker.handle_presence(&presence(gw2(), vec![]));
    let store = h.store.clone();
    settle("end session stored", || {
        store
            .last_session("u1")
            .unwrap()
            .is_some_and(|s| !s.is_open())
    })
    .await;
    assert!(!h.tracker.is_playing("u1"));

    let report = h.tracker.session_report("u1").unwrap();
    assert_eq!(report.field("Account").unwrap().value, "Ruler.1234");
    assert_eq!(report.field("Server").unwrap().value, "Gandara");
    assert_eq!(report.field("Gold").unwrap().value, "+5 Gold");
    assert_eq!(report.field("Karma").unwrap().value, "+5000");
    assert_eq!(report.field("WvW Rank").unwrap().value, "2");
    assert_eq!(report.field("Yaks Killed").unwrap().value, "5");
    assert!(report.field("Laurels").is_none());
    let deaths = &report.field("Deaths").unwrap().value;
    assert!(deaths.contains("Rifle Jack (Engineer): 4"));
    assert!(deaths.ends_with("Total: 4"));
}

#[tokio::test]
async fn end_during_inflight_start_is_not_dropped() {
    let h = harness();
    h.source.set_delay(Duration::from_millis(100));
    h.source.push_snapshot(Ok(snapshot(100, 0, 0, 0)));
    h.source.push_snapshot(Ok(snapshot(200, 0, 0, 0)));

    h.tracker.handle_presence(&presence(vec![], gw2()));
    tokio::time::sleep(Duration::from_millis(20)).await;
    // The start snapshot is still in flight; the end must be parked,
    // not dropped.
    h.tracker.handle_presence(&presence(gw2(), vec![]));

    let store = h.store.clone();
    settle("session closed after parked end", || {
        store
            .last_session("u1")
            .unwrap()
            .is_some_and(|s| !s.is_open())
    })
    .await;

    let session = h.store.last_session("u1").unwrap().unwrap();
    assert_eq!(session.start.wallet["gold"], 100);
    assert_eq!(session.end.unwrap().wallet["gold"], 200);
}

#[tokio::test]
async fn repeated_start_collapses_to_one_open_session() {
    let h = harness();
    h.source.set_delay(Duration::from_millis(50));
    h.source.push_snapshot(Ok(snapshot(100, 0, 0, 0)));
    h.source.push_snapshot(Ok(snapshot(101, 0, 0, 0)));

    h.tracker
        .submit("u1".into(), "g1".into(), Transition::Start);
    h.tracker
        .submit("u1".into(), "g1".into(), Transition::Start);
    h.tracker
        .submit("u1".into(), "g1".into(), Transition::Start);

    let store = h.store.clone();
    settle("start session stored", || {
        store.last_session("u1").unwrap().is_some()
    })
    .await;
    tokio::time::sleep(Duration::from_millis(200)).await;

    let session = h.store.last_session("u1").unwrap().unwrap();
    assert!(session.is_open());
    // The coalesced start reused the open session; no second one.
    assert_eq!(session.id, 1);
}

#[tokio::test]
async fn outage_at_start_recovers_in_background() {
    let h = harness();
    // Inline attempt fails, then two background retries fail, the
    // third succeeds.
    h.source
        .push_snapshot(Err(api::Gw2Error::Inactive("down".into())));
    h.source
        .push_snapshot(Err(api::Gw2Error::Inactive("down".into())));
    h.source
        .push_snapshot(Err(api::Gw2Error::Inactive("down".into())));
    h.source.push_snapshot(Ok(snapshot(100, 0, 0, 0)));

    h.tracker.handle_presence(&presence(vec![], gw2()));
    let store = h.store.clone();
    settle("retried start lands", || {
        store.last_session("u1").unwrap().is_some()
    })
    .await;

    let session = h.store.last_session("u1").unwrap().unwrap();
    assert!(session.is_open());
    assert_eq!(session.start.wallet["gold"], 100);
    assert!(h.notifier.messages.lock().unwrap().is_empty());

    let tracker = h.tracker.clone();
    settle("retry set drains", || tracker.retry_backlog() == 0).await;
}

#[tokio::test]
async fn exhausted_retries_notify_the_user() {
    let h = harness();
    // Every attempt fails: 1 inline + 3 background.
    for _ in 0..4 {
        h.source
            .push_snapshot(Err(api::Gw2Error::Inactive("down".into())));
    }

    h.tracker.handle_presence(&presence(vec![], gw2()));
    let notifier = h.notifier.clone();
    settle("final-failure dm sent", || {
        !notifier.messages.lock().unwrap().is_empty()
    })
    .await;

    assert!(h.store.last_session("u1").unwrap().is_none());
    let messages = h.notifier.messages.lock().unwrap();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].contains("may be incomplete"));
}

#[tokio::test]
async fn lost_start_drops_end_without_crashing() {
    let h = harness();
    h.source.push_snapshot(Ok(snapshot(100, 0, 0, 0)));
    h.source.push_deaths(vec![sample("Rifle Jack", 7)]);

    // End arrives with no open session (the bot missed the start).
    h.tracker.handle_presence(&presence(gw2(), vec![]));
    settle("snapshot consumed", || {
        h.source.snapshots.lock().unwrap().is_empty()
    })
    .await;
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert!(h.store.last_session("u1").unwrap().is_none());
    // The report surface distinguishes "nothing recorded".
    assert!(matches!(
        h.tracker.session_report("u1"),
        Err(ReportError::NoSession)
    ));
}

#[tokio::test]
async fn tracking_disabled_ignores_transitions() {
    let h = harness();
    h.store.set_session_tracking("g1", false).unwrap();
    h.source.push_snapshot(Ok(snapshot(100, 0, 0, 0)));

    h.tracker.handle_presence(&presence(vec![], gw2()));
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert!(h.store.last_session("u1").unwrap().is_none());
    // The snapshot was never requested.
    assert_eq!(h.source.snapshots.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn unregistered_user_is_ignored() {
    let h = harness();
    h.store.delete_user_key("u1").unwrap();
    h.source.push_snapshot(Ok(snapshot(100, 0, 0, 0)));

    h.tracker.handle_presence(&presence(vec![], gw2()));
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert!(h.store.last_session("u1").unwrap().is_none());
    assert!(matches!(
        h.tracker.session_report("u1"),
        Err(ReportError::NoKey)
    ));
}

#[tokio::test]
async fn open_session_without_presence_reports_still_updating() {
    let h = harness();
    h.source.push_snapshot(Ok(snapshot(100, 0, 0, 0)));
    h.tracker.handle_presence(&presence(vec![], gw2()));
    let store = h.store.clone();
    settle("start session stored", || {
        store.last_session("u1").unwrap().is_some()
    })
    .await;

    // The user stopped playing but the end snapshot has not landed
    // (API outage): the playing set no longer holds them.
    h.source
        .push_snapshot(Err(api::Gw2Error::Inactive("down".into())));
    h.source
        .push_snapshot(Err(api::Gw2Error::Inactive("down".into())));
    h.source
        .push_snapshot(Err(api::Gw2Error::Inactive("down".into())));
    h.source
        .push_snapshot(Err(api::Gw2Error::Inactive("down".into())));
    h.tracker.handle_presence(&presence(gw2(), vec![]));
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(matches!(
        h.tracker.session_report("u1"),
        Err(ReportError::StillUpdating)
    ));
    h.tracker.shutdown();
}

#[tokio::test]
async fn shutdown_aborts_retries_without_dm() {
    let h = harness();
    let tracker = Tracker::new(
        h.source.clone(),
        h.store.clone(),
        h.notifier.clone(),
        TrackerConfig {
            background_retry_delay_secs: 3600,
            background_max_attempts: 3,
        },
    );
    h.source
        .push_snapshot(Err(api::Gw2Error::Inactive("down".into())));
    tracker.submit("u1".into(), "g1".into(), Transition::Start);

    settle("retry scheduled", || tracker.retry_backlog() == 1).await;
    tracker.shutdown();
    assert_eq!(tracker.retry_backlog(), 0);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(h.notifier.messages.lock().unwrap().is_empty());
}

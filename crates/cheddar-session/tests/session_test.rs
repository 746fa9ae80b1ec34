#![allow(clippy::expect_used, clippy::unwrap_used)]

//! Assistant session wiring over a loopback host.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::json;

use cheddar_api::{BridgeApi, CapabilityAdapter, MemorySettings};
use cheddar_bridge::loopback::LoopbackHost;
use cheddar_bridge::{ChannelBridge, HostTransport};
use cheddar_session::config::{Config, SessionDefaults};
use cheddar_session::session::{
    API_KEY_MISSING, MESSAGE_SENT, NAVIGATE_NEXT, NAVIGATE_PREVIOUS, UPDATE_RESPONSE,
    UPDATE_STATUS,
};
use cheddar_session::{AssistantSession, ScrollDirection, SessionObserver};
use cheddar_stream::Turn;

#[derive(Default)]
struct Recorder {
    statuses: Mutex<Vec<String>>,
    scrolls: Mutex<Vec<ScrollDirection>>,
    click_through: Mutex<Vec<bool>>,
    completed: Mutex<Vec<usize>>,
    turn_updates: Mutex<usize>,
}

impl SessionObserver for Recorder {
    fn status_changed(&self, status: &str) {
        self.statuses.lock().unwrap().push(status.to_string());
    }

    fn turns_changed(&self, _turns: &[Turn], _active_index: Option<usize>) {
        *self.turn_updates.lock().unwrap() += 1;
    }

    fn scroll_requested(&self, direction: ScrollDirection) {
        self.scrolls.lock().unwrap().push(direction);
    }

    fn click_through_changed(&self, enabled: bool) {
        self.click_through.lock().unwrap().push(enabled);
    }

    fn reveal_complete(&self, turn_index: usize) {
        self.completed.lock().unwrap().push(turn_index);
    }
}

struct Harness {
    host: Arc<LoopbackHost>,
    settings: Arc<MemorySettings>,
    recorder: Arc<Recorder>,
    session: AssistantSession,
}

fn instant_config() -> Config {
    let mut cfg = Config::default();
    cfg.reveal.reduced_motion = true;
    cfg
}

async fn harness(config: Config) -> Harness {
    let host = Arc::new(LoopbackHost::new());
    host.handle("send-text-message", |args| {
        if args[0] == "fail" {
            Ok(json!({"success": false, "error": "session not active"}))
        } else {
            Ok(json!({"success": true}))
        }
    });
    host.handle("initialize-gemini", |_| Ok(json!(true)));
    let bridge = ChannelBridge::new(Arc::clone(&host) as Arc<dyn HostTransport>);
    let settings = Arc::new(MemorySettings::new());
    let adapter = Arc::new(CapabilityAdapter::new());
    adapter
        .bind(Arc::new(BridgeApi::new(bridge.clone(), settings.clone())))
        .await;
    let recorder = Arc::new(Recorder::default());
    let session = AssistantSession::attach(
        bridge,
        adapter,
        settings.clone(),
        config,
        recorder.clone(),
    );
    Harness {
        host,
        settings,
        recorder,
        session,
    }
}

fn contents(session: &AssistantSession) -> Vec<String> {
    session.turns().into_iter().map(|t| t.content).collect()
}

#[tokio::test]
async fn growing_fragments_fill_one_turn() {
    let h = harness(instant_config()).await;
    for fragment in ["Hello", "Hello world", "Hello world!"] {
        h.host.emit(UPDATE_RESPONSE, vec![json!(fragment)]);
    }
    assert_eq!(contents(&h.session), vec!["Hello world!"]);
    assert_eq!(h.session.counter_label(), "1/1");
    assert_eq!(h.session.display_content(), "Hello world!");
    assert_eq!(h.session.visible_words(), vec!["Hello", "world!"]);
    assert_eq!(*h.recorder.turn_updates.lock().unwrap(), 3);
}

#[tokio::test]
async fn completion_status_splits_turns() {
    let h = harness(instant_config()).await;
    h.host.emit(UPDATE_RESPONSE, vec![json!("First answer")]);
    h.host.emit(UPDATE_STATUS, vec![json!("Ready")]);
    h.host.emit(UPDATE_RESPONSE, vec![json!("Second answer")]);

    let turns = h.session.turns();
    assert_eq!(turns.len(), 2);
    assert!(turns[0].complete);
    assert_eq!(turns[0].content, "First answer");
    assert_eq!(h.session.active_index(), Some(1));
    assert_eq!(h.session.status(), "Ready");
    assert_eq!(*h.recorder.statuses.lock().unwrap(), vec!["Ready"]);
}

#[tokio::test]
async fn navigation_events_move_the_active_turn() {
    let h = harness(instant_config()).await;
    h.host.emit(UPDATE_RESPONSE, vec![json!("one")]);
    h.host.emit(UPDATE_STATUS, vec![json!("Listening...")]);
    h.host.emit(UPDATE_RESPONSE, vec![json!("two")]);

    h.host.emit(NAVIGATE_PREVIOUS, Vec::new());
    assert_eq!(h.session.active_index(), Some(0));
    assert_eq!(h.session.counter_label(), "1/2");
    h.host.emit(NAVIGATE_PREVIOUS, Vec::new());
    assert_eq!(h.session.active_index(), Some(0));
    h.host.emit(NAVIGATE_NEXT, Vec::new());
    assert_eq!(h.session.display_content(), "two");

    assert_eq!(h.session.select(0), Some(0));
    assert_eq!(h.session.navigate(5), Some(1));
    assert!(h.session.reveal_state().is_fully_revealed());
}

#[tokio::test(start_paused = true)]
async fn new_turn_reveals_word_by_word() {
    let h = harness(Config::default()).await;
    h.host.emit(UPDATE_RESPONSE, vec![json!("one two three")]);
    assert_eq!(h.session.reveal_state().revealed_word_count, 0);

    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(h.session.reveal_state().revealed_word_count, 3);
    assert_eq!(*h.recorder.completed.lock().unwrap(), vec![0]);
}

#[tokio::test(start_paused = true)]
async fn sent_text_starts_a_new_turn() {
    let h = harness(instant_config()).await;
    h.host.emit(UPDATE_RESPONSE, vec![json!("Answer in progress")]);

    assert!(h.session.send_text("  and then?  ").await);
    assert_eq!(h.session.status(), MESSAGE_SENT);
    assert_eq!(
        h.host.invocations().last().unwrap().args,
        vec![json!("and then?")]
    );

    h.host.emit(UPDATE_RESPONSE, vec![json!("Follow-up answer")]);
    assert_eq!(
        contents(&h.session),
        vec!["Answer in progress", "Follow-up answer"]
    );

    tokio::time::sleep(Duration::from_millis(1300)).await;
    assert_eq!(h.session.status(), "");
}

#[tokio::test]
async fn blank_text_is_not_sent() {
    let h = harness(instant_config()).await;
    assert!(!h.session.send_text("   ").await);
    assert!(h.host.invocations().is_empty());
}

#[tokio::test(start_paused = true)]
async fn failed_send_shows_the_error() {
    let h = harness(instant_config()).await;
    assert!(!h.session.send_text("fail").await);
    assert_eq!(
        h.session.status(),
        "Error sending message: session not active"
    );
    h.host.emit(UPDATE_RESPONSE, vec![json!("Hello")]);
    h.host.emit(UPDATE_RESPONSE, vec![json!("Hello again")]);
    assert_eq!(contents(&h.session), vec!["Hello again"]);
}

#[tokio::test(start_paused = true)]
async fn host_status_is_not_cleared_by_an_older_transient() {
    let h = harness(instant_config()).await;
    assert!(h.session.send_text("hi").await);
    h.host.emit(UPDATE_STATUS, vec![json!("Listening...")]);
    tokio::time::sleep(Duration::from_millis(1300)).await;
    assert_eq!(h.session.status(), "Listening...");
}

#[tokio::test(start_paused = true)]
async fn start_without_api_key_only_shows_status() {
    let h = harness(instant_config()).await;
    assert!(!h.session.start_default().await);
    assert_eq!(h.session.status(), API_KEY_MISSING);
    assert!(!h.session.is_active());
    assert!(h.host.invocations().is_empty());
    assert!(h.host.sent_on("start-capture").is_empty());

    tokio::time::sleep(Duration::from_millis(1199)).await;
    assert_eq!(h.session.status(), API_KEY_MISSING);
    tokio::time::sleep(Duration::from_millis(2)).await;
    assert_eq!(h.session.status(), "");
    assert_eq!(
        *h.recorder.statuses.lock().unwrap(),
        vec![API_KEY_MISSING.to_string(), String::new()]
    );
}

#[tokio::test]
async fn start_initializes_captures_and_resets_turns() {
    let h = harness(instant_config()).await;
    h.settings.set_api_key(Some("key".to_string()));
    h.host.emit(UPDATE_RESPONSE, vec![json!("stale turn")]);

    let selection = SessionDefaults {
        profile: "sales".to_string(),
        language: "fr-FR".to_string(),
        screenshot_interval: "10".to_string(),
        image_quality: "low".to_string(),
    };
    assert!(h.session.start(&selection).await);

    let init = &h.host.invocations()[0];
    assert_eq!(init.channel, "initialize-gemini");
    assert_eq!(init.args[2], json!("sales"));
    assert_eq!(init.args[3], json!("fr-FR"));
    assert_eq!(
        h.host.sent_on("start-capture"),
        vec![vec![json!({"interval": "10", "quality": "low"})]]
    );
    assert!(h.session.turns().is_empty());
    assert!(h.session.is_active());
    assert!(h.session.started_at().is_some());
    assert_eq!(
        h.session.display_content(),
        "Hey, I'm listening to your Sales Call?"
    );
}

#[tokio::test]
async fn close_stops_capture_and_ignores_close_failure() {
    let h = harness(instant_config()).await;
    h.settings.set_api_key(Some("key".to_string()));
    assert!(h.session.start_default().await);

    h.session.close().await;
    assert_eq!(h.host.sent_on("stop-capture").len(), 1);
    assert!(h
        .host
        .invocations()
        .iter()
        .any(|call| call.channel == "close-session"));
    assert!(!h.session.is_active());
}

#[tokio::test]
async fn scroll_and_click_through_reach_the_observer() {
    let h = harness(instant_config()).await;
    h.host.emit("scroll-response-down", Vec::new());
    h.host.emit("scroll-response-up", Vec::new());
    h.host.emit("click-through-toggled", vec![json!(true)]);
    h.host.emit("click-through-toggled", vec![json!("yes")]);

    assert_eq!(
        *h.recorder.scrolls.lock().unwrap(),
        vec![ScrollDirection::Down, ScrollDirection::Up]
    );
    assert_eq!(*h.recorder.click_through.lock().unwrap(), vec![true]);
    assert!(h.session.is_click_through());
}

#[tokio::test]
async fn saving_is_deduplicated_by_content() {
    let h = harness(instant_config()).await;
    assert!(!h.session.save_active_turn());

    h.host.emit(UPDATE_RESPONSE, vec![json!("Keep this answer")]);
    assert!(!h.session.is_active_turn_saved());
    assert!(h.session.save_active_turn());
    assert!(h.session.is_active_turn_saved());
    assert!(!h.session.save_active_turn());

    let saved = h.session.saved_responses();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].response, "Keep this answer");
    assert_eq!(saved[0].profile, "interview");
}

#[tokio::test]
async fn detach_releases_every_listener() {
    let h = harness(instant_config()).await;
    assert_eq!(h.host.listener_count(UPDATE_RESPONSE), 1);

    h.session.detach();
    for channel in [
        UPDATE_RESPONSE,
        UPDATE_STATUS,
        NAVIGATE_PREVIOUS,
        NAVIGATE_NEXT,
        "scroll-response-up",
        "scroll-response-down",
        "click-through-toggled",
    ] {
        assert_eq!(h.host.listener_count(channel), 0, "{channel}");
    }
    assert_eq!(h.host.emit(UPDATE_RESPONSE, vec![json!("late")]), 0);
    assert!(h.session.turns().is_empty());

    h.session.detach();
}

#[tokio::test]
async fn dropping_the_session_releases_listeners() {
    let Harness { host, session, .. } = harness(instant_config()).await;
    assert_eq!(host.listener_count(UPDATE_STATUS), 1);
    drop(session);
    assert_eq!(host.listener_count(UPDATE_STATUS), 0);
}

#[tokio::test]
async fn calls_before_bind_are_queued_and_count_as_sent() {
    let host = Arc::new(LoopbackHost::new());
    host.handle("send-text-message", |_| Ok(json!({"success": true})));
    let bridge = ChannelBridge::new(Arc::clone(&host) as Arc<dyn HostTransport>);
    let settings = Arc::new(MemorySettings::new());
    let adapter = Arc::new(CapabilityAdapter::new());
    let session = AssistantSession::attach(
        bridge.clone(),
        Arc::clone(&adapter),
        settings.clone(),
        instant_config(),
        Arc::new(cheddar_session::NullSessionObserver),
    );

    assert!(session.send_text("early").await);
    assert!(host.invocations().is_empty());
    assert_eq!(adapter.pending().len(), 1);

    let report = adapter
        .bind(Arc::new(BridgeApi::new(bridge, settings)))
        .await;
    assert_eq!(report.replayed, 1);
    assert_eq!(host.invocations()[0].args, vec![json!("early")]);
}

#[tokio::test]
async fn filler_after_completion_gets_its_own_turn() {
    let h = harness(instant_config()).await;
    h.host.emit(UPDATE_RESPONSE, vec![json!("A full answer to the question.")]);
    h.host.emit(UPDATE_STATUS, vec![json!("Ready")]);
    h.host.emit(UPDATE_RESPONSE, vec![json!("okay")]);

    assert_eq!(
        contents(&h.session),
        vec!["A full answer to the question.", "okay"]
    );
    assert_eq!(h.session.active_index(), Some(1));
    assert_eq!(h.session.display_content(), "okay");
    assert_eq!(*h.recorder.turn_updates.lock().unwrap(), 3);
}

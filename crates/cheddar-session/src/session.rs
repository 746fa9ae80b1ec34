//! The assistant session: host events in, turns and status out.
//!
//! `AssistantSession::attach` subscribes to the host's push channels and
//! wires them into a `ResponseReconciler` and a `RevealScheduler`. Event
//! callbacks hold only a weak reference to the session state, so a dropped
//! session never keeps itself alive through the bridge.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use cheddar_api::{ApiCall, CallOutcome, CapabilityAdapter, SettingsStore};
use cheddar_bridge::{ChannelBridge, ChannelError, EventCallback, Subscription};
use cheddar_stream::{
    ResponseReconciler, RevealMode, RevealObserver, RevealScheduler, RevealState, Turn,
};
use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::{Config, SessionDefaults};
use crate::profile;
use crate::saved::{MemorySavedResponses, SavedResponse, SavedResponseStore};

pub const UPDATE_RESPONSE: &str = "update-response";
pub const UPDATE_STATUS: &str = "update-status";
pub const NAVIGATE_PREVIOUS: &str = "navigate-previous-response";
pub const NAVIGATE_NEXT: &str = "navigate-next-response";
pub const SCROLL_UP: &str = "scroll-response-up";
pub const SCROLL_DOWN: &str = "scroll-response-down";
pub const CLICK_THROUGH_TOGGLED: &str = "click-through-toggled";

const SESSION_CHANNELS: [&str; 7] = [
    UPDATE_RESPONSE,
    UPDATE_STATUS,
    NAVIGATE_PREVIOUS,
    NAVIGATE_NEXT,
    SCROLL_UP,
    SCROLL_DOWN,
    CLICK_THROUGH_TOGGLED,
];

pub const API_KEY_MISSING: &str = "API key missing";
pub const MESSAGE_SENT: &str = "Message sent...";
pub const TRANSIENT_STATUS_TTL: Duration = Duration::from_millis(1200);

const MIN_SCROLL_STEP: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollDirection {
    Up,
    Down,
}

impl ScrollDirection {
    /// Signed scroll offset for a viewport of `viewport_height` pixels.
    pub fn offset(self, viewport_height: f64) -> f64 {
        let step = scroll_step(viewport_height);
        match self {
            Self::Up => -step,
            Self::Down => step,
        }
    }
}

/// 30% of the viewport, never less than 100px.
pub fn scroll_step(viewport_height: f64) -> f64 {
    (viewport_height * 0.3).max(MIN_SCROLL_STEP)
}

/// Receives everything a renderer needs. All methods default to no-ops.
///
/// Called outside the session's lock, possibly from a reveal task.
pub trait SessionObserver: Send + Sync {
    fn status_changed(&self, _status: &str) {}
    fn turns_changed(&self, _turns: &[Turn], _active_index: Option<usize>) {}
    fn scroll_requested(&self, _direction: ScrollDirection) {}
    fn click_through_changed(&self, _enabled: bool) {}
    fn word_revealed(&self, _turn_index: usize, _word_index: usize) {}
    fn reveal_complete(&self, _turn_index: usize) {}
}

pub struct NullSessionObserver;

impl SessionObserver for NullSessionObserver {}

struct RevealForwarder(Arc<dyn SessionObserver>);

impl RevealObserver for RevealForwarder {
    fn word_revealed(&self, turn_index: usize, word_index: usize) {
        self.0.word_revealed(turn_index, word_index);
    }

    fn reveal_complete(&self, turn_index: usize) {
        self.0.reveal_complete(turn_index);
    }
}

struct SessionState {
    reconciler: ResponseReconciler,
    status: String,
    status_clear: Option<CancellationToken>,
    profile: String,
    active: bool,
    started_at: Option<DateTime<Utc>>,
    click_through: bool,
}

struct SessionInner {
    state: Mutex<SessionState>,
    reveal: RevealScheduler,
    observer: Arc<dyn SessionObserver>,
}

impl SessionInner {
    fn state(&self) -> MutexGuard<'_, SessionState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn on_response(&self, fragment: &str) {
        let (reconciled, turns, active) = {
            let mut state = self.state();
            let reconciled = state.reconciler.apply_fragment(fragment);
            (
                reconciled,
                state.reconciler.turns().to_vec(),
                state.reconciler.active_turn().cloned(),
            )
        };
        debug!(
            placement = ?reconciled.placement,
            turn_index = ?reconciled.active_index,
            "response fragment applied"
        );
        self.observer.turns_changed(&turns, reconciled.active_index);
        if let Some(turn) = active {
            self.reveal
                .render(turn.index, &turn.content, RevealMode::Animate);
        }
    }

    fn on_status(&self, status: &str) {
        let (completed, turns, active_index) = {
            let mut state = self.state();
            if let Some(pending) = state.status_clear.take() {
                pending.cancel();
            }
            state.status = status.to_string();
            let completed = state.reconciler.apply_status(status);
            (
                completed,
                state.reconciler.turns().to_vec(),
                state.reconciler.active_index(),
            )
        };
        self.observer.status_changed(status);
        if completed {
            self.observer.turns_changed(&turns, active_index);
        }
    }

    /// Move the active turn and show it without animation.
    fn show<F>(&self, move_to: F) -> Option<usize>
    where
        F: FnOnce(&mut ResponseReconciler) -> Option<usize>,
    {
        let (index, turns, active) = {
            let mut state = self.state();
            let index = move_to(&mut state.reconciler);
            (
                index,
                state.reconciler.turns().to_vec(),
                state.reconciler.active_turn().cloned(),
            )
        };
        self.observer.turns_changed(&turns, index);
        if let Some(turn) = active {
            self.reveal
                .render(turn.index, &turn.content, RevealMode::Instant);
        }
        index
    }

    fn on_click_through(&self, enabled: bool) {
        self.state().click_through = enabled;
        self.observer.click_through_changed(enabled);
    }

    fn set_transient_status(self: &Arc<Self>, text: &str, ttl: Duration) {
        let token = CancellationToken::new();
        {
            let mut state = self.state();
            if let Some(pending) = state.status_clear.replace(token.clone()) {
                pending.cancel();
            }
            state.status = text.to_string();
        }
        self.observer.status_changed(text);

        let Ok(handle) = Handle::try_current() else {
            warn!(status = text, "no async runtime; transient status will not clear");
            return;
        };
        let weak = Arc::downgrade(self);
        handle.spawn(async move {
            tokio::select! {
                biased;
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(ttl) => {
                    if let Some(inner) = weak.upgrade() {
                        inner.clear_transient_status(&token);
                    }
                }
            }
        });
    }

    fn clear_transient_status(&self, token: &CancellationToken) {
        {
            let mut state = self.state();
            // A newer status cancels the token under this lock.
            if token.is_cancelled() {
                return;
            }
            state.status_clear = None;
            state.status.clear();
        }
        self.observer.status_changed("");
    }

    fn cancel_timers(&self) {
        if let Some(pending) = self.state().status_clear.take() {
            pending.cancel();
        }
        self.reveal.cancel();
    }
}

fn string_arg(channel: &str, args: &[Value]) -> Option<String> {
    match args.first() {
        Some(Value::String(s)) => Some(s.clone()),
        other => {
            warn!(channel, payload = ?other, "expected a string payload");
            None
        }
    }
}

/// Owns the session's subscriptions. Releasing also clears every listener
/// on the session channels, so nothing the session wired up survives it.
struct SubscriptionGuard {
    bridge: ChannelBridge,
    subscriptions: Vec<Subscription>,
    released: bool,
}

impl SubscriptionGuard {
    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        for mut subscription in self.subscriptions.drain(..) {
            subscription.unsubscribe();
        }
        for channel in SESSION_CHANNELS {
            self.bridge.unsubscribe_all(channel);
        }
        debug!("session listeners released");
    }
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        self.release();
    }
}

pub struct AssistantSession {
    inner: Arc<SessionInner>,
    bridge: ChannelBridge,
    adapter: Arc<CapabilityAdapter>,
    settings: Arc<dyn SettingsStore>,
    saved: Arc<dyn SavedResponseStore>,
    config: Config,
    guard: Mutex<SubscriptionGuard>,
}

impl AssistantSession {
    /// Build a session and subscribe it to the host's push channels.
    pub fn attach(
        bridge: ChannelBridge,
        adapter: Arc<CapabilityAdapter>,
        settings: Arc<dyn SettingsStore>,
        config: Config,
        observer: Arc<dyn SessionObserver>,
    ) -> Self {
        let reveal = RevealScheduler::new(Arc::new(RevealForwarder(Arc::clone(&observer))))
            .with_stagger(config.stagger())
            .with_reduced_motion(config.reveal.reduced_motion);
        let inner = Arc::new(SessionInner {
            state: Mutex::new(SessionState {
                reconciler: ResponseReconciler::new(config.filler_policy()),
                status: String::new(),
                status_clear: None,
                profile: config.session.profile.clone(),
                active: false,
                started_at: None,
                click_through: false,
            }),
            reveal,
            observer,
        });

        let subscriptions = SESSION_CHANNELS
            .into_iter()
            .map(|channel| bridge.subscribe(channel, event_callback(channel, &inner)))
            .collect();
        info!(
            host = bridge.is_available(),
            os = %bridge.platform().os,
            "assistant session attached"
        );

        Self {
            inner,
            bridge: bridge.clone(),
            adapter,
            settings,
            saved: Arc::new(MemorySavedResponses::new()),
            config,
            guard: Mutex::new(SubscriptionGuard {
                bridge,
                subscriptions,
                released: false,
            }),
        }
    }

    pub fn with_saved_responses(mut self, saved: Arc<dyn SavedResponseStore>) -> Self {
        self.saved = saved;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Start with the configured profile, language and capture settings.
    pub async fn start_default(&self) -> bool {
        let selection = self.config.session.clone();
        self.start(&selection).await
    }

    /// Initialize the host session and start capturing.
    ///
    /// Without an API key nothing is started and a transient status says so.
    pub async fn start(&self, selection: &SessionDefaults) -> bool {
        let has_key = self
            .settings
            .api_key()
            .is_some_and(|key| !key.trim().is_empty());
        if !has_key {
            warn!("session start refused: no API key");
            self.inner
                .set_transient_status(API_KEY_MISSING, TRANSIENT_STATUS_TTL);
            return false;
        }

        let initialized = self
            .adapter
            .call(ApiCall::InitializeSession {
                profile: selection.profile.clone(),
                language: selection.language.clone(),
            })
            .await;
        if let CallOutcome::Completed(Ok(reply)) = &initialized {
            if let Some(result) = reply.action().filter(|r| !r.success) {
                warn!(error = ?result.error, "host did not initialize the session");
            }
        }
        self.adapter
            .call(ApiCall::StartCapture {
                interval: selection.screenshot_interval.clone(),
                quality: selection.image_quality.clone(),
            })
            .await;

        {
            let mut state = self.inner.state();
            state.reconciler.reset();
            state.profile = selection.profile.clone();
            state.active = true;
            state.started_at = Some(Utc::now());
        }
        self.inner.reveal.reset();
        self.inner.observer.turns_changed(&[], None);
        info!(
            profile = %selection.profile,
            language = %selection.language,
            "session started"
        );
        true
    }

    /// Stop capture and close the host session. Close failures are ignored.
    pub async fn close(&self) {
        self.adapter.call(ApiCall::StopCapture).await;
        if let Err(err) = self.bridge.invoke("close-session", Vec::new()).await {
            debug!(error = %err, "close-session failed; ignoring");
        }
        self.inner.state().active = false;
        self.inner.reveal.cancel();
        info!("session closed");
    }

    pub async fn toggle_visibility(&self) -> Result<(), ChannelError> {
        self.bridge
            .invoke("toggle-window-visibility", Vec::new())
            .await
            .map(|_| ())
    }

    /// Send typed text to the model. Blank text is ignored.
    ///
    /// Returns true when the message went out (or was queued).
    pub async fn send_text(&self, text: &str) -> bool {
        let text = text.trim();
        if text.is_empty() {
            return false;
        }
        let outcome = self
            .adapter
            .call(ApiCall::SendTextMessage {
                text: text.to_string(),
            })
            .await;
        let failure = match outcome {
            CallOutcome::Queued { order_index } => {
                debug!(order_index, "text message queued until the api is bound");
                None
            }
            CallOutcome::Completed(Ok(reply)) => match reply.action() {
                Some(result) if result.success => None,
                Some(result) => Some(result.error.clone()),
                None => Some(None),
            },
            CallOutcome::Completed(Err(err)) => Some(Some(err.user_message())),
            CallOutcome::Ignored => Some(None),
        };

        match failure {
            None => {
                self.inner.state().reconciler.mark_awaiting_new_turn();
                self.inner
                    .set_transient_status(MESSAGE_SENT, TRANSIENT_STATUS_TTL);
                true
            }
            Some(error) => {
                let detail = error
                    .filter(|e| !e.is_empty())
                    .unwrap_or_else(|| "unknown".to_string());
                warn!(error = %detail, "send text failed");
                self.inner.set_transient_status(
                    &format!("Error sending message: {detail}"),
                    TRANSIENT_STATUS_TTL,
                );
                false
            }
        }
    }

    /// Step through turns without animation.
    pub fn navigate(&self, delta: isize) -> Option<usize> {
        self.inner.show(|reconciler| reconciler.navigate(delta))
    }

    pub fn select(&self, index: usize) -> Option<usize> {
        self.inner.show(|reconciler| reconciler.select(index))
    }

    /// Keep the active turn. Returns false if there is nothing new to save.
    pub fn save_active_turn(&self) -> bool {
        let (content, profile) = {
            let state = self.inner.state();
            match state.reconciler.active_turn() {
                Some(turn) if !turn.is_empty() => (turn.content.clone(), state.profile.clone()),
                _ => return false,
            }
        };
        let saved = self.saved.save(SavedResponse {
            response: content,
            timestamp: Utc::now(),
            profile,
        });
        if saved {
            debug!("response saved");
        }
        saved
    }

    pub fn is_active_turn_saved(&self) -> bool {
        let state = self.inner.state();
        state
            .reconciler
            .active_turn()
            .is_some_and(|turn| self.saved.contains(&turn.content))
    }

    pub fn saved_responses(&self) -> Vec<SavedResponse> {
        self.saved.list()
    }

    /// The active turn, or the profile's placeholder before any response.
    pub fn display_content(&self) -> String {
        let state = self.inner.state();
        match state.reconciler.active_turn() {
            Some(turn) => turn.content.clone(),
            None => profile::placeholder(&state.profile),
        }
    }

    pub fn turns(&self) -> Vec<Turn> {
        self.inner.state().reconciler.turns().to_vec()
    }

    pub fn active_index(&self) -> Option<usize> {
        self.inner.state().reconciler.active_index()
    }

    /// `i/N`, empty before the first turn.
    pub fn counter_label(&self) -> String {
        self.inner.state().reconciler.counter_label()
    }

    pub fn status(&self) -> String {
        self.inner.state().status.clone()
    }

    pub fn is_active(&self) -> bool {
        self.inner.state().active
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.inner.state().started_at
    }

    pub fn is_click_through(&self) -> bool {
        self.inner.state().click_through
    }

    pub fn reveal_state(&self) -> RevealState {
        self.inner.reveal.snapshot()
    }

    /// Words of the active turn that are visible right now.
    pub fn visible_words(&self) -> Vec<String> {
        let content = match self.inner.state().reconciler.active_turn() {
            Some(turn) => turn.content.clone(),
            None => return Vec::new(),
        };
        self.inner
            .reveal
            .visible_words(&content)
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    /// Cancel timers and release every listener. Idempotent.
    pub fn detach(&self) {
        self.inner.cancel_timers();
        let mut guard = match self.guard.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.release();
    }
}

impl Drop for AssistantSession {
    fn drop(&mut self) {
        self.detach();
    }
}

fn event_callback(channel: &'static str, inner: &Arc<SessionInner>) -> EventCallback {
    let weak = Arc::downgrade(inner);
    EventCallback::new(move |args: &[Value]| {
        let Some(inner) = weak.upgrade() else {
            return;
        };
        match channel {
            UPDATE_RESPONSE => {
                if let Some(fragment) = string_arg(channel, args) {
                    inner.on_response(&fragment);
                }
            }
            UPDATE_STATUS => {
                if let Some(status) = string_arg(channel, args) {
                    inner.on_status(&status);
                }
            }
            NAVIGATE_PREVIOUS => {
                inner.show(|reconciler| reconciler.navigate(-1));
            }
            NAVIGATE_NEXT => {
                inner.show(|reconciler| reconciler.navigate(1));
            }
            SCROLL_UP => inner.observer.scroll_requested(ScrollDirection::Up),
            SCROLL_DOWN => inner.observer.scroll_requested(ScrollDirection::Down),
            CLICK_THROUGH_TOGGLED => match args.first().and_then(Value::as_bool) {
                Some(enabled) => inner.on_click_through(enabled),
                None => warn!(channel, "expected a boolean payload"),
            },
            _ => debug!(channel, "event on unhandled channel"),
        }
    })
}

//! Incremental word reveal.
//!
//! The scheduler never owns content; each `render` hands it the active
//! turn's current text and it decides which words are visible now and which
//! are revealed later, one per stagger tick. Words already revealed for the
//! same turn stay visible across renders.
//!
//! Pending reveals run on a spawned task raced against a
//! `CancellationToken`. Every render or cancel bumps a generation counter;
//! a tick commits only if the generation it was spawned with is still
//! current, checked under the state lock.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use serde::Serialize;
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

pub const DEFAULT_STAGGER: Duration = Duration::from_millis(70);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Word(String),
    /// A whitespace run between words. Never a revealed unit.
    Space(String),
}

impl Token {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Word(s) | Self::Space(s) => s,
        }
    }

    pub fn is_word(&self) -> bool {
        matches!(self, Self::Word(_))
    }
}

/// Split `content` into alternating word and whitespace tokens.
pub fn tokenize(content: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_space: Option<bool> = None;

    for ch in content.chars() {
        let space = ch.is_whitespace();
        if in_space.is_some_and(|s| s != space) {
            tokens.push(make_token(std::mem::take(&mut current), !space));
        }
        in_space = Some(space);
        current.push(ch);
    }
    if let Some(space) = in_space {
        tokens.push(make_token(current, space));
    }
    tokens
}

fn make_token(text: String, space: bool) -> Token {
    if space {
        Token::Space(text)
    } else {
        Token::Word(text)
    }
}

pub fn word_count(content: &str) -> usize {
    content.split_whitespace().count()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevealMode {
    /// Everything visible at once; no completion signal.
    Instant,
    /// New words appear one per stagger tick.
    Animate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct RevealState {
    pub turn_index: Option<usize>,
    pub revealed_word_count: usize,
    pub total_words: usize,
}

impl RevealState {
    pub fn is_fully_revealed(&self) -> bool {
        self.revealed_word_count >= self.total_words
    }
}

/// Receives reveal progress. Called from the reveal task, never while the
/// scheduler's lock is held.
pub trait RevealObserver: Send + Sync {
    fn word_revealed(&self, turn_index: usize, word_index: usize);
    fn reveal_complete(&self, turn_index: usize);
}

pub struct NullRevealObserver;

impl RevealObserver for NullRevealObserver {
    fn word_revealed(&self, _turn_index: usize, _word_index: usize) {}
    fn reveal_complete(&self, _turn_index: usize) {}
}

#[derive(Default)]
struct SchedulerState {
    reveal: RevealState,
    generation: u64,
    pending: Option<CancellationToken>,
}

fn lock(state: &Mutex<SchedulerState>) -> MutexGuard<'_, SchedulerState> {
    match state.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

pub struct RevealScheduler {
    state: Arc<Mutex<SchedulerState>>,
    observer: Arc<dyn RevealObserver>,
    stagger: Duration,
    reduced_motion: bool,
}

impl RevealScheduler {
    pub fn new(observer: Arc<dyn RevealObserver>) -> Self {
        Self {
            state: Arc::new(Mutex::new(SchedulerState::default())),
            observer,
            stagger: DEFAULT_STAGGER,
            reduced_motion: false,
        }
    }

    pub fn with_stagger(mut self, stagger: Duration) -> Self {
        self.stagger = stagger;
        self
    }

    /// With reduced motion every render is instant.
    pub fn with_reduced_motion(mut self, reduced_motion: bool) -> Self {
        self.reduced_motion = reduced_motion;
        self
    }

    pub fn stagger(&self) -> Duration {
        self.stagger
    }

    /// Show `content` as turn `turn_index`. Cancels whatever the previous
    /// render still had pending, then returns the state right after the
    /// immediate part of this render.
    pub fn render(&self, turn_index: usize, content: &str, mode: RevealMode) -> RevealState {
        let total = word_count(content);
        let mode = if self.reduced_motion {
            RevealMode::Instant
        } else {
            mode
        };

        let mut state = lock(&self.state);
        state.generation += 1;
        if let Some(pending) = state.pending.take() {
            pending.cancel();
        }
        if state.reveal.turn_index != Some(turn_index) {
            state.reveal.turn_index = Some(turn_index);
            state.reveal.revealed_word_count = 0;
        }
        state.reveal.total_words = total;
        state.reveal.revealed_word_count = state.reveal.revealed_word_count.min(total);

        let start = state.reveal.revealed_word_count;
        if mode == RevealMode::Instant || start == total {
            state.reveal.revealed_word_count = total;
            return state.reveal;
        }

        let Ok(handle) = Handle::try_current() else {
            warn!(turn_index, "no async runtime; revealing instantly");
            state.reveal.revealed_word_count = total;
            let snapshot = state.reveal;
            drop(state);
            for word_index in start..total {
                self.observer.word_revealed(turn_index, word_index);
            }
            self.observer.reveal_complete(turn_index);
            return snapshot;
        };

        let cancel = CancellationToken::new();
        state.pending = Some(cancel.clone());
        let task = RevealTask {
            state: Arc::clone(&self.state),
            observer: Arc::clone(&self.observer),
            generation: state.generation,
            turn_index,
            start,
            total,
            stagger: self.stagger,
            cancel,
        };
        debug!(turn_index, start, total, "scheduling reveal");
        let snapshot = state.reveal;
        drop(state);
        handle.spawn(task.run());
        snapshot
    }

    /// Cancel pending reveals. Words already revealed stay revealed.
    pub fn cancel(&self) {
        let mut state = lock(&self.state);
        state.generation += 1;
        if let Some(pending) = state.pending.take() {
            pending.cancel();
        }
    }

    /// Cancel pending reveals and forget the rendered turn.
    pub fn reset(&self) {
        let mut state = lock(&self.state);
        state.generation += 1;
        if let Some(pending) = state.pending.take() {
            pending.cancel();
        }
        state.reveal = RevealState::default();
    }

    pub fn snapshot(&self) -> RevealState {
        lock(&self.state).reveal
    }

    pub fn has_pending(&self) -> bool {
        lock(&self.state).pending.is_some()
    }

    /// The currently visible words of `content`.
    pub fn visible_words<'a>(&self, content: &'a str) -> Vec<&'a str> {
        let revealed = self.snapshot().revealed_word_count;
        content.split_whitespace().take(revealed).collect()
    }
}

impl Drop for RevealScheduler {
    fn drop(&mut self) {
        self.cancel();
    }
}

struct RevealTask {
    state: Arc<Mutex<SchedulerState>>,
    observer: Arc<dyn RevealObserver>,
    generation: u64,
    turn_index: usize,
    start: usize,
    total: usize,
    stagger: Duration,
    cancel: CancellationToken,
}

impl RevealTask {
    async fn run(self) {
        let origin = tokio::time::Instant::now();
        for (step, word_index) in (self.start..self.total).enumerate() {
            let ticks = u32::try_from(step).unwrap_or(u32::MAX);
            let due = origin + self.stagger.saturating_mul(ticks);
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return,
                _ = tokio::time::sleep_until(due) => {}
            }
            if !self.commit(word_index + 1) {
                return;
            }
            self.observer.word_revealed(self.turn_index, word_index);
        }

        let current = {
            let mut state = lock(&self.state);
            let current = state.generation == self.generation;
            if current {
                state.pending = None;
            }
            current
        };
        if current {
            debug!(turn_index = self.turn_index, "reveal complete");
            self.observer.reveal_complete(self.turn_index);
        }
    }

    fn commit(&self, revealed: usize) -> bool {
        let mut state = lock(&self.state);
        if state.generation != self.generation {
            return false;
        }
        state.reveal.revealed_word_count = revealed;
        true
    }
}

//! Response stream reconciler.
//!
//! The host streams the full text of the current answer on every update,
//! with no turn ids. The reconciler decides, per fragment, whether it
//! replaces the open turn or starts a new one.
//!
//! Placement rules, in order:
//! 1. awaiting a new turn (the user just sent a prompt) or no turns yet:
//!    start a new turn;
//! 2. last turn still open: replace its content, filler included;
//! 3. last turn complete: start a new turn, filler included.
//!
//! Completion comes from outside (`apply_status`, `mark_last_complete`) and
//! only affects the next fragment.

use tracing::debug;

use crate::filler::{is_completion_status, FillerPolicy};
use crate::turn::Turn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    NewTurn,
    Replaced,
}

/// Outcome of applying one fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reconciled {
    pub placement: Placement,
    pub active_index: Option<usize>,
    pub filler: bool,
}

#[derive(Debug, Default)]
pub struct ResponseReconciler {
    policy: FillerPolicy,
    turns: Vec<Turn>,
    active: Option<usize>,
    awaiting_new_turn: bool,
}

impl ResponseReconciler {
    pub fn new(policy: FillerPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    pub fn apply_fragment(&mut self, fragment: &str) -> Reconciled {
        let filler = self.policy.is_filler(fragment);

        let placement = if self.awaiting_new_turn || self.turns.is_empty() {
            self.awaiting_new_turn = false;
            self.push_turn(fragment);
            Placement::NewTurn
        } else if let Some(last) = self.turns.last_mut().filter(|t| !t.complete) {
            last.content = fragment.to_string();
            Placement::Replaced
        } else {
            self.push_turn(fragment);
            Placement::NewTurn
        };

        debug!(
            ?placement,
            filler,
            turns = self.turns.len(),
            active = ?self.active,
            "fragment reconciled"
        );
        Reconciled {
            placement,
            active_index: self.active,
            filler,
        }
    }

    fn push_turn(&mut self, fragment: &str) {
        if let Some(prev) = self.turns.last_mut() {
            prev.complete = true;
        }
        let index = self.turns.len();
        self.turns.push(Turn::open(index, fragment));
        self.active = Some(index);
    }

    /// The next fragment starts a fresh turn regardless of completeness.
    pub fn mark_awaiting_new_turn(&mut self) {
        self.awaiting_new_turn = true;
    }

    pub fn is_awaiting_new_turn(&self) -> bool {
        self.awaiting_new_turn
    }

    pub fn mark_last_complete(&mut self) {
        if let Some(last) = self.turns.last_mut() {
            last.complete = true;
        }
    }

    /// Feed a host status line. Returns true if it completed the last turn.
    pub fn apply_status(&mut self, status: &str) -> bool {
        if !is_completion_status(status) {
            return false;
        }
        self.mark_last_complete();
        true
    }

    /// Display the turn at `index`. Out-of-range indices are ignored.
    pub fn select(&mut self, index: usize) -> Option<usize> {
        if index < self.turns.len() {
            self.active = Some(index);
        }
        self.active
    }

    /// Move the active index by `delta`, clamped to the turn list.
    pub fn navigate(&mut self, delta: isize) -> Option<usize> {
        let Some(current) = self.active else {
            return None;
        };
        let last = self.turns.len().saturating_sub(1);
        let target = current.saturating_add_signed(delta).min(last);
        self.active = Some(target);
        self.active
    }

    pub fn reset(&mut self) {
        self.turns.clear();
        self.active = None;
        self.awaiting_new_turn = false;
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn active_index(&self) -> Option<usize> {
        self.active
    }

    pub fn active_turn(&self) -> Option<&Turn> {
        self.active.and_then(|i| self.turns.get(i))
    }

    /// `"i/N"` with a 1-based position, or empty when there are no turns.
    pub fn counter_label(&self) -> String {
        match self.active {
            Some(i) if !self.turns.is_empty() => format!("{}/{}", i + 1, self.turns.len()),
            _ => String::new(),
        }
    }

    pub fn policy(&self) -> &FillerPolicy {
        &self.policy
    }
}

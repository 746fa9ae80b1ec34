//! cheddar-stream: turns from an id-less fragment stream, and their
//! word-by-word reveal.
//!
//! - `ResponseReconciler` places each fragment into the turn list
//! - `FillerPolicy` decides which short fragments may not start a turn
//! - `RevealScheduler` animates visibility of committed turn content

pub mod filler;
pub mod reconciler;
pub mod reveal;
pub mod turn;

pub use filler::FillerPolicy;
pub use reconciler::{Placement, Reconciled, ResponseReconciler};
pub use reveal::{tokenize, RevealMode, RevealObserver, RevealScheduler, RevealState, Token};
pub use turn::Turn;

/// Stable crate label used for bootstrap smoke tests.
pub fn crate_label() -> &'static str {
    "cheddar-stream"
}

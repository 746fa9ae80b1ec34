//! Fault recording for contained failures.
//!
//! Faults are failures the system swallows on purpose: a listener callback
//! that panicked, or a queued call that failed during replay. They are logged
//! where they happen and also handed to a `FaultSink` so tests and
//! diagnostics can inspect them.

use std::any::Any;
use std::sync::Mutex;

use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultKind {
    /// An event subscriber callback panicked.
    HandlerFault,
    /// A queued call failed while being replayed.
    ReplayFault,
}

impl std::fmt::Display for FaultKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::HandlerFault => "handler_fault",
            Self::ReplayFault => "replay_fault",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone)]
pub struct BridgeFault {
    pub timestamp: DateTime<Utc>,
    pub kind: FaultKind,
    /// Channel or operation name the fault occurred on.
    pub source: String,
    pub detail: String,
}

impl BridgeFault {
    pub fn new(kind: FaultKind, source: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            kind,
            source: source.into(),
            detail: detail.into(),
        }
    }
}

pub trait FaultSink: Send + Sync {
    fn record(&self, fault: BridgeFault);
}

/// In-memory fault sink for testing.
#[derive(Default)]
pub struct InMemoryFaultSink {
    faults: Mutex<Vec<BridgeFault>>,
}

impl InMemoryFaultSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn faults(&self) -> Vec<BridgeFault> {
        match self.faults.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn count(&self) -> usize {
        match self.faults.lock() {
            Ok(guard) => guard.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    pub fn count_of(&self, kind: FaultKind) -> usize {
        self.faults().iter().filter(|f| f.kind == kind).count()
    }
}

impl FaultSink for InMemoryFaultSink {
    fn record(&self, fault: BridgeFault) {
        match self.faults.lock() {
            Ok(mut guard) => guard.push(fault),
            Err(poisoned) => poisoned.into_inner().push(fault),
        }
    }
}

/// No-op sink. Faults are still logged at the point of failure.
pub struct NullFaultSink;

impl FaultSink for NullFaultSink {
    fn record(&self, _fault: BridgeFault) {}
}

/// Best-effort text of a panic payload.
pub fn panic_detail(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        return (*s).to_string();
    }
    if let Some(s) = payload.downcast_ref::<String>() {
        return s.clone();
    }
    "non-string panic payload".to_string()
}

//! Capability adapter: queue calls until an implementation is bound.
//!
//! Unbound, every call becomes a `QueuedCall` and returns at once. `bind`
//! installs an implementation and replays the queue in insertion order;
//! calls that arrive while a replay runs join the back of the queue and are
//! replayed by the same `bind`. Each call leaves the queue before it runs,
//! so nothing replays twice.
//!
//! Calls run on a spawned task so a panicking implementation surfaces as
//! `ApiError::Panicked` rather than unwinding into the caller.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use cheddar_bridge::fault::{panic_detail, BridgeFault, FaultKind, FaultSink, NullFaultSink};
use serde_json::Value;
use tracing::{debug, error, info};

use crate::api::{dispatch, CheddarApi};
use crate::call::{ApiCall, QueuedCall};
use crate::error::ApiError;
use crate::reply::ApiReply;

#[derive(Debug)]
pub enum CallOutcome {
    /// No implementation yet; the call waits in the queue.
    Queued { order_index: u64 },
    Completed(Result<ApiReply, ApiError>),
    /// Unknown operation name; accepted and dropped.
    Ignored,
}

impl CallOutcome {
    pub fn is_queued(&self) -> bool {
        matches!(self, Self::Queued { .. })
    }

    /// The reply, when the call ran.
    pub fn into_result(self) -> Option<Result<ApiReply, ApiError>> {
        match self {
            Self::Completed(result) => Some(result),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplayReport {
    pub replayed: usize,
    pub faults: usize,
}

#[derive(Default)]
struct AdapterState {
    implementation: Option<Arc<dyn CheddarApi>>,
    pending: VecDeque<QueuedCall>,
    next_order: u64,
    replaying: bool,
}

pub struct CapabilityAdapter {
    state: Mutex<AdapterState>,
    faults: Arc<dyn FaultSink>,
}

impl Default for CapabilityAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl CapabilityAdapter {
    pub fn new() -> Self {
        Self::with_fault_sink(Arc::new(NullFaultSink))
    }

    pub fn with_fault_sink(faults: Arc<dyn FaultSink>) -> Self {
        Self {
            state: Mutex::new(AdapterState::default()),
            faults,
        }
    }

    fn state(&self) -> MutexGuard<'_, AdapterState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Run `call` now if bound and idle, otherwise queue it.
    pub async fn call(&self, call: ApiCall) -> CallOutcome {
        let implementation = {
            let mut state = self.state();
            let ready = if state.replaying {
                None
            } else {
                state.implementation.clone()
            };
            match ready {
                Some(implementation) => implementation,
                None => {
                    let order_index = state.next_order;
                    state.next_order += 1;
                    debug!(operation = call.name(), order_index, "call queued");
                    state.pending.push_back(QueuedCall { call, order_index });
                    return CallOutcome::Queued { order_index };
                }
            }
        };
        debug!(operation = call.name(), "call dispatched");
        CallOutcome::Completed(run_contained(implementation, call).await)
    }

    /// Like `call`, for callers that only have an operation name.
    pub async fn call_by_name(&self, name: &str, args: &[Value]) -> CallOutcome {
        match ApiCall::from_name(name, args) {
            Some(call) => self.call(call).await,
            None => {
                debug!(operation = name, "unknown operation ignored");
                CallOutcome::Ignored
            }
        }
    }

    /// Install `implementation` and replay everything queued, in order.
    ///
    /// If another `bind` is already replaying, this only swaps the
    /// implementation; the running replay picks it up for the calls it has
    /// not started yet.
    pub async fn bind(&self, implementation: Arc<dyn CheddarApi>) -> ReplayReport {
        {
            let mut state = self.state();
            state.implementation = Some(implementation);
            if state.replaying {
                debug!("implementation replaced during replay");
                return ReplayReport::default();
            }
            state.replaying = true;
        }
        let mut flag = ReplayingFlag {
            state: &self.state,
            armed: true,
        };

        let mut report = ReplayReport::default();
        loop {
            let (queued, implementation) = {
                let mut state = self.state();
                let implementation = state.implementation.clone();
                let next = match (state.pending.pop_front(), implementation) {
                    (Some(queued), Some(implementation)) => Some((queued, implementation)),
                    _ => None,
                };
                let Some(next) = next else {
                    // Cleared under the lock that observed the empty queue.
                    state.replaying = false;
                    flag.armed = false;
                    break;
                };
                next
            };
            let operation = queued.call.name();
            report.replayed += 1;
            if let Err(err) = run_contained(implementation, queued.call).await {
                report.faults += 1;
                error!(operation, order_index = queued.order_index, error = %err, "replayed call failed");
                self.faults.record(BridgeFault::new(
                    FaultKind::ReplayFault,
                    operation,
                    err.to_string(),
                ));
            }
        }
        info!(replayed = report.replayed, faults = report.faults, "capability bound");
        report
    }

    pub fn is_bound(&self) -> bool {
        self.state().implementation.is_some()
    }

    /// Snapshot of calls still waiting, in replay order.
    pub fn pending(&self) -> Vec<QueuedCall> {
        self.state().pending.iter().cloned().collect()
    }
}

/// Clears the replaying flag if `bind` is dropped mid-replay.
struct ReplayingFlag<'a> {
    state: &'a Mutex<AdapterState>,
    armed: bool,
}

impl Drop for ReplayingFlag<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        match self.state.lock() {
            Ok(mut state) => state.replaying = false,
            Err(poisoned) => poisoned.into_inner().replaying = false,
        }
    }
}

async fn run_contained(implementation: Arc<dyn CheddarApi>, call: ApiCall) -> Result<ApiReply, ApiError> {
    let operation = call.name();
    let task = tokio::spawn(async move { dispatch(implementation.as_ref(), &call).await });
    match task.await {
        Ok(result) => result,
        Err(join_err) => {
            let detail = if join_err.is_panic() {
                panic_detail(join_err.into_panic().as_ref())
            } else {
                join_err.to_string()
            };
            Err(ApiError::Panicked {
                operation: operation.to_string(),
                detail,
            })
        }
    }
}

//! The channel bridge: capability-scoped access to the host transport.

use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use serde_json::Value;
use tracing::{debug, error, warn};

use crate::error::ChannelError;
use crate::fault::{panic_detail, BridgeFault, FaultKind, FaultSink, NullFaultSink};
use crate::multiplexer::{CallbackKey, EventCallback, HandleToken, ListenerMultiplexer, Release};
use crate::redact::redact_args;
use crate::transport::{HostTransport, TransportEvent, TransportHandler};

/// Host platform hints exposed to the display surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Platform {
    pub os: String,
}

impl Platform {
    pub fn current() -> Self {
        Self {
            os: std::env::consts::OS.to_string(),
        }
    }

    pub fn is_macos(&self) -> bool {
        self.os == "macos"
    }

    pub fn is_linux(&self) -> bool {
        self.os == "linux"
    }
}

struct BridgeInner {
    transport: Option<Arc<dyn HostTransport>>,
    multiplexer: Mutex<ListenerMultiplexer>,
    faults: Arc<dyn FaultSink>,
    platform: Platform,
}

impl BridgeInner {
    fn mux(&self) -> MutexGuard<'_, ListenerMultiplexer> {
        match self.multiplexer.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn release(&self, channel: &str, key: CallbackKey, token: HandleToken) {
        let released = self.mux().release(channel, key, token);
        match released {
            Release::Removed(listener) => {
                if let Some(transport) = &self.transport {
                    transport.remove_listener(channel, listener);
                }
                debug!(channel, "listener removed");
            }
            Release::Retained => debug!(channel, "subscription handle released"),
            Release::Stale => {}
        }
    }
}

/// The only path between the display surface and the host.
///
/// Cheap to clone; clones share the transport and listener bookkeeping.
#[derive(Clone)]
pub struct ChannelBridge {
    inner: Arc<BridgeInner>,
}

impl ChannelBridge {
    /// Bridge over a live transport.
    pub fn new(transport: Arc<dyn HostTransport>) -> Self {
        Self::with_fault_sink(Some(transport), Arc::new(NullFaultSink))
    }

    /// Bridge with no host behind it. Every call degrades to a no-op or an
    /// `Unavailable` error.
    pub fn unavailable() -> Self {
        Self::with_fault_sink(None, Arc::new(NullFaultSink))
    }

    pub fn with_fault_sink(
        transport: Option<Arc<dyn HostTransport>>,
        faults: Arc<dyn FaultSink>,
    ) -> Self {
        Self {
            inner: Arc::new(BridgeInner {
                transport,
                multiplexer: Mutex::new(ListenerMultiplexer::new()),
                faults,
                platform: Platform::current(),
            }),
        }
    }

    pub fn is_available(&self) -> bool {
        self.inner.transport.is_some()
    }

    pub fn platform(&self) -> &Platform {
        &self.inner.platform
    }

    /// Request/response call to the host.
    pub async fn invoke(&self, channel: &str, args: Vec<Value>) -> Result<Value, ChannelError> {
        let Some(transport) = self.inner.transport.clone() else {
            debug!(channel, "invoke without host bridge");
            return Err(ChannelError::Unavailable {
                channel: channel.to_string(),
            });
        };
        debug!(channel, args = %redact_args(&args), "invoke");
        let result = transport.invoke(channel, args).await;
        if let Err(err) = &result {
            warn!(channel, error = %err, "invoke failed");
        }
        result
    }

    /// Fire-and-forget message to the host.
    pub fn send(&self, channel: &str, args: Vec<Value>) {
        match &self.inner.transport {
            Some(transport) => {
                debug!(channel, args = %redact_args(&args), "send");
                transport.send(channel, args);
            }
            None => debug!(channel, "send without host bridge dropped"),
        }
    }

    /// Register `callback` for events on `channel`.
    ///
    /// Dropping the returned `Subscription` (or calling `unsubscribe`) removes
    /// exactly this registration.
    pub fn subscribe(&self, channel: &str, callback: EventCallback) -> Subscription {
        let Some(transport) = &self.inner.transport else {
            debug!(channel, "subscribe without host bridge ignored");
            return Subscription::inert(channel);
        };

        let mut mux = self.inner.mux();
        if let Some(token) = mux.add_handle(channel, &callback) {
            debug!(channel, "callback already registered; sharing listener");
            return Subscription::live(&self.inner, channel, callback.key(), token);
        }

        let handler = guarded_handler(channel, callback.clone(), Arc::clone(&self.inner.faults));
        let listener = transport.add_listener(channel, handler);
        let key = callback.key();
        let token = mux.insert(channel, callback, listener);
        debug!(channel, listener = listener.0, "listener added");
        Subscription::live(&self.inner, channel, key, token)
    }

    /// Remove the registration of `callback` on `channel`, all handles included.
    pub fn remove_listener(&self, channel: &str, callback: &EventCallback) {
        let removed = self.inner.mux().remove_callback(channel, callback);
        if let (Some(listener), Some(transport)) = (removed, &self.inner.transport) {
            transport.remove_listener(channel, listener);
        }
    }

    /// Remove every registration on `channel`, however it was added.
    pub fn unsubscribe_all(&self, channel: &str) {
        let cleared = self.inner.mux().clear(channel);
        if let Some(transport) = &self.inner.transport {
            transport.remove_all_listeners(channel);
        }
        debug!(channel, cleared = cleared.len(), "all listeners removed");
    }

    /// Live transport listeners this bridge owns on `channel`.
    pub fn live_listener_count(&self, channel: &str) -> usize {
        self.inner.mux().live_count(channel)
    }

    /// Outstanding subscription handles for `callback` on `channel`.
    pub fn handle_count(&self, channel: &str, callback: &EventCallback) -> usize {
        self.inner.mux().handle_count(channel, callback)
    }

    /// Channels with at least one live registration.
    pub fn subscribed_channels(&self) -> Vec<String> {
        self.inner.mux().channels()
    }
}

fn guarded_handler(
    channel: &str,
    callback: EventCallback,
    faults: Arc<dyn FaultSink>,
) -> TransportHandler {
    let channel = channel.to_string();
    Arc::new(move |_event: &TransportEvent, args: &[Value]| {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| callback.call(args)));
        if let Err(payload) = outcome {
            let detail = panic_detail(payload.as_ref());
            error!(channel = %channel, %detail, "event listener panicked");
            faults.record(BridgeFault::new(
                FaultKind::HandlerFault,
                channel.as_str(),
                detail,
            ));
        }
    })
}

/// Handle for one `subscribe` call.
#[must_use = "dropping a Subscription unsubscribes it"]
pub struct Subscription {
    channel: String,
    live: Option<LiveHandle>,
}

struct LiveHandle {
    bridge: Weak<BridgeInner>,
    key: CallbackKey,
    token: HandleToken,
}

impl Subscription {
    fn inert(channel: &str) -> Self {
        Self {
            channel: channel.to_string(),
            live: None,
        }
    }

    fn live(inner: &Arc<BridgeInner>, channel: &str, key: CallbackKey, token: HandleToken) -> Self {
        Self {
            channel: channel.to_string(),
            live: Some(LiveHandle {
                bridge: Arc::downgrade(inner),
                key,
                token,
            }),
        }
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// False when the bridge was unavailable at subscribe time or the
    /// handle was already released.
    pub fn is_live(&self) -> bool {
        self.live.is_some()
    }

    /// Release this registration. Calling it again is a no-op.
    pub fn unsubscribe(&mut self) {
        if let Some(handle) = self.live.take() {
            if let Some(inner) = handle.bridge.upgrade() {
                inner.release(&self.channel, handle.key, handle.token);
            }
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("channel", &self.channel)
            .field("live", &self.is_live())
            .finish()
    }
}

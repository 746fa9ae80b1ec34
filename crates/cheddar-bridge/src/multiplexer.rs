//! Listener multiplexer: per-channel bookkeeping from caller callbacks to
//! transport listeners.
//!
//! A callback's identity is its `Arc` allocation. While a registration is live
//! the multiplexer holds a clone of the callback, so the address cannot be
//! reused by another callback.
//!
//! Each `(channel, callback)` pair owns at most one transport listener.
//! Subscribing the same callback again adds a handle to the existing
//! registration instead of a second listener; the listener is removed when the
//! last handle is released.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::transport::ListenerId;

type CallbackFn = dyn Fn(&[Value]) + Send + Sync;

/// A caller-supplied event callback. Receives the event payload only.
#[derive(Clone)]
pub struct EventCallback(Arc<CallbackFn>);

impl EventCallback {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&[Value]) + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    pub(crate) fn key(&self) -> CallbackKey {
        CallbackKey(Arc::as_ptr(&self.0).cast::<()>() as usize)
    }

    pub(crate) fn call(&self, args: &[Value]) {
        (self.0)(args)
    }

    /// Whether two callbacks are the same registration identity.
    pub fn same_as(&self, other: &EventCallback) -> bool {
        self.key() == other.key()
    }
}

impl fmt::Debug for EventCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EventCallback({:#x})", self.key().0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct CallbackKey(usize);

/// Token identifying one `subscribe` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandleToken(u64);

/// Result of releasing a handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Release {
    /// The handle was already released or its registration was cleared.
    Stale,
    /// Other handles still keep the registration alive.
    Retained,
    /// Last handle gone; the caller must remove this transport listener.
    Removed(ListenerId),
}

struct Registration {
    // Held so the callback allocation outlives its key.
    _callback: EventCallback,
    listener: ListenerId,
    handles: Vec<HandleToken>,
}

#[derive(Default)]
pub struct ListenerMultiplexer {
    channels: HashMap<String, HashMap<CallbackKey, Registration>>,
    next_handle: u64,
}

impl ListenerMultiplexer {
    pub fn new() -> Self {
        Self::default()
    }

    fn issue_handle(&mut self) -> HandleToken {
        self.next_handle += 1;
        HandleToken(self.next_handle)
    }

    /// Add a handle to an existing registration, if there is one.
    pub(crate) fn add_handle(&mut self, channel: &str, callback: &EventCallback) -> Option<HandleToken> {
        let key = callback.key();
        if !self
            .channels
            .get(channel)
            .is_some_and(|regs| regs.contains_key(&key))
        {
            return None;
        }
        let token = self.issue_handle();
        if let Some(reg) = self
            .channels
            .get_mut(channel)
            .and_then(|regs| regs.get_mut(&key))
        {
            reg.handles.push(token);
        }
        Some(token)
    }

    /// Record a fresh registration backed by `listener`.
    pub(crate) fn insert(
        &mut self,
        channel: &str,
        callback: EventCallback,
        listener: ListenerId,
    ) -> HandleToken {
        let token = self.issue_handle();
        let key = callback.key();
        self.channels.entry(channel.to_string()).or_default().insert(
            key,
            Registration {
                _callback: callback,
                listener,
                handles: vec![token],
            },
        );
        token
    }

    pub(crate) fn release(&mut self, channel: &str, key: CallbackKey, token: HandleToken) -> Release {
        let Some(regs) = self.channels.get_mut(channel) else {
            return Release::Stale;
        };
        let Some(reg) = regs.get_mut(&key) else {
            return Release::Stale;
        };
        let Some(pos) = reg.handles.iter().position(|h| *h == token) else {
            return Release::Stale;
        };
        reg.handles.remove(pos);
        if !reg.handles.is_empty() {
            return Release::Retained;
        }
        let listener = reg.listener;
        regs.remove(&key);
        if regs.is_empty() {
            self.channels.remove(channel);
        }
        Release::Removed(listener)
    }

    /// Drop the registration of `callback` on `channel`, whatever its handle count.
    pub(crate) fn remove_callback(&mut self, channel: &str, callback: &EventCallback) -> Option<ListenerId> {
        let regs = self.channels.get_mut(channel)?;
        let reg = regs.remove(&callback.key())?;
        if regs.is_empty() {
            self.channels.remove(channel);
        }
        Some(reg.listener)
    }

    /// Drop every registration on `channel`, returning their listeners.
    pub(crate) fn clear(&mut self, channel: &str) -> Vec<ListenerId> {
        let mut listeners: Vec<ListenerId> = self
            .channels
            .remove(channel)
            .map(|regs| regs.into_values().map(|r| r.listener).collect())
            .unwrap_or_default();
        listeners.sort();
        listeners
    }

    /// Number of live transport listeners owned for `channel`.
    pub fn live_count(&self, channel: &str) -> usize {
        self.channels.get(channel).map_or(0, HashMap::len)
    }

    /// Number of outstanding handles for `callback` on `channel`.
    pub fn handle_count(&self, channel: &str, callback: &EventCallback) -> usize {
        self.channels
            .get(channel)
            .and_then(|regs| regs.get(&callback.key()))
            .map_or(0, |reg| reg.handles.len())
    }

    /// Channels with at least one live registration, sorted.
    pub fn channels(&self) -> Vec<String> {
        let mut names: Vec<String> = self.channels.keys().cloned().collect();
        names.sort();
        names
    }
}

//! In-process host transport.
//!
//! `LoopbackHost` plays the host side without any IPC: invoke handlers are
//! plain closures, sends are recorded, and `emit` pushes events to the
//! registered listeners. Used by tests and the replay tool.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::error::ChannelError;
use crate::transport::{HostTransport, ListenerId, TransportEvent, TransportHandler};

type InvokeHandler = Arc<dyn Fn(Vec<Value>) -> Result<Value, String> + Send + Sync>;

/// A fire-and-forget message received by the loopback host.
#[derive(Debug, Clone, PartialEq)]
pub struct SentMessage {
    pub channel: String,
    pub args: Vec<Value>,
}

#[derive(Default)]
struct LoopbackState {
    handlers: HashMap<String, InvokeHandler>,
    listeners: HashMap<String, Vec<(ListenerId, TransportHandler)>>,
    sent: Vec<SentMessage>,
    invocations: Vec<SentMessage>,
    next_listener: u64,
    next_sequence: u64,
}

pub struct LoopbackHost {
    state: Mutex<LoopbackState>,
    sender_id: u32,
}

impl Default for LoopbackHost {
    fn default() -> Self {
        Self::new()
    }
}

impl LoopbackHost {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(LoopbackState::default()),
            sender_id: 1,
        }
    }

    fn state(&self) -> MutexGuard<'_, LoopbackState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Install the invoke handler for `channel`, replacing any previous one.
    /// `Err(message)` is surfaced to the caller as `InvokeRejected`.
    pub fn handle<F>(&self, channel: &str, handler: F)
    where
        F: Fn(Vec<Value>) -> Result<Value, String> + Send + Sync + 'static,
    {
        self.state()
            .handlers
            .insert(channel.to_string(), Arc::new(handler));
    }

    /// Deliver an event to every listener on `channel`, in registration
    /// order. Returns the number of listeners reached.
    pub fn emit(&self, channel: &str, args: Vec<Value>) -> usize {
        let (event, listeners) = {
            let mut state = self.state();
            state.next_sequence += 1;
            let event = TransportEvent {
                channel: channel.to_string(),
                sequence: state.next_sequence,
                sender_id: self.sender_id,
            };
            let listeners: Vec<TransportHandler> = state
                .listeners
                .get(channel)
                .map(|list| list.iter().map(|(_, h)| Arc::clone(h)).collect())
                .unwrap_or_default();
            (event, listeners)
        };
        debug!(channel, sequence = event.sequence, listeners = listeners.len(), "emit");
        for listener in &listeners {
            listener(&event, &args);
        }
        listeners.len()
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.state().sent.clone()
    }

    /// Sends on `channel` only, in order.
    pub fn sent_on(&self, channel: &str) -> Vec<Vec<Value>> {
        self.state()
            .sent
            .iter()
            .filter(|m| m.channel == channel)
            .map(|m| m.args.clone())
            .collect()
    }

    pub fn invocations(&self) -> Vec<SentMessage> {
        self.state().invocations.clone()
    }

    pub fn listener_count(&self, channel: &str) -> usize {
        self.state().listeners.get(channel).map_or(0, Vec::len)
    }
}

#[async_trait]
impl HostTransport for LoopbackHost {
    async fn invoke(&self, channel: &str, args: Vec<Value>) -> Result<Value, ChannelError> {
        let handler = {
            let mut state = self.state();
            state.invocations.push(SentMessage {
                channel: channel.to_string(),
                args: args.clone(),
            });
            state.handlers.get(channel).cloned()
        };
        let Some(handler) = handler else {
            return Err(ChannelError::Transport {
                channel: channel.to_string(),
                message: "no handler registered".to_string(),
            });
        };
        handler(args).map_err(|message| ChannelError::InvokeRejected {
            channel: channel.to_string(),
            message,
        })
    }

    fn send(&self, channel: &str, args: Vec<Value>) {
        self.state().sent.push(SentMessage {
            channel: channel.to_string(),
            args,
        });
    }

    fn add_listener(&self, channel: &str, handler: TransportHandler) -> ListenerId {
        let mut state = self.state();
        state.next_listener += 1;
        let id = ListenerId(state.next_listener);
        state
            .listeners
            .entry(channel.to_string())
            .or_default()
            .push((id, handler));
        id
    }

    fn remove_listener(&self, channel: &str, id: ListenerId) {
        let mut state = self.state();
        if let Some(list) = state.listeners.get_mut(channel) {
            list.retain(|(existing, _)| *existing != id);
            if list.is_empty() {
                state.listeners.remove(channel);
            }
        }
    }

    fn remove_all_listeners(&self, channel: &str) {
        self.state().listeners.remove(channel);
    }
}

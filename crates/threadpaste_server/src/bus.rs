//! In-process pub/sub bus keyed by channel name.
//!
//! Each channel owns a `tokio::sync::broadcast` sender created lazily on the
//! first subscription. Publishing to a channel nobody listens on is a no-op.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use threadpaste_core::{PublishError, Publisher};
use tokio::sync::broadcast;

/// Broadcast bus backing the WebSocket reply streams.
pub struct ChannelBus {
    capacity: usize,
    channels: Mutex<HashMap<String, broadcast::Sender<serde_json::Value>>>,
}

impl ChannelBus {
    /// Create a bus whose channels buffer up to `capacity` payloads.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            channels: Mutex::new(HashMap::new()),
        }
    }

    fn lock(
        &self,
    ) -> Result<MutexGuard<'_, HashMap<String, broadcast::Sender<serde_json::Value>>>, PublishError>
    {
        self.channels
            .lock()
            .map_err(|_| PublishError::Transport("channel bus state is poisoned".to_string()))
    }

    /// Subscribe to `channel`, creating it if needed.
    ///
    /// # Returns
    /// A receiver that sees every payload published after this call.
    ///
    /// # Errors
    /// Returns [`PublishError::Transport`] if the bus state is poisoned.
    pub fn subscribe(
        &self,
        channel: &str,
    ) -> Result<broadcast::Receiver<serde_json::Value>, PublishError> {
        let mut channels = self.lock()?;
        // Sweep channels whose receivers were dropped without `release`.
        channels.retain(|_, tx| tx.receiver_count() > 0);
        let sender = channels
            .entry(channel.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0);
        Ok(sender.subscribe())
    }

    /// Drop a receiver obtained from [`ChannelBus::subscribe`], removing
    /// `channel` once its last receiver is gone.
    pub fn release(&self, channel: &str, rx: broadcast::Receiver<serde_json::Value>) {
        drop(rx);
        let Ok(mut channels) = self.lock() else {
            return;
        };
        if channels
            .get(channel)
            .is_some_and(|tx| tx.receiver_count() == 0)
        {
            channels.remove(channel);
        }
    }

    /// Number of channels currently held by the bus.
    pub fn channel_count(&self) -> usize {
        self.lock().map(|channels| channels.len()).unwrap_or(0)
    }

    /// Number of live receivers on `channel`.
    pub fn subscriber_count(&self, channel: &str) -> usize {
        self.lock()
            .ok()
            .and_then(|channels| channels.get(channel).map(|tx| tx.receiver_count()))
            .unwrap_or(0)
    }
}

impl Publisher for ChannelBus {
    fn publish(&self, channel: &str, payload: &serde_json::Value) -> Result<usize, PublishError> {
        let mut channels = self.lock()?;
        let Some(sender) = channels.get(channel) else {
            return Ok(0);
        };
        match sender.send(payload.clone()) {
            Ok(receivers) => Ok(receivers),
            Err(_) => {
                // Every receiver has gone away.
                channels.remove(channel);
                Ok(0)
            }
        }
    }
}

//! Reply notifications: channel keys, payloads and the publish seam.
//!
//! Delivery is fire-and-forget. Subscribers that are not connected when a
//! reply is published never see it, and failures never reach the caller.

use crate::constants::{THREAD_CHANNEL_PREFIX, USER_CHANNEL_PREFIX};
use crate::models::paste::Paste;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// A named pub/sub destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    /// Everyone watching a paste's reply thread.
    Thread(u64),
    /// A user's personal channel.
    User(u64),
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Thread(id) => write!(f, "{}:{}", THREAD_CHANNEL_PREFIX, id),
            Self::User(id) => write!(f, "{}:{}", USER_CHANNEL_PREFIX, id),
        }
    }
}

/// Payload published when a paste receives a reply.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ReplyNotice {
    pub paste_id: u64,
    pub reply_id: u64,
    /// Display name of the reply's author, `null` for anonymous replies.
    pub author: Option<String>,
}

impl ReplyNotice {
    pub fn new(parent: &Paste, reply: &Paste) -> Self {
        Self {
            paste_id: parent.id,
            reply_id: reply.id,
            author: reply
                .author
                .as_ref()
                .map(|author| author.display_name.clone()),
        }
    }
}

/// Errors a transport may report for a single publish.
#[derive(Error, Debug)]
pub enum PublishError {
    #[error("Payload encoding failed: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Transport unavailable: {0}")]
    Transport(String),
}

/// Minimal publish capability of a pub/sub bus.
pub trait Publisher: Send + Sync {
    /// Publish `payload` to every subscriber currently on `channel`.
    ///
    /// # Returns
    /// Number of subscribers the payload was handed to.
    fn publish(&self, channel: &str, payload: &serde_json::Value) -> Result<usize, PublishError>;
}

/// Fans a reply out to the parent's thread and the parent author's channel.
#[derive(Clone)]
pub struct ReplyNotifier {
    publisher: Arc<dyn Publisher>,
}

impl ReplyNotifier {
    pub fn new(publisher: Arc<dyn Publisher>) -> Self {
        Self { publisher }
    }

    /// Channels interested in a reply to `parent`.
    pub fn channels_for(parent: &Paste) -> Vec<Channel> {
        let mut channels = vec![Channel::Thread(parent.id)];
        if let Some(author_id) = parent.author_id() {
            channels.push(Channel::User(author_id));
        }
        channels
    }

    /// Publish a [`ReplyNotice`] for `reply` to every interested channel.
    ///
    /// Must only be called after `reply` is durably stored. Publish failures
    /// are logged and otherwise ignored.
    ///
    /// # Returns
    /// Channels the notice was handed to without a transport error.
    pub fn notify_reply(&self, parent: &Paste, reply: &Paste) -> Vec<Channel> {
        let notice = ReplyNotice::new(parent, reply);
        let payload = match serde_json::to_value(&notice) {
            Ok(payload) => payload,
            Err(err) => {
                tracing::warn!("Failed to encode reply notice for paste {}: {}", reply.id, err);
                return Vec::new();
            }
        };

        let mut delivered = Vec::new();
        for channel in Self::channels_for(parent) {
            let key = channel.to_string();
            match self.publisher.publish(&key, &payload) {
                Ok(receivers) => {
                    tracing::debug!(
                        channel = %key,
                        receivers,
                        "Published reply {} to paste {}",
                        reply.id,
                        parent.id
                    );
                    delivered.push(channel);
                }
                Err(err) => {
                    tracing::warn!(channel = %key, "Failed to publish reply notice: {}", err);
                }
            }
        }
        delivered
    }
}

use std::collections::{HashMap, HashSet};

use tokio::sync::RwLock;
use tracing::debug;

use crate::resp::RespValue;
use crate::session::{SharedWriter, write_to_stream};

/// Channel → subscriber map plus the reverse view per session. Subscribe,
/// unsubscribe and publish all run under the lock; publish writes the
/// message to each subscriber's shared socket writer.
#[derive(Default)]
pub struct PubSubHub {
    channels: RwLock<HashMap<String, HashMap<u64, SharedWriter>>>,
    subscriptions: RwLock<HashMap<u64, HashSet<String>>>,
}

impl PubSubHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the session to a channel and returns how many channels the
    /// session is now subscribed to.
    pub async fn subscribe(&self, session_id: u64, channel: &str, writer: SharedWriter) -> usize {
        self.channels
            .write()
            .await
            .entry(channel.to_string())
            .or_default()
            .insert(session_id, writer);

        let mut subscriptions = self.subscriptions.write().await;
        let subscribed = subscriptions.entry(session_id).or_default();
        subscribed.insert(channel.to_string());
        subscribed.len()
    }

    /// Removes the session from a channel and returns the remaining
    /// subscription count for the session.
    pub async fn unsubscribe(&self, session_id: u64, channel: &str) -> usize {
        let mut channels = self.channels.write().await;
        if let Some(subscribers) = channels.get_mut(channel) {
            subscribers.remove(&session_id);
            if subscribers.is_empty() {
                channels.remove(channel);
            }
        }
        drop(channels);

        let mut subscriptions = self.subscriptions.write().await;
        match subscriptions.get_mut(&session_id) {
            Some(subscribed) => {
                subscribed.remove(channel);
                subscribed.len()
            }
            None => 0,
        }
    }

    /// Drops every subscription a closing session held.
    pub async fn drop_session(&self, session_id: u64) {
        let Some(subscribed) = self.subscriptions.write().await.remove(&session_id) else {
            return;
        };

        let mut channels = self.channels.write().await;
        for channel in subscribed {
            if let Some(subscribers) = channels.get_mut(&channel) {
                subscribers.remove(&session_id);
                if subscribers.is_empty() {
                    channels.remove(&channel);
                }
            }
        }
    }

    /// Fans `message` out to every subscriber of `channel` as a
    /// `["message", channel, payload]` push. Returns the receiver count;
    /// write failures are logged and do not affect it.
    pub async fn publish(&self, channel: &str, message: &str) -> usize {
        let channels = self.channels.read().await;
        let Some(subscribers) = channels.get(channel) else {
            return 0;
        };

        let push = RespValue::encode_array_from_strings(vec![
            "message".to_string(),
            channel.to_string(),
            message.to_string(),
        ]);

        for (session_id, writer) in subscribers {
            if let Err(error) = write_to_stream(writer, push.as_bytes()).await {
                debug!(session = session_id, error = %error, "pub/sub write failed");
            }
        }

        subscribers.len()
    }
}

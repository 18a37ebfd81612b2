//! # Pub/Sub Convenience
//!
//! Subscribes to one or more channels on a dedicated connection and returns
//! a live handle. Subscription acknowledgments can be surfaced as events or
//! suppressed.

use std::collections::{HashSet, VecDeque};
use std::pin::Pin;

use futures_util::{Stream, StreamExt};
use tracing::debug;

use crate::client::Client;
use crate::error::StoreResult;

/// A published message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub channel: String,
    pub payload: Vec<u8>,
}

impl Message {
    /// Payload as UTF-8, replacing invalid sequences.
    pub fn payload_str(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.payload)
    }
}

/// One item yielded by a [`Subscription`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscriptionEvent {
    /// The store confirmed a channel; `count` is the running total.
    Subscribed { channel: String, count: usize },
    Message(Message),
}

type MessageStream = Pin<Box<dyn Stream<Item = redis::Msg> + Send>>;

/// Live subscription handle.
pub struct Subscription {
    channels: Vec<String>,
    pending: VecDeque<SubscriptionEvent>,
    messages: MessageStream,
}

impl Subscription {
    /// Channels subscribed to, in order.
    pub fn channels(&self) -> &[String] {
        &self.channels
    }

    /// Next acknowledgment or message; `None` once the connection closes.
    pub async fn next_event(&mut self) -> Option<SubscriptionEvent> {
        if let Some(event) = self.pending.pop_front() {
            return Some(event);
        }
        let msg = self.messages.next().await?;
        Some(SubscriptionEvent::Message(Message {
            channel: msg.get_channel_name().to_string(),
            payload: msg.get_payload_bytes().to_vec(),
        }))
    }

    /// Next message, skipping acknowledgments.
    pub async fn next_message(&mut self) -> Option<Message> {
        loop {
            match self.next_event().await? {
                SubscriptionEvent::Message(message) => return Some(message),
                SubscriptionEvent::Subscribed { .. } => continue,
            }
        }
    }
}

impl<E> Client<E> {
    /// Subscribes to `channels` on a dedicated connection.
    ///
    /// Repeated channels are subscribed once. With `ignore_subscribe_messages`
    /// unset, the handle yields one `Subscribed` event per distinct channel
    /// before any message.
    pub async fn subscribe(
        &self,
        channels: &[&str],
        ignore_subscribe_messages: bool,
    ) -> StoreResult<Subscription> {
        let channels = distinct(channels);
        let mut pubsub = self.pubsub_source().get_async_pubsub().await?;
        let mut pending = VecDeque::new();
        for (idx, channel) in channels.iter().enumerate() {
            pubsub.subscribe(*channel).await?;
            if !ignore_subscribe_messages {
                pending.push_back(SubscriptionEvent::Subscribed {
                    channel: channel.to_string(),
                    count: idx + 1,
                });
            }
        }
        debug!(channels = ?channels, "subscribed");

        Ok(Subscription {
            channels: channels.iter().map(|channel| channel.to_string()).collect(),
            pending,
            messages: Box::pin(pubsub.into_on_message()),
        })
    }
}

/// First occurrence of each channel, in order.
fn distinct<'a>(channels: &[&'a str]) -> Vec<&'a str> {
    let mut seen = HashSet::new();
    channels
        .iter()
        .copied()
        .filter(|channel| seen.insert(*channel))
        .collect()
}

//! Pub/sub change channel transports.
//!
//! The listener only needs "subscribe" and "next message"; a subscription
//! that yields `None` has disconnected and the listener resubscribes.

use async_trait::async_trait;
use dashmap::DashMap;
use futures_util::StreamExt;
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::sync::broadcast;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use url::Url;

use crate::error::{SyncError, SyncResult};

/// A pub/sub transport carrying change notifications.
#[async_trait]
pub trait NotificationSource: Send + Sync {
    async fn subscribe(&self, channel: &str) -> SyncResult<Box<dyn Subscription>>;
}

/// An open subscription to one channel.
#[async_trait]
pub trait Subscription: Send {
    /// Next raw message, or `None` once the connection has dropped.
    async fn next_message(&mut self) -> Option<Vec<u8>>;
}

const CHANNEL_CAPACITY: usize = 256;

/// In-process channel source backed by tokio broadcast channels.
///
/// Used when the gateway embeds its own publisher, and in tests.
#[derive(Debug, Clone, Default)]
pub struct ChannelSource {
    channels: Arc<DashMap<String, broadcast::Sender<Vec<u8>>>>,
}

impl ChannelSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish a message. Returns the number of subscribers that received it.
    pub fn publish(&self, channel: &str, payload: impl Into<Vec<u8>>) -> usize {
        let sender = self.sender(channel);
        sender.send(payload.into()).unwrap_or(0)
    }

    /// Drop every subscription on a channel, as a broken connection would.
    pub fn disconnect(&self, channel: &str) {
        self.channels.remove(channel);
    }

    /// Current number of subscribers on a channel.
    pub fn subscriber_count(&self, channel: &str) -> usize {
        self.channels
            .get(channel)
            .map(|s| s.receiver_count())
            .unwrap_or(0)
    }

    fn sender(&self, channel: &str) -> broadcast::Sender<Vec<u8>> {
        self.channels
            .entry(channel.to_string())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .clone()
    }
}

#[async_trait]
impl NotificationSource for ChannelSource {
    async fn subscribe(&self, channel: &str) -> SyncResult<Box<dyn Subscription>> {
        Ok(Box::new(ChannelSubscription {
            rx: self.sender(channel).subscribe(),
        }))
    }
}

struct ChannelSubscription {
    rx: broadcast::Receiver<Vec<u8>>,
}

#[async_trait]
impl Subscription for ChannelSubscription {
    async fn next_message(&mut self) -> Option<Vec<u8>> {
        loop {
            match self.rx.recv().await {
                Ok(payload) => return Some(payload),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Notification subscriber lagged, messages skipped");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

/// WebSocket change channel. Each text or binary frame is one message.
#[derive(Debug, Clone)]
pub struct WebSocketSource {
    url: Url,
}

impl WebSocketSource {
    pub fn new(url: Url) -> Self {
        Self { url }
    }

    fn channel_url(&self, channel: &str) -> Url {
        let mut url = self.url.clone();
        url.query_pairs_mut().append_pair("channel", channel);
        url
    }
}

#[async_trait]
impl NotificationSource for WebSocketSource {
    async fn subscribe(&self, channel: &str) -> SyncResult<Box<dyn Subscription>> {
        let url = self.channel_url(channel);
        let (stream, _) = tokio_tungstenite::connect_async(url.as_str())
            .await
            .map_err(|e| SyncError::Connection(format!("notification channel {url}: {e}")))?;

        Ok(Box::new(WebSocketSubscription { stream }))
    }
}

struct WebSocketSubscription {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl Subscription for WebSocketSubscription {
    async fn next_message(&mut self) -> Option<Vec<u8>> {
        while let Some(frame) = self.stream.next().await {
            match frame {
                Ok(Message::Text(text)) => return Some(text.as_bytes().to_vec()),
                Ok(Message::Binary(data)) => return Some(data.to_vec()),
                Ok(Message::Close(_)) => return None,
                Ok(_) => continue,
                Err(e) => {
                    tracing::warn!(error = %e, "Notification channel read failed");
                    return None;
                }
            }
        }
        None
    }
}

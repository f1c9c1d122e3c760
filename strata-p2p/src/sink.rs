//! Delivery of decoded messages to the application layer.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::SinkClosed;
use crate::message::Message;

/// Bounded delivery channel from the transport to the application.
///
/// `send` waits while the sink is full, which throttles only the
/// connection that produced the message.
#[async_trait]
pub trait MessageSink: Send + Sync {
    /// Deliver one message.
    async fn send(&self, message: Message) -> Result<(), SinkClosed>;
}

#[async_trait]
impl MessageSink for mpsc::Sender<Message> {
    async fn send(&self, message: Message) -> Result<(), SinkClosed> {
        mpsc::Sender::send(self, message).await.map_err(|_| SinkClosed)
    }
}

use super::card::Card;
use async_trait::async_trait;
use tokio::sync::mpsc;

/// A message received from a chat channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub id: String,
    pub sender: String,
    /// Channel (room, conversation) the message came from; replies go back here.
    pub channel: String,
    pub content: String,
    /// Number of files attached to the message.
    pub attachments: usize,
}

impl InboundMessage {
    pub fn new(sender: impl Into<String>, channel: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            sender: sender.into(),
            channel: channel.into(),
            content: content.into(),
            attachments: 0,
        }
    }

    pub fn with_attachments(mut self, attachments: usize) -> Self {
        self.attachments = attachments;
        self
    }
}

/// An outbound chat message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Text(String),
    Card(Card),
}

impl From<&str> for Reply {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for Reply {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<Card> for Reply {
    fn from(card: Card) -> Self {
        Self::Card(card)
    }
}

/// A chat transport the bot can listen on and reply through.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Human-readable channel name.
    fn name(&self) -> &str;

    /// Deliver `reply` to `recipient` (the originating channel id).
    async fn send(&self, reply: &Reply, recipient: &str) -> anyhow::Result<()>;

    /// Forward inbound messages into `tx` until the source is exhausted.
    async fn listen(&self, tx: mpsc::Sender<InboundMessage>) -> anyhow::Result<()>;
}

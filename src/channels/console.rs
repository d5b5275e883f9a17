use super::card::Card;
use super::traits::{Channel, InboundMessage, Reply};
use anyhow::Context;
use async_trait::async_trait;
use std::fmt::Write as _;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;

pub const CONSOLE: &str = "console";

/// Terminal channel: one stdin line in, replies printed to stdout.
#[derive(Debug, Default)]
pub struct ConsoleChannel;

impl ConsoleChannel {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Channel for ConsoleChannel {
    fn name(&self) -> &str {
        CONSOLE
    }

    async fn send(&self, reply: &Reply, _recipient: &str) -> anyhow::Result<()> {
        let mut rendered = match reply {
            Reply::Text(text) => text.clone(),
            Reply::Card(card) => render_card(card),
        };
        rendered.push('\n');

        let mut stdout = tokio::io::stdout();
        stdout
            .write_all(rendered.as_bytes())
            .await
            .context("Failed to write reply to stdout")?;
        stdout.flush().await?;
        Ok(())
    }

    async fn listen(&self, tx: mpsc::Sender<InboundMessage>) -> anyhow::Result<()> {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if tx
                .send(InboundMessage::new(CONSOLE, CONSOLE, line))
                .await
                .is_err()
            {
                tracing::debug!("Console receiver dropped, stopping listener");
                break;
            }
        }
        Ok(())
    }
}

/// Plain-text rendering of a card for terminals and logs.
pub fn render_card(card: &Card) -> String {
    let mut out = String::new();
    if let Some(title) = &card.title {
        let _ = writeln!(out, "== {title} ==");
    }
    if let Some(url) = &card.url {
        let _ = writeln!(out, "{url}");
    }
    for field in &card.fields {
        let _ = writeln!(out, "  {}: {}", field.name, field.value);
    }
    if let Some(image) = &card.image {
        let _ = writeln!(out, "  [image] {image}");
    }
    match (&card.footer, card.timestamp) {
        (Some(footer), Some(at)) => {
            let _ = write!(out, "-- {} | {}", footer.text, at.format("%Y-%m-%d %H:%M:%S UTC"));
        }
        (Some(footer), None) => {
            let _ = write!(out, "-- {}", footer.text);
        }
        (None, Some(at)) => {
            let _ = write!(out, "-- {}", at.format("%Y-%m-%d %H:%M:%S UTC"));
        }
        (None, None) => {}
    }
    out.trim_end().to_string()
}

use crate::channels::{Channel, InboundMessage};
use crate::commands::CommandRouter;
use anyhow::Result;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinSet;

const INBOX_CAPACITY: usize = 64;

/// Listen on `channel` and answer every inbound message in its own task.
///
/// Returns once the channel stops producing messages and all in-flight
/// commands have finished.
pub async fn run(channel: Arc<dyn Channel>, router: Arc<CommandRouter>) -> Result<()> {
    let (tx, mut rx) = mpsc::channel::<InboundMessage>(INBOX_CAPACITY);

    let listener = {
        let channel = Arc::clone(&channel);
        tokio::spawn(async move { channel.listen(tx).await })
    };
    tracing::info!(channel = channel.name(), command = router.search_invocation(), "Bot listening");

    let mut in_flight = JoinSet::new();
    while let Some(message) = rx.recv().await {
        let router = Arc::clone(&router);
        in_flight.spawn(async move { router.dispatch(&message).await });
    }

    while let Some(joined) = in_flight.join_next().await {
        if let Err(e) = joined {
            tracing::error!(error = %e, "Command task panicked");
        }
    }

    listener.await??;
    tracing::info!(channel = channel.name(), "Channel closed, bot stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalogue::ImageIndex;
    use crate::channels::Reply;
    use crate::commands::SearchCommand;
    use crate::config::Config;
    use crate::userlog::TracingUserLog;
    use async_trait::async_trait;
    use parking_lot::Mutex;

    struct ScriptedChannel {
        script: Vec<&'static str>,
        replies: Mutex<Vec<(Reply, String)>>,
    }

    #[async_trait]
    impl Channel for ScriptedChannel {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn send(&self, reply: &Reply, recipient: &str) -> anyhow::Result<()> {
            self.replies.lock().push((reply.clone(), recipient.to_string()));
            Ok(())
        }

        async fn listen(&self, tx: mpsc::Sender<InboundMessage>) -> anyhow::Result<()> {
            for line in &self.script {
                tx.send(InboundMessage::new("tester", "room-1", *line)).await?;
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn answers_every_command_then_stops() {
        let channel = Arc::new(ScriptedChannel {
            script: vec!["!hm_search", "small talk", "!hm_search --folder x", "!hm_search rowi"],
            replies: Mutex::new(Vec::new()),
        });
        let config = Config::default();
        let search = SearchCommand::new(
            Arc::new(ImageIndex::in_memory().unwrap()),
            channel.clone(),
            Arc::new(TracingUserLog),
            config.search.clone(),
        );
        let router = Arc::new(CommandRouter::new(&config, search));

        run(channel.clone(), router).await.unwrap();

        let replies = channel.replies.lock();
        assert_eq!(replies.len(), 3);
        assert!(replies.iter().all(|(_, to)| to == "room-1"));
    }
}

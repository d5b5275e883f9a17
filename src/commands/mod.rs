//! Chat command routing.

pub mod args;
pub mod search;

pub use search::{SearchCommand, SearchOutcome};

use crate::channels::InboundMessage;
use crate::config::Config;

/// Words of a message, split on runs of whitespace.
pub fn split(content: &str) -> Vec<&str> {
    content.split_whitespace().collect()
}

/// Sends command messages to their handler; everything else is ignored.
pub struct CommandRouter {
    search_invocation: String,
    search: SearchCommand,
}

impl CommandRouter {
    pub fn new(config: &Config, search: SearchCommand) -> Self {
        Self {
            search_invocation: format!("{}{}", config.bot.prefix, config.search.command),
            search,
        }
    }

    /// Full search command word, e.g. `!hm_search`.
    pub fn search_invocation(&self) -> &str {
        &self.search_invocation
    }

    pub fn is_search(&self, content: &str) -> bool {
        split(content)
            .first()
            .is_some_and(|word| word.eq_ignore_ascii_case(&self.search_invocation))
    }

    /// Run the matching command, or return `None` when `message` is not a command.
    pub async fn dispatch(&self, message: &InboundMessage) -> Option<SearchOutcome> {
        if !self.is_search(&message.content) {
            tracing::debug!(sender = %message.sender, "Ignoring non-command message");
            return None;
        }
        Some(self.search.handle(message, &self.search_invocation).await)
    }
}

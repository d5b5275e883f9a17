//! `!hm_search`: look images up in the catalogue and answer with one card each.

use super::args::ParsedArgs;
use crate::catalogue::{ImageDocument, ImageSearch, SearchParams};
use crate::channels::{Card, Channel, InboundMessage, Reply};
use crate::config::SearchConfig;
use crate::text::title_case;
use crate::userlog::{LogLevel, UserLog};
use chrono::Utc;
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Flags consumed by the command itself and never forwarded as field tags.
pub const RESERVED_FLAGS: &[&str] = &["page", "limit", "id", "_id"];

const HELP_TEMPLATE: &str = r#"{cmd} searches for images on database.

This command requires a query search, and optional fields to narrow your search explicitly. Only maximum of {max} images will be sent to you at one time, but you can search next set of images by giving `--page` key.

The syntax looks like this:

> {cmd} "query to search" [--OptionalFields] [--OptionalOptions]

Usage example:

Simple search:
```
{cmd} rowi
```
This will search in the database for the name or filename contains "rowi"

Search with Fields:
```
{cmd} rowi --folder cmx_20 --hobby mangap
```
This will search in the database for the name or filename `rowi`, that is stored in folder `cmx_20` and has the tag `hobby: mangap`

Search next set of images:
```
{cmd} rowi --page 2
```
This will return next set of images"#;

pub const NO_RESULTS_MESSAGE: &str = "no image found with such query";

/// How one invocation ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    Help,
    MissingQuery,
    NoResults,
    Delivered { sent: usize, failed: usize },
    BackendFailed { reason: String },
}

pub fn help_text(invocation: &str, max_limit: u32) -> String {
    HELP_TEMPLATE
        .replace("{cmd}", invocation)
        .replace("{max}", &max_limit.to_string())
}

pub fn no_query_message(invocation: &str) -> String {
    format!(
        "No query search detected from your message request. Please type only `{invocation}` in the text box for query info"
    )
}

/// Build search parameters from parsed arguments; `None` when there is no query text.
pub fn build_params(args: &ParsedArgs, max_limit: u32) -> Option<SearchParams> {
    if args.positional.is_empty() {
        return None;
    }
    let max_limit = max_limit.max(1);

    let page = args
        .flag("page")
        .and_then(|v| v.as_number())
        .map(|n| (n - 1.0).max(0.0).trunc())
        .unwrap_or(0.0);

    let limit = args
        .flag("limit")
        .and_then(|v| v.as_number())
        .filter(|n| *n != 0.0)
        .map(|n| n.trunc().clamp(1.0, f64::from(max_limit)))
        .unwrap_or(f64::from(max_limit));

    let id = ["id", "_id"]
        .iter()
        .filter_map(|key| args.flag(key))
        .find_map(|v| v.as_text().map(str::to_string));

    let field_tags: BTreeMap<String, String> = args
        .flags
        .iter()
        .filter(|(key, _)| !RESERVED_FLAGS.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.to_tag()))
        .collect();

    // Float-to-int `as` saturates; both values are already clamped.
    Some(SearchParams {
        query: args.positional.join(" "),
        page: page as u32,
        limit: limit as u32,
        id,
        field_tags,
    })
}

/// Handler for the image search command.
pub struct SearchCommand {
    backend: Arc<dyn ImageSearch>,
    channel: Arc<dyn Channel>,
    log: Arc<dyn UserLog>,
    settings: SearchConfig,
}

impl SearchCommand {
    pub fn new(
        backend: Arc<dyn ImageSearch>,
        channel: Arc<dyn Channel>,
        log: Arc<dyn UserLog>,
        settings: SearchConfig,
    ) -> Self {
        Self {
            backend,
            channel,
            log,
            settings,
        }
    }

    /// Answer one `message`. `command` is the invocation label (e.g. `!hm_search`).
    ///
    /// Never fails: every problem is reported to the user and the user log.
    pub async fn handle(&self, message: &InboundMessage, command: &str) -> SearchOutcome {
        let rest = strip_command(&message.content);
        let max_limit = self.settings.effective_max_limit();

        if rest.is_empty() && message.attachments == 0 {
            self.reply(message, help_text(command, max_limit).into()).await;
            self.log
                .log(message, "asked search help", command, LogLevel::Info, json!({}));
            return SearchOutcome::Help;
        }

        let args = ParsedArgs::parse(rest);
        let Some(params) = build_params(&args, max_limit) else {
            self.reply(message, no_query_message(command).into()).await;
            self.log.log(
                message,
                "bad arguments: empty query",
                command,
                LogLevel::Error,
                json!({ "args": args }),
            );
            return SearchOutcome::MissingQuery;
        };

        let snapshot = json!({
            "fields": params.field_tags,
            "page": params.page,
            "limit": params.limit,
            "query": params.query,
            "_id": params.id,
        });

        let docs = match self.backend.search(&params).await {
            Ok(docs) => docs,
            Err(e) => {
                let reason = e.to_string();
                let reason = if reason.trim().is_empty() {
                    "unknown".to_string()
                } else {
                    reason
                };
                let mut context = snapshot;
                context["error"] = serde_json::Value::String(reason.clone());
                self.send_with_log(
                    message,
                    &format!("something failed when searching images. reason: {reason}"),
                    command,
                    LogLevel::Error,
                    context,
                )
                .await;
                return SearchOutcome::BackendFailed { reason };
            }
        };

        if docs.is_empty() {
            self.send_with_log(message, NO_RESULTS_MESSAGE, command, LogLevel::Error, snapshot)
                .await;
            return SearchOutcome::NoResults;
        }

        let mut sent = 0;
        let mut failed = 0;
        for doc in &docs {
            if self.reply(message, self.render(doc).into()).await {
                sent += 1;
            } else {
                failed += 1;
            }
        }
        tracing::debug!(command, sent, failed, query = %params.query, "Search results delivered");
        SearchOutcome::Delivered { sent, failed }
    }

    /// Card describing one catalogued image.
    pub fn render(&self, doc: &ImageDocument) -> Card {
        let mut card = Card::new()
            .colour(self.settings.accent())
            .title(title_case(&doc.name))
            .url(&doc.link)
            .thumbnail(&doc.link)
            .field("ID", &doc.id, false)
            .field("Name", &doc.name, false)
            .field("Folder", or_default(doc.folder.as_deref(), "[root]"), false)
            .field("Filename", &doc.filename, false)
            .field("Created At", or_default(doc.created_at_human.as_deref(), "null"), false)
            .field("Updated At", or_default(doc.updated_at_human.as_deref(), "null"), false);

        let mut dropped = 0usize;
        for (key, value) in &doc.metadata {
            if card.is_full() {
                dropped += 1;
                continue;
            }
            card = card.field(title_case(key), metadata_text(value), false);
        }
        if dropped > 0 {
            tracing::debug!(id = %doc.id, dropped, "Card field limit reached, metadata truncated");
        }

        card.image(&doc.link)
            .timestamp(Utc::now())
            .footer(&self.settings.footer, Some(doc.link.clone()))
    }

    async fn send_with_log(
        &self,
        message: &InboundMessage,
        text: &str,
        command: &str,
        level: LogLevel,
        context: serde_json::Value,
    ) {
        self.reply(message, text.into()).await;
        self.log.log(message, text, command, level, context);
    }

    async fn reply(&self, message: &InboundMessage, reply: Reply) -> bool {
        match self.channel.send(&reply, &message.channel).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(
                    channel = self.channel.name(),
                    recipient = %message.channel,
                    error = %e,
                    "Failed to deliver reply"
                );
                false
            }
        }
    }
}

/// Text after the leading command word, trimmed.
fn strip_command(content: &str) -> &str {
    let content = content.trim();
    match content.find(char::is_whitespace) {
        Some(idx) => content[idx..].trim(),
        None => "",
    }
}

fn or_default<'a>(value: Option<&'a str>, fallback: &'a str) -> &'a str {
    value.filter(|v| !v.trim().is_empty()).unwrap_or(fallback)
}

fn metadata_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => "null".to_string(),
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

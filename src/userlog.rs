//! Per-request audit log: what a user asked for and how the bot answered.

use crate::channels::InboundMessage;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Error,
}

/// Sink for user-facing command events.
pub trait UserLog: Send + Sync {
    fn log(
        &self,
        message: &InboundMessage,
        text: &str,
        command: &str,
        level: LogLevel,
        context: serde_json::Value,
    );
}

/// [`UserLog`] that emits structured `tracing` events under the `userlog` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingUserLog;

impl UserLog for TracingUserLog {
    fn log(
        &self,
        message: &InboundMessage,
        text: &str,
        command: &str,
        level: LogLevel,
        context: serde_json::Value,
    ) {
        match level {
            LogLevel::Info => tracing::info!(
                target: "userlog",
                command,
                sender = %message.sender,
                channel = %message.channel,
                message_id = %message.id,
                context = %context,
                "{text}"
            ),
            LogLevel::Error => tracing::error!(
                target: "userlog",
                command,
                sender = %message.sender,
                channel = %message.channel,
                message_id = %message.id,
                context = %context,
                "{text}"
            ),
        }
    }
}

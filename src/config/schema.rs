use crate::channels::card::parse_hex_colour;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Largest page size the search command ever requests.
pub const MAX_SEARCH_LIMIT: u32 = 5;

const DEFAULT_ACCENT: u32 = 0x0099FF;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// SQLite catalogue location; `~` is expanded.
    pub database_path: String,
    /// `tracing` filter used when `RUST_LOG` is unset.
    pub log_filter: String,
    pub bot: BotConfig,
    pub search: SearchConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: "~/.memoria/memoria.db".into(),
            log_filter: "info".into(),
            bot: BotConfig::default(),
            search: SearchConfig::default(),
        }
    }
}

impl Config {
    pub fn database_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.database_path).into_owned())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    /// Leading marker of every command, e.g. `!` in `!hm_search`.
    pub prefix: String,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self { prefix: "!".into() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub command: String,
    /// Page size cap; never above [`MAX_SEARCH_LIMIT`].
    pub max_limit: u32,
    /// Card accent colour as `#RRGGBB`.
    pub accent_colour: String,
    pub footer: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            command: "hm_search".into(),
            max_limit: MAX_SEARCH_LIMIT,
            accent_colour: "#0099FF".into(),
            footer: "Howezt Memoria".into(),
        }
    }
}

impl SearchConfig {
    pub fn effective_max_limit(&self) -> u32 {
        self.max_limit.clamp(1, MAX_SEARCH_LIMIT)
    }

    pub fn accent(&self) -> u32 {
        parse_hex_colour(&self.accent_colour).unwrap_or(DEFAULT_ACCENT)
    }
}

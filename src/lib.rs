//! memoria: a chat bot that searches an image catalogue.
//!
//! Messages arrive through a [`channels::Channel`], the [`commands::CommandRouter`]
//! picks out `!hm_search` invocations, and [`commands::SearchCommand`] queries an
//! [`catalogue::ImageSearch`] backend and answers with one card per image.

pub mod bot;
pub mod catalogue;
pub mod channels;
pub mod commands;
pub mod config;
pub mod text;
pub mod userlog;

pub use config::Config;

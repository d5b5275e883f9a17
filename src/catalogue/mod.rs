//! Image catalogue: the search backend behind `!hm_search`.
//!
//! [`ImageSearch`] is the seam the command handler talks to; [`ImageIndex`]
//! is the SQLite implementation shipped with the bot.

pub mod error;
pub mod index;
pub mod schema;

pub use error::SearchError;
pub use index::ImageIndex;
pub use schema::{ImageDocument, NewImage, SearchParams};

use async_trait::async_trait;

/// A backend able to answer image searches.
#[async_trait]
pub trait ImageSearch: Send + Sync {
    /// Run one search. An empty list means nothing matched.
    async fn search(&self, params: &SearchParams) -> Result<Vec<ImageDocument>, SearchError>;
}

use serde::Deserialize;
use std::collections::BTreeMap;

/// A catalogued image as the search backend hands it to the bot.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageDocument {
    pub id: String,
    pub name: String,
    pub link: String,
    pub folder: Option<String>,
    pub filename: String,
    pub created_at_human: Option<String>,
    pub updated_at_human: Option<String>,
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

/// An image to be added to the catalogue (import payload).
#[derive(Debug, Clone, Deserialize)]
pub struct NewImage {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    pub link: String,
    #[serde(default)]
    pub folder: Option<String>,
    pub filename: String,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

/// Parameters of one catalogue search.
///
/// `field_tags` are free-form filters; `folder` targets the folder column and
/// every other key is matched against the image metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchParams {
    pub query: String,
    pub page: u32,
    pub limit: u32,
    pub id: Option<String>,
    pub field_tags: BTreeMap<String, String>,
}

impl SearchParams {
    /// Row offset for the requested page.
    pub fn offset(&self) -> u64 {
        u64::from(self.page) * u64::from(self.limit)
    }
}

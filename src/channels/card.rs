use crate::text::truncate_chars;
use chrono::{DateTime, Utc};

/// Chat embeds reject titles longer than this.
pub const MAX_TITLE_LEN: usize = 256;
/// Chat embeds reject field values longer than this.
pub const MAX_FIELD_VALUE_LEN: usize = 1024;
/// Chat embeds carry at most this many fields.
pub const MAX_FIELDS: usize = 25;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardFooter {
    pub text: String,
    pub icon_url: Option<String>,
}

/// A rich, image-bearing chat message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Card {
    pub colour: Option<u32>,
    pub title: Option<String>,
    pub url: Option<String>,
    pub thumbnail: Option<String>,
    pub fields: Vec<CardField>,
    pub image: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
    pub footer: Option<CardFooter>,
}

impl Card {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn colour(mut self, colour: u32) -> Self {
        self.colour = Some(colour);
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(truncate_chars(&title.into(), MAX_TITLE_LEN));
        self
    }

    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn thumbnail(mut self, url: impl Into<String>) -> Self {
        self.thumbnail = Some(url.into());
        self
    }

    /// Append a field. Empty values render as `"null"`; fields past
    /// [`MAX_FIELDS`] are ignored.
    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>, inline: bool) -> Self {
        if self.fields.len() >= MAX_FIELDS {
            return self;
        }
        let value = value.into();
        let value = if value.trim().is_empty() {
            "null".to_string()
        } else {
            truncate_chars(&value, MAX_FIELD_VALUE_LEN)
        };
        self.fields.push(CardField {
            name: truncate_chars(&name.into(), MAX_TITLE_LEN),
            value,
            inline,
        });
        self
    }

    pub fn image(mut self, url: impl Into<String>) -> Self {
        self.image = Some(url.into());
        self
    }

    pub fn timestamp(mut self, at: DateTime<Utc>) -> Self {
        self.timestamp = Some(at);
        self
    }

    pub fn footer(mut self, text: impl Into<String>, icon_url: Option<String>) -> Self {
        self.footer = Some(CardFooter {
            text: text.into(),
            icon_url,
        });
        self
    }

    pub fn is_full(&self) -> bool {
        self.fields.len() >= MAX_FIELDS
    }

    /// Value of the first field called `name`.
    pub fn field_value(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .map(|f| f.value.as_str())
    }
}

/// Parse a `#RRGGBB` colour.
pub fn parse_hex_colour(raw: &str) -> Option<u32> {
    let hex = raw.trim().trim_start_matches('#');
    if hex.len() != 6 {
        return None;
    }
    u32::from_str_radix(hex, 16).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_sets_all_parts() {
        let now = Utc::now();
        let card = Card::new()
            .colour(0x0099FF)
            .title("Rowi")
            .url("https://x/y.png")
            .thumbnail("https://x/y.png")
            .field("ID", "1", false)
            .image("https://x/y.png")
            .timestamp(now)
            .footer("Howezt Memoria", Some("https://x/y.png".into()));
        assert_eq!(card.colour, Some(0x0099FF));
        assert_eq!(card.field_value("ID"), Some("1"));
        assert_eq!(card.timestamp, Some(now));
        assert_eq!(card.footer.unwrap().text, "Howezt Memoria");
    }

    #[test]
    fn empty_field_values_render_null() {
        let card = Card::new().field("Folder", "", false).field("Tag", "  ", true);
        assert_eq!(card.field_value("Folder"), Some("null"));
        assert_eq!(card.field_value("Tag"), Some("null"));
    }

    #[test]
    fn long_values_are_truncated() {
        let long = "x".repeat(MAX_FIELD_VALUE_LEN + 10);
        let card = Card::new().title("t".repeat(300)).field("Long", long, false);
        assert_eq!(card.title.unwrap().chars().count(), MAX_TITLE_LEN);
        assert_eq!(
            card.fields[0].value.chars().count(),
            MAX_FIELD_VALUE_LEN
        );
    }

    #[test]
    fn fields_are_capped() {
        let card = (0..30).fold(Card::new(), |c, i| c.field(format!("f{i}"), "v", false));
        assert_eq!(card.fields.len(), MAX_FIELDS);
        assert!(card.is_full());
        assert!(card.field_value("f29").is_none());
    }

    #[test]
    fn parses_hex_colours() {
        assert_eq!(parse_hex_colour("#0099FF"), Some(0x0099FF));
        assert_eq!(parse_hex_colour("ff0000"), Some(0xFF0000));
        assert_eq!(parse_hex_colour("#abc"), None);
        assert_eq!(parse_hex_colour("#zzzzzz"), None);
    }
}

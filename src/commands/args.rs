//! yargs-style argument parsing for chat commands.
//!
//! Text is tokenized shell-style (quoted segments stay whole) and split into
//! positional words and `--key value` flags.

use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FlagValue {
    Text(String),
    Bool(bool),
}

impl FlagValue {
    /// Numeric reading of the value; booleans count as 1 and 0.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Text(text) => text.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
            Self::Bool(flag) => Some(if *flag { 1.0 } else { 0.0 }),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Bool(_) => None,
        }
    }

    /// String form forwarded as a search filter.
    pub fn to_tag(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Bool(flag) => flag.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParsedArgs {
    pub positional: Vec<String>,
    pub flags: BTreeMap<String, FlagValue>,
}

impl ParsedArgs {
    pub fn parse(raw: &str) -> Self {
        parse_tokens(&tokenize(raw))
    }

    pub fn flag(&self, key: &str) -> Option<&FlagValue> {
        self.flags.get(key)
    }
}

/// Split shell-style; unbalanced quotes fall back to plain whitespace splitting.
pub fn tokenize(raw: &str) -> Vec<String> {
    match shell_words::split(raw) {
        Ok(tokens) => tokens,
        Err(e) => {
            tracing::debug!(error = %e, "Unbalanced quotes in command, splitting on whitespace");
            raw.split_whitespace().map(str::to_string).collect()
        }
    }
}

pub fn parse_tokens(tokens: &[String]) -> ParsedArgs {
    let mut args = ParsedArgs::default();
    let mut iter = tokens.iter().peekable();
    let mut options_done = false;

    while let Some(token) = iter.next() {
        if options_done || !is_flag(token) {
            args.positional.push(token.clone());
            continue;
        }
        if token == "--" {
            options_done = true;
            continue;
        }

        if let Some(body) = token.strip_prefix("--") {
            if let Some((key, value)) = body.split_once('=') {
                args.flags
                    .insert(key.to_string(), FlagValue::Text(value.to_string()));
            } else if let Some(key) = body.strip_prefix("no-").filter(|k| !k.is_empty()) {
                args.flags.insert(key.to_string(), FlagValue::Bool(false));
            } else {
                let value = match iter.next_if(|next| !is_flag(next)) {
                    Some(next) => FlagValue::Text(next.clone()),
                    None => FlagValue::Bool(true),
                };
                args.flags.insert(body.to_string(), value);
            }
            continue;
        }

        // Short flags: `-k value`, `-k=value` or a cluster like `-abc`.
        let body = &token[1..];
        if let Some((key, value)) = body.split_once('=') {
            args.flags
                .insert(key.to_string(), FlagValue::Text(value.to_string()));
            continue;
        }
        let letters: Vec<char> = body.chars().collect();
        if let Some((last, rest)) = letters.split_last() {
            for letter in rest {
                args.flags.insert(letter.to_string(), FlagValue::Bool(true));
            }
            let value = match iter.next_if(|next| !is_flag(next)) {
                Some(next) => FlagValue::Text(next.clone()),
                None => FlagValue::Bool(true),
            };
            args.flags.insert(last.to_string(), value);
        }
    }

    args
}

fn is_flag(token: &str) -> bool {
    token.len() > 1 && token.starts_with('-') && token.parse::<f64>().is_err()
}

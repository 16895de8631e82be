//! Slot extraction
//!
//! Pulls the value for the slot currently being asked for out of a single
//! utterance. Extraction is pure and never looks at other slots.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Ages at or above this are rejected as implausible
pub const MAX_AGE: u8 = 150;

static FIRST_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"[0-9]+").unwrap());

static NAME_INTRODUCTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:my\s+name\s+is|name\s+is|i\s+am|i'?m|this\s+is)\s+(.+)$").unwrap()
});

/// A required patient field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Slot {
    Name,
    Age,
    Query,
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Slot::Name => "name",
            Slot::Age => "age",
            Slot::Query => "query",
        };
        f.write_str(name)
    }
}

/// A successfully extracted slot value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotValue {
    Name(String),
    Age(u8),
    Query(String),
}

/// Extract the value of `slot` from `text`, or `None` if the utterance does
/// not contain one.
pub fn extract(slot: Slot, text: &str) -> Option<SlotValue> {
    match slot {
        Slot::Name => extract_name(text).map(SlotValue::Name),
        Slot::Age => extract_age(text).map(SlotValue::Age),
        Slot::Query => extract_query(text).map(SlotValue::Query),
    }
}

/// The trimmed message, minus a leading self-introduction.
pub fn extract_name(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }

    let name = NAME_INTRODUCTION
        .captures(trimmed)
        .and_then(|caps| caps.get(1))
        .map_or(trimmed, |m| m.as_str().trim());

    Some(name.to_string())
}

/// The first run of ASCII digits, if it is a plausible age.
pub fn extract_age(text: &str) -> Option<u8> {
    let digits = FIRST_NUMBER.find(text)?;
    // Overflowing values fail to parse and are treated like any other miss
    let age: u8 = digits.as_str().parse().ok()?;
    (age > 0 && age < MAX_AGE).then_some(age)
}

/// The trimmed message, verbatim.
pub fn extract_query(text: &str) -> Option<String> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

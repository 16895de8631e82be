//! Ward classification
//!
//! Keyword matching over the lowercased message. Emergency keywords are
//! checked before mental-health keywords; anything else is general.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

const EMERGENCY_KEYWORDS: &[&str] = &[
    "emergency",
    "urgent",
    "accident",
    "injured",
    "bleeding",
    "chest pain",
    "heart attack",
    "stroke",
    "unconscious",
    "severe pain",
    "trauma",
];

const MENTAL_HEALTH_KEYWORDS: &[&str] = &[
    "mental",
    "depression",
    "anxiety",
    "suicidal",
    "therapy",
    "psychiatrist",
    "psychologist",
    "counseling",
    "panic",
    "stress",
    "emotional",
    "psychiatric",
];

/// Hospital ward a session is routed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Ward {
    GeneralWard,
    EmergencyWard,
    MentalHealthWard,
}

impl Ward {
    pub const ALL: [Ward; 3] = [
        Ward::GeneralWard,
        Ward::EmergencyWard,
        Ward::MentalHealthWard,
    ];

    /// Wire/storage name
    pub fn as_str(self) -> &'static str {
        match self {
            Ward::GeneralWard => "general_ward",
            Ward::EmergencyWard => "emergency_ward",
            Ward::MentalHealthWard => "mental_health_ward",
        }
    }

    /// Human-facing name used in replies
    pub fn display_name(self) -> &'static str {
        match self {
            Ward::GeneralWard => "General Ward",
            Ward::EmergencyWard => "Emergency Ward",
            Ward::MentalHealthWard => "Mental Health Ward",
        }
    }
}

impl fmt::Display for Ward {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("Unknown ward: {0}")]
pub struct ParseWardError(String);

impl FromStr for Ward {
    type Err = ParseWardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ward::ALL
            .into_iter()
            .find(|ward| ward.as_str() == s)
            .ok_or_else(|| ParseWardError(s.to_string()))
    }
}

/// Classification outcome with the keyword that decided it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub ward: Ward,
    /// `None` when the general-ward fallback applied
    pub keyword: Option<&'static str>,
}

/// Classify free text into a ward.
#[allow(dead_code)] // Used in tests
pub fn classify(text: &str) -> Ward {
    classify_with_reason(text).ward
}

/// Classify free text and report which keyword matched.
pub fn classify_with_reason(text: &str) -> Classification {
    let lowered = text.to_lowercase();

    if let Some(keyword) = first_match(&lowered, EMERGENCY_KEYWORDS) {
        return Classification {
            ward: Ward::EmergencyWard,
            keyword: Some(keyword),
        };
    }
    if let Some(keyword) = first_match(&lowered, MENTAL_HEALTH_KEYWORDS) {
        return Classification {
            ward: Ward::MentalHealthWard,
            keyword: Some(keyword),
        };
    }
    Classification {
        ward: Ward::GeneralWard,
        keyword: None,
    }
}

fn first_match(text: &str, keywords: &[&'static str]) -> Option<&'static str> {
    keywords.iter().copied().find(|keyword| text.contains(keyword))
}

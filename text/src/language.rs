//! Query language detection.
//!
//! The corpus is bilingual (English and Arabic), so expansion prompts and
//! the no-context answer need to know which script the caller wrote in.
//! Classification is by script presence only; no dictionaries involved.

use serde::{Deserialize, Serialize};

/// Writing script of a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Script {
    /// Latin letters (treated as English downstream).
    Latin,
    /// Arabic block letters.
    Arabic,
}

/// Detected language of a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectedLanguage {
    /// Dominant script.
    pub primary: Script,

    /// Both scripts present in sufficient quantity.
    pub mixed: bool,
}

impl DetectedLanguage {
    /// Whether the dominant script is Arabic.
    pub fn is_arabic(&self) -> bool {
        self.primary == Script::Arabic
    }

    /// Short tag for prompts ("ar", "en", "mixed").
    pub fn tag(&self) -> &'static str {
        if self.mixed {
            "mixed"
        } else {
            match self.primary {
                Script::Latin => "en",
                Script::Arabic => "ar",
            }
        }
    }
}

/// Minimum letters of each script before a query counts as mixed.
const MIXED_FLOOR: usize = 3;

/// Classify a query by script presence.
pub fn detect_language(text: &str) -> DetectedLanguage {
    let mut latin = 0usize;
    let mut arabic = 0usize;
    for c in text.chars() {
        if c.is_ascii_alphabetic() {
            latin += 1;
        } else if ('\u{0600}'..='\u{06ff}').contains(&c) {
            arabic += 1;
        }
    }

    let primary = if arabic > 0 && arabic >= latin {
        Script::Arabic
    } else {
        Script::Latin
    };

    DetectedLanguage {
        primary,
        mixed: latin >= MIXED_FLOOR && arabic >= MIXED_FLOOR,
    }
}

// src/services/numeric.rs

//! Numeric token parsing for stat cells.
//!
//! Cells look like `120/150/180`, `10.9K`, `-5`, `12%` or `120 150 180`, often
//! with leftover markup around them. A `K` suffix multiplies by 1000.

use std::sync::LazyLock;

use regex::Regex;

use crate::models::{ExtractionConfig, StatValues};

static TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(-?)(\d+)(?:\.(\d+))?(?:([kK])\b)?").expect("valid numeric token pattern")
});

/// Converts stat cells into integer sequences.
#[derive(Debug, Clone)]
pub struct NumericParser {
    placeholder: String,
    strip_percent: bool,
}

impl NumericParser {
    pub fn new(placeholder: impl Into<String>, strip_percent: bool) -> Self {
        Self {
            placeholder: placeholder.into(),
            strip_percent,
        }
    }

    pub fn from_config(config: &ExtractionConfig) -> Self {
        Self::new(config.placeholder.clone(), config.strip_percent)
    }

    /// Parse every number in `text`.
    ///
    /// Returns `None` instead of an empty sequence, so an absent stat is never
    /// confused with a zero roll.
    pub fn parse(&self, text: &str) -> Option<StatValues> {
        let trimmed = text.trim();
        if trimmed.is_empty() || trimmed == self.placeholder {
            return None;
        }

        let cleaned;
        let text = if self.strip_percent {
            cleaned = trimmed.replace('%', "");
            cleaned.as_str()
        } else {
            trimmed
        };

        let values: StatValues = TOKEN_RE
            .captures_iter(text)
            .filter_map(|caps| {
                let whole = caps.get(0)?;
                // A dash right after a digit or letter is a range separator, not a sign.
                let negative = !caps[1].is_empty()
                    && !text[..whole.start()]
                        .chars()
                        .next_back()
                        .is_some_and(|c| c.is_alphanumeric());
                let fraction = caps.get(3).map(|m| m.as_str());
                let thousands = caps.get(4).is_some();
                parse_token(&caps[2], fraction, thousands, negative)
            })
            .collect();

        if values.is_empty() { None } else { Some(values) }
    }

    /// First number in `text`, if any.
    pub fn first(&self, text: &str) -> Option<i64> {
        self.parse(text).and_then(|values| values.first().copied())
    }
}

impl Default for NumericParser {
    fn default() -> Self {
        Self::from_config(&ExtractionConfig::default())
    }
}

/// Turn one regex match into an integer.
///
/// With the thousands suffix the fraction is applied exactly and truncated
/// (`10.9K` is 10900, `1.2345K` is 1234). Without it a fractional token is not
/// an integer and is discarded.
fn parse_token(digits: &str, fraction: Option<&str>, thousands: bool, negative: bool) -> Option<i64> {
    let whole: i64 = digits.parse().ok()?;

    let magnitude = if thousands {
        let mut millis = String::with_capacity(3);
        millis.extend(fraction.unwrap_or("").chars().take(3));
        while millis.len() < 3 {
            millis.push('0');
        }
        let millis: i64 = millis.parse().ok()?;
        whole.checked_mul(1000)?.checked_add(millis)?
    } else if fraction.is_some() {
        return None;
    } else {
        whole
    };

    Some(if negative { -magnitude } else { magnitude })
}

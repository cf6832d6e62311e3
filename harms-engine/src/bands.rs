//! Priority-ordered decision tables.
//!
//! A table is a list of `(predicate, output)` rows checked top to bottom with a
//! mandatory fallback, so more specific rows must come before generic ones
//! ("sit-to-stand device (powered)" before "lift").

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum BandPredicate {
    /// Case-insensitive substring.
    Contains(String),
    ContainsAny(Vec<String>),
    /// Case-insensitive, trimmed equality.
    Equals(String),
    Above(f64),
    AtLeast(f64),
    Below(f64),
    AtMost(f64),
    /// Inclusive on both ends.
    Between { min: f64, max: f64 },
}

/// Value being classified.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BandInput<'a> {
    Text(&'a str),
    Number(f64),
}

impl BandInput<'_> {
    fn number(&self) -> Option<f64> {
        let value = match self {
            BandInput::Number(value) => Some(*value),
            BandInput::Text(text) => text.trim().parse::<f64>().ok(),
        };
        value.filter(|value| value.is_finite())
    }
}

impl BandPredicate {
    pub fn matches(&self, input: &BandInput<'_>) -> bool {
        match self {
            BandPredicate::Contains(needle) => {
                text_of(input).is_some_and(|text| contains(&text, needle))
            }
            BandPredicate::ContainsAny(needles) => text_of(input)
                .is_some_and(|text| needles.iter().any(|needle| contains(&text, needle))),
            BandPredicate::Equals(expected) => {
                text_of(input).is_some_and(|text| text.trim() == expected.trim().to_lowercase())
            }
            BandPredicate::Above(limit) => input.number().is_some_and(|value| value > *limit),
            BandPredicate::AtLeast(limit) => input.number().is_some_and(|value| value >= *limit),
            BandPredicate::Below(limit) => input.number().is_some_and(|value| value < *limit),
            BandPredicate::AtMost(limit) => input.number().is_some_and(|value| value <= *limit),
            BandPredicate::Between { min, max } => input
                .number()
                .is_some_and(|value| value >= *min && value <= *max),
        }
    }
}

fn text_of(input: &BandInput<'_>) -> Option<String> {
    match input {
        BandInput::Text(text) => Some(text.to_lowercase()),
        BandInput::Number(_) => None,
    }
}

fn contains(lowered: &str, needle: &str) -> bool {
    let needle = needle.trim().to_lowercase();
    !needle.is_empty() && lowered.contains(&needle)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Band<T> {
    pub when: BandPredicate,
    pub then: T,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Bands<T> {
    pub bands: Vec<Band<T>>,
    pub otherwise: T,
}

impl<T> Bands<T> {
    pub fn new(otherwise: T) -> Self {
        Self {
            bands: Vec::new(),
            otherwise,
        }
    }

    /// Appends a row at the lowest priority so far.
    pub fn with(mut self, when: BandPredicate, then: T) -> Self {
        self.bands.push(Band { when, then });
        self
    }

    /// Output of the first matching row, or the fallback.
    pub fn classify(&self, input: BandInput<'_>) -> &T {
        self.bands
            .iter()
            .find(|band| band.when.matches(&input))
            .map(|band| &band.then)
            .unwrap_or(&self.otherwise)
    }

    pub fn classify_text(&self, text: &str) -> &T {
        self.classify(BandInput::Text(text))
    }

    pub fn classify_number(&self, value: f64) -> &T {
        self.classify(BandInput::Number(value))
    }
}

/// Shorthand for `ContainsAny` rows in default tables.
pub(crate) fn any_of(needles: &[&str]) -> BandPredicate {
    BandPredicate::ContainsAny(needles.iter().map(|needle| needle.to_string()).collect())
}

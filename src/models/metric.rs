//! Metric model
//!
//! Lab metrics as delivered by the analysis provider, plus the classification
//! rules that normalize a measured value against its reference range.

use serde::{Deserialize, Serialize};

use crate::error::ReportError;

/// Normalized metric classification. No other values are permitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Classification {
    Normal,
    High,
    Low,
}

impl Classification {
    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::Normal => "Normal",
            Classification::High => "High",
            Classification::Low => "Low",
        }
    }

    /// High and Low are abnormal; Normal is not.
    pub fn is_abnormal(&self) -> bool {
        matches!(self, Classification::High | Classification::Low)
    }
}

/// A single lab metric. Immutable once produced by the analysis provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metric {
    pub name: String,
    pub value: String,
    pub unit: String,
    pub reference_range: String,
    pub classification: Classification,
    pub explanation: String,
}

impl Metric {
    pub fn is_abnormal(&self) -> bool {
        self.classification.is_abnormal()
    }
}

/// Classify a measured value against a reference range.
///
/// Both bounds are inclusive: `low <= value <= high` is Normal.
pub fn classify(value: f64, range_low: f64, range_high: f64) -> Classification {
    if value > range_high {
        Classification::High
    } else if value < range_low {
        Classification::Low
    } else {
        Classification::Normal
    }
}

/// Parse a reference range string like "70-99" or "0.5 - 1.2" into (low, high).
///
/// Accepts an en-dash separator and surrounding whitespace. Anything that does
/// not yield two numeric bounds with low <= high fails with
/// `MalformedReferenceRange`; it is never silently coerced.
pub fn parse_reference_range(range: &str) -> Result<(f64, f64), ReportError> {
    let normalized = range.replace('\u{2013}', "-");

    // The separator is any '-' past the first character, so a leading minus
    // sign on the low bound still parses.
    for (idx, ch) in normalized.char_indices().skip(1) {
        if ch != '-' {
            continue;
        }
        let (low_str, high_str) = normalized.split_at(idx);
        let high_str = &high_str[1..];
        if let (Ok(low), Ok(high)) = (
            low_str.trim().parse::<f64>(),
            high_str.trim().parse::<f64>(),
        ) {
            if low <= high {
                return Ok((low, high));
            }
        }
    }

    Err(ReportError::MalformedReferenceRange(range.to_string()))
}

/// Parse the range and classify the value against it in one step.
pub fn classify_against_range(value: f64, range: &str) -> Result<Classification, ReportError> {
    let (low, high) = parse_reference_range(range)?;
    Ok(classify(value, low, high))
}

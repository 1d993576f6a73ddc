//! Body profile model
//!
//! User-entered body measurements, immutable per analysis, and the BMI
//! derivation with its fixed classification buckets.

use serde::{Deserialize, Serialize};

use crate::error::ReportError;

/// Gender enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "male" | "m" => Some(Gender::Male),
            "female" | "f" => Some(Gender::Female),
            _ => None,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
        }
    }
}

/// User-entered body profile, immutable per analysis
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BodyProfile {
    pub age: u32,
    pub height_cm: f64,
    pub weight_kg: f64,
    pub gender: Gender,
    pub occupation: String,
}

/// BMI classification buckets at fixed thresholds 18.5 / 24.9 / 29.9
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BmiClass {
    Underweight,
    Normal,
    Overweight,
    Obese,
}

impl BmiClass {
    pub fn display_name(&self) -> &'static str {
        match self {
            BmiClass::Underweight => "Underweight",
            BmiClass::Normal => "Normal",
            BmiClass::Overweight => "Overweight",
            BmiClass::Obese => "Obese",
        }
    }
}

/// Derived BMI value and bucket. Computed locally, never stored from the provider.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BmiResult {
    pub value: f64,
    pub class: BmiClass,
}

/// Compute BMI as weight_kg / (height_cm / 100)^2 and bucket it.
///
/// Bucket boundaries use strict `<` against the upper bound of each bucket,
/// so a BMI of exactly 18.5 lands in the Normal bucket.
pub fn compute_bmi(height_cm: f64, weight_kg: f64) -> Result<BmiResult, ReportError> {
    if height_cm <= 0.0 {
        return Err(ReportError::InvalidBodyProfile(format!(
            "height must be positive, got {height_cm}"
        )));
    }
    if weight_kg <= 0.0 {
        return Err(ReportError::InvalidBodyProfile(format!(
            "weight must be positive, got {weight_kg}"
        )));
    }

    let height_m = height_cm / 100.0;
    let value = weight_kg / (height_m * height_m);

    let class = if value < 18.5 {
        BmiClass::Underweight
    } else if value < 24.9 {
        BmiClass::Normal
    } else if value < 29.9 {
        BmiClass::Overweight
    } else {
        BmiClass::Obese
    };

    Ok(BmiResult { value, class })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bmi_value() {
        let bmi = compute_bmi(170.0, 70.0).unwrap();
        assert!((bmi.value - 24.221).abs() < 0.001);
        assert_eq!(bmi.class, BmiClass::Normal);
    }

    #[test]
    fn test_bmi_underweight_boundary() {
        // 53.465 kg at 170 cm is BMI ~18.4999, just under the threshold
        let bmi = compute_bmi(170.0, 53.465).unwrap();
        assert!(bmi.value < 18.5);
        assert_eq!(bmi.class, BmiClass::Underweight);
    }

    #[test]
    fn test_bmi_exactly_at_18_5_is_normal() {
        // 53.48 kg at 170 cm crosses 18.5; strict `<` excludes 18.5 from Underweight
        let bmi = compute_bmi(170.0, 53.48).unwrap();
        assert!(bmi.value >= 18.5);
        assert_eq!(bmi.class, BmiClass::Normal);
    }

    #[test]
    fn test_bmi_overweight_and_obese() {
        assert_eq!(compute_bmi(170.0, 75.0).unwrap().class, BmiClass::Overweight);
        assert_eq!(compute_bmi(170.0, 95.0).unwrap().class, BmiClass::Obese);
    }

    #[test]
    fn test_bmi_rejects_non_positive_inputs() {
        assert!(matches!(
            compute_bmi(0.0, 70.0),
            Err(ReportError::InvalidBodyProfile(_))
        ));
        assert!(matches!(
            compute_bmi(170.0, -1.0),
            Err(ReportError::InvalidBodyProfile(_))
        ));
    }
}

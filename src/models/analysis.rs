//! Analysis response and record models
//!
//! The analysis provider returns a JSON object that must strictly match this
//! schema. Any structural deviation is a SchemaMismatch, not a partial result.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::category::Category;
use super::metric::{classify_against_range, Metric};
use super::profile::BodyProfile;
use crate::error::ReportError;

/// Overall health score on the fixed 0-100 scale
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverallScore {
    pub score: f64,
    pub label: String,
    pub explanation: String,
}

/// Provider commentary on the precomputed BMI
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BmiAnalysis {
    pub summary: String,
}

/// Category grouping wrapper, matching the provider schema shape
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthAnalysis {
    pub categories: Vec<Category>,
}

/// Store a recommended food can be purchased from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SuggestedStore {
    #[serde(rename = "Lotte Mart")]
    LotteMart,
    #[serde(rename = "Co.op Food")]
    CoopFood,
    #[serde(rename = "Bách Hóa Xanh")]
    BachHoaXanh,
}

impl SuggestedStore {
    pub fn display_name(&self) -> &'static str {
        match self {
            SuggestedStore::LotteMart => "Lotte Mart",
            SuggestedStore::CoopFood => "Co.op Online",
            SuggestedStore::BachHoaXanh => "Bách Hóa Xanh",
        }
    }

    /// Search URL for a food name at this store
    pub fn search_url(&self, food_name: &str) -> String {
        let query: String = food_name
            .bytes()
            .flat_map(|b| {
                if b.is_ascii_alphanumeric() {
                    vec![b as char]
                } else {
                    format!("%{:02X}", b).chars().collect()
                }
            })
            .collect();
        match self {
            SuggestedStore::LotteMart => {
                format!("https://www.lottemart.vn/search?keyword={query}")
            }
            SuggestedStore::CoopFood => format!("https://cooponline.vn/search/?text={query}"),
            SuggestedStore::BachHoaXanh => {
                format!("https://www.bachhoaxanh.com/tim-kiem?key={query}")
            }
        }
    }
}

/// A recommended food with purchase suggestion
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendedFood {
    pub food_name: String,
    pub benefit: String,
    pub serving_suggestion: String,
    pub suggested_store: SuggestedStore,
}

/// The full structured analysis result from the provider
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResponse {
    pub overall_health_score: OverallScore,
    pub bmi_analysis: BmiAnalysis,
    pub health_analysis: HealthAnalysis,
    pub metrics: Vec<Metric>,
    pub recommended_foods: Vec<RecommendedFood>,
}

/// A saved analysis. Created once per completed analysis, never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub date: DateTime<Utc>,
    pub inputs: BodyProfile,
    pub analysis: AnalysisResponse,
}

/// Validate a raw provider response against the analysis schema.
///
/// Structural deviation, out-of-range scores, or empty category names all fail
/// with SchemaMismatch before any field is consumed downstream.
pub fn validate_analysis(raw: &serde_json::Value) -> Result<AnalysisResponse, ReportError> {
    let response: AnalysisResponse = serde_json::from_value(raw.clone())
        .map_err(|e| ReportError::SchemaMismatch(e.to_string()))?;

    let overall = response.overall_health_score.score;
    if !(0.0..=100.0).contains(&overall) {
        return Err(ReportError::SchemaMismatch(format!(
            "overall score {overall} outside [0, 100]"
        )));
    }

    for cat in &response.health_analysis.categories {
        if cat.category_name.is_empty() {
            return Err(ReportError::SchemaMismatch(
                "category with empty name token list".to_string(),
            ));
        }
        if !(0.0..=10.0).contains(&cat.score) {
            return Err(ReportError::SchemaMismatch(format!(
                "category '{}' score {} outside [0, 10]",
                cat.display_name(),
                cat.score
            )));
        }
    }

    Ok(response)
}

/// Re-derive metric classifications from numeric comparison against the
/// parsed reference range bounds.
///
/// A metric whose value is not numeric keeps the provider's (already
/// enum-validated) classification. A range that fails to parse is surfaced as
/// MalformedReferenceRange, never coerced.
pub fn annotate_metrics(response: &mut AnalysisResponse) -> Result<(), ReportError> {
    for metric in &mut response.metrics {
        if let Ok(value) = metric.value.trim().parse::<f64>() {
            metric.classification = classify_against_range(value, &metric.reference_range)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Classification;
    use serde_json::json;

    fn sample_response_json() -> serde_json::Value {
        json!({
            "overallHealthScore": {
                "score": 82.0,
                "label": "Good",
                "explanation": "Most metrics within range."
            },
            "bmiAnalysis": { "summary": "BMI in the normal range." },
            "healthAnalysis": {
                "categories": [
                    {
                        "categoryName": ["Blood", "Sugar", "Control"],
                        "score": 6.5,
                        "summary": "Slightly elevated fasting glucose.",
                        "iconName": "Droplets"
                    }
                ]
            },
            "metrics": [
                {
                    "name": "Glucose",
                    "value": "105",
                    "unit": "mg/dL",
                    "referenceRange": "70-99",
                    "classification": "Normal",
                    "explanation": "Fasting glucose."
                }
            ],
            "recommendedFoods": [
                {
                    "foodName": "Oats",
                    "benefit": "Soluble fiber helps glucose control.",
                    "servingSuggestion": "One bowl at breakfast.",
                    "suggestedStore": "Lotte Mart"
                }
            ]
        })
    }

    #[test]
    fn test_validate_accepts_well_formed_response() {
        let response = validate_analysis(&sample_response_json()).unwrap();
        assert_eq!(response.metrics.len(), 1);
        assert_eq!(
            response.health_analysis.categories[0].display_name(),
            "Blood Sugar Control"
        );
    }

    #[test]
    fn test_validate_rejects_missing_field() {
        let mut raw = sample_response_json();
        raw.as_object_mut().unwrap().remove("metrics");
        assert!(matches!(
            validate_analysis(&raw),
            Err(ReportError::SchemaMismatch(_))
        ));
    }

    #[test]
    fn test_validate_rejects_unknown_classification() {
        let mut raw = sample_response_json();
        raw["metrics"][0]["classification"] = json!("Borderline");
        assert!(matches!(
            validate_analysis(&raw),
            Err(ReportError::SchemaMismatch(_))
        ));
    }

    #[test]
    fn test_validate_rejects_out_of_range_scores() {
        let mut raw = sample_response_json();
        raw["overallHealthScore"]["score"] = json!(120.0);
        assert!(validate_analysis(&raw).is_err());

        let mut raw = sample_response_json();
        raw["healthAnalysis"]["categories"][0]["score"] = json!(11.0);
        assert!(validate_analysis(&raw).is_err());
    }

    #[test]
    fn test_annotate_rederives_classification() {
        // Provider said Normal but 105 > 99; the local comparison wins
        let mut response = validate_analysis(&sample_response_json()).unwrap();
        annotate_metrics(&mut response).unwrap();
        assert_eq!(response.metrics[0].classification, Classification::High);
    }

    #[test]
    fn test_annotate_surfaces_malformed_range() {
        let mut raw = sample_response_json();
        raw["metrics"][0]["referenceRange"] = json!("see lab notes");
        let mut response = validate_analysis(&raw).unwrap();
        assert!(matches!(
            annotate_metrics(&mut response),
            Err(ReportError::MalformedReferenceRange(_))
        ));
    }

    #[test]
    fn test_store_search_url_encodes_name() {
        let url = SuggestedStore::LotteMart.search_url("rolled oats");
        assert_eq!(url, "https://www.lottemart.vn/search?keyword=rolled%20oats");
    }
}

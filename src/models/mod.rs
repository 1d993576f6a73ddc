//! Data models
//!
//! Structs for provider responses, derived metrics, and saved analyses.

mod analysis;
mod category;
mod metric;
mod plan;
mod profile;

pub use analysis::{
    annotate_metrics, validate_analysis, AnalysisRecord, AnalysisResponse, BmiAnalysis,
    HealthAnalysis, OverallScore, RecommendedFood, SuggestedStore,
};
pub use category::{Category, CategoryStatus, IconKey, ZoneBand, ZONE_BANDS};
pub use metric::{classify, classify_against_range, parse_reference_range, Classification, Metric};
pub use plan::{
    validate_meal_plan, validate_workout_plan, Dish, Exercise, MealPlanDay, WorkoutPlanDay,
    REST_DAY_FOCUS,
};
pub use profile::{compute_bmi, BmiClass, BmiResult, BodyProfile, Gender};

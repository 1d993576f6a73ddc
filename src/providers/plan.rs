//! Plan provider
//!
//! Generates meal and workout plans grounded in the newest saved analysis.
//! The health summary sent with every plan prompt is built locally from the
//! record; the provider never sees raw lab files here.

use std::sync::Arc;

use super::{CompletionRequest, JsonCompletion};
use crate::error::ReportResult;
use crate::models::{
    compute_bmi, validate_meal_plan, validate_workout_plan, AnalysisRecord, MealPlanDay,
    WorkoutPlanDay, REST_DAY_FOCUS,
};

#[derive(Debug, Clone)]
pub struct MealPlanRequest {
    pub days: u32,
    pub preferences: String,
}

#[derive(Debug, Clone)]
pub struct WorkoutPlanRequest {
    pub days: u32,
    pub fitness_level: String,
    pub goal: String,
}

pub struct PlanProvider {
    backend: Arc<dyn JsonCompletion>,
}

impl PlanProvider {
    pub fn new(backend: Arc<dyn JsonCompletion>) -> Self {
        PlanProvider { backend }
    }

    pub async fn generate_meal_plan(
        &self,
        request: &MealPlanRequest,
        record: &AnalysisRecord,
    ) -> ReportResult<Vec<MealPlanDay>> {
        let prompt = build_meal_plan_prompt(request, &build_health_summary(record)?);
        let raw = self
            .backend
            .complete_json(CompletionRequest::text(prompt))
            .await?;
        validate_meal_plan(&raw)
    }

    pub async fn generate_workout_plan(
        &self,
        request: &WorkoutPlanRequest,
        record: &AnalysisRecord,
    ) -> ReportResult<Vec<WorkoutPlanDay>> {
        let prompt = build_workout_plan_prompt(request, &build_health_summary(record)?);
        let raw = self
            .backend
            .complete_json(CompletionRequest::text(prompt))
            .await?;
        validate_workout_plan(&raw)
    }
}

/// Condense one analysis record into the summary text every plan prompt
/// carries: overall score, BMI, categories, abnormal metrics, profile.
pub fn build_health_summary(record: &AnalysisRecord) -> ReportResult<String> {
    let analysis = &record.analysis;
    let inputs = &record.inputs;
    let bmi = compute_bmi(inputs.height_cm, inputs.weight_kg)?;

    let mut summary = format!(
        "Overall health score: {:.0}/100 ({})\n",
        analysis.overall_health_score.score, analysis.overall_health_score.label
    );
    summary.push_str(&format!(
        "BMI: {:.1} ({}). {}\n",
        bmi.value,
        bmi.class.display_name(),
        analysis.bmi_analysis.summary
    ));

    if !analysis.health_analysis.categories.is_empty() {
        summary.push_str("Category scores:\n");
        for cat in &analysis.health_analysis.categories {
            summary.push_str(&format!("- {}: {:.1}/10\n", cat.display_name(), cat.score));
        }
    }

    let abnormal: Vec<_> = analysis.metrics.iter().filter(|m| m.is_abnormal()).collect();
    if !abnormal.is_empty() {
        summary.push_str("Abnormal metrics:\n");
        for metric in abnormal {
            summary.push_str(&format!(
                "- {}: {} {} ({} vs reference {})\n",
                metric.name,
                metric.value,
                metric.unit,
                metric.classification.as_str(),
                metric.reference_range
            ));
        }
    }

    summary.push_str(&format!(
        "Profile: {} year old {}, {:.0} cm, {:.1} kg, {}.",
        inputs.age,
        inputs.gender.display_name().to_lowercase(),
        inputs.height_cm,
        inputs.weight_kg,
        inputs.occupation
    ));

    Ok(summary)
}

fn build_meal_plan_prompt(request: &MealPlanRequest, health_summary: &str) -> String {
    format!(
        "You are a nutritionist. Create a {days}-day meal plan for the person \
         described below. Respond with a JSON array of exactly {days} day objects, \
         each with keys \"day\", \"breakfast\", \"lunch\", \"dinner\" (each a \
         {{ \"dishName\", \"notes\" }} object) and \"dailyTip\".\n\
         \n\
         Dietary preferences: {preferences}\n\
         \n\
         Health summary:\n{health_summary}",
        days = request.days,
        preferences = if request.preferences.is_empty() {
            "none"
        } else {
            request.preferences.as_str()
        },
    )
}

fn build_workout_plan_prompt(request: &WorkoutPlanRequest, health_summary: &str) -> String {
    format!(
        "You are a fitness coach. Create a {days}-day workout plan for the person \
         described below. Respond with a JSON array of exactly {days} day objects, \
         each with keys \"day\", \"workoutFocus\", \"exercises\" (array of \
         {{ \"name\", \"sets\", \"reps\", \"notes\" }}) and \"dailyFitnessTip\". \
         Rest days must use \"workoutFocus\": \"{rest}\" and an empty exercises array.\n\
         \n\
         Fitness level: {level}\n\
         Goal: {goal}\n\
         \n\
         Health summary:\n{health_summary}",
        days = request.days,
        rest = REST_DAY_FOCUS,
        level = request.fitness_level,
        goal = request.goal,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ReportError;
    use crate::models::{
        AnalysisResponse, BmiAnalysis, BodyProfile, Category, Classification, Gender,
        HealthAnalysis, IconKey, Metric, OverallScore,
    };
    use crate::providers::MockBackend;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    fn record() -> AnalysisRecord {
        AnalysisRecord {
            date: Utc.with_ymd_and_hms(2025, 6, 5, 9, 0, 0).unwrap(),
            inputs: BodyProfile {
                age: 34,
                height_cm: 170.0,
                weight_kg: 70.0,
                gender: Gender::Male,
                occupation: "office worker".to_string(),
            },
            analysis: AnalysisResponse {
                overall_health_score: OverallScore {
                    score: 82.0,
                    label: "Good".to_string(),
                    explanation: String::new(),
                },
                bmi_analysis: BmiAnalysis {
                    summary: "Within the normal range.".to_string(),
                },
                health_analysis: HealthAnalysis {
                    categories: vec![Category {
                        category_name: vec!["Blood".into(), "Sugar".into()],
                        score: 5.5,
                        summary: String::new(),
                        icon: IconKey::Droplets,
                    }],
                },
                metrics: vec![
                    Metric {
                        name: "Glucose".into(),
                        value: "105".into(),
                        unit: "mg/dL".into(),
                        reference_range: "70-99".into(),
                        classification: Classification::High,
                        explanation: String::new(),
                    },
                    Metric {
                        name: "Creatinine".into(),
                        value: "0.9".into(),
                        unit: "mg/dL".into(),
                        reference_range: "0.7-1.3".into(),
                        classification: Classification::Normal,
                        explanation: String::new(),
                    },
                ],
                recommended_foods: vec![],
            },
        }
    }

    #[test]
    fn test_health_summary_contents() {
        let summary = build_health_summary(&record()).unwrap();
        assert!(summary.contains("Overall health score: 82/100 (Good)"));
        assert!(summary.contains("BMI: 24.2 (Normal)"));
        assert!(summary.contains("Blood Sugar: 5.5/10"));
        assert!(summary.contains("Glucose: 105 mg/dL (High vs reference 70-99)"));
        // normal metrics stay out of the abnormal list
        assert!(!summary.contains("Creatinine"));
        assert!(summary.contains("34 year old male, 170 cm, 70.0 kg, office worker."));
    }

    #[test]
    fn test_meal_prompt_carries_day_count_and_summary() {
        let prompt = build_meal_plan_prompt(
            &MealPlanRequest {
                days: 7,
                preferences: "no shellfish".to_string(),
            },
            "SUMMARY",
        );
        assert!(prompt.contains("7-day meal plan"));
        assert!(prompt.contains("exactly 7 day objects"));
        assert!(prompt.contains("no shellfish"));
        assert!(prompt.contains("SUMMARY"));
    }

    #[tokio::test]
    async fn test_generate_meal_plan_validates_shape() {
        let backend = Arc::new(MockBackend::new(json!([{
            "day": "Day 1",
            "breakfast": { "dishName": "Oatmeal", "notes": "" },
            "lunch": { "dishName": "Salad", "notes": "" },
            "dinner": { "dishName": "Fish", "notes": "" },
            "dailyTip": "Hydrate."
        }])));
        let provider = PlanProvider::new(backend);
        let plan = provider
            .generate_meal_plan(
                &MealPlanRequest {
                    days: 1,
                    preferences: String::new(),
                },
                &record(),
            )
            .await
            .unwrap();
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].breakfast.dish_name, "Oatmeal");
    }

    #[tokio::test]
    async fn test_generate_workout_plan_rejects_loaded_rest_day() {
        let backend = Arc::new(MockBackend::new(json!([{
            "day": "Tuesday",
            "workoutFocus": "Rest day",
            "exercises": [{ "name": "Squat", "sets": "3", "reps": "10", "notes": "" }],
            "dailyFitnessTip": "Stretch."
        }])));
        let provider = PlanProvider::new(backend);
        let result = provider
            .generate_workout_plan(
                &WorkoutPlanRequest {
                    days: 1,
                    fitness_level: "beginner".to_string(),
                    goal: "general".to_string(),
                },
                &record(),
            )
            .await;
        assert!(matches!(result, Err(ReportError::SchemaMismatch(_))));
    }
}

//! Plan models
//!
//! Meal and workout plan schemas returned by the plan provider. The number of
//! days in a returned plan is the provider's contract; only the shape is
//! validated here.

use serde::{Deserialize, Serialize};

use crate::error::ReportError;

/// Workout focus value marking a rest day; rest days carry no exercises.
pub const REST_DAY_FOCUS: &str = "Rest day";

/// One meal within a day plan
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dish {
    pub dish_name: String,
    pub notes: String,
}

/// One day of a meal plan
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MealPlanDay {
    pub day: String,
    pub breakfast: Dish,
    pub lunch: Dish,
    pub dinner: Dish,
    pub daily_tip: String,
}

/// One exercise within a workout day
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Exercise {
    pub name: String,
    pub sets: String,
    pub reps: String,
    pub notes: String,
}

/// One day of a workout plan
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutPlanDay {
    pub day: String,
    pub workout_focus: String,
    pub exercises: Vec<Exercise>,
    pub daily_fitness_tip: String,
}

impl WorkoutPlanDay {
    pub fn is_rest_day(&self) -> bool {
        self.workout_focus == REST_DAY_FOCUS
    }
}

/// Validate a raw provider response as a meal plan array
pub fn validate_meal_plan(raw: &serde_json::Value) -> Result<Vec<MealPlanDay>, ReportError> {
    serde_json::from_value(raw.clone()).map_err(|e| ReportError::SchemaMismatch(e.to_string()))
}

/// Validate a raw provider response as a workout plan array
pub fn validate_workout_plan(raw: &serde_json::Value) -> Result<Vec<WorkoutPlanDay>, ReportError> {
    let plan: Vec<WorkoutPlanDay> =
        serde_json::from_value(raw.clone()).map_err(|e| ReportError::SchemaMismatch(e.to_string()))?;

    for day in &plan {
        if day.is_rest_day() && !day.exercises.is_empty() {
            return Err(ReportError::SchemaMismatch(format!(
                "rest day '{}' carries exercises",
                day.day
            )));
        }
    }

    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_meal_plan_parses() {
        let raw = json!([{
            "day": "Day 1",
            "breakfast": { "dishName": "Oatmeal", "notes": "With berries" },
            "lunch": { "dishName": "Grilled chicken salad", "notes": "Light dressing" },
            "dinner": { "dishName": "Steamed fish", "notes": "With greens" },
            "dailyTip": "Drink water before meals."
        }]);
        let plan = validate_meal_plan(&raw).unwrap();
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].breakfast.dish_name, "Oatmeal");
    }

    #[test]
    fn test_meal_plan_rejects_missing_meal() {
        let raw = json!([{
            "day": "Day 1",
            "breakfast": { "dishName": "Oatmeal", "notes": "" },
            "dinner": { "dishName": "Fish", "notes": "" },
            "dailyTip": "tip"
        }]);
        assert!(matches!(
            validate_meal_plan(&raw),
            Err(ReportError::SchemaMismatch(_))
        ));
    }

    #[test]
    fn test_workout_plan_rest_day_must_be_empty() {
        let raw = json!([{
            "day": "Tuesday",
            "workoutFocus": "Rest day",
            "exercises": [{ "name": "Squat", "sets": "3", "reps": "10", "notes": "" }],
            "dailyFitnessTip": "Stretch."
        }]);
        assert!(validate_workout_plan(&raw).is_err());

        let raw = json!([{
            "day": "Tuesday",
            "workoutFocus": "Rest day",
            "exercises": [],
            "dailyFitnessTip": "Stretch."
        }]);
        let plan = validate_workout_plan(&raw).unwrap();
        assert!(plan[0].is_rest_day());
    }
}

use serde::Deserialize;
use time::{macros::format_description, Date, OffsetDateTime};
use uuid::Uuid;

use super::model::{MealLogChanges, NewMealLog, MEAL_TYPES};

#[derive(Debug, Deserialize)]
pub struct CreateMealLogRequest {
    pub diet_plan_id: Option<Uuid>,
    /// YYYY-MM-DD; today (UTC) when absent.
    pub meal_date: Option<String>,
    #[serde(default)]
    pub meal_type: String,
    #[serde(default)]
    pub meal_name: String,
    pub calories: Option<i32>,
    pub protein: Option<f64>,
    pub carbs: Option<f64>,
    pub fat: Option<f64>,
    #[serde(default)]
    pub consumed: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateMealLogRequest {
    pub meal_name: Option<String>,
    pub calories: Option<i32>,
    pub protein: Option<f64>,
    pub carbs: Option<f64>,
    pub fat: Option<f64>,
    pub consumed: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct MealLogQuery {
    pub date: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}
fn default_limit() -> i64 {
    50
}

impl MealLogQuery {
    pub fn date(&self) -> Result<Option<Date>, String> {
        self.date.as_deref().map(parse_date).transpose()
    }

    /// Limit clamped to 1..=100, offset to >= 0.
    pub fn window(&self) -> (i64, i64) {
        (self.limit.clamp(1, 100), self.offset.max(0))
    }
}

pub fn parse_date(s: &str) -> Result<Date, String> {
    Date::parse(s.trim(), format_description!("[year]-[month]-[day]"))
        .map_err(|_| "Date must be in YYYY-MM-DD format".to_string())
}

fn check_amount(name: &str, value: Option<f64>) -> Result<Option<f64>, String> {
    match value {
        Some(v) if !v.is_finite() || v < 0.0 => Err(format!("{name} must be a non-negative number")),
        other => Ok(other),
    }
}

fn check_calories(value: Option<i32>) -> Result<Option<i32>, String> {
    match value {
        Some(c) if c < 0 => Err("calories must be a non-negative integer".into()),
        other => Ok(other),
    }
}

fn check_name(name: &str) -> Result<String, String> {
    let name = name.trim();
    if name.is_empty() || name.chars().count() > 255 {
        return Err("Meal name must be between 1 and 255 characters".into());
    }
    Ok(name.to_string())
}

impl CreateMealLogRequest {
    pub fn validate(self, today: OffsetDateTime) -> Result<NewMealLog, String> {
        let meal_type = self.meal_type.trim().to_lowercase();
        if !MEAL_TYPES.contains(&meal_type.as_str()) {
            return Err(format!("Meal type must be one of: {}", MEAL_TYPES.join(", ")));
        }
        let meal_date = match self.meal_date.as_deref() {
            Some(d) => parse_date(d)?,
            None => today.date(),
        };
        Ok(NewMealLog {
            diet_plan_id: self.diet_plan_id,
            meal_date,
            meal_type,
            meal_name: check_name(&self.meal_name)?,
            calories: check_calories(self.calories)?,
            protein: check_amount("protein", self.protein)?,
            carbs: check_amount("carbs", self.carbs)?,
            fat: check_amount("fat", self.fat)?,
            consumed: self.consumed,
        })
    }
}

impl UpdateMealLogRequest {
    pub fn validate(self) -> Result<MealLogChanges, String> {
        let changes = MealLogChanges {
            meal_name: self.meal_name.as_deref().map(check_name).transpose()?,
            calories: check_calories(self.calories)?,
            protein: check_amount("protein", self.protein)?,
            carbs: check_amount("carbs", self.carbs)?,
            fat: check_amount("fat", self.fat)?,
            consumed: self.consumed,
        };
        if changes.is_empty() {
            return Err("No fields to update".into());
        }
        Ok(changes)
    }
}

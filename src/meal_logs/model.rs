use serde::Serialize;
use sqlx::FromRow;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use crate::plans::model::iso_date;

pub const MEAL_TYPES: &[&str] = &["breakfast", "lunch", "dinner", "snack"];

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct MealLog {
    pub id: Uuid,
    pub user_id: Uuid,
    pub diet_plan_id: Option<Uuid>,
    #[serde(with = "iso_date")]
    pub meal_date: Date,
    pub meal_type: String,
    pub meal_name: String,
    pub calories: Option<i32>,
    pub protein: Option<f64>,
    pub carbs: Option<f64>,
    pub fat: Option<f64>,
    pub consumed: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Validated insert.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMealLog {
    pub diet_plan_id: Option<Uuid>,
    pub meal_date: Date,
    pub meal_type: String,
    pub meal_name: String,
    pub calories: Option<i32>,
    pub protein: Option<f64>,
    pub carbs: Option<f64>,
    pub fat: Option<f64>,
    pub consumed: bool,
}

/// Validated partial update; `None` leaves the column alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MealLogChanges {
    pub meal_name: Option<String>,
    pub calories: Option<i32>,
    pub protein: Option<f64>,
    pub carbs: Option<f64>,
    pub fat: Option<f64>,
    pub consumed: Option<bool>,
}

impl MealLogChanges {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

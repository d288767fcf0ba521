use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

time::serde::format_description!(pub(crate) iso_date, Date, "[year]-[month]-[day]");

pub const PLAN_DAYS: usize = 7;

/// Validated 7-day plan document, stored as JSONB in `diet_plans.plan_data`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanBody {
    pub total_calories_per_day: i32,
    pub daily_plans: Vec<DayPlan>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayPlan {
    pub day: String,
    #[serde(with = "iso_date")]
    pub date: Date,
    pub meals: Vec<PlannedMeal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedMeal {
    pub meal_type: String,
    pub meal_name: String,
    pub foods: Vec<FoodItem>,
    pub total_calories: f64,
    pub total_protein: f64,
    pub total_carbs: f64,
    pub total_fat: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoodItem {
    pub name: String,
    pub portion: String,
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
}

/// A persisted diet plan.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DietPlan {
    pub id: Uuid,
    pub user_id: Uuid,
    pub plan_name: String,
    #[serde(with = "iso_date")]
    pub start_date: Date,
    #[serde(with = "iso_date")]
    pub end_date: Date,
    pub total_calories: i32,
    pub plan_data: PlanBody,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, FromRow)]
pub struct DietPlanRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub plan_name: String,
    pub start_date: Date,
    pub end_date: Date,
    pub total_calories: i32,
    pub plan_data: sqlx::types::Json<PlanBody>,
    pub created_at: OffsetDateTime,
}

impl From<DietPlanRow> for DietPlan {
    fn from(r: DietPlanRow) -> Self {
        Self {
            id: r.id,
            user_id: r.user_id,
            plan_name: r.plan_name,
            start_date: r.start_date,
            end_date: r.end_date,
            total_calories: r.total_calories,
            plan_data: r.plan_data.0,
            created_at: r.created_at,
        }
    }
}

/// Everything needed to insert a plan; id and timestamp come from the store.
#[derive(Debug, Clone, PartialEq)]
pub struct NewDietPlan {
    pub user_id: Uuid,
    pub plan_name: String,
    pub start_date: Date,
    pub end_date: Date,
    pub total_calories: i32,
    pub plan_data: PlanBody,
}

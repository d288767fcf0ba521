//! Calorie targets and the profile defaults used when drafting a plan.

use crate::users::{ActivityLevel, DietPreference, Gender, UserProfile};

pub const DEFAULT_HEIGHT_CM: f64 = 170.0;
pub const DEFAULT_HEALTH_GOALS: &str = "Maintain healthy weight";

/// Basal metabolic rate (Mifflin-St Jeor), kcal/day.
pub fn bmr(weight_kg: f64, height_cm: f64, age: i32, gender: Gender) -> i32 {
    let base = 10.0 * weight_kg + 6.25 * height_cm - 5.0 * f64::from(age);
    let adjusted = match gender {
        Gender::Male => base + 5.0,
        Gender::Female | Gender::Other => base - 161.0,
    };
    adjusted.round() as i32
}

pub fn activity_multiplier(level: ActivityLevel) -> f64 {
    match level {
        ActivityLevel::Sedentary => 1.2,
        ActivityLevel::Light => 1.375,
        ActivityLevel::Moderate => 1.55,
        ActivityLevel::Active => 1.725,
        ActivityLevel::VeryActive => 1.9,
    }
}

/// Total daily energy expenditure, kcal/day.
pub fn tdee(bmr: i32, level: ActivityLevel) -> i32 {
    (f64::from(bmr) * activity_multiplier(level)).round() as i32
}

/// Profile attributes with generation defaults filled in.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanInputs {
    pub age: i32,
    pub gender: Gender,
    pub weight_kg: f64,
    pub height_cm: f64,
    pub activity_level: ActivityLevel,
    pub diet_preference: DietPreference,
    pub health_goals: String,
    pub daily_calories: i32,
}

impl PlanInputs {
    pub fn from_profile(p: &UserProfile) -> Self {
        let height_cm = p.height.unwrap_or(DEFAULT_HEIGHT_CM);
        let activity_level = p.activity_level.unwrap_or(ActivityLevel::Moderate);
        let health_goals = p
            .health_goals
            .as_deref()
            .map(str::trim)
            .filter(|g| !g.is_empty())
            .unwrap_or(DEFAULT_HEALTH_GOALS)
            .to_string();
        Self {
            age: p.age,
            gender: p.gender,
            weight_kg: p.weight,
            height_cm,
            activity_level,
            diet_preference: p.diet_preference.unwrap_or(DietPreference::Balanced),
            health_goals,
            daily_calories: tdee(bmr(p.weight, height_cm, p.age, p.gender), activity_level),
        }
    }
}

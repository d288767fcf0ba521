//! Renders a profile into the instruction sent to the model.

use time::{Date, Duration};

use super::model::PLAN_DAYS;
use crate::nutrition::PlanInputs;

const DAY_NAMES: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

/// Builds the plan request. Output depends only on the arguments.
pub fn build_prompt(inputs: &PlanInputs, start_date: Date) -> String {
    let mut p = String::with_capacity(4096);
    let calories = inputs.daily_calories;
    let diet = inputs.diet_preference.as_str();

    p.push_str(&format!(
        "Create exactly one {PLAN_DAYS}-day meal plan for a {}-year-old {} person.\n",
        inputs.age,
        inputs.gender.as_str()
    ));
    p.push('\n');
    p.push_str("User details (treat every item as a hard constraint):\n");
    p.push_str(&format!("- Age: {} years\n", inputs.age));
    p.push_str(&format!("- Gender: {}\n", inputs.gender.as_str()));
    p.push_str(&format!("- Weight: {} kg\n", inputs.weight_kg));
    p.push_str(&format!("- Height: {} cm\n", inputs.height_cm));
    p.push_str(&format!("- Activity level: {}\n", inputs.activity_level.as_str()));
    p.push_str(&format!("- Diet preference: {diet}\n"));
    p.push_str(&format!("- Health goals: {}\n", inputs.health_goals));
    p.push_str(&format!("- Daily calorie target: {calories} kcal\n"));
    p.push('\n');

    p.push_str("Requirements:\n");
    p.push_str(&format!(
        "1. The plan covers exactly {PLAN_DAYS} days, one entry per day, using these dates in order:\n"
    ));
    for offset in 0..PLAN_DAYS {
        let date = start_date + Duration::days(offset as i64);
        let weekday = DAY_NAMES[date.weekday().number_days_from_monday() as usize];
        p.push_str(&format!("   - Day {} ({weekday}): {date}\n", offset + 1));
    }
    p.push_str("2. Every day has breakfast, lunch, dinner and snacks (meal_type \"snack\").\n");
    p.push_str("3. Every meal lists specific foods with portions, calories, protein, carbs and fat.\n");
    p.push_str(&format!("4. Every meal and food must be suitable for a {diet} diet.\n"));
    p.push_str(&format!(
        "5. Each day should add up to roughly {calories} kcal and support the health goals.\n"
    ));
    p.push_str("6. Meal totals must equal the sum of their foods.\n");
    p.push_str("7. Keep meals varied, practical and easy to prepare.\n");
    p.push('\n');

    p.push_str("Respond with a single JSON object only, no prose, using exactly this shape:\n");
    p.push_str(&format!(
        r#"{{
  "total_calories_per_day": {calories},
  "daily_plans": [
    {{
      "day": "Day 1",
      "date": "{start_date}",
      "meals": [
        {{
          "meal_type": "breakfast",
          "meal_name": "Meal name",
          "foods": [
            {{
              "name": "Food item",
              "portion": "100g",
              "calories": 150,
              "protein": 10,
              "carbs": 20,
              "fat": 5
            }}
          ],
          "total_calories": 150,
          "total_protein": 10,
          "total_carbs": 20,
          "total_fat": 5
        }}
      ]
    }}
  ]
}}
"#
    ));
    p.push_str("Field types: total_calories_per_day is an integer; day, meal_type, meal_name, name \
and portion are strings; date is an ISO date (YYYY-MM-DD); calories, protein, carbs, fat and \
every total_* field are numbers (grams for macros, kcal for calories).\n");
    p.push_str(&format!("daily_plans must contain exactly {PLAN_DAYS} entries.\n"));
    p
}

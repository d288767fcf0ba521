//! Turns raw model text into a validated [`PlanBody`].
//!
//! Models like to wrap JSON in prose or code fences, so the first complete
//! JSON object in the text is used. Everything past that point is checked
//! against the plan schema; a document that fails any check is rejected as a
//! whole.

use serde_json::{Map, Value};
use time::{macros::format_description, Date};

use super::model::{DayPlan, FoodItem, PlanBody, PlannedMeal, PLAN_DAYS};
use crate::error::PlanError;

/// Finds the first well-formed JSON object in `text`, or a one-element
/// array wrapping one. Other JSON values, such as `[7]` in prose, are skipped.
pub fn extract_json(text: &str) -> Result<Value, PlanError> {
    for (idx, ch) in text.char_indices() {
        if ch != '{' && ch != '[' {
            continue;
        }
        let mut stream = serde_json::Deserializer::from_str(&text[idx..]).into_iter::<Value>();
        if let Some(Ok(value)) = stream.next() {
            if let Some(object) = as_plan_object(value) {
                return Ok(object);
            }
        }
    }
    Err(PlanError::ResponseParseError)
}

/// `{...}` as is, `[ {...} ]` as the object it wraps, anything else `None`.
fn as_plan_object(value: Value) -> Option<Value> {
    match value {
        Value::Object(_) => Some(value),
        Value::Array(mut items) if items.len() == 1 && items[0].is_object() => Some(items.remove(0)),
        _ => None,
    }
}

pub fn parse_plan(text: &str) -> Result<PlanBody, PlanError> {
    validate_plan(extract_json(text)?)
}

fn schema(path: &str, problem: &str) -> PlanError {
    PlanError::ResponseSchemaError(format!("{path}: {problem}"))
}

fn field<'a>(obj: &'a Map<String, Value>, path: &str, key: &str) -> Result<&'a Value, PlanError> {
    match obj.get(key) {
        Some(Value::Null) | None => Err(schema(&format!("{path}.{key}"), "missing")),
        Some(v) => Ok(v),
    }
}

fn object<'a>(value: &'a Value, path: &str) -> Result<&'a Map<String, Value>, PlanError> {
    value
        .as_object()
        .ok_or_else(|| schema(path, "expected an object"))
}

fn array<'a>(obj: &'a Map<String, Value>, path: &str, key: &str) -> Result<&'a Vec<Value>, PlanError> {
    field(obj, path, key)?
        .as_array()
        .ok_or_else(|| schema(&format!("{path}.{key}"), "expected an array"))
}

fn text(obj: &Map<String, Value>, path: &str, key: &str) -> Result<String, PlanError> {
    let s = field(obj, path, key)?
        .as_str()
        .ok_or_else(|| schema(&format!("{path}.{key}"), "expected a string"))?
        .trim();
    if s.is_empty() {
        return Err(schema(&format!("{path}.{key}"), "empty string"));
    }
    Ok(s.to_string())
}

/// Numbers or numeric strings; must be finite and non-negative.
fn number(obj: &Map<String, Value>, path: &str, key: &str) -> Result<f64, PlanError> {
    let full = format!("{path}.{key}");
    let n = match field(obj, path, key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .ok_or_else(|| schema(&full, "expected a number"))?;
    if !n.is_finite() || n < 0.0 {
        return Err(schema(&full, "expected a non-negative number"));
    }
    Ok(n)
}

/// Like [`number`] but the value must be a positive whole number.
fn integer(obj: &Map<String, Value>, path: &str, key: &str) -> Result<i32, PlanError> {
    let full = format!("{path}.{key}");
    let n = number(obj, path, key)?;
    if n.fract() != 0.0 || n < 1.0 || n > f64::from(i32::MAX) {
        return Err(schema(&full, "expected a positive integer"));
    }
    Ok(n as i32)
}

fn date(obj: &Map<String, Value>, path: &str, key: &str) -> Result<Date, PlanError> {
    let raw = text(obj, path, key)?;
    Date::parse(&raw, format_description!("[year]-[month]-[day]"))
        .map_err(|_| schema(&format!("{path}.{key}"), "expected an ISO date (YYYY-MM-DD)"))
}

fn food(value: &Value, path: &str) -> Result<FoodItem, PlanError> {
    let obj = object(value, path)?;
    Ok(FoodItem {
        name: text(obj, path, "name")?,
        portion: text(obj, path, "portion")?,
        calories: number(obj, path, "calories")?,
        protein: number(obj, path, "protein")?,
        carbs: number(obj, path, "carbs")?,
        fat: number(obj, path, "fat")?,
    })
}

fn meal(value: &Value, path: &str) -> Result<PlannedMeal, PlanError> {
    let obj = object(value, path)?;
    let foods = array(obj, path, "foods")?
        .iter()
        .enumerate()
        .map(|(i, f)| food(f, &format!("{path}.foods[{i}]")))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(PlannedMeal {
        meal_type: text(obj, path, "meal_type")?.to_lowercase(),
        meal_name: text(obj, path, "meal_name")?,
        foods,
        total_calories: number(obj, path, "total_calories")?,
        total_protein: number(obj, path, "total_protein")?,
        total_carbs: number(obj, path, "total_carbs")?,
        total_fat: number(obj, path, "total_fat")?,
    })
}

fn day(value: &Value, path: &str) -> Result<DayPlan, PlanError> {
    let obj = object(value, path)?;
    let meals = array(obj, path, "meals")?;
    if meals.is_empty() {
        return Err(schema(&format!("{path}.meals"), "no meals"));
    }
    Ok(DayPlan {
        day: text(obj, path, "day")?,
        date: date(obj, path, "date")?,
        meals: meals
            .iter()
            .enumerate()
            .map(|(i, m)| meal(m, &format!("{path}.meals[{i}]")))
            .collect::<Result<Vec<_>, _>>()?,
    })
}

/// Validates an extracted JSON value against the plan schema.
pub fn validate_plan(value: Value) -> Result<PlanBody, PlanError> {
    let root = object(&value, "$")?;
    let total_calories_per_day = integer(root, "$", "total_calories_per_day")?;

    let days = array(root, "$", "daily_plans")?;
    if days.len() != PLAN_DAYS {
        return Err(schema(
            "$.daily_plans",
            &format!("expected {PLAN_DAYS} days, got {}", days.len()),
        ));
    }
    let daily_plans = days
        .iter()
        .enumerate()
        .map(|(i, d)| day(d, &format!("$.daily_plans[{i}]")))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(PlanBody {
        total_calories_per_day,
        daily_plans,
    })
}

/// A meal whose declared totals disagree with its foods.
#[derive(Debug, Clone, PartialEq)]
pub struct TotalsMismatch {
    pub day: usize,
    pub meal: usize,
    pub field: &'static str,
    pub declared: f64,
    pub summed: f64,
}

const TOTALS_TOLERANCE: f64 = 1.0;

/// Compares each meal's totals against the sum of its foods.
pub fn audit_totals(plan: &PlanBody) -> Vec<TotalsMismatch> {
    let mut out = Vec::new();
    for (d, day) in plan.daily_plans.iter().enumerate() {
        for (m, meal) in day.meals.iter().enumerate() {
            let sums = [
                ("total_calories", meal.total_calories, meal.foods.iter().map(|f| f.calories).sum::<f64>()),
                ("total_protein", meal.total_protein, meal.foods.iter().map(|f| f.protein).sum()),
                ("total_carbs", meal.total_carbs, meal.foods.iter().map(|f| f.carbs).sum()),
                ("total_fat", meal.total_fat, meal.foods.iter().map(|f| f.fat).sum()),
            ];
            for (field, declared, summed) in sums {
                if (declared - summed).abs() > TOTALS_TOLERANCE {
                    out.push(TotalsMismatch {
                        day: d,
                        meal: m,
                        field,
                        declared,
                        summed,
                    });
                }
            }
        }
    }
    out
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    fn schema_msg(err: PlanError) -> String {
        match err {
            PlanError::ResponseSchemaError(msg) => msg,
            other => panic!("expected schema error, got {other:?}"),
        }
    }

    #[test]
    fn accepts_bare_json() {
        let plan = parse_plan(&plan_text()).expect("valid plan");
        assert_eq!(plan.daily_plans.len(), 7);
        assert_eq!(plan.total_calories_per_day, 2200);
        assert_eq!(plan.daily_plans[0].meals[0].foods[1].protein, 0.7);
    }

    #[test]
    fn strips_prose_and_code_fences() {
        let raw = format!(
            "Here is your plan:\n```json\n{}\n```\nEnjoy! {{not json}}",
            plan_text()
        );
        let plan = parse_plan(&raw).expect("valid plan");
        assert_eq!(plan.daily_plans.len(), 7);
        assert_eq!(plan.daily_plans[6].day, "Day 7");
    }

    #[test]
    fn skips_braces_that_are_not_json() {
        let raw = format!("Use {{curly}} braces like [this]. {}", plan_text());
        assert!(parse_plan(&raw).is_ok());
    }

    #[test]
    fn skips_bracketed_prose_before_the_plan() {
        let raw = format!(
            "Here are the [7] days you asked for:\n```json\n{}\n```",
            plan_text()
        );
        let plan = parse_plan(&raw).expect("valid plan");
        assert_eq!(plan.daily_plans.len(), 7);

        let raw = format!("Totals: [1, 2, 3] and [\"a\"]. {}", plan_text());
        assert!(parse_plan(&raw).is_ok());
    }

    #[test]
    fn json_without_an_object_is_a_parse_error() {
        assert!(matches!(
            parse_plan("[1, 2, 3]"),
            Err(PlanError::ResponseParseError)
        ));
    }

    #[test]
    fn unwraps_single_element_array() {
        let raw = format!("[{}]", plan_text());
        assert!(parse_plan(&raw).is_ok());
    }

    #[test]
    fn no_json_is_a_parse_error() {
        assert!(matches!(
            parse_plan("Sorry, I cannot help with that."),
            Err(PlanError::ResponseParseError)
        ));
        assert!(matches!(
            parse_plan("{\"total_calories_per_day\": 2000, \"daily_plans\": ["),
            Err(PlanError::ResponseParseError)
        ));
    }

    #[test]
    fn wrong_day_count_is_a_schema_error() {
        let err = parse_plan(&plan_value(6).to_string()).unwrap_err();
        assert!(schema_msg(err).contains("expected 7 days, got 6"));
        let err = parse_plan(&plan_value(8).to_string()).unwrap_err();
        assert!(schema_msg(err).contains("got 8"));
    }

    #[test]
    fn missing_field_is_a_schema_error_with_path() {
        let mut v = plan_value(7);
        v["daily_plans"][3]["meals"][1]["foods"][0]
            .as_object_mut()
            .unwrap()
            .remove("fat");
        let msg = schema_msg(validate_plan(v).unwrap_err());
        assert_eq!(msg, "$.daily_plans[3].meals[1].foods[0].fat: missing");
    }

    #[test]
    fn missing_meal_totals_is_a_schema_error() {
        let mut v = plan_value(7);
        v["daily_plans"][0]["meals"][0]
            .as_object_mut()
            .unwrap()
            .remove("total_carbs");
        assert!(matches!(
            validate_plan(v),
            Err(PlanError::ResponseSchemaError(_))
        ));
    }

    #[test]
    fn numeric_strings_are_coerced() {
        let mut v = plan_value(7);
        v["total_calories_per_day"] = Value::from("2100");
        v["daily_plans"][0]["meals"][0]["foods"][0]["protein"] = Value::from(" 8.5 ");
        let plan = validate_plan(v).expect("coerced");
        assert_eq!(plan.total_calories_per_day, 2100);
        assert_eq!(plan.daily_plans[0].meals[0].foods[0].protein, 8.5);
    }

    #[test]
    fn ambiguous_numbers_are_rejected() {
        let mut v = plan_value(7);
        v["daily_plans"][0]["meals"][0]["foods"][0]["calories"] = Value::from("about 200");
        assert!(schema_msg(validate_plan(v).unwrap_err()).contains("expected a number"));

        let mut v = plan_value(7);
        v["total_calories_per_day"] = Value::from(2000.5);
        assert!(schema_msg(validate_plan(v).unwrap_err()).contains("positive integer"));

        let mut v = plan_value(7);
        v["daily_plans"][2]["meals"][0]["total_fat"] = Value::from(-3);
        assert!(schema_msg(validate_plan(v).unwrap_err()).contains("non-negative"));
    }

    #[test]
    fn wrong_types_are_schema_errors() {
        let mut v = plan_value(7);
        v["daily_plans"][0]["meals"][0]["foods"][0]["portion"] = Value::from(100);
        assert!(schema_msg(validate_plan(v).unwrap_err()).contains("expected a string"));

        let mut v = plan_value(7);
        v["daily_plans"][0]["date"] = Value::from("next monday");
        assert!(schema_msg(validate_plan(v).unwrap_err()).contains("ISO date"));

        let mut v = plan_value(7);
        v["daily_plans"][0]["meals"] = Value::Array(vec![]);
        assert!(schema_msg(validate_plan(v).unwrap_err()).contains("no meals"));

        assert!(matches!(
            validate_plan(Value::from(vec![1, 2, 3])),
            Err(PlanError::ResponseSchemaError(_))
        ));
    }

    #[test]
    fn audit_flags_inconsistent_totals() {
        let mut plan = parse_plan(&plan_text()).unwrap();
        assert!(audit_totals(&plan).is_empty());

        plan.daily_plans[1].meals[0].total_calories = 400.0;
        let found = audit_totals(&plan);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].day, 1);
        assert_eq!(found[0].field, "total_calories");
        assert_eq!(found[0].summed, 285.0);
    }
}

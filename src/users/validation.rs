use lazy_static::lazy_static;
use regex::Regex;

use super::{
    dto::ProfileInput,
    model::{ActivityLevel, DietPreference, Gender},
};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Checked profile values. On update every field is optional; on registration
/// name, email, password, age, gender and weight are guaranteed present.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ProfileChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub age: Option<i32>,
    pub gender: Option<Gender>,
    pub weight: Option<f64>,
    /// `Some(None)` clears the stored value.
    pub height: Option<Option<f64>>,
    pub activity_level: Option<ActivityLevel>,
    pub diet_preference: Option<DietPreference>,
    pub health_goals: Option<Option<String>>,
}

fn trimmed(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string())
}

fn check_len(field: &str, value: &str, min: usize, max: usize) -> Result<(), String> {
    let len = value.chars().count();
    if len == 0 {
        return Err(format!("{field} cannot be empty"));
    }
    if len < min {
        return Err(format!("{field} must be at least {min} characters long"));
    }
    if len > max {
        return Err(format!("{field} must be at most {max} characters long"));
    }
    Ok(())
}

fn check_range(field: &str, value: f64, min: f64, max: f64, unit: &str) -> Result<(), String> {
    if !value.is_finite() {
        return Err(format!("{field} must be a valid number"));
    }
    if value < min {
        return Err(format!("{field} must be at least {min}{unit}"));
    }
    if value > max {
        return Err(format!("{field} must be at most {max}{unit}"));
    }
    Ok(())
}

fn allowed<T: Copy>(all: &[T], name: fn(&T) -> &'static str) -> String {
    all.iter().map(name).collect::<Vec<_>>().join(", ")
}

pub fn validate_profile(input: ProfileInput, is_update: bool) -> Result<ProfileChanges, String> {
    let mut out = ProfileChanges::default();

    let required = |field: &str, present: bool| -> Result<(), String> {
        if !is_update && !present {
            return Err(format!("Missing required field: {field}"));
        }
        Ok(())
    };

    required("name", input.name.is_some())?;
    required("email", input.email.is_some())?;
    required("password", input.password.is_some())?;
    required("age", input.age.is_some())?;
    required("gender", input.gender.is_some())?;
    required("weight", input.weight.is_some())?;

    if let Some(name) = trimmed(input.name) {
        check_len("Name", &name, 2, 100)?;
        out.name = Some(name);
    }

    if let Some(email) = trimmed(input.email) {
        let email = email.to_lowercase();
        check_len("Email", &email, 5, 255)?;
        if !is_valid_email(&email) {
            return Err("Please enter a valid email address".into());
        }
        out.email = Some(email);
    }

    // An empty password on update means "keep the current one".
    match input.password {
        Some(p) if is_update && p.is_empty() => {}
        Some(p) => {
            check_len("Password", &p, 6, 100)?;
            out.password = Some(p);
        }
        None => {}
    }

    if let Some(age) = input.age {
        check_range("Age", f64::from(age), 1.0, 120.0, "")?;
        out.age = Some(age);
    }

    if let Some(gender) = trimmed(input.gender) {
        let parsed = gender.parse::<Gender>().map_err(|_| {
            format!("Gender must be one of: {}", allowed(Gender::ALL, Gender::as_str))
        })?;
        out.gender = Some(parsed);
    }

    if let Some(weight) = input.weight {
        check_range("Weight", weight, 20.0, 300.0, "")?;
        out.weight = Some(weight);
    }

    if let Some(height) = input.height {
        if let Some(h) = height {
            check_range("Height", h, 100.0, 250.0, " cm")?;
        }
        out.height = Some(height);
    }

    if let Some(level) = trimmed(input.activity_level).filter(|s| !s.is_empty()) {
        let parsed = level.parse::<ActivityLevel>().map_err(|_| {
            format!(
                "Activity Level must be one of: {}",
                allowed(ActivityLevel::ALL, ActivityLevel::as_str)
            )
        })?;
        out.activity_level = Some(parsed);
    }

    if let Some(pref) = trimmed(input.diet_preference).filter(|s| !s.is_empty()) {
        let parsed = pref.parse::<DietPreference>().map_err(|_| {
            format!(
                "Diet Preference must be one of: {}",
                allowed(DietPreference::ALL, DietPreference::as_str)
            )
        })?;
        out.diet_preference = Some(parsed);
    }

    if let Some(goals) = input.health_goals {
        let goals = goals.map(|g| g.trim().to_string()).filter(|g| !g.is_empty());
        if let Some(g) = &goals {
            if g.chars().count() > 500 {
                return Err("Health Goals must be at most 500 characters long".into());
            }
        }
        out.health_goals = Some(goals);
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registration() -> ProfileInput {
        ProfileInput {
            name: Some("  Jane Doe ".into()),
            email: Some("Jane@Example.com".into()),
            password: Some("secret1".into()),
            age: Some(30),
            gender: Some("Female".into()),
            weight: Some(62.5),
            height: Some(Some(168.0)),
            activity_level: Some("light".into()),
            diet_preference: Some("vegan".into()),
            health_goals: Some(Some("run a 10k".into())),
        }
    }

    #[test]
    fn accepts_and_normalizes_registration() {
        let out = validate_profile(registration(), false).expect("valid");
        assert_eq!(out.name.as_deref(), Some("Jane Doe"));
        assert_eq!(out.email.as_deref(), Some("jane@example.com"));
        assert_eq!(out.gender, Some(Gender::Female));
        assert_eq!(out.diet_preference, Some(DietPreference::Vegan));
    }

    #[test]
    fn registration_requires_core_fields() {
        let mut input = registration();
        input.weight = None;
        assert_eq!(
            validate_profile(input, false).unwrap_err(),
            "Missing required field: weight"
        );
    }

    #[test]
    fn update_allows_partial_input() {
        let input = ProfileInput {
            age: Some(41),
            password: Some(String::new()),
            ..Default::default()
        };
        let out = validate_profile(input, true).expect("valid update");
        assert_eq!(out.age, Some(41));
        assert_eq!(out.password, None);
        assert_eq!(out.name, None);
    }

    #[test]
    fn rejects_out_of_range_values() {
        let mut input = registration();
        input.age = Some(0);
        assert!(validate_profile(input, false).unwrap_err().starts_with("Age"));

        let mut input = registration();
        input.height = Some(Some(50.0));
        assert!(validate_profile(input, false).unwrap_err().contains("cm"));

        let mut input = registration();
        input.activity_level = Some("couch".into());
        assert!(validate_profile(input, false)
            .unwrap_err()
            .contains("very_active"));
    }

    #[test]
    fn rejects_bad_email() {
        let mut input = registration();
        input.email = Some("not-an-email".into());
        assert_eq!(
            validate_profile(input, false).unwrap_err(),
            "Please enter a valid email address"
        );
        assert!(is_valid_email("a@b.co"));
    }
}

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityLevel {
    Sedentary,
    Light,
    Moderate,
    Active,
    VeryActive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DietPreference {
    Balanced,
    Vegetarian,
    Vegan,
    Keto,
    Paleo,
    Mediterranean,
    LowCarb,
    HighProtein,
}

impl Gender {
    pub const ALL: &'static [Gender] = &[Gender::Male, Gender::Female, Gender::Other];

    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::Other => "other",
        }
    }
}

impl ActivityLevel {
    pub const ALL: &'static [ActivityLevel] = &[
        ActivityLevel::Sedentary,
        ActivityLevel::Light,
        ActivityLevel::Moderate,
        ActivityLevel::Active,
        ActivityLevel::VeryActive,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityLevel::Sedentary => "sedentary",
            ActivityLevel::Light => "light",
            ActivityLevel::Moderate => "moderate",
            ActivityLevel::Active => "active",
            ActivityLevel::VeryActive => "very_active",
        }
    }
}

impl DietPreference {
    pub const ALL: &'static [DietPreference] = &[
        DietPreference::Balanced,
        DietPreference::Vegetarian,
        DietPreference::Vegan,
        DietPreference::Keto,
        DietPreference::Paleo,
        DietPreference::Mediterranean,
        DietPreference::LowCarb,
        DietPreference::HighProtein,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DietPreference::Balanced => "balanced",
            DietPreference::Vegetarian => "vegetarian",
            DietPreference::Vegan => "vegan",
            DietPreference::Keto => "keto",
            DietPreference::Paleo => "paleo",
            DietPreference::Mediterranean => "mediterranean",
            DietPreference::LowCarb => "low_carb",
            DietPreference::HighProtein => "high_protein",
        }
    }

    /// "low_carb" -> "Low Carb"
    pub fn title(&self) -> String {
        self.as_str()
            .split('_')
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn parse_variant<T: Copy>(all: &[T], name: fn(&T) -> &'static str, s: &str) -> Option<T> {
    let needle = s.trim().to_lowercase();
    all.iter().copied().find(|v| name(v) == needle)
}

impl FromStr for Gender {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_variant(Self::ALL, Self::as_str, s)
            .ok_or_else(|| anyhow::anyhow!("unknown gender: {s}"))
    }
}

impl FromStr for ActivityLevel {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_variant(Self::ALL, Self::as_str, s)
            .ok_or_else(|| anyhow::anyhow!("unknown activity level: {s}"))
    }
}

impl FromStr for DietPreference {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_variant(Self::ALL, Self::as_str, s)
            .ok_or_else(|| anyhow::anyhow!("unknown diet preference: {s}"))
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for ActivityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for DietPreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw `users` row; enumerations are stored as text.
#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub age: i32,
    pub gender: String,
    pub weight: f64,
    pub height: Option<f64>,
    pub activity_level: Option<String>,
    pub diet_preference: Option<String>,
    pub health_goals: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// User identity plus the attributes used to personalise plans.
#[derive(Debug, Clone, Serialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String, // argon2 PHC string
    pub age: i32,
    pub gender: Gender,
    pub weight: f64,         // kg
    pub height: Option<f64>, // cm
    pub activity_level: Option<ActivityLevel>,
    pub diet_preference: Option<DietPreference>,
    pub health_goals: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl TryFrom<UserRow> for UserProfile {
    type Error = anyhow::Error;

    fn try_from(r: UserRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: r.id,
            name: r.name,
            email: r.email,
            password_hash: r.password_hash,
            age: r.age,
            gender: r.gender.parse()?,
            weight: r.weight,
            height: r.height,
            activity_level: r.activity_level.as_deref().map(str::parse::<ActivityLevel>).transpose()?,
            diet_preference: r.diet_preference.as_deref().map(str::parse::<DietPreference>).transpose()?,
            health_goals: r.health_goals,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

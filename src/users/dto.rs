use serde::{Deserialize, Deserializer, Serialize};

use super::model::UserProfile;

/// Distinguishes an explicit `null` (clear the value) from a missing field.
fn double_option<'de, D, T>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(de).map(Some)
}

/// Profile fields as sent by the client, used for both registration and
/// updates.
#[derive(Debug, Default, Deserialize)]
pub struct ProfileInput {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub age: Option<i32>,
    pub gender: Option<String>,
    pub weight: Option<f64>,
    #[serde(default, deserialize_with = "double_option")]
    pub height: Option<Option<f64>>,
    pub activity_level: Option<String>,
    pub diet_preference: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub health_goals: Option<Option<String>>,
}

#[derive(Debug, Serialize)]
pub struct ProfileUpdated {
    pub message: &'static str,
    pub user: UserProfile,
}

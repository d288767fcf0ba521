use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use super::{
    model::{ActivityLevel, DietPreference, UserProfile, UserRow},
    validation::ProfileChanges,
};

const USER_COLUMNS: &str = "id, name, email, password_hash, age, gender, weight, height, \
     activity_level, diet_preference, health_goals, created_at, updated_at";

/// Reads the profile a diet plan is generated for.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn find_profile(&self, user_id: Uuid) -> anyhow::Result<Option<UserProfile>>;
}

#[derive(Clone)]
pub struct PgProfileStore {
    db: PgPool,
}

impl PgProfileStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ProfileStore for PgProfileStore {
    async fn find_profile(&self, user_id: Uuid) -> anyhow::Result<Option<UserProfile>> {
        UserProfile::find_by_id(&self.db, user_id).await
    }
}

/// Insert failed because the email is already registered.
#[derive(Debug, thiserror::Error)]
#[error("email already registered")]
pub struct EmailTaken;

fn map_unique(e: sqlx::Error) -> anyhow::Error {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => EmailTaken.into(),
        _ => anyhow::Error::new(e),
    }
}

impl UserProfile {
    /// Find a user by email.
    pub async fn find_by_email(db: &PgPool, email: &str) -> anyhow::Result<Option<UserProfile>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(db)
        .await
        .context("select user by email")?;
        row.map(UserProfile::try_from).transpose()
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<UserProfile>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(db)
        .await
        .context("select user by id")?;
        row.map(UserProfile::try_from).transpose()
    }

    /// Create a user from validated registration data. Missing preferences
    /// fall back to moderate activity and a balanced diet.
    pub async fn create(
        db: &PgPool,
        fields: &ProfileChanges,
        password_hash: &str,
    ) -> anyhow::Result<UserProfile> {
        let name = fields.name.as_deref().context("name is required")?;
        let email = fields.email.as_deref().context("email is required")?;
        let age = fields.age.context("age is required")?;
        let gender = fields.gender.context("gender is required")?;
        let weight = fields.weight.context("weight is required")?;

        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            INSERT INTO users (name, email, password_hash, age, gender, weight, height,
                               activity_level, diet_preference, health_goals)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(name)
        .bind(email)
        .bind(password_hash)
        .bind(age)
        .bind(gender.as_str())
        .bind(weight)
        .bind(fields.height.flatten())
        .bind(fields.activity_level.unwrap_or(ActivityLevel::Moderate).as_str())
        .bind(fields.diet_preference.unwrap_or(DietPreference::Balanced).as_str())
        .bind(fields.health_goals.clone().flatten())
        .fetch_one(db)
        .await
        .map_err(map_unique)?;
        row.try_into()
    }

    /// Apply a validated partial update in memory.
    pub fn apply(&mut self, changes: ProfileChanges, password_hash: Option<String>) {
        if let Some(v) = changes.name {
            self.name = v;
        }
        if let Some(v) = changes.email {
            self.email = v;
        }
        if let Some(v) = changes.age {
            self.age = v;
        }
        if let Some(v) = changes.gender {
            self.gender = v;
        }
        if let Some(v) = changes.weight {
            self.weight = v;
        }
        if let Some(v) = changes.height {
            self.height = v;
        }
        if let Some(v) = changes.activity_level {
            self.activity_level = Some(v);
        }
        if let Some(v) = changes.diet_preference {
            self.diet_preference = Some(v);
        }
        if let Some(v) = changes.health_goals {
            self.health_goals = v;
        }
        if let Some(hash) = password_hash {
            self.password_hash = hash;
        }
        self.updated_at = OffsetDateTime::now_utc();
    }

    pub async fn save(&self, db: &PgPool) -> anyhow::Result<UserProfile> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            UPDATE users
               SET name = $2, email = $3, password_hash = $4, age = $5, gender = $6,
                   weight = $7, height = $8, activity_level = $9, diet_preference = $10,
                   health_goals = $11, updated_at = $12
             WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(self.id)
        .bind(&self.name)
        .bind(&self.email)
        .bind(&self.password_hash)
        .bind(self.age)
        .bind(self.gender.as_str())
        .bind(self.weight)
        .bind(self.height)
        .bind(self.activity_level.map(|a| a.as_str()))
        .bind(self.diet_preference.map(|d| d.as_str()))
        .bind(&self.health_goals)
        .bind(self.updated_at)
        .fetch_one(db)
        .await
        .map_err(map_unique)?;
        row.try_into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::users::model::Gender;

    fn profile() -> UserProfile {
        let now = OffsetDateTime::now_utc() - time::Duration::hours(1);
        UserProfile {
            id: Uuid::new_v4(),
            name: "Sam".into(),
            email: "sam@example.com".into(),
            password_hash: "old".into(),
            age: 30,
            gender: Gender::Male,
            weight: 80.0,
            height: Some(180.0),
            activity_level: None,
            diet_preference: None,
            health_goals: Some("bulk".into()),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn apply_only_touches_given_fields() {
        let mut p = profile();
        let before = p.updated_at;
        p.apply(
            ProfileChanges {
                weight: Some(78.5),
                height: Some(None),
                diet_preference: Some(DietPreference::Keto),
                ..Default::default()
            },
            None,
        );
        assert_eq!(p.weight, 78.5);
        assert_eq!(p.height, None);
        assert_eq!(p.diet_preference, Some(DietPreference::Keto));
        assert_eq!(p.name, "Sam");
        assert_eq!(p.health_goals.as_deref(), Some("bulk"));
        assert_eq!(p.password_hash, "old");
        assert!(p.updated_at > before);
    }

    #[test]
    fn apply_replaces_password_hash() {
        let mut p = profile();
        p.apply(ProfileChanges::default(), Some("new".into()));
        assert_eq!(p.password_hash, "new");
    }
}

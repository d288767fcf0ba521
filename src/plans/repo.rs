use anyhow::Context;
use async_trait::async_trait;
use sqlx::{types::Json, PgPool};
use uuid::Uuid;

use super::model::{DietPlan, DietPlanRow, NewDietPlan};
use crate::error::PlanError;

const PLAN_COLUMNS: &str =
    "id, user_id, plan_name, start_date, end_date, total_calories, plan_data, created_at";

#[async_trait]
pub trait PlanStore: Send + Sync {
    /// Inserts the plan in one statement; nothing is written on failure.
    async fn insert_plan(&self, plan: NewDietPlan) -> Result<DietPlan, PlanError>;
    async fn find_plan(&self, user_id: Uuid, plan_id: Uuid) -> anyhow::Result<Option<DietPlan>>;
    /// Newest first.
    async fn list_plans(&self, user_id: Uuid) -> anyhow::Result<Vec<DietPlan>>;
}

#[derive(Clone)]
pub struct PgPlanStore {
    db: PgPool,
}

impl PgPlanStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl PlanStore for PgPlanStore {
    async fn insert_plan(&self, plan: NewDietPlan) -> Result<DietPlan, PlanError> {
        let row = sqlx::query_as::<_, DietPlanRow>(&format!(
            r#"
            INSERT INTO diet_plans (user_id, plan_name, start_date, end_date, total_calories, plan_data)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {PLAN_COLUMNS}
            "#
        ))
        .bind(plan.user_id)
        .bind(&plan.plan_name)
        .bind(plan.start_date)
        .bind(plan.end_date)
        .bind(plan.total_calories)
        .bind(Json(&plan.plan_data))
        .fetch_one(&self.db)
        .await
        .map_err(|e| PlanError::PersistenceError(anyhow::Error::new(e).context("insert diet plan")))?;
        Ok(row.into())
    }

    async fn find_plan(&self, user_id: Uuid, plan_id: Uuid) -> anyhow::Result<Option<DietPlan>> {
        let row = sqlx::query_as::<_, DietPlanRow>(&format!(
            "SELECT {PLAN_COLUMNS} FROM diet_plans WHERE id = $1 AND user_id = $2"
        ))
        .bind(plan_id)
        .bind(user_id)
        .fetch_optional(&self.db)
        .await
        .context("select diet plan")?;
        Ok(row.map(DietPlan::from))
    }

    async fn list_plans(&self, user_id: Uuid) -> anyhow::Result<Vec<DietPlan>> {
        let rows = sqlx::query_as::<_, DietPlanRow>(&format!(
            "SELECT {PLAN_COLUMNS} FROM diet_plans WHERE user_id = $1 ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.db)
        .await
        .context("list diet plans")?;
        Ok(rows.into_iter().map(DietPlan::from).collect())
    }
}

use anyhow::Context;
use sqlx::PgPool;
use time::Date;
use uuid::Uuid;

use super::model::{MealLog, MealLogChanges, NewMealLog};

const LOG_COLUMNS: &str = "id, user_id, diet_plan_id, meal_date, meal_type, meal_name, \
     calories, protein, carbs, fat, consumed, created_at";

impl MealLog {
    pub async fn create(db: &PgPool, user_id: Uuid, new: &NewMealLog) -> anyhow::Result<MealLog> {
        let log = sqlx::query_as::<_, MealLog>(&format!(
            r#"
            INSERT INTO meal_logs
                (user_id, diet_plan_id, meal_date, meal_type, meal_name, calories, protein, carbs, fat, consumed)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {LOG_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(new.diet_plan_id)
        .bind(new.meal_date)
        .bind(&new.meal_type)
        .bind(&new.meal_name)
        .bind(new.calories)
        .bind(new.protein)
        .bind(new.carbs)
        .bind(new.fat)
        .bind(new.consumed)
        .fetch_one(db)
        .await
        .context("insert meal log")?;
        Ok(log)
    }

    /// Newest day first; within a day, in insertion order.
    pub async fn list_by_user(
        db: &PgPool,
        user_id: Uuid,
        date: Option<Date>,
        limit: i64,
        offset: i64,
    ) -> anyhow::Result<Vec<MealLog>> {
        let rows = sqlx::query_as::<_, MealLog>(&format!(
            r#"
            SELECT {LOG_COLUMNS}
            FROM meal_logs
            WHERE user_id = $1 AND ($2::date IS NULL OR meal_date = $2)
            ORDER BY meal_date DESC, created_at ASC
            LIMIT $3 OFFSET $4
            "#
        ))
        .bind(user_id)
        .bind(date)
        .bind(limit)
        .bind(offset)
        .fetch_all(db)
        .await
        .context("list meal logs")?;
        Ok(rows)
    }

    /// Applies the changes if the log belongs to `user_id`.
    pub async fn update(
        db: &PgPool,
        user_id: Uuid,
        id: Uuid,
        changes: &MealLogChanges,
    ) -> anyhow::Result<Option<MealLog>> {
        let row = sqlx::query_as::<_, MealLog>(&format!(
            r#"
            UPDATE meal_logs SET
                meal_name = COALESCE($3, meal_name),
                calories  = COALESCE($4, calories),
                protein   = COALESCE($5, protein),
                carbs     = COALESCE($6, carbs),
                fat       = COALESCE($7, fat),
                consumed  = COALESCE($8, consumed)
            WHERE id = $1 AND user_id = $2
            RETURNING {LOG_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(user_id)
        .bind(changes.meal_name.as_deref())
        .bind(changes.calories)
        .bind(changes.protein)
        .bind(changes.carbs)
        .bind(changes.fat)
        .bind(changes.consumed)
        .fetch_optional(db)
        .await
        .context("update meal log")?;
        Ok(row)
    }

    /// True when a row was removed.
    pub async fn delete(db: &PgPool, user_id: Uuid, id: Uuid) -> anyhow::Result<bool> {
        let res = sqlx::query("DELETE FROM meal_logs WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(db)
            .await
            .context("delete meal log")?;
        Ok(res.rows_affected() > 0)
    }
}

pub async fn plan_belongs_to(db: &PgPool, user_id: Uuid, plan_id: Uuid) -> anyhow::Result<bool> {
    let found: Option<(Uuid,)> =
        sqlx::query_as("SELECT id FROM diet_plans WHERE id = $1 AND user_id = $2")
            .bind(plan_id)
            .bind(user_id)
            .fetch_optional(db)
            .await
            .context("check diet plan owner")?;
    Ok(found.is_some())
}

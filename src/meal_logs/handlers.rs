use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use time::OffsetDateTime;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use super::{
    dto::{CreateMealLogRequest, MealLogQuery, UpdateMealLogRequest},
    model::MealLog,
    repo::plan_belongs_to,
};
use crate::{auth::jwt::AuthUser, state::AppState};

type ApiError = (StatusCode, String);

pub fn meal_log_routes() -> Router<AppState> {
    Router::new()
        .route("/meal-logs", get(list_logs).post(create_log))
        .route("/meal-logs/:id", put(update_log).delete(delete_log))
}

fn internal(e: anyhow::Error, what: &'static str) -> ApiError {
    error!(error = %e, "{what} failed");
    (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".into())
}

fn not_found() -> ApiError {
    (StatusCode::NOT_FOUND, "Meal log not found".into())
}

#[instrument(skip(state, body))]
pub async fn create_log(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<CreateMealLogRequest>,
) -> Result<(StatusCode, Json<MealLog>), ApiError> {
    let new = body
        .validate(OffsetDateTime::now_utc())
        .map_err(|msg| (StatusCode::BAD_REQUEST, msg))?;

    if let Some(plan_id) = new.diet_plan_id {
        let owned = plan_belongs_to(&state.db, user_id, plan_id)
            .await
            .map_err(|e| internal(e, "plan_belongs_to"))?;
        if !owned {
            warn!(%user_id, %plan_id, "meal log references a foreign diet plan");
            return Err((StatusCode::BAD_REQUEST, "Diet plan not found".into()));
        }
    }

    let log = MealLog::create(&state.db, user_id, &new)
        .await
        .map_err(|e| internal(e, "create meal log"))?;
    info!(%user_id, log_id = %log.id, "meal logged");
    Ok((StatusCode::CREATED, Json(log)))
}

#[instrument(skip(state))]
pub async fn list_logs(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(q): Query<MealLogQuery>,
) -> Result<Json<Vec<MealLog>>, ApiError> {
    let date = q.date().map_err(|msg| (StatusCode::BAD_REQUEST, msg))?;
    let (limit, offset) = q.window();
    let logs = MealLog::list_by_user(&state.db, user_id, date, limit, offset)
        .await
        .map_err(|e| internal(e, "list meal logs"))?;
    Ok(Json(logs))
}

#[instrument(skip(state, body))]
pub async fn update_log(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateMealLogRequest>,
) -> Result<Json<MealLog>, ApiError> {
    let changes = body.validate().map_err(|msg| (StatusCode::BAD_REQUEST, msg))?;
    match MealLog::update(&state.db, user_id, id, &changes).await {
        Ok(Some(log)) => Ok(Json(log)),
        Ok(None) => Err(not_found()),
        Err(e) => Err(internal(e, "update meal log")),
    }
}

#[instrument(skip(state))]
pub async fn delete_log(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    match MealLog::delete(&state.db, user_id, id).await {
        Ok(true) => {
            info!(%user_id, log_id = %id, "meal log deleted");
            Ok(StatusCode::NO_CONTENT)
        }
        Ok(false) => Err(not_found()),
        Err(e) => Err(internal(e, "delete meal log")),
    }
}

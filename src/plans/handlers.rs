use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use time::OffsetDateTime;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use super::model::DietPlan;
use crate::{auth::jwt::AuthUser, state::AppState};

#[derive(Debug, Serialize)]
pub struct PlanCreated {
    pub message: &'static str,
    pub diet_plan: DietPlan,
}

pub fn plan_routes() -> Router<AppState> {
    Router::new()
        .route("/diet-plan", post(generate_plan))
        .route("/diet-plan/:id", get(get_plan))
        .route("/diet-plans", get(list_plans))
}

#[instrument(skip(state))]
pub async fn generate_plan(State(state): State<AppState>, AuthUser(user_id): AuthUser) -> Response {
    if !state.plan_limiter.check(&user_id.to_string()).await {
        warn!(%user_id, "diet plan rate limit hit");
        return (
            StatusCode::TOO_MANY_REQUESTS,
            "Too many diet plan requests. Please try again in a minute.",
        )
            .into_response();
    }

    let today = OffsetDateTime::now_utc().date();
    match state.generator.generate(user_id, today).await {
        Ok(plan) => {
            info!(%user_id, plan_id = %plan.id, "diet plan created");
            (
                StatusCode::CREATED,
                Json(PlanCreated {
                    message: "Diet plan generated successfully",
                    diet_plan: plan,
                }),
            )
                .into_response()
        }
        Err(e) => {
            error!(%user_id, code = e.code(), error = %e, "diet plan generation failed");
            e.into_response()
        }
    }
}

#[instrument(skip(state))]
pub async fn list_plans(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Vec<DietPlan>>, (StatusCode, String)> {
    state.plans.list_plans(user_id).await.map(Json).map_err(|e| {
        error!(error = %e, %user_id, "list_plans failed");
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".into())
    })
}

#[instrument(skip(state))]
pub async fn get_plan(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<DietPlan>, (StatusCode, String)> {
    match state.plans.find_plan(user_id, id).await {
        Ok(Some(plan)) => Ok(Json(plan)),
        Ok(None) => Err((StatusCode::NOT_FOUND, "Diet plan not found".into())),
        Err(e) => {
            error!(error = %e, %user_id, %id, "find_plan failed");
            Err((StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".into()))
        }
    }
}

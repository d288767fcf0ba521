use axum::{
    extract::State,
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::{error, info, instrument, warn};

use super::{
    dto::{ProfileInput, ProfileUpdated},
    model::UserProfile,
    repo::EmailTaken,
    validation::validate_profile,
};
use crate::{
    auth::{jwt::AuthUser, password},
    state::AppState,
};

pub fn profile_routes() -> Router<AppState> {
    Router::new().route("/profile", get(get_profile).put(update_profile))
}

async fn load(state: &AppState, user_id: uuid::Uuid) -> Result<UserProfile, (StatusCode, String)> {
    match UserProfile::find_by_id(&state.db, user_id).await {
        Ok(Some(p)) => Ok(p),
        Ok(None) => Err((StatusCode::NOT_FOUND, "User not found".into())),
        Err(e) => {
            error!(error = %e, %user_id, "load profile failed");
            Err((StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".into()))
        }
    }
}

#[instrument(skip(state))]
pub async fn get_profile(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<UserProfile>, (StatusCode, String)> {
    Ok(Json(load(&state, user_id).await?))
}

#[instrument(skip(state, payload))]
pub async fn update_profile(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<ProfileInput>,
) -> Result<Json<ProfileUpdated>, (StatusCode, String)> {
    let changes = validate_profile(payload, true).map_err(|msg| {
        warn!(%user_id, %msg, "invalid profile update");
        (StatusCode::BAD_REQUEST, msg)
    })?;

    let mut profile = load(&state, user_id).await?;

    if let Some(email) = changes.email.as_deref().filter(|e| *e != profile.email) {
        match UserProfile::find_by_email(&state.db, email).await {
            Ok(Some(_)) => return Err((StatusCode::CONFLICT, "Email already exists".into())),
            Ok(None) => {}
            Err(e) => {
                error!(error = %e, "find_by_email failed");
                return Err((StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".into()));
            }
        }
    }

    let password_hash = match changes.password.clone() {
        Some(p) => Some(password::hash_password(p).await.map_err(|e| {
            error!(error = %e, "hash_password failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
        })?),
        None => None,
    };

    profile.apply(changes, password_hash);
    let saved = profile.save(&state.db).await.map_err(|e| {
        if e.is::<EmailTaken>() {
            return (StatusCode::CONFLICT, "Email already exists".to_string());
        }
        error!(error = %e, %user_id, "save profile failed");
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
    })?;

    info!(%user_id, "profile updated");
    Ok(Json(ProfileUpdated {
        message: "Profile updated successfully",
        user: saved,
    }))
}

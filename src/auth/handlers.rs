use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use tracing::{error, info, instrument, warn};

use crate::{
    auth::{
        dto::{AuthResponse, LoginRequest, RefreshRequest},
        jwt::JwtKeys,
        password::{hash_password, verify_password},
    },
    ratelimit::LoginGuard,
    state::AppState,
    users::{
        dto::ProfileInput,
        repo::EmailTaken,
        validation::{is_valid_email, validate_profile},
        UserProfile,
    },
};

type ApiError = (StatusCode, String);

fn internal(e: anyhow::Error, what: &'static str) -> ApiError {
    error!(error = %e, "{what} failed");
    (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".into())
}

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
}

fn respond(
    keys: &JwtKeys,
    user: UserProfile,
    message: &'static str,
) -> Result<AuthResponse, ApiError> {
    let pair = keys.issue_pair(user.id).map_err(|e| internal(e, "jwt sign"))?;
    Ok(AuthResponse {
        message,
        access_token: pair.access_token,
        refresh_token: pair.refresh_token,
        user,
    })
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<ProfileInput>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    let fields = validate_profile(payload, false).map_err(|msg| {
        warn!(%msg, "invalid registration");
        (StatusCode::BAD_REQUEST, msg)
    })?;
    let email = fields.email.clone().unwrap_or_default();

    // Ensure email is not taken
    if let Ok(Some(_)) = UserProfile::find_by_email(&state.db, &email).await {
        warn!(email = %email, "email already registered");
        return Err((
            StatusCode::CONFLICT,
            "User with this email already exists".into(),
        ));
    }

    let password = fields.password.clone().unwrap_or_default();
    let hash = hash_password(password)
        .await
        .map_err(|e| internal(e, "hash_password"))?;

    let user = match UserProfile::create(&state.db, &fields, &hash).await {
        Ok(u) => u,
        Err(e) if e.is::<EmailTaken>() => {
            return Err((
                StatusCode::CONFLICT,
                "User with this email already exists".into(),
            ))
        }
        Err(e) => return Err(internal(e, "create user")),
    };

    info!(user_id = %user.id, "user registered");
    let body = respond(&state.jwt, user, "User registered successfully")?;
    Ok((StatusCode::CREATED, Json(body)))
}

#[instrument(skip(state, payload, addr))]
pub async fn login(
    State(state): State<AppState>,
    addr: Option<ConnectInfo<SocketAddr>>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let email = payload.email.trim().to_lowercase();
    if email.is_empty() || payload.password.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "Email and password are required".into(),
        ));
    }
    if !is_valid_email(&email) {
        return Err((StatusCode::BAD_REQUEST, "Invalid email".into()));
    }

    let ip = addr
        .map(|ConnectInfo(a)| a.ip().to_string())
        .unwrap_or_else(|| "unknown".into());
    let guard_key = LoginGuard::key(&email, &ip);
    if state.login_guard.is_blocked(&guard_key).await {
        warn!(%ip, "login attempts blocked");
        return Err((
            StatusCode::TOO_MANY_REQUESTS,
            "Too many login attempts. Please try again later.".into(),
        ));
    }

    let invalid = || {
        (
            StatusCode::UNAUTHORIZED,
            "Invalid email or password".to_string(),
        )
    };

    let user = match UserProfile::find_by_email(&state.db, &email).await {
        Ok(Some(u)) => u,
        Ok(None) => {
            state.login_guard.record_failure(&guard_key).await;
            warn!(%ip, "login unknown email");
            return Err(invalid());
        }
        Err(e) => return Err(internal(e, "find_by_email")),
    };

    let ok = verify_password(payload.password, user.password_hash.clone())
        .await
        .map_err(|e| internal(e, "verify_password"))?;
    if !ok {
        state.login_guard.record_failure(&guard_key).await;
        warn!(user_id = %user.id, %ip, "login invalid password");
        return Err(invalid());
    }

    state.login_guard.reset(&guard_key).await;
    info!(user_id = %user.id, "user logged in");
    Ok(Json(respond(&state.jwt, user, "Login successful")?))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let claims = state
        .jwt
        .verify_refresh(&payload.refresh_token)
        .map_err(|_| (StatusCode::UNAUTHORIZED, "Invalid refresh token".to_string()))?;

    let user = match UserProfile::find_by_id(&state.db, claims.sub).await {
        Ok(Some(u)) => u,
        Ok(None) => return Err((StatusCode::UNAUTHORIZED, "User not found".into())),
        Err(e) => return Err(internal(e, "find_by_id")),
    };
    Ok(Json(respond(&state.jwt, user, "Token refreshed")?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::AppState;
    use axum::{body::Body, http::Request};
    use tower::ServiceExt;

    async fn post_json(uri: &str, body: &str) -> StatusCode {
        let app = crate::app::build_app(AppState::fake());
        let res = app
            .oneshot(
                Request::post(uri)
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        res.status()
    }

    #[tokio::test]
    async fn register_rejects_invalid_payload_before_touching_db() {
        let status = post_json(
            "/api/v1/auth/register",
            r#"{"name":"A","email":"a@b.co","password":"secret1","age":30,"gender":"male","weight":70}"#,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn login_requires_both_fields() {
        let status = post_json("/api/v1/auth/login", r#"{"email":"a@b.co"}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn refresh_rejects_garbage_token() {
        let status = post_json("/api/v1/auth/refresh", r#"{"refresh_token":"nope"}"#).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}

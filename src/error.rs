//! Failures of the diet plan generation pipeline.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PlanError {
    #[error("user profile not found")]
    ProfileNotFound,

    /// Network failure, timeout or 5xx that outlived every retry.
    #[error("meal planning service unavailable")]
    UpstreamUnavailable,

    #[error("meal planning service rate limited")]
    UpstreamRateLimited,

    #[error("meal planning service rejected our credentials")]
    UpstreamAuthFailure,

    #[error("no JSON document found in model response")]
    ResponseParseError,

    #[error("model response does not match the plan schema: {0}")]
    ResponseSchemaError(String),

    #[error("storage failure: {0}")]
    PersistenceError(anyhow::Error),
}

impl PlanError {
    pub fn code(&self) -> &'static str {
        match self {
            PlanError::ProfileNotFound => "profile_not_found",
            PlanError::UpstreamUnavailable => "upstream_unavailable",
            PlanError::UpstreamRateLimited => "upstream_rate_limited",
            PlanError::UpstreamAuthFailure => "upstream_auth_failure",
            PlanError::ResponseParseError | PlanError::ResponseSchemaError(_) => "invalid_response",
            PlanError::PersistenceError(_) => "storage_failure",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            PlanError::ProfileNotFound => StatusCode::NOT_FOUND,
            PlanError::UpstreamUnavailable | PlanError::UpstreamRateLimited => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            PlanError::UpstreamAuthFailure
            | PlanError::ResponseParseError
            | PlanError::ResponseSchemaError(_) => StatusCode::BAD_GATEWAY,
            PlanError::PersistenceError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Caller-facing message. Upstream text and storage details stay in the logs.
    pub fn public_message(&self) -> &'static str {
        match self {
            PlanError::ProfileNotFound => "User not found",
            PlanError::UpstreamUnavailable => {
                "Diet plan service is temporarily unavailable, please try again later"
            }
            PlanError::UpstreamRateLimited => {
                "Diet plan service is busy, please try again in a few minutes"
            }
            PlanError::UpstreamAuthFailure => "Diet plan service is misconfigured",
            PlanError::ResponseParseError | PlanError::ResponseSchemaError(_) => {
                "Diet plan service returned an invalid plan, please try again"
            }
            PlanError::PersistenceError(_) => "Diet plan could not be saved",
        }
    }
}

impl IntoResponse for PlanError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.public_message(),
            "code": self.code(),
        }));
        (self.status(), body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_failures_read_as_try_again_later() {
        assert_eq!(PlanError::UpstreamUnavailable.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(PlanError::UpstreamRateLimited.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_ne!(
            PlanError::UpstreamUnavailable.code(),
            PlanError::UpstreamRateLimited.code()
        );
    }

    #[test]
    fn parse_and_schema_share_a_code() {
        assert_eq!(PlanError::ResponseParseError.code(), "invalid_response");
        assert_eq!(
            PlanError::ResponseSchemaError("daily_plans".into()).code(),
            "invalid_response"
        );
    }

    #[test]
    fn public_message_hides_details() {
        let err = PlanError::PersistenceError(anyhow::anyhow!("password=hunter2 violates fk"));
        assert!(!err.public_message().contains("hunter2"));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}

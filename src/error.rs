// HTTP API Error Types
use std::borrow::Cow;

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::database::StoreError;
use crate::middleware::{Envelope, ErrorBody};
use crate::services::DomainError;
use crate::validation::{FieldError, ValidationError};

/// HTTP API error with appropriate status codes and client-friendly messages
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    Validation {
        message: String,
        field_errors: Vec<FieldError>,
    },
    BadRequest {
        code: &'static str,
        message: String,
    },

    // 401 Unauthorized
    Unauthorized(String),

    // 403 Forbidden
    Forbidden {
        code: &'static str,
        message: String,
    },

    // 404 Not Found. `entity` turns the code into `<ENTITY>_NOT_FOUND`
    NotFound {
        entity: Option<&'static str>,
        message: String,
    },

    // 409 Conflict
    Conflict {
        code: &'static str,
        message: String,
    },

    // 422 Unprocessable Entity (plan limits)
    UpgradeRequired {
        message: String,
        details: Value,
    },

    // 500 Internal Server Error
    InternalServerError(String),

    // 503 Service Unavailable
    ServiceUnavailable {
        code: &'static str,
        message: String,
    },
}

impl ApiError {
    /// Get HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation { .. } => StatusCode::BAD_REQUEST,
            ApiError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden { .. } => StatusCode::FORBIDDEN,
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::Conflict { .. } => StatusCode::CONFLICT,
            ApiError::UpgradeRequired { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Get client-safe error message
    pub fn message(&self) -> &str {
        match self {
            ApiError::Validation { message, .. } => message,
            ApiError::BadRequest { message, .. } => message,
            ApiError::Unauthorized(msg) => msg,
            ApiError::Forbidden { message, .. } => message,
            ApiError::NotFound { message, .. } => message,
            ApiError::Conflict { message, .. } => message,
            ApiError::UpgradeRequired { message, .. } => message,
            ApiError::InternalServerError(msg) => msg,
            ApiError::ServiceUnavailable { message, .. } => message,
        }
    }

    /// Get error code for client handling
    pub fn error_code(&self) -> Cow<'static, str> {
        match self {
            ApiError::Validation { .. } => Cow::Borrowed("VALIDATION_ERROR"),
            ApiError::BadRequest { code, .. } => Cow::Borrowed(*code),
            ApiError::Unauthorized(_) => Cow::Borrowed("UNAUTHORIZED"),
            ApiError::Forbidden { code, .. } => Cow::Borrowed(*code),
            ApiError::NotFound { entity: None, .. } => Cow::Borrowed("NOT_FOUND"),
            ApiError::NotFound { entity: Some(entity), .. } => {
                Cow::Owned(format!("{}_NOT_FOUND", entity.to_ascii_uppercase()))
            }
            ApiError::Conflict { code, .. } => Cow::Borrowed(*code),
            ApiError::UpgradeRequired { .. } => Cow::Borrowed("UPGRADE_REQUIRED"),
            ApiError::InternalServerError(_) => Cow::Borrowed("INTERNAL_ERROR"),
            ApiError::ServiceUnavailable { code, .. } => Cow::Borrowed(*code),
        }
    }

    /// Optional structured detail attached to the error object
    pub fn details(&self) -> Option<Value> {
        match self {
            ApiError::Validation { field_errors, .. } => Some(json!(field_errors)),
            ApiError::UpgradeRequired { details, .. } => Some(details.clone()),
            _ => None,
        }
    }
}

// Static constructor methods
impl ApiError {
    pub fn validation_error(message: impl Into<String>, field_errors: Vec<FieldError>) -> Self {
        ApiError::Validation {
            message: message.into(),
            field_errors,
        }
    }

    pub fn bad_request(code: &'static str, message: impl Into<String>) -> Self {
        ApiError::BadRequest {
            code,
            message: message.into(),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    pub fn forbidden(code: &'static str, message: impl Into<String>) -> Self {
        ApiError::Forbidden {
            code,
            message: message.into(),
        }
    }

    /// Authenticated, but not a member of any organization
    pub fn no_org() -> Self {
        ApiError::forbidden("NO_ORG", "User has no organization")
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound {
            entity: None,
            message: message.into(),
        }
    }

    pub fn entity_not_found(entity: &'static str) -> Self {
        ApiError::NotFound {
            entity: Some(entity),
            message: format!("{} not found", capitalize(&entity.replace('_', " "))),
        }
    }

    pub fn conflict(code: &'static str, message: impl Into<String>) -> Self {
        ApiError::Conflict {
            code,
            message: message.into(),
        }
    }

    pub fn upgrade_required(message: impl Into<String>, details: Value) -> Self {
        ApiError::UpgradeRequired {
            message: message.into(),
            details,
        }
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        ApiError::InternalServerError(message.into())
    }

    pub fn feature_disabled(feature: &str) -> Self {
        ApiError::ServiceUnavailable {
            code: "FEATURE_DISABLED",
            message: format!("{} is currently disabled", feature),
        }
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

// Convert other error types to ApiError
impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::validation_error("Validation failed", err.into_issues())
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        // Don't expose storage errors to clients
        tracing::error!(error = %err, "store error");
        ApiError::internal_server_error("An error occurred while processing your request")
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::NotFound { entity } => ApiError::entity_not_found(entity),
            DomainError::InvalidState { code, message } => ApiError::conflict(code, message),
            DomainError::BillingQuota {
                plan,
                resource,
                used,
                limit,
            } => ApiError::upgrade_required(
                format!("The {} plan allows {} {}; your organization has {}", plan, limit, resource.replace('_', " "), used),
                json!({
                    "plan": plan,
                    "resource": resource,
                    "used": used,
                    "limit": limit,
                }),
            ),
            DomainError::FeatureDisabled(feature) => ApiError::feature_disabled(feature),
            DomainError::Store(store_err) => store_err.into(),
        }
    }
}

// Standard error trait implementations
impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

// Automatic HTTP response conversion for Axum
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(code = %self.error_code(), message = %self.message(), "request failed");
        }
        let body = Envelope::<()>::Failure(ErrorBody::from(&self));
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wire(err: &ApiError) -> Value {
        serde_json::to_value(Envelope::<()>::Failure(ErrorBody::from(err))).unwrap()
    }

    #[test]
    fn no_org_matches_wire_contract() {
        let err = ApiError::no_org();
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(
            wire(&err),
            json!({"success": false, "error": {"code": "NO_ORG", "message": "User has no organization"}})
        );
    }

    #[test]
    fn entity_not_found_derives_code() {
        let err = ApiError::entity_not_found("journalist_profile");
        assert_eq!(err.error_code(), "JOURNALIST_PROFILE_NOT_FOUND");
        assert_eq!(err.message(), "Journalist profile not found");
        assert_eq!(ApiError::not_found("gone").error_code(), "NOT_FOUND");
    }

    #[test]
    fn validation_error_carries_field_details() {
        let err: ApiError = ValidationError::new(vec![FieldError::new("name", "Required")]).into();
        let body = wire(&err);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
        assert_eq!(body["error"]["details"][0]["path"], "name");
    }

    #[test]
    fn billing_quota_maps_to_upgrade_required() {
        let err: ApiError = DomainError::BillingQuota {
            plan: "free".into(),
            resource: "sequences",
            used: 4,
            limit: 2,
        }
        .into();
        assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err.error_code(), "UPGRADE_REQUIRED");
        assert_eq!(err.details().unwrap()["limit"], 2);
    }

    #[test]
    fn store_errors_are_hidden_from_clients() {
        let err: ApiError = StoreError::InvalidData("column x is broken".into()).into();
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!err.message().contains("column"));
    }

    #[test]
    fn every_failure_body_has_error_and_no_data() {
        let errors = vec![
            ApiError::no_org(),
            ApiError::unauthorized("nope"),
            ApiError::conflict("RUN_NOT_ACTIVE", "Run is not active"),
            ApiError::feature_disabled("Billing"),
            ApiError::internal_server_error("boom"),
        ];
        for err in errors {
            let body = wire(&err);
            assert_eq!(body["success"], false);
            assert!(body.get("data").is_none());
            assert!(body["error"]["code"].is_string());
        }
    }
}

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde_json::Value;

use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::outreach_service::{TrackingEvent, TrackingOutcome};
use crate::state::AppState;
use crate::validation::{RequestSchema, ValidationResult};

const REQUIRED_MESSAGE: &str = "eventId and eventType are required";

/// POST /api/v1/webhooks/track - email provider tracking callback (unauthenticated)
pub async fn track(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<TrackingOutcome> {
    let Json(body) = payload.map_err(|rejection| {
        tracing::debug!(error = %rejection.body_text(), "unreadable tracking payload");
        ApiError::bad_request("INVALID_INPUT", REQUIRED_MESSAGE)
    })?;

    if is_blank(body.get("eventId")) || is_blank(body.get("eventType")) {
        return Err(ApiError::bad_request("INVALID_INPUT", REQUIRED_MESSAGE));
    }

    let event = match TrackingEvent::schema().safe_parse::<TrackingEvent>(&body) {
        ValidationResult::Success(event) => event,
        ValidationResult::Failure(err) => return Err(err.into()),
    };

    tracing::debug!(event_id = %event.event_id, event_type = ?event.event_type, "tracking event received");
    let outcome = state.outreach.record_tracking_event(event).await?;
    Ok(ApiResponse::success(outcome))
}

fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        Some(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn blank_values_count_as_missing() {
        assert!(is_blank(None));
        assert!(is_blank(Some(&Value::Null)));
        assert!(is_blank(Some(&json!("  "))));
        assert!(!is_blank(Some(&json!("evt_1"))));
        assert!(!is_blank(Some(&json!(7))));
    }
}

// Public (no auth) and protected (bearer token + organization) handlers
pub mod protected;
pub mod public;

use crate::error::ApiError;

/// Fallback for unmatched paths, including route groups switched off at boot
pub async fn not_found() -> ApiError {
    ApiError::not_found("Route not found")
}

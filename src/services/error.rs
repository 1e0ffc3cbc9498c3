use thiserror::Error;

use crate::database::StoreError;

/// Closed set of failures a service can report.
///
/// Handlers never inspect error names or messages; `ApiError::from` maps
/// each variant to its status and code.
#[derive(Debug, Error)]
pub enum DomainError {
    /// Missing in the caller's org. Records owned by other orgs land here too.
    #[error("{entity} not found")]
    NotFound { entity: &'static str },

    #[error("{message}")]
    InvalidState { code: &'static str, message: String },

    #[error("plan '{plan}' allows {limit} {resource}, organization has {used}")]
    BillingQuota {
        plan: String,
        resource: &'static str,
        used: u64,
        limit: u64,
    },

    #[error("{0} is disabled")]
    FeatureDisabled(&'static str),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl DomainError {
    pub fn not_found(entity: &'static str) -> Self {
        DomainError::NotFound { entity }
    }

    pub fn invalid_state(code: &'static str, message: impl Into<String>) -> Self {
        DomainError::InvalidState {
            code,
            message: message.into(),
        }
    }
}

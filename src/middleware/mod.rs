pub mod auth;
pub mod feature_gate;
pub mod require_org;
pub mod response;

pub use auth::{require_user, AuthUser};
pub use feature_gate::mount_group;
pub use require_org::{require_org, OrgContext};
pub use response::{ApiResponse, ApiResult, Envelope, ErrorBody};

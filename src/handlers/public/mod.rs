// Routes reachable without a bearer token
pub mod health;
pub mod webhooks;

pub use health::health;
pub use webhooks::track;

use axum::{
    http::{HeaderValue, Method},
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::AppConfig;
use crate::handlers::{self, protected, public};
use crate::middleware::{mount_group, require_org, require_user};
use crate::state::AppState;

pub const API_PREFIX: &str = "/api/v1";

/// Assemble the full application.
///
/// Feature flags are read from `state.config` here, once. Route groups that
/// are off are never registered.
pub fn build_router(state: AppState) -> Router {
    let flags = state.config.features;

    let protected_api = Router::new().route("/me", get(protected::me::whoami));
    let protected_api = mount_group(protected_api, flags.journalists, "journalists", journalist_routes);
    let protected_api = mount_group(protected_api, flags.outreach, "outreach", outreach_routes);
    let protected_api = mount_group(protected_api, flags.governance, "governance", governance_routes);
    let protected_api = mount_group(protected_api, flags.billing, "billing", billing_routes);

    // route_layer: unmatched paths 404 without touching auth.
    // Layers run outermost-last, so require_user runs before require_org.
    let protected_api = protected_api
        .route_layer(from_fn_with_state(state.clone(), require_org))
        .route_layer(from_fn_with_state(state.clone(), require_user));

    let api = mount_group(protected_api, flags.outreach, "webhooks", webhook_routes);

    Router::new()
        .route("/health", get(public::health))
        .nest(API_PREFIX, api)
        .fallback(handlers::not_found)
        .layer(cors_layer(&state.config))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn journalist_routes() -> Router<AppState> {
    use protected::journalists;

    Router::new()
        .route("/journalists/profiles", get(journalists::list).post(journalists::create))
        .route(
            "/journalists/profiles/:id",
            get(journalists::get)
                .patch(journalists::update)
                .delete(journalists::delete),
        )
}

fn outreach_routes() -> Router<AppState> {
    use protected::outreach;

    Router::new()
        .route(
            "/outreach/sequences",
            get(outreach::list_sequences).post(outreach::create_sequence),
        )
        .route(
            "/outreach/sequences/:id",
            get(outreach::get_sequence)
                .patch(outreach::update_sequence)
                .delete(outreach::delete_sequence),
        )
        .route("/outreach/sequences/:id/runs", post(outreach::start_run))
        .route("/outreach/runs", get(outreach::list_runs))
        .route("/outreach/runs/:id", get(outreach::get_run))
        .route("/outreach/runs/:id/advance", post(outreach::advance_run))
        .route("/outreach/runs/:id/stop", post(outreach::stop_run))
}

fn governance_routes() -> Router<AppState> {
    use protected::governance;

    Router::new()
        .route("/governance/policies", get(governance::list).post(governance::create))
        .route(
            "/governance/policies/:id",
            get(governance::get)
                .patch(governance::update)
                .delete(governance::delete),
        )
}

fn billing_routes() -> Router<AppState> {
    use protected::billing;

    Router::new()
        .route("/billing/plans", get(billing::plans))
        .route("/billing/summary", get(billing::summary))
        .route("/billing/plan-switch", post(billing::plan_switch))
}

/// Unauthenticated provider callbacks
fn webhook_routes() -> Router<AppState> {
    Router::new().route("/webhooks/track", post(public::track))
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    let origins = &config.security.cors_origins;
    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        return CorsLayer::permissive();
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any)
}

//! API Router and Application State
//!
//! Central routing configuration and shared state.

pub mod access;

use std::any::Any;
use std::sync::Arc;

use axum::{
    extract::State,
    middleware::{from_fn, from_fn_with_state},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{Any as AnyOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    auth::{self, require_permission, require_role, AuthError, IdentityProvider},
    config::Config,
    permissions::{AccessPolicy, AccessResolver, AccessStore, ADMIN_ROLE},
};

/// Shared application state.
///
/// Built once at startup; every request shares the same store, identity
/// provider and resolver.
#[derive(Clone)]
pub struct AppState {
    /// Server configuration
    pub config: Arc<Config>,
    /// Bearer token verification
    pub identity: Arc<dyn IdentityProvider>,
    /// Per-request access resolution
    pub resolver: AccessResolver,
}

impl AppState {
    /// Create new application state.
    #[must_use]
    pub fn new(
        config: Config,
        identity: Arc<dyn IdentityProvider>,
        store: Arc<dyn AccessStore>,
    ) -> Self {
        let policy = AccessPolicy::new(config.inventory_read_implies_create);
        Self {
            config: Arc::new(config),
            identity,
            resolver: AccessResolver::new(store, policy),
        }
    }
}

/// Create the main application router.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AnyOrigin)
        .allow_methods(AnyOrigin)
        .allow_headers(AnyOrigin);

    // Role catalog is visible to anyone who may read collaborators
    let role_routes = Router::new()
        .route("/roles", get(access::list_roles))
        .route_layer(from_fn_with_state(
            state.clone(),
            require_permission("collaborators", "read"),
        ));

    let admin_routes = Router::new()
        .route("/users/{user_id}/access", get(access::get_user_access))
        .route_layer(from_fn(require_role([ADMIN_ROLE])));

    // Protected routes that require authentication
    let protected_routes = Router::new()
        .merge(auth::me_router())
        .merge(role_routes)
        .nest("/admin", admin_routes)
        .layer(from_fn_with_state(state.clone(), auth::require_auth));

    Router::new()
        // Health check
        .route("/health", get(health_check))
        .nest("/api", protected_routes)
        // Middleware
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        // State
        .with_state(state)
}

/// Health check response.
#[derive(Serialize)]
struct HealthResponse {
    /// Service status
    status: &'static str,
    /// Whether `inventory:read` also grants `inventory:create`
    inventory_read_implies_create: bool,
}

/// Health check endpoint.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        inventory_read_implies_create: state.config.inventory_read_implies_create,
    })
}

/// Convert a panic anywhere below the router into a 500 JSON response.
fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");

    AuthError::Internal(format!("handler panicked: {detail}")).into_response()
}

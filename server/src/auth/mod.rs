//! Authentication Service
//!
//! Verifies platform-issued bearer tokens, resolves the caller's access, and
//! provides route guards for permissions and roles.

mod error;
mod handlers;
pub mod identity;
pub mod jwt;
mod middleware;

use axum::{
    routing::{get, post},
    Router,
};

use crate::api::AppState;

pub use error::{
    AuthError, AuthResult, ErrorResponse, PermissionDeniedResponse, RoleDeniedResponse,
};
pub use handlers::{CurrentUserResponse, ModuleAccessResponse, PermissionCheckResponse};
pub use identity::{Identity, IdentityProvider, VerificationError};
pub use jwt::JwtIdentityProvider;
pub use middleware::{
    bearer_token, require_auth, require_permission, require_role, AuthUser, GuardFuture,
};

/// Create the current-user router.
///
/// All routes expect [`require_auth`] to be applied by the caller:
/// - GET /me - Current user with roles, permissions and modules
/// - POST /me/permissions/check - Evaluate one `module:action`
/// - GET /me/modules/{module} - Database-side module access check
pub fn me_router() -> Router<AppState> {
    Router::new()
        .route("/me", get(handlers::get_current_user))
        .route("/me/permissions/check", post(handlers::check_permission))
        .route("/me/modules/{module}", get(handlers::get_module_access))
}

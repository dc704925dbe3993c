//! Current-user endpoints.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::AppState;
use crate::permissions::{permission_key, AccessSet};

use super::error::AuthResult;
use super::middleware::AuthUser;

/// Current user profile with resolved access.
#[derive(Debug, Serialize)]
pub struct CurrentUserResponse {
    pub id: Uuid,
    pub email: String,
    pub full_name: Option<String>,
    pub roles: Vec<String>,
    pub permissions: Vec<String>,
    pub available_modules: Vec<String>,
}

/// Permission check request.
#[derive(Debug, Deserialize)]
pub struct PermissionCheckRequest {
    pub module: String,
    pub action: String,
}

/// Permission check result.
#[derive(Debug, Serialize)]
pub struct PermissionCheckResponse {
    pub permission: String,
    pub allowed: bool,
}

/// Module access result.
#[derive(Debug, Serialize)]
pub struct ModuleAccessResponse {
    pub module: String,
    pub has_access: bool,
}

/// GET /api/me
pub async fn get_current_user(auth_user: AuthUser, access: AccessSet) -> Json<CurrentUserResponse> {
    Json(CurrentUserResponse {
        id: auth_user.id,
        email: auth_user.email,
        full_name: auth_user.full_name,
        roles: access.sorted_roles(),
        permissions: access.sorted_permissions(),
        available_modules: access.available_modules(),
    })
}

/// POST /api/me/permissions/check
///
/// Lets the front-end decide which affordances to show using the same policy
/// as the route guards.
pub async fn check_permission(
    State(state): State<AppState>,
    access: AccessSet,
    Json(body): Json<PermissionCheckRequest>,
) -> Json<PermissionCheckResponse> {
    let allowed = state
        .resolver
        .policy()
        .has_permission(&access, &body.module, &body.action);

    Json(PermissionCheckResponse {
        permission: permission_key(&body.module, &body.action),
        allowed,
    })
}

/// GET /api/me/modules/{module}
///
/// Answered by the database-side module access function.
#[tracing::instrument(skip(state, auth_user), fields(user_id = %auth_user.id))]
pub async fn get_module_access(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(module): Path<String>,
) -> AuthResult<Json<ModuleAccessResponse>> {
    let reply = state
        .resolver
        .store()
        .check_module_access(auth_user.id, &module)
        .await?;

    Ok(Json(ModuleAccessResponse {
        has_access: reply.is_granted(),
        module,
    }))
}

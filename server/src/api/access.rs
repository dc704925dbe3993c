//! Role catalog and admin access inspection.

use std::collections::{BTreeMap, BTreeSet};

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use super::AppState;
use crate::auth::{AuthError, AuthResult, AuthUser};
use crate::permissions::{permission_key, ResolveError, RoleGrantRow};

/// Role with the permissions it grants.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct RoleSummary {
    pub name: String,
    pub permissions: Vec<String>,
}

/// Resolved access of another user.
#[derive(Debug, Serialize)]
pub struct UserAccessResponse {
    pub user_id: Uuid,
    pub full_name: Option<String>,
    pub roles: Vec<String>,
    pub permissions: Vec<String>,
    pub available_modules: Vec<String>,
}

/// Group catalog rows by role, sorted by name.
pub fn summarize_roles(rows: Vec<RoleGrantRow>) -> Vec<RoleSummary> {
    let mut catalog: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();

    for row in rows {
        let permissions = catalog.entry(row.role_name).or_default();
        if let (Some(module), Some(action)) = (row.module_name, row.action) {
            permissions.insert(permission_key(&module, &action));
        }
    }

    catalog
        .into_iter()
        .map(|(name, permissions)| RoleSummary {
            name,
            permissions: permissions.into_iter().collect(),
        })
        .collect()
}

/// GET /api/roles
pub async fn list_roles(State(state): State<AppState>) -> AuthResult<Json<Vec<RoleSummary>>> {
    let rows = state.resolver.store().list_role_grants().await?;
    Ok(Json(summarize_roles(rows)))
}

/// GET /api/admin/users/{user_id}/access
#[tracing::instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn get_user_access(
    State(state): State<AppState>,
    admin: AuthUser,
    Path(user_id): Path<Uuid>,
) -> AuthResult<Json<UserAccessResponse>> {
    let resolved = state
        .resolver
        .resolve_user(user_id)
        .await
        .map_err(|e| match e {
            ResolveError::ProfileNotFound | ResolveError::InvalidIdentity => {
                AuthError::UserNotFound
            }
            other => AuthError::from(other),
        })?;

    info!(target_user = %user_id, "Admin inspected user access");

    Ok(Json(UserAccessResponse {
        user_id,
        full_name: resolved.profile.full_name,
        roles: resolved.access.sorted_roles(),
        permissions: resolved.access.sorted_permissions(),
        available_modules: resolved.access.available_modules(),
    }))
}

//! Database boundary for access resolution.
//!
//! The resolver only sees flat rows through the [`AccessStore`] trait; the
//! Postgres implementation owns the SQL and normalizes reply shapes once.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value as JsonValue;
use sqlx::{FromRow, PgPool};
use thiserror::Error;
use uuid::Uuid;

/// Errors raised by an [`AccessStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Backing store could not be reached.
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// User profile row.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct Profile {
    pub user_id: Uuid,
    pub full_name: Option<String>,
    pub is_active: bool,
}

/// One row of `user_roles ⋈ roles ⟕ role_permissions ⟕ permissions`.
///
/// A role without permissions appears once with both permission columns null.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct RoleGrantRow {
    pub role_name: String,
    pub module_name: Option<String>,
    pub action: Option<String>,
}

impl RoleGrantRow {
    /// Row for a role that grants `module:action`.
    pub fn granted(
        role: impl Into<String>,
        module: impl Into<String>,
        action: impl Into<String>,
    ) -> Self {
        Self {
            role_name: role.into(),
            module_name: Some(module.into()),
            action: Some(action.into()),
        }
    }

    /// Row for a role with no linked permissions.
    pub fn bare(role: impl Into<String>) -> Self {
        Self {
            role_name: role.into(),
            module_name: None,
            action: None,
        }
    }
}

/// Reply of the database-side module access function.
///
/// Depending on how the function is declared and called, the reply can be a
/// scalar boolean, a set of rows, or nothing at all.
#[derive(Debug, Clone, PartialEq)]
pub enum ModuleAccessReply {
    /// Scalar boolean result.
    Flag(bool),
    /// Set-returning result; any row means access.
    Rows(Vec<JsonValue>),
    /// SQL `NULL` or no result.
    Empty,
    /// Any other JSON shape. Treated as no access.
    Unexpected(JsonValue),
}

impl ModuleAccessReply {
    /// Collapse the reply into a single access decision.
    #[must_use]
    pub fn is_granted(&self) -> bool {
        match self {
            Self::Flag(granted) => *granted,
            Self::Rows(rows) => !rows.is_empty(),
            Self::Empty => false,
            Self::Unexpected(value) => {
                tracing::warn!(reply = %value, "Unexpected module access reply shape");
                false
            }
        }
    }
}

impl From<Option<JsonValue>> for ModuleAccessReply {
    fn from(value: Option<JsonValue>) -> Self {
        match value {
            None | Some(JsonValue::Null) => Self::Empty,
            Some(JsonValue::Bool(granted)) => Self::Flag(granted),
            Some(JsonValue::Array(rows)) => Self::Rows(rows),
            Some(row @ JsonValue::Object(_)) => Self::Rows(vec![row]),
            Some(other) => Self::Unexpected(other),
        }
    }
}

/// Read-only source of profiles and role grants.
///
/// Constructed once at startup and shared by every request.
#[async_trait]
pub trait AccessStore: Send + Sync {
    /// Active profile for a user, if any.
    async fn find_active_profile(&self, user_id: Uuid) -> Result<Option<Profile>, StoreError>;

    /// Grants from the user's active role assignments.
    async fn load_role_grants(&self, user_id: Uuid) -> Result<Vec<RoleGrantRow>, StoreError>;

    /// Every role with its permissions.
    async fn list_role_grants(&self) -> Result<Vec<RoleGrantRow>, StoreError>;

    /// Ask the database whether the user may use a module.
    async fn check_module_access(
        &self,
        user_id: Uuid,
        module: &str,
    ) -> Result<ModuleAccessReply, StoreError>;
}

/// Postgres-backed [`AccessStore`].
#[derive(Clone)]
pub struct PgAccessStore {
    pool: PgPool,
}

impl PgAccessStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccessStore for PgAccessStore {
    #[tracing::instrument(skip(self))]
    async fn find_active_profile(&self, user_id: Uuid) -> Result<Option<Profile>, StoreError> {
        let profile = sqlx::query_as::<_, Profile>(
            r"
            SELECT user_id, full_name, is_active
            FROM user_profiles
            WHERE user_id = $1 AND is_active = true
            ",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(profile)
    }

    #[tracing::instrument(skip(self))]
    async fn load_role_grants(&self, user_id: Uuid) -> Result<Vec<RoleGrantRow>, StoreError> {
        let rows = sqlx::query_as::<_, RoleGrantRow>(
            r"
            SELECT r.name AS role_name, p.module_name, p.action
            FROM user_roles ur
            INNER JOIN roles r ON r.id = ur.role_id
            LEFT JOIN role_permissions rp ON rp.role_id = r.id
            LEFT JOIN permissions p ON p.id = rp.permission_id
            WHERE ur.user_id = $1 AND ur.is_active = true
            ",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn list_role_grants(&self) -> Result<Vec<RoleGrantRow>, StoreError> {
        let rows = sqlx::query_as::<_, RoleGrantRow>(
            r"
            SELECT r.name AS role_name, p.module_name, p.action
            FROM roles r
            LEFT JOIN role_permissions rp ON rp.role_id = r.id
            LEFT JOIN permissions p ON p.id = rp.permission_id
            ORDER BY r.name, p.module_name, p.action
            ",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    #[tracing::instrument(skip(self))]
    async fn check_module_access(
        &self,
        user_id: Uuid,
        module: &str,
    ) -> Result<ModuleAccessReply, StoreError> {
        let (reply,): (Option<JsonValue>,) =
            sqlx::query_as("SELECT to_jsonb(user_has_module_access($1, $2))")
                .bind(user_id)
                .bind(module)
                .fetch_one(&self.pool)
                .await?;

        Ok(ModuleAccessReply::from(reply))
    }
}

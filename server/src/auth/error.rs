//! Authentication and Authorization Error Types

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::permissions::{ResolveError, StoreError};

/// Authentication and authorization errors.
#[derive(Debug, Error)]
pub enum AuthError {
    /// No bearer token on the request.
    #[error("Access token required")]
    MissingToken,

    /// Identity provider rejected the token.
    #[error("Invalid token")]
    InvalidToken,

    /// No active profile for the identity.
    #[error("User profile not found")]
    ProfileNotFound,

    /// Roles or permissions could not be loaded.
    #[error("Error loading user permissions")]
    PermissionLoadFailed,

    /// Target user has no active profile.
    #[error("User not found")]
    UserNotFound,

    /// Caller lacks the required permission.
    #[error("Insufficient permissions")]
    PermissionDenied {
        required: String,
        user_permissions: Vec<String>,
    },

    /// Caller holds none of the required roles.
    #[error("Insufficient role")]
    RoleDenied {
        required: Vec<String>,
        user_roles: Vec<String>,
    },

    /// Store error outside access resolution.
    #[error("Internal server error")]
    Store(#[from] StoreError),

    /// Internal server error.
    #[error("Internal server error")]
    Internal(String),
}

impl From<ResolveError> for AuthError {
    fn from(err: ResolveError) -> Self {
        match err {
            ResolveError::InvalidIdentity => Self::InvalidToken,
            ResolveError::ProfileNotFound => Self::ProfileNotFound,
            ResolveError::PermissionLoadFailed(_) => Self::PermissionLoadFailed,
        }
    }
}

impl AuthError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::MissingToken | Self::InvalidToken => StatusCode::UNAUTHORIZED,
            Self::ProfileNotFound
            | Self::PermissionLoadFailed
            | Self::PermissionDenied { .. }
            | Self::RoleDenied { .. } => StatusCode::FORBIDDEN,
            Self::UserNotFound => StatusCode::NOT_FOUND,
            Self::Store(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Machine-readable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::MissingToken => "MISSING_TOKEN",
            Self::InvalidToken => "INVALID_TOKEN",
            Self::ProfileNotFound => "PROFILE_NOT_FOUND",
            Self::PermissionLoadFailed => "PERMISSION_LOAD_FAILED",
            Self::UserNotFound => "USER_NOT_FOUND",
            Self::PermissionDenied { .. } => "PERMISSION_DENIED",
            Self::RoleDenied { .. } => "ROLE_DENIED",
            Self::Store(_) | Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

/// Error response body for JSON responses.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Human-readable error message.
    pub error: String,
    /// Machine-readable error code.
    pub code: &'static str,
}

/// Body of a missing-permission rejection.
#[derive(Debug, Serialize)]
pub struct PermissionDeniedResponse {
    pub error: String,
    pub code: &'static str,
    /// The `module:action` that was required.
    pub required: String,
    #[serde(rename = "userPermissions")]
    pub user_permissions: Vec<String>,
}

/// Body of a missing-role rejection.
#[derive(Debug, Serialize)]
pub struct RoleDeniedResponse {
    pub error: String,
    pub code: &'static str,
    pub required: Vec<String>,
    pub user_roles: Vec<String>,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();
        let error = self.to_string();

        match &self {
            Self::Store(e) => tracing::error!(error = %e, "Store error"),
            Self::Internal(msg) => tracing::error!(error = %msg, "Internal error"),
            _ => {}
        }

        match self {
            Self::PermissionDenied {
                required,
                user_permissions,
            } => (
                status,
                Json(PermissionDeniedResponse {
                    error,
                    code,
                    required,
                    user_permissions,
                }),
            )
                .into_response(),
            Self::RoleDenied {
                required,
                user_roles,
            } => (
                status,
                Json(RoleDeniedResponse {
                    error,
                    code,
                    required,
                    user_roles,
                }),
            )
                .into_response(),
            _ => (status, Json(ErrorResponse { error, code })).into_response(),
        }
    }
}

/// Result type for auth operations.
pub type AuthResult<T> = Result<T, AuthError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(AuthError::MissingToken.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AuthError::InvalidToken.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AuthError::ProfileNotFound.status(), StatusCode::FORBIDDEN);
        assert_eq!(AuthError::PermissionLoadFailed.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            AuthError::Internal("boom".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_profile_and_load_failures_have_distinct_messages() {
        assert_ne!(
            AuthError::ProfileNotFound.to_string(),
            AuthError::PermissionLoadFailed.to_string()
        );
        assert_eq!(AuthError::ProfileNotFound.to_string(), "User profile not found");
        assert_eq!(
            AuthError::PermissionLoadFailed.to_string(),
            "Error loading user permissions"
        );
    }

    #[test]
    fn test_resolve_error_mapping() {
        assert!(matches!(
            AuthError::from(ResolveError::InvalidIdentity),
            AuthError::InvalidToken
        ));
        assert!(matches!(
            AuthError::from(ResolveError::ProfileNotFound),
            AuthError::ProfileNotFound
        ));
        assert!(matches!(
            AuthError::from(ResolveError::PermissionLoadFailed(StoreError::Unavailable(
                "down".into()
            ))),
            AuthError::PermissionLoadFailed
        ));
    }

    #[test]
    fn test_permission_denied_body_shape() {
        let body = serde_json::to_value(PermissionDeniedResponse {
            error: "Insufficient permissions".into(),
            code: "PERMISSION_DENIED",
            required: "inventory:delete".into(),
            user_permissions: vec!["inventory:read".into()],
        })
        .unwrap();

        assert_eq!(body["required"], "inventory:delete");
        assert_eq!(body["userPermissions"][0], "inventory:read");
    }
}

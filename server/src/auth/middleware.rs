//! Authentication and Authorization Middleware

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use tracing::debug;
use uuid::Uuid;

use crate::api::AppState;
use crate::permissions::{permission_key, AccessSet};

use super::error::AuthError;

/// Authenticated user injected into request extensions.
///
/// Use this in handlers to access the current user.
#[derive(Debug, Clone)]
pub struct AuthUser {
    /// User ID.
    pub id: Uuid,
    /// Email (empty if the platform has none).
    pub email: String,
    /// Display name from the user's profile.
    pub full_name: Option<String>,
}

/// Boxed middleware future returned by the guard constructors.
pub type GuardFuture = Pin<Box<dyn Future<Output = Result<Response, AuthError>> + Send>>;

/// Extract a non-empty Bearer token from the request headers.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Middleware to require authentication.
///
/// Extracts the Bearer token, verifies it with the identity provider,
/// resolves the caller's access set, and injects both [`AuthUser`] and
/// [`AccessSet`] into request extensions.
///
/// # Usage
///
/// ```ignore
/// Router::new()
///     .route("/protected", get(handler))
///     .layer(axum::middleware::from_fn_with_state(state, require_auth))
/// ```
#[tracing::instrument(skip(state, request, next))]
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    // Missing tokens never reach the identity provider
    let token = bearer_token(request.headers()).ok_or(AuthError::MissingToken)?;

    let identity = state.identity.verify_token(token).await.map_err(|e| {
        debug!(error = %e, "Token rejected");
        AuthError::InvalidToken
    })?;

    let resolved = state.resolver.resolve_user(identity.id).await?;

    let auth_user = AuthUser {
        id: identity.id,
        email: identity.email,
        full_name: resolved.profile.full_name,
    };
    request.extensions_mut().insert(auth_user);
    request.extensions_mut().insert(resolved.access);

    Ok(next.run(request).await)
}

/// Middleware factory requiring a `module:action` permission.
///
/// Must run after [`require_auth`]. Admins always pass; implied grants from
/// the configured policy are honored.
///
/// ```ignore
/// Router::new()
///     .route("/roles", get(list_roles))
///     .route_layer(from_fn_with_state(state, require_permission("collaborators", "read")))
/// ```
pub fn require_permission(
    module: &'static str,
    action: &'static str,
) -> impl Fn(State<AppState>, Request, Next) -> GuardFuture + Clone + Send + Sync + 'static {
    move |State(state): State<AppState>, request: Request, next: Next| {
        Box::pin(async move {
            let Some(access) = request.extensions().get::<AccessSet>() else {
                return Err(AuthError::MissingToken);
            };

            if !state.resolver.policy().has_permission(access, module, action) {
                debug!(module, action, "Permission denied");
                return Err(AuthError::PermissionDenied {
                    required: permission_key(module, action),
                    user_permissions: access.sorted_permissions(),
                });
            }

            Ok(next.run(request).await)
        })
    }
}

/// Middleware factory requiring at least one of the given roles.
///
/// Must run after [`require_auth`].
///
/// ```ignore
/// Router::new()
///     .route("/admin/users/{user_id}/access", get(user_access))
///     .route_layer(from_fn(require_role(["admin"])))
/// ```
pub fn require_role<I, R>(
    roles: I,
) -> impl Fn(Request, Next) -> GuardFuture + Clone + Send + Sync + 'static
where
    I: IntoIterator<Item = R>,
    R: Into<String>,
{
    let required: Arc<[String]> = roles.into_iter().map(Into::into).collect();

    move |request: Request, next: Next| {
        let required = Arc::clone(&required);
        Box::pin(async move {
            let Some(access) = request.extensions().get::<AccessSet>() else {
                return Err(AuthError::MissingToken);
            };

            if !access.has_role(required.iter()) {
                debug!(required = ?required, "Role denied");
                return Err(AuthError::RoleDenied {
                    required: required.to_vec(),
                    user_roles: access.sorted_roles(),
                });
            }

            Ok(next.run(request).await)
        })
    }
}

/// Extractor for the authenticated user in handlers.
///
/// ```ignore
/// async fn protected_handler(auth_user: AuthUser) -> impl IntoResponse {
///     format!("Hello, {}!", auth_user.email)
/// }
/// ```
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Self>()
            .cloned()
            .ok_or(AuthError::MissingToken)
    }
}

/// Extractor for the caller's resolved access set.
impl<S> FromRequestParts<S> for AccessSet
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Self>()
            .cloned()
            .ok_or(AuthError::MissingToken)
    }
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_bearer_token_extracted() {
        assert_eq!(bearer_token(&headers_with("Bearer abc.def")), Some("abc.def"));
    }

    #[test]
    fn test_bearer_token_missing_or_malformed() {
        assert_eq!(bearer_token(&HeaderMap::new()), None);
        assert_eq!(bearer_token(&headers_with("Basic dXNlcjpwYXNz")), None);
        assert_eq!(bearer_token(&headers_with("Bearer ")), None);
        assert_eq!(bearer_token(&headers_with("Bearer    ")), None);
    }
}

//! Permission resolution logic.
//!
//! Turns a verified user id into the [`AccessSet`] used by route guards.
//!
//! Resolution:
//! 1. Active profile lookup and active role grant lookup run concurrently
//! 2. Either failing rejects the request; no partial access set is returned
//! 3. Role grant rows are folded into role names and `module:action` strings

use std::sync::Arc;

use thiserror::Error;
use tracing::warn;
use uuid::Uuid;

use super::access::{permission_key, AccessPolicy, AccessSet};
use super::store::{AccessStore, Profile, RoleGrantRow, StoreError};

/// Access resolution errors.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The identity carries no usable user id.
    #[error("Identity has no user id")]
    InvalidIdentity,

    /// No active profile exists for the user.
    #[error("User profile not found")]
    ProfileNotFound,

    /// Role or permission rows could not be loaded.
    #[error("Error loading user permissions")]
    PermissionLoadFailed(#[source] StoreError),
}

/// Profile and access set of a resolved user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedUser {
    pub profile: Profile,
    pub access: AccessSet,
}

/// Fold flat role grant rows into an access set.
///
/// Every row contributes its role name. Rows carrying both a module and an
/// action contribute one permission string; duplicates collapse.
pub fn fold_access_rows<I>(rows: I) -> AccessSet
where
    I: IntoIterator<Item = RoleGrantRow>,
{
    rows.into_iter().fold(AccessSet::default(), |mut access, row| {
        if let (Some(module), Some(action)) = (row.module_name.as_deref(), row.action.as_deref()) {
            access.permissions.insert(permission_key(module, action));
        }
        access.roles.insert(row.role_name);
        access
    })
}

/// Resolves access for users against a shared [`AccessStore`].
#[derive(Clone)]
pub struct AccessResolver {
    store: Arc<dyn AccessStore>,
    policy: Arc<AccessPolicy>,
}

impl AccessResolver {
    /// Create a resolver over a store built once at startup.
    #[must_use]
    pub fn new(store: Arc<dyn AccessStore>, policy: AccessPolicy) -> Self {
        Self {
            store,
            policy: Arc::new(policy),
        }
    }

    /// Policy used by route guards.
    #[must_use]
    pub fn policy(&self) -> &AccessPolicy {
        &self.policy
    }

    /// Underlying store.
    #[must_use]
    pub fn store(&self) -> &dyn AccessStore {
        self.store.as_ref()
    }

    /// Resolve a user's access set.
    pub async fn resolve_access(&self, user_id: Uuid) -> Result<AccessSet, ResolveError> {
        self.resolve_user(user_id).await.map(|user| user.access)
    }

    /// Resolve a user's active profile together with their access set.
    ///
    /// The first failing lookup wins; the other lookup is dropped.
    #[tracing::instrument(skip(self))]
    pub async fn resolve_user(&self, user_id: Uuid) -> Result<ResolvedUser, ResolveError> {
        if user_id.is_nil() {
            return Err(ResolveError::InvalidIdentity);
        }

        let profile_lookup = async {
            match self.store.find_active_profile(user_id).await {
                Ok(Some(profile)) => Ok(profile),
                Ok(None) => Err(ResolveError::ProfileNotFound),
                Err(e) => {
                    warn!(error = %e, "Profile lookup failed");
                    Err(ResolveError::ProfileNotFound)
                }
            }
        };

        let grants_lookup = async {
            self.store.load_role_grants(user_id).await.map_err(|e| {
                warn!(error = %e, "Role grant lookup failed");
                ResolveError::PermissionLoadFailed(e)
            })
        };

        let (profile, rows) = tokio::try_join!(profile_lookup, grants_lookup)?;
        let access = fold_access_rows(rows);

        tracing::debug!(
            roles = access.roles.len(),
            permissions = access.permissions.len(),
            "Resolved user access"
        );

        Ok(ResolvedUser { profile, access })
    }
}

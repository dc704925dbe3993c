//! In-process [`AccessStore`] for tests and local development.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::access::ADMIN_ROLE;
use super::store::{AccessStore, ModuleAccessReply, Profile, RoleGrantRow, StoreError};

#[derive(Debug, Clone)]
struct Assignment {
    user_id: Uuid,
    role: String,
    is_active: bool,
}

#[derive(Debug, Default)]
struct MemoryData {
    profiles: HashMap<Uuid, Profile>,
    /// Role name to its `(module, action)` grants.
    roles: BTreeMap<String, Vec<(String, String)>>,
    assignments: Vec<Assignment>,
    fail_profiles: bool,
    fail_grants: bool,
    fail_catalog: bool,
    fail_module_checks: bool,
}

impl MemoryData {
    fn active_grants(&self, user_id: Uuid) -> Vec<RoleGrantRow> {
        self.assignments
            .iter()
            .filter(|a| a.user_id == user_id && a.is_active)
            .flat_map(|a| role_rows(&a.role, self.roles.get(&a.role)))
            .collect()
    }
}

fn role_rows(role: &str, grants: Option<&Vec<(String, String)>>) -> Vec<RoleGrantRow> {
    match grants {
        Some(grants) if !grants.is_empty() => grants
            .iter()
            .map(|(module, action)| RoleGrantRow::granted(role, module.as_str(), action.as_str()))
            .collect(),
        _ => vec![RoleGrantRow::bare(role)],
    }
}

/// Access data held in memory.
#[derive(Debug, Default)]
pub struct MemoryAccessStore {
    data: RwLock<MemoryData>,
}

impl MemoryAccessStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a user's profile.
    pub async fn insert_profile(&self, user_id: Uuid, full_name: Option<&str>, is_active: bool) {
        self.data.write().await.profiles.insert(
            user_id,
            Profile {
                user_id,
                full_name: full_name.map(str::to_string),
                is_active,
            },
        );
    }

    /// Define a role and the `(module, action)` pairs it grants.
    pub async fn define_role(&self, name: &str, grants: &[(&str, &str)]) {
        self.data.write().await.roles.insert(
            name.to_string(),
            grants
                .iter()
                .map(|(m, a)| ((*m).to_string(), (*a).to_string()))
                .collect(),
        );
    }

    /// Assign a role to a user.
    pub async fn assign_role(&self, user_id: Uuid, role: &str, is_active: bool) {
        self.data.write().await.assignments.push(Assignment {
            user_id,
            role: role.to_string(),
            is_active,
        });
    }

    /// Make profile lookups fail with [`StoreError::Unavailable`].
    pub async fn fail_profile_lookups(&self, fail: bool) {
        self.data.write().await.fail_profiles = fail;
    }

    /// Make per-user role grant lookups fail with [`StoreError::Unavailable`].
    pub async fn fail_grant_lookups(&self, fail: bool) {
        self.data.write().await.fail_grants = fail;
    }

    /// Make role catalog listing fail with [`StoreError::Unavailable`].
    pub async fn fail_catalog_lookups(&self, fail: bool) {
        self.data.write().await.fail_catalog = fail;
    }

    /// Make module access checks fail with [`StoreError::Unavailable`].
    pub async fn fail_module_checks(&self, fail: bool) {
        self.data.write().await.fail_module_checks = fail;
    }
}

#[async_trait]
impl AccessStore for MemoryAccessStore {
    async fn find_active_profile(&self, user_id: Uuid) -> Result<Option<Profile>, StoreError> {
        let data = self.data.read().await;
        if data.fail_profiles {
            return Err(StoreError::Unavailable("profile lookup disabled".into()));
        }

        Ok(data
            .profiles
            .get(&user_id)
            .filter(|p| p.is_active)
            .cloned())
    }

    async fn load_role_grants(&self, user_id: Uuid) -> Result<Vec<RoleGrantRow>, StoreError> {
        let data = self.data.read().await;
        if data.fail_grants {
            return Err(StoreError::Unavailable("role lookup disabled".into()));
        }

        Ok(data.active_grants(user_id))
    }

    async fn list_role_grants(&self) -> Result<Vec<RoleGrantRow>, StoreError> {
        let data = self.data.read().await;
        if data.fail_catalog {
            return Err(StoreError::Unavailable("role catalog disabled".into()));
        }

        Ok(data
            .roles
            .iter()
            .flat_map(|(name, grants)| role_rows(name, Some(grants)))
            .collect())
    }

    async fn check_module_access(
        &self,
        user_id: Uuid,
        module: &str,
    ) -> Result<ModuleAccessReply, StoreError> {
        let data = self.data.read().await;
        if data.fail_module_checks {
            return Err(StoreError::Unavailable("module check disabled".into()));
        }

        // Inactive profiles see no modules, same as the SQL function
        let active = data.profiles.get(&user_id).is_some_and(|p| p.is_active);
        let granted = active
            && data.active_grants(user_id).iter().any(|row| {
                row.role_name == ADMIN_ROLE || row.module_name.as_deref() == Some(module)
            });

        Ok(ModuleAccessReply::Flag(granted))
    }
}

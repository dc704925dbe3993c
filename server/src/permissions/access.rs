//! Per-request access set and the policy used to query it.
//!
//! An [`AccessSet`] is the flattened view of a user's active roles and the
//! `module:action` permissions those roles grant. It is rebuilt on every
//! request and never cached.

use std::collections::{BTreeSet, HashSet};

/// Role that implies every permission.
pub const ADMIN_ROLE: &str = "admin";

/// Build the canonical permission string for a module and action.
#[must_use]
pub fn permission_key(module: &str, action: &str) -> String {
    format!("{module}:{action}")
}

/// Resolved roles and permissions for one authenticated user.
///
/// Both fields have set semantics: ordering and multiplicity of the
/// underlying grants are irrelevant.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessSet {
    /// Names of the user's active roles.
    pub roles: HashSet<String>,
    /// Flattened `module:action` permission strings.
    pub permissions: HashSet<String>,
}

impl AccessSet {
    /// Whether the user holds the admin role.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.roles.contains(ADMIN_ROLE)
    }

    /// Exact permission check.
    ///
    /// Admins pass unconditionally, even without explicit grants. Implied
    /// grants are not considered here, see [`AccessPolicy::has_permission`].
    #[must_use]
    pub fn has_permission(&self, module: &str, action: &str) -> bool {
        self.is_admin() || self.permissions.contains(&permission_key(module, action))
    }

    /// Whether the user holds any permission within `module`.
    #[must_use]
    pub fn has_module_access(&self, module: &str) -> bool {
        if self.is_admin() {
            return true;
        }

        let prefix = format!("{module}:");
        self.permissions.iter().any(|p| p.starts_with(&prefix))
    }

    /// Whether the user holds at least one of the given roles.
    ///
    /// ```
    /// use stockroom_server::permissions::AccessSet;
    ///
    /// let mut access = AccessSet::default();
    /// access.roles.insert("editor".to_string());
    ///
    /// assert!(access.has_role(["editor"]));
    /// assert!(access.has_role(["viewer", "editor"]));
    /// assert!(!access.has_role(["admin"]));
    /// ```
    pub fn has_role<I, R>(&self, roles: I) -> bool
    where
        I: IntoIterator<Item = R>,
        R: AsRef<str>,
    {
        roles
            .into_iter()
            .any(|role| self.roles.contains(role.as_ref()))
    }

    /// Distinct module names derived from the permission strings.
    #[must_use]
    pub fn available_modules(&self) -> Vec<String> {
        self.permissions
            .iter()
            .filter_map(|p| p.split(':').next())
            .filter(|m| !m.is_empty())
            .map(str::to_string)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Roles in a stable order for response bodies.
    #[must_use]
    pub fn sorted_roles(&self) -> Vec<String> {
        let mut roles: Vec<_> = self.roles.iter().cloned().collect();
        roles.sort();
        roles
    }

    /// Permissions in a stable order for response bodies.
    #[must_use]
    pub fn sorted_permissions(&self) -> Vec<String> {
        let mut permissions: Vec<_> = self.permissions.iter().cloned().collect();
        permissions.sort();
        permissions
    }
}

/// A named rule: holding one permission also grants another.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImpliedGrant {
    /// Rule name, used in logs.
    pub name: &'static str,
    /// Module of the granted permission.
    pub module: &'static str,
    /// Action of the granted permission.
    pub action: &'static str,
    /// Module of the permission that triggers the grant.
    pub implied_by_module: &'static str,
    /// Action of the permission that triggers the grant.
    pub implied_by_action: &'static str,
}

impl ImpliedGrant {
    /// Read access to inventory is enough for the "add item" affordance.
    pub const INVENTORY_CREATE_FROM_READ: Self = Self {
        name: "inventory_create_from_read",
        module: "inventory",
        action: "create",
        implied_by_module: "inventory",
        implied_by_action: "read",
    };

    /// Whether this rule grants `module:action` to the holder of `access`.
    #[must_use]
    pub fn applies(&self, access: &AccessSet, module: &str, action: &str) -> bool {
        self.module == module
            && self.action == action
            && access
                .permissions
                .contains(&permission_key(self.implied_by_module, self.implied_by_action))
    }
}

/// Permission evaluation policy shared by all route guards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessPolicy {
    implied_grants: Vec<ImpliedGrant>,
}

impl Default for AccessPolicy {
    fn default() -> Self {
        Self::new(true)
    }
}

impl AccessPolicy {
    /// Create a policy, optionally enabling the inventory create-from-read rule.
    #[must_use]
    pub fn new(inventory_read_implies_create: bool) -> Self {
        let mut implied_grants = Vec::new();
        if inventory_read_implies_create {
            implied_grants.push(ImpliedGrant::INVENTORY_CREATE_FROM_READ);
        }
        Self { implied_grants }
    }

    /// Policy with no implied grants: only admin and explicit permissions count.
    #[must_use]
    pub const fn strict() -> Self {
        Self {
            implied_grants: Vec::new(),
        }
    }

    /// Add another implied grant rule.
    #[must_use]
    pub fn with_implied_grant(mut self, grant: ImpliedGrant) -> Self {
        if !self.implied_grants.contains(&grant) {
            self.implied_grants.push(grant);
        }
        self
    }

    /// Enabled implied grant rules.
    #[must_use]
    pub fn implied_grants(&self) -> &[ImpliedGrant] {
        &self.implied_grants
    }

    /// Full permission check used by route guards.
    #[must_use]
    pub fn has_permission(&self, access: &AccessSet, module: &str, action: &str) -> bool {
        if access.has_permission(module, action) {
            return true;
        }

        match self
            .implied_grants
            .iter()
            .find(|grant| grant.applies(access, module, action))
        {
            Some(grant) => {
                tracing::debug!(
                    rule = grant.name,
                    module,
                    action,
                    "Permission granted by implied rule"
                );
                true
            }
            None => false,
        }
    }
}

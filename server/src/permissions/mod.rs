//! Permission system types and utilities.
//!
//! Role-based model:
//! - Roles bundle `module:action` permissions
//! - The `admin` role implies every permission
//! - Access is resolved per request from active profile and role assignments

pub mod access;
pub mod memory;
pub mod resolver;
pub mod store;

pub use access::{permission_key, AccessPolicy, AccessSet, ImpliedGrant, ADMIN_ROLE};
pub use memory::MemoryAccessStore;
pub use resolver::{fold_access_rows, AccessResolver, ResolveError, ResolvedUser};
pub use store::{AccessStore, ModuleAccessReply, PgAccessStore, Profile, RoleGrantRow, StoreError};

//! Stockroom Server
//!
//! Inventory management API backed by a hosted `PostgreSQL` platform.
//! Every request is authenticated with a platform-issued bearer token and
//! authorized against the caller's freshly resolved roles and permissions.

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod permissions;

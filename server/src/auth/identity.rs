//! Identity provider boundary.
//!
//! Token issuance and session lifetime belong to the hosted auth platform;
//! the server only asks it who a bearer token belongs to.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

/// Verified caller identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Stable user id issued by the platform.
    pub id: Uuid,
    /// Email on record, empty when the platform has none.
    pub email: String,
}

/// Token verification failures.
#[derive(Debug, Error)]
pub enum VerificationError {
    /// Token is past its expiry.
    #[error("Token expired")]
    Expired,

    /// Token is malformed, badly signed, or carries unusable claims.
    #[error("Invalid token: {0}")]
    Invalid(String),
}

/// Verifies opaque bearer tokens.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Resolve a bearer token to the identity it was issued for.
    async fn verify_token(&self, token: &str) -> Result<Identity, VerificationError>;
}

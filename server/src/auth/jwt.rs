//! JWT Access Token Verification
//!
//! Access tokens are issued by the hosted auth platform and signed with its
//! shared HS256 secret. The server never issues tokens itself.

use async_trait::async_trait;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::identity::{Identity, IdentityProvider, VerificationError};

/// Claims read from platform access tokens.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID as UUID string).
    pub sub: String,
    /// Expiration time (Unix timestamp).
    pub exp: i64,
    /// User email, when the platform includes it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// [`IdentityProvider`] backed by HS256-signed JWTs.
#[derive(Clone)]
pub struct JwtIdentityProvider {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtIdentityProvider {
    /// Create a provider for the given secret.
    ///
    /// The `aud` claim is only checked when `audience` is set.
    #[must_use]
    pub fn new(secret: &str, audience: Option<&str>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 0;
        match audience {
            Some(aud) => validation.set_audience(&[aud]),
            None => validation.validate_aud = false,
        }

        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// Validate a token and decode its claims.
    pub fn decode_claims(&self, token: &str) -> Result<Claims, VerificationError> {
        let token_data = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(
            |e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => VerificationError::Expired,
                _ => VerificationError::Invalid(e.to_string()),
            },
        )?;

        Ok(token_data.claims)
    }
}

#[async_trait]
impl IdentityProvider for JwtIdentityProvider {
    async fn verify_token(&self, token: &str) -> Result<Identity, VerificationError> {
        let claims = self.decode_claims(token)?;

        let id: Uuid = claims
            .sub
            .parse()
            .map_err(|_| VerificationError::Invalid("subject is not a user id".into()))?;

        Ok(Identity {
            id,
            email: claims.email.unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde_json::json;

    use super::*;

    const SECRET: &str = "test-jwt-secret";

    fn sign(claims: &serde_json::Value, secret: &str) -> String {
        encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    fn future_exp() -> i64 {
        (Utc::now() + Duration::minutes(15)).timestamp()
    }

    #[tokio::test]
    async fn test_valid_token_yields_identity() {
        let user_id = Uuid::new_v4();
        let token = sign(
            &json!({ "sub": user_id.to_string(), "email": "pat@example.com", "exp": future_exp() }),
            SECRET,
        );

        let identity = JwtIdentityProvider::new(SECRET, None)
            .verify_token(&token)
            .await
            .unwrap();

        assert_eq!(identity.id, user_id);
        assert_eq!(identity.email, "pat@example.com");
    }

    #[tokio::test]
    async fn test_missing_email_defaults_to_empty() {
        let token = sign(
            &json!({ "sub": Uuid::new_v4().to_string(), "exp": future_exp() }),
            SECRET,
        );

        let identity = JwtIdentityProvider::new(SECRET, None)
            .verify_token(&token)
            .await
            .unwrap();

        assert!(identity.email.is_empty());
    }

    #[tokio::test]
    async fn test_expired_token_rejected() {
        let exp = (Utc::now() - Duration::minutes(5)).timestamp();
        let token = sign(&json!({ "sub": Uuid::new_v4().to_string(), "exp": exp }), SECRET);

        let result = JwtIdentityProvider::new(SECRET, None).verify_token(&token).await;
        assert!(matches!(result, Err(VerificationError::Expired)));
    }

    #[tokio::test]
    async fn test_wrong_secret_rejected() {
        let token = sign(
            &json!({ "sub": Uuid::new_v4().to_string(), "exp": future_exp() }),
            "other-secret",
        );

        let result = JwtIdentityProvider::new(SECRET, None).verify_token(&token).await;
        assert!(matches!(result, Err(VerificationError::Invalid(_))));
    }

    #[tokio::test]
    async fn test_non_uuid_subject_rejected() {
        let token = sign(&json!({ "sub": "service-account", "exp": future_exp() }), SECRET);

        let result = JwtIdentityProvider::new(SECRET, None).verify_token(&token).await;
        assert!(matches!(result, Err(VerificationError::Invalid(_))));
    }

    #[tokio::test]
    async fn test_audience_checked_when_configured() {
        let claims = json!({
            "sub": Uuid::new_v4().to_string(),
            "exp": future_exp(),
            "aud": "authenticated",
        });
        let token = sign(&claims, SECRET);

        assert!(JwtIdentityProvider::new(SECRET, Some("authenticated"))
            .verify_token(&token)
            .await
            .is_ok());
        assert!(JwtIdentityProvider::new(SECRET, Some("service_role"))
            .verify_token(&token)
            .await
            .is_err());
        assert!(JwtIdentityProvider::new(SECRET, None)
            .verify_token(&token)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_garbage_token_rejected() {
        let result = JwtIdentityProvider::new(SECRET, None)
            .verify_token("not-a-jwt")
            .await;
        assert!(matches!(result, Err(VerificationError::Invalid(_))));
    }
}

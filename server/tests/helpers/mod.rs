//! Reusable test helpers for HTTP integration tests.
//!
//! Provides `TestApp` for building and sending requests through the full axum
//! router backed by an in-memory access store, plus token minting.
#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{self, header, Method, Request, Response};
use axum::Router;
use chrono::{Duration, Utc};
use http_body_util::BodyExt;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use stockroom_server::api::{create_router, AppState};
use stockroom_server::auth::JwtIdentityProvider;
use stockroom_server::config::Config;
use stockroom_server::permissions::MemoryAccessStore;

/// A seeded user with a valid access token.
pub struct TestUser {
    pub id: Uuid,
    pub email: String,
    pub token: String,
}

impl TestUser {
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.token)
    }
}

/// A test application wrapping the full axum router.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub store: Arc<MemoryAccessStore>,
    pub config: Config,
}

impl TestApp {
    /// Create a new test app with the default test config.
    pub async fn new() -> Self {
        Self::with_config(Config::default_for_test()).await
    }

    /// Create a test app with a custom config.
    pub async fn with_config(config: Config) -> Self {
        let store = Arc::new(MemoryAccessStore::new());
        seed_default_roles(&store).await;

        let identity = Arc::new(JwtIdentityProvider::new(
            &config.jwt_secret,
            config.jwt_audience.as_deref(),
        ));
        let state = AppState::new(config.clone(), identity, store.clone());
        let router = create_router(state.clone());

        Self {
            router,
            state,
            store,
            config,
        }
    }

    /// Build an HTTP request with the given method and URI.
    pub fn request(method: Method, uri: &str) -> http::request::Builder {
        Request::builder().method(method).uri(uri)
    }

    /// Send a request through the router via `tower::ServiceExt::oneshot`.
    pub async fn oneshot(&self, request: Request<Body>) -> Response<Body> {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("oneshot request failed")
    }

    /// GET `uri` as `user`.
    pub async fn get_as(&self, user: &TestUser, uri: &str) -> Response<Body> {
        let req = Self::request(Method::GET, uri)
            .header(header::AUTHORIZATION, user.bearer())
            .body(Body::empty())
            .unwrap();
        self.oneshot(req).await
    }

    /// Create an active user holding the given active roles.
    pub async fn create_user(&self, full_name: &str, roles: &[&str]) -> TestUser {
        let id = Uuid::new_v4();
        self.store.insert_profile(id, Some(full_name), true).await;
        for role in roles {
            self.store.assign_role(id, role, true).await;
        }

        let email = format!("{}@example.com", full_name.to_lowercase().replace(' ', "."));
        let token = generate_access_token(&self.config.jwt_secret, id, &email);
        TestUser { id, email, token }
    }
}

/// Roles used across tests:
/// - admin: no explicit permissions
/// - editor: inventory read/manage, collaborators read
/// - viewer: inventory read
pub async fn seed_default_roles(store: &MemoryAccessStore) {
    store.define_role("admin", &[]).await;
    store
        .define_role(
            "editor",
            &[
                ("inventory", "read"),
                ("inventory", "manage"),
                ("collaborators", "read"),
            ],
        )
        .await;
    store.define_role("viewer", &[("inventory", "read")]).await;
}

/// Mint an HS256 access token the way the auth platform does.
pub fn generate_access_token(secret: &str, user_id: Uuid, email: &str) -> String {
    sign_claims(
        secret,
        &json!({
            "sub": user_id.to_string(),
            "email": email,
            "exp": (Utc::now() + Duration::minutes(15)).timestamp(),
        }),
    )
}

/// Mint an access token that expired five minutes ago.
pub fn generate_expired_token(secret: &str, user_id: Uuid) -> String {
    sign_claims(
        secret,
        &json!({
            "sub": user_id.to_string(),
            "exp": (Utc::now() - Duration::minutes(5)).timestamp(),
        }),
    )
}

pub fn sign_claims(secret: &str, claims: &Value) -> String {
    encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .expect("Failed to sign test token")
}

/// Parse a response body as JSON.
pub async fn body_to_json(response: Response<Body>) -> Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("Failed to read body")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("Response body is not JSON")
}

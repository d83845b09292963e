use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;

use crate::{error::ApiError, sessions::GoogleClaims};

// 1. Verifier Contract

/// GoogleTokenVerifier
///
/// Defines the abstract contract for verifying a Google ID token into a set of
/// identity claims. Signature and audience checking belong to this collaborator;
/// the session manager only ever sees verified claims. The mock implementation
/// keeps the federated path testable without network access.
#[async_trait]
pub trait GoogleTokenVerifier: Send + Sync {
    async fn verify(&self, id_token: &str) -> Result<GoogleClaims, ApiError>;
}

// 2. The Real Implementation (Google tokeninfo endpoint)

/// Payload returned by Google's tokeninfo endpoint for a valid ID token.
#[derive(Deserialize)]
struct TokenInfo {
    aud: String,
    sub: String,
    email: String,
    #[serde(default)]
    given_name: String,
    #[serde(default)]
    family_name: String,
}

/// HttpGoogleVerifier
///
/// Delegates verification to Google's `tokeninfo` endpoint, which validates the
/// token's signature and expiry server-side; the audience is checked locally
/// against the configured client id so a token minted for another application
/// is rejected.
pub struct HttpGoogleVerifier {
    client: reqwest::Client,
    client_id: String,
}

impl HttpGoogleVerifier {
    pub fn new(client_id: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            client_id: client_id.to_string(),
        }
    }
}

#[async_trait]
impl GoogleTokenVerifier for HttpGoogleVerifier {
    async fn verify(&self, id_token: &str) -> Result<GoogleClaims, ApiError> {
        let response = self
            .client
            .get("https://oauth2.googleapis.com/tokeninfo")
            .query(&[("id_token", id_token)])
            .send()
            .await
            .map_err(|_| ApiError::Authentication("google token verification failed"))?;

        if !response.status().is_success() {
            return Err(ApiError::Authentication("google token was rejected"));
        }

        let info = response
            .json::<TokenInfo>()
            .await
            .map_err(|_| ApiError::Authentication("google token payload was not found"))?;

        if info.aud != self.client_id {
            return Err(ApiError::Authentication(
                "google token was issued for another client",
            ));
        }

        Ok(GoogleClaims {
            sub: info.sub,
            email: info.email,
            given_name: info.given_name,
            family_name: info.family_name,
        })
    }
}

// 3. The Mock Implementation (For Tests)

/// MockGoogleVerifier
///
/// Returns preset claims for any token, or a verification failure when
/// constructed failing.
pub struct MockGoogleVerifier {
    pub claims: Option<GoogleClaims>,
}

impl MockGoogleVerifier {
    pub fn new(claims: GoogleClaims) -> Self {
        Self {
            claims: Some(claims),
        }
    }

    pub fn new_failing() -> Self {
        Self { claims: None }
    }
}

#[async_trait]
impl GoogleTokenVerifier for MockGoogleVerifier {
    async fn verify(&self, _id_token: &str) -> Result<GoogleClaims, ApiError> {
        self.claims
            .clone()
            .ok_or(ApiError::Authentication("google token was rejected"))
    }
}

/// GoogleState
///
/// The concrete type used to share the verifier across the application state.
pub type GoogleState = Arc<dyn GoogleTokenVerifier>;

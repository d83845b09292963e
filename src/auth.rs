use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};

use crate::{
    config::AppConfig,
    error::ApiError,
    models::{Account, Session},
    repository::RepositoryState,
    sessions,
};

/// AuthSession Extractor Result
///
/// The resolved identity of an authenticated request: the session row the
/// bearer token matched and the owning account with its password cleared.
/// Handlers use this struct to identify the caller before any permission check.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub session: Session,
    pub account: Account,
}

/// AuthSession Extractor Implementation
///
/// Implements Axum's FromRequestParts trait, making AuthSession usable as a
/// function argument in any authenticated handler. This keeps authentication
/// (extractor) cleanly separated from business logic (the handler).
///
/// The process:
/// 1. Dependency Resolution: Repository and AppConfig from the application state.
/// 2. Token Extraction: the `authorization` header carries the raw session
///    token, not a signed structure and not a "Bearer" scheme.
/// 3. Token Confirmation: the session manager resolves the token against the
///    store, enforcing the TTL and the existence of the owning account.
///
/// Rejection: an Authentication error (401) on any failure.
impl<S> FromRequestParts<S> for AuthSession
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let repo = RepositoryState::from_ref(state);
        let config = AppConfig::from_ref(state);

        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(ApiError::Authentication("no token given"))?;

        let (session, account) =
            sessions::confirm_token(&repo, token, config.session_ttl_days).await?;

        Ok(AuthSession { session, account })
    }
}

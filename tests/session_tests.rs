use chrono::{Duration, Utc};
use std::sync::Arc;
use tenant_cms::{
    models::{AuthMethod, AuthenticateRequest, RegisterRequest, Session},
    repository::{MemoryRepository, RepositoryState},
    sessions::{
        self, Credentials, GoogleClaims, activate_account, authenticate, confirm_token,
        google_authenticate, register_account,
    },
    error::ApiError,
};
use uuid::Uuid;

const TTL_DAYS: i64 = 30;

// --- Test Utilities ---

fn repo() -> RepositoryState {
    Arc::new(MemoryRepository::new())
}

fn register_request(email: &str, username: &str, password: &str) -> RegisterRequest {
    RegisterRequest {
        email: email.to_string(),
        username: username.to_string(),
        password: password.to_string(),
        fullname: None,
        role: None,
        applications: None,
    }
}

/// Registers and activates an account, returning its activation code flow result.
async fn registered_active_account(
    repo: &RepositoryState,
    email: &str,
    username: &str,
    password: &str,
) -> tenant_cms::models::Account {
    let account = register_account(repo, register_request(email, username, password))
        .await
        .expect("registration failed");
    let code = account.activation_code.clone().expect("no activation code");
    activate_account(repo, &code).await.expect("activation failed")
}

fn email_credentials(email: &str, password: &str) -> Credentials {
    Credentials::Email {
        email: email.to_string(),
        password: password.to_string(),
    }
}

// --- Registration & Activation ---

#[tokio::test]
async fn register_creates_inactive_account_with_hashed_password_and_code() {
    let repo = repo();
    let account = register_account(&repo, register_request("a@x.com", "alice", "p1"))
        .await
        .unwrap();

    assert!(!account.active);
    assert_eq!(account.role, "none");
    let hash = account.password.as_deref().expect("password hash missing");
    assert_ne!(hash, "p1");
    assert!(hash.starts_with("$argon2"));
    assert_eq!(account.activation_code.as_ref().unwrap().len(), 16);
}

#[tokio::test]
async fn register_rejects_empty_password() {
    let repo = repo();
    let result = register_account(&repo, register_request("a@x.com", "alice", "")).await;
    assert!(matches!(result, Err(ApiError::Validation(_))));
}

#[tokio::test]
async fn activation_is_idempotent() {
    let repo = repo();
    let account = register_account(&repo, register_request("a@x.com", "alice", "p1"))
        .await
        .unwrap();
    let code = account.activation_code.clone().unwrap();

    let first = activate_account(&repo, &code).await.unwrap();
    let second = activate_account(&repo, &code).await.unwrap();

    assert!(first.active);
    assert!(second.active);
    assert_eq!(first.id, second.id);
}

#[tokio::test]
async fn activation_with_unknown_code_is_not_found() {
    let repo = repo();
    let result = activate_account(&repo, "nope").await;
    assert!(matches!(result, Err(ApiError::NotFound(_))));
}

// --- Local Authentication ---

#[tokio::test]
async fn inactive_account_cannot_authenticate_even_with_correct_password() {
    let repo = repo();
    register_account(&repo, register_request("a@x.com", "alice", "p1"))
        .await
        .unwrap();

    let result = authenticate(&repo, email_credentials("a@x.com", "p1")).await;
    assert!(matches!(result, Err(ApiError::Authentication(_))));
}

#[tokio::test]
async fn registration_activation_authentication_scenario() {
    let repo = repo();
    let account = registered_active_account(&repo, "a@x.com", "alice", "p1").await;
    assert!(account.active);

    // Correct password issues a session tagged with the email method.
    let (session, returned) = authenticate(&repo, email_credentials("a@x.com", "p1"))
        .await
        .unwrap();
    assert_eq!(session.account_id, account.id);
    assert_eq!(session.method, AuthMethod::Email);
    assert_eq!(session.token.len(), 64);
    assert!(returned.password.is_none(), "password must be masked");

    // Wrong password fails with an authentication error.
    let result = authenticate(&repo, email_credentials("a@x.com", "wrong")).await;
    assert!(matches!(result, Err(ApiError::Authentication(_))));
}

#[tokio::test]
async fn username_and_application_methods_are_tagged() {
    let repo = repo();
    let account = register_account(
        &repo,
        RegisterRequest {
            email: "a@x.com".to_string(),
            username: "alice".to_string(),
            password: "p1".to_string(),
            fullname: None,
            role: None,
            applications: Some(vec!["deploy-bot".to_string()]),
        },
    )
    .await
    .unwrap();
    let code = account.activation_code.clone().unwrap();
    activate_account(&repo, &code).await.unwrap();

    let (session, _) = authenticate(
        &repo,
        Credentials::Username {
            username: "alice".to_string(),
            password: "p1".to_string(),
        },
    )
    .await
    .unwrap();
    assert_eq!(session.method, AuthMethod::Username);

    let (session, _) = authenticate(
        &repo,
        Credentials::Application {
            application: "deploy-bot".to_string(),
            password: "p1".to_string(),
        },
    )
    .await
    .unwrap();
    assert_eq!(session.method, AuthMethod::Application);
}

#[tokio::test]
async fn application_method_requires_active_account() {
    let repo = repo();
    // Registered but never activated.
    register_account(
        &repo,
        RegisterRequest {
            email: "a@x.com".to_string(),
            username: "alice".to_string(),
            password: "p1".to_string(),
            fullname: None,
            role: None,
            applications: Some(vec!["deploy-bot".to_string()]),
        },
    )
    .await
    .unwrap();

    let result = authenticate(
        &repo,
        Credentials::Application {
            application: "deploy-bot".to_string(),
            password: "p1".to_string(),
        },
    )
    .await;
    assert!(matches!(result, Err(ApiError::Authentication(_))));
}

#[tokio::test]
async fn unknown_account_fails_before_password_check() {
    let repo = repo();
    let result = authenticate(&repo, email_credentials("ghost@x.com", "p1")).await;
    assert!(matches!(result, Err(ApiError::Authentication(_))));
}

#[tokio::test]
async fn ambiguous_or_empty_payload_is_rejected() {
    let both = AuthenticateRequest {
        email: Some("a@x.com".to_string()),
        username: Some("alice".to_string()),
        application: None,
        password: "p1".to_string(),
    };
    assert!(matches!(
        Credentials::try_from(both),
        Err(ApiError::Validation(_))
    ));

    let none = AuthenticateRequest {
        email: None,
        username: None,
        application: None,
        password: "p1".to_string(),
    };
    assert!(matches!(
        Credentials::try_from(none),
        Err(ApiError::Validation(_))
    ));
}

// --- Token Confirmation ---

#[tokio::test]
async fn confirm_token_round_trips_to_the_same_account() {
    let repo = repo();
    let account = registered_active_account(&repo, "a@x.com", "alice", "p1").await;
    let (issued, _) = authenticate(&repo, email_credentials("a@x.com", "p1"))
        .await
        .unwrap();

    let (session, returned) = confirm_token(&repo, &issued.token, TTL_DAYS).await.unwrap();
    assert_eq!(session.token, issued.token);
    assert_eq!(returned.id, account.id);
    assert!(returned.password.is_none(), "password must be masked");
}

#[tokio::test]
async fn confirm_token_rejects_missing_and_unknown_tokens() {
    let repo = repo();
    assert!(matches!(
        confirm_token(&repo, "", TTL_DAYS).await,
        Err(ApiError::Authentication("no token given"))
    ));
    assert!(matches!(
        confirm_token(&repo, "deadbeef", TTL_DAYS).await,
        Err(ApiError::Authentication("session not found"))
    ));
}

#[tokio::test]
async fn confirm_token_rejects_expired_sessions() {
    let repo = repo();
    let account = registered_active_account(&repo, "a@x.com", "alice", "p1").await;

    // A session issued 31 days ago with a 30 day TTL.
    let stale = Session {
        id: Uuid::new_v4(),
        token: "t".repeat(64),
        account_id: account.id,
        method: AuthMethod::Email,
        created_at: Utc::now() - Duration::days(31),
        updated_at: Utc::now() - Duration::days(31),
    };
    repo.create_session(stale.clone()).await.unwrap();

    assert!(matches!(
        confirm_token(&repo, &stale.token, TTL_DAYS).await,
        Err(ApiError::Authentication("session expired"))
    ));
}

#[tokio::test]
async fn confirm_token_rejects_dangling_account_reference() {
    let repo = repo();
    let orphan = Session {
        id: Uuid::new_v4(),
        token: "o".repeat(64),
        account_id: Uuid::new_v4(),
        method: AuthMethod::Email,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    };
    repo.create_session(orphan.clone()).await.unwrap();

    assert!(matches!(
        confirm_token(&repo, &orphan.token, TTL_DAYS).await,
        Err(ApiError::Authentication("account not found"))
    ));
}

// --- Federated Authentication ---

fn google_claims(sub: &str, email: &str) -> GoogleClaims {
    GoogleClaims {
        sub: sub.to_string(),
        email: email.to_string(),
        given_name: "Ada".to_string(),
        family_name: "Lovelace".to_string(),
    }
}

#[tokio::test]
async fn google_authenticate_provisions_a_new_active_passwordless_account() {
    let repo = repo();
    let (session, account) = google_authenticate(&repo, google_claims("sub-1", "ada@x.com"))
        .await
        .unwrap();

    assert_eq!(session.method, AuthMethod::Google);
    assert_eq!(account.email, "ada@x.com");
    assert_eq!(account.username, "Ada Lovelace");
    assert!(account.active);
    assert!(account.password.is_none());
    assert_eq!(account.source.as_deref(), Some("google"));
    assert_eq!(account.source_sub.as_deref(), Some("sub-1"));

    // The same assertion resolves to the same account next time.
    let (_, again) = google_authenticate(&repo, google_claims("sub-1", "ada@x.com"))
        .await
        .unwrap();
    assert_eq!(again.id, account.id);
}

#[tokio::test]
async fn google_authenticate_cannot_take_over_a_password_account() {
    let repo = repo();
    registered_active_account(&repo, "a@x.com", "alice", "p1").await;

    let result = google_authenticate(&repo, google_claims("sub-1", "a@x.com")).await;
    assert!(matches!(
        result,
        Err(ApiError::Authentication("not a google-linked account"))
    ));
}

#[tokio::test]
async fn google_authenticate_rejects_a_mismatched_subject() {
    let repo = repo();
    google_authenticate(&repo, google_claims("sub-1", "ada@x.com"))
        .await
        .unwrap();

    let result = google_authenticate(&repo, google_claims("sub-2", "ada@x.com")).await;
    assert!(matches!(result, Err(ApiError::Authentication(_))));
}

#[tokio::test]
async fn federated_account_cannot_authenticate_with_a_password() {
    let repo = repo();
    google_authenticate(&repo, google_claims("sub-1", "ada@x.com"))
        .await
        .unwrap();

    let result = sessions::authenticate(&repo, email_credentials("ada@x.com", "anything")).await;
    assert!(matches!(
        result,
        Err(ApiError::Authentication("bad credentials"))
    ));
}

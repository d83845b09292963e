use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::{
    crypto,
    error::ApiError,
    models::{Account, AuthMethod, AuthenticateRequest, RegisterRequest, Session},
    repository::RepositoryState,
};

/// Credentials
///
/// The closed set of local authentication methods. The wire payload
/// `{email?, username?, application?, password}` must name exactly one
/// identifying field; anything else is rejected before a single store lookup
/// happens.
#[derive(Debug, Clone)]
pub enum Credentials {
    Email { email: String, password: String },
    Username { username: String, password: String },
    Application { application: String, password: String },
}

impl TryFrom<AuthenticateRequest> for Credentials {
    type Error = ApiError;

    fn try_from(req: AuthenticateRequest) -> Result<Self, Self::Error> {
        let password = req.password;
        match (req.email, req.username, req.application) {
            (Some(email), None, None) => Ok(Credentials::Email { email, password }),
            (None, Some(username), None) => Ok(Credentials::Username { username, password }),
            (None, None, Some(application)) => Ok(Credentials::Application {
                application,
                password,
            }),
            _ => Err(ApiError::Validation(
                "exactly one of email, username or application must be provided".to_string(),
            )),
        }
    }
}

/// GoogleClaims
///
/// The externally verified identity assertion handed to the federated path.
/// Signature and audience verification happen in the verifier collaborator,
/// never here.
#[derive(Debug, Clone)]
pub struct GoogleClaims {
    pub sub: String,
    pub email: String,
    pub given_name: String,
    pub family_name: String,
}

fn new_session(account_id: Uuid, method: AuthMethod) -> Session {
    let now = Utc::now();
    Session {
        id: Uuid::new_v4(),
        token: crypto::random_token(crypto::SESSION_TOKEN_LEN),
        account_id,
        method,
        created_at: now,
        updated_at: now,
    }
}

/// authenticate
///
/// Turns local credentials into a session. The account lookup is selected by
/// the credentials variant and always requires `active == true`; a deactivated
/// account loses the email, username and application paths alike.
///
/// On success the new session is persisted tagged with the method used, and
/// returned together with the masked account.
pub async fn authenticate(
    repo: &RepositoryState,
    credentials: Credentials,
) -> Result<(Session, Account), ApiError> {
    let (account, method, password) = match credentials {
        Credentials::Email { email, password } => (
            repo.account_by_email(&email, true).await?,
            AuthMethod::Email,
            password,
        ),
        Credentials::Username { username, password } => (
            repo.account_by_username(&username, true).await?,
            AuthMethod::Username,
            password,
        ),
        Credentials::Application {
            application,
            password,
        } => (
            repo.account_by_application(&application, true).await?,
            AuthMethod::Application,
            password,
        ),
    };

    let account = account.ok_or(ApiError::Authentication("account not found"))?;

    // A federated-only account has no hash at all; that is a credential
    // failure, not a server error.
    let hash = account
        .password
        .as_deref()
        .ok_or(ApiError::Authentication("bad credentials"))?;
    if !crypto::verify_password(&password, hash) {
        return Err(ApiError::Authentication("bad credentials"));
    }

    let session = repo.create_session(new_session(account.id, method)).await?;
    Ok((session, account.masked()))
}

/// confirm_token
///
/// Resolves a bearer token back into `(session, account)`. This is the single
/// authorization entry point every protected route must pass before anything
/// else; the returned account always has its password cleared.
pub async fn confirm_token(
    repo: &RepositoryState,
    token: &str,
    ttl_days: i64,
) -> Result<(Session, Account), ApiError> {
    if token.is_empty() {
        return Err(ApiError::Authentication("no token given"));
    }

    let session = repo
        .session_by_token(token)
        .await?
        .ok_or(ApiError::Authentication("session not found"))?;

    if Utc::now() - session.created_at > Duration::days(ttl_days) {
        return Err(ApiError::Authentication("session expired"));
    }

    // The account may have been deleted since the session was issued; a
    // dangling reference is an authentication failure, not corruption.
    let account = repo
        .account_by_id(session.account_id)
        .await?
        .ok_or(ApiError::Authentication("account not found"))?;

    Ok((session, account.masked()))
}

/// google_authenticate
///
/// Issues a session from a verified federation assertion. An unknown email
/// provisions a fresh, already-active, passwordless account; a known email must
/// match the asserted subject exactly, so a federated login can never silently
/// take over a password-based account.
pub async fn google_authenticate(
    repo: &RepositoryState,
    claims: GoogleClaims,
) -> Result<(Session, Account), ApiError> {
    let account = match repo.account_by_email(&claims.email, false).await? {
        Some(account) => account,
        None => {
            let now = Utc::now();
            repo.create_account(Account {
                id: Uuid::new_v4(),
                email: claims.email.clone(),
                username: format!("{} {}", claims.given_name, claims.family_name),
                password: None,
                fullname: Some(format!("{} {}", claims.given_name, claims.family_name)),
                role: "none".to_string(),
                applications: Vec::new(),
                active: true,
                activation_code: None,
                recovery_code: None,
                source: Some("google".to_string()),
                source_sub: Some(claims.sub.clone()),
                created_at: now,
                updated_at: now,
            })
            .await?
        }
    };

    if account.source.as_deref() != Some("google")
        || account.source_sub.as_deref() != Some(claims.sub.as_str())
    {
        return Err(ApiError::Authentication("not a google-linked account"));
    }

    let session = repo
        .create_session(new_session(account.id, AuthMethod::Google))
        .await?;
    Ok((session, account.masked()))
}

/// register_account
///
/// Creates an inactive local account: the password is hashed, a one-time
/// activation code is generated, and the role defaults to "none". The caller is
/// responsible for delivering the activation link.
pub async fn register_account(
    repo: &RepositoryState,
    req: RegisterRequest,
) -> Result<Account, ApiError> {
    if req.email.is_empty() || req.username.is_empty() {
        return Err(ApiError::Validation(
            "email and username are required".to_string(),
        ));
    }
    if req.password.is_empty() {
        return Err(ApiError::Validation("password was empty".to_string()));
    }

    let now = Utc::now();
    let account = Account {
        id: Uuid::new_v4(),
        email: req.email,
        username: req.username,
        password: Some(crypto::hash_password(&req.password)?),
        fullname: req.fullname,
        role: req.role.unwrap_or_else(|| "none".to_string()),
        applications: req.applications.unwrap_or_default(),
        active: false,
        activation_code: Some(crypto::random_token(crypto::ACTIVATION_CODE_LEN)),
        recovery_code: None,
        source: None,
        source_sub: None,
        created_at: now,
        updated_at: now,
    };
    repo.create_account(account).await
}

/// activate_account
///
/// Flips `active` on activation-code match and returns the masked account.
/// Idempotent: the code stays on the account, so re-activating matches the same
/// row and leaves it active.
pub async fn activate_account(repo: &RepositoryState, code: &str) -> Result<Account, ApiError> {
    let account = repo
        .activate_account(code)
        .await?
        .ok_or(ApiError::NotFound("account with the activation code"))?;
    Ok(account.masked())
}

use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Defines endpoints that are **unauthenticated** and accessible to any client.
/// These routes cover the authentication gateway (which by nature runs before a
/// session exists) and read-only access to published content.
///
/// Security Mandate:
/// Content handlers in this module must only release published records; the
/// repository queries enforce `publish = true` so an unpublished draft can
/// never leak to an anonymous caller.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Unauthenticated endpoint used for monitoring and load balancer checks.
        .route("/health", get(|| async { "ok" }))
        // --- Authentication Gateway ---
        // POST /authentication/authenticate
        // Exchanges {email|username|application, password} for a session token.
        .route(
            "/authentication/authenticate",
            post(handlers::authenticate),
        )
        // POST /authentication/google
        // Exchanges an externally verified Google ID token for a session.
        .route("/authentication/google", post(handlers::google_authenticate))
        // POST /authentication/confirm
        // Resolves the raw bearer token in the authorization header back to
        // (session, account). The single entry point protected routes rely on.
        .route("/authentication/confirm", post(handlers::confirm))
        // POST /authentication/register
        // Creates an inactive account and emails its activation link.
        .route("/authentication/register", post(handlers::register))
        // GET /authentication/activate/{code}
        // Flips the account active on activation-code match. Idempotent.
        .route(
            "/authentication/activate/{code}",
            get(handlers::activate),
        )
        // --- Published Content ---
        // GET /articles/ - published articles only.
        .route("/articles/", get(handlers::get_public_articles))
        // GET /articles/{id} - published detail view, bumps the read counter.
        .route("/articles/{id}", get(handlers::get_article))
        // GET /articles/domain/{domain} - published articles for one domain.
        .route(
            "/articles/domain/{domain}",
            get(handlers::get_articles_by_domain),
        )
        // GET /pages/{id}, /pages/link/{link}, /pages/domain/{domain}
        .route("/pages/{id}", get(handlers::get_page))
        .route("/pages/link/{link}", get(handlers::get_page_by_link))
        .route("/pages/domain/{domain}", get(handlers::get_pages_by_domain))
        // POST /comments/
        // Anonymous comments are allowed; a supplied session token stamps the
        // comment with its account instead.
        .route("/comments/", post(handlers::create_comment))
        // GET /comments/article/{id} - public comments of an article.
        .route(
            "/comments/article/{id}",
            get(handlers::get_comments_by_article),
        )
}

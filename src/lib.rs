use axum::{
    Router,
    extract::{FromRef, Request},
    http::HeaderName,
    middleware::{self, Next},
    response::Response,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Core access-control components.
pub mod auth;
pub mod config;
pub mod crypto;
pub mod error;
pub mod groups;
pub mod permissions;
pub mod sessions;

// Persistence, collaborators and the HTTP surface.
pub mod google;
pub mod handlers;
pub mod mailer;
pub mod models;
pub mod repository;

// Module for routing segregation (Public, Authenticated).
pub mod routes;
use auth::AuthSession;
use routes::{authenticated, public};

// --- Public Re-exports ---

// Makes core state types easily accessible to the main application entry point (main.rs).
pub use config::AppConfig;
pub use error::ApiError;
pub use google::{GoogleState, HttpGoogleVerifier, MockGoogleVerifier};
pub use mailer::{MailerState, MockMailer, SmtpMailer};
pub use repository::{MemoryRepository, PostgresRepository, RepositoryState};

/// ApiDoc
///
/// Auto-generates the OpenAPI documentation (Swagger JSON) for the application.
/// It aggregates all API paths and data schemas decorated with the
/// `#[utoipa::path]` and `#[derive(utoipa::ToSchema)]` macros.
/// The resulting JSON is served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::authenticate, handlers::google_authenticate, handlers::confirm,
        handlers::register, handlers::activate,
        handlers::create_group, handlers::update_group, handlers::get_groups,
        handlers::get_group, handlers::delete_group, handlers::get_group_members,
        handlers::add_member, handlers::update_member, handlers::remove_member,
        handlers::get_members_by_group,
        handlers::create_article, handlers::update_article, handlers::publish_article,
        handlers::unpublish_article, handlers::delete_article, handlers::get_public_articles,
        handlers::get_article, handlers::get_articles_by_group, handlers::get_articles_by_domain,
        handlers::create_page, handlers::update_page, handlers::delete_page,
        handlers::get_page, handlers::get_page_by_link, handlers::get_pages_by_domain,
        handlers::get_pages_by_group,
        handlers::create_comment, handlers::update_comment, handlers::get_comments_by_article
    ),
    components(
        schemas(
            models::Account, models::Session, models::Group, models::Member,
            models::Article, models::Page, models::Comment, models::AuthMethod,
            models::AuthenticateRequest, models::RegisterRequest,
            models::CreateGroupRequest, models::UpdateGroupRequest,
            models::AddMemberRequest, models::UpdateMemberRequest, models::RemoveMemberRequest,
            models::CreateArticleRequest, models::UpdateArticleRequest,
            models::PublishArticleRequest, models::CreatePageRequest, models::UpdatePageRequest,
            models::CreateCommentRequest, models::UpdateCommentRequest,
            models::MessageResponse, models::AuthResponse, models::AccountResponse,
            models::GroupResponse, models::GroupsResponse, models::MemberResponse,
            models::MembersResponse, models::ArticleResponse, models::ArticlesResponse,
            models::PageResponse, models::PagesResponse, models::CommentResponse,
            models::CommentsResponse,
        )
    ),
    tags(
        (name = "tenant-cms", description = "Multi-tenant CMS backend API")
    )
)]
struct ApiDoc;

/// AppState
///
/// Implements the **Unified State Pattern**: the single, thread-safe, immutable
/// container holding all essential application services and configuration,
/// shared across all incoming requests.
#[derive(Clone)]
pub struct AppState {
    /// Repository Layer: the four record collections plus the content store.
    pub repo: RepositoryState,
    /// Mail collaborator for activation links.
    pub mailer: MailerState,
    /// Federated identity verifier (Google ID tokens).
    pub google: GoogleState,
    /// Configuration: the loaded, immutable environment configuration.
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

// These implementations allow handlers and extractors to selectively pull
// components from the shared AppState.

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for MailerState {
    fn from_ref(app_state: &AppState) -> MailerState {
        app_state.mailer.clone()
    }
}

impl FromRef<AppState> for GoogleState {
    fn from_ref(app_state: &AppState) -> GoogleState {
        app_state.google.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// session_middleware
///
/// Enforces authentication for the `authenticated_routes`.
///
/// *Mechanism*: It attempts to extract `AuthSession` from the request. Since
/// `AuthSession` implements `FromRequestParts`, if token confirmation fails the
/// extractor immediately rejects the request with a 401, preventing execution
/// of the handler. If successful, the request proceeds and the handler
/// re-extracts the identity for its permission checks.
async fn session_middleware(_auth: AuthSession, request: Request, next: Next) -> Response {
    next.run(request).await
}

/// create_router
///
/// Assembles the application's entire routing structure, applies global and
/// scoped middleware, and registers the application state.
pub fn create_router(state: AppState) -> Router {
    // 1. CORS Configuration
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    // Header name constant for Request Correlation.
    let x_request_id = HeaderName::from_static("x-request-id");

    // 2. Base Router Assembly
    let base_router = Router::new()
        // Documentation: Serve the auto-generated Swagger UI.
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Public Routes: No middleware applied.
        .merge(public::public_routes())
        // Authenticated Routes: Protected by the session middleware.
        .merge(
            authenticated::authenticated_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                session_middleware,
            )),
        )
        // Apply the Unified State to all routes.
        .with_state(state);

    // 3. Observability and Correlation Layers (Applied outermost/first)
    base_router
        .layer(
            ServiceBuilder::new()
                // 3a. Request ID Generation: a unique UUID for every incoming request.
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                // 3b. Request Tracing: wraps the request/response lifecycle in a
                // tracing span carrying the generated request ID.
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                // 3c. Request ID Propagation back to the client.
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        // 4. CORS Layer
        .layer(cors)
}

/// trace_span_logger
///
/// Helper used by `TraceLayer` to customize span creation: the `x-request-id`
/// header (if present) joins the HTTP method and URI in the structured logging
/// metadata, so every log line of a single request correlates by a unique ID.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}

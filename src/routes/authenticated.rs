use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{delete, get, post, put},
};

/// Authenticated Router Module
///
/// Defines the routes accessible only with a valid session token. The session
/// middleware on the layer above rejects anonymous requests outright; each
/// handler then re-extracts `AuthSession` and runs the permission check its
/// operation requires (WRITE for create/update, DELETE for removal, READ for
/// group-scoped listings).
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // --- Groups ---
        // POST /group/  - create a group; the caller becomes its owning member
        //                 with full rights, atomically with the group itself.
        // PUT  /group/  - update; WRITE-gated with the soft-failure policy.
        .route(
            "/group/",
            post(handlers::create_group).put(handlers::update_group),
        )
        // GET /groups/ - list all groups.
        .route("/groups/", get(handlers::get_groups))
        // GET/DELETE /group/{id} - detail view and DELETE-gated removal.
        .route(
            "/group/{id}",
            get(handlers::get_group).delete(handlers::delete_group),
        )
        // GET /group/{id}/members - READ-gated membership listing.
        .route("/group/{id}/members", get(handlers::get_group_members))
        // --- Members ---
        // POST/PUT/DELETE /members/ - grant, change and revoke rights inside a
        // group. WRITE gates grants and changes, DELETE gates revocation.
        .route(
            "/members/",
            post(handlers::add_member)
                .put(handlers::update_member)
                .delete(handlers::remove_member),
        )
        // GET /members/group/{id} - READ-gated membership listing.
        .route("/members/group/{id}", get(handlers::get_members_by_group))
        // --- Articles ---
        // POST /articles/ - save a draft into the caller's effective group.
        // PUT  /articles/ - update; WRITE-gated on the article's group.
        .route(
            "/articles/",
            post(handlers::create_article).put(handlers::update_article),
        )
        // PUT /articles/publish|unpublish - visibility toggles, WRITE-gated.
        .route("/articles/publish", put(handlers::publish_article))
        .route("/articles/unpublish", put(handlers::unpublish_article))
        // DELETE /articles/{id} - DELETE-gated removal.
        .route("/articles/{id}", delete(handlers::delete_article))
        // GET /articles/group/{id} - READ-gated listing including drafts.
        .route("/articles/group/{id}", get(handlers::get_articles_by_group))
        // --- Pages ---
        .route(
            "/pages/",
            post(handlers::create_page).put(handlers::update_page),
        )
        .route("/pages/{id}", delete(handlers::delete_page))
        .route("/pages/group/{id}", get(handlers::get_pages_by_group))
        // --- Comments ---
        // PUT /comments/ - author or group-moderator edit.
        .route("/comments/", put(handlers::update_comment))
}

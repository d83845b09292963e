use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use serde_json::{Value, json};
use std::sync::Arc;
use tenant_cms::{
    AppConfig, AppState, MemoryRepository, MockGoogleVerifier, MockMailer, create_router,
    sessions::GoogleClaims,
};
use tower::util::ServiceExt;

// --- Test Utilities ---

fn test_app() -> Router {
    test_app_with(AppConfig::default(), MockMailer::new(), MockGoogleVerifier::new_failing())
}

fn test_app_with(config: AppConfig, mailer: MockMailer, google: MockGoogleVerifier) -> Router {
    let state = AppState {
        repo: Arc::new(MemoryRepository::new()),
        mailer: Arc::new(mailer),
        google: Arc::new(google),
        config,
    };
    create_router(state)
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn authed_json_request(method: &str, uri: &str, token: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::AUTHORIZATION, token)
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body read failed");
    serde_json::from_slice(&bytes).expect("body was not json")
}

/// Drives the full registration flow over HTTP and returns a session token for
/// the new account.
async fn registered_session(app: &Router, email: &str, username: &str, password: &str) -> String {
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/authentication/register",
            json!({ "email": email, "username": username, "password": password }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let code = body["account"]["activation_code"]
        .as_str()
        .expect("activation code missing")
        .to_string();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/authentication/activate/{code}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/authentication/authenticate",
            json!({ "email": email, "password": password }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["session"]["method"], "email");
    body["session"]["token"]
        .as_str()
        .expect("token missing")
        .to_string()
}

async fn created_group(app: &Router, token: &str, name: &str) -> String {
    let response = app
        .clone()
        .oneshot(authed_json_request(
            "POST",
            "/group/",
            token,
            json!({
                "name": name,
                "registration_code": "1234567-8",
                "address": "Example Street 1",
                "domains": "example.com"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["members"].as_array().unwrap().len(), 1);
    body["group"]["id"].as_str().unwrap().to_string()
}

// --- Tests ---

#[tokio::test]
async fn health_check_is_public() {
    let response = test_app()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn register_activate_authenticate_confirm_flow() {
    let app = test_app();
    let token = registered_session(&app, "a@x.com", "alice", "p1").await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/authentication/confirm")
                .header(header::AUTHORIZATION, token.as_str())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["account"]["email"], "a@x.com");
    assert!(body["account"].get("password").is_none(), "password leaked");
}

#[tokio::test]
async fn authenticate_before_activation_is_unauthorized() {
    let app = test_app();
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/authentication/register",
            json!({ "email": "a@x.com", "username": "alice", "password": "p1" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/authentication/authenticate",
            json!({ "email": "a@x.com", "password": "p1" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn ambiguous_credentials_are_a_bad_request() {
    let app = test_app();
    let response = app
        .oneshot(json_request(
            "POST",
            "/authentication/authenticate",
            json!({ "email": "a@x.com", "username": "alice", "password": "p1" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn register_surfaces_mail_outage() {
    let app = test_app_with(
        AppConfig::default(),
        MockMailer::new_failing(),
        MockGoogleVerifier::new_failing(),
    );
    let response = app
        .oneshot(json_request(
            "POST",
            "/authentication/register",
            json!({ "email": "a@x.com", "username": "alice", "password": "p1" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn protected_routes_reject_anonymous_and_bogus_tokens() {
    let app = test_app();

    let response = app
        .clone()
        .oneshot(json_request("POST", "/group/", json!({
            "name": "G", "registration_code": "c", "address": "a", "domains": "d"
        })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .clone()
        .oneshot(authed_json_request("POST", "/group/", "bogus-token", json!({
            "name": "G", "registration_code": "c", "address": "a", "domains": "d"
        })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn group_lifecycle_over_http() {
    let app = test_app();
    let owner_token = registered_session(&app, "o@x.com", "owner", "p1").await;
    let stranger_token = registered_session(&app, "s@x.com", "stranger", "p2").await;

    let group_id = created_group(&app, &owner_token, "Tenant").await;

    // A stranger's update hits the soft-failure policy: 400, not 403.
    let response = app
        .clone()
        .oneshot(authed_json_request(
            "PUT",
            "/group/",
            &stranger_token,
            json!({ "id": group_id, "name": "Hijacked" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // The owner's update succeeds.
    let response = app
        .clone()
        .oneshot(authed_json_request(
            "PUT",
            "/group/",
            &owner_token,
            json!({ "id": group_id, "name": "Renamed" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["group"]["name"], "Renamed");

    // Member listing is READ-gated.
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/group/{group_id}/members"))
                .header(header::AUTHORIZATION, stranger_token.as_str())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // Deletion by the owner removes the group.
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/group/{group_id}"))
                .header(header::AUTHORIZATION, owner_token.as_str())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/group/{group_id}"))
                .header(header::AUTHORIZATION, owner_token.as_str())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn membership_grants_unlock_gated_mutations() {
    let app = test_app();
    let owner_token = registered_session(&app, "o@x.com", "owner", "p1").await;
    let writer_token = registered_session(&app, "w@x.com", "writer", "p2").await;
    let group_id = created_group(&app, &owner_token, "Tenant").await;

    // The writer can't create an article yet: no membership grants WRITE.
    let response = app
        .clone()
        .oneshot(authed_json_request(
            "POST",
            "/articles/",
            &writer_token,
            json!({ "header": "Hello", "markdown": "# Hello" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // Resolve the writer's account id via confirm, then grant READ | WRITE.
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/authentication/confirm")
                .header(header::AUTHORIZATION, writer_token.as_str())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let writer_id = body_json(response).await["account"]["id"]
        .as_str()
        .unwrap()
        .to_string();

    let response = app
        .clone()
        .oneshot(authed_json_request(
            "POST",
            "/members/",
            &owner_token,
            json!({ "group_id": group_id, "account_id": writer_id, "rights": "READ | WRITE" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // WRITE now unlocks article creation into the effective group.
    let response = app
        .clone()
        .oneshot(authed_json_request(
            "POST",
            "/articles/",
            &writer_token,
            json!({ "header": "Hello", "markdown": "# Hello" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["article"]["group_id"].as_str().unwrap(), group_id);
    let article_id = body["article"]["id"].as_str().unwrap().to_string();

    // DELETE is still missing though.
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/articles/{article_id}"))
                .header(header::AUTHORIZATION, writer_token.as_str())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn unpublished_articles_never_reach_public_routes() {
    let app = test_app();
    let owner_token = registered_session(&app, "o@x.com", "owner", "p1").await;
    created_group(&app, &owner_token, "Tenant").await;

    let response = app
        .clone()
        .oneshot(authed_json_request(
            "POST",
            "/articles/",
            &owner_token,
            json!({ "header": "Draft", "markdown": "wip" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let article_id = body_json(response).await["article"]["id"]
        .as_str()
        .unwrap()
        .to_string();

    // Not in the public listing, and the public detail view is a 404.
    let response = app
        .clone()
        .oneshot(Request::builder().uri("/articles/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let body = body_json(response).await;
    assert!(body["articles"].as_array().unwrap().is_empty());

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/articles/{article_id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // Publishing flips visibility and public reads bump the view counter.
    let response = app
        .clone()
        .oneshot(authed_json_request(
            "PUT",
            "/articles/publish",
            &owner_token,
            json!({ "id": article_id }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/articles/{article_id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["article"]["read"], 1);
}

#[tokio::test]
async fn google_route_reports_unconfigured_client() {
    // Default config has no client id.
    let response = test_app()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/authentication/google")
                .header(header::AUTHORIZATION, "some-google-id-token")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn google_route_provisions_an_account_from_verified_claims() {
    let config = AppConfig {
        google_client_id: Some("client-1".to_string()),
        ..AppConfig::default()
    };
    let verifier = MockGoogleVerifier::new(GoogleClaims {
        sub: "sub-1".to_string(),
        email: "ada@x.com".to_string(),
        given_name: "Ada".to_string(),
        family_name: "Lovelace".to_string(),
    });
    let app = test_app_with(config, MockMailer::new(), verifier);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/authentication/google")
                .header(header::AUTHORIZATION, "verified-elsewhere")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["session"]["method"], "google");
    assert_eq!(body["account"]["username"], "Ada Lovelace");

    // The issued token confirms like any other session token.
    let token = body["session"]["token"].as_str().unwrap().to_string();
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/authentication/confirm")
                .header(header::AUTHORIZATION, token.as_str())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn anonymous_and_authenticated_comments() {
    let app = test_app();
    let owner_token = registered_session(&app, "o@x.com", "owner", "p1").await;
    created_group(&app, &owner_token, "Tenant").await;

    let response = app
        .clone()
        .oneshot(authed_json_request(
            "POST",
            "/articles/",
            &owner_token,
            json!({ "header": "Post", "markdown": "text" }),
        ))
        .await
        .unwrap();
    let article_id = body_json(response).await["article"]["id"]
        .as_str()
        .unwrap()
        .to_string();

    // Anonymous comment: no token, display name only.
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/comments/",
            json!({ "article_id": article_id, "content": "nice", "author_name": "drive-by" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["comment"]["author_kind"], "anonymous");

    // Authenticated comment gets stamped with the account.
    let response = app
        .clone()
        .oneshot(authed_json_request(
            "POST",
            "/comments/",
            &owner_token,
            json!({ "article_id": article_id, "content": "thanks" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["comment"]["author_kind"], "authenticated");
    assert_eq!(body["comment"]["author_name"], "owner");

    // Both are public comments of the article.
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/comments/article/{article_id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["comments"].as_array().unwrap().len(), 2);
}

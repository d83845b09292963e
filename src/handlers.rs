use crate::{
    AppState,
    auth::AuthSession,
    error::ApiError,
    groups,
    models::{
        AccountResponse, AddMemberRequest, Article, ArticleResponse, ArticlesResponse,
        AuthResponse, AuthenticateRequest, Comment, CommentResponse, CommentsResponse,
        CreateArticleRequest, CreateCommentRequest, CreateGroupRequest, CreatePageRequest,
        GroupResponse, GroupsResponse, Member, MemberResponse, MembersResponse, MessageResponse,
        Page, PageResponse, PagesResponse, PublishArticleRequest, RegisterRequest,
        RemoveMemberRequest, UpdateArticleRequest, UpdateCommentRequest, UpdateGroupRequest,
        UpdateMemberRequest, UpdatePageRequest,
    },
    permissions::{self, Permission},
    sessions::{self, Credentials},
};
use axum::{
    Json,
    extract::{Path, State},
    http::{HeaderMap, StatusCode, header},
    response::IntoResponse,
};
use chrono::Utc;
use uuid::Uuid;

fn success() -> String {
    "success".to_string()
}

// --- Authentication Handlers ---

/// authenticate
///
/// [Public Route] Exchanges local credentials for a session. The payload must
/// name exactly one of email, username or application; the account must be
/// active and the password must verify.
#[utoipa::path(
    post,
    path = "/authentication/authenticate",
    request_body = AuthenticateRequest,
    responses(
        (status = 200, description = "Session issued", body = AuthResponse),
        (status = 401, description = "Bad credentials"),
        (status = 400, description = "Ambiguous payload")
    )
)]
pub async fn authenticate(
    State(state): State<AppState>,
    Json(payload): Json<AuthenticateRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let credentials = Credentials::try_from(payload)?;
    let (session, account) = sessions::authenticate(&state.repo, credentials).await?;
    Ok(Json(AuthResponse {
        result: success(),
        session,
        account,
    }))
}

/// google_authenticate
///
/// [Public Route] Exchanges a Google ID token for a session. The token arrives
/// in the `authorization` header and is verified by the external verifier;
/// this handler never inspects the signature itself.
#[utoipa::path(
    post,
    path = "/authentication/google",
    responses(
        (status = 200, description = "Session issued", body = AuthResponse),
        (status = 400, description = "Google authentication not configured"),
        (status = 404, description = "No token payload"),
        (status = 401, description = "Token rejected or account not linked")
    )
)]
pub async fn google_authenticate(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<AuthResponse>, ApiError> {
    if state.config.google_client_id.is_none() {
        return Err(ApiError::Validation(
            "google authentication has not been configured".to_string(),
        ));
    }
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or(ApiError::NotFound("google token payload"))?;

    let claims = state.google.verify(token).await?;
    let (session, account) = sessions::google_authenticate(&state.repo, claims).await?;
    Ok(Json(AuthResponse {
        result: success(),
        session,
        account,
    }))
}

/// confirm
///
/// [Public Route] Resolves the bearer token in the `authorization` header back
/// to `(session, account)`. The extractor performs the whole check, so reaching
/// the handler body means the token was valid.
#[utoipa::path(
    post,
    path = "/authentication/confirm",
    responses(
        (status = 200, description = "Token confirmed", body = AuthResponse),
        (status = 401, description = "Missing, unknown or expired token")
    )
)]
pub async fn confirm(auth: AuthSession) -> Json<AuthResponse> {
    Json(AuthResponse {
        result: success(),
        session: auth.session,
        account: auth.account,
    })
}

/// register
///
/// [Public Route] Creates an inactive account and emails its activation link.
/// Mail delivery failure after creation is surfaced as an error so the caller
/// knows the link never went out.
#[utoipa::path(
    post,
    path = "/authentication/register",
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "Account created", body = AccountResponse),
        (status = 400, description = "Invalid payload"),
        (status = 500, description = "Mail delivery failed")
    )
)]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<Json<AccountResponse>, ApiError> {
    let account = sessions::register_account(&state.repo, payload).await?;

    let code = account
        .activation_code
        .clone()
        .ok_or_else(|| ApiError::Internal("created account has no activation code".to_string()))?;
    state.mailer.send_activation_link(&account.email, &code).await?;

    Ok(Json(AccountResponse {
        result: success(),
        message: "Account created and activation email has been sent.".to_string(),
        account: account.masked(),
    }))
}

/// activate
///
/// [Public Route] Activates the account matching the one-time code. Repeating
/// the call with the same code is harmless: the account simply stays active.
#[utoipa::path(
    get,
    path = "/authentication/activate/{code}",
    params(("code" = String, Path, description = "Activation code")),
    responses(
        (status = 200, description = "Account activated", body = AccountResponse),
        (status = 404, description = "Unknown code")
    )
)]
pub async fn activate(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<AccountResponse>, ApiError> {
    let account = sessions::activate_account(&state.repo, &code).await?;
    Ok(Json(AccountResponse {
        result: success(),
        message: "Account activated.".to_string(),
        account,
    }))
}

// --- Group Handlers ---

/// create_group
///
/// [Authenticated Route] Creates a group; the caller becomes its first member
/// with full rights, atomically with the group itself.
#[utoipa::path(
    post,
    path = "/group/",
    request_body = CreateGroupRequest,
    responses((status = 201, description = "Group created", body = GroupResponse))
)]
pub async fn create_group(
    auth: AuthSession,
    State(state): State<AppState>,
    Json(payload): Json<CreateGroupRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (group, members) = groups::create_group(&state.repo, payload, &auth.account).await?;
    Ok((
        StatusCode::CREATED,
        Json(GroupResponse {
            result: success(),
            message: "Group created".to_string(),
            group,
            members: Some(members),
        }),
    ))
}

/// update_group
///
/// [Authenticated Route] Updates a group when the caller holds WRITE. Missing
/// permission is the soft-failure outcome and maps to 400, distinct from the
/// 401 of a failed token check.
#[utoipa::path(
    put,
    path = "/group/",
    request_body = UpdateGroupRequest,
    responses(
        (status = 200, description = "Group updated", body = GroupResponse),
        (status = 400, description = "No permission or unknown group")
    )
)]
pub async fn update_group(
    auth: AuthSession,
    State(state): State<AppState>,
    Json(payload): Json<UpdateGroupRequest>,
) -> Result<impl IntoResponse, ApiError> {
    match groups::update_group(&state.repo, payload, &auth.account).await? {
        Some(group) => Ok((
            StatusCode::OK,
            Json(GroupResponse {
                result: success(),
                message: "Group updated".to_string(),
                group,
                members: None,
            }),
        )
            .into_response()),
        None => Ok((
            StatusCode::BAD_REQUEST,
            Json(MessageResponse {
                result: "error".to_string(),
                message: "Group update failed.".to_string(),
            }),
        )
            .into_response()),
    }
}

/// get_groups
///
/// [Authenticated Route] Lists all groups. Membership is not required to see a
/// group exists; rights only gate what can be done inside it.
#[utoipa::path(
    get,
    path = "/groups/",
    responses((status = 200, description = "Groups", body = GroupsResponse))
)]
pub async fn get_groups(
    _auth: AuthSession,
    State(state): State<AppState>,
) -> Result<Json<GroupsResponse>, ApiError> {
    let groups = state.repo.groups().await?;
    Ok(Json(GroupsResponse {
        result: success(),
        message: "Groups found".to_string(),
        groups,
    }))
}

/// get_group
///
/// [Authenticated Route] Retrieves a single group by id.
#[utoipa::path(
    get,
    path = "/group/{id}",
    params(("id" = Uuid, Path, description = "Group ID")),
    responses(
        (status = 200, description = "Group", body = GroupResponse),
        (status = 404, description = "Unknown group")
    )
)]
pub async fn get_group(
    _auth: AuthSession,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<GroupResponse>, ApiError> {
    let group = state
        .repo
        .group_by_id(id)
        .await?
        .ok_or(ApiError::NotFound("group"))?;
    Ok(Json(GroupResponse {
        result: success(),
        message: "Group found".to_string(),
        group,
        members: None,
    }))
}

/// delete_group
///
/// [Authenticated Route] Deletes a group when the caller holds DELETE, with the
/// same soft-failure policy as update.
#[utoipa::path(
    delete,
    path = "/group/{id}",
    params(("id" = Uuid, Path, description = "Group ID")),
    responses(
        (status = 200, description = "Group deleted", body = GroupResponse),
        (status = 400, description = "No permission"),
        (status = 404, description = "Unknown group")
    )
)]
pub async fn delete_group(
    auth: AuthSession,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    // Distinguish a missing group (404) from missing permission (400).
    state
        .repo
        .group_by_id(id)
        .await?
        .ok_or(ApiError::NotFound("group"))?;

    match groups::delete_group(&state.repo, id, &auth.account).await? {
        Some(group) => Ok((
            StatusCode::OK,
            Json(GroupResponse {
                result: success(),
                message: "Group deleted".to_string(),
                group,
                members: None,
            }),
        )
            .into_response()),
        None => Ok((
            StatusCode::BAD_REQUEST,
            Json(MessageResponse {
                result: "error".to_string(),
                message: "Group deletion failed.".to_string(),
            }),
        )
            .into_response()),
    }
}

/// get_group_members
///
/// [Authenticated Route] Lists the members of a group. Requires READ within
/// that group; a stranger cannot enumerate who belongs to it.
#[utoipa::path(
    get,
    path = "/group/{id}/members",
    params(("id" = Uuid, Path, description = "Group ID")),
    responses(
        (status = 200, description = "Members", body = MembersResponse),
        (status = 403, description = "No READ permission"),
        (status = 404, description = "Unknown group")
    )
)]
pub async fn get_group_members(
    auth: AuthSession,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<MembersResponse>, ApiError> {
    let group = state
        .repo
        .group_by_id(id)
        .await?
        .ok_or(ApiError::NotFound("group"))?;
    permissions::confirm_group_permission(&state.repo, Permission::Read, group.id, &auth.account)
        .await?;

    let members = state.repo.members_of_group(group.id).await?;
    Ok(Json(MembersResponse {
        result: success(),
        message: "Members were found.".to_string(),
        group: Some(group),
        members,
    }))
}

// --- Member Handlers ---

/// add_member
///
/// [Authenticated Route] Grants an account rights within a group. Requires
/// WRITE on the target group.
#[utoipa::path(
    post,
    path = "/members/",
    request_body = AddMemberRequest,
    responses(
        (status = 200, description = "Member added", body = MemberResponse),
        (status = 403, description = "No WRITE permission"),
        (status = 404, description = "Unknown group or account")
    )
)]
pub async fn add_member(
    auth: AuthSession,
    State(state): State<AppState>,
    Json(payload): Json<AddMemberRequest>,
) -> Result<Json<MemberResponse>, ApiError> {
    let group = state
        .repo
        .group_by_id(payload.group_id)
        .await?
        .ok_or(ApiError::NotFound("group"))?;
    permissions::confirm_group_permission(&state.repo, Permission::Write, group.id, &auth.account)
        .await?;
    state
        .repo
        .account_by_id(payload.account_id)
        .await?
        .ok_or(ApiError::NotFound("account"))?;

    let now = Utc::now();
    let member = state
        .repo
        .add_member(Member {
            id: Uuid::new_v4(),
            group_id: group.id,
            account_id: payload.account_id,
            rights: payload.rights,
            created_at: now,
            updated_at: now,
        })
        .await?;
    Ok(Json(MemberResponse {
        result: success(),
        message: "Member added".to_string(),
        member,
    }))
}

/// update_member
///
/// [Authenticated Route] Replaces a member's rights. Requires WRITE on the
/// group.
#[utoipa::path(
    put,
    path = "/members/",
    request_body = UpdateMemberRequest,
    responses(
        (status = 200, description = "Member updated", body = MemberResponse),
        (status = 403, description = "No WRITE permission"),
        (status = 404, description = "Unknown group or member")
    )
)]
pub async fn update_member(
    auth: AuthSession,
    State(state): State<AppState>,
    Json(payload): Json<UpdateMemberRequest>,
) -> Result<Json<MemberResponse>, ApiError> {
    let group = state
        .repo
        .group_by_id(payload.group_id)
        .await?
        .ok_or(ApiError::NotFound("group"))?;
    permissions::confirm_group_permission(&state.repo, Permission::Write, group.id, &auth.account)
        .await?;

    let member = state
        .repo
        .update_member_rights(group.id, payload.account_id, payload.rights)
        .await?
        .ok_or(ApiError::NotFound("member"))?;
    Ok(Json(MemberResponse {
        result: success(),
        message: "Member updated".to_string(),
        member,
    }))
}

/// remove_member
///
/// [Authenticated Route] Removes an account's membership. Requires DELETE on
/// the group. Once removed, every permission check for that account in the
/// group is false again.
#[utoipa::path(
    delete,
    path = "/members/",
    request_body = RemoveMemberRequest,
    responses(
        (status = 200, description = "Member removed", body = MessageResponse),
        (status = 403, description = "No DELETE permission"),
        (status = 404, description = "Unknown group or member")
    )
)]
pub async fn remove_member(
    auth: AuthSession,
    State(state): State<AppState>,
    Json(payload): Json<RemoveMemberRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let group = state
        .repo
        .group_by_id(payload.group_id)
        .await?
        .ok_or(ApiError::NotFound("group"))?;
    permissions::confirm_group_permission(&state.repo, Permission::Delete, group.id, &auth.account)
        .await?;

    if !state
        .repo
        .remove_member(group.id, payload.account_id)
        .await?
    {
        return Err(ApiError::NotFound("member"));
    }
    Ok(Json(MessageResponse {
        result: success(),
        message: "Member removed".to_string(),
    }))
}

/// get_members_by_group
///
/// [Authenticated Route] Lists members of a group; READ-gated like the group
/// detail listing.
#[utoipa::path(
    get,
    path = "/members/group/{id}",
    params(("id" = Uuid, Path, description = "Group ID")),
    responses(
        (status = 200, description = "Members", body = MembersResponse),
        (status = 403, description = "No READ permission")
    )
)]
pub async fn get_members_by_group(
    auth: AuthSession,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<MembersResponse>, ApiError> {
    let group = state
        .repo
        .group_by_id(id)
        .await?
        .ok_or(ApiError::NotFound("group"))?;
    permissions::confirm_group_permission(&state.repo, Permission::Read, group.id, &auth.account)
        .await?;

    let members = state.repo.members_of_group(group.id).await?;
    Ok(Json(MembersResponse {
        result: success(),
        message: "Members were found.".to_string(),
        group: Some(group),
        members,
    }))
}

// --- Article Handlers ---

/// create_article
///
/// [Authenticated Route] Saves a new, unpublished article into the caller's
/// effective group (the first group granting WRITE).
#[utoipa::path(
    post,
    path = "/articles/",
    request_body = CreateArticleRequest,
    responses(
        (status = 200, description = "Article created", body = ArticleResponse),
        (status = 403, description = "No WRITE permission anywhere")
    )
)]
pub async fn create_article(
    auth: AuthSession,
    State(state): State<AppState>,
    Json(payload): Json<CreateArticleRequest>,
) -> Result<Json<ArticleResponse>, ApiError> {
    let group = permissions::confirm_permission(&state.repo, &auth.account, Permission::Write)
        .await?;

    let now = Utc::now();
    let article = state
        .repo
        .create_article(Article {
            id: Uuid::new_v4(),
            group_id: group.id,
            author_id: auth.account.id,
            author_name: auth.account.username.clone(),
            header: payload.header,
            markdown: payload.markdown,
            read: 0,
            domain: payload.domain,
            publish: false,
            created_at: now,
            updated_at: now,
        })
        .await?;
    Ok(Json(ArticleResponse {
        result: success(),
        message: "Article created".to_string(),
        article,
    }))
}

/// update_article
///
/// [Authenticated Route] Updates an article; WRITE is checked against the
/// article's own group, not whatever group the caller happens to administer.
#[utoipa::path(
    put,
    path = "/articles/",
    request_body = UpdateArticleRequest,
    responses(
        (status = 200, description = "Article updated", body = ArticleResponse),
        (status = 403, description = "No WRITE permission"),
        (status = 404, description = "Unknown article")
    )
)]
pub async fn update_article(
    auth: AuthSession,
    State(state): State<AppState>,
    Json(payload): Json<UpdateArticleRequest>,
) -> Result<Json<ArticleResponse>, ApiError> {
    let article = state
        .repo
        .article_by_id(payload.id)
        .await?
        .ok_or(ApiError::NotFound("article"))?;
    permissions::confirm_group_permission(
        &state.repo,
        Permission::Write,
        article.group_id,
        &auth.account,
    )
    .await?;

    let article = state
        .repo
        .update_article(payload)
        .await?
        .ok_or(ApiError::NotFound("article"))?;
    Ok(Json(ArticleResponse {
        result: success(),
        message: "Article updated".to_string(),
        article,
    }))
}

/// publish_article
///
/// [Authenticated Route] Makes an article publicly visible. WRITE-gated on the
/// article's group.
#[utoipa::path(
    put,
    path = "/articles/publish",
    request_body = PublishArticleRequest,
    responses(
        (status = 200, description = "Article published", body = ArticleResponse),
        (status = 403, description = "No WRITE permission"),
        (status = 404, description = "Unknown article")
    )
)]
pub async fn publish_article(
    auth: AuthSession,
    State(state): State<AppState>,
    Json(payload): Json<PublishArticleRequest>,
) -> Result<Json<ArticleResponse>, ApiError> {
    set_publish(auth, state, payload.id, true).await
}

/// unpublish_article
///
/// [Authenticated Route] Hides a published article again.
#[utoipa::path(
    put,
    path = "/articles/unpublish",
    request_body = PublishArticleRequest,
    responses(
        (status = 200, description = "Article unpublished", body = ArticleResponse),
        (status = 403, description = "No WRITE permission"),
        (status = 404, description = "Unknown article")
    )
)]
pub async fn unpublish_article(
    auth: AuthSession,
    State(state): State<AppState>,
    Json(payload): Json<PublishArticleRequest>,
) -> Result<Json<ArticleResponse>, ApiError> {
    set_publish(auth, state, payload.id, false).await
}

async fn set_publish(
    auth: AuthSession,
    state: AppState,
    id: Uuid,
    publish: bool,
) -> Result<Json<ArticleResponse>, ApiError> {
    let article = state
        .repo
        .article_by_id(id)
        .await?
        .ok_or(ApiError::NotFound("article"))?;
    permissions::confirm_group_permission(
        &state.repo,
        Permission::Write,
        article.group_id,
        &auth.account,
    )
    .await?;

    let article = state
        .repo
        .set_article_publish(id, publish)
        .await?
        .ok_or(ApiError::NotFound("article"))?;
    Ok(Json(ArticleResponse {
        result: success(),
        message: if publish {
            "Article published".to_string()
        } else {
            "Article unpublished".to_string()
        },
        article,
    }))
}

/// delete_article
///
/// [Authenticated Route] Deletes an article. DELETE-gated on its group.
#[utoipa::path(
    delete,
    path = "/articles/{id}",
    params(("id" = Uuid, Path, description = "Article ID")),
    responses(
        (status = 200, description = "Article deleted", body = MessageResponse),
        (status = 403, description = "No DELETE permission"),
        (status = 404, description = "Unknown article")
    )
)]
pub async fn delete_article(
    auth: AuthSession,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, ApiError> {
    let article = state
        .repo
        .article_by_id(id)
        .await?
        .ok_or(ApiError::NotFound("article"))?;
    permissions::confirm_group_permission(
        &state.repo,
        Permission::Delete,
        article.group_id,
        &auth.account,
    )
    .await?;

    state.repo.delete_article(id).await?;
    Ok(Json(MessageResponse {
        result: success(),
        message: "Article deleted".to_string(),
    }))
}

/// get_public_articles
///
/// [Public Route] Lists published articles. Unpublished drafts never leak here.
#[utoipa::path(
    get,
    path = "/articles/",
    responses((status = 200, description = "Published articles", body = ArticlesResponse))
)]
pub async fn get_public_articles(
    State(state): State<AppState>,
) -> Result<Json<ArticlesResponse>, ApiError> {
    let articles = state.repo.public_articles().await?;
    Ok(Json(ArticlesResponse {
        result: success(),
        message: "Articles found".to_string(),
        articles,
    }))
}

/// get_article
///
/// [Public Route] Retrieves a published article by id and bumps its view
/// counter in the same store operation.
#[utoipa::path(
    get,
    path = "/articles/{id}",
    params(("id" = Uuid, Path, description = "Article ID")),
    responses(
        (status = 200, description = "Article", body = ArticleResponse),
        (status = 404, description = "Unknown or unpublished article")
    )
)]
pub async fn get_article(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ArticleResponse>, ApiError> {
    let article = state
        .repo
        .bump_article_read(id)
        .await?
        .ok_or(ApiError::NotFound("article"))?;
    Ok(Json(ArticleResponse {
        result: success(),
        message: "Article found".to_string(),
        article,
    }))
}

/// get_articles_by_group
///
/// [Authenticated Route] Lists a group's articles including unpublished drafts,
/// which is why it requires READ within the group.
#[utoipa::path(
    get,
    path = "/articles/group/{id}",
    params(("id" = Uuid, Path, description = "Group ID")),
    responses(
        (status = 200, description = "Group articles", body = ArticlesResponse),
        (status = 403, description = "No READ permission")
    )
)]
pub async fn get_articles_by_group(
    auth: AuthSession,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ArticlesResponse>, ApiError> {
    let group = state
        .repo
        .group_by_id(id)
        .await?
        .ok_or(ApiError::NotFound("group"))?;
    permissions::confirm_group_permission(&state.repo, Permission::Read, group.id, &auth.account)
        .await?;

    let articles = state.repo.articles_by_group(group.id).await?;
    Ok(Json(ArticlesResponse {
        result: success(),
        message: "Articles found".to_string(),
        articles,
    }))
}

/// get_articles_by_domain
///
/// [Public Route] Lists published articles for one domain.
#[utoipa::path(
    get,
    path = "/articles/domain/{domain}",
    params(("domain" = String, Path, description = "Domain")),
    responses((status = 200, description = "Published articles", body = ArticlesResponse))
)]
pub async fn get_articles_by_domain(
    State(state): State<AppState>,
    Path(domain): Path<String>,
) -> Result<Json<ArticlesResponse>, ApiError> {
    let articles = state.repo.public_articles_by_domain(&domain).await?;
    Ok(Json(ArticlesResponse {
        result: success(),
        message: "Articles found".to_string(),
        articles,
    }))
}

// --- Page Handlers ---

/// create_page
///
/// [Authenticated Route] Saves a new page into the caller's effective group.
#[utoipa::path(
    post,
    path = "/pages/",
    request_body = CreatePageRequest,
    responses(
        (status = 200, description = "Page created", body = PageResponse),
        (status = 403, description = "No WRITE permission anywhere")
    )
)]
pub async fn create_page(
    auth: AuthSession,
    State(state): State<AppState>,
    Json(payload): Json<CreatePageRequest>,
) -> Result<Json<PageResponse>, ApiError> {
    let group = permissions::confirm_permission(&state.repo, &auth.account, Permission::Write)
        .await?;

    let now = Utc::now();
    let page = state
        .repo
        .create_page(Page {
            id: Uuid::new_v4(),
            group_id: group.id,
            author_id: auth.account.id,
            name: payload.name,
            link: payload.link,
            markdown: payload.markdown,
            icon: payload.icon,
            domain: payload.domain,
            created_at: now,
            updated_at: now,
        })
        .await?;
    Ok(Json(PageResponse {
        result: success(),
        message: "Page created".to_string(),
        page,
    }))
}

/// update_page
///
/// [Authenticated Route] Updates a page; WRITE-gated on the page's group.
#[utoipa::path(
    put,
    path = "/pages/",
    request_body = UpdatePageRequest,
    responses(
        (status = 200, description = "Page updated", body = PageResponse),
        (status = 403, description = "No WRITE permission"),
        (status = 404, description = "Unknown page")
    )
)]
pub async fn update_page(
    auth: AuthSession,
    State(state): State<AppState>,
    Json(payload): Json<UpdatePageRequest>,
) -> Result<Json<PageResponse>, ApiError> {
    let page = state
        .repo
        .page_by_id(payload.id)
        .await?
        .ok_or(ApiError::NotFound("page"))?;
    permissions::confirm_group_permission(
        &state.repo,
        Permission::Write,
        page.group_id,
        &auth.account,
    )
    .await?;

    let page = state
        .repo
        .update_page(payload)
        .await?
        .ok_or(ApiError::NotFound("page"))?;
    Ok(Json(PageResponse {
        result: success(),
        message: "Page updated".to_string(),
        page,
    }))
}

/// delete_page
///
/// [Authenticated Route] Deletes a page. DELETE-gated on its group.
#[utoipa::path(
    delete,
    path = "/pages/{id}",
    params(("id" = Uuid, Path, description = "Page ID")),
    responses(
        (status = 200, description = "Page deleted", body = MessageResponse),
        (status = 403, description = "No DELETE permission"),
        (status = 404, description = "Unknown page")
    )
)]
pub async fn delete_page(
    auth: AuthSession,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, ApiError> {
    let page = state
        .repo
        .page_by_id(id)
        .await?
        .ok_or(ApiError::NotFound("page"))?;
    permissions::confirm_group_permission(
        &state.repo,
        Permission::Delete,
        page.group_id,
        &auth.account,
    )
    .await?;

    state.repo.delete_page(id).await?;
    Ok(Json(MessageResponse {
        result: success(),
        message: "Page deleted".to_string(),
    }))
}

/// get_page
///
/// [Public Route] Retrieves a page by id.
#[utoipa::path(
    get,
    path = "/pages/{id}",
    params(("id" = Uuid, Path, description = "Page ID")),
    responses(
        (status = 200, description = "Page", body = PageResponse),
        (status = 404, description = "Unknown page")
    )
)]
pub async fn get_page(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<PageResponse>, ApiError> {
    let page = state
        .repo
        .page_by_id(id)
        .await?
        .ok_or(ApiError::NotFound("page"))?;
    Ok(Json(PageResponse {
        result: success(),
        message: "Page found".to_string(),
        page,
    }))
}

/// get_page_by_link
///
/// [Public Route] Retrieves a page by its unique link.
#[utoipa::path(
    get,
    path = "/pages/link/{link}",
    params(("link" = String, Path, description = "Page link")),
    responses(
        (status = 200, description = "Page", body = PageResponse),
        (status = 404, description = "Unknown page")
    )
)]
pub async fn get_page_by_link(
    State(state): State<AppState>,
    Path(link): Path<String>,
) -> Result<Json<PageResponse>, ApiError> {
    let page = state
        .repo
        .page_by_link(&link)
        .await?
        .ok_or(ApiError::NotFound("page"))?;
    Ok(Json(PageResponse {
        result: success(),
        message: "Page found".to_string(),
        page,
    }))
}

/// get_pages_by_domain
///
/// [Public Route] Lists a domain's pages.
#[utoipa::path(
    get,
    path = "/pages/domain/{domain}",
    params(("domain" = String, Path, description = "Domain")),
    responses((status = 200, description = "Pages", body = PagesResponse))
)]
pub async fn get_pages_by_domain(
    State(state): State<AppState>,
    Path(domain): Path<String>,
) -> Result<Json<PagesResponse>, ApiError> {
    let pages = state.repo.pages_by_domain(&domain).await?;
    Ok(Json(PagesResponse {
        result: success(),
        message: "Pages found".to_string(),
        pages,
    }))
}

/// get_pages_by_group
///
/// [Authenticated Route] Lists a group's pages; READ-gated.
#[utoipa::path(
    get,
    path = "/pages/group/{id}",
    params(("id" = Uuid, Path, description = "Group ID")),
    responses(
        (status = 200, description = "Pages", body = PagesResponse),
        (status = 403, description = "No READ permission")
    )
)]
pub async fn get_pages_by_group(
    auth: AuthSession,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<PagesResponse>, ApiError> {
    let group = state
        .repo
        .group_by_id(id)
        .await?
        .ok_or(ApiError::NotFound("group"))?;
    permissions::confirm_group_permission(&state.repo, Permission::Read, group.id, &auth.account)
        .await?;

    let pages = state.repo.pages_by_group(group.id).await?;
    Ok(Json(PagesResponse {
        result: success(),
        message: "Pages found".to_string(),
        pages,
    }))
}

// --- Comment Handlers ---

/// create_comment
///
/// [Public Route] Posts a comment on a published article. A caller presenting a
/// valid session is stamped as the comment's authenticated author; without a
/// token the comment is anonymous and carries only the supplied display name.
/// An invalid token is still an authentication failure, not a silent fallback
/// to anonymous.
#[utoipa::path(
    post,
    path = "/comments/",
    request_body = CreateCommentRequest,
    responses(
        (status = 200, description = "Comment created", body = CommentResponse),
        (status = 404, description = "Unknown article")
    )
)]
pub async fn create_comment(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CreateCommentRequest>,
) -> Result<Json<CommentResponse>, ApiError> {
    let authenticated = match headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
    {
        Some(token) => Some(
            sessions::confirm_token(&state.repo, token, state.config.session_ttl_days).await?,
        ),
        None => None,
    };

    state
        .repo
        .article_by_id(payload.article_id)
        .await?
        .ok_or(ApiError::NotFound("article"))?;

    let now = Utc::now();
    let comment = match authenticated {
        Some((_, account)) => Comment {
            id: Uuid::new_v4(),
            article_id: payload.article_id,
            author_kind: "authenticated".to_string(),
            author_account: Some(account.id),
            author_name: Some(account.username),
            content: payload.content,
            public: true,
            created_at: now,
            updated_at: now,
        },
        None => Comment {
            id: Uuid::new_v4(),
            article_id: payload.article_id,
            author_kind: "anonymous".to_string(),
            author_account: None,
            author_name: payload.author_name,
            content: payload.content,
            public: true,
            created_at: now,
            updated_at: now,
        },
    };

    let comment = state.repo.create_comment(comment).await?;
    Ok(Json(CommentResponse {
        result: success(),
        message: "Comment created".to_string(),
        comment,
    }))
}

/// update_comment
///
/// [Authenticated Route] Edits a comment. Allowed for the comment's own author,
/// or for anyone holding WRITE in the article's group (moderation).
#[utoipa::path(
    put,
    path = "/comments/",
    request_body = UpdateCommentRequest,
    responses(
        (status = 200, description = "Comment updated", body = CommentResponse),
        (status = 403, description = "Neither author nor group moderator"),
        (status = 404, description = "Unknown comment")
    )
)]
pub async fn update_comment(
    auth: AuthSession,
    State(state): State<AppState>,
    Json(payload): Json<UpdateCommentRequest>,
) -> Result<Json<CommentResponse>, ApiError> {
    let comment = state
        .repo
        .comment_by_id(payload.id)
        .await?
        .ok_or(ApiError::NotFound("comment"))?;
    let article = state
        .repo
        .article_by_id(comment.article_id)
        .await?
        .ok_or(ApiError::NotFound("article"))?;

    let is_author = comment.author_account == Some(auth.account.id);
    let moderates = permissions::has_group_permission(
        &state.repo,
        Permission::Write,
        article.group_id,
        auth.account.id,
    )
    .await?;
    if !is_author && !moderates {
        return Err(ApiError::Authorization(
            "only the author or a group moderator may edit a comment",
        ));
    }

    let comment = state
        .repo
        .update_comment(payload.id, payload.content)
        .await?
        .ok_or(ApiError::NotFound("comment"))?;
    Ok(Json(CommentResponse {
        result: success(),
        message: "Comment updated".to_string(),
        comment,
    }))
}

/// get_comments_by_article
///
/// [Public Route] Lists an article's public comments.
#[utoipa::path(
    get,
    path = "/comments/article/{id}",
    params(("id" = Uuid, Path, description = "Article ID")),
    responses((status = 200, description = "Comments", body = CommentsResponse))
)]
pub async fn get_comments_by_article(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<CommentsResponse>, ApiError> {
    let comments = state.repo.public_comments_by_article(id).await?;
    Ok(Json(CommentsResponse {
        result: success(),
        message: "Comments found".to_string(),
        comments,
    }))
}

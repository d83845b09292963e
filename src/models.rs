use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::permissions::Rights;

// --- Core Application Schemas (Mapped to Database) ---

/// AuthMethod
///
/// The authentication method a session was issued through. Tagged on every
/// session row so the origin of a login is auditable after the fact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, sqlx::Type)]
#[sqlx(type_name = "auth_method", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum AuthMethod {
    Email,
    Username,
    Application,
    Google,
}

/// Account
///
/// A registered identity capable of authenticating, stored in the `accounts` table.
/// `password` holds the PHC hash and is `None` for federated accounts; every read
/// path that leaves the core clears it via [`Account::masked`].
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Account {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    /// PHC password hash. Never serialized to callers once masked.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    pub fullname: Option<String>,
    /// Free-form tag, defaults to "none". Grants nothing by itself.
    pub role: String,
    /// Application keys this account may authenticate as.
    pub applications: Vec<String>,
    /// Password/username authentication is only valid while true.
    pub active: bool,
    /// One-time code proving control of the registered email.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activation_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recovery_code: Option<String>,
    /// Federation provider, e.g. "google".
    pub source: Option<String>,
    /// Stable subject id asserted by the federation provider.
    pub source_sub: Option<String>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Returns a copy safe to hand to callers: the password hash is cleared.
    pub fn masked(mut self) -> Self {
        self.password = None;
        self
    }
}

/// Session
///
/// Server-issued proof of authentication. The opaque token is the bearer
/// credential; a session is never mutated after creation and expires only by
/// the TTL check at resolution time.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[ts(export)]
pub struct Session {
    pub id: Uuid,
    /// High-entropy 64-character alphanumeric token.
    pub token: String,
    pub account_id: Uuid,
    pub method: AuthMethod,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// Group
///
/// A tenant boundary owning content and memberships.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Group {
    pub id: Uuid,
    pub name: String,
    pub registration_code: String,
    pub address: String,
    /// Domains whose public content belongs to this group.
    pub domains: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// Member
///
/// The join record granting an account a set of rights within a group. The sole
/// source of truth for what an account may do inside that group; at most one row
/// per `(group, account)` pair is meaningful.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct Member {
    pub id: Uuid,
    pub group_id: Uuid,
    pub account_id: Uuid,
    /// Persisted as the "READ | WRITE | DELETE" encoding, checked as a set.
    #[ts(type = "string")]
    #[schema(value_type = String)]
    pub rights: Rights,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// Article
///
/// A blog post owned by a group. Hidden from public routes until published.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Article {
    pub id: Uuid,
    pub group_id: Uuid,
    pub author_id: Uuid,
    pub author_name: String,
    pub header: String,
    pub markdown: String,
    /// View counter, bumped on every public detail read.
    pub read: i64,
    pub domain: Option<String>,
    pub publish: bool,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// Page
///
/// A named site page owned by a group, addressable by its unique link.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Page {
    pub id: Uuid,
    pub group_id: Uuid,
    pub author_id: Uuid,
    pub name: String,
    pub link: String,
    pub markdown: String,
    pub icon: Option<String>,
    pub domain: Option<String>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// Comment
///
/// A comment on an article. Anonymous comments carry only a display name;
/// authenticated comments are stamped with the posting account.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Comment {
    pub id: Uuid,
    pub article_id: Uuid,
    /// "authenticated" or "anonymous".
    pub author_kind: String,
    pub author_account: Option<Uuid>,
    pub author_name: Option<String>,
    pub content: String,
    pub public: bool,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

// --- Request Payloads (Input Schemas) ---

/// AuthenticateRequest
///
/// Wire payload for POST /authentication/authenticate. Exactly one of the
/// identifying fields must be present; the session manager converts this into
/// its closed credentials type and rejects anything else.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct AuthenticateRequest {
    pub email: Option<String>,
    pub username: Option<String>,
    pub application: Option<String>,
    pub password: String,
}

/// RegisterRequest
///
/// Input payload for the public registration endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct RegisterRequest {
    pub email: String,
    pub username: String,
    pub password: String,
    pub fullname: Option<String>,
    pub role: Option<String>,
    pub applications: Option<Vec<String>>,
}

/// CreateGroupRequest
///
/// Input payload for creating a group. The creator automatically becomes the
/// first member with full rights.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateGroupRequest {
    pub name: String,
    pub registration_code: String,
    pub address: String,
    pub domains: String,
}

/// UpdateGroupRequest
///
/// Partial update payload for a group. Uses `Option<T>` fields so only provided
/// columns change.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateGroupRequest {
    pub id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registration_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domains: Option<String>,
}

/// AddMemberRequest
///
/// Grants an account rights within a group.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct AddMemberRequest {
    pub group_id: Uuid,
    pub account_id: Uuid,
    #[ts(type = "string")]
    #[schema(value_type = String)]
    pub rights: Rights,
}

/// UpdateMemberRequest
///
/// Replaces an existing member's rights.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateMemberRequest {
    pub group_id: Uuid,
    pub account_id: Uuid,
    #[ts(type = "string")]
    #[schema(value_type = String)]
    pub rights: Rights,
}

/// RemoveMemberRequest
///
/// Removes an account's membership from a group.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct RemoveMemberRequest {
    pub group_id: Uuid,
    pub account_id: Uuid,
}

/// CreateArticleRequest
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateArticleRequest {
    pub header: String,
    pub markdown: String,
    pub domain: Option<String>,
}

/// UpdateArticleRequest
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateArticleRequest {
    pub id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub markdown: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
}

/// PublishArticleRequest
///
/// Body for the publish/unpublish toggles.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct PublishArticleRequest {
    pub id: Uuid,
}

/// CreatePageRequest
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreatePageRequest {
    pub name: String,
    pub link: String,
    pub markdown: String,
    pub icon: Option<String>,
    pub domain: Option<String>,
}

/// UpdatePageRequest
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdatePageRequest {
    pub id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub markdown: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
}

/// CreateCommentRequest
///
/// Anonymous callers supply a display name; authenticated callers are stamped
/// with their account by the handler.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateCommentRequest {
    pub article_id: Uuid,
    pub content: String,
    pub author_name: Option<String>,
}

/// UpdateCommentRequest
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateCommentRequest {
    pub id: Uuid,
    pub content: String,
}

// --- Response Envelopes (Output Schemas) ---

/// MessageResponse
///
/// The bare `{result, message}` envelope used by status-only endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct MessageResponse {
    pub result: String,
    pub message: String,
}

/// AuthResponse
///
/// Returned by authenticate/google/confirm: the session plus the owning account
/// with its password cleared.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct AuthResponse {
    pub result: String,
    pub session: Session,
    pub account: Account,
}

/// AccountResponse
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct AccountResponse {
    pub result: String,
    pub message: String,
    pub account: Account,
}

/// GroupResponse
///
/// Group payload, including the member list where the operation produced one
/// (group creation returns exactly the owning member).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct GroupResponse {
    pub result: String,
    pub message: String,
    pub group: Group,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub members: Option<Vec<Member>>,
}

/// GroupsResponse
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct GroupsResponse {
    pub result: String,
    pub message: String,
    pub groups: Vec<Group>,
}

/// MemberResponse
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct MemberResponse {
    pub result: String,
    pub message: String,
    pub member: Member,
}

/// MembersResponse
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct MembersResponse {
    pub result: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<Group>,
    pub members: Vec<Member>,
}

/// ArticleResponse
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct ArticleResponse {
    pub result: String,
    pub message: String,
    pub article: Article,
}

/// ArticlesResponse
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct ArticlesResponse {
    pub result: String,
    pub message: String,
    pub articles: Vec<Article>,
}

/// PageResponse
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct PageResponse {
    pub result: String,
    pub message: String,
    pub page: Page,
}

/// PagesResponse
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct PagesResponse {
    pub result: String,
    pub message: String,
    pub pages: Vec<Page>,
}

/// CommentResponse
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CommentResponse {
    pub result: String,
    pub message: String,
    pub comment: Comment,
}

/// CommentsResponse
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CommentsResponse {
    pub result: String,
    pub message: String,
    pub comments: Vec<Comment>,
}

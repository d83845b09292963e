use crate::{
    error::ApiError,
    models::{
        Account, Article, Comment, Group, Member, Page, Session, UpdateArticleRequest,
        UpdateGroupRequest, UpdatePageRequest,
    },
    permissions::Rights,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

/// Repository Trait
///
/// Defines the abstract contract for all persistence operations over the four
/// record collections (accounts, sessions, groups, members) and the content
/// store. This is the core of the Repository Abstraction pattern, allowing the
/// access core and handlers to interact with the data layer without knowing the
/// concrete implementation (Postgres, in-memory, etc.).
///
/// **Send + Sync + async_trait** are required to make the trait object
/// (`Arc<dyn Repository>`) safely shareable across Axum's asynchronous task
/// boundaries.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Accounts ---
    async fn create_account(&self, account: Account) -> Result<Account, ApiError>;
    async fn account_by_id(&self, id: Uuid) -> Result<Option<Account>, ApiError>;
    // Credential lookups. `only_active` enforces the activation invariant for
    // authentication paths; administrative reads pass false.
    async fn account_by_email(
        &self,
        email: &str,
        only_active: bool,
    ) -> Result<Option<Account>, ApiError>;
    async fn account_by_username(
        &self,
        username: &str,
        only_active: bool,
    ) -> Result<Option<Account>, ApiError>;
    async fn account_by_application(
        &self,
        application: &str,
        only_active: bool,
    ) -> Result<Option<Account>, ApiError>;
    // Flips `active` on code match. Idempotent: the code is retained, so a
    // repeated call matches the same row and leaves it active.
    async fn activate_account(&self, code: &str) -> Result<Option<Account>, ApiError>;

    // --- Sessions ---
    async fn create_session(&self, session: Session) -> Result<Session, ApiError>;
    async fn session_by_token(&self, token: &str) -> Result<Option<Session>, ApiError>;

    // --- Groups ---
    // Persists the group and its owning membership as one atomic unit; a crash
    // between the two writes can never leave an orphan group.
    async fn create_group_with_owner(
        &self,
        group: Group,
        owner: Member,
    ) -> Result<(Group, Member), ApiError>;
    async fn group_by_id(&self, id: Uuid) -> Result<Option<Group>, ApiError>;
    async fn groups(&self) -> Result<Vec<Group>, ApiError>;
    async fn update_group(&self, req: UpdateGroupRequest) -> Result<Option<Group>, ApiError>;
    // Removes the group and its memberships; returns the deleted group.
    async fn delete_group(&self, id: Uuid) -> Result<Option<Group>, ApiError>;

    // --- Members ---
    // The unique member row for `(group, account)`, the sole input of every
    // permission check.
    async fn member_of(
        &self,
        group_id: Uuid,
        account_id: Uuid,
    ) -> Result<Option<Member>, ApiError>;
    async fn memberships_of_account(&self, account_id: Uuid) -> Result<Vec<Member>, ApiError>;
    async fn members_of_group(&self, group_id: Uuid) -> Result<Vec<Member>, ApiError>;
    async fn add_member(&self, member: Member) -> Result<Member, ApiError>;
    async fn update_member_rights(
        &self,
        group_id: Uuid,
        account_id: Uuid,
        rights: Rights,
    ) -> Result<Option<Member>, ApiError>;
    async fn remove_member(&self, group_id: Uuid, account_id: Uuid) -> Result<bool, ApiError>;

    // --- Articles ---
    async fn create_article(&self, article: Article) -> Result<Article, ApiError>;
    async fn article_by_id(&self, id: Uuid) -> Result<Option<Article>, ApiError>;
    async fn update_article(&self, req: UpdateArticleRequest)
    -> Result<Option<Article>, ApiError>;
    async fn set_article_publish(
        &self,
        id: Uuid,
        publish: bool,
    ) -> Result<Option<Article>, ApiError>;
    async fn delete_article(&self, id: Uuid) -> Result<bool, ApiError>;
    async fn public_articles(&self) -> Result<Vec<Article>, ApiError>;
    async fn public_articles_by_domain(&self, domain: &str) -> Result<Vec<Article>, ApiError>;
    // Group-scoped listing, includes unpublished drafts.
    async fn articles_by_group(&self, group_id: Uuid) -> Result<Vec<Article>, ApiError>;
    // Public detail read: returns the article only if published, bumping the
    // view counter in the same statement.
    async fn bump_article_read(&self, id: Uuid) -> Result<Option<Article>, ApiError>;

    // --- Pages ---
    async fn create_page(&self, page: Page) -> Result<Page, ApiError>;
    async fn page_by_id(&self, id: Uuid) -> Result<Option<Page>, ApiError>;
    async fn page_by_link(&self, link: &str) -> Result<Option<Page>, ApiError>;
    async fn pages_by_domain(&self, domain: &str) -> Result<Vec<Page>, ApiError>;
    async fn pages_by_group(&self, group_id: Uuid) -> Result<Vec<Page>, ApiError>;
    async fn update_page(&self, req: UpdatePageRequest) -> Result<Option<Page>, ApiError>;
    async fn delete_page(&self, id: Uuid) -> Result<bool, ApiError>;

    // --- Comments ---
    async fn create_comment(&self, comment: Comment) -> Result<Comment, ApiError>;
    async fn comment_by_id(&self, id: Uuid) -> Result<Option<Comment>, ApiError>;
    async fn update_comment(
        &self,
        id: Uuid,
        content: String,
    ) -> Result<Option<Comment>, ApiError>;
    async fn public_comments_by_article(
        &self,
        article_id: Uuid,
    ) -> Result<Vec<Comment>, ApiError>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer access across the
/// application state.
pub type RepositoryState = Arc<dyn Repository>;

// --- Postgres Implementation ---

/// Internal row shape for `members`: rights live in the store as the legacy
/// string encoding and are parsed into the set type on the way out.
#[derive(FromRow)]
struct MemberRow {
    id: Uuid,
    group_id: Uuid,
    account_id: Uuid,
    rights: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<MemberRow> for Member {
    fn from(row: MemberRow) -> Self {
        Member {
            id: row.id,
            group_id: row.group_id,
            account_id: row.account_id,
            rights: Rights::parse(&row.rights),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const ACCOUNT_COLUMNS: &str = "id, email, username, password, fullname, role, applications, \
     active, activation_code, recovery_code, source, source_sub, created_at, updated_at";
const ARTICLE_COLUMNS: &str = "id, group_id, author_id, author_name, header, markdown, read, \
     domain, publish, created_at, updated_at";
const PAGE_COLUMNS: &str =
    "id, group_id, author_id, name, link, markdown, icon, domain, created_at, updated_at";

/// PostgresRepository
///
/// The concrete implementation of the `Repository` trait, backed by the
/// PostgreSQL database. Statements use runtime binding so the crate builds
/// without a live database.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn create_account(&self, account: Account) -> Result<Account, ApiError> {
        let sql = format!(
            "INSERT INTO accounts ({ACCOUNT_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14) \
             RETURNING {ACCOUNT_COLUMNS}"
        );
        let created = sqlx::query_as::<_, Account>(&sql)
            .bind(account.id)
            .bind(&account.email)
            .bind(&account.username)
            .bind(&account.password)
            .bind(&account.fullname)
            .bind(&account.role)
            .bind(&account.applications)
            .bind(account.active)
            .bind(&account.activation_code)
            .bind(&account.recovery_code)
            .bind(&account.source)
            .bind(&account.source_sub)
            .bind(account.created_at)
            .bind(account.updated_at)
            .fetch_one(&self.pool)
            .await?;
        Ok(created)
    }

    async fn account_by_id(&self, id: Uuid) -> Result<Option<Account>, ApiError> {
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = $1");
        Ok(sqlx::query_as::<_, Account>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn account_by_email(
        &self,
        email: &str,
        only_active: bool,
    ) -> Result<Option<Account>, ApiError> {
        let sql = format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts \
             WHERE email = $1 AND ($2 = false OR active = true)"
        );
        Ok(sqlx::query_as::<_, Account>(&sql)
            .bind(email)
            .bind(only_active)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn account_by_username(
        &self,
        username: &str,
        only_active: bool,
    ) -> Result<Option<Account>, ApiError> {
        let sql = format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts \
             WHERE username = $1 AND ($2 = false OR active = true)"
        );
        Ok(sqlx::query_as::<_, Account>(&sql)
            .bind(username)
            .bind(only_active)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn account_by_application(
        &self,
        application: &str,
        only_active: bool,
    ) -> Result<Option<Account>, ApiError> {
        let sql = format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts \
             WHERE $1 = ANY(applications) AND ($2 = false OR active = true)"
        );
        Ok(sqlx::query_as::<_, Account>(&sql)
            .bind(application)
            .bind(only_active)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn activate_account(&self, code: &str) -> Result<Option<Account>, ApiError> {
        let sql = format!(
            "UPDATE accounts SET active = true, updated_at = NOW() \
             WHERE activation_code = $1 RETURNING {ACCOUNT_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, Account>(&sql)
            .bind(code)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn create_session(&self, session: Session) -> Result<Session, ApiError> {
        let created = sqlx::query_as::<_, Session>(
            "INSERT INTO sessions (id, token, account_id, method, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING id, token, account_id, method, created_at, updated_at",
        )
        .bind(session.id)
        .bind(&session.token)
        .bind(session.account_id)
        .bind(session.method)
        .bind(session.created_at)
        .bind(session.updated_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    async fn session_by_token(&self, token: &str) -> Result<Option<Session>, ApiError> {
        Ok(sqlx::query_as::<_, Session>(
            "SELECT id, token, account_id, method, created_at, updated_at \
             FROM sessions WHERE token = $1",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn create_group_with_owner(
        &self,
        group: Group,
        owner: Member,
    ) -> Result<(Group, Member), ApiError> {
        // Both inserts commit or neither does.
        let mut tx = self.pool.begin().await?;

        let created_group = sqlx::query_as::<_, Group>(
            "INSERT INTO groups (id, name, registration_code, address, domains, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING id, name, registration_code, address, domains, created_at, updated_at",
        )
        .bind(group.id)
        .bind(&group.name)
        .bind(&group.registration_code)
        .bind(&group.address)
        .bind(&group.domains)
        .bind(group.created_at)
        .bind(group.updated_at)
        .fetch_one(&mut *tx)
        .await?;

        let owner_row = sqlx::query_as::<_, MemberRow>(
            "INSERT INTO members (id, group_id, account_id, rights, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING id, group_id, account_id, rights, created_at, updated_at",
        )
        .bind(owner.id)
        .bind(owner.group_id)
        .bind(owner.account_id)
        .bind(owner.rights.to_string())
        .bind(owner.created_at)
        .bind(owner.updated_at)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok((created_group, owner_row.into()))
    }

    async fn group_by_id(&self, id: Uuid) -> Result<Option<Group>, ApiError> {
        Ok(sqlx::query_as::<_, Group>(
            "SELECT id, name, registration_code, address, domains, created_at, updated_at \
             FROM groups WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn groups(&self) -> Result<Vec<Group>, ApiError> {
        Ok(sqlx::query_as::<_, Group>(
            "SELECT id, name, registration_code, address, domains, created_at, updated_at \
             FROM groups ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await?)
    }

    async fn update_group(&self, req: UpdateGroupRequest) -> Result<Option<Group>, ApiError> {
        Ok(sqlx::query_as::<_, Group>(
            "UPDATE groups \
             SET name = COALESCE($2, name), \
                 registration_code = COALESCE($3, registration_code), \
                 address = COALESCE($4, address), \
                 domains = COALESCE($5, domains), \
                 updated_at = NOW() \
             WHERE id = $1 \
             RETURNING id, name, registration_code, address, domains, created_at, updated_at",
        )
        .bind(req.id)
        .bind(&req.name)
        .bind(&req.registration_code)
        .bind(&req.address)
        .bind(&req.domains)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn delete_group(&self, id: Uuid) -> Result<Option<Group>, ApiError> {
        // Memberships go with the group so no dangling rights rows survive.
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM members WHERE group_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let deleted = sqlx::query_as::<_, Group>(
            "DELETE FROM groups WHERE id = $1 \
             RETURNING id, name, registration_code, address, domains, created_at, updated_at",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(deleted)
    }

    async fn member_of(
        &self,
        group_id: Uuid,
        account_id: Uuid,
    ) -> Result<Option<Member>, ApiError> {
        let row = sqlx::query_as::<_, MemberRow>(
            "SELECT id, group_id, account_id, rights, created_at, updated_at \
             FROM members WHERE group_id = $1 AND account_id = $2",
        )
        .bind(group_id)
        .bind(account_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Member::from))
    }

    async fn memberships_of_account(&self, account_id: Uuid) -> Result<Vec<Member>, ApiError> {
        let rows = sqlx::query_as::<_, MemberRow>(
            "SELECT id, group_id, account_id, rights, created_at, updated_at \
             FROM members WHERE account_id = $1 ORDER BY created_at ASC",
        )
        .bind(account_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Member::from).collect())
    }

    async fn members_of_group(&self, group_id: Uuid) -> Result<Vec<Member>, ApiError> {
        let rows = sqlx::query_as::<_, MemberRow>(
            "SELECT id, group_id, account_id, rights, created_at, updated_at \
             FROM members WHERE group_id = $1 ORDER BY created_at ASC",
        )
        .bind(group_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Member::from).collect())
    }

    async fn add_member(&self, member: Member) -> Result<Member, ApiError> {
        let row = sqlx::query_as::<_, MemberRow>(
            "INSERT INTO members (id, group_id, account_id, rights, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING id, group_id, account_id, rights, created_at, updated_at",
        )
        .bind(member.id)
        .bind(member.group_id)
        .bind(member.account_id)
        .bind(member.rights.to_string())
        .bind(member.created_at)
        .bind(member.updated_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    async fn update_member_rights(
        &self,
        group_id: Uuid,
        account_id: Uuid,
        rights: Rights,
    ) -> Result<Option<Member>, ApiError> {
        let row = sqlx::query_as::<_, MemberRow>(
            "UPDATE members SET rights = $3, updated_at = NOW() \
             WHERE group_id = $1 AND account_id = $2 \
             RETURNING id, group_id, account_id, rights, created_at, updated_at",
        )
        .bind(group_id)
        .bind(account_id)
        .bind(rights.to_string())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Member::from))
    }

    async fn remove_member(&self, group_id: Uuid, account_id: Uuid) -> Result<bool, ApiError> {
        let result = sqlx::query("DELETE FROM members WHERE group_id = $1 AND account_id = $2")
            .bind(group_id)
            .bind(account_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn create_article(&self, article: Article) -> Result<Article, ApiError> {
        let sql = format!(
            "INSERT INTO articles ({ARTICLE_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
             RETURNING {ARTICLE_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, Article>(&sql)
            .bind(article.id)
            .bind(article.group_id)
            .bind(article.author_id)
            .bind(&article.author_name)
            .bind(&article.header)
            .bind(&article.markdown)
            .bind(article.read)
            .bind(&article.domain)
            .bind(article.publish)
            .bind(article.created_at)
            .bind(article.updated_at)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn article_by_id(&self, id: Uuid) -> Result<Option<Article>, ApiError> {
        let sql = format!("SELECT {ARTICLE_COLUMNS} FROM articles WHERE id = $1");
        Ok(sqlx::query_as::<_, Article>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn update_article(
        &self,
        req: UpdateArticleRequest,
    ) -> Result<Option<Article>, ApiError> {
        let sql = format!(
            "UPDATE articles \
             SET header = COALESCE($2, header), \
                 markdown = COALESCE($3, markdown), \
                 domain = COALESCE($4, domain), \
                 updated_at = NOW() \
             WHERE id = $1 RETURNING {ARTICLE_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, Article>(&sql)
            .bind(req.id)
            .bind(&req.header)
            .bind(&req.markdown)
            .bind(&req.domain)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn set_article_publish(
        &self,
        id: Uuid,
        publish: bool,
    ) -> Result<Option<Article>, ApiError> {
        let sql = format!(
            "UPDATE articles SET publish = $2, updated_at = NOW() \
             WHERE id = $1 RETURNING {ARTICLE_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, Article>(&sql)
            .bind(id)
            .bind(publish)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn delete_article(&self, id: Uuid) -> Result<bool, ApiError> {
        let result = sqlx::query("DELETE FROM articles WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn public_articles(&self) -> Result<Vec<Article>, ApiError> {
        let sql = format!(
            "SELECT {ARTICLE_COLUMNS} FROM articles \
             WHERE publish = true ORDER BY created_at DESC"
        );
        Ok(sqlx::query_as::<_, Article>(&sql)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn public_articles_by_domain(&self, domain: &str) -> Result<Vec<Article>, ApiError> {
        let sql = format!(
            "SELECT {ARTICLE_COLUMNS} FROM articles \
             WHERE publish = true AND domain = $1 ORDER BY created_at DESC"
        );
        Ok(sqlx::query_as::<_, Article>(&sql)
            .bind(domain)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn articles_by_group(&self, group_id: Uuid) -> Result<Vec<Article>, ApiError> {
        let sql = format!(
            "SELECT {ARTICLE_COLUMNS} FROM articles \
             WHERE group_id = $1 ORDER BY created_at DESC"
        );
        Ok(sqlx::query_as::<_, Article>(&sql)
            .bind(group_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn bump_article_read(&self, id: Uuid) -> Result<Option<Article>, ApiError> {
        let sql = format!(
            "UPDATE articles SET read = read + 1 \
             WHERE id = $1 AND publish = true RETURNING {ARTICLE_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, Article>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn create_page(&self, page: Page) -> Result<Page, ApiError> {
        let sql = format!(
            "INSERT INTO pages ({PAGE_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
             RETURNING {PAGE_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, Page>(&sql)
            .bind(page.id)
            .bind(page.group_id)
            .bind(page.author_id)
            .bind(&page.name)
            .bind(&page.link)
            .bind(&page.markdown)
            .bind(&page.icon)
            .bind(&page.domain)
            .bind(page.created_at)
            .bind(page.updated_at)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn page_by_id(&self, id: Uuid) -> Result<Option<Page>, ApiError> {
        let sql = format!("SELECT {PAGE_COLUMNS} FROM pages WHERE id = $1");
        Ok(sqlx::query_as::<_, Page>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn page_by_link(&self, link: &str) -> Result<Option<Page>, ApiError> {
        let sql = format!("SELECT {PAGE_COLUMNS} FROM pages WHERE link = $1");
        Ok(sqlx::query_as::<_, Page>(&sql)
            .bind(link)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn pages_by_domain(&self, domain: &str) -> Result<Vec<Page>, ApiError> {
        let sql =
            format!("SELECT {PAGE_COLUMNS} FROM pages WHERE domain = $1 ORDER BY name ASC");
        Ok(sqlx::query_as::<_, Page>(&sql)
            .bind(domain)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn pages_by_group(&self, group_id: Uuid) -> Result<Vec<Page>, ApiError> {
        let sql =
            format!("SELECT {PAGE_COLUMNS} FROM pages WHERE group_id = $1 ORDER BY name ASC");
        Ok(sqlx::query_as::<_, Page>(&sql)
            .bind(group_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn update_page(&self, req: UpdatePageRequest) -> Result<Option<Page>, ApiError> {
        let sql = format!(
            "UPDATE pages \
             SET name = COALESCE($2, name), \
                 link = COALESCE($3, link), \
                 markdown = COALESCE($4, markdown), \
                 icon = COALESCE($5, icon), \
                 domain = COALESCE($6, domain), \
                 updated_at = NOW() \
             WHERE id = $1 RETURNING {PAGE_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, Page>(&sql)
            .bind(req.id)
            .bind(&req.name)
            .bind(&req.link)
            .bind(&req.markdown)
            .bind(&req.icon)
            .bind(&req.domain)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn delete_page(&self, id: Uuid) -> Result<bool, ApiError> {
        let result = sqlx::query("DELETE FROM pages WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn create_comment(&self, comment: Comment) -> Result<Comment, ApiError> {
        Ok(sqlx::query_as::<_, Comment>(
            "INSERT INTO comments (id, article_id, author_kind, author_account, author_name, \
             content, public, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             RETURNING id, article_id, author_kind, author_account, author_name, content, \
             public, created_at, updated_at",
        )
        .bind(comment.id)
        .bind(comment.article_id)
        .bind(&comment.author_kind)
        .bind(comment.author_account)
        .bind(&comment.author_name)
        .bind(&comment.content)
        .bind(comment.public)
        .bind(comment.created_at)
        .bind(comment.updated_at)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn comment_by_id(&self, id: Uuid) -> Result<Option<Comment>, ApiError> {
        Ok(sqlx::query_as::<_, Comment>(
            "SELECT id, article_id, author_kind, author_account, author_name, content, \
             public, created_at, updated_at FROM comments WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn update_comment(
        &self,
        id: Uuid,
        content: String,
    ) -> Result<Option<Comment>, ApiError> {
        Ok(sqlx::query_as::<_, Comment>(
            "UPDATE comments SET content = $2, updated_at = NOW() WHERE id = $1 \
             RETURNING id, article_id, author_kind, author_account, author_name, content, \
             public, created_at, updated_at",
        )
        .bind(id)
        .bind(content)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn public_comments_by_article(
        &self,
        article_id: Uuid,
    ) -> Result<Vec<Comment>, ApiError> {
        Ok(sqlx::query_as::<_, Comment>(
            "SELECT id, article_id, author_kind, author_account, author_name, content, \
             public, created_at, updated_at FROM comments \
             WHERE article_id = $1 AND public = true ORDER BY created_at ASC",
        )
        .bind(article_id)
        .fetch_all(&self.pool)
        .await?)
    }
}

// --- In-Memory Implementation (Local Development & Tests) ---

#[derive(Default)]
struct MemoryStore {
    accounts: Vec<Account>,
    sessions: Vec<Session>,
    groups: Vec<Group>,
    members: Vec<Member>,
    articles: Vec<Article>,
    pages: Vec<Page>,
    comments: Vec<Comment>,
}

/// MemoryRepository
///
/// A complete in-process implementation of `Repository` over a mutex-guarded
/// store. Used by the test suite and for running the service without Postgres;
/// it honors the same contracts, including the atomicity of
/// `create_group_with_owner`.
#[derive(Default)]
pub struct MemoryRepository {
    store: Mutex<MemoryStore>,
    /// When true, `create_group_with_owner` fails after validating input and
    /// persists nothing, simulating a failed owner insert inside the
    /// transaction.
    fail_owner_insert: bool,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_failing_owner_insert() -> Self {
        Self {
            store: Mutex::new(MemoryStore::default()),
            fail_owner_insert: true,
        }
    }

    fn lock(&self) -> MutexGuard<'_, MemoryStore> {
        self.store.lock().expect("memory repository poisoned")
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn create_account(&self, account: Account) -> Result<Account, ApiError> {
        let mut store = self.lock();
        if store
            .accounts
            .iter()
            .any(|a| a.email == account.email || a.username == account.username)
        {
            return Err(ApiError::Validation(
                "email or username already registered".to_string(),
            ));
        }
        store.accounts.push(account.clone());
        Ok(account)
    }

    async fn account_by_id(&self, id: Uuid) -> Result<Option<Account>, ApiError> {
        Ok(self.lock().accounts.iter().find(|a| a.id == id).cloned())
    }

    async fn account_by_email(
        &self,
        email: &str,
        only_active: bool,
    ) -> Result<Option<Account>, ApiError> {
        Ok(self
            .lock()
            .accounts
            .iter()
            .find(|a| a.email == email && (!only_active || a.active))
            .cloned())
    }

    async fn account_by_username(
        &self,
        username: &str,
        only_active: bool,
    ) -> Result<Option<Account>, ApiError> {
        Ok(self
            .lock()
            .accounts
            .iter()
            .find(|a| a.username == username && (!only_active || a.active))
            .cloned())
    }

    async fn account_by_application(
        &self,
        application: &str,
        only_active: bool,
    ) -> Result<Option<Account>, ApiError> {
        Ok(self
            .lock()
            .accounts
            .iter()
            .find(|a| {
                a.applications.iter().any(|app| app == application) && (!only_active || a.active)
            })
            .cloned())
    }

    async fn activate_account(&self, code: &str) -> Result<Option<Account>, ApiError> {
        let mut store = self.lock();
        let account = store
            .accounts
            .iter_mut()
            .find(|a| a.activation_code.as_deref() == Some(code));
        Ok(account.map(|a| {
            a.active = true;
            a.updated_at = Utc::now();
            a.clone()
        }))
    }

    async fn create_session(&self, session: Session) -> Result<Session, ApiError> {
        self.lock().sessions.push(session.clone());
        Ok(session)
    }

    async fn session_by_token(&self, token: &str) -> Result<Option<Session>, ApiError> {
        Ok(self
            .lock()
            .sessions
            .iter()
            .find(|s| s.token == token)
            .cloned())
    }

    async fn create_group_with_owner(
        &self,
        group: Group,
        owner: Member,
    ) -> Result<(Group, Member), ApiError> {
        let mut store = self.lock();
        if self.fail_owner_insert {
            return Err(ApiError::Validation(
                "simulated owner insert failure".to_string(),
            ));
        }
        store.groups.push(group.clone());
        store.members.push(owner.clone());
        Ok((group, owner))
    }

    async fn group_by_id(&self, id: Uuid) -> Result<Option<Group>, ApiError> {
        Ok(self.lock().groups.iter().find(|g| g.id == id).cloned())
    }

    async fn groups(&self) -> Result<Vec<Group>, ApiError> {
        Ok(self.lock().groups.clone())
    }

    async fn update_group(&self, req: UpdateGroupRequest) -> Result<Option<Group>, ApiError> {
        let mut store = self.lock();
        let group = store.groups.iter_mut().find(|g| g.id == req.id);
        Ok(group.map(|g| {
            if let Some(name) = req.name {
                g.name = name;
            }
            if let Some(code) = req.registration_code {
                g.registration_code = code;
            }
            if let Some(address) = req.address {
                g.address = address;
            }
            if let Some(domains) = req.domains {
                g.domains = domains;
            }
            g.updated_at = Utc::now();
            g.clone()
        }))
    }

    async fn delete_group(&self, id: Uuid) -> Result<Option<Group>, ApiError> {
        let mut store = self.lock();
        let position = store.groups.iter().position(|g| g.id == id);
        Ok(position.map(|pos| {
            store.members.retain(|m| m.group_id != id);
            store.groups.remove(pos)
        }))
    }

    async fn member_of(
        &self,
        group_id: Uuid,
        account_id: Uuid,
    ) -> Result<Option<Member>, ApiError> {
        Ok(self
            .lock()
            .members
            .iter()
            .find(|m| m.group_id == group_id && m.account_id == account_id)
            .cloned())
    }

    async fn memberships_of_account(&self, account_id: Uuid) -> Result<Vec<Member>, ApiError> {
        Ok(self
            .lock()
            .members
            .iter()
            .filter(|m| m.account_id == account_id)
            .cloned()
            .collect())
    }

    async fn members_of_group(&self, group_id: Uuid) -> Result<Vec<Member>, ApiError> {
        Ok(self
            .lock()
            .members
            .iter()
            .filter(|m| m.group_id == group_id)
            .cloned()
            .collect())
    }

    async fn add_member(&self, member: Member) -> Result<Member, ApiError> {
        let mut store = self.lock();
        if store
            .members
            .iter()
            .any(|m| m.group_id == member.group_id && m.account_id == member.account_id)
        {
            return Err(ApiError::Validation(
                "account is already a member of the group".to_string(),
            ));
        }
        store.members.push(member.clone());
        Ok(member)
    }

    async fn update_member_rights(
        &self,
        group_id: Uuid,
        account_id: Uuid,
        rights: Rights,
    ) -> Result<Option<Member>, ApiError> {
        let mut store = self.lock();
        let member = store
            .members
            .iter_mut()
            .find(|m| m.group_id == group_id && m.account_id == account_id);
        Ok(member.map(|m| {
            m.rights = rights;
            m.updated_at = Utc::now();
            m.clone()
        }))
    }

    async fn remove_member(&self, group_id: Uuid, account_id: Uuid) -> Result<bool, ApiError> {
        let mut store = self.lock();
        let before = store.members.len();
        store
            .members
            .retain(|m| !(m.group_id == group_id && m.account_id == account_id));
        Ok(store.members.len() < before)
    }

    async fn create_article(&self, article: Article) -> Result<Article, ApiError> {
        self.lock().articles.push(article.clone());
        Ok(article)
    }

    async fn article_by_id(&self, id: Uuid) -> Result<Option<Article>, ApiError> {
        Ok(self.lock().articles.iter().find(|a| a.id == id).cloned())
    }

    async fn update_article(
        &self,
        req: UpdateArticleRequest,
    ) -> Result<Option<Article>, ApiError> {
        let mut store = self.lock();
        let article = store.articles.iter_mut().find(|a| a.id == req.id);
        Ok(article.map(|a| {
            if let Some(header) = req.header {
                a.header = header;
            }
            if let Some(markdown) = req.markdown {
                a.markdown = markdown;
            }
            if let Some(domain) = req.domain {
                a.domain = Some(domain);
            }
            a.updated_at = Utc::now();
            a.clone()
        }))
    }

    async fn set_article_publish(
        &self,
        id: Uuid,
        publish: bool,
    ) -> Result<Option<Article>, ApiError> {
        let mut store = self.lock();
        let article = store.articles.iter_mut().find(|a| a.id == id);
        Ok(article.map(|a| {
            a.publish = publish;
            a.updated_at = Utc::now();
            a.clone()
        }))
    }

    async fn delete_article(&self, id: Uuid) -> Result<bool, ApiError> {
        let mut store = self.lock();
        let before = store.articles.len();
        store.articles.retain(|a| a.id != id);
        Ok(store.articles.len() < before)
    }

    async fn public_articles(&self) -> Result<Vec<Article>, ApiError> {
        Ok(self
            .lock()
            .articles
            .iter()
            .filter(|a| a.publish)
            .cloned()
            .collect())
    }

    async fn public_articles_by_domain(&self, domain: &str) -> Result<Vec<Article>, ApiError> {
        Ok(self
            .lock()
            .articles
            .iter()
            .filter(|a| a.publish && a.domain.as_deref() == Some(domain))
            .cloned()
            .collect())
    }

    async fn articles_by_group(&self, group_id: Uuid) -> Result<Vec<Article>, ApiError> {
        Ok(self
            .lock()
            .articles
            .iter()
            .filter(|a| a.group_id == group_id)
            .cloned()
            .collect())
    }

    async fn bump_article_read(&self, id: Uuid) -> Result<Option<Article>, ApiError> {
        let mut store = self.lock();
        let article = store
            .articles
            .iter_mut()
            .find(|a| a.id == id && a.publish);
        Ok(article.map(|a| {
            a.read += 1;
            a.clone()
        }))
    }

    async fn create_page(&self, page: Page) -> Result<Page, ApiError> {
        let mut store = self.lock();
        if store
            .pages
            .iter()
            .any(|p| p.name == page.name || p.link == page.link)
        {
            return Err(ApiError::Validation(
                "page name or link already exists".to_string(),
            ));
        }
        store.pages.push(page.clone());
        Ok(page)
    }

    async fn page_by_id(&self, id: Uuid) -> Result<Option<Page>, ApiError> {
        Ok(self.lock().pages.iter().find(|p| p.id == id).cloned())
    }

    async fn page_by_link(&self, link: &str) -> Result<Option<Page>, ApiError> {
        Ok(self.lock().pages.iter().find(|p| p.link == link).cloned())
    }

    async fn pages_by_domain(&self, domain: &str) -> Result<Vec<Page>, ApiError> {
        Ok(self
            .lock()
            .pages
            .iter()
            .filter(|p| p.domain.as_deref() == Some(domain))
            .cloned()
            .collect())
    }

    async fn pages_by_group(&self, group_id: Uuid) -> Result<Vec<Page>, ApiError> {
        Ok(self
            .lock()
            .pages
            .iter()
            .filter(|p| p.group_id == group_id)
            .cloned()
            .collect())
    }

    async fn update_page(&self, req: UpdatePageRequest) -> Result<Option<Page>, ApiError> {
        let mut store = self.lock();
        let page = store.pages.iter_mut().find(|p| p.id == req.id);
        Ok(page.map(|p| {
            if let Some(name) = req.name {
                p.name = name;
            }
            if let Some(link) = req.link {
                p.link = link;
            }
            if let Some(markdown) = req.markdown {
                p.markdown = markdown;
            }
            if let Some(icon) = req.icon {
                p.icon = Some(icon);
            }
            if let Some(domain) = req.domain {
                p.domain = Some(domain);
            }
            p.updated_at = Utc::now();
            p.clone()
        }))
    }

    async fn delete_page(&self, id: Uuid) -> Result<bool, ApiError> {
        let mut store = self.lock();
        let before = store.pages.len();
        store.pages.retain(|p| p.id != id);
        Ok(store.pages.len() < before)
    }

    async fn create_comment(&self, comment: Comment) -> Result<Comment, ApiError> {
        self.lock().comments.push(comment.clone());
        Ok(comment)
    }

    async fn comment_by_id(&self, id: Uuid) -> Result<Option<Comment>, ApiError> {
        Ok(self.lock().comments.iter().find(|c| c.id == id).cloned())
    }

    async fn update_comment(
        &self,
        id: Uuid,
        content: String,
    ) -> Result<Option<Comment>, ApiError> {
        let mut store = self.lock();
        let comment = store.comments.iter_mut().find(|c| c.id == id);
        Ok(comment.map(|c| {
            c.content = content;
            c.updated_at = Utc::now();
            c.clone()
        }))
    }

    async fn public_comments_by_article(
        &self,
        article_id: Uuid,
    ) -> Result<Vec<Comment>, ApiError> {
        Ok(self
            .lock()
            .comments
            .iter()
            .filter(|c| c.article_id == article_id && c.public)
            .cloned()
            .collect())
    }
}

use chrono::Utc;
use std::sync::Arc;
use tenant_cms::{
    error::ApiError,
    groups::{create_group, delete_group, update_group},
    models::{Account, CreateGroupRequest, Member, UpdateGroupRequest},
    permissions::{
        Permission, Rights, confirm_group_permission, confirm_permission, has_group_permission,
    },
    repository::{MemoryRepository, RepositoryState},
};
use uuid::Uuid;

// --- Test Utilities ---

fn repo() -> RepositoryState {
    Arc::new(MemoryRepository::new())
}

/// Inserts an active account directly into the store; these tests exercise the
/// permission layer, not registration.
async fn seeded_account(repo: &RepositoryState, email: &str, username: &str) -> Account {
    let now = Utc::now();
    repo.create_account(Account {
        id: Uuid::new_v4(),
        email: email.to_string(),
        username: username.to_string(),
        password: None,
        fullname: None,
        role: "none".to_string(),
        applications: Vec::new(),
        active: true,
        activation_code: None,
        recovery_code: None,
        source: None,
        source_sub: None,
        created_at: now,
        updated_at: now,
    })
    .await
    .expect("seed account failed")
}

fn group_request(name: &str) -> CreateGroupRequest {
    CreateGroupRequest {
        name: name.to_string(),
        registration_code: "1234567-8".to_string(),
        address: "Example Street 1".to_string(),
        domains: "example.com".to_string(),
    }
}

async fn grant(repo: &RepositoryState, group_id: Uuid, account_id: Uuid, rights: Rights) {
    let now = Utc::now();
    repo.add_member(Member {
        id: Uuid::new_v4(),
        group_id,
        account_id,
        rights,
        created_at: now,
        updated_at: now,
    })
    .await
    .expect("grant failed");
}

// --- Rights Encoding ---

#[test]
fn rights_parse_and_display_round_trip() {
    let rights = Rights::parse("READ | WRITE | DELETE");
    assert!(rights.contains(Permission::Read));
    assert!(rights.contains(Permission::Write));
    assert!(rights.contains(Permission::Delete));
    assert_eq!(rights.to_string(), "READ | WRITE | DELETE");
    assert_eq!(Rights::parse(&rights.to_string()), rights);
}

#[test]
fn rights_checks_are_exact_token_matches() {
    // The legacy substring check would have granted WRITE here.
    let bogus = Rights::parse("READWRITE");
    assert!(!bogus.contains(Permission::Write));
    assert!(!bogus.contains(Permission::Read));
    assert!(bogus.is_empty());

    // Unknown tokens degrade to fewer rights instead of an error.
    let partial = Rights::parse("READ | OWNER | WRITE");
    assert!(partial.contains(Permission::Read));
    assert!(partial.contains(Permission::Write));
    assert!(!partial.contains(Permission::Delete));
}

#[test]
fn rights_subsets_are_monotonic() {
    let rights = Rights::empty()
        .with(Permission::Read)
        .with(Permission::Write);
    assert!(rights.contains(Permission::Read));
    assert!(rights.contains(Permission::Write));
    assert!(!rights.contains(Permission::Delete));
    assert_eq!(Rights::all().to_string(), "READ | WRITE | DELETE");
}

// --- Permission Resolution ---

#[tokio::test]
async fn absent_membership_is_default_deny() {
    let repo = repo();
    let account = seeded_account(&repo, "a@x.com", "alice").await;
    let stranger_group = Uuid::new_v4();

    for permission in [Permission::Read, Permission::Write, Permission::Delete] {
        let held = has_group_permission(&repo, permission, stranger_group, account.id)
            .await
            .unwrap();
        assert!(!held);
    }
}

#[tokio::test]
async fn granted_rights_gate_exactly_their_permissions() {
    let repo = repo();
    let owner = seeded_account(&repo, "o@x.com", "owner").await;
    let writer = seeded_account(&repo, "w@x.com", "writer").await;
    let (group, _) = create_group(&repo, group_request("Tenant"), &owner)
        .await
        .unwrap();

    grant(
        &repo,
        group.id,
        writer.id,
        Rights::empty().with(Permission::Read).with(Permission::Write),
    )
    .await;

    assert!(has_group_permission(&repo, Permission::Read, group.id, writer.id)
        .await
        .unwrap());
    assert!(has_group_permission(&repo, Permission::Write, group.id, writer.id)
        .await
        .unwrap());
    assert!(!has_group_permission(&repo, Permission::Delete, group.id, writer.id)
        .await
        .unwrap());

    // Removing the member row makes every permission check false again.
    repo.remove_member(group.id, writer.id).await.unwrap();
    for permission in [Permission::Read, Permission::Write, Permission::Delete] {
        assert!(!has_group_permission(&repo, permission, group.id, writer.id)
            .await
            .unwrap());
    }
}

#[tokio::test]
async fn confirm_group_permission_signals_authorization_failure() {
    let repo = repo();
    let owner = seeded_account(&repo, "o@x.com", "owner").await;
    let stranger = seeded_account(&repo, "s@x.com", "stranger").await;
    let (group, _) = create_group(&repo, group_request("Tenant"), &owner)
        .await
        .unwrap();

    let allowed =
        confirm_group_permission(&repo, Permission::Write, group.id, &owner).await;
    assert!(allowed.is_ok());

    let denied =
        confirm_group_permission(&repo, Permission::Write, group.id, &stranger).await;
    assert!(matches!(denied, Err(ApiError::Authorization(_))));
}

#[tokio::test]
async fn confirm_permission_resolves_the_effective_group() {
    let repo = repo();
    let owner = seeded_account(&repo, "o@x.com", "owner").await;
    let reader = seeded_account(&repo, "r@x.com", "reader").await;
    let (group, _) = create_group(&repo, group_request("Tenant"), &owner)
        .await
        .unwrap();
    grant(
        &repo,
        group.id,
        reader.id,
        Rights::empty().with(Permission::Read),
    )
    .await;

    let effective = confirm_permission(&repo, &owner, Permission::Write)
        .await
        .unwrap();
    assert_eq!(effective.id, group.id);

    // READ-only membership does not produce an effective group for WRITE.
    let denied = confirm_permission(&repo, &reader, Permission::Write).await;
    assert!(matches!(denied, Err(ApiError::Authorization(_))));
}

// --- Group Lifecycle ---

#[tokio::test]
async fn group_creation_establishes_exactly_one_owner() {
    let repo = repo();
    let creator = seeded_account(&repo, "o@x.com", "owner").await;
    let other = seeded_account(&repo, "s@x.com", "stranger").await;

    let (group, members) = create_group(&repo, group_request("Tenant"), &creator)
        .await
        .unwrap();

    assert_eq!(members.len(), 1);
    assert_eq!(members[0].account_id, creator.id);
    assert_eq!(members[0].rights, Rights::all());

    assert!(has_group_permission(&repo, Permission::Delete, group.id, creator.id)
        .await
        .unwrap());
    for permission in [Permission::Read, Permission::Write, Permission::Delete] {
        assert!(!has_group_permission(&repo, permission, group.id, other.id)
            .await
            .unwrap());
    }
}

#[tokio::test]
async fn independent_groups_have_no_cross_visibility_of_rights() {
    let repo = repo();
    let first = seeded_account(&repo, "1@x.com", "first").await;
    let second = seeded_account(&repo, "2@x.com", "second").await;

    let (group_a, _) = create_group(&repo, group_request("A"), &first).await.unwrap();
    let (group_b, _) = create_group(&repo, group_request("B"), &second)
        .await
        .unwrap();
    assert_ne!(group_a.id, group_b.id);

    assert!(has_group_permission(&repo, Permission::Delete, group_a.id, first.id)
        .await
        .unwrap());
    assert!(!has_group_permission(&repo, Permission::Read, group_b.id, first.id)
        .await
        .unwrap());
    assert!(!has_group_permission(&repo, Permission::Read, group_a.id, second.id)
        .await
        .unwrap());

    assert_eq!(repo.members_of_group(group_a.id).await.unwrap().len(), 1);
    assert_eq!(repo.members_of_group(group_b.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn update_and_delete_use_the_soft_failure_policy() {
    let repo = repo();
    let owner = seeded_account(&repo, "o@x.com", "owner").await;
    let stranger = seeded_account(&repo, "s@x.com", "stranger").await;
    let (group, _) = create_group(&repo, group_request("Tenant"), &owner)
        .await
        .unwrap();

    // Missing permission is Ok(None), not an error.
    let denied = update_group(
        &repo,
        UpdateGroupRequest {
            id: group.id,
            name: Some("Hijacked".to_string()),
            ..UpdateGroupRequest::default()
        },
        &stranger,
    )
    .await
    .unwrap();
    assert!(denied.is_none());

    let updated = update_group(
        &repo,
        UpdateGroupRequest {
            id: group.id,
            name: Some("Renamed".to_string()),
            ..UpdateGroupRequest::default()
        },
        &owner,
    )
    .await
    .unwrap()
    .expect("owner update should succeed");
    assert_eq!(updated.name, "Renamed");

    let denied = delete_group(&repo, group.id, &stranger).await.unwrap();
    assert!(denied.is_none());

    let deleted = delete_group(&repo, group.id, &owner)
        .await
        .unwrap()
        .expect("owner delete should succeed");
    assert_eq!(deleted.id, group.id);
    assert!(repo.group_by_id(group.id).await.unwrap().is_none());
    // Memberships went with the group.
    assert!(repo.members_of_group(group.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn failed_owner_insert_leaves_no_orphan_group() {
    let failing: RepositoryState = Arc::new(MemoryRepository::new_failing_owner_insert());
    let creator = seeded_account(&failing, "o@x.com", "owner").await;

    let result = create_group(&failing, group_request("Tenant"), &creator).await;
    assert!(result.is_err());
    assert!(failing.groups().await.unwrap().is_empty());
}

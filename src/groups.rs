use chrono::Utc;
use uuid::Uuid;

use crate::{
    error::ApiError,
    models::{Account, CreateGroupRequest, Group, Member, UpdateGroupRequest},
    permissions::{self, Permission, Rights},
    repository::RepositoryState,
};

/// create_group
///
/// Persists a new group and its owning membership as one atomic unit: the
/// creator becomes the first member with full rights, and if the member insert
/// fails the group is not persisted either. Returns the group together with its
/// member list, which contains exactly the creator.
pub async fn create_group(
    repo: &RepositoryState,
    req: CreateGroupRequest,
    creator: &Account,
) -> Result<(Group, Vec<Member>), ApiError> {
    let now = Utc::now();
    let group = Group {
        id: Uuid::new_v4(),
        name: req.name,
        registration_code: req.registration_code,
        address: req.address,
        domains: req.domains,
        created_at: now,
        updated_at: now,
    };
    let owner = Member {
        id: Uuid::new_v4(),
        group_id: group.id,
        account_id: creator.id,
        rights: Rights::all(),
        created_at: now,
        updated_at: now,
    };

    let (group, owner) = repo.create_group_with_owner(group, owner).await?;
    Ok((group, vec![owner]))
}

/// update_group
///
/// Gated on WRITE. Missing permission is the soft-failure outcome: `Ok(None)`
/// rather than an error, which the route layer translates to a 400-level
/// response. `Some(group)` carries the updated record.
pub async fn update_group(
    repo: &RepositoryState,
    req: UpdateGroupRequest,
    account: &Account,
) -> Result<Option<Group>, ApiError> {
    if !permissions::has_group_permission(repo, Permission::Write, req.id, account.id).await? {
        return Ok(None);
    }
    repo.update_group(req).await
}

/// delete_group
///
/// Gated on DELETE, same soft-failure policy as [`update_group`]. Returns the
/// deleted group on success.
pub async fn delete_group(
    repo: &RepositoryState,
    group_id: Uuid,
    account: &Account,
) -> Result<Option<Group>, ApiError> {
    if !permissions::has_group_permission(repo, Permission::Delete, group_id, account.id).await? {
        return Ok(None);
    }
    repo.delete_group(group_id).await
}

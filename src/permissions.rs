use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

use crate::{
    error::ApiError,
    models::{Account, Group},
    repository::RepositoryState,
};

/// Permission
///
/// The closed set of rights an account can hold inside a group. Content reads on
/// group-scoped data require Read; create/update requires Write; removal requires
/// Delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    Read,
    Write,
    Delete,
}

impl Permission {
    const fn bit(self) -> u8 {
        match self {
            Permission::Read => 1 << 0,
            Permission::Write => 1 << 1,
            Permission::Delete => 1 << 2,
        }
    }

    pub const fn token(self) -> &'static str {
        match self {
            Permission::Read => "READ",
            Permission::Write => "WRITE",
            Permission::Delete => "DELETE",
        }
    }
}

/// Rights
///
/// A set of [`Permission`]s backed by a bitmask. Member rows persist the legacy
/// `"READ | WRITE | DELETE"` string encoding, which parses token-by-token into
/// this mask; membership checks are exact bit tests, so an unrelated token like
/// `READWRITE` can never satisfy a `WRITE` check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rights(u8);

impl Rights {
    pub const fn empty() -> Self {
        Rights(0)
    }

    /// The full owner grant: READ | WRITE | DELETE.
    pub const fn all() -> Self {
        Rights(
            Permission::Read.bit() | Permission::Write.bit() | Permission::Delete.bit(),
        )
    }

    pub const fn with(self, permission: Permission) -> Self {
        Rights(self.0 | permission.bit())
    }

    pub const fn contains(self, permission: Permission) -> bool {
        (self.0 & permission.bit()) == permission.bit()
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Lenient parse of the persisted encoding. Tokens are split on `|`,
    /// trimmed and matched exactly; unknown tokens are ignored so a legacy or
    /// hand-edited row degrades to fewer rights instead of an unreadable group.
    pub fn parse(encoded: &str) -> Self {
        let mut rights = Rights::empty();
        for token in encoded.split('|') {
            match token.trim() {
                "READ" => rights = rights.with(Permission::Read),
                "WRITE" => rights = rights.with(Permission::Write),
                "DELETE" => rights = rights.with(Permission::Delete),
                _ => {}
            }
        }
        rights
    }
}

impl fmt::Display for Rights {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut tokens = Vec::new();
        for permission in [Permission::Read, Permission::Write, Permission::Delete] {
            if self.contains(permission) {
                tokens.push(permission.token());
            }
        }
        write!(f, "{}", tokens.join(" | "))
    }
}

impl FromStr for Rights {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Rights::parse(s))
    }
}

// Rights travel over the wire and into the store in the string encoding.
impl Serialize for Rights {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Rights {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        Ok(Rights::parse(&encoded))
    }
}

/// has_group_permission
///
/// The single gate every mutating operation passes through: looks up the unique
/// member row for `(group, account)` and tests the requested permission against
/// its rights. Absent membership is the default-deny state and returns false,
/// never an error.
pub async fn has_group_permission(
    repo: &RepositoryState,
    permission: Permission,
    group_id: Uuid,
    account_id: Uuid,
) -> Result<bool, ApiError> {
    let member = repo.member_of(group_id, account_id).await?;
    Ok(member
        .map(|m| m.rights.contains(permission))
        .unwrap_or(false))
}

/// confirm_group_permission
///
/// Route-facing wrapper around [`has_group_permission`] for an explicit target
/// group. Fails with an Authorization error, distinct from the Authentication
/// errors of the session manager, so callers can tell 401 from 403.
pub async fn confirm_group_permission(
    repo: &RepositoryState,
    permission: Permission,
    group_id: Uuid,
    account: &Account,
) -> Result<(), ApiError> {
    if has_group_permission(repo, permission, group_id, account.id).await? {
        Ok(())
    } else {
        Err(ApiError::Authorization(
            "no permission for this action in the group",
        ))
    }
}

/// confirm_permission
///
/// Resolves the account's effective group for routes that operate on "any group
/// the account holds this right in": the first membership whose rights contain
/// the permission wins. No qualifying membership is an Authorization failure.
pub async fn confirm_permission(
    repo: &RepositoryState,
    account: &Account,
    permission: Permission,
) -> Result<Group, ApiError> {
    let memberships = repo.memberships_of_account(account.id).await?;
    for membership in memberships {
        if membership.rights.contains(permission) {
            if let Some(group) = repo.group_by_id(membership.group_id).await? {
                return Ok(group);
            }
        }
    }
    Err(ApiError::Authorization(
        "no group membership grants this permission",
    ))
}

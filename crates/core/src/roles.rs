//! Well-known roles and the acting identity passed into every catalog call.
//!
//! The catalog never authenticates. Callers hand it an [`Actor`] and it only
//! authorizes that actor against listing ownership.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::listing::Listing;
use crate::types::DbId;

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_AGENT: &str = "agent";
pub const ROLE_MEMBER: &str = "member";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Agent,
    Member,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => ROLE_ADMIN,
            Role::Agent => ROLE_AGENT,
            Role::Member => ROLE_MEMBER,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            ROLE_ADMIN => Ok(Role::Admin),
            ROLE_AGENT => Ok(Role::Agent),
            ROLE_MEMBER | "user" | "owner" => Ok(Role::Member),
            other => Err(CoreError::Validation(format!("Unknown role '{other}'"))),
        }
    }
}

/// The identity on whose behalf an operation runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub user_id: DbId,
    pub role: Role,
}

impl Actor {
    pub fn new(user_id: DbId, role: Role) -> Self {
        Self { user_id, role }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Owner or assigned agent of `listing`.
    pub fn participates_in(&self, listing: &Listing) -> bool {
        listing.owner_id == self.user_id || listing.agent_id == Some(self.user_id)
    }

    /// Fail with `FORBIDDEN` unless the actor may mutate `listing`.
    ///
    /// `admin_override` lets administrators through for operations where the
    /// workflow grants them that right (withdraw, delete).
    pub fn authorize(&self, listing: &Listing, admin_override: bool) -> Result<(), CoreError> {
        if self.participates_in(listing) || (admin_override && self.is_admin()) {
            Ok(())
        } else {
            Err(CoreError::Forbidden(format!(
                "User {} is neither owner nor agent of listing {}",
                self.user_id, listing.id
            )))
        }
    }

    /// Fail with `FORBIDDEN` unless the actor is an administrator.
    pub fn require_admin(&self) -> Result<(), CoreError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(CoreError::Forbidden("Admin role required".into()))
        }
    }
}

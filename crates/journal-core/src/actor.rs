//! Actors, roles, and per-article capability checks.
//!
//! Every core operation takes the acting user explicitly. What an actor may
//! do to an article is derived from two things: the actor's account role and
//! the actor's relationship to the article (submitter, co-author with an
//! account, assigned editor). The result is an [`Access`] set.

use std::str::FromStr;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::article::Article;
use crate::error::{JournalError, ParseEnumError, Result};

/// Unique identifier for a user account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub Uuid);

impl UserId {
    /// Create a new random user ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a user ID from a string
    pub fn parse(s: &str) -> Result<Self> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| JournalError::Validation(format!("invalid user id {:?}: {}", s, e)))
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Account role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Role {
    #[default]
    User,
    Author,
    Reviewer,
    Editor,
    ChiefEditor,
    Admin,
}

impl Role {
    /// Admin and chief editor act on any article and manage issues
    pub fn is_administrative(&self) -> bool {
        matches!(self, Role::Admin | Role::ChiefEditor)
    }

    /// Any editorial role, assigned or not
    pub fn is_editorial(&self) -> bool {
        matches!(self, Role::Editor | Role::ChiefEditor | Role::Admin)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Author => "author",
            Role::Reviewer => "reviewer",
            Role::Editor => "editor",
            Role::ChiefEditor => "chiefEditor",
            Role::Admin => "admin",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "author" => Ok(Role::Author),
            "reviewer" => Ok(Role::Reviewer),
            "editor" => Ok(Role::Editor),
            "chiefEditor" => Ok(Role::ChiefEditor),
            "admin" => Ok(Role::Admin),
            _ => Err(ParseEnumError::new("role", s)),
        }
    }
}

/// The user performing an operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: UserId,
    pub role: Role,
}

impl Actor {
    pub fn new(id: UserId, role: Role) -> Self {
        Self { id, role }
    }

    /// Convenience constructor for a fresh actor with the given role
    pub fn with_role(role: Role) -> Self {
        Self::new(UserId::new(), role)
    }
}

bitflags! {
    /// What an actor may do to a specific article.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct Access: u32 {
        /// Read the article, its files and its history
        const VIEW = 0b00000001;
        /// Change content fields (subject to the editable-status gate)
        const EDIT = 0b00000010;
        /// Upload files (subject to the editable-status gate)
        const UPLOAD = 0b00000100;
        /// Request status transitions
        const TRANSITION = 0b00001000;
        /// Editorial control: bypasses status gates, invites reviewers,
        /// starts rounds, assigns DOIs
        const MANAGE = 0b00010000;
    }
}

impl Access {
    /// Submitter or co-author with an account
    pub const AUTHOR: Access = Access::VIEW
        .union(Access::EDIT)
        .union(Access::UPLOAD)
        .union(Access::TRANSITION);

    /// Assigned editor, admin, chief editor
    pub const EDITORIAL: Access = Access::AUTHOR.union(Access::MANAGE);

    #[inline]
    pub fn can_view(&self) -> bool {
        self.contains(Access::VIEW)
    }

    #[inline]
    pub fn can_edit(&self) -> bool {
        self.contains(Access::EDIT)
    }

    #[inline]
    pub fn can_upload(&self) -> bool {
        self.contains(Access::UPLOAD)
    }

    #[inline]
    pub fn can_transition(&self) -> bool {
        self.contains(Access::TRANSITION)
    }

    #[inline]
    pub fn can_manage(&self) -> bool {
        self.contains(Access::MANAGE)
    }
}

/// Compute the access an actor has to an article.
pub fn access_for(actor: &Actor, article: &Article) -> Access {
    if actor.role.is_administrative() || article.editor_id == Some(actor.id) {
        return Access::EDITORIAL;
    }
    let mut access = Access::empty();
    if article.is_author(&actor.id) {
        access |= Access::AUTHOR;
    }
    if actor.role.is_editorial() {
        access |= Access::VIEW;
    }
    access
}

/// Fail with `Forbidden` unless `access` holds every flag in `required`.
pub fn require(access: Access, required: Access, action: &str) -> Result<()> {
    if access.contains(required) {
        Ok(())
    } else {
        Err(JournalError::Forbidden(format!("not allowed to {}", action)))
    }
}

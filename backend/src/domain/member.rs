//! Member identity and the inputs of each member operation.
//!
//! `password` is opaque to the domain: it is compared verbatim and never
//! rendered by `Debug`.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Server-assigned member identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemberId(i64);

impl MemberId {
    /// Wrap a raw identifier.
    #[must_use]
    pub const fn new(raw: i64) -> Self {
        Self(raw)
    }

    /// Raw identifier.
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for MemberId {
    fn from(raw: i64) -> Self {
        Self(raw)
    }
}

/// A registered member.
#[derive(Clone, PartialEq, Eq)]
pub struct Member {
    /// Immutable identifier.
    pub id: MemberId,
    /// Display name.
    pub name: String,
    /// Unique contact address.
    pub email: String,
    /// Opaque credential.
    pub password: String,
    /// Creation instant.
    pub created_at: DateTime<Utc>,
}

impl Member {
    /// Whether `candidate` matches the stored credential.
    #[must_use]
    pub fn password_matches(&self, candidate: &str) -> bool {
        self.password == candidate
    }
}

impl fmt::Debug for Member {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Member")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("email", &self.email)
            .field("created_at", &self.created_at)
            .finish_non_exhaustive()
    }
}

/// Registration input.
#[derive(Clone, PartialEq, Eq)]
pub struct NewMember {
    /// Display name.
    pub name: String,
    /// Contact address.
    pub email: String,
    /// Opaque credential.
    pub password: String,
}

impl fmt::Debug for NewMember {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewMember")
            .field("name", &self.name)
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

/// Partial profile update. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfilePatch {
    /// Replacement display name.
    pub name: Option<String>,
}

impl ProfilePatch {
    /// Apply the patch to `member`.
    pub fn apply(self, member: &mut Member) {
        if let Some(name) = self.name {
            member.name = name;
        }
    }
}

/// Email change authorised by the current password.
#[derive(Clone, PartialEq, Eq)]
pub struct EmailChange {
    /// Member to change.
    pub id: MemberId,
    /// Replacement address.
    pub new_email: String,
    /// Current credential.
    pub password: String,
}

impl fmt::Debug for EmailChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmailChange")
            .field("id", &self.id)
            .field("new_email", &self.new_email)
            .finish_non_exhaustive()
    }
}

/// Password change authorised by the current password.
#[derive(Clone, PartialEq, Eq)]
pub struct PasswordChange {
    /// Member to change.
    pub id: MemberId,
    /// Current credential.
    pub old_password: String,
    /// Replacement credential.
    pub new_password: String,
}

impl fmt::Debug for PasswordChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PasswordChange")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

/// One window of members with the total across all windows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberPage {
    /// Members in the window.
    pub members: Vec<Member>,
    /// Members across all windows.
    pub total: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member() -> Member {
        Member {
            id: MemberId::new(1),
            name: "Ada".to_owned(),
            email: "ada@example.com".to_owned(),
            password: "hunter22".to_owned(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn debug_never_renders_password() {
        let rendered = format!("{:?}", member());
        assert!(!rendered.contains("hunter22"));
        assert!(rendered.contains("ada@example.com"));
    }

    #[test]
    fn empty_patch_leaves_member_untouched() {
        let mut target = member();
        let before = target.clone();
        ProfilePatch::default().apply(&mut target);
        assert_eq!(target, before);
    }

    #[test]
    fn patch_replaces_name() {
        let mut target = member();
        ProfilePatch {
            name: Some("Grace".to_owned()),
        }
        .apply(&mut target);
        assert_eq!(target.name, "Grace");
    }

    #[test]
    fn password_match_is_exact() {
        let target = member();
        assert!(target.password_matches("hunter22"));
        assert!(!target.password_matches("Hunter22"));
    }
}

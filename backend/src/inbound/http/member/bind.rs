//! Shapes the transport adapter deserializes requests into.
//!
//! Every parameter is accepted as text and every body field defaults, so
//! binding fails only on malformed input; semantic checks are the
//! validator's job.

use serde::Deserialize;

/// `POST /` body.
#[derive(Default, Deserialize)]
#[serde(default)]
pub struct RegisterMemberBody {
    /// Display name.
    pub name: String,
    /// Login email.
    pub email: String,
    /// Plain password.
    pub password: String,
}

/// `/:id` path parameters.
#[derive(Debug, Deserialize)]
pub struct MemberIdPath {
    /// Raw identifier.
    pub id: String,
}

/// `/email/:email` path parameters.
#[derive(Debug, Deserialize)]
pub struct MemberEmailPath {
    /// Raw email.
    pub email: String,
}

/// `GET /` query parameters.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ListMembersQuery {
    /// 1-based page number.
    pub page: Option<String>,
    /// Page size.
    pub limit: Option<String>,
    /// Sort column.
    pub sort_by: Option<String>,
    /// Sort direction.
    pub order_by: Option<String>,
}

/// `PATCH /:id` body.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UpdateProfileBody {
    /// Replacement display name.
    pub name: Option<String>,
}

/// `PATCH /:id/email` body.
#[derive(Default, Deserialize)]
#[serde(default)]
pub struct UpdateEmailBody {
    /// Requested email.
    pub new_email: String,
    /// Current password.
    pub password: String,
}

/// `PATCH /:id/password` body.
#[derive(Default, Deserialize)]
#[serde(default)]
pub struct UpdatePasswordBody {
    /// Current password.
    pub old_password: String,
    /// Replacement password.
    pub new_password: String,
}

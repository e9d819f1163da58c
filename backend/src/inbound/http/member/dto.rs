//! Transport-neutral request DTOs and their validation rules.
//!
//! Rule codes double as the names reported to clients: `required`, `email`,
//! `min`, `gte`, `len`, `range` and `oneof`.

use pagination::{OrderBy, SortBy};
use validator::{Validate, ValidationError};

fn required_text(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("required"));
    }
    Ok(())
}

fn required_id(value: i64) -> Result<(), ValidationError> {
    if value == 0 {
        return Err(ValidationError::new("required"));
    }
    Ok(())
}

fn sort_by_oneof(value: &str) -> Result<(), ValidationError> {
    SortBy::parse_or_default(value)
        .map(|_| ())
        .map_err(|_| ValidationError::new("oneof"))
}

fn order_by_oneof(value: &str) -> Result<(), ValidationError> {
    OrderBy::parse_or_default(value)
        .map(|_| ())
        .map_err(|_| ValidationError::new("oneof"))
}

/// Registration input.
#[derive(Clone, PartialEq, Eq, Validate)]
pub struct RegisterMemberDto {
    /// Display name.
    #[validate(custom(function = "required_text"))]
    pub name: String,
    /// Login email.
    #[validate(custom(function = "required_text"), email(code = "email"))]
    pub email: String,
    /// Plain password.
    #[validate(
        custom(function = "required_text"),
        length(min = 6, code = "min")
    )]
    pub password: String,
}

/// Identifies one member; used by get and delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Validate)]
pub struct MemberIdDto {
    /// Member identifier.
    #[validate(custom(function = "required_id"), range(min = 1, code = "gte"))]
    pub id: i64,
}

/// Lookup by email.
#[derive(Debug, Clone, PartialEq, Eq, Validate)]
pub struct MemberEmailDto {
    /// Login email.
    #[validate(custom(function = "required_text"), email(code = "email"))]
    pub email: String,
}

/// List window and ordering. Empty sort strings select the defaults.
#[derive(Debug, Clone, PartialEq, Eq, Validate)]
pub struct ListMembersDto {
    /// 1-based page number.
    #[validate(range(min = 1, code = "gte"))]
    pub page: i64,
    /// Page size.
    #[validate(range(min = 1, max = 100, code = "range"))]
    pub limit: i64,
    /// Sort column.
    #[validate(custom(function = "sort_by_oneof"))]
    pub sort_by: String,
    /// Sort direction.
    #[validate(custom(function = "order_by_oneof"))]
    pub order_by: String,
}

/// Profile patch input.
#[derive(Debug, Clone, PartialEq, Eq, Validate)]
pub struct UpdateProfileDto {
    /// Member identifier.
    #[validate(custom(function = "required_id"), range(min = 1, code = "gte"))]
    pub id: i64,
    /// Replacement display name.
    #[validate(length(min = 3, max = 20, code = "len"))]
    pub name: Option<String>,
}

/// Email change input.
#[derive(Clone, PartialEq, Eq, Validate)]
pub struct UpdateEmailDto {
    /// Member identifier.
    #[validate(custom(function = "required_id"), range(min = 1, code = "gte"))]
    pub id: i64,
    /// Requested email.
    #[validate(custom(function = "required_text"), email(code = "email"))]
    pub new_email: String,
    /// Current password.
    #[validate(
        custom(function = "required_text"),
        length(min = 6, code = "min")
    )]
    pub password: String,
}

/// Password change input.
#[derive(Clone, PartialEq, Eq, Validate)]
pub struct UpdatePasswordDto {
    /// Member identifier.
    #[validate(custom(function = "required_id"), range(min = 1, code = "gte"))]
    pub id: i64,
    /// Current password.
    #[validate(
        custom(function = "required_text"),
        length(min = 6, code = "min")
    )]
    pub old_password: String,
    /// Replacement password.
    #[validate(
        custom(function = "required_text"),
        length(min = 6, code = "min")
    )]
    pub new_password: String,
}

//! Per-operation request validation.
//!
//! Each method reports only the first failing field, in declaration order,
//! and for that field prefers the `required` rule over any other.

use thiserror::Error;
use validator::{Validate, ValidationErrorsKind};

use super::dto::{
    ListMembersDto, MemberEmailDto, MemberIdDto, RegisterMemberDto, UpdateEmailDto,
    UpdatePasswordDto, UpdateProfileDto,
};

/// The first rule a DTO broke.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("field '{field}' failed rule {rule}")]
pub struct ValidationFailure {
    /// Offending field.
    pub field: &'static str,
    /// Rule code.
    pub rule: String,
}

impl ValidationFailure {
    fn new(field: &'static str, rule: impl Into<String>) -> Self {
        Self {
            field,
            rule: rule.into(),
        }
    }
}

fn first_failure<T: Validate>(dto: &T, order: &[&'static str]) -> Result<(), ValidationFailure> {
    let Err(errors) = dto.validate() else {
        return Ok(());
    };
    let by_field = errors.errors();
    for &field in order {
        let Some(ValidationErrorsKind::Field(failed)) = by_field.get(field) else {
            continue;
        };
        let rule = failed
            .iter()
            .find(|error| error.code == "required")
            .or_else(|| failed.first());
        if let Some(error) = rule {
            return Err(ValidationFailure::new(field, error.code.to_string()));
        }
    }
    // A rule fired on a field missing from `order`.
    let field = by_field
        .keys()
        .next()
        .map_or_else(String::new, ToString::to_string);
    tracing::warn!(%field, "validation failed on an unordered field");
    Err(ValidationFailure::new("request", "invalid"))
}

/// Validation entry points for every member request.
#[derive(Debug, Clone, Copy, Default)]
pub struct MemberValidator;

impl MemberValidator {
    /// Build a validator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// `name` required; `email` required and well formed; `password`
    /// required, at least six characters.
    ///
    /// # Errors
    ///
    /// The first broken rule.
    pub fn validate_register(&self, dto: &RegisterMemberDto) -> Result<(), ValidationFailure> {
        first_failure(dto, &["name", "email", "password"])
    }

    /// `id` required and at least 1.
    ///
    /// # Errors
    ///
    /// The first broken rule.
    pub fn validate_get_by_id(&self, dto: &MemberIdDto) -> Result<(), ValidationFailure> {
        first_failure(dto, &["id"])
    }

    /// `email` required and well formed.
    ///
    /// # Errors
    ///
    /// The first broken rule.
    pub fn validate_get_by_email(&self, dto: &MemberEmailDto) -> Result<(), ValidationFailure> {
        first_failure(dto, &["email"])
    }

    /// `page` at least 1, `limit` within 1..=100, sort values from their
    /// closed sets or empty.
    ///
    /// # Errors
    ///
    /// The first broken rule.
    pub fn validate_list(&self, dto: &ListMembersDto) -> Result<(), ValidationFailure> {
        first_failure(dto, &["page", "limit", "sort_by", "order_by"])
    }

    /// `id` at least 1; `name`, when present, 3 to 20 characters.
    ///
    /// # Errors
    ///
    /// The first broken rule.
    pub fn validate_update_profile(&self, dto: &UpdateProfileDto) -> Result<(), ValidationFailure> {
        first_failure(dto, &["id", "name"])
    }

    /// `id` at least 1; `new_email` well formed; `password` at least six
    /// characters.
    ///
    /// # Errors
    ///
    /// The first broken rule.
    pub fn validate_update_email(&self, dto: &UpdateEmailDto) -> Result<(), ValidationFailure> {
        first_failure(dto, &["id", "new_email", "password"])
    }

    /// `id` at least 1; both passwords at least six characters.
    ///
    /// # Errors
    ///
    /// The first broken rule.
    pub fn validate_update_password(
        &self,
        dto: &UpdatePasswordDto,
    ) -> Result<(), ValidationFailure> {
        first_failure(dto, &["id", "old_password", "new_password"])
    }

    /// `id` required and at least 1.
    ///
    /// # Errors
    ///
    /// The first broken rule.
    pub fn validate_delete(&self, dto: &MemberIdDto) -> Result<(), ValidationFailure> {
        first_failure(dto, &["id"])
    }
}

#[cfg(test)]
mod tests {
    use rstest::{fixture, rstest};

    use super::*;

    #[fixture]
    fn validator() -> MemberValidator {
        MemberValidator::new()
    }

    fn register(name: &str, email: &str, password: &str) -> RegisterMemberDto {
        RegisterMemberDto {
            name: name.to_owned(),
            email: email.to_owned(),
            password: password.to_owned(),
        }
    }

    fn list(page: i64, limit: i64, sort_by: &str, order_by: &str) -> ListMembersDto {
        ListMembersDto {
            page,
            limit,
            sort_by: sort_by.to_owned(),
            order_by: order_by.to_owned(),
        }
    }

    fn failure(field: &'static str, rule: &str) -> Result<(), ValidationFailure> {
        Err(ValidationFailure::new(field, rule))
    }

    #[rstest]
    #[case(register("A", "a@x.io", "pw1234"), Ok(()))]
    #[case(register("", "a@x.io", "pw1234"), failure("name", "required"))]
    #[case(register("", "", ""), failure("name", "required"))]
    #[case(register("A", "", "pw1234"), failure("email", "required"))]
    #[case(register("A", "not-an-email", "pw1234"), failure("email", "email"))]
    #[case(register("A", "a@x.io", ""), failure("password", "required"))]
    #[case(register("A", "a@x.io", "pw"), failure("password", "min"))]
    fn register_rules(
        validator: MemberValidator,
        #[case] dto: RegisterMemberDto,
        #[case] expected: Result<(), ValidationFailure>,
    ) {
        assert_eq!(validator.validate_register(&dto), expected);
    }

    #[rstest]
    #[case(1, Ok(()))]
    #[case(0, failure("id", "required"))]
    #[case(-4, failure("id", "gte"))]
    fn id_rules(validator: MemberValidator, #[case] id: i64, #[case] expected: Result<(), ValidationFailure>) {
        let dto = MemberIdDto { id };
        assert_eq!(validator.validate_get_by_id(&dto), expected);
        assert_eq!(validator.validate_delete(&dto), expected);
    }

    #[rstest]
    #[case("a@x.io", Ok(()))]
    #[case("", failure("email", "required"))]
    #[case("a@", failure("email", "email"))]
    fn email_lookup_rules(
        validator: MemberValidator,
        #[case] email: &str,
        #[case] expected: Result<(), ValidationFailure>,
    ) {
        let dto = MemberEmailDto {
            email: email.to_owned(),
        };
        assert_eq!(validator.validate_get_by_email(&dto), expected);
    }

    #[rstest]
    #[case(list(1, 10, "", ""), Ok(()))]
    #[case(list(3, 100, "created_at", "desc"), Ok(()))]
    #[case(list(0, 10, "", ""), failure("page", "gte"))]
    #[case(list(1, 0, "", ""), failure("limit", "range"))]
    #[case(list(1, 101, "", ""), failure("limit", "range"))]
    #[case(list(1, 10, "password", ""), failure("sort_by", "oneof"))]
    #[case(list(1, 10, "id; DROP TABLE members", ""), failure("sort_by", "oneof"))]
    #[case(list(1, 10, "id", "sideways"), failure("order_by", "oneof"))]
    #[case(list(0, 0, "bogus", "bogus"), failure("page", "gte"))]
    fn list_rules(
        validator: MemberValidator,
        #[case] dto: ListMembersDto,
        #[case] expected: Result<(), ValidationFailure>,
    ) {
        assert_eq!(validator.validate_list(&dto), expected);
    }

    #[rstest]
    #[case(None, Ok(()))]
    #[case(Some("Ada"), Ok(()))]
    #[case(Some("Al"), failure("name", "len"))]
    #[case(Some("a name that is far too long"), failure("name", "len"))]
    fn profile_rules(
        validator: MemberValidator,
        #[case] name: Option<&str>,
        #[case] expected: Result<(), ValidationFailure>,
    ) {
        let dto = UpdateProfileDto {
            id: 1,
            name: name.map(str::to_owned),
        };
        assert_eq!(validator.validate_update_profile(&dto), expected);
    }

    #[rstest]
    #[case(1, "b@x.io", "pw1234", Ok(()))]
    #[case(0, "b@x.io", "pw1234", failure("id", "required"))]
    #[case(1, "b-at-x", "pw1234", failure("new_email", "email"))]
    #[case(1, "b@x.io", "pw", failure("password", "min"))]
    fn email_change_rules(
        validator: MemberValidator,
        #[case] id: i64,
        #[case] new_email: &str,
        #[case] password: &str,
        #[case] expected: Result<(), ValidationFailure>,
    ) {
        let dto = UpdateEmailDto {
            id,
            new_email: new_email.to_owned(),
            password: password.to_owned(),
        };
        assert_eq!(validator.validate_update_email(&dto), expected);
    }

    #[rstest]
    #[case("pw1234", "pw5678", Ok(()))]
    #[case("", "pw5678", failure("old_password", "required"))]
    #[case("pw1234", "short", failure("new_password", "min"))]
    fn password_change_rules(
        validator: MemberValidator,
        #[case] old_password: &str,
        #[case] new_password: &str,
        #[case] expected: Result<(), ValidationFailure>,
    ) {
        let dto = UpdatePasswordDto {
            id: 1,
            old_password: old_password.to_owned(),
            new_password: new_password.to_owned(),
        };
        assert_eq!(validator.validate_update_password(&dto), expected);
    }

    #[rstest]
    fn failure_message_names_field_and_rule() {
        let err = ValidationFailure::new("email", "email");
        assert_eq!(err.to_string(), "field 'email' failed rule email");
    }
}

//! Conversions between the DTO tiers and the domain inputs.
//!
//! Bind DTOs become neutral DTOs here (text parameters parsed into numbers);
//! validated neutral DTOs become domain inputs.

use pagination::{DEFAULT_LIMIT, FIRST_PAGE, OrderBy, Pagination, SortBy};

use super::bind::{
    ListMembersQuery, MemberEmailPath, MemberIdPath, RegisterMemberBody, UpdateEmailBody,
    UpdatePasswordBody, UpdateProfileBody,
};
use super::dto::{
    ListMembersDto, MemberEmailDto, MemberIdDto, RegisterMemberDto, UpdateEmailDto,
    UpdatePasswordDto, UpdateProfileDto,
};
use crate::domain::{EmailChange, MemberId, NewMember, PasswordChange, ProfilePatch};
use crate::inbound::http::transport::BindError;

fn parse_integer(name: &str, raw: &str) -> Result<i64, BindError> {
    raw.trim()
        .parse()
        .map_err(|_| BindError::invalid_params(format!("{name} must be an integer")))
}

fn parse_optional(name: &str, raw: Option<&str>, default: u32) -> Result<i64, BindError> {
    match raw {
        None | Some("") => Ok(i64::from(default)),
        Some(value) => parse_integer(name, value),
    }
}

/// Registration body.
pub fn register_dto(body: RegisterMemberBody) -> RegisterMemberDto {
    RegisterMemberDto {
        name: body.name,
        email: body.email,
        password: body.password,
    }
}

/// `:id` path.
///
/// # Errors
///
/// [`BindError::InvalidParams`] when `id` is not an integer.
pub fn member_id_dto(path: &MemberIdPath) -> Result<MemberIdDto, BindError> {
    Ok(MemberIdDto {
        id: parse_integer("id", &path.id)?,
    })
}

/// `:email` path.
pub fn member_email_dto(path: MemberEmailPath) -> MemberEmailDto {
    MemberEmailDto { email: path.email }
}

/// List query; absent values take their defaults.
///
/// # Errors
///
/// [`BindError::InvalidParams`] when `page` or `limit` is not an integer.
pub fn list_dto(query: ListMembersQuery) -> Result<ListMembersDto, BindError> {
    Ok(ListMembersDto {
        page: parse_optional("page", query.page.as_deref(), FIRST_PAGE)?,
        limit: parse_optional("limit", query.limit.as_deref(), DEFAULT_LIMIT)?,
        sort_by: query.sort_by.unwrap_or_default(),
        order_by: query.order_by.unwrap_or_default(),
    })
}

/// Profile patch from its path and body.
///
/// # Errors
///
/// [`BindError::InvalidParams`] when `id` is not an integer.
pub fn update_profile_dto(
    path: &MemberIdPath,
    body: UpdateProfileBody,
) -> Result<UpdateProfileDto, BindError> {
    Ok(UpdateProfileDto {
        id: parse_integer("id", &path.id)?,
        name: body.name,
    })
}

/// Email change from its path and body.
///
/// # Errors
///
/// [`BindError::InvalidParams`] when `id` is not an integer.
pub fn update_email_dto(
    path: &MemberIdPath,
    body: UpdateEmailBody,
) -> Result<UpdateEmailDto, BindError> {
    Ok(UpdateEmailDto {
        id: parse_integer("id", &path.id)?,
        new_email: body.new_email,
        password: body.password,
    })
}

/// Password change from its path and body.
///
/// # Errors
///
/// [`BindError::InvalidParams`] when `id` is not an integer.
pub fn update_password_dto(
    path: &MemberIdPath,
    body: UpdatePasswordBody,
) -> Result<UpdatePasswordDto, BindError> {
    Ok(UpdatePasswordDto {
        id: parse_integer("id", &path.id)?,
        old_password: body.old_password,
        new_password: body.new_password,
    })
}

/// Domain input for registration.
pub fn new_member(dto: RegisterMemberDto) -> NewMember {
    NewMember {
        name: dto.name,
        email: dto.email,
        password: dto.password,
    }
}

/// Domain identifier.
pub const fn member_id(dto: MemberIdDto) -> MemberId {
    MemberId::new(dto.id)
}

/// Domain pagination for a validated list request.
///
/// # Errors
///
/// [`BindError::InvalidParams`] if the window or sort values are out of
/// range, which validation rules out.
pub fn pagination(dto: &ListMembersDto) -> Result<Pagination, BindError> {
    let page = u32::try_from(dto.page)
        .map_err(|_| BindError::invalid_params("page is out of range"))?;
    let limit = u32::try_from(dto.limit)
        .map_err(|_| BindError::invalid_params("limit is out of range"))?;
    let sort_by = SortBy::parse_or_default(&dto.sort_by)
        .map_err(|err| BindError::invalid_params(err.to_string()))?;
    let order_by = OrderBy::parse_or_default(&dto.order_by)
        .map_err(|err| BindError::invalid_params(err.to_string()))?;
    Pagination::new(page, limit, sort_by, order_by)
        .map_err(|err| BindError::invalid_params(err.to_string()))
}

/// Identifier and patch for a profile update.
pub fn profile_patch(dto: UpdateProfileDto) -> (MemberId, ProfilePatch) {
    (MemberId::new(dto.id), ProfilePatch { name: dto.name })
}

/// Domain input for an email change.
pub fn email_change(dto: UpdateEmailDto) -> EmailChange {
    EmailChange {
        id: MemberId::new(dto.id),
        new_email: dto.new_email,
        password: dto.password,
    }
}

/// Domain input for a password change.
pub fn password_change(dto: UpdatePasswordDto) -> PasswordChange {
    PasswordChange {
        id: MemberId::new(dto.id),
        old_password: dto.old_password,
        new_password: dto.new_password,
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn id_path(raw: &str) -> MemberIdPath {
        MemberIdPath { id: raw.to_owned() }
    }

    #[rstest]
    #[case("7", 7)]
    #[case(" 12 ", 12)]
    #[case("0", 0)]
    #[case("-3", -3)]
    fn ids_parse_as_integers(#[case] raw: &str, #[case] expected: i64) {
        let dto = member_id_dto(&id_path(raw)).expect("integer id");
        assert_eq!(dto.id, expected);
    }

    #[rstest]
    #[case("abc")]
    #[case("1.5")]
    #[case("")]
    fn non_integer_ids_are_bind_errors(#[case] raw: &str) {
        let err = member_id_dto(&id_path(raw)).expect_err("rejected");
        assert!(matches!(err, BindError::InvalidParams { .. }));
    }

    #[rstest]
    fn empty_list_query_takes_defaults() {
        let dto = list_dto(ListMembersQuery::default()).expect("defaults");
        assert_eq!(
            dto,
            ListMembersDto {
                page: 1,
                limit: 10,
                sort_by: String::new(),
                order_by: String::new(),
            }
        );
        let window = pagination(&dto).expect("pagination");
        assert_eq!(window, Pagination::default());
    }

    #[rstest]
    fn list_query_values_reach_pagination() {
        let query = ListMembersQuery {
            page: Some("2".to_owned()),
            limit: Some("5".to_owned()),
            sort_by: Some("email".to_owned()),
            order_by: Some("desc".to_owned()),
        };
        let dto = list_dto(query).expect("dto");
        let window = pagination(&dto).expect("pagination");

        assert_eq!(window.page(), 2);
        assert_eq!(window.limit(), 5);
        assert_eq!(window.sort_by(), SortBy::Email);
        assert_eq!(window.order_by(), OrderBy::Desc);
        assert_eq!(window.offset(), 5);
    }

    #[rstest]
    fn non_numeric_limit_is_a_bind_error() {
        let query = ListMembersQuery {
            limit: Some("ten".to_owned()),
            ..ListMembersQuery::default()
        };
        assert!(matches!(
            list_dto(query),
            Err(BindError::InvalidParams { .. })
        ));
    }

    #[rstest]
    fn email_change_keeps_every_field() {
        let body = UpdateEmailBody {
            new_email: "b@x.io".to_owned(),
            password: "pw1234".to_owned(),
        };
        let change = email_change(update_email_dto(&id_path("4"), body).expect("dto"));

        assert_eq!(change.id, MemberId::new(4));
        assert_eq!(change.new_email, "b@x.io");
        assert_eq!(change.password, "pw1234");
    }

    #[rstest]
    fn profile_patch_carries_optional_name() {
        let body = UpdateProfileBody {
            name: Some("Grace".to_owned()),
        };
        let (id, patch) = profile_patch(update_profile_dto(&id_path("9"), body).expect("dto"));

        assert_eq!(id, MemberId::new(9));
        assert_eq!(patch.name.as_deref(), Some("Grace"));
    }
}

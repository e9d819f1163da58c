//! Member domain: entities, ports and the use-case service.
//!
//! Nothing here depends on HTTP or SQL types.

pub mod error;
pub mod member;
pub mod member_service;
pub mod ports;

pub use self::error::MemberUseCaseError;
pub use self::member::{
    EmailChange, Member, MemberId, MemberPage, NewMember, PasswordChange, ProfilePatch,
};
pub use self::member_service::MemberService;

//! Inbound port: one method per member operation.

use async_trait::async_trait;
use pagination::Pagination;

use crate::domain::{
    EmailChange, Member, MemberId, MemberPage, MemberUseCaseError, NewMember, PasswordChange,
    ProfilePatch,
};
use crate::observability::RequestContext;

/// Driving port for the member feature.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MemberUseCase: Send + Sync {
    /// Create a member and return it as stored.
    async fn register(
        &self,
        ctx: &RequestContext,
        member: NewMember,
    ) -> Result<Member, MemberUseCaseError>;

    /// Fetch by id.
    async fn get_by_id(
        &self,
        ctx: &RequestContext,
        id: MemberId,
    ) -> Result<Member, MemberUseCaseError>;

    /// Fetch by email.
    async fn get_by_email(
        &self,
        ctx: &RequestContext,
        email: &str,
    ) -> Result<Member, MemberUseCaseError>;

    /// Fetch one window and the overall count.
    async fn list(
        &self,
        ctx: &RequestContext,
        pagination: Pagination,
    ) -> Result<MemberPage, MemberUseCaseError>;

    /// Apply `patch` and return the updated member.
    async fn update_profile(
        &self,
        ctx: &RequestContext,
        id: MemberId,
        patch: ProfilePatch,
    ) -> Result<Member, MemberUseCaseError>;

    /// Change the email after checking the password.
    async fn update_email(
        &self,
        ctx: &RequestContext,
        change: EmailChange,
    ) -> Result<Member, MemberUseCaseError>;

    /// Change the password after checking the old one.
    async fn update_password(
        &self,
        ctx: &RequestContext,
        change: PasswordChange,
    ) -> Result<Member, MemberUseCaseError>;

    /// Remove a member and return it as it was.
    async fn delete(
        &self,
        ctx: &RequestContext,
        id: MemberId,
    ) -> Result<Member, MemberUseCaseError>;
}

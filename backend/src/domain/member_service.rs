//! Member use cases over the gateway port.
//!
//! Every gateway failure is re-classified on the way out. The only
//! operation-dependent mapping is for [`MemberGatewayError::NoEffect`]:
//! profile updates report `NoEffect`, email and password updates report
//! `UpdateFailed`, deletes report `DeleteFailed`.

use std::sync::Arc;

use async_trait::async_trait;
use pagination::Pagination;

use crate::domain::ports::{MemberGateway, MemberGatewayError, MemberUseCase};
use crate::domain::{
    EmailChange, Member, MemberId, MemberPage, MemberUseCaseError, NewMember, PasswordChange,
    ProfilePatch,
};
use crate::observability::RequestContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NoEffectAs {
    NoEffect,
    UpdateFailed,
    DeleteFailed,
}

/// Member service implementing the driving port.
#[derive(Clone)]
pub struct MemberService<G> {
    gateway: Arc<G>,
}

impl<G> MemberService<G> {
    /// Create a service over `gateway`.
    pub fn new(gateway: Arc<G>) -> Self {
        Self { gateway }
    }
}

impl<G> MemberService<G>
where
    G: MemberGateway,
{
    fn map_gateway_error(error: MemberGatewayError, no_effect: NoEffectAs) -> MemberUseCaseError {
        match error {
            MemberGatewayError::NotFound { .. } => MemberUseCaseError::NotFound { source: error },
            MemberGatewayError::AlreadyExists { .. } => {
                MemberUseCaseError::AlreadyExists { source: error }
            }
            MemberGatewayError::NoEffect { .. } => match no_effect {
                NoEffectAs::NoEffect => MemberUseCaseError::NoEffect { source: error },
                NoEffectAs::UpdateFailed => MemberUseCaseError::UpdateFailed { source: error },
                NoEffectAs::DeleteFailed => MemberUseCaseError::DeleteFailed { source: error },
            },
            MemberGatewayError::Db { kind, .. } => MemberUseCaseError::Db {
                kind,
                source: error,
            },
            MemberGatewayError::MappingFailed { .. } => {
                MemberUseCaseError::Unexpected { source: error }
            }
        }
    }

    fn map_read_error(error: MemberGatewayError) -> MemberUseCaseError {
        Self::map_gateway_error(error, NoEffectAs::NoEffect)
    }

    async fn current(
        &self,
        ctx: &RequestContext,
        id: MemberId,
    ) -> Result<Member, MemberUseCaseError> {
        self.gateway
            .get_by_id(ctx, id)
            .await
            .map_err(Self::map_read_error)
    }

    async fn ensure_email_free(
        &self,
        ctx: &RequestContext,
        email: &str,
    ) -> Result<(), MemberUseCaseError> {
        match self.gateway.get_by_email(ctx, email).await {
            Ok(_) => Err(MemberUseCaseError::EmailAlreadyExists),
            Err(MemberGatewayError::NotFound { .. }) => Ok(()),
            Err(error) => Err(Self::map_read_error(error)),
        }
    }
}

#[async_trait]
impl<G> MemberUseCase for MemberService<G>
where
    G: MemberGateway,
{
    async fn register(
        &self,
        ctx: &RequestContext,
        member: NewMember,
    ) -> Result<Member, MemberUseCaseError> {
        self.gateway
            .create(ctx, &member)
            .await
            .map_err(Self::map_read_error)?;
        self.gateway
            .get_by_email(ctx, &member.email)
            .await
            .map_err(Self::map_read_error)
    }

    async fn get_by_id(
        &self,
        ctx: &RequestContext,
        id: MemberId,
    ) -> Result<Member, MemberUseCaseError> {
        self.current(ctx, id).await
    }

    async fn get_by_email(
        &self,
        ctx: &RequestContext,
        email: &str,
    ) -> Result<Member, MemberUseCaseError> {
        self.gateway
            .get_by_email(ctx, email)
            .await
            .map_err(Self::map_read_error)
    }

    async fn list(
        &self,
        ctx: &RequestContext,
        pagination: Pagination,
    ) -> Result<MemberPage, MemberUseCaseError> {
        let members = self
            .gateway
            .get_all(ctx, &pagination)
            .await
            .map_err(Self::map_read_error)?;
        let total = self
            .gateway
            .count_all(ctx)
            .await
            .map_err(Self::map_read_error)?;
        Ok(MemberPage { members, total })
    }

    async fn update_profile(
        &self,
        ctx: &RequestContext,
        id: MemberId,
        patch: ProfilePatch,
    ) -> Result<Member, MemberUseCaseError> {
        let mut member = self.current(ctx, id).await?;
        patch.apply(&mut member);
        self.gateway
            .update_profile(ctx, &member)
            .await
            .map_err(|error| Self::map_gateway_error(error, NoEffectAs::NoEffect))?;
        self.current(ctx, id).await
    }

    async fn update_email(
        &self,
        ctx: &RequestContext,
        change: EmailChange,
    ) -> Result<Member, MemberUseCaseError> {
        let member = self.current(ctx, change.id).await?;
        if !member.password_matches(&change.password) {
            return Err(MemberUseCaseError::PasswordIncorrect);
        }
        if member.email == change.new_email {
            return Err(MemberUseCaseError::UpdateSameEmail);
        }
        self.ensure_email_free(ctx, &change.new_email).await?;
        self.gateway
            .update_email(ctx, change.id, &change.new_email)
            .await
            .map_err(|error| match error {
                MemberGatewayError::AlreadyExists { .. } => MemberUseCaseError::EmailAlreadyExists,
                other => Self::map_gateway_error(other, NoEffectAs::UpdateFailed),
            })?;
        self.current(ctx, change.id).await
    }

    async fn update_password(
        &self,
        ctx: &RequestContext,
        change: PasswordChange,
    ) -> Result<Member, MemberUseCaseError> {
        let member = self.current(ctx, change.id).await?;
        if !member.password_matches(&change.old_password) {
            return Err(MemberUseCaseError::PasswordIncorrect);
        }
        if change.new_password == change.old_password {
            return Err(MemberUseCaseError::UpdateSamePassword);
        }
        self.gateway
            .update_password(ctx, change.id, &change.new_password)
            .await
            .map_err(|error| Self::map_gateway_error(error, NoEffectAs::UpdateFailed))?;
        self.current(ctx, change.id).await
    }

    async fn delete(
        &self,
        ctx: &RequestContext,
        id: MemberId,
    ) -> Result<Member, MemberUseCaseError> {
        let member = self.current(ctx, id).await?;
        self.gateway
            .delete(ctx, id)
            .await
            .map_err(|error| Self::map_gateway_error(error, NoEffectAs::DeleteFailed))?;
        Ok(member)
    }
}

#[cfg(test)]
#[path = "member_service_tests.rs"]
mod tests;

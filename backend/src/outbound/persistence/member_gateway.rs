//! [`MemberGateway`] adapter over a [`MemberDao`].
//!
//! Maps entities to records and back, and re-classifies every DAO failure
//! into the gateway taxonomy with the DAO error kept as `source()`.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pagination::Pagination;

use crate::domain::ports::{DbFailure, MemberGateway, MemberGatewayError};
use crate::domain::{Member, MemberId, NewMember};
use crate::observability::RequestContext;

use super::member_dao::{DaoError, DaoErrorKind, MemberDao, MemberRecord, NewMemberRecord};

/// Gateway that delegates storage to a DAO.
pub struct DaoMemberGateway<D> {
    dao: Arc<D>,
}

impl<D> DaoMemberGateway<D> {
    /// Wrap `dao`.
    pub fn new(dao: Arc<D>) -> Self {
        Self { dao }
    }
}

fn map_dao_error(error: DaoError) -> MemberGatewayError {
    let classified = match error.kind() {
        DaoErrorKind::RecordNotFound => MemberGatewayError::not_found(),
        DaoErrorKind::DuplicateKey => MemberGatewayError::already_exists(),
        DaoErrorKind::NoEffect => MemberGatewayError::no_effect(),
        DaoErrorKind::ConnectionClosed => MemberGatewayError::db(DbFailure::ConnectionClosed),
        DaoErrorKind::TransactionDone => MemberGatewayError::db(DbFailure::TransactionDone),
        DaoErrorKind::ContextTimeout => MemberGatewayError::db(DbFailure::Timeout),
        DaoErrorKind::ContextCanceled => MemberGatewayError::db(DbFailure::Canceled),
        DaoErrorKind::UnknownDbError => MemberGatewayError::db(DbFailure::Other),
    };
    classified.caused_by(error)
}

fn record_to_member(record: MemberRecord) -> Result<Member, MemberGatewayError> {
    let created_at = DateTime::parse_from_rfc3339(&record.created_at)
        .map_err(|err| {
            MemberGatewayError::mapping_failed(format!(
                "created_at {:?} of member {}: {err}",
                record.created_at, record.id
            ))
        })?
        .with_timezone(&Utc);
    Ok(Member {
        id: MemberId::new(record.id),
        name: record.name,
        email: record.email,
        password: record.password,
        created_at,
    })
}

fn new_member_to_record(member: &NewMember) -> NewMemberRecord {
    NewMemberRecord {
        name: member.name.clone(),
        email: member.email.clone(),
        password: member.password.clone(),
    }
}

#[async_trait]
impl<D> MemberGateway for DaoMemberGateway<D>
where
    D: MemberDao,
{
    async fn create(
        &self,
        ctx: &RequestContext,
        member: &NewMember,
    ) -> Result<(), MemberGatewayError> {
        self.dao
            .create(ctx, &new_member_to_record(member))
            .await
            .map_err(map_dao_error)
    }

    async fn get_by_id(
        &self,
        ctx: &RequestContext,
        id: MemberId,
    ) -> Result<Member, MemberGatewayError> {
        let record = self
            .dao
            .get_by_id(ctx, id.get())
            .await
            .map_err(map_dao_error)?;
        record_to_member(record)
    }

    async fn get_by_email(
        &self,
        ctx: &RequestContext,
        email: &str,
    ) -> Result<Member, MemberGatewayError> {
        let record = self
            .dao
            .get_by_email(ctx, email)
            .await
            .map_err(map_dao_error)?;
        record_to_member(record)
    }

    async fn get_all(
        &self,
        ctx: &RequestContext,
        pagination: &Pagination,
    ) -> Result<Vec<Member>, MemberGatewayError> {
        self.dao
            .get_all(ctx, pagination)
            .await
            .map_err(map_dao_error)?
            .into_iter()
            .map(record_to_member)
            .collect()
    }

    async fn count_all(&self, ctx: &RequestContext) -> Result<u64, MemberGatewayError> {
        self.dao.count_all(ctx).await.map_err(map_dao_error)
    }

    async fn update_profile(
        &self,
        ctx: &RequestContext,
        member: &Member,
    ) -> Result<(), MemberGatewayError> {
        self.dao
            .update_profile(ctx, member.id.get(), &member.name)
            .await
            .map_err(map_dao_error)
    }

    async fn update_email(
        &self,
        ctx: &RequestContext,
        id: MemberId,
        email: &str,
    ) -> Result<(), MemberGatewayError> {
        self.dao
            .update_email(ctx, id.get(), email)
            .await
            .map_err(map_dao_error)
    }

    async fn update_password(
        &self,
        ctx: &RequestContext,
        id: MemberId,
        password: &str,
    ) -> Result<(), MemberGatewayError> {
        self.dao
            .update_password(ctx, id.get(), password)
            .await
            .map_err(map_dao_error)
    }

    async fn delete(&self, ctx: &RequestContext, id: MemberId) -> Result<(), MemberGatewayError> {
        self.dao.delete(ctx, id.get()).await.map_err(map_dao_error)
    }
}

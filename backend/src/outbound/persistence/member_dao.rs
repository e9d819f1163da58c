//! Narrow, operation-typed persistence interface for members.
//!
//! The DAO owns SQL and error classification. It exchanges
//! [`MemberRecord`]s, whose `created_at` is an RFC 3339 string; parsing it
//! back is the gateway's job.

use std::fmt;

use async_trait::async_trait;
use pagination::Pagination;
use thiserror::Error;

use crate::domain::ports::BoxError;
use crate::observability::RequestContext;

/// Stored member as the DAO sees it.
#[derive(Clone, PartialEq, Eq)]
pub struct MemberRecord {
    /// Primary key.
    pub id: i64,
    /// Display name.
    pub name: String,
    /// Unique contact address.
    pub email: String,
    /// Opaque credential.
    pub password: String,
    /// RFC 3339 creation instant.
    pub created_at: String,
}

impl fmt::Debug for MemberRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemberRecord")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("email", &self.email)
            .field("created_at", &self.created_at)
            .finish_non_exhaustive()
    }
}

/// Insert payload.
#[derive(Clone, PartialEq, Eq)]
pub struct NewMemberRecord {
    /// Display name.
    pub name: String,
    /// Contact address.
    pub email: String,
    /// Opaque credential.
    pub password: String,
}

impl fmt::Debug for NewMemberRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewMemberRecord")
            .field("name", &self.name)
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

/// Classified storage failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DaoErrorKind {
    /// The query matched no row.
    RecordNotFound,
    /// A unique constraint rejected the write.
    DuplicateKey,
    /// The connection was closed or unavailable.
    ConnectionClosed,
    /// The transaction had already completed.
    TransactionDone,
    /// The request deadline elapsed.
    ContextTimeout,
    /// The request was cancelled.
    ContextCanceled,
    /// A mutation affected an unexpected number of rows.
    NoEffect,
    /// Anything else.
    UnknownDbError,
}

impl fmt::Display for DaoErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::RecordNotFound => "record not found",
            Self::DuplicateKey => "duplicate key",
            Self::ConnectionClosed => "connection closed",
            Self::TransactionDone => "transaction already done",
            Self::ContextTimeout => "context deadline exceeded",
            Self::ContextCanceled => "context canceled",
            Self::NoEffect => "no rows affected",
            Self::UnknownDbError => "unknown database error",
        })
    }
}

/// DAO failure: a kind plus the original error.
#[derive(Debug, Error)]
#[error("{kind}")]
pub struct DaoError {
    kind: DaoErrorKind,
    #[source]
    source: Option<BoxError>,
}

impl DaoError {
    /// Error of `kind` with no recorded cause.
    #[must_use]
    pub const fn new(kind: DaoErrorKind) -> Self {
        Self { kind, source: None }
    }

    /// Attach the original error.
    #[must_use]
    pub fn with_source(mut self, source: impl Into<BoxError>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Classified kind.
    #[must_use]
    pub const fn kind(&self) -> DaoErrorKind {
        self.kind
    }

    /// Split into kind and cause.
    #[must_use]
    pub fn into_parts(self) -> (DaoErrorKind, Option<BoxError>) {
        (self.kind, self.source)
    }
}

/// Member persistence operations.
///
/// Mutations expect exactly one affected row and report
/// [`DaoErrorKind::NoEffect`] otherwise.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MemberDao: Send + Sync {
    /// Insert a member.
    async fn create(&self, ctx: &RequestContext, record: &NewMemberRecord)
    -> Result<(), DaoError>;

    /// Fetch by primary key.
    async fn get_by_id(&self, ctx: &RequestContext, id: i64) -> Result<MemberRecord, DaoError>;

    /// Fetch by email.
    async fn get_by_email(
        &self,
        ctx: &RequestContext,
        email: &str,
    ) -> Result<MemberRecord, DaoError>;

    /// Fetch one ordered window.
    async fn get_all(
        &self,
        ctx: &RequestContext,
        pagination: &Pagination,
    ) -> Result<Vec<MemberRecord>, DaoError>;

    /// Count every row.
    async fn count_all(&self, ctx: &RequestContext) -> Result<u64, DaoError>;

    /// Set `name` for `id`.
    async fn update_profile(
        &self,
        ctx: &RequestContext,
        id: i64,
        name: &str,
    ) -> Result<(), DaoError>;

    /// Set `email` for `id`.
    async fn update_email(&self, ctx: &RequestContext, id: i64, email: &str)
    -> Result<(), DaoError>;

    /// Set `password` for `id`.
    async fn update_password(
        &self,
        ctx: &RequestContext,
        id: i64,
        password: &str,
    ) -> Result<(), DaoError>;

    /// Delete `id`.
    async fn delete(&self, ctx: &RequestContext, id: i64) -> Result<(), DaoError>;
}

//! Outbound persistence port for members.
//!
//! The gateway speaks entities, never storage records. Adapters classify
//! storage failures into [`MemberGatewayError`] and keep the original error
//! reachable through `source()`.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use mockable::{Clock, DefaultClock};
use pagination::{OrderBy, Pagination, SortBy};
use thiserror::Error;

use crate::domain::{Member, MemberId, NewMember};
use crate::observability::{ContextError, RequestContext};

/// Boxed lower-layer cause.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Storage failure classes that are not about the member itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbFailure {
    /// The request deadline elapsed.
    Timeout,
    /// The request was cancelled.
    Canceled,
    /// The connection was closed or could not be obtained.
    ConnectionClosed,
    /// The transaction had already completed.
    TransactionDone,
    /// Anything else.
    Other,
}

impl DbFailure {
    /// Whether the request context ended the call.
    #[must_use]
    pub const fn is_context_ended(self) -> bool {
        matches!(self, Self::Timeout | Self::Canceled)
    }
}

impl fmt::Display for DbFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Timeout => "deadline exceeded",
            Self::Canceled => "canceled",
            Self::ConnectionClosed => "connection closed",
            Self::TransactionDone => "transaction already done",
            Self::Other => "database error",
        })
    }
}

impl From<ContextError> for DbFailure {
    fn from(value: ContextError) -> Self {
        match value {
            ContextError::DeadlineExceeded => Self::Timeout,
            ContextError::Canceled => Self::Canceled,
        }
    }
}

/// Errors raised by member gateway adapters.
#[derive(Debug, Error)]
pub enum MemberGatewayError {
    /// No member matched.
    #[error("member not found")]
    NotFound {
        /// Storage-level cause.
        #[source]
        source: Option<BoxError>,
    },
    /// A uniqueness constraint rejected the write.
    #[error("member already exists")]
    AlreadyExists {
        /// Storage-level cause.
        #[source]
        source: Option<BoxError>,
    },
    /// The write affected no rows.
    #[error("member write had no effect")]
    NoEffect {
        /// Storage-level cause.
        #[source]
        source: Option<BoxError>,
    },
    /// The store failed.
    #[error("member store failed: {kind}")]
    Db {
        /// Failure class.
        kind: DbFailure,
        /// Storage-level cause.
        #[source]
        source: Option<BoxError>,
    },
    /// A stored record could not be turned into an entity.
    #[error("member record could not be mapped: {message}")]
    MappingFailed {
        /// What was wrong with the record.
        message: String,
    },
}

impl MemberGatewayError {
    /// No member matched.
    #[must_use]
    pub const fn not_found() -> Self {
        Self::NotFound { source: None }
    }

    /// A uniqueness constraint rejected the write.
    #[must_use]
    pub const fn already_exists() -> Self {
        Self::AlreadyExists { source: None }
    }

    /// The write affected no rows.
    #[must_use]
    pub const fn no_effect() -> Self {
        Self::NoEffect { source: None }
    }

    /// The store failed.
    #[must_use]
    pub const fn db(kind: DbFailure) -> Self {
        Self::Db { kind, source: None }
    }

    /// A record could not be mapped.
    pub fn mapping_failed(message: impl Into<String>) -> Self {
        Self::MappingFailed {
            message: message.into(),
        }
    }

    /// Attach the lower-layer cause.
    #[must_use]
    pub fn caused_by(mut self, cause: impl Into<BoxError>) -> Self {
        match &mut self {
            Self::NotFound { source }
            | Self::AlreadyExists { source }
            | Self::NoEffect { source }
            | Self::Db { source, .. } => *source = Some(cause.into()),
            Self::MappingFailed { .. } => {}
        }
        self
    }
}

/// Port for member storage.
///
/// Every method takes the request context; adapters abandon work once it
/// ends and report [`DbFailure::Timeout`] or [`DbFailure::Canceled`].
/// Mutations report [`MemberGatewayError::NoEffect`] when no row changed.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MemberGateway: Send + Sync {
    /// Insert a member. The stored id is not returned; read it back by email.
    async fn create(
        &self,
        ctx: &RequestContext,
        member: &NewMember,
    ) -> Result<(), MemberGatewayError>;

    /// Fetch by id.
    async fn get_by_id(
        &self,
        ctx: &RequestContext,
        id: MemberId,
    ) -> Result<Member, MemberGatewayError>;

    /// Fetch by email.
    async fn get_by_email(
        &self,
        ctx: &RequestContext,
        email: &str,
    ) -> Result<Member, MemberGatewayError>;

    /// Fetch one ordered window.
    async fn get_all(
        &self,
        ctx: &RequestContext,
        pagination: &Pagination,
    ) -> Result<Vec<Member>, MemberGatewayError>;

    /// Count every member.
    async fn count_all(&self, ctx: &RequestContext) -> Result<u64, MemberGatewayError>;

    /// Persist `member.name`.
    async fn update_profile(
        &self,
        ctx: &RequestContext,
        member: &Member,
    ) -> Result<(), MemberGatewayError>;

    /// Replace the email of `id`.
    async fn update_email(
        &self,
        ctx: &RequestContext,
        id: MemberId,
        email: &str,
    ) -> Result<(), MemberGatewayError>;

    /// Replace the password of `id`.
    async fn update_password(
        &self,
        ctx: &RequestContext,
        id: MemberId,
        password: &str,
    ) -> Result<(), MemberGatewayError>;

    /// Remove `id`.
    async fn delete(&self, ctx: &RequestContext, id: MemberId) -> Result<(), MemberGatewayError>;
}

#[derive(Default)]
struct FixtureState {
    last_id: i64,
    members: BTreeMap<MemberId, Member>,
}

/// In-memory gateway with the same observable rules as the database adapter.
///
/// Ids start at 1, emails are unique and mutations of a missing id report
/// [`MemberGatewayError::NoEffect`].
pub struct FixtureMemberGateway {
    state: Mutex<FixtureState>,
    clock: Arc<dyn Clock>,
}

impl Default for FixtureMemberGateway {
    fn default() -> Self {
        Self::new(Arc::new(DefaultClock))
    }
}

impl FixtureMemberGateway {
    /// Empty store stamping `created_at` from `clock`.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Mutex::new(FixtureState::default()),
            clock,
        }
    }

    fn with_state<T>(
        &self,
        ctx: &RequestContext,
        f: impl FnOnce(&mut FixtureState) -> Result<T, MemberGatewayError>,
    ) -> Result<T, MemberGatewayError> {
        if let Some(err) = ctx.err() {
            return Err(MemberGatewayError::db(err.into()).caused_by(err));
        }
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut state)
    }
}

impl FixtureState {
    fn email_owner(&self, email: &str) -> Option<MemberId> {
        self.members
            .values()
            .find(|member| member.email == email)
            .map(|member| member.id)
    }

    fn existing(&mut self, id: MemberId) -> Result<&mut Member, MemberGatewayError> {
        self.members
            .get_mut(&id)
            .ok_or_else(MemberGatewayError::no_effect)
    }
}

fn compare(sort_by: SortBy, a: &Member, b: &Member) -> std::cmp::Ordering {
    let primary = match sort_by {
        SortBy::Id => a.id.cmp(&b.id),
        SortBy::Name => a.name.cmp(&b.name),
        SortBy::Email => a.email.cmp(&b.email),
        SortBy::CreatedAt => a.created_at.cmp(&b.created_at),
    };
    primary.then_with(|| a.id.cmp(&b.id))
}

#[async_trait]
impl MemberGateway for FixtureMemberGateway {
    async fn create(
        &self,
        ctx: &RequestContext,
        member: &NewMember,
    ) -> Result<(), MemberGatewayError> {
        let created_at = self.clock.utc();
        self.with_state(ctx, |state| {
            if state.email_owner(&member.email).is_some() {
                return Err(MemberGatewayError::already_exists());
            }
            state.last_id += 1;
            let id = MemberId::new(state.last_id);
            state.members.insert(
                id,
                Member {
                    id,
                    name: member.name.clone(),
                    email: member.email.clone(),
                    password: member.password.clone(),
                    created_at,
                },
            );
            Ok(())
        })
    }

    async fn get_by_id(
        &self,
        ctx: &RequestContext,
        id: MemberId,
    ) -> Result<Member, MemberGatewayError> {
        self.with_state(ctx, |state| {
            state
                .members
                .get(&id)
                .cloned()
                .ok_or_else(MemberGatewayError::not_found)
        })
    }

    async fn get_by_email(
        &self,
        ctx: &RequestContext,
        email: &str,
    ) -> Result<Member, MemberGatewayError> {
        self.with_state(ctx, |state| {
            state
                .members
                .values()
                .find(|member| member.email == email)
                .cloned()
                .ok_or_else(MemberGatewayError::not_found)
        })
    }

    async fn get_all(
        &self,
        ctx: &RequestContext,
        pagination: &Pagination,
    ) -> Result<Vec<Member>, MemberGatewayError> {
        self.with_state(ctx, |state| {
            let mut members: Vec<Member> = state.members.values().cloned().collect();
            members.sort_by(|a, b| compare(pagination.sort_by(), a, b));
            if pagination.order_by() == OrderBy::Desc {
                members.reverse();
            }
            let skip = usize::try_from(pagination.offset()).unwrap_or(usize::MAX);
            let take = usize::try_from(pagination.limit()).unwrap_or(usize::MAX);
            Ok(members.into_iter().skip(skip).take(take).collect())
        })
    }

    async fn count_all(&self, ctx: &RequestContext) -> Result<u64, MemberGatewayError> {
        self.with_state(ctx, |state| Ok(state.members.len() as u64))
    }

    async fn update_profile(
        &self,
        ctx: &RequestContext,
        member: &Member,
    ) -> Result<(), MemberGatewayError> {
        self.with_state(ctx, |state| {
            state.existing(member.id)?.name.clone_from(&member.name);
            Ok(())
        })
    }

    async fn update_email(
        &self,
        ctx: &RequestContext,
        id: MemberId,
        email: &str,
    ) -> Result<(), MemberGatewayError> {
        self.with_state(ctx, |state| {
            if state.email_owner(email).is_some_and(|owner| owner != id) {
                return Err(MemberGatewayError::already_exists());
            }
            email.clone_into(&mut state.existing(id)?.email);
            Ok(())
        })
    }

    async fn update_password(
        &self,
        ctx: &RequestContext,
        id: MemberId,
        password: &str,
    ) -> Result<(), MemberGatewayError> {
        self.with_state(ctx, |state| {
            password.clone_into(&mut state.existing(id)?.password);
            Ok(())
        })
    }

    async fn delete(&self, ctx: &RequestContext, id: MemberId) -> Result<(), MemberGatewayError> {
        self.with_state(ctx, |state| {
            state
                .members
                .remove(&id)
                .map(|_| ())
                .ok_or_else(MemberGatewayError::no_effect)
        })
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use rstest::{fixture, rstest};

    use super::*;

    #[fixture]
    fn gateway() -> FixtureMemberGateway {
        FixtureMemberGateway::default()
    }

    fn new_member(name: &str, email: &str) -> NewMember {
        NewMember {
            name: name.to_owned(),
            email: email.to_owned(),
            password: "secret1".to_owned(),
        }
    }

    async fn seed(gateway: &FixtureMemberGateway, rows: &[(&str, &str)]) {
        let ctx = RequestContext::background();
        for (name, email) in rows {
            gateway
                .create(&ctx, &new_member(name, email))
                .await
                .expect("seed member");
        }
    }

    #[rstest]
    #[tokio::test]
    async fn create_assigns_sequential_ids(gateway: FixtureMemberGateway) {
        seed(&gateway, &[("A", "a@x.io"), ("B", "b@x.io")]).await;
        let ctx = RequestContext::background();

        let second = gateway.get_by_email(&ctx, "b@x.io").await.expect("lookup");

        assert_eq!(second.id, MemberId::new(2));
    }

    #[rstest]
    #[tokio::test]
    async fn duplicate_email_is_rejected(gateway: FixtureMemberGateway) {
        seed(&gateway, &[("A", "a@x.io")]).await;
        let ctx = RequestContext::background();

        let err = gateway
            .create(&ctx, &new_member("A2", "a@x.io"))
            .await
            .expect_err("duplicate");

        assert!(matches!(err, MemberGatewayError::AlreadyExists { .. }));
    }

    #[rstest]
    #[case(SortBy::Name, OrderBy::Asc, &["A", "B", "C"])]
    #[case(SortBy::Name, OrderBy::Desc, &["C", "B", "A"])]
    #[case(SortBy::Email, OrderBy::Asc, &["B", "C", "A"])]
    #[case(SortBy::Id, OrderBy::Asc, &["B", "A", "C"])]
    #[tokio::test]
    async fn get_all_orders_by_closed_keys(
        gateway: FixtureMemberGateway,
        #[case] sort_by: SortBy,
        #[case] order_by: OrderBy,
        #[case] expected: &[&str],
    ) {
        seed(&gateway, &[("B", "a@x.io"), ("A", "z@x.io"), ("C", "m@x.io")]).await;
        let ctx = RequestContext::background();
        let window = Pagination::new(1, 10, sort_by, order_by).expect("window");

        let names: Vec<String> = gateway
            .get_all(&ctx, &window)
            .await
            .expect("list")
            .into_iter()
            .map(|member| member.name)
            .collect();

        assert_eq!(names, expected);
    }

    #[rstest]
    #[tokio::test]
    async fn window_past_the_end_is_empty(gateway: FixtureMemberGateway) {
        seed(&gateway, &[("A", "a@x.io"), ("B", "b@x.io")]).await;
        let ctx = RequestContext::background();
        let window = Pagination::new(3, 1, SortBy::Id, OrderBy::Asc).expect("window");

        let members = gateway.get_all(&ctx, &window).await.expect("list");

        assert!(members.is_empty());
        assert_eq!(gateway.count_all(&ctx).await.expect("count"), 2);
    }

    #[rstest]
    #[tokio::test]
    async fn mutations_of_missing_ids_have_no_effect(gateway: FixtureMemberGateway) {
        let ctx = RequestContext::background();
        let id = MemberId::new(9);

        let delete = gateway.delete(&ctx, id).await.expect_err("delete");
        let password = gateway
            .update_password(&ctx, id, "changed1")
            .await
            .expect_err("password");

        assert!(matches!(delete, MemberGatewayError::NoEffect { .. }));
        assert!(matches!(password, MemberGatewayError::NoEffect { .. }));
    }

    #[rstest]
    #[tokio::test]
    async fn cancelled_context_reports_db_failure(gateway: FixtureMemberGateway) {
        let (ctx, handle) = RequestContext::background().with_cancel();
        handle.cancel();

        let err = gateway.count_all(&ctx).await.expect_err("cancelled");

        assert!(matches!(
            err,
            MemberGatewayError::Db {
                kind: DbFailure::Canceled,
                ..
            }
        ));
        assert!(err.source().is_some());
    }
}

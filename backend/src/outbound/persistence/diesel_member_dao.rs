//! PostgreSQL-backed [`MemberDao`] using Diesel.
//!
//! Every call opens a tracer span named after the operation, races its I/O
//! against the request context and logs the outcome with the key arguments
//! and elapsed milliseconds: Debug on success, Error with the cause on
//! failure. Ordering comes only from the closed `SortBy`/`OrderBy` enums.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use pagination::{OrderBy, Pagination, SortBy};
use tracing::Instrument as _;

use crate::observability::{Field, Logger, RequestContext, Tracer};

use super::member_dao::{DaoError, MemberDao, MemberRecord, NewMemberRecord};
use super::models::{MemberRow, NewMemberRow};
use super::pool::DbPool;
use super::schema::members;
use super::sql_error::{
    classify_context_error, classify_diesel_error, classify_pool_error, expect_deleted,
    expect_updated,
};

type BoxedMemberQuery<'a> = members::BoxedQuery<'a, diesel::pg::Pg>;

/// Diesel implementation of the member DAO.
#[derive(Clone)]
pub struct DieselMemberDao {
    pool: DbPool,
    logger: Arc<dyn Logger>,
    tracer: Tracer,
}

impl DieselMemberDao {
    /// Create a DAO over `pool`.
    pub fn new(pool: DbPool, logger: Arc<dyn Logger>, tracer: Tracer) -> Self {
        Self {
            pool,
            logger,
            tracer,
        }
    }

    async fn observe<T, F>(
        &self,
        ctx: &RequestContext,
        operation: &'static str,
        mut fields: Vec<Field>,
        work: F,
    ) -> Result<T, DaoError>
    where
        F: Future<Output = Result<T, DaoError>> + Send,
        T: Send,
    {
        let (span_ctx, span) = self.tracer.start(ctx, operation);
        let started = Instant::now();
        let instrumented = work.instrument(span.tracing_span().clone());
        let result = match span_ctx.run(instrumented).await {
            Ok(outcome) => outcome,
            Err(ended) => Err(classify_context_error(ended)),
        };

        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        fields.push(Field::new("operation", operation));
        fields.push(Field::new("elapsed_ms", elapsed_ms));
        let logger = self.logger.with_context(&span_ctx);
        match &result {
            Ok(_) => logger.debug("dao call succeeded", &fields),
            Err(error) => {
                fields.push(Field::error(error));
                logger.error("dao call failed", &fields);
            }
        }
        span.end();
        result
    }
}

fn ordered(query: BoxedMemberQuery<'_>, sort_by: SortBy, order_by: OrderBy) -> BoxedMemberQuery<'_> {
    let query = match (sort_by, order_by) {
        (SortBy::Id, OrderBy::Asc) => query.order(members::id.asc()),
        (SortBy::Id, OrderBy::Desc) => query.order(members::id.desc()),
        (SortBy::Name, OrderBy::Asc) => query.order(members::name.asc()),
        (SortBy::Name, OrderBy::Desc) => query.order(members::name.desc()),
        (SortBy::Email, OrderBy::Asc) => query.order(members::email.asc()),
        (SortBy::Email, OrderBy::Desc) => query.order(members::email.desc()),
        (SortBy::CreatedAt, OrderBy::Asc) => query.order(members::created_at.asc()),
        (SortBy::CreatedAt, OrderBy::Desc) => query.order(members::created_at.desc()),
    };
    match order_by {
        OrderBy::Asc => query.then_order_by(members::id.asc()),
        OrderBy::Desc => query.then_order_by(members::id.desc()),
    }
}

#[async_trait]
impl MemberDao for DieselMemberDao {
    async fn create(
        &self,
        ctx: &RequestContext,
        record: &NewMemberRecord,
    ) -> Result<(), DaoError> {
        let fields = vec![Field::new("email", record.email.as_str())];
        self.observe(ctx, "member.create", fields, async {
            let mut conn = self.pool.get().await.map_err(classify_pool_error)?;
            diesel::insert_into(members::table)
                .values(NewMemberRow::from(record))
                .execute(&mut conn)
                .await
                .map(|_| ())
                .map_err(classify_diesel_error)
        })
        .await
    }

    async fn get_by_id(&self, ctx: &RequestContext, id: i64) -> Result<MemberRecord, DaoError> {
        self.observe(ctx, "member.get_by_id", vec![Field::new("id", id)], async {
            let mut conn = self.pool.get().await.map_err(classify_pool_error)?;
            members::table
                .find(id)
                .select(MemberRow::as_select())
                .first(&mut conn)
                .await
                .map(MemberRecord::from)
                .map_err(classify_diesel_error)
        })
        .await
    }

    async fn get_by_email(
        &self,
        ctx: &RequestContext,
        email: &str,
    ) -> Result<MemberRecord, DaoError> {
        let fields = vec![Field::new("email", email)];
        self.observe(ctx, "member.get_by_email", fields, async {
            let mut conn = self.pool.get().await.map_err(classify_pool_error)?;
            members::table
                .filter(members::email.eq(email))
                .select(MemberRow::as_select())
                .first(&mut conn)
                .await
                .map(MemberRecord::from)
                .map_err(classify_diesel_error)
        })
        .await
    }

    async fn get_all(
        &self,
        ctx: &RequestContext,
        pagination: &Pagination,
    ) -> Result<Vec<MemberRecord>, DaoError> {
        let fields = vec![
            Field::new("page", pagination.page()),
            Field::new("limit", pagination.limit()),
            Field::new("sort_by", pagination.sort_by().as_str()),
            Field::new("order_by", pagination.order_by().as_str()),
        ];
        let limit = i64::from(pagination.limit());
        let offset = i64::try_from(pagination.offset()).unwrap_or(i64::MAX);
        self.observe(ctx, "member.get_all", fields, async {
            let mut conn = self.pool.get().await.map_err(classify_pool_error)?;
            ordered(
                members::table.into_boxed(),
                pagination.sort_by(),
                pagination.order_by(),
            )
            .select(MemberRow::as_select())
            .limit(limit)
            .offset(offset)
            .load::<MemberRow>(&mut conn)
            .await
            .map(|rows| rows.into_iter().map(MemberRecord::from).collect())
            .map_err(classify_diesel_error)
        })
        .await
    }

    async fn count_all(&self, ctx: &RequestContext) -> Result<u64, DaoError> {
        self.observe(ctx, "member.count_all", Vec::new(), async {
            let mut conn = self.pool.get().await.map_err(classify_pool_error)?;
            members::table
                .count()
                .get_result::<i64>(&mut conn)
                .await
                .map(|count| u64::try_from(count).unwrap_or_default())
                .map_err(classify_diesel_error)
        })
        .await
    }

    async fn update_profile(
        &self,
        ctx: &RequestContext,
        id: i64,
        name: &str,
    ) -> Result<(), DaoError> {
        self.observe(ctx, "member.update_profile", vec![Field::new("id", id)], async {
            let mut conn = self.pool.get().await.map_err(classify_pool_error)?;
            let rows = diesel::update(members::table.find(id))
                .set(members::name.eq(name))
                .execute(&mut conn)
                .await
                .map_err(classify_diesel_error)?;
            expect_updated(rows)
        })
        .await
    }

    async fn update_email(
        &self,
        ctx: &RequestContext,
        id: i64,
        email: &str,
    ) -> Result<(), DaoError> {
        let fields = vec![Field::new("id", id), Field::new("email", email)];
        self.observe(ctx, "member.update_email", fields, async {
            let mut conn = self.pool.get().await.map_err(classify_pool_error)?;
            let rows = diesel::update(members::table.find(id))
                .set(members::email.eq(email))
                .execute(&mut conn)
                .await
                .map_err(classify_diesel_error)?;
            expect_updated(rows)
        })
        .await
    }

    async fn update_password(
        &self,
        ctx: &RequestContext,
        id: i64,
        password: &str,
    ) -> Result<(), DaoError> {
        self.observe(ctx, "member.update_password", vec![Field::new("id", id)], async {
            let mut conn = self.pool.get().await.map_err(classify_pool_error)?;
            let rows = diesel::update(members::table.find(id))
                .set(members::password.eq(password))
                .execute(&mut conn)
                .await
                .map_err(classify_diesel_error)?;
            expect_updated(rows)
        })
        .await
    }

    async fn delete(&self, ctx: &RequestContext, id: i64) -> Result<(), DaoError> {
        self.observe(ctx, "member.delete", vec![Field::new("id", id)], async {
            let mut conn = self.pool.get().await.map_err(classify_pool_error)?;
            let rows = diesel::delete(members::table.find(id))
                .execute(&mut conn)
                .await
                .map_err(classify_diesel_error)?;
            expect_deleted(rows)
        })
        .await
    }
}

//! Member HTTP handlers.
//!
//! Each handler binds, validates, calls the use case and presents, in that
//! order, then writes exactly one envelope. Handlers see only
//! [`HttpContext`], never a framework type.

use std::sync::Arc;
use std::time::Instant;

use tracing::Instrument as _;

use super::error::RequestError;
use super::mapper;
use super::presenter::{MemberPresenter, Presented};
use super::validator::MemberValidator;
use crate::domain::ports::MemberUseCase;
use crate::inbound::http::transport::{BindExt as _, HttpContext};
use crate::observability::{Field, Logger, RequestContext, Span, Tracer};

type Outcome = Result<Presented, RequestError>;

/// Handlers for every member route.
pub struct MemberController {
    use_case: Arc<dyn MemberUseCase>,
    presenter: MemberPresenter,
    validator: MemberValidator,
    logger: Arc<dyn Logger>,
    tracer: Tracer,
}

impl MemberController {
    /// Wire a controller over its collaborators.
    pub fn new(
        use_case: Arc<dyn MemberUseCase>,
        presenter: MemberPresenter,
        validator: MemberValidator,
        logger: Arc<dyn Logger>,
        tracer: Tracer,
    ) -> Self {
        Self {
            use_case,
            presenter,
            validator,
            logger,
            tracer,
        }
    }

    /// `POST /`
    pub async fn register(&self, ctx: &mut dyn HttpContext) {
        let (request_ctx, span) = self.tracer.start(ctx.request_context(), "member.register");
        let started = Instant::now();
        let outcome = self
            .try_register(ctx, &request_ctx)
            .instrument(span.tracing_span().clone())
            .await;
        self.finish(ctx, &request_ctx, span, started, outcome);
    }

    async fn try_register(&self, ctx: &dyn HttpContext, request_ctx: &RequestContext) -> Outcome {
        let dto = mapper::register_dto(ctx.bind_json()?);
        self.validator.validate_register(&dto)?;
        let member = self
            .use_case
            .register(request_ctx, mapper::new_member(dto))
            .await?;
        Ok(self.presenter.member(&member))
    }

    /// `GET /:id`
    pub async fn get_by_id(&self, ctx: &mut dyn HttpContext) {
        let (request_ctx, span) = self.tracer.start(ctx.request_context(), "member.get_by_id");
        let started = Instant::now();
        let outcome = self
            .try_get_by_id(ctx, &request_ctx)
            .instrument(span.tracing_span().clone())
            .await;
        self.finish(ctx, &request_ctx, span, started, outcome);
    }

    async fn try_get_by_id(&self, ctx: &dyn HttpContext, request_ctx: &RequestContext) -> Outcome {
        let dto = mapper::member_id_dto(&ctx.bind_path()?)?;
        self.validator.validate_get_by_id(&dto)?;
        let member = self
            .use_case
            .get_by_id(request_ctx, mapper::member_id(dto))
            .await?;
        Ok(self.presenter.member(&member))
    }

    /// `GET /email/:email`
    pub async fn get_by_email(&self, ctx: &mut dyn HttpContext) {
        let (request_ctx, span) = self
            .tracer
            .start(ctx.request_context(), "member.get_by_email");
        let started = Instant::now();
        let outcome = self
            .try_get_by_email(ctx, &request_ctx)
            .instrument(span.tracing_span().clone())
            .await;
        self.finish(ctx, &request_ctx, span, started, outcome);
    }

    async fn try_get_by_email(
        &self,
        ctx: &dyn HttpContext,
        request_ctx: &RequestContext,
    ) -> Outcome {
        let dto = mapper::member_email_dto(ctx.bind_path()?);
        self.validator.validate_get_by_email(&dto)?;
        let member = self.use_case.get_by_email(request_ctx, &dto.email).await?;
        Ok(self.presenter.member(&member))
    }

    /// `GET /`
    pub async fn list(&self, ctx: &mut dyn HttpContext) {
        let (request_ctx, span) = self.tracer.start(ctx.request_context(), "member.list");
        let started = Instant::now();
        let outcome = self
            .try_list(ctx, &request_ctx)
            .instrument(span.tracing_span().clone())
            .await;
        self.finish(ctx, &request_ctx, span, started, outcome);
    }

    async fn try_list(&self, ctx: &dyn HttpContext, request_ctx: &RequestContext) -> Outcome {
        let dto = mapper::list_dto(ctx.bind_query()?)?;
        self.validator.validate_list(&dto)?;
        let window = mapper::pagination(&dto)?;
        let page = self.use_case.list(request_ctx, window).await?;
        Ok(self.presenter.list(&page, &window))
    }

    /// `PATCH /:id`
    pub async fn update_profile(&self, ctx: &mut dyn HttpContext) {
        let (request_ctx, span) = self
            .tracer
            .start(ctx.request_context(), "member.update_profile");
        let started = Instant::now();
        let outcome = self
            .try_update_profile(ctx, &request_ctx)
            .instrument(span.tracing_span().clone())
            .await;
        self.finish(ctx, &request_ctx, span, started, outcome);
    }

    async fn try_update_profile(
        &self,
        ctx: &dyn HttpContext,
        request_ctx: &RequestContext,
    ) -> Outcome {
        let dto = mapper::update_profile_dto(&ctx.bind_path()?, ctx.bind_json()?)?;
        self.validator.validate_update_profile(&dto)?;
        let (id, patch) = mapper::profile_patch(dto);
        let member = self.use_case.update_profile(request_ctx, id, patch).await?;
        Ok(self.presenter.member(&member))
    }

    /// `PATCH /:id/email`
    pub async fn update_email(&self, ctx: &mut dyn HttpContext) {
        let (request_ctx, span) = self
            .tracer
            .start(ctx.request_context(), "member.update_email");
        let started = Instant::now();
        let outcome = self
            .try_update_email(ctx, &request_ctx)
            .instrument(span.tracing_span().clone())
            .await;
        self.finish(ctx, &request_ctx, span, started, outcome);
    }

    async fn try_update_email(
        &self,
        ctx: &dyn HttpContext,
        request_ctx: &RequestContext,
    ) -> Outcome {
        let dto = mapper::update_email_dto(&ctx.bind_path()?, ctx.bind_json()?)?;
        self.validator.validate_update_email(&dto)?;
        let member = self
            .use_case
            .update_email(request_ctx, mapper::email_change(dto))
            .await?;
        Ok(self.presenter.member(&member))
    }

    /// `PATCH /:id/password`
    pub async fn update_password(&self, ctx: &mut dyn HttpContext) {
        let (request_ctx, span) = self
            .tracer
            .start(ctx.request_context(), "member.update_password");
        let started = Instant::now();
        let outcome = self
            .try_update_password(ctx, &request_ctx)
            .instrument(span.tracing_span().clone())
            .await;
        self.finish(ctx, &request_ctx, span, started, outcome);
    }

    async fn try_update_password(
        &self,
        ctx: &dyn HttpContext,
        request_ctx: &RequestContext,
    ) -> Outcome {
        let dto = mapper::update_password_dto(&ctx.bind_path()?, ctx.bind_json()?)?;
        self.validator.validate_update_password(&dto)?;
        let member = self
            .use_case
            .update_password(request_ctx, mapper::password_change(dto))
            .await?;
        Ok(self.presenter.member(&member))
    }

    /// `DELETE /:id`
    pub async fn delete(&self, ctx: &mut dyn HttpContext) {
        let (request_ctx, span) = self.tracer.start(ctx.request_context(), "member.delete");
        let started = Instant::now();
        let outcome = self
            .try_delete(ctx, &request_ctx)
            .instrument(span.tracing_span().clone())
            .await;
        self.finish(ctx, &request_ctx, span, started, outcome);
    }

    async fn try_delete(&self, ctx: &dyn HttpContext, request_ctx: &RequestContext) -> Outcome {
        let dto = mapper::member_id_dto(&ctx.bind_path()?)?;
        self.validator.validate_delete(&dto)?;
        let member = self
            .use_case
            .delete(request_ctx, mapper::member_id(dto))
            .await?;
        Ok(self.presenter.member(&member))
    }

    fn finish(
        &self,
        ctx: &mut dyn HttpContext,
        request_ctx: &RequestContext,
        span: Span,
        started: Instant,
        outcome: Outcome,
    ) {
        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        let logger = self.logger.with_context(request_ctx);
        let mut fields = vec![
            Field::new("operation", span.name()),
            Field::new("method", ctx.method()),
            Field::new("path", ctx.path()),
            Field::new("elapsed_ms", elapsed_ms),
        ];
        let presented = match outcome {
            Ok(presented) => {
                fields.push(Field::new("status", presented.status));
                logger.info("request handled", &fields);
                presented
            }
            Err(err) => {
                let presented = self.presenter.error(&err);
                fields.push(Field::new("status", presented.status));
                fields.push(Field::error(&err));
                if presented.status >= 500 {
                    logger.error("request failed", &fields);
                } else {
                    logger.warn("request rejected", &fields);
                }
                presented
            }
        };
        ctx.write_json(presented.status, presented.body);
        span.end();
    }
}

#[cfg(test)]
#[path = "controller_tests.rs"]
mod tests;

//! Span creation bound to a [`RequestContext`].
//!
//! Spans are mirrored into `tracing` so framework diagnostics emitted while a
//! span is entered carry its identifiers too.

use std::sync::Arc;
use std::time::Instant;

use serde::Deserialize;
use tracing::{Span as TracingSpan, info_span, trace};

use super::context::{RequestContext, SpanContext};
use super::trace_id::{SpanId, TraceId};

const fn default_enabled() -> bool {
    true
}

fn default_service_name() -> String {
    "member-service".to_owned()
}

/// Tracer configuration record.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TracerConfig {
    /// Disabled tracers hand out no-op spans.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Recorded on every span.
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

impl Default for TracerConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            service_name: default_service_name(),
        }
    }
}

/// Opens spans attached to request contexts.
#[derive(Debug, Clone)]
pub struct Tracer {
    enabled: bool,
    service: Arc<str>,
}

impl Tracer {
    /// Build a tracer from its configuration record.
    #[must_use]
    pub fn new(config: &TracerConfig) -> Self {
        Self {
            enabled: config.enabled,
            service: Arc::from(config.service_name.as_str()),
        }
    }

    /// A tracer whose spans record nothing.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            service: Arc::from(""),
        }
    }

    /// Whether spans are recorded.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Open `name` as a child of the span in `ctx`.
    ///
    /// The returned context carries the new span. When the tracer is disabled
    /// the context is returned unchanged with a named no-op span.
    #[must_use]
    pub fn start(&self, ctx: &RequestContext, name: &'static str) -> (RequestContext, Span) {
        if !self.enabled {
            return (ctx.clone(), Span { name, ..Span::noop() });
        }
        let parent = ctx.span_context().filter(SpanContext::is_valid);
        let trace_id = parent
            .map(|span| span.trace_id)
            .or_else(TraceId::current)
            .unwrap_or_else(TraceId::generate);
        let context = SpanContext::new(trace_id, SpanId::generate());
        let parent_span_id = parent.map_or_else(String::new, |span| span.span_id.to_string());
        let inner = info_span!(
            "span",
            otel.name = name,
            service = %self.service,
            trace_id = %context.trace_id,
            span_id = %context.span_id,
            parent_span_id = %parent_span_id,
        );
        let span = Span {
            name,
            context: Some(context),
            inner,
            started: Instant::now(),
        };
        (ctx.with_span(context), span)
    }
}

/// A named, timed unit of work. Closed by [`Span::end`] or on drop.
#[derive(Debug)]
pub struct Span {
    name: &'static str,
    context: Option<SpanContext>,
    inner: TracingSpan,
    started: Instant,
}

impl Span {
    /// A span that records nothing.
    #[must_use]
    pub fn noop() -> Self {
        Self {
            name: "",
            context: None,
            inner: TracingSpan::none(),
            started: Instant::now(),
        }
    }

    /// Operation name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Identity of the span; `None` for a no-op span.
    #[must_use]
    pub const fn context(&self) -> Option<SpanContext> {
        self.context
    }

    /// Whether the span is being recorded.
    #[must_use]
    pub const fn is_recording(&self) -> bool {
        self.context.is_some()
    }

    /// Underlying `tracing` span, for instrumenting futures.
    #[must_use]
    pub const fn tracing_span(&self) -> &TracingSpan {
        &self.inner
    }

    /// Close the span.
    pub fn end(self) {
        if self.is_recording() {
            let elapsed_ms = u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX);
            trace!(parent: &self.inner, span = self.name, elapsed_ms, "span ended");
        }
    }
}

//! Request-scoped context: span identity, deadline and cancellation.
//!
//! A [`RequestContext`] is created by the transport adapter for each request
//! and passed by reference through the use-case layer into the DAO. Deriving
//! a child (`with_span`, `with_timeout`, `with_cancel`) never mutates the
//! parent.

use std::future::{Future, pending};
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::select_all;
use tokio::sync::watch;
use tokio::time::{Instant, sleep_until};

use super::trace_id::{SpanId, TraceId};

/// Identity of the span a context is currently inside.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpanContext {
    /// Trace shared by every span of the request.
    pub trace_id: TraceId,
    /// This span.
    pub span_id: SpanId,
}

impl SpanContext {
    /// Pair a trace with a span.
    #[must_use]
    pub const fn new(trace_id: TraceId, span_id: SpanId) -> Self {
        Self { trace_id, span_id }
    }

    /// Both identifiers are non-zero.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.trace_id.is_valid() && self.span_id.is_valid()
    }
}

/// Why a context stopped admitting work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ContextError {
    /// The deadline elapsed.
    #[error("context deadline exceeded")]
    DeadlineExceeded,
    /// A cancel handle fired.
    #[error("context canceled")]
    Canceled,
}

/// Fires cancellation for every context derived from the one it came with.
#[derive(Debug)]
pub struct CancelHandle {
    sender: watch::Sender<bool>,
}

impl CancelHandle {
    /// Cancel the associated contexts. Idempotent.
    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }
}

/// Request-scoped cancellation and span context.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    span: Option<SpanContext>,
    deadline: Option<Instant>,
    cancellations: Arc<[watch::Receiver<bool>]>,
}

impl RequestContext {
    /// A root context with no span, deadline or cancellation.
    #[must_use]
    pub fn background() -> Self {
        Self::default()
    }

    /// Child context positioned inside `span`.
    #[must_use]
    pub fn with_span(&self, span: SpanContext) -> Self {
        Self {
            span: Some(span),
            ..self.clone()
        }
    }

    /// Current span, if any.
    #[must_use]
    pub const fn span_context(&self) -> Option<SpanContext> {
        self.span
    }

    /// Child context whose deadline is the earlier of the parent's and `at`.
    #[must_use]
    pub fn with_deadline(&self, at: Instant) -> Self {
        let deadline = match self.deadline {
            Some(existing) if existing <= at => existing,
            _ => at,
        };
        Self {
            deadline: Some(deadline),
            ..self.clone()
        }
    }

    /// Child context that expires `timeout` from now.
    #[must_use]
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Child context plus a handle that cancels it.
    ///
    /// Cancelling the parent still cancels the child.
    #[must_use]
    pub fn with_cancel(&self) -> (Self, CancelHandle) {
        let (sender, receiver) = watch::channel(false);
        let mut cancellations = self.cancellations.to_vec();
        cancellations.push(receiver);
        let child = Self {
            cancellations: cancellations.into(),
            ..self.clone()
        };
        (child, CancelHandle { sender })
    }

    /// Deadline, if any.
    #[must_use]
    pub const fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Reports whether the context is already done, without waiting.
    #[must_use]
    pub fn err(&self) -> Option<ContextError> {
        if self.cancellations.iter().any(|receiver| *receiver.borrow()) {
            return Some(ContextError::Canceled);
        }
        match self.deadline {
            Some(deadline) if deadline <= Instant::now() => Some(ContextError::DeadlineExceeded),
            _ => None,
        }
    }

    /// Drive `fut` until it completes or the context ends.
    ///
    /// The future is dropped as soon as the context ends, which aborts any
    /// I/O it owns.
    ///
    /// # Errors
    ///
    /// Returns [`ContextError::Canceled`] or [`ContextError::DeadlineExceeded`]
    /// when the context ends first.
    pub async fn run<F>(&self, fut: F) -> Result<F::Output, ContextError>
    where
        F: Future,
    {
        if let Some(err) = self.err() {
            return Err(err);
        }
        let deadline = self.deadline;
        let expiry = async move {
            match deadline {
                Some(at) => sleep_until(at).await,
                None => pending::<()>().await,
            }
        };
        tokio::select! {
            biased;
            () = self.cancelled() => Err(ContextError::Canceled),
            () = expiry => Err(ContextError::DeadlineExceeded),
            output = fut => Ok(output),
        }
    }

    /// Resolves once any cancel handle in the ancestry fires.
    pub async fn cancelled(&self) {
        if self.cancellations.is_empty() {
            return pending().await;
        }
        let waits = self.cancellations.iter().cloned().map(|mut receiver| {
            Box::pin(async move {
                let outcome = receiver.wait_for(|cancelled| *cancelled).await.map(|_| ());
                if outcome.is_err() {
                    // Handle dropped without cancelling.
                    pending::<()>().await;
                }
            })
        });
        select_all(waits).await;
    }
}

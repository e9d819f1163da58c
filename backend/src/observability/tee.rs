//! Fan-out logger.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use super::context::RequestContext;
use super::error::LoggerError;
use super::field::Field;
use super::level::Level;
use super::logger::Logger;

/// Dispatches every call to a fixed set of child loggers.
///
/// The child set is fixed at construction. Derived loggers (`with`,
/// `with_context`) are new fan-outs over the derived children, so each sink
/// keeps its own enrichment.
pub struct TeeLogger {
    children: RwLock<Vec<Arc<dyn Logger>>>,
}

impl TeeLogger {
    /// Fan out to `children`.
    #[must_use]
    pub fn new(children: Vec<Arc<dyn Logger>>) -> Self {
        Self {
            children: RwLock::new(children),
        }
    }

    /// Number of children.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    /// Whether there are no children.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // The read guard is released before any child is called.
    fn snapshot(&self) -> Vec<Arc<dyn Logger>> {
        match self.children.read() {
            Ok(children) => children.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn derive(&self, make: impl Fn(&dyn Logger) -> Arc<dyn Logger>) -> Arc<dyn Logger> {
        let children = self
            .snapshot()
            .iter()
            .map(|child| make(child.as_ref()))
            .collect();
        Arc::new(Self::new(children))
    }
}

#[async_trait]
impl Logger for TeeLogger {
    fn log(&self, level: Level, message: &str, fields: &[Field]) {
        for child in self.snapshot() {
            child.log(level, message, fields);
        }
    }

    fn with(&self, fields: &[Field]) -> Arc<dyn Logger> {
        self.derive(|child| child.with(fields))
    }

    fn with_context(&self, ctx: &RequestContext) -> Arc<dyn Logger> {
        self.derive(|child| child.with_context(ctx))
    }

    /// Syncs every child and returns the last failure, if any.
    async fn sync(&self) -> Result<(), LoggerError> {
        let mut last_error = None;
        for child in self.snapshot() {
            if let Err(error) = child.sync().await {
                last_error = Some(error);
            }
        }
        last_error.map_or(Ok(()), Err)
    }
}

//! Feature modules mounted by the server.
//!
//! A module owns a route group: the server asks it for a name and a prefix,
//! creates a group for that prefix and lets the module register its routes.

use std::sync::Arc;

use mockable::Clock;

use crate::inbound::http::Router;
use crate::observability::{Logger, Tracer};

pub mod member;

pub use member::MemberModule;

/// A mountable feature.
pub trait Module: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Path prefix of the module's route group.
    fn prefix(&self) -> &'static str;

    /// Register every route relative to the group prefix.
    fn register(&self, router: &mut dyn Router);
}

/// Shared services handed to every module.
#[derive(Clone)]
pub struct ModuleDeps {
    /// Root application logger.
    pub logger: Arc<dyn Logger>,
    /// Span factory.
    pub tracer: Tracer,
    /// Time source for response envelopes.
    pub clock: Arc<dyn Clock>,
}

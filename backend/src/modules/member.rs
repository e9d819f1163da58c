//! Member module composition.

use std::sync::Arc;

use crate::domain::MemberService;
use crate::domain::ports::MemberGateway;
use crate::inbound::http::Router;
use crate::inbound::http::member::{
    MemberController, MemberPresenter, MemberValidator, register_routes,
};
use crate::observability::Field;
use crate::outbound::persistence::{DaoMemberGateway, DbPool, DieselMemberDao};

use super::{Module, ModuleDeps};

/// Route group of the member API.
pub const GROUP: &str = "/members";

/// The member CRUD feature.
pub struct MemberModule {
    controller: Arc<MemberController>,
}

impl MemberModule {
    /// Compose DAO, gateway, use case and controller over `pool`.
    #[must_use]
    pub fn build(pool: DbPool, deps: &ModuleDeps) -> Self {
        let logger = deps.logger.with(&[Field::new("module", "member")]);
        let dao = DieselMemberDao::new(pool, logger, deps.tracer.clone());
        Self::from_gateway(Arc::new(DaoMemberGateway::new(Arc::new(dao))), deps)
    }

    /// Compose the use case and controller over an existing gateway.
    #[must_use]
    pub fn from_gateway<G>(gateway: Arc<G>, deps: &ModuleDeps) -> Self
    where
        G: MemberGateway + 'static,
    {
        let controller = MemberController::new(
            Arc::new(MemberService::new(gateway)),
            MemberPresenter::new(Arc::clone(&deps.clock)),
            MemberValidator::new(),
            deps.logger.with(&[Field::new("module", "member")]),
            deps.tracer.clone(),
        );
        Self {
            controller: Arc::new(controller),
        }
    }
}

impl Module for MemberModule {
    fn name(&self) -> &'static str {
        "member"
    }

    fn prefix(&self) -> &'static str {
        GROUP
    }

    fn register(&self, router: &mut dyn Router) {
        register_routes(router, &self.controller);
    }
}

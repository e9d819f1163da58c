//! Member route table.

use std::sync::Arc;

use futures_util::FutureExt as _;

use super::controller::MemberController;
use crate::inbound::http::transport::{Router, handler};

macro_rules! route {
    ($controller:expr, $operation:ident) => {{
        let controller = Arc::clone($controller);
        handler(move |ctx| {
            let controller = Arc::clone(&controller);
            async move { controller.$operation(ctx).await }.boxed_local()
        })
    }};
}

/// Register every member route on `router`, relative to its group.
pub fn register_routes(router: &mut dyn Router, controller: &Arc<MemberController>) {
    router.post("/", route!(controller, register));
    router.get("/", route!(controller, list));
    router.get("/email/:email", route!(controller, get_by_email));
    router.get("/:id", route!(controller, get_by_id));
    router.patch("/:id", route!(controller, update_profile));
    router.patch("/:id/email", route!(controller, update_email));
    router.patch("/:id/password", route!(controller, update_password));
    router.delete("/:id", route!(controller, delete));
}

//! Domain ports defining the edges of the hexagon.
//!
//! [`MemberUseCase`] is driven by the inbound HTTP adapter;
//! [`MemberGateway`] is implemented by the outbound persistence adapter.

mod member_gateway;
mod member_use_case;

pub use member_gateway::{
    BoxError, DbFailure, FixtureMemberGateway, MemberGateway, MemberGatewayError,
};
#[cfg(test)]
pub use member_gateway::MockMemberGateway;
pub use member_use_case::MemberUseCase;
#[cfg(test)]
pub use member_use_case::MockMemberUseCase;

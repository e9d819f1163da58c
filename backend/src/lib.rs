//! Member CRUD HTTP API.
//!
//! Requests flow through the transport adapter into a member controller,
//! which binds, validates and calls the [`domain`] use case. The use case
//! reaches storage through a gateway port implemented in [`outbound`].
//! Errors are translated at each layer boundary and rendered as a response
//! envelope carrying a numeric code.

pub mod config;
pub mod domain;
pub mod inbound;
pub(crate) mod macros;
pub mod middleware;
pub mod modules;
pub mod observability;
pub mod outbound;
pub mod server;

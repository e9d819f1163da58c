//! HTTP inbound adapter.
//!
//! [`transport`] defines the framework-neutral contracts controllers are
//! written against; [`actix_adapter`] implements them on actix-web.
//! Everything under [`member`] sees only those contracts.

pub mod actix_adapter;
pub mod envelope;
pub mod error_code;
pub mod health;
pub mod member;
pub mod transport;

pub use actix_adapter::{ActixContext, ActixRouter};
pub use envelope::{Envelope, ErrorBody, Status, failure_json};
pub use error_code::{ErrorCode, http_status_for};
pub use health::HealthState;
pub use transport::{BindError, BindExt, Handler, HttpContext, Method, Router, handler};

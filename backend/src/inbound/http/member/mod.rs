//! Member feature slice of the HTTP adapter.
//!
//! Requests pass through three DTO tiers: [`bind`] shapes filled by the
//! transport, [`dto`] neutral shapes the [`validator`] checks, and the
//! domain inputs [`mapper`] builds from them.

pub mod bind;
pub mod controller;
pub mod dto;
pub mod error;
pub mod mapper;
pub mod presenter;
pub mod routes;
pub mod validator;

pub use controller::MemberController;
pub use error::RequestError;
pub use presenter::{MemberListResponse, MemberPresenter, MemberResponse, Presented};
pub use routes::register_routes;
pub use validator::{MemberValidator, ValidationFailure};

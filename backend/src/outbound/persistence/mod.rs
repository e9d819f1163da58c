//! PostgreSQL persistence for members.
//!
//! Layering inside this module: [`DaoMemberGateway`] implements the domain
//! port over the [`MemberDao`] trait; [`DieselMemberDao`] is the Diesel
//! implementation of that trait.

mod diesel_member_dao;
pub mod member_dao;
mod member_gateway;
mod models;
mod pool;
mod schema;
mod sql_error;

pub use diesel_member_dao::DieselMemberDao;
pub use member_dao::{DaoError, DaoErrorKind, MemberDao, MemberRecord, NewMemberRecord};
pub use member_gateway::DaoMemberGateway;
pub use pool::{DatabaseConfig, DbPool, PoolError, run_migrations};

//! Everything that can stop a member request before a successful reply.

use thiserror::Error;

use super::validator::ValidationFailure;
use crate::domain::MemberUseCaseError;
use crate::inbound::http::transport::BindError;

/// A failed member request, by the stage that failed.
#[derive(Debug, Error)]
pub enum RequestError {
    /// The request could not be bound.
    #[error(transparent)]
    Bind(#[from] BindError),
    /// A bound request broke a validation rule.
    #[error(transparent)]
    Validation(#[from] ValidationFailure),
    /// The use case refused or failed.
    #[error(transparent)]
    UseCase(#[from] MemberUseCaseError),
}

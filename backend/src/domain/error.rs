//! Member use-case failures.
//!
//! Each variant is what the presenter classifies; gateway failures stay
//! reachable through `source()` for logging.

use thiserror::Error;

use crate::domain::ports::{DbFailure, MemberGatewayError};

/// Errors returned by the member use cases.
#[derive(Debug, Error)]
pub enum MemberUseCaseError {
    /// No member matched.
    #[error("member not found")]
    NotFound {
        /// Gateway cause.
        #[source]
        source: MemberGatewayError,
    },
    /// Registration collided with an existing member.
    #[error("member already exists")]
    AlreadyExists {
        /// Gateway cause.
        #[source]
        source: MemberGatewayError,
    },
    /// Another member already owns the requested email.
    #[error("email already in use")]
    EmailAlreadyExists,
    /// The requested email equals the current one.
    #[error("new email is the same as the current email")]
    UpdateSameEmail,
    /// The requested password equals the current one.
    #[error("new password is the same as the current password")]
    UpdateSamePassword,
    /// The supplied password does not match.
    #[error("password is incorrect")]
    PasswordIncorrect,
    /// A profile update changed nothing.
    #[error("update had no effect")]
    NoEffect {
        /// Gateway cause.
        #[source]
        source: MemberGatewayError,
    },
    /// An email or password update changed nothing.
    #[error("member update failed")]
    UpdateFailed {
        /// Gateway cause.
        #[source]
        source: MemberGatewayError,
    },
    /// A delete removed nothing.
    #[error("member delete failed")]
    DeleteFailed {
        /// Gateway cause.
        #[source]
        source: MemberGatewayError,
    },
    /// The store failed.
    #[error("member storage error")]
    Db {
        /// Failure class.
        kind: DbFailure,
        /// Gateway cause.
        #[source]
        source: MemberGatewayError,
    },
    /// Anything the use case did not anticipate.
    #[error("unexpected member error")]
    Unexpected {
        /// Gateway cause.
        #[source]
        source: MemberGatewayError,
    },
}

impl MemberUseCaseError {
    /// Whether the request context ended the operation.
    #[must_use]
    pub fn is_context_ended(&self) -> bool {
        matches!(self, Self::Db { kind, .. } if kind.is_context_ended())
    }
}

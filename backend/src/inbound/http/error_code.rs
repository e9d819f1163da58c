//! Numeric error code registry.
//!
//! Codes are partitioned by layer: 1xxx binding, 2xxx validation, 3xxx
//! member use cases, 5xxx system. On the wire a code is a decimal string.

use std::fmt;

/// Every code the service can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum ErrorCode {
    /// Malformed JSON body.
    InvalidJsonSyntax = 1000,
    /// JSON body of the wrong shape.
    InvalidJsonType = 1001,
    /// Malformed query or path parameter.
    InvalidParams = 1002,
    /// A field failed a validation rule.
    ValidationFailed = 2000,
    /// A required parameter is absent.
    MissingField = 2001,
    /// Registration collided with an existing member.
    MemberAlreadyExists = 3000,
    /// No member matched.
    MemberNotFound = 3001,
    /// A profile update changed nothing.
    MemberNoEffect = 3002,
    /// New email equals the current email.
    MemberUpdateSameEmail = 3003,
    /// New password equals the current password.
    MemberUpdateSamePassword = 3004,
    /// Supplied password does not match.
    MemberPasswordIncorrect = 3005,
    /// Another member owns the requested email.
    MemberEmailAlreadyExists = 3006,
    /// An email or password update changed nothing.
    MemberUpdateFailed = 3007,
    /// A delete removed nothing.
    MemberDeleteFailed = 3008,
    /// The store failed.
    MemberDbError = 3009,
    /// Anything else in the member feature.
    MemberUnexpected = 3010,
    /// Unhandled server failure.
    InternalServer = 5000,
    /// The request exceeded its time budget.
    RequestTimeout = 5001,
    /// The request context ended during the call.
    ContextTimeout = 5002,
    /// A dependency is unavailable.
    Unavailable = 5003,
    /// The client exceeded the rate limit.
    TooManyRequests = 5004,
}

impl ErrorCode {
    /// Every registered code, ascending.
    pub const ALL: [Self; 21] = [
        Self::InvalidJsonSyntax,
        Self::InvalidJsonType,
        Self::InvalidParams,
        Self::ValidationFailed,
        Self::MissingField,
        Self::MemberAlreadyExists,
        Self::MemberNotFound,
        Self::MemberNoEffect,
        Self::MemberUpdateSameEmail,
        Self::MemberUpdateSamePassword,
        Self::MemberPasswordIncorrect,
        Self::MemberEmailAlreadyExists,
        Self::MemberUpdateFailed,
        Self::MemberDeleteFailed,
        Self::MemberDbError,
        Self::MemberUnexpected,
        Self::InternalServer,
        Self::RequestTimeout,
        Self::ContextTimeout,
        Self::Unavailable,
        Self::TooManyRequests,
    ];

    /// Numeric value.
    #[must_use]
    pub const fn code(self) -> u16 {
        self as u16
    }

    /// Look a numeric value up.
    #[must_use]
    pub fn from_code(code: u16) -> Option<Self> {
        Self::ALL.into_iter().find(|candidate| candidate.code() == code)
    }

    /// Short client-facing message.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::InvalidJsonSyntax => "invalid JSON syntax",
            Self::InvalidJsonType => "invalid JSON type",
            Self::InvalidParams => "invalid parameters",
            Self::ValidationFailed => "validation failed",
            Self::MissingField => "missing required field",
            Self::MemberAlreadyExists => "member already exists",
            Self::MemberNotFound => "member not found",
            Self::MemberNoEffect => "update had no effect",
            Self::MemberUpdateSameEmail => "new email is the same as the current email",
            Self::MemberUpdateSamePassword => "new password is the same as the current password",
            Self::MemberPasswordIncorrect => "password is incorrect",
            Self::MemberEmailAlreadyExists => "email already in use",
            Self::MemberUpdateFailed => "member update failed",
            Self::MemberDeleteFailed => "member delete failed",
            Self::MemberDbError => "member storage error",
            Self::MemberUnexpected => "unexpected member error",
            Self::InternalServer => "internal server error",
            Self::RequestTimeout => "request timed out",
            Self::ContextTimeout => "request deadline exceeded",
            Self::Unavailable => "service unavailable",
            Self::TooManyRequests => "too many requests",
        }
    }

    /// HTTP status for this code.
    #[must_use]
    pub const fn http_status(self) -> u16 {
        match self {
            Self::InvalidJsonSyntax
            | Self::InvalidJsonType
            | Self::InvalidParams
            | Self::ValidationFailed
            | Self::MissingField => 400,
            Self::MemberNotFound => 404,
            Self::MemberAlreadyExists
            | Self::MemberEmailAlreadyExists
            | Self::MemberUpdateSameEmail
            | Self::MemberUpdateSamePassword => 409,
            Self::MemberNoEffect => 422,
            Self::MemberPasswordIncorrect => 401,
            Self::RequestTimeout | Self::ContextTimeout => 504,
            Self::MemberUpdateFailed
            | Self::MemberDeleteFailed
            | Self::MemberDbError
            | Self::MemberUnexpected
            | Self::InternalServer
            | Self::Unavailable
            | Self::TooManyRequests => 500,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// HTTP status for any numeric code; unregistered codes fall back by range.
#[must_use]
pub fn http_status_for(code: u16) -> u16 {
    match ErrorCode::from_code(code) {
        Some(known) => known.http_status(),
        None if (1000..3000).contains(&code) => 400,
        None => 500,
    }
}

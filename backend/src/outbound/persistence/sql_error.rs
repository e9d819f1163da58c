//! Classification of Diesel, pool and context failures into [`DaoError`].
//!
//! Structured Diesel kinds are trusted first; PostgreSQL message text is the
//! fallback for failures the driver reports as generic database errors.

use diesel::result::{DatabaseErrorKind, Error as DieselError};
use tracing::debug;

use crate::observability::ContextError;

use super::member_dao::{DaoError, DaoErrorKind};
use super::pool::PoolError;

const UNIQUE_VIOLATION_MARKERS: [&str; 2] = ["duplicate key value", "unique constraint"];
const CLOSED_CONNECTION_MARKERS: [&str; 3] = [
    "server closed the connection",
    "connection closed",
    "terminating connection",
];
const STATEMENT_TIMEOUT_MARKER: &str = "canceling statement due to statement timeout";
const USER_CANCEL_MARKER: &str = "canceling statement due to user request";

fn classify_message(message: &str) -> DaoErrorKind {
    let lowered = message.to_ascii_lowercase();
    if UNIQUE_VIOLATION_MARKERS
        .iter()
        .any(|marker| lowered.contains(marker))
    {
        DaoErrorKind::DuplicateKey
    } else if CLOSED_CONNECTION_MARKERS
        .iter()
        .any(|marker| lowered.contains(marker))
    {
        DaoErrorKind::ConnectionClosed
    } else if lowered.contains(STATEMENT_TIMEOUT_MARKER) {
        DaoErrorKind::ContextTimeout
    } else if lowered.contains(USER_CANCEL_MARKER) {
        DaoErrorKind::ContextCanceled
    } else {
        DaoErrorKind::UnknownDbError
    }
}

/// Classify a Diesel error, keeping it as the source.
pub fn classify_diesel_error(error: DieselError) -> DaoError {
    let kind = match &error {
        DieselError::NotFound => DaoErrorKind::RecordNotFound,
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
            DaoErrorKind::DuplicateKey
        }
        DieselError::DatabaseError(DatabaseErrorKind::ClosedConnection, _) => {
            DaoErrorKind::ConnectionClosed
        }
        DieselError::DatabaseError(_, info) => classify_message(info.message()),
        DieselError::AlreadyInTransaction
        | DieselError::NotInTransaction
        | DieselError::RollbackTransaction
        | DieselError::BrokenTransactionManager
        | DieselError::RollbackErrorOnCommit { .. } => DaoErrorKind::TransactionDone,
        _ => DaoErrorKind::UnknownDbError,
    };
    match &error {
        DieselError::DatabaseError(db_kind, info) => {
            debug!(?db_kind, message = info.message(), %kind, "diesel operation failed");
        }
        _ => debug!(?error, %kind, "diesel operation failed"),
    }
    DaoError::new(kind).with_source(error)
}

/// Pool failures mean no usable connection.
pub fn classify_pool_error(error: PoolError) -> DaoError {
    DaoError::new(DaoErrorKind::ConnectionClosed).with_source(error)
}

/// The request context ended before the query finished.
pub fn classify_context_error(error: ContextError) -> DaoError {
    let kind = match error {
        ContextError::DeadlineExceeded => DaoErrorKind::ContextTimeout,
        ContextError::Canceled => DaoErrorKind::ContextCanceled,
    };
    DaoError::new(kind).with_source(error)
}

/// Updates must touch at least one row.
pub fn expect_updated(rows: usize) -> Result<(), DaoError> {
    if rows == 0 {
        Err(DaoError::new(DaoErrorKind::NoEffect))
    } else {
        Ok(())
    }
}

/// Deletes must touch exactly one row.
pub fn expect_deleted(rows: usize) -> Result<(), DaoError> {
    if rows == 1 {
        Ok(())
    } else {
        Err(DaoError::new(DaoErrorKind::NoEffect))
    }
}

//! Error taxonomy for the storage-and-execution core.
//!
//! A single struct carrying a `kind` tag and a message, in the style of a
//! hand-rolled error type rather than a derive-macro crate.

use std::fmt;

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum DbErrorKind {
    /// Out-of-range page access on a heap file.
    InvalidPage,
    /// Underlying file read/write error.
    IoFailure,
    /// Lock acquisition exceeded timeout, or an illegal upgrade was attempted.
    TransactionAbort,
    /// Eviction was requested but every cached page is dirty.
    AllPagesDirty,
    /// `next()` called with nothing left to yield.
    NoSuchElement,
    /// `has_next`/`next` called before `open`.
    IteratorNotOpen,
    /// Constructor-time misuse: e.g. a non-COUNT aggregate over a STRING column.
    UnsupportedOp,
    /// Constructor-time misuse: e.g. an unknown histogram predicate.
    IllegalArgument,
}

#[derive(Debug)]
pub struct DbError {
    kind: DbErrorKind,
    message: String,
}

impl DbError {
    pub fn new(kind: DbErrorKind, message: impl Into<String>) -> DbError {
        DbError {
            kind,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> DbErrorKind {
        self.kind
    }

    pub fn invalid_page(message: impl Into<String>) -> DbError {
        DbError::new(DbErrorKind::InvalidPage, message)
    }

    pub fn transaction_abort(message: impl Into<String>) -> DbError {
        DbError::new(DbErrorKind::TransactionAbort, message)
    }

    pub fn all_pages_dirty(message: impl Into<String>) -> DbError {
        DbError::new(DbErrorKind::AllPagesDirty, message)
    }

    pub fn no_such_element(message: impl Into<String>) -> DbError {
        DbError::new(DbErrorKind::NoSuchElement, message)
    }

    pub fn iterator_not_open(message: impl Into<String>) -> DbError {
        DbError::new(DbErrorKind::IteratorNotOpen, message)
    }

    pub fn unsupported_op(message: impl Into<String>) -> DbError {
        DbError::new(DbErrorKind::UnsupportedOp, message)
    }

    pub fn illegal_argument(message: impl Into<String>) -> DbError {
        DbError::new(DbErrorKind::IllegalArgument, message)
    }
}

impl fmt::Display for DbError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl std::error::Error for DbError {}

impl From<std::io::Error> for DbError {
    fn from(e: std::io::Error) -> DbError {
        DbError::new(DbErrorKind::IoFailure, e.to_string())
    }
}

pub type DbResult<T> = Result<T, DbError>;

use crate::{
    backend::BackendError,
    db::{batch::BatchError, mapper::MapperError},
    schema::SchemaError,
};
use std::fmt;
use thiserror::Error as ThisError;

///
/// InternalError
///
/// Structured runtime error with a stable internal classification.
/// Not a stable API; the public crate maps it into `widerow::Error`.
///

#[derive(Debug, ThisError)]
#[error("{message}")]
pub struct InternalError {
    pub class: ErrorClass,
    pub origin: ErrorOrigin,
    pub message: String,

    /// Optional structured error detail.
    pub detail: Option<ErrorDetail>,
}

impl InternalError {
    pub fn new(class: ErrorClass, origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self {
            class,
            origin,
            message: message.into(),
            detail: None,
        }
    }

    /// Construct an invalid-argument error raised before any backend call.
    pub(crate) fn invalid_argument(origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self::new(ErrorClass::InvalidArgument, origin, message)
    }

    /// Construct an invariant violation for a specific origin.
    pub(crate) fn invariant(origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self::new(ErrorClass::InvariantViolation, origin, message)
    }

    /// Borrow the backend failure carried by this error, if any.
    #[must_use]
    pub const fn backend_error(&self) -> Option<&BackendError> {
        match &self.detail {
            Some(ErrorDetail::Backend(err)) => Some(err),
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_invalid_argument(&self) -> bool {
        matches!(self.class, ErrorClass::InvalidArgument)
    }

    #[must_use]
    pub fn display_with_class(&self) -> String {
        format!("{}:{}: {}", self.origin, self.class, self.message)
    }
}

///
/// ErrorDetail
///
/// Structured, origin-specific error detail carried by [`InternalError`].
///

#[derive(Debug, ThisError)]
pub enum ErrorDetail {
    #[error("{0}")]
    Backend(BackendError),

    #[error("{0}")]
    Mapper(MapperError),
}

impl From<BackendError> for InternalError {
    fn from(err: BackendError) -> Self {
        Self {
            class: ErrorClass::Backend,
            origin: ErrorOrigin::Backend,
            message: err.to_string(),
            detail: Some(ErrorDetail::Backend(err)),
        }
    }
}

impl From<MapperError> for InternalError {
    fn from(err: MapperError) -> Self {
        let class = match err {
            MapperError::MissingPrimaryKey { .. } | MapperError::EmptyRow => {
                ErrorClass::InvalidArgument
            }
            MapperError::IntegerKeyEncoding { .. }
            | MapperError::KeyTypeMismatch { .. }
            | MapperError::SentinelInResponse { .. } => ErrorClass::KeyEncoding,
        };

        Self {
            class,
            origin: ErrorOrigin::Mapper,
            message: err.to_string(),
            detail: Some(ErrorDetail::Mapper(err)),
        }
    }
}

impl From<BatchError> for InternalError {
    fn from(err: BatchError) -> Self {
        let class = match err {
            BatchError::Empty | BatchError::UnknownOperation { .. } => ErrorClass::InvalidArgument,
            BatchError::ResultArityMismatch { .. } | BatchError::MissingTable { .. } => {
                ErrorClass::InvariantViolation
            }
        };

        Self::new(class, ErrorOrigin::Batch, err.to_string())
    }
}

impl From<SchemaError> for InternalError {
    fn from(err: SchemaError) -> Self {
        Self::new(ErrorClass::InvalidArgument, ErrorOrigin::Schema, err.to_string())
    }
}

///
/// ErrorClass
/// Internal error taxonomy for runtime classification.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorClass {
    InvalidArgument,
    KeyEncoding,
    Backend,
    InvariantViolation,
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::InvalidArgument => "invalid_argument",
            Self::KeyEncoding => "key_encoding",
            Self::Backend => "backend",
            Self::InvariantViolation => "invariant_violation",
        };
        write!(f, "{label}")
    }
}

///
/// ErrorOrigin
/// Internal origin taxonomy for runtime classification.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorOrigin {
    Schema,
    Mapper,
    Write,
    Batch,
    Range,
    Select,
    Backend,
    Config,
}

impl fmt::Display for ErrorOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Schema => "schema",
            Self::Mapper => "mapper",
            Self::Write => "write",
            Self::Batch => "batch",
            Self::Range => "range",
            Self::Select => "select",
            Self::Backend => "backend",
            Self::Config => "config",
        };
        write!(f, "{label}")
    }
}

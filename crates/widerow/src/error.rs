use crate::config::ConfigError;
use derive_more::Display;
use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;
use widerow_core::{
    backend::BackendError,
    error::{ErrorClass, ErrorOrigin as CoreErrorOrigin, InternalError},
};

///
/// Error
/// Public error type with a stable kind + origin taxonomy.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize, ThisError)]
#[error("{message}")]
pub struct Error {
    pub kind: ErrorKind,
    pub origin: ErrorOrigin,
    pub message: String,
}

impl Error {
    pub fn new(kind: ErrorKind, origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self {
            kind,
            origin,
            message: message.into(),
        }
    }

    /// Backend failure details, when the backend rejected the call.
    #[must_use]
    pub const fn backend(&self) -> Option<&BackendErrorInfo> {
        match &self.kind {
            ErrorKind::Backend(info) => Some(info),
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_invalid_argument(&self) -> bool {
        matches!(self.kind, ErrorKind::InvalidArgument)
    }
}

impl From<InternalError> for Error {
    fn from(err: InternalError) -> Self {
        let kind = match (err.class, err.origin) {
            (ErrorClass::InvalidArgument, CoreErrorOrigin::Config) => ErrorKind::Config,
            (ErrorClass::InvalidArgument, _) => ErrorKind::InvalidArgument,
            (ErrorClass::KeyEncoding, _) => ErrorKind::KeyEncoding,
            (ErrorClass::Backend, _) => ErrorKind::Backend(
                err.backend_error()
                    .map_or_else(BackendErrorInfo::unknown, BackendErrorInfo::from),
            ),
            (ErrorClass::InvariantViolation, _) => ErrorKind::Internal,
        };

        Self::new(kind, err.origin.into(), err.message)
    }
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Self::new(ErrorKind::Config, ErrorOrigin::Config, err.to_string())
    }
}

///
/// ErrorKind
/// Public error taxonomy for callers.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum ErrorKind {
    /// Caller input was rejected before any backend call.
    InvalidArgument,

    /// A key value could not be converted to or from its column type.
    KeyEncoding,

    /// The backend rejected the call.
    Backend(BackendErrorInfo),

    /// Table configuration is unreadable or invalid.
    Config,

    /// The caller cannot remediate this.
    Internal,
}

///
/// BackendErrorInfo
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct BackendErrorInfo {
    pub code: String,
    pub message: String,
    pub request_id: Option<String>,
}

impl BackendErrorInfo {
    fn unknown() -> Self {
        Self {
            code: "Unknown".to_string(),
            message: String::new(),
            request_id: None,
        }
    }
}

impl From<&BackendError> for BackendErrorInfo {
    fn from(err: &BackendError) -> Self {
        Self {
            code: err.code.clone(),
            message: err.message.clone(),
            request_id: err.request_id.clone(),
        }
    }
}

///
/// ErrorOrigin
/// Public origin taxonomy for callers.
///

#[derive(Clone, Copy, Debug, Deserialize, Display, Eq, PartialEq, Serialize)]
pub enum ErrorOrigin {
    Backend,
    Batch,
    Config,
    Mapper,
    Range,
    Schema,
    Select,
    Write,
}

impl From<CoreErrorOrigin> for ErrorOrigin {
    fn from(origin: CoreErrorOrigin) -> Self {
        match origin {
            CoreErrorOrigin::Backend => Self::Backend,
            CoreErrorOrigin::Batch => Self::Batch,
            CoreErrorOrigin::Config => Self::Config,
            CoreErrorOrigin::Mapper => Self::Mapper,
            CoreErrorOrigin::Range => Self::Range,
            CoreErrorOrigin::Schema => Self::Schema,
            CoreErrorOrigin::Select => Self::Select,
            CoreErrorOrigin::Write => Self::Write,
        }
    }
}

//! Storage backend contract.
//!
//! The backend is an external collaborator: this layer only builds its
//! requests and interprets its responses. Transport, auth, and condition
//! evaluation all live behind the [`Backend`] trait.

mod memory;
pub mod wire;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;

// re-exports
pub use memory::{BackendCall, MemoryBackend};
pub use wire::*;

///
/// BackendError
///
/// Failure reported by the backend, either for a whole call or for one
/// batch item. Carried through this layer without modification.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize, ThisError)]
#[error("{code}: {message}")]
pub struct BackendError {
    pub code: String,
    pub message: String,
    #[serde(default)]
    pub request_id: Option<String>,
}

impl BackendError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            request_id: None,
        }
    }

    #[must_use]
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }
}

///
/// Backend
///
/// Asynchronous client surface of a wide-column store, one method per
/// backend primitive. Implementations must keep batch responses parallel
/// to their requests.
///

#[async_trait]
pub trait Backend: Send + Sync {
    async fn describe_table(
        &self,
        request: DescribeTableRequest,
    ) -> Result<DescribeTableResponse, BackendError>;

    async fn put_row(&self, request: PutRowRequest) -> Result<WriteRowResponse, BackendError>;

    async fn update_row(&self, request: UpdateRowRequest)
    -> Result<WriteRowResponse, BackendError>;

    async fn delete_row(&self, request: DeleteRowRequest)
    -> Result<WriteRowResponse, BackendError>;

    async fn get_row(&self, request: GetRowRequest) -> Result<GetRowResponse, BackendError>;

    async fn batch_get_row(
        &self,
        request: BatchGetRowRequest,
    ) -> Result<BatchGetRowResponse, BackendError>;

    async fn batch_write_row(
        &self,
        request: BatchWriteRowRequest,
    ) -> Result<BatchWriteRowResponse, BackendError>;

    async fn get_range(&self, request: GetRangeRequest) -> Result<GetRangeResponse, BackendError>;
}

#[async_trait]
impl<B: Backend + ?Sized> Backend for std::sync::Arc<B> {
    async fn describe_table(
        &self,
        request: DescribeTableRequest,
    ) -> Result<DescribeTableResponse, BackendError> {
        (**self).describe_table(request).await
    }

    async fn put_row(&self, request: PutRowRequest) -> Result<WriteRowResponse, BackendError> {
        (**self).put_row(request).await
    }

    async fn update_row(
        &self,
        request: UpdateRowRequest,
    ) -> Result<WriteRowResponse, BackendError> {
        (**self).update_row(request).await
    }

    async fn delete_row(
        &self,
        request: DeleteRowRequest,
    ) -> Result<WriteRowResponse, BackendError> {
        (**self).delete_row(request).await
    }

    async fn get_row(&self, request: GetRowRequest) -> Result<GetRowResponse, BackendError> {
        (**self).get_row(request).await
    }

    async fn batch_get_row(
        &self,
        request: BatchGetRowRequest,
    ) -> Result<BatchGetRowResponse, BackendError> {
        (**self).batch_get_row(request).await
    }

    async fn batch_write_row(
        &self,
        request: BatchWriteRowRequest,
    ) -> Result<BatchWriteRowResponse, BackendError> {
        (**self).batch_write_row(request).await
    }

    async fn get_range(&self, request: GetRangeRequest) -> Result<GetRangeResponse, BackendError> {
        (**self).get_range(request).await
    }
}

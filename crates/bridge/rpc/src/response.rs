use crate::error::RpcError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Response posted back into the page for a single provider call.
///
/// The shape is the conventional `{ requestId, result }` or
/// `{ requestId, error }`; a page never sees both fields at once.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct RpcResponse {
    #[serde(rename = "requestId")]
    request_id: Uuid,
    #[serde(flatten)]
    result: ResponseResult,
}

impl RpcResponse {
    pub fn new(request_id: Uuid, content: impl Into<ResponseResult>) -> Self {
        Self { request_id, result: content.into() }
    }

    /// The correlation id this response answers.
    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    /// The success value or error of this response.
    pub fn result(&self) -> &ResponseResult {
        &self.result
    }

    /// Returns the error if this is an error response.
    pub fn as_error(&self) -> Option<&RpcError> {
        match &self.result {
            ResponseResult::Error(err) => Some(err),
            ResponseResult::Success(_) => None,
        }
    }

    /// Returns the success value if this is a success response.
    pub fn as_success(&self) -> Option<&serde_json::Value> {
        match &self.result {
            ResponseResult::Success(val) => Some(val),
            ResponseResult::Error(_) => None,
        }
    }
}

/// Represents the result of a call, either success or error
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub enum ResponseResult {
    #[serde(rename = "result")]
    Success(serde_json::Value),
    #[serde(rename = "error")]
    Error(RpcError),
}

impl ResponseResult {
    pub fn success<S>(content: S) -> Self
    where
        S: Serialize,
    {
        match serde_json::to_value(&content) {
            Ok(value) => Self::Success(value),
            // a non-serializable success payload is an internal bug, not a page error
            Err(err) => Self::Error(RpcError::internal_error_with(err.to_string())),
        }
    }

    pub fn error(error: RpcError) -> Self {
        Self::Error(error)
    }
}

impl From<RpcError> for ResponseResult {
    fn from(err: RpcError) -> Self {
        Self::error(err)
    }
}

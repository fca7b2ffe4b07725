//! Provider error bindings
//!
//! Combines the JSON-RPC 2.0 error codes with the EIP-1193 provider codes
//! (<https://eips.ethereum.org/EIPS/eip-1193#provider-errors>) so that a page
//! always receives a conventional wallet error shape.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::{borrow::Cow, fmt};

/// Represents an error returned to the calling page
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RpcError {
    pub code: ErrorCode,
    /// error message
    pub message: Cow<'static, str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl RpcError {
    /// New [`RpcError`] with the given [`ErrorCode`].
    pub const fn new(code: ErrorCode) -> Self {
        Self { message: Cow::Borrowed(code.message()), code, data: None }
    }

    /// Creates a new `ParseError` error.
    pub const fn parse_error() -> Self {
        Self::new(ErrorCode::ParseError)
    }

    /// Creates a new `MethodNotFound` error.
    pub const fn method_not_found() -> Self {
        Self::new(ErrorCode::MethodNotFound)
    }

    /// Creates a new `InvalidRequest` error.
    pub const fn invalid_request() -> Self {
        Self::new(ErrorCode::InvalidRequest)
    }

    /// Creates a new `InternalError` error.
    pub const fn internal_error() -> Self {
        Self::new(ErrorCode::InternalError)
    }

    /// Creates a new `UserRejected` error.
    pub const fn user_rejected() -> Self {
        Self::new(ErrorCode::UserRejected)
    }

    /// Creates a new `Unauthorized` error.
    pub const fn unauthorized() -> Self {
        Self::new(ErrorCode::Unauthorized)
    }

    /// Creates a new `Disconnected` error.
    pub const fn disconnected() -> Self {
        Self::new(ErrorCode::Disconnected)
    }

    /// Creates a new `UnsupportedMethod` error.
    pub const fn unsupported_method() -> Self {
        Self::new(ErrorCode::UnsupportedMethod)
    }

    /// Creates a new `UnsupportedMethod` error with a message.
    pub fn unsupported_method_with<M>(message: M) -> Self
    where
        M: Into<String>,
    {
        Self { code: ErrorCode::UnsupportedMethod, message: message.into().into(), data: None }
    }

    /// Creates a new `UnrecognizedChain` error with a message.
    pub fn unrecognized_chain<M>(message: M) -> Self
    where
        M: Into<String>,
    {
        Self { code: ErrorCode::UnrecognizedChain, message: message.into().into(), data: None }
    }

    /// Creates a new `InvalidParams` error.
    pub fn invalid_params<M>(message: M) -> Self
    where
        M: Into<String>,
    {
        Self { code: ErrorCode::InvalidParams, message: message.into().into(), data: None }
    }

    /// Creates a new `InternalError` error with a message.
    pub fn internal_error_with<M>(message: M) -> Self
    where
        M: Into<String>,
    {
        Self { code: ErrorCode::InternalError, message: message.into().into(), data: None }
    }
}

impl fmt::Display for RpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.message(), self.message)
    }
}

impl std::error::Error for RpcError {}

/// List of known provider error codes
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorCode {
    /// Received invalid JSON, or params that don't match the method's schema
    ParseError,
    /// Received an invalid request object
    InvalidRequest,
    /// Method does not exist in any lane
    MethodNotFound,
    /// Invalid method parameter
    InvalidParams,
    /// Internal call error
    InternalError,
    /// EIP-1193: the user rejected the request
    UserRejected,
    /// EIP-1193: the requested method/account has not been authorized
    Unauthorized,
    /// EIP-1193: the provider does not support the requested method
    UnsupportedMethod,
    /// EIP-1193: the provider is disconnected from all chains
    Disconnected,
    /// EIP-1193: the provider is not connected to the requested chain
    ChainDisconnected,
    /// EIP-3326 convention: the wallet does not recognize the requested chain
    UnrecognizedChain,
    /// Used for server specific errors.
    ServerError(i64),
}

impl ErrorCode {
    /// Returns the error code as `i64`
    pub fn code(&self) -> i64 {
        match *self {
            Self::ParseError => -32700,
            Self::InvalidRequest => -32600,
            Self::MethodNotFound => -32601,
            Self::InvalidParams => -32602,
            Self::InternalError => -32603,
            Self::UserRejected => 4001,
            Self::Unauthorized => 4100,
            Self::UnsupportedMethod => 4200,
            Self::Disconnected => 4900,
            Self::ChainDisconnected => 4901,
            Self::UnrecognizedChain => 4902,
            Self::ServerError(c) => c,
        }
    }

    /// Returns the message associated with the error
    pub const fn message(&self) -> &'static str {
        match *self {
            Self::ParseError => "Parse error",
            Self::InvalidRequest => "Invalid request",
            Self::MethodNotFound => "Method not found",
            Self::InvalidParams => "Invalid params",
            Self::InternalError => "Internal error",
            Self::UserRejected => "User rejected the request",
            Self::Unauthorized => "Unauthorized",
            Self::UnsupportedMethod => "Unsupported method",
            Self::Disconnected => "Disconnected",
            Self::ChainDisconnected => "Chain disconnected",
            Self::UnrecognizedChain => "Unrecognized chain",
            Self::ServerError(_) => "Server error",
        }
    }
}

impl Serialize for ErrorCode {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_i64(self.code())
    }
}

impl<'a> Deserialize<'a> for ErrorCode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'a>,
    {
        i64::deserialize(deserializer).map(Into::into)
    }
}

impl From<i64> for ErrorCode {
    fn from(code: i64) -> Self {
        match code {
            -32700 => Self::ParseError,
            -32600 => Self::InvalidRequest,
            -32601 => Self::MethodNotFound,
            -32602 => Self::InvalidParams,
            -32603 => Self::InternalError,
            4001 => Self::UserRejected,
            4100 => Self::Unauthorized,
            4200 => Self::UnsupportedMethod,
            4900 => Self::Disconnected,
            4901 => Self::ChainDisconnected,
            4902 => Self::UnrecognizedChain,
            _ => Self::ServerError(code),
        }
    }
}

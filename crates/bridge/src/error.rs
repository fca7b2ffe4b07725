//! Internal error types of the bridge.
//!
//! Each layer has its own error enum; everything that can reach a page is
//! converted into an [`RpcError`] at the facade boundary so pages only ever
//! see conventional provider error shapes.

use alloy_primitives::ChainId;
use dapp_bridge_rpc::{ErrorCode, RpcError};
use thiserror::Error;

/// Errors of the connection store and its persistence path.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A store operation ran before `init` completed.
    #[error("connection store has not been initialized")]
    Uninitialized,
    /// The persisted snapshot exists but does not parse. Absence of a
    /// snapshot is not an error; corruption is surfaced loudly instead of
    /// silently wiping state.
    #[error("persisted connection state is corrupt: {0}")]
    Corrupt(#[source] serde_json::Error),
    #[error("storage backend failure: {0}")]
    Backend(#[from] std::io::Error),
}

/// Errors of the request/response correlation channel.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// The bounded wait for a response elapsed.
    #[error("no response within {0:?}")]
    Timeout(std::time::Duration),
    /// The background endpoint is gone; nothing will ever answer.
    #[error("background endpoint disconnected")]
    Disconnected,
}

impl From<ChannelError> for RpcError {
    fn from(err: ChannelError) -> Self {
        match err {
            ChannelError::Timeout(_) => Self::internal_error_with(err.to_string()),
            ChannelError::Disconnected => Self::disconnected(),
        }
    }
}

/// Errors produced while the background context resolves a request.
#[derive(Debug, Error)]
pub enum BackgroundError {
    /// The wallet has no account that could serve the request.
    #[error("no active account")]
    NoActiveAccount,
    /// The requesting origin is not connected to the address it named.
    #[error("address not authorized for this origin")]
    NotAuthorized,
    /// The user (via the approval policy) declined the request.
    #[error("request rejected")]
    Rejected,
    /// The requested chain is not in the wallet's chain table.
    #[error("unrecognized chain id {0}")]
    UnrecognizedChain(ChainId),
    /// The chain is recognized but no node endpoint is available for it.
    #[error("no node endpoint for chain id {0}")]
    ChainUnavailable(ChainId),
    #[error("invalid request payload: {0}")]
    InvalidPayload(String),
    #[error(transparent)]
    Signer(#[from] SignerError),
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<BackgroundError> for RpcError {
    fn from(err: BackgroundError) -> Self {
        match err {
            BackgroundError::NoActiveAccount | BackgroundError::NotAuthorized => {
                Self::unauthorized()
            }
            BackgroundError::Rejected => Self::user_rejected(),
            BackgroundError::UnrecognizedChain(id) => {
                Self::unrecognized_chain(format!("unrecognized chain id {id}"))
            }
            BackgroundError::ChainUnavailable(_) => Self::new(ErrorCode::ChainDisconnected),
            BackgroundError::InvalidPayload(msg) => Self::invalid_params(msg),
            BackgroundError::Signer(err) => Self::internal_error_with(err.to_string()),
            BackgroundError::Provider(err) => err.into(),
            BackgroundError::Store(err) => Self::internal_error_with(err.to_string()),
        }
    }
}

/// Errors from the signing collaborator.
#[derive(Debug, Error)]
pub enum SignerError {
    #[error("signer failure: {0}")]
    Sign(#[from] alloy_signer::Error),
    #[error("typed data is not EIP-712 encodable: {0}")]
    TypedData(String),
    #[error("transaction is missing required field `{0}`")]
    MissingField(&'static str),
}

/// Errors from the node-provider collaborator.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("node transport failure: {0}")]
    Transport(String),
    /// The node answered with a JSON-RPC error of its own.
    #[error(transparent)]
    Rpc(RpcError),
    #[error("node returned an unexpected payload: {0}")]
    UnexpectedPayload(String),
}

impl From<ProviderError> for RpcError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::Rpc(err) => err,
            other => Self::internal_error_with(other.to_string()),
        }
    }
}

/// Top-level error for constructing and running the bridge.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error(transparent)]
    Store(#[from] StoreError),
}

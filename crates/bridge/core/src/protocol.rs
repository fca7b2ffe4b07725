//! Typed messages exchanged between the page, the injected provider and the
//! background context.
//!
//! Every request/response pair is correlated by a [`Uuid`] request id. The
//! wire shape is a tagged JSON object (`"type"` discriminant, camelCase
//! fields) so the other side can dispatch without sniffing payloads.

use crate::transaction::TransactionRequest;
use alloy_primitives::{Address, Bytes, ChainId, TxHash};
use dapp_bridge_rpc::RpcError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// A raw EIP-1193 request as received from the page.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageRequest {
    pub method: String,
    pub request_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl PageRequest {
    pub fn new(method: impl Into<String>, params: Option<Value>) -> Self {
        Self { method: method.into(), request_id: Uuid::new_v4(), params }
    }
}

/// Identifies the page a request came from, so pushes can be routed back.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SenderTab {
    pub id: u64,
    pub origin: String,
}

/// A request the injected provider sends to the background context.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum DappRequest {
    /// Silent read of the connection state for the sender's origin.
    GetAccount { request_id: Uuid },
    /// Connect flow; may prompt the user.
    RequestAccount { request_id: Uuid },
    GetChainId { request_id: Uuid },
    /// `wallet_switchEthereumChain`; `chain_id` is the page's hex quantity.
    ChangeChain { request_id: Uuid, chain_id: String },
    SendTransaction { request_id: Uuid, transaction: TransactionRequest },
    /// `personal_sign`; the message stays hex-encoded until the signer needs
    /// the raw bytes.
    SignMessage { request_id: Uuid, message_hex: String, address: Address },
    /// `eth_signTypedData_v4` with the typed-data payload still as JSON.
    SignTypedData { request_id: Uuid, typed_data: Value, address: Address },
    RevokePermissions { request_id: Uuid, permissions: Value },
    OpenPanel { request_id: Uuid },
}

impl DappRequest {
    pub fn request_id(&self) -> Uuid {
        match self {
            Self::GetAccount { request_id } |
            Self::RequestAccount { request_id } |
            Self::GetChainId { request_id } |
            Self::ChangeChain { request_id, .. } |
            Self::SendTransaction { request_id, .. } |
            Self::SignMessage { request_id, .. } |
            Self::SignTypedData { request_id, .. } |
            Self::RevokePermissions { request_id, .. } |
            Self::OpenPanel { request_id } => *request_id,
        }
    }

    /// Whether the request can be resolved without prompting the user.
    pub fn is_silent(&self) -> bool {
        matches!(
            self,
            Self::GetAccount { .. } |
                Self::GetChainId { .. } |
                Self::ChangeChain { .. } |
                Self::RevokePermissions { .. }
        )
    }
}

/// A response from the background context, correlated by request id.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum DappResponse {
    Account {
        request_id: Uuid,
        connected_addresses: Vec<Address>,
        chain_id: ChainId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        provider_url: Option<String>,
    },
    ChainId {
        request_id: Uuid,
        chain_id: ChainId,
    },
    ChainChange {
        request_id: Uuid,
        chain_id: ChainId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        provider_url: Option<String>,
    },
    SendTransaction {
        request_id: Uuid,
        transaction_hash: TxHash,
    },
    SignMessage {
        request_id: Uuid,
        signature: Bytes,
    },
    SignTypedData {
        request_id: Uuid,
        signature: Bytes,
    },
    RevokePermissions {
        request_id: Uuid,
    },
    OpenPanel {
        request_id: Uuid,
    },
    Error {
        request_id: Uuid,
        error: RpcError,
    },
}

impl DappResponse {
    pub fn request_id(&self) -> Uuid {
        match self {
            Self::Account { request_id, .. } |
            Self::ChainId { request_id, .. } |
            Self::ChainChange { request_id, .. } |
            Self::SendTransaction { request_id, .. } |
            Self::SignMessage { request_id, .. } |
            Self::SignTypedData { request_id, .. } |
            Self::RevokePermissions { request_id } |
            Self::OpenPanel { request_id } |
            Self::Error { request_id, .. } => *request_id,
        }
    }

    pub fn error(request_id: Uuid, error: RpcError) -> Self {
        Self::Error { request_id, error }
    }
}

/// An unsolicited push from the wallet to a connected page's provider.
///
/// Payloads are kept as strings so the provider can validate them and drop
/// malformed values instead of surfacing garbage to the page.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum WalletPush {
    SwitchChain {
        chain_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        provider_url: Option<String>,
    },
    UpdateConnections {
        addresses: Vec<String>,
    },
}

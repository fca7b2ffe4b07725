//! Extension lane: wallet-state and signing methods resolved by the
//! background context.
//!
//! Each call builds a typed [`DappRequest`], routes it through the channel
//! and translates the typed answer back into the page's JSON shape. Account
//! and chain answers also feed the facade mirrors so provider events fire
//! according to the maybe-emit rules.

use crate::handlers::ProviderContext;
use alloy_primitives::Address;
use dapp_bridge_core::{
    hex_chain_id, method::ExtensionMethod, DappRequest, DappResponse, PageRequest,
    TransactionRequest,
};
use dapp_bridge_rpc::{ResponseResult, RpcError};
use serde_json::{json, Value};

pub async fn handle(
    ctx: &dyn ProviderContext,
    method: ExtensionMethod,
    request: &PageRequest,
) -> ResponseResult {
    let dapp_request = match build_request(method, request) {
        Ok(dapp_request) => dapp_request,
        Err(err) => return ResponseResult::error(err),
    };

    match ctx.channel().send(dapp_request, ctx.tab()).await {
        Ok(response) => translate(ctx, method, response),
        Err(err) => ResponseResult::error(err.into()),
    }
}

/// Builds the typed background request for a page call, validating params.
fn build_request(method: ExtensionMethod, request: &PageRequest) -> Result<DappRequest, RpcError> {
    let request_id = request.request_id;
    match method {
        ExtensionMethod::Accounts | ExtensionMethod::GetPermissions => {
            Ok(DappRequest::GetAccount { request_id })
        }
        ExtensionMethod::RequestAccounts | ExtensionMethod::RequestPermissions => {
            Ok(DappRequest::RequestAccount { request_id })
        }
        ExtensionMethod::ChainId | ExtensionMethod::NetVersion => {
            Ok(DappRequest::GetChainId { request_id })
        }
        ExtensionMethod::SwitchEthereumChain => {
            let chain_id = first_param(request)?
                .get("chainId")
                .and_then(Value::as_str)
                .ok_or_else(|| RpcError::invalid_params("expected a `chainId` field"))?
                .to_string();
            Ok(DappRequest::ChangeChain { request_id, chain_id })
        }
        ExtensionMethod::SendTransaction => {
            let transaction: TransactionRequest = serde_json::from_value(first_param(request)?)
                .map_err(|err| RpcError::invalid_params(format!("malformed transaction: {err}")))?;
            Ok(DappRequest::SendTransaction { request_id, transaction })
        }
        ExtensionMethod::PersonalSign => {
            let (message_hex, address) = sign_params(request, 0, 1)?;
            Ok(DappRequest::SignMessage { request_id, message_hex, address })
        }
        ExtensionMethod::SignTypedDataV4 => {
            let params = param_array(request)?;
            let address = parse_address(params.first())?;
            let typed_data = match params.get(1) {
                // pages commonly send the payload pre-serialized
                Some(Value::String(raw)) => serde_json::from_str(raw).map_err(|err| {
                    RpcError::invalid_params(format!("malformed typed data: {err}"))
                })?,
                Some(value) => value.clone(),
                None => return Err(RpcError::invalid_params("expected typed data as second param")),
            };
            Ok(DappRequest::SignTypedData { request_id, typed_data, address })
        }
        ExtensionMethod::RevokePermissions => {
            Ok(DappRequest::RevokePermissions { request_id, permissions: first_param(request)? })
        }
    }
}

/// Turns the typed background answer into the page's JSON result and applies
/// mirror side effects.
fn translate(
    ctx: &dyn ProviderContext,
    method: ExtensionMethod,
    response: DappResponse,
) -> ResponseResult {
    match response {
        DappResponse::Error { error, .. } => ResponseResult::error(error),
        DappResponse::Account { connected_addresses, chain_id, .. } => {
            ctx.set_node_provider(chain_id);
            ctx.set_chain_id_and_maybe_emit(chain_id);
            ctx.set_connected_addresses_and_maybe_emit(connected_addresses.clone());
            match method {
                ExtensionMethod::GetPermissions | ExtensionMethod::RequestPermissions => {
                    ResponseResult::success(permissions(&connected_addresses))
                }
                _ => ResponseResult::success(connected_addresses),
            }
        }
        DappResponse::ChainId { chain_id, .. } => {
            ctx.set_node_provider(chain_id);
            ctx.set_chain_id_and_maybe_emit(chain_id);
            match method {
                ExtensionMethod::NetVersion => ResponseResult::success(chain_id.to_string()),
                _ => ResponseResult::success(hex_chain_id(chain_id)),
            }
        }
        DappResponse::ChainChange { chain_id, .. } => {
            ctx.set_node_provider(chain_id);
            ctx.set_chain_id_and_maybe_emit(chain_id);
            ResponseResult::Success(Value::Null)
        }
        DappResponse::SendTransaction { transaction_hash, .. } => {
            ResponseResult::success(transaction_hash)
        }
        DappResponse::SignMessage { signature, .. } |
        DappResponse::SignTypedData { signature, .. } => ResponseResult::success(signature),
        DappResponse::RevokePermissions { .. } => {
            ctx.set_connected_addresses_and_maybe_emit(Vec::new());
            ResponseResult::Success(Value::Null)
        }
        DappResponse::OpenPanel { .. } => ResponseResult::error(RpcError::internal_error_with(
            "unexpected response kind from background",
        )),
    }
}

/// EIP-2255 permission objects for the connected accounts.
fn permissions(addresses: &[Address]) -> Value {
    if addresses.is_empty() {
        return json!([]);
    }
    json!([{
        "parentCapability": "eth_accounts",
        "caveats": [{
            "type": "restrictReturnedAccounts",
            "value": addresses,
        }],
    }])
}

fn param_array(request: &PageRequest) -> Result<Vec<Value>, RpcError> {
    match &request.params {
        Some(Value::Array(params)) => Ok(params.clone()),
        _ => Err(RpcError::invalid_params("expected a params array")),
    }
}

fn first_param(request: &PageRequest) -> Result<Value, RpcError> {
    param_array(request)?
        .into_iter()
        .next()
        .ok_or_else(|| RpcError::invalid_params("expected at least one param"))
}

fn parse_address(value: Option<&Value>) -> Result<Address, RpcError> {
    value
        .and_then(Value::as_str)
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| RpcError::invalid_params("expected an address param"))
}

fn sign_params(
    request: &PageRequest,
    message_index: usize,
    address_index: usize,
) -> Result<(String, Address), RpcError> {
    let params = param_array(request)?;
    let message_hex = params
        .get(message_index)
        .and_then(Value::as_str)
        .ok_or_else(|| RpcError::invalid_params("expected a hex message param"))?
        .to_string();
    let address = parse_address(params.get(address_index))?;
    Ok((message_hex, address))
}

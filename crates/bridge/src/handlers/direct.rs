//! Direct lane: read-only node calls proxied to the current chain's endpoint.

use crate::handlers::ProviderContext;
use dapp_bridge_core::{method::DirectMethod, PageRequest};
use dapp_bridge_rpc::{ErrorCode, ResponseResult, RpcError};
use serde_json::Value;
use tracing::warn;

pub async fn handle(
    ctx: &dyn ProviderContext,
    method: DirectMethod,
    request: &PageRequest,
) -> ResponseResult {
    let Some(provider) = ctx.node_provider() else {
        return ResponseResult::error(RpcError::new(ErrorCode::ChainDisconnected));
    };

    let params = request.params.clone().unwrap_or_else(|| Value::Array(Vec::new()));
    match provider.send(&method.to_string(), params).await {
        Ok(value) => ResponseResult::Success(value),
        Err(err) => {
            warn!(target: "bridge::provider", %method, %err, "direct call failed");
            ResponseResult::error(err.into())
        }
    }
}

//! App lane: methods resolved by the wallet application itself.

use crate::handlers::ProviderContext;
use dapp_bridge_core::{method::AppMethod, DappRequest, DappResponse, PageRequest};
use dapp_bridge_rpc::{ResponseResult, RpcError};
use serde_json::Value;

pub async fn handle(
    ctx: &dyn ProviderContext,
    method: AppMethod,
    request: &PageRequest,
) -> ResponseResult {
    let dapp_request = match method {
        AppMethod::OpenPanel => DappRequest::OpenPanel { request_id: request.request_id },
    };

    match ctx.channel().send(dapp_request, ctx.tab()).await {
        Ok(DappResponse::OpenPanel { .. }) => ResponseResult::Success(Value::Null),
        Ok(DappResponse::Error { error, .. }) => ResponseResult::error(error),
        Ok(_) => ResponseResult::error(RpcError::internal_error_with(
            "unexpected response kind from background",
        )),
        Err(err) => ResponseResult::error(err.into()),
    }
}

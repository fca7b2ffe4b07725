//! Transaction submission and background lifecycle.

use crate::utils::{bridge, bridge_with, tab, Stall};
use dapp_bridge::{BridgeConfig, WalletSigner};
use dapp_bridge_core::PageRequest;
use dapp_bridge_rpc::ErrorCode;
use serde_json::json;
use std::{sync::Arc, time::Duration};

#[tokio::test]
async fn send_transaction_returns_the_hash() {
    let f = bridge(true).await;
    let provider = f.handle.provider_for_tab(tab());
    provider.handle(PageRequest::new("eth_requestAccounts", None)).await;

    let response = provider
        .handle(PageRequest::new(
            "eth_sendTransaction",
            Some(json!([{
                "from": f.signer.address(),
                "to": "0x0000000000000000000000000000000000000000",
                "value": "0x1",
            }])),
        ))
        .await;
    let hash = response.as_success().expect("expected a hash").as_str().unwrap();
    assert_eq!(hash, format!("0x{}", "42".repeat(32)));

    // the signed raw transaction reached the node exactly once
    assert_eq!(f.node.raw.lock().len(), 1);
}

#[tokio::test]
async fn rejected_transaction_is_4001() {
    let f = bridge(false).await;
    let provider = f.handle.provider_for_tab(tab());

    // connection rejected too, so connect through the store directly
    f.handle
        .store()
        .save_active_account(crate::utils::APP, f.signer.address().into(), 1, None)
        .unwrap();

    let response = provider
        .handle(PageRequest::new(
            "eth_sendTransaction",
            Some(json!([{ "from": f.signer.address(), "to": "0x0000000000000000000000000000000000000000" }])),
        ))
        .await;
    assert_eq!(response.as_error().unwrap().code, ErrorCode::UserRejected);
    assert!(f.node.raw.lock().is_empty());
}

#[tokio::test]
async fn unconnected_origin_may_not_spend() {
    let f = bridge(true).await;
    let provider = f.handle.provider_for_tab(tab());

    let response = provider
        .handle(PageRequest::new(
            "eth_sendTransaction",
            Some(json!([{ "from": f.signer.address(), "to": "0x0000000000000000000000000000000000000000" }])),
        ))
        .await;
    assert_eq!(response.as_error().unwrap().code, ErrorCode::Unauthorized);
}

#[tokio::test]
async fn stalled_approval_hits_the_bounded_wait() {
    let f = bridge_with(
        Arc::new(Stall),
        BridgeConfig::default().with_request_timeout(Duration::from_millis(50)),
    )
    .await;
    let provider = f.handle.provider_for_tab(tab());

    let response = provider.handle(PageRequest::new("eth_requestAccounts", None)).await;
    assert_eq!(response.as_error().unwrap().code, ErrorCode::InternalError);
}

#[tokio::test]
async fn shutdown_disconnects_in_flight_and_future_calls() {
    let f = bridge(true).await;
    let provider = f.handle.provider_for_tab(tab());

    provider.handle(PageRequest::new("eth_requestAccounts", None)).await;
    f.handle.shutdown().await;

    let response = provider.handle(PageRequest::new("eth_accounts", None)).await;
    assert_eq!(response.as_error().unwrap().code, ErrorCode::Disconnected);
}

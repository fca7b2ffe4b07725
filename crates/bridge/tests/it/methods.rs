//! Method routing: lanes, chain switching, signing and error shapes.

use crate::utils::{bridge, tab};
use dapp_bridge::{ProviderEvent, WalletSigner};
use dapp_bridge_core::PageRequest;
use dapp_bridge_rpc::ErrorCode;
use serde_json::json;
use uuid::Uuid;

#[tokio::test]
async fn direct_methods_proxy_to_the_node() {
    let f = bridge(true).await;
    let provider = f.handle.provider_for_tab(tab());

    // before any background answer there is no provider to proxy to
    let response = provider.handle(PageRequest::new("eth_blockNumber", None)).await;
    assert_eq!(response.as_error().unwrap().code, ErrorCode::ChainDisconnected);

    // any chain answer repoints the node provider
    provider.handle(PageRequest::new("eth_chainId", None)).await;
    let response = provider.handle(PageRequest::new("eth_blockNumber", None)).await;
    assert_eq!(response.as_success().unwrap(), &json!("0x10"));
}

#[tokio::test]
async fn switch_chain_updates_store_and_emits() {
    let f = bridge(true).await;
    let provider = f.handle.provider_for_tab(tab());
    provider.handle(PageRequest::new("eth_requestAccounts", None)).await;
    let mut events = provider.subscribe_events();

    let response = provider
        .handle(PageRequest::new("wallet_switchEthereumChain", Some(json!([{ "chainId": "0x89" }]))))
        .await;
    assert_eq!(response.as_success().unwrap(), &serde_json::Value::Null);

    assert_eq!(
        events.recv().await.unwrap(),
        ProviderEvent::ChainChanged { chain_id: "0x89".into() }
    );
    assert_eq!(f.handle.store().get(crate::utils::APP).unwrap().unwrap().last_chain_id, 137);
}

#[tokio::test]
async fn switch_to_unrecognized_chain_is_4902() {
    let f = bridge(true).await;
    let provider = f.handle.provider_for_tab(tab());

    let response = provider
        .handle(PageRequest::new(
            "wallet_switchEthereumChain",
            Some(json!([{ "chainId": "0xdead" }])),
        ))
        .await;
    assert_eq!(response.as_error().unwrap().code, ErrorCode::UnrecognizedChain);
}

#[tokio::test]
async fn personal_sign_round_trips() {
    let f = bridge(true).await;
    let provider = f.handle.provider_for_tab(tab());
    provider.handle(PageRequest::new("eth_requestAccounts", None)).await;

    let response = provider
        .handle(PageRequest::new(
            "personal_sign",
            Some(json!(["0x68656c6c6f", f.signer.address()])),
        ))
        .await;
    let signature = response.as_success().unwrap().as_str().unwrap();
    // 65 bytes, 0x-prefixed
    assert_eq!(signature.len(), 2 + 130);
}

#[tokio::test]
async fn deprecated_and_unknown_methods_stay_distinct() {
    let f = bridge(true).await;
    let provider = f.handle.provider_for_tab(tab());

    let response = provider.handle(PageRequest::new("eth_signTypedData_v3", None)).await;
    let err = response.as_error().unwrap();
    assert_eq!(err.code, ErrorCode::UnsupportedMethod);
    assert!(err.message.contains("deprecated"));

    let response = provider.handle(PageRequest::new("eth_makeItRain", None)).await;
    assert_eq!(response.as_error().unwrap().code, ErrorCode::MethodNotFound);
}

#[tokio::test]
async fn malformed_payloads_get_parse_errors() {
    let f = bridge(true).await;
    let provider = f.handle.provider_for_tab(tab());

    let id = Uuid::new_v4();
    let response = provider.request(json!({ "requestId": id, "method": ["not", "a", "string"] })).await;
    assert_eq!(response.as_error().unwrap().code, ErrorCode::ParseError);
    assert_eq!(response.request_id(), id);
}

#[tokio::test]
async fn invalid_params_are_rejected_before_routing() {
    let f = bridge(true).await;
    let provider = f.handle.provider_for_tab(tab());

    let response =
        provider.handle(PageRequest::new("wallet_switchEthereumChain", Some(json!([])))).await;
    assert_eq!(response.as_error().unwrap().code, ErrorCode::InvalidParams);

    let response = provider.handle(PageRequest::new("personal_sign", Some(json!(["0x00"])))).await;
    assert_eq!(response.as_error().unwrap().code, ErrorCode::InvalidParams);
}

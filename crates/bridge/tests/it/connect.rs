//! Connect, account and permission flows through the full stack.

use crate::utils::{bridge, tab, APP};
use dapp_bridge::{ProviderEvent, WalletSigner};
use dapp_bridge_core::PageRequest;
use dapp_bridge_rpc::ErrorCode;
use serde_json::json;

#[tokio::test]
async fn request_accounts_connects_and_mirrors() {
    let f = bridge(true).await;
    let provider = f.handle.provider_for_tab(tab());
    let mut events = provider.subscribe_events();

    let response = provider.handle(PageRequest::new("eth_requestAccounts", None)).await;
    let accounts = response.as_success().expect("expected accounts").clone();
    assert_eq!(accounts, json!([f.signer.address()]));

    // store has the record, active account first
    let record = f.handle.store().get(APP).unwrap().expect("origin connected");
    assert_eq!(record.active_connected_address, f.signer.address());
    assert_eq!(record.last_chain_id, 1);

    // first chain assignment announces the connection; the first accounts
    // assignment stays silent
    assert_eq!(events.recv().await.unwrap(), ProviderEvent::Connect { chain_id: "0x1".into() });
    assert!(events.try_recv().is_err());
}

#[tokio::test]
async fn accounts_on_fresh_origin_is_empty() {
    let f = bridge(true).await;
    let provider = f.handle.provider_for_tab(tab());

    let response = provider.handle(PageRequest::new("eth_accounts", None)).await;
    assert_eq!(response.as_success().unwrap(), &json!([]));
    assert_eq!(f.handle.store().get(APP).unwrap(), None);
}

#[tokio::test]
async fn chain_id_and_net_version_agree() {
    let f = bridge(true).await;
    let provider = f.handle.provider_for_tab(tab());

    let response = provider.handle(PageRequest::new("eth_chainId", None)).await;
    assert_eq!(response.as_success().unwrap(), &json!("0x1"));

    let response = provider.handle(PageRequest::new("net_version", None)).await;
    assert_eq!(response.as_success().unwrap(), &json!("1"));
}

#[tokio::test]
async fn permissions_reflect_connection_state() {
    let f = bridge(true).await;
    let provider = f.handle.provider_for_tab(tab());

    let response = provider.handle(PageRequest::new("wallet_getPermissions", None)).await;
    assert_eq!(response.as_success().unwrap(), &json!([]));

    provider.handle(PageRequest::new("eth_requestAccounts", None)).await;
    let response = provider.handle(PageRequest::new("wallet_getPermissions", None)).await;
    let perms = response.as_success().unwrap();
    assert_eq!(perms[0]["parentCapability"], "eth_accounts");
}

#[tokio::test]
async fn revoke_permissions_disconnects() {
    let f = bridge(true).await;
    let provider = f.handle.provider_for_tab(tab());
    provider.handle(PageRequest::new("eth_requestAccounts", None)).await;
    let mut events = provider.subscribe_events();

    let response = provider
        .handle(PageRequest::new(
            "wallet_revokePermissions",
            Some(json!([{ "eth_accounts": {} }])),
        ))
        .await;
    assert!(response.as_success().is_some());
    assert_eq!(f.handle.store().get(APP).unwrap(), None);

    assert_eq!(
        events.recv().await.unwrap(),
        ProviderEvent::AccountsChanged { addresses: vec![] }
    );
}

#[tokio::test]
async fn rejected_connect_leaves_no_trace() {
    let f = bridge(false).await;
    let provider = f.handle.provider_for_tab(tab());

    let response = provider.handle(PageRequest::new("eth_requestAccounts", None)).await;
    assert_eq!(response.as_error().unwrap().code, ErrorCode::UserRejected);
    assert_eq!(f.handle.store().get(APP).unwrap(), None);
}

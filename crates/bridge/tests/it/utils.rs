//! Shared fixtures: a bridge wired with an in-memory node and a fixed
//! approval decision.

use alloy_primitives::{Bytes, TxHash, B256};
use async_trait::async_trait;
use dapp_bridge::{
    spawn, ApprovalPolicy, BridgeConfig, BridgeHandle, Collaborators, LocalWalletSigner,
    MapProviderFactory, NodeProvider, ProviderError, WalletSigner,
};
use dapp_bridge_core::{DappRequest, SenderTab};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::Arc;

pub const APP: &str = "https://app.example.org";

/// Captures bridge log output per test; repeat calls are no-ops.
fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

pub fn tab() -> SenderTab {
    SenderTab { id: 1, origin: APP.into() }
}

/// Node stub answering the read methods the bridge asks for and recording
/// submitted transactions.
pub struct MockNode {
    pub raw: Mutex<Vec<Bytes>>,
}

impl MockNode {
    pub fn new() -> Arc<Self> {
        Arc::new(Self { raw: Mutex::new(Vec::new()) })
    }
}

#[async_trait]
impl NodeProvider for MockNode {
    async fn send(&self, method: &str, _params: Value) -> Result<Value, ProviderError> {
        match method {
            "eth_blockNumber" => Ok(json!("0x10")),
            "eth_getBalance" => Ok(json!("0xde0b6b3a7640000")),
            "eth_getTransactionCount" => Ok(json!("0x0")),
            "eth_gasPrice" => Ok(json!("0x3b9aca00")),
            "eth_estimateGas" => Ok(json!("0x5208")),
            other => Err(ProviderError::Transport(format!("unexpected method {other}"))),
        }
    }

    async fn send_raw_transaction(&self, raw: Bytes) -> Result<TxHash, ProviderError> {
        self.raw.lock().push(raw);
        Ok(B256::repeat_byte(0x42))
    }

    async fn wait_for_transaction(&self, _hash: TxHash) -> Result<(), ProviderError> {
        Ok(())
    }
}

pub struct Decide(pub bool);

#[async_trait]
impl ApprovalPolicy for Decide {
    async fn approve(&self, _tab: &SenderTab, _request: &DappRequest) -> bool {
        self.0
    }
}

/// Policy that never answers; for exercising the bounded wait.
pub struct Stall;

#[async_trait]
impl ApprovalPolicy for Stall {
    async fn approve(&self, _tab: &SenderTab, _request: &DappRequest) -> bool {
        futures::future::pending().await
    }
}

pub struct Fixture {
    pub handle: BridgeHandle,
    pub signer: LocalWalletSigner,
    pub node: Arc<MockNode>,
}

pub async fn bridge_with(policy: Arc<dyn ApprovalPolicy>, config: BridgeConfig) -> Fixture {
    init_tracing();
    let signer = LocalWalletSigner::random();
    let node = MockNode::new();
    let providers =
        Arc::new(MapProviderFactory::new().with(1, node.clone()).with(137, node.clone()));

    let collaborators = Collaborators {
        signer: Some(Arc::new(signer.clone()) as Arc<dyn WalletSigner>),
        providers,
        policy,
    };
    let handle = spawn(config, collaborators).await.unwrap();
    Fixture { handle, signer, node }
}

pub async fn bridge(approve: bool) -> Fixture {
    bridge_with(
        Arc::new(Decide(approve)),
        BridgeConfig::default().with_chain(137, "https://polygon.example"),
    )
    .await
}

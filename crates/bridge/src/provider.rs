//! Node-provider collaborators.
//!
//! The bridge never talks to a blockchain node itself; it drives these traits
//! and callers plug in the real transport.

use crate::error::ProviderError;
use alloy_primitives::{Bytes, ChainId, TxHash};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::{collections::HashMap, sync::Arc};

/// A JSON-RPC endpoint for one chain.
#[async_trait]
pub trait NodeProvider: Send + Sync + 'static {
    /// Forwards a raw method call and returns the node's result value.
    async fn send(&self, method: &str, params: Value) -> Result<Value, ProviderError>;

    /// Submits a signed transaction and returns its hash.
    async fn send_raw_transaction(&self, raw: Bytes) -> Result<TxHash, ProviderError>;

    /// Resolves once the transaction is included (or the node gives up on it).
    async fn wait_for_transaction(&self, hash: TxHash) -> Result<(), ProviderError>;
}

/// Resolves a [`NodeProvider`] per chain. `None` means the wallet has no
/// endpoint for that chain.
pub trait ProviderFactory: Send + Sync + 'static {
    fn provider_for(&self, chain_id: ChainId) -> Option<Arc<dyn NodeProvider>>;
}

/// Factory backed by a fixed chain table.
#[derive(Default)]
pub struct MapProviderFactory {
    providers: Mutex<HashMap<ChainId, Arc<dyn NodeProvider>>>,
}

impl MapProviderFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or replaces) the provider for a chain.
    pub fn insert(&self, chain_id: ChainId, provider: Arc<dyn NodeProvider>) {
        self.providers.lock().insert(chain_id, provider);
    }

    pub fn with(self, chain_id: ChainId, provider: Arc<dyn NodeProvider>) -> Self {
        self.insert(chain_id, provider);
        self
    }
}

impl ProviderFactory for MapProviderFactory {
    fn provider_for(&self, chain_id: ChainId) -> Option<Arc<dyn NodeProvider>> {
        self.providers.lock().get(&chain_id).cloned()
    }
}

//! Bridge configuration.

use alloy_primitives::ChainId;
use dapp_bridge_core::DEFAULT_CHAIN_ID;
use std::{collections::HashMap, path::PathBuf, time::Duration};

/// Default bounded wait for a background response.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Configuration for a bridge instance.
///
/// Plain data with `with_*` builders; no CLI layer, callers assemble this in
/// code.
#[derive(Clone, Debug)]
pub struct BridgeConfig {
    /// Chain used for origins that never switched chains.
    pub default_chain_id: ChainId,
    /// Chains the wallet recognizes, with their RPC endpoints. Switching to a
    /// chain outside this table is rejected.
    pub chains: HashMap<ChainId, String>,
    /// Upper bound on how long a provider call waits for the background
    /// context before failing.
    pub request_timeout: Duration,
    /// Where the connection state snapshot lives. `None` keeps state in
    /// memory only.
    pub storage_path: Option<PathBuf>,
    /// Whether the wallet has finished onboarding. Until it has, provider
    /// calls are gated.
    pub onboarded: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            default_chain_id: DEFAULT_CHAIN_ID,
            chains: HashMap::new(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            storage_path: None,
            onboarded: true,
        }
    }
}

impl BridgeConfig {
    /// Sets the default chain id.
    #[must_use]
    pub fn with_default_chain_id(mut self, chain_id: ChainId) -> Self {
        self.default_chain_id = chain_id;
        self
    }

    /// Adds a recognized chain and its RPC endpoint.
    #[must_use]
    pub fn with_chain(mut self, chain_id: ChainId, rpc_url: impl Into<String>) -> Self {
        self.chains.insert(chain_id, rpc_url.into());
        self
    }

    /// Sets the bounded wait for background responses.
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Persists connection state to the given file.
    #[must_use]
    pub fn with_storage_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.storage_path = Some(path.into());
        self
    }

    /// Sets the onboarding flag.
    #[must_use]
    pub fn with_onboarded(mut self, onboarded: bool) -> Self {
        self.onboarded = onboarded;
        self
    }

    /// Whether `chain_id` is in the chain table. The default chain is always
    /// recognized.
    pub fn supports_chain(&self, chain_id: ChainId) -> bool {
        chain_id == self.default_chain_id || self.chains.contains_key(&chain_id)
    }

    /// RPC endpoint for `chain_id`, if configured.
    pub fn rpc_url(&self, chain_id: ChainId) -> Option<&str> {
        self.chains.get(&chain_id).map(String::as_str)
    }
}

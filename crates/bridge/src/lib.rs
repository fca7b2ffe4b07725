//! dApp connection and request-routing core.
//!
//! The bridge sits between dApp pages and a wallet: an [`InjectedProvider`]
//! per tab classifies EIP-1193 calls into lanes, the [`DappStore`] keeps
//! per-origin connection records, the correlation [`channel`] pairs requests
//! with background responses by id, and the [`BackgroundTask`] resolves
//! wallet-state and signing requests through pluggable collaborators.
//!
//! # Example
//!
//! ```no_run
//! use dapp_bridge::{spawn, BridgeConfig, Collaborators, LocalWalletSigner, MapProviderFactory};
//! use dapp_bridge_core::SenderTab;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), dapp_bridge::BridgeError> {
//! let config = BridgeConfig::default().with_chain(1, "https://eth.example");
//! let collaborators = Collaborators {
//!     signer: Some(Arc::new(LocalWalletSigner::random())),
//!     providers: Arc::new(MapProviderFactory::new()),
//!     policy: Arc::new(dapp_bridge::AutoApprove),
//! };
//! let handle = spawn(config, collaborators).await?;
//! let _provider =
//!     handle.provider_for_tab(SenderTab { id: 1, origin: "https://app.example".into() });
//! # Ok(())
//! # }
//! ```

pub mod background;
pub mod channel;
pub mod config;
pub mod error;
pub mod facade;
pub mod handlers;
pub mod provider;
pub mod signer;
pub mod storage;
pub mod store;

pub use background::BackgroundTask;
pub use config::{BridgeConfig, DEFAULT_REQUEST_TIMEOUT};
pub use error::{BackgroundError, BridgeError, ChannelError, ProviderError, SignerError, StoreError};
pub use facade::{InjectedProvider, ProviderEvent};
pub use provider::{MapProviderFactory, NodeProvider, ProviderFactory};
pub use signer::{ApprovalPolicy, AutoApprove, LocalWalletSigner, WalletSigner};
pub use storage::{JsonFileStorage, MemoryStorage, StorageBackend};
pub use store::DappStore;

use channel::DappChannel;
use dapp_bridge_core::SenderTab;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// The pluggable pieces the bridge drives but does not implement.
pub struct Collaborators {
    /// The wallet's signing account. `None` models a wallet with no active
    /// account; every account-dependent request then fails as unauthorized.
    pub signer: Option<Arc<dyn WalletSigner>>,
    /// Node endpoints per chain.
    pub providers: Arc<dyn ProviderFactory>,
    /// Decides interactive requests.
    pub policy: Arc<dyn ApprovalPolicy>,
}

/// A running bridge: store, channel and background task.
pub struct BridgeHandle {
    store: DappStore,
    channel: DappChannel,
    config: BridgeConfig,
    factory: Arc<dyn ProviderFactory>,
    background: JoinHandle<()>,
}

impl BridgeHandle {
    /// The connection store, for wallet-side reads and mutations.
    pub fn store(&self) -> &DappStore {
        &self.store
    }

    /// Creates the injected provider for a tab, with its push listener
    /// already running.
    pub fn provider_for_tab(&self, tab: SenderTab) -> InjectedProvider {
        let provider =
            InjectedProvider::new(tab, self.channel.clone(), self.factory.clone(), &self.config);
        provider.start_push_listener();
        provider
    }

    /// Stops the background task and waits for pending persistence. In-flight
    /// provider calls fail with a disconnected error.
    pub async fn shutdown(self) {
        self.background.abort();
        self.store.flush().await;
    }
}

/// Builds and starts a bridge: loads the store, wires the channel and spawns
/// the background task.
pub async fn spawn(
    config: BridgeConfig,
    collaborators: Collaborators,
) -> Result<BridgeHandle, BridgeError> {
    let storage: Arc<dyn StorageBackend> = match &config.storage_path {
        Some(path) => Arc::new(JsonFileStorage::new(path)),
        None => Arc::new(MemoryStorage::new()),
    };
    let store = DappStore::new(storage);
    store.init().await?;

    let (channel, endpoint) = channel::channel(config.request_timeout);
    let background = BackgroundTask::new(
        endpoint,
        store.clone(),
        collaborators.signer,
        Arc::clone(&collaborators.providers),
        collaborators.policy,
        config.clone(),
    )
    .spawn();

    Ok(BridgeHandle { store, channel, config, factory: collaborators.providers, background })
}

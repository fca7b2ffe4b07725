//! The injected provider facade.
//!
//! One instance per page/tab. Every call enters through [`InjectedProvider::request`],
//! is classified into a lane and leaves as exactly one [`RpcResponse`];
//! failures of any kind become structured errors, never panics into the page.
//!
//! The facade mirrors the chain id and connected accounts it last saw from
//! the background and emits EIP-1193 events on changes: the first assignment
//! of the chain mirror emits `connect` (not `chainChanged`), the first
//! assignment of the accounts mirror is silent, and same-value writes emit
//! nothing.

use crate::{
    channel::DappChannel,
    config::BridgeConfig,
    handlers::{self, ProviderContext},
    provider::{NodeProvider, ProviderFactory},
};
use alloy_primitives::{Address, ChainId};
use dapp_bridge_core::{
    classify, hex_chain_id, parse_hex_chain_id, MethodLane, PageRequest, SenderTab, WalletPush,
};
use dapp_bridge_rpc::{ResponseResult, RpcError, RpcResponse};
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use tokio::sync::broadcast;
use tracing::warn;
use uuid::Uuid;

/// Methods a not-yet-onboarded wallet still reacts to, by surfacing
/// onboarding before rejecting the call.
const ONBOARDING_METHODS: &[&str] = &["eth_requestAccounts", "wallet_requestPermissions"];

const EVENT_CAPACITY: usize = 32;

/// EIP-1193 events emitted to the page.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProviderEvent {
    /// The chain mirror was established for the first time.
    Connect { chain_id: String },
    /// The chain mirror changed to a different chain.
    ChainChanged { chain_id: String },
    /// The accounts mirror changed after its first assignment.
    AccountsChanged { addresses: Vec<Address> },
    /// A gated call asked for onboarding to be surfaced.
    OnboardingRequested,
}

#[derive(Default)]
struct Mirrors {
    chain_id: Option<ChainId>,
    accounts: Option<Vec<Address>>,
    provider: Option<Arc<dyn NodeProvider>>,
}

struct FacadeInner {
    tab: SenderTab,
    channel: DappChannel,
    factory: Arc<dyn ProviderFactory>,
    mirrors: Mutex<Mirrors>,
    events: broadcast::Sender<ProviderEvent>,
    onboarded: AtomicBool,
    push_listener: Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl Drop for FacadeInner {
    fn drop(&mut self) {
        self.channel.unsubscribe_pushes(self.tab.id);
        if let Some(listener) = self.push_listener.lock().take() {
            listener.abort();
        }
    }
}

/// Page-facing provider bound to one tab. Cheap to clone.
#[derive(Clone)]
pub struct InjectedProvider {
    inner: Arc<FacadeInner>,
}

impl InjectedProvider {
    pub fn new(
        tab: SenderTab,
        channel: DappChannel,
        factory: Arc<dyn ProviderFactory>,
        config: &BridgeConfig,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(FacadeInner {
                tab,
                channel,
                factory,
                mirrors: Mutex::new(Mirrors::default()),
                events,
                onboarded: AtomicBool::new(config.onboarded),
                push_listener: Mutex::new(None),
            }),
        }
    }

    /// Subscribes to the events this provider emits into its page.
    pub fn subscribe_events(&self) -> broadcast::Receiver<ProviderEvent> {
        self.inner.events.subscribe()
    }

    /// Marks onboarding as finished (or not); gated calls check this.
    pub fn set_onboarded(&self, onboarded: bool) {
        self.inner.onboarded.store(onboarded, Ordering::Relaxed);
    }

    /// Starts applying wallet pushes for this tab to the mirrors. Idempotent;
    /// the listener stops when the provider is dropped.
    ///
    /// The task holds only a weak handle, so it never keeps a dropped
    /// provider alive.
    pub fn start_push_listener(&self) {
        let mut slot = self.inner.push_listener.lock();
        if slot.is_some() {
            return;
        }
        let weak = Arc::downgrade(&self.inner);
        let mut pushes = self.inner.channel.subscribe_pushes(self.inner.tab.id);
        *slot = Some(tokio::spawn(async move {
            while let Some(push) = pushes.recv().await {
                match weak.upgrade() {
                    Some(inner) => Self { inner }.apply_push(push),
                    None => return,
                }
            }
        }));
    }

    /// Entry point for a raw page payload. Malformed payloads get a parse
    /// error response addressed to whatever request id can be salvaged.
    pub async fn request(&self, raw: Value) -> RpcResponse {
        let request: PageRequest = match serde_json::from_value(raw.clone()) {
            Ok(request) => request,
            Err(err) => {
                warn!(target: "bridge::provider", origin = %self.inner.tab.origin, %err, "malformed page request");
                let request_id = raw
                    .get("requestId")
                    .and_then(|id| serde_json::from_value(id.clone()).ok())
                    .unwrap_or_else(Uuid::nil);
                return RpcResponse::new(request_id, RpcError::parse_error());
            }
        };
        self.handle(request).await
    }

    /// Classifies and dispatches one well-formed page request.
    pub async fn handle(&self, request: PageRequest) -> RpcResponse {
        let request_id = request.request_id;

        if !self.inner.onboarded.load(Ordering::Relaxed) {
            return RpcResponse::new(request_id, self.onboarding_gate(&request.method));
        }

        let result = match classify(&request.method) {
            MethodLane::Direct(method) => handlers::direct::handle(self, method, &request).await,
            MethodLane::App(method) => handlers::app::handle(self, method, &request).await,
            MethodLane::Extension(method) => {
                handlers::extension::handle(self, method, &request).await
            }
            MethodLane::Deprecated => ResponseResult::error(RpcError::unsupported_method_with(
                format!("the method {} is deprecated", request.method),
            )),
            MethodLane::Unsupported => ResponseResult::error(RpcError::unsupported_method_with(
                format!("the method {} is not supported", request.method),
            )),
            MethodLane::Unknown => {
                warn!(
                    target: "bridge::provider",
                    origin = %self.inner.tab.origin,
                    method = %request.method,
                    "unknown method"
                );
                ResponseResult::error(RpcError::method_not_found())
            }
        };
        RpcResponse::new(request_id, result)
    }

    fn onboarding_gate(&self, method: &str) -> RpcError {
        if ONBOARDING_METHODS.contains(&method) {
            let _ = self.inner.events.send(ProviderEvent::OnboardingRequested);
            RpcError::user_rejected()
        } else {
            RpcError::unauthorized()
        }
    }

    fn apply_push(&self, push: WalletPush) {
        match push {
            WalletPush::SwitchChain { chain_id, .. } => match parse_hex_chain_id(&chain_id) {
                Some(chain_id) => {
                    self.set_node_provider(chain_id);
                    self.set_chain_id_and_maybe_emit(chain_id);
                }
                None => {
                    warn!(target: "bridge::provider", %chain_id, "malformed chain id in push dropped");
                }
            },
            WalletPush::UpdateConnections { addresses } => {
                let mut parsed = Vec::with_capacity(addresses.len());
                for raw in addresses {
                    match raw.parse::<Address>() {
                        Ok(address) => parsed.push(address),
                        Err(_) => {
                            warn!(target: "bridge::provider", address = %raw, "malformed address in push dropped");
                        }
                    }
                }
                self.set_connected_addresses_and_maybe_emit(parsed);
            }
        }
    }

    fn emit(&self, event: ProviderEvent) {
        // nobody listening is fine
        let _ = self.inner.events.send(event);
    }
}

impl ProviderContext for InjectedProvider {
    fn tab(&self) -> SenderTab {
        self.inner.tab.clone()
    }

    fn channel(&self) -> &DappChannel {
        &self.inner.channel
    }

    fn chain_id(&self) -> Option<ChainId> {
        self.inner.mirrors.lock().chain_id
    }

    fn set_chain_id_and_maybe_emit(&self, chain_id: ChainId) {
        let event = {
            let mut mirrors = self.inner.mirrors.lock();
            match mirrors.chain_id {
                Some(current) if current == chain_id => None,
                Some(_) => {
                    mirrors.chain_id = Some(chain_id);
                    Some(ProviderEvent::ChainChanged { chain_id: hex_chain_id(chain_id) })
                }
                None => {
                    mirrors.chain_id = Some(chain_id);
                    Some(ProviderEvent::Connect { chain_id: hex_chain_id(chain_id) })
                }
            }
        };
        if let Some(event) = event {
            self.emit(event);
        }
    }

    fn connected_addresses(&self) -> Vec<Address> {
        self.inner.mirrors.lock().accounts.clone().unwrap_or_default()
    }

    fn set_connected_addresses_and_maybe_emit(&self, addresses: Vec<Address>) {
        let event = {
            let mut mirrors = self.inner.mirrors.lock();
            match &mirrors.accounts {
                Some(current) if *current == addresses => None,
                Some(_) => {
                    mirrors.accounts = Some(addresses.clone());
                    Some(ProviderEvent::AccountsChanged { addresses })
                }
                None => {
                    mirrors.accounts = Some(addresses);
                    None
                }
            }
        };
        if let Some(event) = event {
            self.emit(event);
        }
    }

    fn node_provider(&self) -> Option<Arc<dyn NodeProvider>> {
        self.inner.mirrors.lock().provider.clone()
    }

    fn set_node_provider(&self, chain_id: ChainId) {
        self.inner.mirrors.lock().provider = self.inner.factory.provider_for(chain_id);
    }
}

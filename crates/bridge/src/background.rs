//! Background request queue and signing saga.
//!
//! Requests arrive over the [`BackgroundEndpoint`], move through a per-request
//! state machine (received, account resolved, confirmed or rejected,
//! delivered) and leave with exactly one terminal response. Silent requests
//! auto-confirm; interactive ones go through the [`ApprovalPolicy`]. A wallet
//! with no active account fails every account-dependent request, fatally for
//! that request only.

use crate::{
    channel::{BackgroundEndpoint, RoutedRequest},
    config::BridgeConfig,
    error::{BackgroundError, ProviderError},
    provider::{NodeProvider, ProviderFactory},
    signer::{ApprovalPolicy, WalletSigner},
    store::DappStore,
};
use alloy_consensus::TxLegacy;
use alloy_dyn_abi::TypedData;
use alloy_primitives::{hex, Address, ChainId, TxKind, U256};
use dapp_bridge_core::{DappRequest, DappResponse, TransactionRequest, WalletPush};
use serde_json::{json, Value};
use std::{collections::HashMap, sync::Arc};
use tokio::task::JoinHandle;
use tracing::{trace, warn};
use uuid::Uuid;

/// Lifecycle of a queued request. `Delivered` is implicit: the entry is
/// removed when its response goes out.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum RequestPhase {
    Received,
    AccountResolved(Address),
    Confirmed,
    Rejected,
}

/// The background half of the bridge. Owns the request queue and drives the
/// collaborators.
pub struct BackgroundTask {
    endpoint: BackgroundEndpoint,
    store: DappStore,
    signer: Option<Arc<dyn WalletSigner>>,
    providers: Arc<dyn ProviderFactory>,
    policy: Arc<dyn ApprovalPolicy>,
    config: BridgeConfig,
    queue: HashMap<Uuid, RequestPhase>,
}

impl BackgroundTask {
    pub fn new(
        endpoint: BackgroundEndpoint,
        store: DappStore,
        signer: Option<Arc<dyn WalletSigner>>,
        providers: Arc<dyn ProviderFactory>,
        policy: Arc<dyn ApprovalPolicy>,
        config: BridgeConfig,
    ) -> Self {
        Self { endpoint, store, signer, providers, policy, config, queue: HashMap::new() }
    }

    /// Runs the queue on a spawned task.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Consumes requests until every facade handle is gone.
    pub async fn run(mut self) {
        while let Some(routed) = self.endpoint.recv().await {
            self.process(routed).await;
        }
        trace!(target: "bridge::background", "all facade handles dropped, stopping");
    }

    async fn process(&mut self, routed: RoutedRequest) {
        let request_id = routed.request.request_id();
        self.queue.insert(request_id, RequestPhase::Received);

        let response = match self.resolve(&routed).await {
            Ok(response) => response,
            Err(err) => {
                warn!(
                    target: "bridge::background",
                    %request_id,
                    origin = %routed.tab.origin,
                    %err,
                    "request failed"
                );
                DappResponse::error(request_id, err.into())
            }
        };

        // removal marks the entry delivered; a second delivery is impossible
        if self.queue.remove(&request_id).is_some() {
            self.endpoint.respond(response);
        }
    }

    async fn resolve(&mut self, routed: &RoutedRequest) -> Result<DappResponse, BackgroundError> {
        let origin = routed.tab.origin.as_str();
        let request_id = routed.request.request_id();

        match &routed.request {
            DappRequest::GetAccount { .. } => {
                let connected_addresses = self.store.ordered_connected_addresses(origin)?;
                let chain_id = self.origin_chain(origin)?;
                Ok(DappResponse::Account {
                    request_id,
                    connected_addresses,
                    chain_id,
                    provider_url: self.config.rpc_url(chain_id).map(Into::into),
                })
            }
            DappRequest::GetChainId { .. } => {
                Ok(DappResponse::ChainId { request_id, chain_id: self.origin_chain(origin)? })
            }
            DappRequest::RequestAccount { .. } => {
                let address = self.resolve_account(request_id)?;
                self.confirm(routed).await?;

                let chain_id = self.origin_chain(origin)?;
                self.store.save_active_account(origin, address.into(), chain_id, None)?;
                Ok(DappResponse::Account {
                    request_id,
                    connected_addresses: self.store.ordered_connected_addresses(origin)?,
                    chain_id,
                    provider_url: self.config.rpc_url(chain_id).map(Into::into),
                })
            }
            DappRequest::ChangeChain { chain_id, .. } => {
                let chain_id = dapp_bridge_core::parse_hex_chain_id(chain_id).ok_or_else(|| {
                    BackgroundError::InvalidPayload(format!("malformed chain id `{chain_id}`"))
                })?;
                if !self.config.supports_chain(chain_id) {
                    return Err(BackgroundError::UnrecognizedChain(chain_id));
                }
                self.confirm(routed).await?;
                self.store.update_last_chain_id(origin, chain_id)?;
                Ok(DappResponse::ChainChange {
                    request_id,
                    chain_id,
                    provider_url: self.config.rpc_url(chain_id).map(Into::into),
                })
            }
            DappRequest::SendTransaction { transaction, .. } => {
                self.send_transaction(routed, transaction.clone()).await
            }
            DappRequest::SignMessage { message_hex, address, .. } => {
                let signer = self.authorized_signer(request_id, origin, *address)?;
                let message = hex::decode(message_hex).map_err(|err| {
                    BackgroundError::InvalidPayload(format!("malformed message hex: {err}"))
                })?;
                self.confirm(routed).await?;
                let signature = signer.sign_message(&message).await?;
                Ok(DappResponse::SignMessage { request_id, signature })
            }
            DappRequest::SignTypedData { typed_data, address, .. } => {
                let signer = self.authorized_signer(request_id, origin, *address)?;
                let typed_data: TypedData =
                    serde_json::from_value(typed_data.clone()).map_err(|err| {
                        BackgroundError::InvalidPayload(format!("malformed typed data: {err}"))
                    })?;
                if let Some(domain_chain) = typed_data.domain.chain_id {
                    let expected = U256::from(self.origin_chain(origin)?);
                    if domain_chain != expected {
                        return Err(BackgroundError::UnrecognizedChain(
                            domain_chain.saturating_to(),
                        ));
                    }
                }
                self.confirm(routed).await?;
                let signature = signer.sign_typed_data(&typed_data).await?;
                Ok(DappResponse::SignTypedData { request_id, signature })
            }
            DappRequest::RevokePermissions { .. } => {
                self.confirm(routed).await?;
                self.store.remove_connection(origin, None)?;
                self.endpoint
                    .push(routed.tab.id, WalletPush::UpdateConnections { addresses: vec![] });
                Ok(DappResponse::RevokePermissions { request_id })
            }
            DappRequest::OpenPanel { .. } => {
                self.confirm(routed).await?;
                Ok(DappResponse::OpenPanel { request_id })
            }
        }
    }

    async fn send_transaction(
        &mut self,
        routed: &RoutedRequest,
        transaction: TransactionRequest,
    ) -> Result<DappResponse, BackgroundError> {
        let origin = routed.tab.origin.as_str();
        let request_id = routed.request.request_id();

        let from = match transaction.from {
            Some(from) => from,
            None => self.signer.as_ref().map(|s| s.address()).ok_or(BackgroundError::NoActiveAccount)?,
        };
        let signer = self.authorized_signer(request_id, origin, from)?;

        let chain_id = match transaction.chain_id() {
            Some(chain_id) => chain_id,
            None => self.origin_chain(origin)?,
        };
        if !self.config.supports_chain(chain_id) {
            return Err(BackgroundError::UnrecognizedChain(chain_id));
        }

        self.confirm(routed).await?;

        let provider = self
            .providers
            .provider_for(chain_id)
            .ok_or(BackgroundError::ChainUnavailable(chain_id))?;
        let tx = prepare_legacy(&transaction, from, chain_id, provider.as_ref()).await?;

        let raw = signer.sign_transaction(tx).await?;
        let transaction_hash = provider.send_raw_transaction(raw).await?;
        trace!(target: "bridge::background", %request_id, %transaction_hash, "transaction submitted");

        // fire and forget; the page already has its hash
        tokio::spawn(async move {
            match provider.wait_for_transaction(transaction_hash).await {
                Ok(()) => {
                    trace!(target: "bridge::background", %transaction_hash, "transaction confirmed")
                }
                Err(err) => {
                    warn!(target: "bridge::background", %transaction_hash, %err, "transaction tracking failed")
                }
            }
        });

        Ok(DappResponse::SendTransaction { request_id, transaction_hash })
    }

    /// The wallet's active account, or the fatal no-account error.
    fn resolve_account(&mut self, request_id: Uuid) -> Result<Address, BackgroundError> {
        let address = self
            .signer
            .as_ref()
            .map(|signer| signer.address())
            .ok_or(BackgroundError::NoActiveAccount)?;
        self.queue.insert(request_id, RequestPhase::AccountResolved(address));
        Ok(address)
    }

    /// Resolves the signer for `address` and checks that the origin is
    /// actually connected to it.
    fn authorized_signer(
        &mut self,
        request_id: Uuid,
        origin: &str,
        address: Address,
    ) -> Result<Arc<dyn WalletSigner>, BackgroundError> {
        let active = self.resolve_account(request_id)?;
        if active != address {
            return Err(BackgroundError::NotAuthorized);
        }
        let record = self.store.get(origin)?.ok_or(BackgroundError::NotAuthorized)?;
        if !record.contains(address) {
            return Err(BackgroundError::NotAuthorized);
        }
        // resolve_account already proved the signer exists
        self.signer.clone().ok_or(BackgroundError::NoActiveAccount)
    }

    /// Confirms or rejects the request: silent requests auto-confirm,
    /// interactive ones ask the approval policy.
    async fn confirm(&mut self, routed: &RoutedRequest) -> Result<(), BackgroundError> {
        let request_id = routed.request.request_id();
        if routed.request.is_silent() || self.policy.approve(&routed.tab, &routed.request).await {
            self.queue.insert(request_id, RequestPhase::Confirmed);
            Ok(())
        } else {
            self.queue.insert(request_id, RequestPhase::Rejected);
            Err(BackgroundError::Rejected)
        }
    }

    /// The chain an origin is pinned to, falling back to the default chain.
    fn origin_chain(&self, origin: &str) -> Result<ChainId, BackgroundError> {
        Ok(self
            .store
            .get(origin)?
            .map(|record| record.last_chain_id)
            .unwrap_or(self.config.default_chain_id))
    }
}

/// Builds a signable legacy transaction, asking the node for whatever the
/// page left out.
async fn prepare_legacy(
    transaction: &TransactionRequest,
    from: Address,
    chain_id: ChainId,
    provider: &dyn NodeProvider,
) -> Result<TxLegacy, BackgroundError> {
    let nonce = match transaction.nonce {
        Some(nonce) => nonce.to::<u64>(),
        None => {
            let value = provider.send("eth_getTransactionCount", json!([from, "pending"])).await?;
            parse_quantity(&value)?
        }
    };
    let gas_price = match transaction.gas_price {
        Some(price) => u128::try_from(price).map_err(|_| {
            BackgroundError::InvalidPayload("gas price does not fit in u128".into())
        })?,
        None => parse_quantity(&provider.send("eth_gasPrice", json!([])).await?)?,
    };
    let gas_limit = match transaction.gas_limit {
        Some(limit) => u64::try_from(limit)
            .map_err(|_| BackgroundError::InvalidPayload("gas limit does not fit in u64".into()))?,
        None => {
            let value = provider.send("eth_estimateGas", json!([transaction])).await?;
            parse_quantity(&value)?
        }
    };

    Ok(TxLegacy {
        chain_id: Some(chain_id),
        nonce,
        gas_price,
        gas_limit,
        to: transaction.to.map(TxKind::Call).unwrap_or(TxKind::Create),
        value: transaction.value.unwrap_or_default(),
        input: transaction.input.clone().unwrap_or_default(),
    })
}

/// Parses a hex quantity out of a node response.
fn parse_quantity<T: TryFrom<u128>>(value: &Value) -> Result<T, BackgroundError> {
    let raw = value
        .as_str()
        .and_then(|s| s.strip_prefix("0x"))
        .ok_or_else(|| unexpected_quantity(value))?;
    let parsed = u128::from_str_radix(raw, 16).map_err(|_| unexpected_quantity(value))?;
    T::try_from(parsed).map_err(|_| unexpected_quantity(value))
}

fn unexpected_quantity(value: &Value) -> BackgroundError {
    ProviderError::UnexpectedPayload(format!("expected a hex quantity, got {value}")).into()
}

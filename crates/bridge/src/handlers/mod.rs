//! Method handlers behind the injected facade.
//!
//! All three lanes share the [`ProviderContext`] capability set instead of
//! reaching into the facade; side effects on the chain/accounts mirrors only
//! happen through the maybe-emit setters so event suppression rules live in
//! one place.

use crate::{channel::DappChannel, provider::NodeProvider};
use alloy_primitives::{Address, ChainId};
use dapp_bridge_core::SenderTab;
use std::sync::Arc;

pub mod app;
pub mod direct;
pub mod extension;

/// What a handler may see and touch.
pub trait ProviderContext: Send + Sync {
    /// The tab this provider instance is bound to.
    fn tab(&self) -> SenderTab;

    /// The channel to the background context.
    fn channel(&self) -> &DappChannel;

    /// Current chain mirror, unset until the first background answer.
    fn chain_id(&self) -> Option<ChainId>;

    /// Updates the chain mirror. The first assignment emits `connect`;
    /// subsequent changes emit `chainChanged`; same-value writes emit
    /// nothing.
    fn set_chain_id_and_maybe_emit(&self, chain_id: ChainId);

    /// Current accounts mirror; empty until the first background answer.
    fn connected_addresses(&self) -> Vec<Address>;

    /// Updates the accounts mirror. The first assignment is silent;
    /// subsequent changes emit `accountsChanged`; same-value writes emit
    /// nothing.
    fn set_connected_addresses_and_maybe_emit(&self, addresses: Vec<Address>);

    /// The node provider for the current chain, if one is configured.
    fn node_provider(&self) -> Option<Arc<dyn NodeProvider>>;

    /// Repoints the node provider at `chain_id`'s endpoint.
    fn set_node_provider(&self, chain_id: ChainId);
}

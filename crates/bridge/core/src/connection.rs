//! Per-origin connection records.

use alloy_primitives::{Address, ChainId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The full persisted connection state, keyed by dApp origin.
pub type DappState = HashMap<String, DappConnection>;

/// An account connected to a dApp: the address plus optional display metadata.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectedAccount {
    pub address: Address,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl ConnectedAccount {
    pub fn new(address: Address) -> Self {
        Self { address, label: None }
    }
}

impl From<Address> for ConnectedAccount {
    fn from(address: Address) -> Self {
        Self::new(address)
    }
}

/// Caller-supplied display metadata merged into a record when a connection
/// is saved. Absent fields leave the record's current values alone.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionProps {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

/// Connection metadata for a single dApp origin.
///
/// A record only exists while at least one account is connected; an origin
/// with no connected accounts has no record at all. While the record exists,
/// `active_connected_address` is always a member of `connected_accounts`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DappConnection {
    /// The most recently used chain for this origin.
    pub last_chain_id: ChainId,
    /// Connected accounts in connection order, unique by address.
    pub connected_accounts: Vec<ConnectedAccount>,
    /// The account the dApp currently acts as.
    pub active_connected_address: Address,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

impl DappConnection {
    /// Creates a record for a first connection.
    pub fn new(account: ConnectedAccount, chain_id: ChainId) -> Self {
        Self {
            last_chain_id: chain_id,
            active_connected_address: account.address,
            connected_accounts: vec![account],
            icon_url: None,
            display_name: None,
        }
    }

    /// Returns true if `address` is one of the connected accounts.
    pub fn contains(&self, address: Address) -> bool {
        self.connected_accounts.iter().any(|acc| acc.address == address)
    }

    /// Appends `account` if its address is not yet connected and makes it the
    /// active one either way.
    pub fn connect(&mut self, account: ConnectedAccount) {
        let address = account.address;
        if !self.contains(address) {
            self.connected_accounts.push(account);
        }
        self.active_connected_address = address;
    }

    /// Merges caller-supplied display metadata; set fields win over whatever
    /// the record currently holds.
    pub fn apply_props(&mut self, props: ConnectionProps) {
        if props.icon_url.is_some() {
            self.icon_url = props.icon_url;
        }
        if props.display_name.is_some() {
            self.display_name = props.display_name;
        }
    }

    /// Removes `address` from the connected accounts.
    ///
    /// If the removed address was active, the first remaining account becomes
    /// active. Returns `false` once no accounts remain, meaning the record
    /// must be dropped by the caller.
    #[must_use]
    pub fn disconnect(&mut self, address: Address) -> bool {
        self.connected_accounts.retain(|acc| acc.address != address);
        match self.connected_accounts.first() {
            Some(first) => {
                if self.active_connected_address == address {
                    self.active_connected_address = first.address;
                }
                true
            }
            None => false,
        }
    }

    /// All connected addresses with the active address moved to the front,
    /// the rest keeping their relative order.
    pub fn ordered_addresses(&self) -> Vec<Address> {
        let mut ordered = Vec::with_capacity(self.connected_accounts.len());
        ordered.push(self.active_connected_address);
        ordered.extend(
            self.connected_accounts
                .iter()
                .map(|acc| acc.address)
                .filter(|addr| *addr != self.active_connected_address),
        );
        ordered
    }
}

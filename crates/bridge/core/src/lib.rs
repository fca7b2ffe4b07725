//! Domain model of the dApp bridge: per-origin connection records, the typed
//! protocol spoken between the page, content-script and background contexts,
//! and the total classification of provider method names into handling lanes.

pub mod chain;
pub mod connection;
pub mod method;
pub mod protocol;
pub mod transaction;

pub use chain::{hex_chain_id, parse_hex_chain_id, DEFAULT_CHAIN_ID};
pub use connection::{ConnectedAccount, ConnectionProps, DappConnection, DappState};
pub use method::{classify, AppMethod, DirectMethod, ExtensionMethod, MethodLane};
pub use protocol::{DappRequest, DappResponse, PageRequest, SenderTab, WalletPush};
pub use transaction::TransactionRequest;

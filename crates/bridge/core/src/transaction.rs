use alloy_primitives::{Address, Bytes, ChainId, U256, U64};
use serde::{Deserialize, Serialize};

/// Transaction parameters as submitted by a page via `eth_sendTransaction`.
///
/// Pages send `gas` and `data`; internally we use `gas_limit`/`input`, so both
/// spellings are accepted on the way in.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<U256>,
    #[serde(default, alias = "data", skip_serializing_if = "Option::is_none")]
    pub input: Option<Bytes>,
    #[serde(default, alias = "gas", skip_serializing_if = "Option::is_none")]
    pub gas_limit: Option<U256>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_price: Option<U256>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<U64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<U64>,
}

impl TransactionRequest {
    /// The chain the transaction is bound to, if the page specified one.
    pub fn chain_id(&self) -> Option<ChainId> {
        self.chain_id.map(|id| id.to::<u64>())
    }

    /// Returns true if the calldata is non-empty, i.e. not a plain value
    /// transfer.
    pub fn has_calldata(&self) -> bool {
        self.input.as_ref().is_some_and(|data| !data.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;

    #[test]
    fn accepts_page_spellings() {
        let tx: TransactionRequest = serde_json::from_value(serde_json::json!({
            "from": "0x00000000000000000000000000000000000000aa",
            "to": "0x00000000000000000000000000000000000000bb",
            "value": "0xde0b6b3a7640000",
            "gas": "0x5208",
            "data": "0x",
            "chainId": "0x1",
        }))
        .unwrap();
        assert_eq!(tx.from, Some(address!("0x00000000000000000000000000000000000000aa")));
        assert_eq!(tx.gas_limit, Some(U256::from(21000)));
        assert_eq!(tx.chain_id(), Some(1));
        assert!(!tx.has_calldata());
    }
}

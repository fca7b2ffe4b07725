//! Chain id helpers.
//!
//! Pages expect chain ids as `0x`-prefixed hex quantities (EIP-695); the rest
//! of the bridge works with plain [`ChainId`] values.

use alloy_primitives::ChainId;

/// Chain used for origins that have never switched chains.
pub const DEFAULT_CHAIN_ID: ChainId = 1;

/// Formats a chain id the way dApps expect it, e.g. `0x1`.
pub fn hex_chain_id(chain_id: ChainId) -> String {
    format!("0x{chain_id:x}")
}

/// Parses a `0x`-prefixed hex chain id.
///
/// Returns `None` for anything that is not a well-formed hex quantity.
pub fn parse_hex_chain_id(s: &str) -> Option<ChainId> {
    let digits = s.strip_prefix("0x")?;
    if digits.is_empty() {
        return None;
    }
    ChainId::from_str_radix(digits, 16).ok()
}

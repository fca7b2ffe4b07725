//! Classification of provider method names.
//!
//! Every method name a page can send resolves to exactly one [`MethodLane`].
//! Unknown names are a lane of their own rather than an error, so callers can
//! decide how to respond without special cases.

use strum::EnumString;

/// Read-only node methods the provider forwards to the active chain's RPC
/// endpoint without touching wallet state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumString, strum::Display)]
pub enum DirectMethod {
    #[strum(serialize = "eth_blockNumber")]
    BlockNumber,
    #[strum(serialize = "eth_call")]
    Call,
    #[strum(serialize = "eth_estimateGas")]
    EstimateGas,
    #[strum(serialize = "eth_gasPrice")]
    GasPrice,
    #[strum(serialize = "eth_getBalance")]
    GetBalance,
    #[strum(serialize = "eth_getBlockByNumber")]
    GetBlockByNumber,
    #[strum(serialize = "eth_getCode")]
    GetCode,
    #[strum(serialize = "eth_getStorageAt")]
    GetStorageAt,
    #[strum(serialize = "eth_getTransactionByHash")]
    GetTransactionByHash,
    #[strum(serialize = "eth_getTransactionCount")]
    GetTransactionCount,
    #[strum(serialize = "eth_getTransactionReceipt")]
    GetTransactionReceipt,
}

/// Methods that involve wallet state or a signature and are resolved by the
/// background context.
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumString, strum::Display)]
pub enum ExtensionMethod {
    #[strum(serialize = "eth_accounts")]
    Accounts,
    #[strum(serialize = "eth_requestAccounts")]
    RequestAccounts,
    #[strum(serialize = "eth_chainId")]
    ChainId,
    #[strum(serialize = "net_version")]
    NetVersion,
    #[strum(serialize = "eth_sendTransaction")]
    SendTransaction,
    #[strum(serialize = "personal_sign")]
    PersonalSign,
    #[strum(serialize = "eth_signTypedData_v4")]
    SignTypedDataV4,
    #[strum(serialize = "wallet_switchEthereumChain")]
    SwitchEthereumChain,
    #[strum(serialize = "wallet_getPermissions")]
    GetPermissions,
    #[strum(serialize = "wallet_requestPermissions")]
    RequestPermissions,
    #[strum(serialize = "wallet_revokePermissions")]
    RevokePermissions,
}

/// Methods handled by the wallet application itself rather than the chain or
/// the signing path.
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumString, strum::Display)]
pub enum AppMethod {
    #[strum(serialize = "bridge_openPanel")]
    OpenPanel,
}

/// Method names that were once part of the provider surface but are rejected
/// with a deprecation error.
pub const DEPRECATED_METHODS: &[&str] = &[
    "eth_sign",
    "eth_signTypedData",
    "eth_signTypedData_v1",
    "eth_signTypedData_v3",
    "eth_decrypt",
    "eth_getEncryptionPublicKey",
];

/// Method names the bridge recognizes but deliberately does not implement.
pub const UNSUPPORTED_METHODS: &[&str] = &[
    "eth_subscribe",
    "eth_unsubscribe",
    "eth_signTransaction",
    "wallet_addEthereumChain",
    "wallet_watchAsset",
    // EIP-5792 batched calls
    "wallet_getCapabilities",
    "wallet_sendCalls",
    "wallet_getCallsStatus",
];

/// The handling lane a method name resolves to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MethodLane {
    /// Forward to the node over plain RPC.
    Direct(DirectMethod),
    /// Resolve inside the wallet application.
    App(AppMethod),
    /// Resolve in the background context, possibly with user interaction.
    Extension(ExtensionMethod),
    /// Known but retired; rejected with a deprecation error.
    Deprecated,
    /// Known but deliberately not implemented.
    Unsupported,
    /// Not a method name the bridge has ever heard of.
    Unknown,
}

/// Resolves a method name to its lane. Total: every input maps to a lane.
pub fn classify(method: &str) -> MethodLane {
    if let Ok(direct) = method.parse::<DirectMethod>() {
        return MethodLane::Direct(direct);
    }
    if let Ok(app) = method.parse::<AppMethod>() {
        return MethodLane::App(app);
    }
    if let Ok(ext) = method.parse::<ExtensionMethod>() {
        return MethodLane::Extension(ext);
    }
    if DEPRECATED_METHODS.contains(&method) {
        return MethodLane::Deprecated;
    }
    if UNSUPPORTED_METHODS.contains(&method) {
        return MethodLane::Unsupported;
    }
    MethodLane::Unknown
}

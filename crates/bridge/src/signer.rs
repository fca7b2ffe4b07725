//! Signing collaborators.
//!
//! The background queue drives these traits; [`LocalWalletSigner`] is the
//! in-process implementation over a plain private key.

use crate::error::SignerError;
use alloy_consensus::{SignableTransaction, TxEnvelope, TxLegacy};
use alloy_dyn_abi::TypedData;
use alloy_eips::eip2718::Encodable2718;
use alloy_primitives::{Address, Bytes};
use alloy_signer::Signer;
use alloy_signer_local::PrivateKeySigner;
use async_trait::async_trait;
use dapp_bridge_core::{DappRequest, SenderTab};

/// The wallet's signing capability as the background queue sees it.
#[async_trait]
pub trait WalletSigner: Send + Sync + 'static {
    /// The wallet's active account.
    fn address(&self) -> Address;

    /// Signs a personal message (EIP-191), returning the 65-byte signature.
    async fn sign_message(&self, message: &[u8]) -> Result<Bytes, SignerError>;

    /// Signs an EIP-712 typed-data payload.
    async fn sign_typed_data(&self, typed_data: &TypedData) -> Result<Bytes, SignerError>;

    /// Signs a prepared transaction and returns the raw encoded bytes ready
    /// for `eth_sendRawTransaction`.
    async fn sign_transaction(&self, tx: TxLegacy) -> Result<Bytes, SignerError>;
}

/// Decides whether an interactive request goes through. Stands in for the
/// user sitting in front of the wallet.
#[async_trait]
pub trait ApprovalPolicy: Send + Sync + 'static {
    async fn approve(&self, tab: &SenderTab, request: &DappRequest) -> bool;
}

/// Policy that approves everything. Useful for trusted/automated setups.
#[derive(Clone, Copy, Debug, Default)]
pub struct AutoApprove;

#[async_trait]
impl ApprovalPolicy for AutoApprove {
    async fn approve(&self, _tab: &SenderTab, _request: &DappRequest) -> bool {
        true
    }
}

/// [`WalletSigner`] over an in-memory private key.
#[derive(Clone, Debug)]
pub struct LocalWalletSigner {
    signer: PrivateKeySigner,
}

impl LocalWalletSigner {
    pub fn new(signer: PrivateKeySigner) -> Self {
        Self { signer }
    }

    /// A signer with a freshly generated key.
    pub fn random() -> Self {
        Self::new(PrivateKeySigner::random())
    }
}

#[async_trait]
impl WalletSigner for LocalWalletSigner {
    fn address(&self) -> Address {
        self.signer.address()
    }

    async fn sign_message(&self, message: &[u8]) -> Result<Bytes, SignerError> {
        let signature = self.signer.sign_message(message).await?;
        Ok(signature.as_bytes().to_vec().into())
    }

    async fn sign_typed_data(&self, typed_data: &TypedData) -> Result<Bytes, SignerError> {
        let signature = self.signer.sign_dynamic_typed_data(typed_data).await?;
        Ok(signature.as_bytes().to_vec().into())
    }

    async fn sign_transaction(&self, tx: TxLegacy) -> Result<Bytes, SignerError> {
        let signature = self.signer.sign_hash(&tx.signature_hash()).await?;
        let envelope = TxEnvelope::Legacy(tx.into_signed(signature));
        Ok(envelope.encoded_2718().into())
    }
}

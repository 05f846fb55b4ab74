//! Chain access for verification polling.
//!
//! The poller never talks to an RPC provider directly. It goes through the
//! [`ChainReader`] trait, which covers the three calls a contract-mode poll
//! cycle needs:
//!
//! 1. current head block number
//! 2. `VerificationCompleted` logs in a block window
//! 3. the contract's `verifications(address)` record
//!
//! [`RpcChainReader`] implements it over JSON-RPC; tests supply scripted
//! readers.

mod network;
mod rpc;

pub use alloy::primitives::{Address, TxHash, B256};
pub use network::ChainKind;
pub use rpc::RpcChainReader;

use crate::error::{Error, Result};
use async_trait::async_trait;
use std::str::FromStr;

/// A `VerificationCompleted` log emitted by the verification contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionEvent {
    /// Contract that emitted the log.
    pub contract_address: Address,
    /// Wallet address the verification was completed for.
    pub user_address: Address,
    /// Self Protocol user identifier.
    pub user_identifier: B256,
    /// Event timestamp (unix seconds) as recorded by the contract.
    pub timestamp: u64,
    /// Disclosed date of birth.
    pub date_of_birth: String,
    /// Transaction that emitted the log.
    pub transaction_hash: Option<TxHash>,
    /// Block the log was included in.
    pub block_number: Option<u64>,
    /// Position of the log in its block.
    pub log_index: Option<u64>,
}

/// Verification data stored by the contract for one address.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VerificationRecord {
    /// Whether the address has completed verification.
    pub verified: bool,
    /// When the verification was recorded (unix seconds).
    pub timestamp: u64,
    /// Disclosed date of birth.
    pub date_of_birth: String,
    /// Disclosed name (empty if not disclosed).
    pub name: String,
    /// Disclosed nationality (empty if not disclosed).
    pub nationality: String,
    /// Self Protocol user identifier.
    pub user_identifier: B256,
}

/// Read-only access to a chain hosting the verification contract.
#[async_trait]
pub trait ChainReader: Send + Sync + 'static {
    /// Current head block number.
    async fn block_number(&self) -> Result<u64>;

    /// `VerificationCompleted` logs emitted by `contract` in
    /// `[from_block, to_block]`, in provider order.
    ///
    /// The query is made by event signature only. Logs emitted by other
    /// contracts and logs that fail to decode are dropped.
    async fn completion_events(
        &self,
        contract: Address,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<CompletionEvent>>;

    /// Read `verifications(user)` from `contract`.
    async fn verification_record(
        &self,
        contract: Address,
        user: Address,
    ) -> Result<VerificationRecord>;
}

/// Parse a hex address, ignoring letter case.
///
/// # Errors
///
/// Returns [`Error::InvalidAddress`] if the input is empty or not a 20-byte
/// hex string.
pub fn parse_address(input: &str) -> Result<Address> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidAddress {
            address: input.to_string(),
            reason: "address is empty".to_string(),
        });
    }

    Address::from_str(trimmed).map_err(|e| Error::InvalidAddress {
        address: input.to_string(),
        reason: e.to_string(),
    })
}

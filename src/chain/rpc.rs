//! JSON-RPC chain reader.
//!
//! Event watching through persistent filters (`eth_newFilter`) is not
//! reliably supported by public Celo endpoints, so everything here is a plain
//! request/response call: `eth_blockNumber`, `eth_getLogs` and `eth_call`.

use crate::chain::{Address, ChainReader, CompletionEvent, VerificationRecord};
use crate::error::{Error, Result};
use alloy::providers::{Provider, ProviderBuilder, RootProvider};
use alloy::rpc::types::{Filter, Log};
use alloy::sol;
use alloy::sol_types::SolEvent;
use alloy::transports::http::{Client, Http};
use async_trait::async_trait;
use reqwest::Url;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

sol! {
    #[sol(rpc)]
    contract SelfVerification {
        event VerificationCompleted(
            address indexed userAddress,
            bytes32 indexed userIdentifier,
            uint256 timestamp,
            string dateOfBirth
        );

        function verifications(address user) external view returns (
            bool verified,
            uint256 timestamp,
            string dateOfBirth,
            string name,
            string nationality,
            bytes32 userIdentifier
        );
    }
}

type HttpProvider = RootProvider<Http<Client>>;

/// [`ChainReader`] backed by an HTTP JSON-RPC endpoint.
///
/// The provider is built once and shared by clones.
#[derive(Clone)]
pub struct RpcChainReader {
    url: Url,
    provider: Arc<HttpProvider>,
}

impl fmt::Debug for RpcChainReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RpcChainReader")
            .field("url", &self.url.as_str())
            .finish_non_exhaustive()
    }
}

impl RpcChainReader {
    /// Create a reader for the given RPC endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the URL cannot be parsed.
    pub fn new(rpc_url: &str) -> Result<Self> {
        let url: Url = rpc_url
            .parse()
            .map_err(|e| Error::Config(format!("invalid RPC URL {rpc_url:?}: {e}")))?;
        let provider = ProviderBuilder::new().on_http(url.clone());
        Ok(Self {
            url,
            provider: Arc::new(provider),
        })
    }

    /// The RPC endpoint in use.
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait]
impl ChainReader for RpcChainReader {
    async fn block_number(&self) -> Result<u64> {
        self.provider
            .get_block_number()
            .await
            .map_err(|e| Error::Rpc(format!("failed to get block number: {e}")))
    }

    async fn completion_events(
        &self,
        contract: Address,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<CompletionEvent>> {
        // Some providers mishandle address + topic filters together; the
        // emitter is checked after decoding instead.
        let filter = Filter::new()
            .event_signature(SelfVerification::VerificationCompleted::SIGNATURE_HASH)
            .from_block(from_block)
            .to_block(to_block);

        let logs = self
            .provider
            .get_logs(&filter)
            .await
            .map_err(|e| Error::Rpc(format!("failed to query logs: {e}")))?;

        debug!(
            from_block,
            to_block,
            log_count = logs.len(),
            "Fetched VerificationCompleted logs"
        );

        Ok(logs
            .iter()
            .filter_map(|log| decode_completion(contract, log))
            .collect())
    }

    async fn verification_record(
        &self,
        contract: Address,
        user: Address,
    ) -> Result<VerificationRecord> {
        let instance = SelfVerification::new(contract, self.provider.as_ref());

        let stored = instance
            .verifications(user)
            .call()
            .await
            .map_err(|e| Error::Rpc(format!("verifications() call failed: {e}")))?;

        Ok(VerificationRecord {
            verified: stored.verified,
            timestamp: stored.timestamp.try_into().unwrap_or(u64::MAX),
            date_of_birth: stored.dateOfBirth,
            name: stored.name,
            nationality: stored.nationality,
            user_identifier: stored.userIdentifier,
        })
    }
}

fn decode_completion(contract: Address, log: &Log) -> Option<CompletionEvent> {
    if log.removed {
        debug!(tx = ?log.transaction_hash, "Skipping removed log");
        return None;
    }

    if log.address() != contract {
        debug!(emitter = %log.address(), "Skipping log from another contract");
        return None;
    }

    match log.log_decode::<SelfVerification::VerificationCompleted>() {
        Ok(decoded) => {
            let event = &decoded.inner.data;
            Some(CompletionEvent {
                contract_address: log.address(),
                user_address: event.userAddress,
                user_identifier: event.userIdentifier,
                timestamp: event.timestamp.try_into().unwrap_or(u64::MAX),
                date_of_birth: event.dateOfBirth.clone(),
                transaction_hash: log.transaction_hash,
                block_number: log.block_number,
                log_index: log.log_index,
            })
        }
        Err(e) => {
            warn!(tx = ?log.transaction_hash, "Failed to decode VerificationCompleted log: {e}");
            None
        }
    }
}

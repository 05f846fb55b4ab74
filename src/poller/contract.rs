//! On-chain verification probe.

use crate::chain::{ChainReader, CompletionEvent};
use crate::error::Result;
use crate::poller::{PollOptions, VerificationProbe, VerificationRequest, VerifiedIdentity};
use async_trait::async_trait;
use tracing::{debug, info, warn};

/// Looks for a recent `VerificationCompleted` event for the user in the last
/// few blocks, then reads the stored verification from the contract.
pub struct ContractProbe<R> {
    reader: R,
}

impl<R: ChainReader> ContractProbe<R> {
    /// Create a probe over a chain reader.
    #[must_use]
    pub fn new(reader: R) -> Self {
        Self { reader }
    }

    /// The underlying chain reader.
    #[must_use]
    pub fn reader(&self) -> &R {
        &self.reader
    }
}

#[async_trait]
impl<R: ChainReader> VerificationProbe for ContractProbe<R> {
    async fn probe(
        &self,
        request: &VerificationRequest,
        options: &PollOptions,
    ) -> Result<Option<VerifiedIdentity>> {
        let head = self.reader.block_number().await?;
        let from_block = head.saturating_sub(options.lookback_blocks);
        debug!(from_block, to_block = head, "Checking blocks for completion events");

        let events = self
            .reader
            .completion_events(request.contract_address, from_block, head)
            .await?;

        let Some(event) = select_completion(&events, request, options.recency_skew_secs) else {
            return Ok(None);
        };

        info!(
            tx = ?event.transaction_hash,
            block = ?event.block_number,
            timestamp = event.timestamp,
            "Recent verification event found"
        );

        let record = self
            .reader
            .verification_record(request.contract_address, request.user_address)
            .await?;

        if !record.verified {
            warn!(
                user = %request.user_address,
                "Contract record not flagged verified despite completion event"
            );
        }

        Ok(Some(VerifiedIdentity {
            transaction_hash: event.transaction_hash.map(|hash| hash.to_string()),
            date_of_birth: record.date_of_birth,
            name: record.name,
            nationality: record.nationality,
            timestamp: record.timestamp,
            user_identifier: Some(record.user_identifier.to_string()),
        }))
    }
}

/// Whether an event at `event_timestamp` can answer a request started at
/// `start_timestamp`.
///
/// Events up to `skew_secs` before the start are accepted. There is no upper
/// bound.
#[must_use]
pub fn is_recent(event_timestamp: u64, start_timestamp: u64, skew_secs: u64) -> bool {
    event_timestamp >= start_timestamp.saturating_sub(skew_secs)
}

/// First event, in the given order, that belongs to the request's user and
/// is recent.
///
/// Providers return logs ascending by block and log index; the earliest
/// qualifying event wins.
#[must_use]
pub fn select_completion<'a>(
    events: &'a [CompletionEvent],
    request: &VerificationRequest,
    skew_secs: u64,
) -> Option<&'a CompletionEvent> {
    events.iter().find(|event| {
        if event.user_address != request.user_address {
            return false;
        }
        let recent = is_recent(event.timestamp, request.start_timestamp, skew_secs);
        if !recent {
            debug!(
                tx = ?event.transaction_hash,
                timestamp = event.timestamp,
                start_timestamp = request.start_timestamp,
                "Ignoring stale completion event for user"
            );
        }
        recent
    })
}

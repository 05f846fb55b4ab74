//! Scripted chain reader.

use async_trait::async_trait;
use parking_lot::Mutex;
use self_watch::chain::{Address, ChainReader, CompletionEvent, VerificationRecord, B256};
use self_watch::{Error, Result};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

/// What the chain does during one poll cycle.
#[derive(Debug, Clone)]
pub enum Cycle {
    /// No matching logs.
    Empty,
    /// The log query returns these events.
    Logs(Vec<CompletionEvent>),
    /// The head block query fails.
    HeadError,
    /// The log query fails.
    LogsError,
    /// The log query returns these events but the record read fails.
    RecordError(Vec<CompletionEvent>),
}

/// Calls observed by the scripted chain.
#[derive(Debug, Default, Clone)]
pub struct Calls {
    /// `block_number` calls.
    pub block_number: u32,
    /// `completion_events` windows, in order.
    pub windows: Vec<(u64, u64)>,
    /// `verification_record` calls.
    pub records: Vec<Address>,
}

#[derive(Debug)]
struct Script {
    head: u64,
    cycles: VecDeque<Cycle>,
    current: Cycle,
    record: VerificationRecord,
    log_latency: Duration,
    calls: Calls,
}

/// A [`ChainReader`] that replays one [`Cycle`] per `block_number` call and
/// then reports nothing. The head advances by one block per cycle.
#[derive(Debug, Clone)]
pub struct ScriptedChain {
    script: Arc<Mutex<Script>>,
}

impl ScriptedChain {
    /// Create a chain at `head` replaying `cycles`.
    pub fn new(head: u64, cycles: Vec<Cycle>) -> Self {
        Self {
            script: Arc::new(Mutex::new(Script {
                head,
                cycles: cycles.into(),
                current: Cycle::Empty,
                record: VerificationRecord::default(),
                log_latency: Duration::ZERO,
                calls: Calls::default(),
            })),
        }
    }

    /// Set the record returned by `verifications(address)`.
    pub fn with_record(self, record: VerificationRecord) -> Self {
        self.script.lock().record = record;
        self
    }

    /// Delay every log query.
    pub fn with_log_latency(self, latency: Duration) -> Self {
        self.script.lock().log_latency = latency;
        self
    }

    /// Calls observed so far.
    pub fn calls(&self) -> Calls {
        self.script.lock().calls.clone()
    }
}

#[async_trait]
impl ChainReader for ScriptedChain {
    async fn block_number(&self) -> Result<u64> {
        let mut script = self.script.lock();
        script.calls.block_number += 1;
        script.current = script.cycles.pop_front().unwrap_or(Cycle::Empty);
        script.head += 1;

        match script.current {
            Cycle::HeadError => Err(Error::Rpc("eth_blockNumber timed out".to_string())),
            _ => Ok(script.head),
        }
    }

    async fn completion_events(
        &self,
        _contract: Address,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<CompletionEvent>> {
        let latency = {
            let mut script = self.script.lock();
            script.calls.windows.push((from_block, to_block));
            script.log_latency
        };
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        let script = self.script.lock();
        match &script.current {
            Cycle::Logs(events) | Cycle::RecordError(events) => Ok(events.clone()),
            Cycle::LogsError => Err(Error::Rpc("eth_getLogs rate limited".to_string())),
            Cycle::Empty | Cycle::HeadError => Ok(Vec::new()),
        }
    }

    async fn verification_record(
        &self,
        _contract: Address,
        user: Address,
    ) -> Result<VerificationRecord> {
        let mut script = self.script.lock();
        script.calls.records.push(user);
        match script.current {
            Cycle::RecordError(_) => Err(Error::Rpc("eth_call reverted".to_string())),
            _ => Ok(script.record.clone()),
        }
    }
}

/// A completion event for `user` at `timestamp`, from transaction `0xtt..tt`.
pub fn completion(user: Address, timestamp: u64, tx: u8) -> CompletionEvent {
    CompletionEvent {
        contract_address: Address::repeat_byte(0xcc),
        user_address: user,
        user_identifier: B256::repeat_byte(0x01),
        timestamp,
        date_of_birth: "1990-01-01".to_string(),
        transaction_hash: Some(B256::repeat_byte(tx)),
        block_number: Some(100),
        log_index: Some(0),
    }
}

//! Contract-mode polling against a scripted chain.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use super::{completion, Cycle, ScriptedChain};
use self_watch::chain::{parse_address, Address, VerificationRecord, B256};
use self_watch::poller::{
    ContractProbe, PollOptions, PollOutcome, VerificationRequest, VerificationStatusPoller,
};
use self_watch::{PollEvent, PollEventsChannel};
use std::time::Duration;

const USER: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";
const CONTRACT: &str = "0x5FbDB2315678afecb367f032d93F642f64180aa3";
const START: u64 = 1_700_000_000;

fn user() -> Address {
    parse_address(USER).unwrap()
}

fn request() -> VerificationRequest {
    VerificationRequest::with_start_timestamp(user(), parse_address(CONTRACT).unwrap(), START)
}

fn options(max_attempts: u32) -> PollOptions {
    PollOptions {
        interval_ms: 10,
        max_attempts,
        ..Default::default()
    }
}

fn verified_record() -> VerificationRecord {
    VerificationRecord {
        verified: true,
        timestamp: START + 3,
        date_of_birth: "1990-01-01".to_string(),
        name: String::new(),
        nationality: String::new(),
        user_identifier: B256::repeat_byte(0x01),
    }
}

fn poller(chain: &ScriptedChain) -> VerificationStatusPoller<ContractProbe<ScriptedChain>> {
    VerificationStatusPoller::new(ContractProbe::new(chain.clone()))
}

fn drain(events: &mut PollEventsChannel) -> Vec<PollEvent> {
    let mut seen = Vec::new();
    while let Ok(event) = events.try_recv() {
        seen.push(event);
    }
    seen
}

/// Always-empty logs time out after exactly `max_attempts` cycles.
#[tokio::test(start_paused = true)]
async fn test_timeout_after_three_empty_cycles() {
    let chain = ScriptedChain::new(1_000, Vec::new());
    let poller = poller(&chain);
    let mut events = poller.subscribe();

    let handle = poller.start_request(request(), options(3)).unwrap();
    let outcome = handle.outcome().await.unwrap();
    assert_eq!(outcome, PollOutcome::Timeout { attempts: 3 });

    // No further ticks after the timeout.
    tokio::time::sleep(Duration::from_millis(200)).await;
    let calls = chain.calls();
    assert_eq!(calls.block_number, 3);
    assert!(calls.records.is_empty());

    let attempts: Vec<u32> = drain(&mut events)
        .into_iter()
        .filter_map(|event| match event {
            PollEvent::CycleCompleted { attempts } => Some(attempts),
            _ => None,
        })
        .collect();
    assert_eq!(attempts, vec![1, 2, 3]);
}

/// A matching log on tick 2 resolves with the stored record and stops.
#[tokio::test(start_paused = true)]
async fn test_match_on_second_tick() {
    let chain = ScriptedChain::new(
        1_000,
        vec![Cycle::Empty, Cycle::Logs(vec![completion(user(), START + 2, 0xab)])],
    )
    .with_record(verified_record());
    let poller = poller(&chain);

    let handle = poller.start_request(request(), options(60)).unwrap();
    let outcome = handle.outcome().await.unwrap();

    let identity = outcome.identity().expect("should match");
    assert_eq!(identity.date_of_birth, "1990-01-01");
    assert_eq!(identity.name, "");
    assert_eq!(identity.nationality, "");
    assert_eq!(identity.timestamp, START + 3);
    assert_eq!(
        identity.transaction_hash.as_deref(),
        Some(B256::repeat_byte(0xab).to_string().as_str())
    );
    assert_eq!(
        identity.user_identifier.as_deref(),
        Some(B256::repeat_byte(0x01).to_string().as_str())
    );

    tokio::time::sleep(Duration::from_millis(200)).await;
    let calls = chain.calls();
    assert_eq!(calls.block_number, 2, "no tick 3 after a match");
    assert_eq!(calls.records, vec![user()]);
}

/// A failed cycle is retried silently and does not end the poll.
#[tokio::test(start_paused = true)]
async fn test_rpc_error_then_match() {
    let chain = ScriptedChain::new(
        1_000,
        vec![
            Cycle::HeadError,
            Cycle::Logs(vec![completion(user(), START, 0x01)]),
        ],
    )
    .with_record(verified_record());
    let poller = poller(&chain);
    let mut events = poller.subscribe();

    let handle = poller.start_request(request(), options(3)).unwrap();
    let outcome = handle.outcome().await.unwrap();
    assert!(matches!(outcome, PollOutcome::Matched(_)));

    let seen = drain(&mut events);
    assert!(matches!(seen[0], PollEvent::Started { .. }));
    assert!(matches!(seen[1], PollEvent::CycleFailed { .. }));
    assert!(matches!(seen[2], PollEvent::Matched { .. }));
    assert_eq!(seen.len(), 3);
}

/// Failed cycles (log query or record read) do not count toward the budget.
#[tokio::test(start_paused = true)]
async fn test_failures_do_not_consume_attempts() {
    let chain = ScriptedChain::new(
        1_000,
        vec![
            Cycle::LogsError,
            Cycle::RecordError(vec![completion(user(), START, 0x01)]),
            Cycle::Empty,
            Cycle::HeadError,
            Cycle::Empty,
        ],
    );
    let poller = poller(&chain);

    let handle = poller.start_request(request(), options(2)).unwrap();
    assert_eq!(handle.outcome().await.unwrap(), PollOutcome::Timeout { attempts: 2 });

    let calls = chain.calls();
    assert_eq!(calls.block_number, 5);
    assert_eq!(calls.records.len(), 1);
}

/// Cancelling before the first tick means the chain is never touched.
#[tokio::test(start_paused = true)]
async fn test_cancel_before_first_tick() {
    let chain = ScriptedChain::new(
        1_000,
        vec![Cycle::Logs(vec![completion(user(), START, 0x01)])],
    );
    let poller = poller(&chain);
    let mut events = poller.subscribe();

    let handle = poller.start_request(request(), options(3)).unwrap();
    handle.cancel();
    assert_eq!(handle.outcome().await.unwrap(), PollOutcome::Cancelled);

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(chain.calls().block_number, 0);
    assert!(!drain(&mut events)
        .iter()
        .any(|e| matches!(e, PollEvent::Matched { .. } | PollEvent::TimedOut { .. })));
}

/// Cancelling while a log query is in flight discards its result.
#[tokio::test(start_paused = true)]
async fn test_cancel_discards_in_flight_cycle() {
    let chain = ScriptedChain::new(
        1_000,
        vec![Cycle::Logs(vec![completion(user(), START, 0x01)])],
    )
    .with_record(verified_record())
    .with_log_latency(Duration::from_millis(500));
    let poller = poller(&chain);

    let handle = poller.start_request(request(), options(3)).unwrap();
    let canceller = handle.canceller();

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(chain.calls().windows.len(), 1, "log query should be in flight");
    assert!(handle.is_active());
    canceller.cancel();

    assert_eq!(handle.outcome().await.unwrap(), PollOutcome::Cancelled);
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert!(chain.calls().records.is_empty());
}

/// The log window is `[head - lookback, head]`, clamped at genesis.
#[tokio::test(start_paused = true)]
async fn test_block_window() {
    let chain = ScriptedChain::new(999, Vec::new());
    let handle = poller(&chain).start_request(request(), options(2)).unwrap();
    handle.outcome().await.unwrap();
    assert_eq!(chain.calls().windows, vec![(991, 1_000), (992, 1_001)]);

    let young = ScriptedChain::new(2, Vec::new());
    let handle = poller(&young).start_request(request(), options(1)).unwrap();
    handle.outcome().await.unwrap();
    assert_eq!(young.calls().windows, vec![(0, 3)]);
}

/// Address matching ignores letter case.
#[tokio::test(start_paused = true)]
async fn test_case_insensitive_match() {
    let shouting = parse_address("0xF39FD6E51AAD88F6F4CE6AB8827279CFFFB92266").unwrap();
    let chain = ScriptedChain::new(
        1_000,
        vec![Cycle::Logs(vec![completion(shouting, START, 0x01)])],
    )
    .with_record(verified_record());

    let handle = poller(&chain).start_request(request(), options(3)).unwrap();
    assert!(matches!(handle.outcome().await.unwrap(), PollOutcome::Matched(_)));
}

/// One second past the skew window is stale; the window edge is accepted.
#[tokio::test(start_paused = true)]
async fn test_recency_boundary() {
    let skew = PollOptions::default().recency_skew_secs;

    let stale = ScriptedChain::new(
        1_000,
        vec![Cycle::Logs(vec![completion(user(), START - skew - 1, 0x01)])],
    );
    let handle = poller(&stale).start_request(request(), options(1)).unwrap();
    assert_eq!(handle.outcome().await.unwrap(), PollOutcome::Timeout { attempts: 1 });
    assert!(stale.calls().records.is_empty());

    let edge = ScriptedChain::new(
        1_000,
        vec![Cycle::Logs(vec![completion(user(), START - skew, 0x02)])],
    )
    .with_record(verified_record());
    let handle = poller(&edge).start_request(request(), options(1)).unwrap();
    assert!(matches!(handle.outcome().await.unwrap(), PollOutcome::Matched(_)));
}

/// Other users' events never resolve the poll.
#[tokio::test(start_paused = true)]
async fn test_ignores_other_users() {
    let stranger = Address::repeat_byte(0x77);
    let chain = ScriptedChain::new(
        1_000,
        vec![
            Cycle::Logs(vec![completion(stranger, START, 0x01)]),
            Cycle::Logs(vec![
                completion(stranger, START, 0x02),
                completion(user(), START + 1, 0x03),
            ]),
        ],
    )
    .with_record(verified_record());

    let handle = poller(&chain).start_request(request(), options(5)).unwrap();
    let outcome = handle.outcome().await.unwrap();
    assert_eq!(
        outcome.identity().and_then(|i| i.transaction_hash.clone()),
        Some(B256::repeat_byte(0x03).to_string())
    );
}

/// `start` validates its inputs before scheduling anything.
#[tokio::test]
async fn test_start_validates_addresses() {
    let chain = ScriptedChain::new(1_000, Vec::new());
    let poller = poller(&chain);

    assert!(poller.start("", CONTRACT, PollOptions::default()).is_err());
    assert!(poller.start(USER, "", PollOptions::default()).is_err());
    assert!(poller
        .start(
            USER,
            CONTRACT,
            PollOptions {
                lookback_blocks: 50,
                ..Default::default()
            }
        )
        .is_err());

    let handle = poller.start(USER, CONTRACT, PollOptions::default()).unwrap();
    assert_eq!(handle.state().attempt_count, 0);
    assert_eq!(handle.state().max_attempts, 60);
    handle.cancel();
    assert_eq!(handle.outcome().await.unwrap(), PollOutcome::Cancelled);
}

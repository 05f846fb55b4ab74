//! self-watch CLI entry point.

mod cli;

use clap::Parser;
use cli::Cli;
use self_watch::chain::{parse_address, Address, RpcChainReader};
use self_watch::config::{VerificationMode, WatchConfig};
use self_watch::poller::{
    BackendProbe, ContractProbe, PollOutcome, VerificationProbe, VerificationRequest,
    VerificationStatusPoller,
};
use self_watch::PollEvent;
use std::process::ExitCode;
use tracing::{debug, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Exit status when the poll times out without a match.
const EXIT_TIMEOUT: u8 = 2;

/// Exit status when the poll was cancelled (Ctrl-C).
const EXIT_CANCELLED: u8 = 130;

#[tokio::main]
async fn main() -> color_eyre::Result<ExitCode> {
    // Initialize error handling
    color_eyre::install()?;

    // Parse CLI arguments
    let cli = Cli::parse();
    let json = cli.json;
    let user = parse_address(&cli.user)?;
    let config = cli.into_config()?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    info!("self-watch v{}", env!("CARGO_PKG_VERSION"));

    // Configuration problems surface here, before anything is polled.
    let outcome = match config.mode {
        VerificationMode::Contract => {
            let contract = config.require_contract()?;
            let reader = RpcChainReader::new(config.rpc_url())?;
            info!(
                "Watching {} on {} (chain id {})",
                contract,
                config.chain,
                config.chain.chain_id()
            );
            let poller = VerificationStatusPoller::new(ContractProbe::new(reader));
            watch(&poller, VerificationRequest::new(user, contract), &config).await?
        }
        VerificationMode::Backend => {
            let probe = BackendProbe::new(config.require_site_url()?, config.request_timeout())?;
            info!("Checking {}", probe.check_url());
            let contract = config
                .contract_address
                .as_deref()
                .map(parse_address)
                .transpose()?
                .unwrap_or(Address::ZERO);
            let poller = VerificationStatusPoller::new(probe);
            watch(&poller, VerificationRequest::new(user, contract), &config).await?
        }
    };

    report(&outcome, &config, json)?;
    Ok(ExitCode::from(exit_status(&outcome)))
}

/// Process exit status for an outcome, so scripts can offer a retry on
/// timeout.
fn exit_status(outcome: &PollOutcome) -> u8 {
    match outcome {
        PollOutcome::Matched(_) => 0,
        PollOutcome::Timeout { .. } => EXIT_TIMEOUT,
        PollOutcome::Cancelled => EXIT_CANCELLED,
    }
}

/// Run one poll to completion, cancelling on Ctrl-C.
async fn watch<P: VerificationProbe>(
    poller: &VerificationStatusPoller<P>,
    request: VerificationRequest,
    config: &WatchConfig,
) -> color_eyre::Result<PollOutcome> {
    let mut events = poller.subscribe();
    let handle = poller.start_request(request, config.poll.clone())?;
    let canceller = handle.canceller();

    info!(
        "Waiting up to {}s for verification of {}",
        config.poll.budget().as_secs(),
        request.user_address
    );

    let outcome = handle.outcome();
    tokio::pin!(outcome);

    loop {
        tokio::select! {
            outcome = &mut outcome => return Ok(outcome?),
            _ = tokio::signal::ctrl_c() => {
                info!("Ctrl-C received, cancelling");
                canceller.cancel();
            }
            event = events.recv() => match event {
                Ok(PollEvent::CycleCompleted { attempts }) => {
                    debug!("No verification yet ({attempts}/{})", config.poll.max_attempts);
                }
                Ok(PollEvent::CycleFailed { message }) => {
                    debug!("Cycle failed, will retry: {message}");
                }
                _ => {}
            },
        }
    }
}

fn report(outcome: &PollOutcome, config: &WatchConfig, json: bool) -> color_eyre::Result<()> {
    if json {
        let body = serde_json::json!({
            "status": outcome.status(),
            "data": outcome.identity(),
        });
        println!("{}", serde_json::to_string_pretty(&body)?);
        return Ok(());
    }

    match outcome {
        PollOutcome::Matched(identity) => {
            println!("Verification complete");
            if !identity.date_of_birth.is_empty() {
                println!("  Date of birth: {}", identity.date_of_birth);
            }
            if !identity.name.is_empty() {
                println!("  Name:          {}", identity.name);
            }
            if !identity.nationality.is_empty() {
                println!("  Nationality:   {}", identity.nationality);
            }
            if let Some(verified_at) = i64::try_from(identity.timestamp)
                .ok()
                .filter(|ts| *ts > 0)
                .and_then(|ts| chrono::DateTime::from_timestamp(ts, 0))
            {
                println!("  Verified at:   {}", verified_at.to_rfc3339());
            }
            if let Some(ref tx) = identity.transaction_hash {
                println!("  Transaction:   {}", config.chain.explorer_tx_url(tx));
            }
        }
        PollOutcome::Timeout { attempts } => {
            println!(
                "Verification timeout after {attempts} checks. Please try again or refresh."
            );
        }
        PollOutcome::Cancelled => {
            println!("Verification cancelled");
        }
    }
    Ok(())
}

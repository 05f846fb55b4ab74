//! The poll loop and its caller-facing handle.

use crate::chain::parse_address;
use crate::error::{Error, Result};
use crate::event::{create_event_channel, PollEvent, PollEventsChannel, PollEventsSender};
use crate::poller::options::{PollOptions, PollState};
use crate::poller::{PollOutcome, VerificationProbe, VerificationRequest, VerifiedIdentity};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// Starts verification polls against a [`VerificationProbe`].
///
/// Each call to [`start`](Self::start) spawns an independent run with its
/// own [`PollState`]. All runs share one event channel.
pub struct VerificationStatusPoller<P> {
    probe: Arc<P>,
    events_tx: PollEventsSender,
}

impl<P: VerificationProbe> VerificationStatusPoller<P> {
    /// Create a poller around a probe.
    #[must_use]
    pub fn new(probe: P) -> Self {
        let (events_tx, _) = create_event_channel();
        Self {
            probe: Arc::new(probe),
            events_tx,
        }
    }

    /// Subscribe to progress events of every run started afterwards.
    #[must_use]
    pub fn subscribe(&self) -> PollEventsChannel {
        self.events_tx.subscribe()
    }

    /// The underlying probe.
    #[must_use]
    pub fn probe(&self) -> &P {
        &self.probe
    }

    /// Start polling for `user_address` against `contract_address`.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns an error if either address is empty or malformed, or if the
    /// options are invalid. Nothing is scheduled in that case.
    pub fn start(
        &self,
        user_address: &str,
        contract_address: &str,
        options: PollOptions,
    ) -> Result<PollHandle> {
        let request =
            VerificationRequest::new(parse_address(user_address)?, parse_address(contract_address)?);
        self.start_request(request, options)
    }

    /// Start polling for an already-built request.
    ///
    /// # Errors
    ///
    /// Returns an error if the options are invalid.
    pub fn start_request(
        &self,
        request: VerificationRequest,
        options: PollOptions,
    ) -> Result<PollHandle> {
        options.validate()?;

        let (cancel_tx, cancel_rx) = watch::channel(false);
        let state = Arc::new(Mutex::new(PollState::new(&options)));

        let task = PollTask {
            probe: Arc::clone(&self.probe),
            request,
            options,
            state: Arc::clone(&state),
            events_tx: self.events_tx.clone(),
            cancel_rx,
        };

        let task = tokio::spawn(task.run());

        Ok(PollHandle {
            canceller: Canceller {
                tx: Arc::new(cancel_tx),
            },
            task,
            state,
        })
    }
}

/// Caller side of a running poll.
///
/// Dropping the handle (and every [`Canceller`] cloned from it) cancels the
/// poll.
pub struct PollHandle {
    canceller: Canceller,
    task: JoinHandle<PollOutcome>,
    state: Arc<Mutex<PollState>>,
}

impl PollHandle {
    /// Request cancellation. Safe to call at any time, any number of times.
    pub fn cancel(&self) {
        self.canceller.cancel();
    }

    /// A cloneable cancellation handle, for use while awaiting
    /// [`outcome`](Self::outcome).
    #[must_use]
    pub fn canceller(&self) -> Canceller {
        self.canceller.clone()
    }

    /// Snapshot of the run's progress.
    #[must_use]
    pub fn state(&self) -> PollState {
        *self.state.lock()
    }

    /// Whether the run is still polling.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state.lock().active
    }

    /// Wait for the terminal outcome.
    ///
    /// [`PollOutcome::Cancelled`] is only returned after a cancellation
    /// request.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PollTask`] if the poll task panicked.
    pub async fn outcome(self) -> Result<PollOutcome> {
        let Self {
            canceller,
            task,
            state,
        } = self;
        let joined = task.await;
        drop(canceller);

        joined.map_err(|e| {
            state.lock().active = false;
            error!("Verification poll task stopped without an outcome: {e}");
            Error::PollTask(e.to_string())
        })
    }
}

/// Cancels a running poll.
#[derive(Debug, Clone)]
pub struct Canceller {
    tx: Arc<watch::Sender<bool>>,
}

impl Canceller {
    /// Request cancellation.
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

struct PollTask<P> {
    probe: Arc<P>,
    request: VerificationRequest,
    options: PollOptions,
    state: Arc<Mutex<PollState>>,
    events_tx: PollEventsSender,
    cancel_rx: watch::Receiver<bool>,
}

impl<P: VerificationProbe> PollTask<P> {
    async fn run(mut self) -> PollOutcome {
        let interval = self.options.interval();
        info!(
            user = %self.request.user_address,
            contract = %self.request.contract_address,
            start_timestamp = self.request.start_timestamp,
            max_attempts = self.options.max_attempts,
            interval_ms = self.options.interval_ms,
            "Started polling for verification"
        );
        let _ = self.events_tx.send(PollEvent::Started {
            user_address: self.request.user_address.to_string(),
        });

        // First cycle runs one interval after start, like the rest.
        let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                () = cancellation(&mut self.cancel_rx) => return self.finish_cancelled(),
                _ = ticker.tick() => {}
            }

            if self.cancel_requested() {
                return self.finish_cancelled();
            }

            let attempt = self.state.lock().attempt_count + 1;
            debug!(
                attempt,
                max_attempts = self.options.max_attempts,
                "Polling for verification"
            );

            // The next tick is not awaited until this resolves, so cycles
            // never overlap.
            let result = tokio::select! {
                biased;
                () = cancellation(&mut self.cancel_rx) => return self.finish_cancelled(),
                result = self.probe.probe(&self.request, &self.options) => result,
            };

            if self.cancel_requested() {
                return self.finish_cancelled();
            }

            match result {
                Ok(Some(identity)) => return self.finish_matched(identity),
                Ok(None) => {
                    let attempts = {
                        let mut state = self.state.lock();
                        state.attempt_count += 1;
                        state.attempt_count
                    };
                    let _ = self.events_tx.send(PollEvent::CycleCompleted { attempts });

                    if attempts >= self.options.max_attempts {
                        return self.finish_timeout(attempts);
                    }
                }
                Err(e) => {
                    warn!("Verification poll cycle failed, retrying next tick: {e}");
                    let _ = self.events_tx.send(PollEvent::CycleFailed {
                        message: e.to_string(),
                    });
                }
            }
        }
    }

    fn cancel_requested(&self) -> bool {
        *self.cancel_rx.borrow() || self.cancel_rx.has_changed().is_err()
    }

    fn deactivate(&self) {
        self.state.lock().active = false;
    }

    fn finish_matched(&self, identity: VerifiedIdentity) -> PollOutcome {
        self.deactivate();
        info!(
            user = %self.request.user_address,
            tx = ?identity.transaction_hash,
            "Verification found"
        );
        let _ = self.events_tx.send(PollEvent::Matched {
            transaction_hash: identity.transaction_hash.clone(),
        });
        PollOutcome::Matched(identity)
    }

    fn finish_timeout(&self, attempts: u32) -> PollOutcome {
        self.deactivate();
        warn!(
            user = %self.request.user_address,
            attempts,
            "Verification polling timed out"
        );
        let _ = self.events_tx.send(PollEvent::TimedOut { attempts });
        PollOutcome::Timeout { attempts }
    }

    fn finish_cancelled(&self) -> PollOutcome {
        self.deactivate();
        debug!(user = %self.request.user_address, "Verification polling cancelled");
        let _ = self.events_tx.send(PollEvent::Cancelled);
        PollOutcome::Cancelled
    }
}

/// Resolves once cancellation is requested or every sender is dropped.
async fn cancellation(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            return;
        }
    }
}

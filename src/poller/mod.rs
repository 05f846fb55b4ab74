//! Verification status polling.
//!
//! After the user has been sent to the Self app, a [`VerificationStatusPoller`]
//! repeatedly runs a [`VerificationProbe`] until the verification shows up,
//! the attempt budget runs out, or the caller cancels.
//!
//! # Architecture
//!
//! ```text
//! start(user, contract, options)
//!        │
//!        ▼
//! ┌─────────────────────┐
//! │ wait for tick       │◄──────────────┐
//! └─────────┬───────────┘               │
//!           │                           │
//!           ▼                           │
//!      probe cycle                      │
//!           │                           │
//!    ┌──────┼──────────┐                │
//!    │      │          │                │
//!  MATCH  NOTHING    ERROR ─── log ─────┤
//!    │      │                           │
//!    ▼      ▼                           │
//! Matched  attempts += 1                │
//!           │                           │
//!     ┌─────┴──────┐                    │
//!     │            │                    │
//!  >= max        < max ─────────────────┘
//!     │
//!     ▼
//!  Timeout
//! ```
//!
//! Cancellation is checked while waiting for a tick, while a probe is in
//! flight, and before acting on a probe result.

mod backend;
mod contract;
mod options;
mod status;

pub use backend::BackendProbe;
pub use contract::{is_recent, select_completion, ContractProbe};
pub use options::{PollOptions, PollState, MAX_INTERVAL_MS};
pub use status::{Canceller, PollHandle, VerificationStatusPoller};

use crate::chain::Address;
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One verification attempt for one user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerificationRequest {
    /// Wallet address being verified.
    pub user_address: Address,
    /// Verification contract address.
    pub contract_address: Address,
    /// When the attempt started (unix seconds).
    pub start_timestamp: u64,
}

impl VerificationRequest {
    /// Create a request starting now.
    #[must_use]
    pub fn new(user_address: Address, contract_address: Address) -> Self {
        let now = u64::try_from(chrono::Utc::now().timestamp()).unwrap_or(0);
        Self::with_start_timestamp(user_address, contract_address, now)
    }

    /// Create a request with an explicit start time.
    #[must_use]
    pub fn with_start_timestamp(
        user_address: Address,
        contract_address: Address,
        start_timestamp: u64,
    ) -> Self {
        Self {
            user_address,
            contract_address,
            start_timestamp,
        }
    }
}

/// Verification data delivered on a match.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VerifiedIdentity {
    /// Transaction that completed the verification (contract mode only).
    pub transaction_hash: Option<String>,
    /// Disclosed date of birth.
    pub date_of_birth: String,
    /// Disclosed name.
    pub name: String,
    /// Disclosed nationality.
    pub nationality: String,
    /// Verification time (unix seconds), 0 if unknown.
    pub timestamp: u64,
    /// Self Protocol user identifier.
    pub user_identifier: Option<String>,
}

/// Terminal result of a poll run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// The verification was found.
    Matched(VerifiedIdentity),
    /// `max_attempts` cycles completed without a match.
    Timeout {
        /// Non-matching cycles performed.
        attempts: u32,
    },
    /// The caller cancelled the poll.
    Cancelled,
}

impl PollOutcome {
    /// The matched identity, if any.
    #[must_use]
    pub fn identity(&self) -> Option<&VerifiedIdentity> {
        match self {
            Self::Matched(identity) => Some(identity),
            Self::Timeout { .. } | Self::Cancelled => None,
        }
    }

    /// Short status label.
    #[must_use]
    pub fn status(&self) -> &'static str {
        match self {
            Self::Matched(_) => "matched",
            Self::Timeout { .. } => "timeout",
            Self::Cancelled => "cancelled",
        }
    }
}

/// A single poll cycle.
///
/// `Ok(None)` means the cycle completed and found nothing; it counts toward
/// the attempt budget. `Err` means the cycle could not complete; the poller
/// logs it and tries again on the next tick without counting it.
#[async_trait]
pub trait VerificationProbe: Send + Sync + 'static {
    /// Check once whether `request` has been verified.
    async fn probe(
        &self,
        request: &VerificationRequest,
        options: &PollOptions,
    ) -> Result<Option<VerifiedIdentity>>;
}

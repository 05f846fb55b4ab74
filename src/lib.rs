//! # self-watch
//!
//! Detects completion of a Self Protocol identity verification for a wallet
//! address.
//!
//! A verification is started out of band (the user opens a Self deeplink on
//! their phone). This crate then polls for the result, either on chain by
//! looking for the verification contract's `VerificationCompleted` event, or
//! through the mini app backend's check endpoint.
//!
//! ```rust,ignore
//! use self_watch::chain::{ChainKind, RpcChainReader};
//! use self_watch::poller::{ContractProbe, PollOptions, PollOutcome, VerificationStatusPoller};
//!
//! let reader = RpcChainReader::new(ChainKind::Celo.default_rpc_url())?;
//! let poller = VerificationStatusPoller::new(ContractProbe::new(reader));
//! let handle = poller.start(user, contract, PollOptions::default())?;
//!
//! match handle.outcome().await? {
//!     PollOutcome::Matched(identity) => println!("verified: {identity:?}"),
//!     PollOutcome::Timeout { .. } => println!("try again"),
//!     PollOutcome::Cancelled => {}
//! }
//! ```

pub mod chain;
pub mod config;
pub mod error;
pub mod event;
pub mod poller;

pub use config::WatchConfig;
pub use error::{Error, Result};
pub use event::{PollEvent, PollEventsChannel, PollEventsSender};
pub use poller::{PollHandle, PollOptions, PollOutcome, VerificationStatusPoller, VerifiedIdentity};

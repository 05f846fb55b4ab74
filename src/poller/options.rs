//! Poll options and per-run state.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default delay between poll cycles (5 seconds).
pub const DEFAULT_INTERVAL_MS: u64 = 5_000;

/// Longest accepted delay between poll cycles (one day).
pub const MAX_INTERVAL_MS: u64 = 86_400_000;

/// Default number of non-matching cycles before giving up (5 minutes at the
/// default interval).
pub const DEFAULT_MAX_ATTEMPTS: u32 = 60;

/// Default block lookback. The window `[head - 9, head]` spans 10 blocks.
pub const DEFAULT_LOOKBACK_BLOCKS: u64 = 9;

/// Largest inclusive `eth_getLogs` range accepted by free-tier providers.
pub const DEFAULT_MAX_BLOCK_RANGE: u64 = 10;

/// Default tolerated clock skew between block time and request start.
pub const DEFAULT_RECENCY_SKEW_SECS: u64 = 60;

/// Options controlling a verification poll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollOptions {
    /// Delay between cycle starts, in milliseconds.
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    /// Non-matching cycles allowed before the poll times out. Failed cycles
    /// do not count.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Blocks to look back from the head. Each cycle scans
    /// `[head - lookback_blocks, head]`.
    #[serde(default = "default_lookback_blocks")]
    pub lookback_blocks: u64,

    /// Largest inclusive block range the RPC provider accepts for log
    /// queries. `lookback_blocks + 1` must not exceed it.
    #[serde(default = "default_max_block_range")]
    pub max_block_range: u64,

    /// How far before the request start an event timestamp may lie and still
    /// count as a response to this request.
    #[serde(default = "default_recency_skew_secs")]
    pub recency_skew_secs: u64,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            interval_ms: DEFAULT_INTERVAL_MS,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            lookback_blocks: DEFAULT_LOOKBACK_BLOCKS,
            max_block_range: DEFAULT_MAX_BLOCK_RANGE,
            recency_skew_secs: DEFAULT_RECENCY_SKEW_SECS,
        }
    }
}

const fn default_interval_ms() -> u64 {
    DEFAULT_INTERVAL_MS
}

const fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}

const fn default_lookback_blocks() -> u64 {
    DEFAULT_LOOKBACK_BLOCKS
}

const fn default_max_block_range() -> u64 {
    DEFAULT_MAX_BLOCK_RANGE
}

const fn default_recency_skew_secs() -> u64 {
    DEFAULT_RECENCY_SKEW_SECS
}

impl PollOptions {
    /// Delay between cycle starts.
    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// Rough wall-clock budget (`max_attempts * interval`), excluding cycle
    /// latency.
    #[must_use]
    pub fn budget(&self) -> Duration {
        self.interval().saturating_mul(self.max_attempts)
    }

    /// Check the options are usable.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for a zero interval, an interval above
    /// [`MAX_INTERVAL_MS`], a zero attempt budget, or a lookback window wider
    /// than the provider's block range.
    pub fn validate(&self) -> Result<()> {
        if self.interval_ms == 0 {
            return Err(Error::Config("poll interval must be positive".to_string()));
        }
        if self.interval_ms > MAX_INTERVAL_MS {
            return Err(Error::Config(format!(
                "poll interval of {}ms exceeds the {MAX_INTERVAL_MS}ms maximum",
                self.interval_ms
            )));
        }
        if self.max_attempts == 0 {
            return Err(Error::Config("max_attempts must be at least 1".to_string()));
        }
        if self.max_block_range == 0 {
            return Err(Error::Config("max_block_range must be at least 1".to_string()));
        }
        if self.lookback_blocks >= self.max_block_range {
            return Err(Error::Config(format!(
                "lookback of {} blocks spans {} blocks, provider limit is {}",
                self.lookback_blocks,
                self.lookback_blocks.saturating_add(1),
                self.max_block_range
            )));
        }
        Ok(())
    }
}

/// Progress of one poll run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollState {
    /// Non-matching cycles completed so far.
    pub attempt_count: u32,
    /// Attempt ceiling.
    pub max_attempts: u32,
    /// Delay between cycles.
    pub interval: Duration,
    /// False once the run has matched, timed out or been cancelled.
    pub active: bool,
}

impl PollState {
    pub(crate) fn new(options: &PollOptions) -> Self {
        Self {
            attempt_count: 0,
            max_attempts: options.max_attempts,
            interval: options.interval(),
            active: true,
        }
    }

    /// Attempts left before timeout.
    #[must_use]
    pub fn remaining(&self) -> u32 {
        self.max_attempts.saturating_sub(self.attempt_count)
    }
}

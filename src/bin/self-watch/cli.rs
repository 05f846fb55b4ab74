//! Command-line interface definition.

use clap::{Parser, ValueEnum};
use self_watch::chain::ChainKind;
use self_watch::config::{VerificationMode, WatchConfig};
use std::path::PathBuf;

/// Watch for a Self Protocol identity verification to complete.
#[derive(Parser, Debug)]
#[command(name = "self-watch")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Wallet address being verified.
    #[arg(long, short, env = "SELF_WATCH_USER")]
    pub user: String,

    /// Where to look for the verification result.
    #[arg(long, value_enum, env = "SELF_WATCH_MODE")]
    pub mode: Option<CliMode>,

    /// Chain hosting the verification contract.
    #[arg(long, value_enum, env = "SELF_ENDPOINT_TYPE")]
    pub chain: Option<CliChain>,

    /// RPC endpoint (defaults to the chain's public endpoint).
    #[arg(long, env = "CELO_MAINNET_RPC")]
    pub rpc_url: Option<String>,

    /// Verification contract address.
    #[arg(long, env = "VERIFICATION_CONTRACT_ADDRESS")]
    pub contract: Option<String>,

    /// Mini app base URL for backend mode.
    #[arg(long, env = "SITE_URL")]
    pub site_url: Option<String>,

    /// Milliseconds between poll cycles.
    #[arg(long, env = "SELF_WATCH_INTERVAL_MS")]
    pub interval_ms: Option<u64>,

    /// Non-matching cycles before giving up.
    #[arg(long, env = "SELF_WATCH_MAX_ATTEMPTS")]
    pub max_attempts: Option<u32>,

    /// Blocks to look back from the chain head each cycle.
    #[arg(long, env = "SELF_WATCH_LOOKBACK_BLOCKS")]
    pub lookback_blocks: Option<u64>,

    /// Seconds of clock skew tolerated before the request start.
    #[arg(long, env = "SELF_WATCH_RECENCY_SKEW_SECS")]
    pub recency_skew_secs: Option<u64>,

    /// Print the outcome as JSON.
    #[arg(long)]
    pub json: bool,

    /// Log level. Overrides the config file; `RUST_LOG` overrides both.
    #[arg(long)]
    pub log_level: Option<String>,

    /// Path to configuration file.
    #[arg(long, short)]
    pub config: Option<PathBuf>,
}

/// Verification mode CLI enum.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum CliMode {
    /// Watch the verification contract on chain.
    Contract,
    /// Ask the mini app backend.
    Backend,
}

/// Chain CLI enum, using Self Protocol endpoint type names.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum CliChain {
    /// Celo mainnet.
    Celo,
    /// Celo Alfajores testnet.
    #[value(name = "staging_celo")]
    StagingCelo,
    /// Base mainnet.
    Base,
    /// Base Sepolia testnet.
    #[value(name = "staging_base")]
    StagingBase,
}

impl Cli {
    /// Convert CLI arguments into a `WatchConfig`.
    ///
    /// An explicit `--config` file must load. Without one, the default
    /// config location is used if a file exists there.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file cannot be loaded.
    pub fn into_config(self) -> color_eyre::Result<WatchConfig> {
        let mut config = match self.config {
            Some(ref path) => WatchConfig::from_file(path)?,
            None => match WatchConfig::default_path().filter(|path| path.exists()) {
                Some(path) => WatchConfig::from_file(&path)?,
                None => WatchConfig::default(),
            },
        };

        if let Some(mode) = self.mode {
            config.mode = mode.into();
        }
        if let Some(chain) = self.chain {
            config.chain = chain.into();
        }
        if self.rpc_url.is_some() {
            config.rpc_url = self.rpc_url;
        }
        if self.contract.is_some() {
            config.contract_address = self.contract;
        }
        if self.site_url.is_some() {
            config.site_url = self.site_url;
        }
        if let Some(log_level) = self.log_level {
            config.log_level = log_level;
        }

        // Poll options
        if let Some(interval_ms) = self.interval_ms {
            config.poll.interval_ms = interval_ms;
        }
        if let Some(max_attempts) = self.max_attempts {
            config.poll.max_attempts = max_attempts;
        }
        if let Some(lookback_blocks) = self.lookback_blocks {
            config.poll.lookback_blocks = lookback_blocks;
        }
        if let Some(recency_skew_secs) = self.recency_skew_secs {
            config.poll.recency_skew_secs = recency_skew_secs;
        }

        Ok(config)
    }
}

impl From<CliMode> for VerificationMode {
    fn from(m: CliMode) -> Self {
        match m {
            CliMode::Contract => VerificationMode::Contract,
            CliMode::Backend => VerificationMode::Backend,
        }
    }
}

impl From<CliChain> for ChainKind {
    fn from(c: CliChain) -> Self {
        match c {
            CliChain::Celo => ChainKind::Celo,
            CliChain::StagingCelo => ChainKind::StagingCelo,
            CliChain::Base => ChainKind::Base,
            CliChain::StagingBase => ChainKind::StagingBase,
        }
    }
}

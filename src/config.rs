//! Configuration for self-watch.

use crate::chain::{parse_address, Address, ChainKind};
use crate::poller::PollOptions;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Where verification results are read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationMode {
    /// Watch the verification contract on chain.
    #[default]
    Contract,
    /// Ask the mini app backend.
    Backend,
}

/// Watcher configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Verification mode.
    #[serde(default)]
    pub mode: VerificationMode,

    /// Chain hosting the verification contract.
    #[serde(default)]
    pub chain: ChainKind,

    /// RPC endpoint. Falls back to the chain's public endpoint.
    #[serde(default)]
    pub rpc_url: Option<String>,

    /// Verification contract address. Required in contract mode.
    #[serde(default)]
    pub contract_address: Option<String>,

    /// Mini app base URL. Required in backend mode.
    #[serde(default)]
    pub site_url: Option<String>,

    /// HTTP request timeout for backend checks, in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Poll options.
    #[serde(default)]
    pub poll: PollOptions,

    /// Log level.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            mode: VerificationMode::default(),
            chain: ChainKind::default(),
            rpc_url: None,
            contract_address: None,
            site_url: None,
            request_timeout_secs: default_request_timeout(),
            poll: PollOptions::default(),
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

const fn default_request_timeout() -> u64 {
    10
}

impl WatchConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| crate::Error::Config(e.to_string()))
    }

    /// Save configuration to a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn to_file(&self, path: &std::path::Path) -> crate::Result<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| crate::Error::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Default configuration file location, if a home directory is known.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "self-watch")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// RPC endpoint to use.
    #[must_use]
    pub fn rpc_url(&self) -> &str {
        self.rpc_url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| self.chain.default_rpc_url())
    }

    /// The configured contract address.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Config`] if no contract is configured, or
    /// [`crate::Error::InvalidAddress`] if it does not parse.
    pub fn require_contract(&self) -> crate::Result<Address> {
        match self.contract_address.as_deref().map(str::trim) {
            Some(address) if !address.is_empty() => parse_address(address),
            _ => Err(crate::Error::Config(
                "verification contract address is not configured \
                 (set VERIFICATION_CONTRACT_ADDRESS or --contract)"
                    .to_string(),
            )),
        }
    }

    /// The configured site URL.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Config`] if no site URL is configured.
    pub fn require_site_url(&self) -> crate::Result<&str> {
        self.site_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .ok_or_else(|| {
                crate::Error::Config(
                    "site URL is not configured (set SITE_URL or --site-url)".to_string(),
                )
            })
    }

    /// Backend request timeout.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

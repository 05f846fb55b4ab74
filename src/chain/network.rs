//! Known Self Protocol endpoint chains.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Chain hosting the verification contract, named after the Self Protocol
/// endpoint type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChainKind {
    /// Celo mainnet.
    #[default]
    Celo,
    /// Celo Alfajores testnet.
    StagingCelo,
    /// Base mainnet.
    Base,
    /// Base Sepolia testnet.
    StagingBase,
}

impl ChainKind {
    /// EIP-155 chain id.
    #[must_use]
    pub const fn chain_id(self) -> u64 {
        match self {
            Self::Celo => 42_220,
            Self::StagingCelo => 44_787,
            Self::Base => 8_453,
            Self::StagingBase => 84_532,
        }
    }

    /// Public RPC endpoint used when none is configured.
    #[must_use]
    pub const fn default_rpc_url(self) -> &'static str {
        match self {
            Self::Celo => "https://forno.celo.org",
            Self::StagingCelo => "https://alfajores-forno.celo-testnet.org",
            Self::Base => "https://mainnet.base.org",
            Self::StagingBase => "https://sepolia.base.org",
        }
    }

    /// Human readable network name.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Celo => "Celo Mainnet",
            Self::StagingCelo => "Celo Alfajores",
            Self::Base => "Base",
            Self::StagingBase => "Base Sepolia",
        }
    }

    /// Block explorer page for a transaction.
    #[must_use]
    pub fn explorer_tx_url(self, tx_hash: &str) -> String {
        let base = match self {
            Self::Celo => "https://celoscan.io/tx",
            Self::StagingCelo => "https://alfajores.celoscan.io/tx",
            Self::Base => "https://basescan.org/tx",
            Self::StagingBase => "https://sepolia.basescan.org/tx",
        };
        format!("{base}/{tx_hash}")
    }
}

impl fmt::Display for ChainKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

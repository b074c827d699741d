use std::fmt;

use url::Url;

use crate::family::ChainFamily;
use crate::node::RpcNodeOptions;

/// Chains the monitor knows how to probe out of the box.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Chain {
    /// Polkadot relay chain.
    Polkadot,
    /// Solana mainnet.
    Solana,
    /// Ethereum mainnet.
    Ethereum,
    /// Arbitrum One.
    Arbitrum,
    /// Bitcoin mainnet.
    Bitcoin,
    /// A Cosmos SDK chain.
    Cosmos,
}

impl Chain {
    /// Display name used for metric labels and alert titles.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Polkadot => "Polkadot",
            Self::Solana => "Solana",
            Self::Ethereum => "Ethereum",
            Self::Arbitrum => "Arbitrum",
            Self::Bitcoin => "Bitcoin",
            Self::Cosmos => "Cosmos",
        }
    }

    /// RPC dialect of the chain's nodes.
    #[must_use]
    pub const fn family(self) -> ChainFamily {
        match self {
            Self::Polkadot => ChainFamily::Substrate,
            Self::Solana => ChainFamily::Solana,
            Self::Ethereum | Self::Arbitrum => ChainFamily::Evm,
            Self::Bitcoin => ChainFamily::Bitcoin,
            Self::Cosmos => ChainFamily::Tendermint,
        }
    }

    /// Blocks a node may trail its reference and still count as synced.
    ///
    /// Fast chains get more slack for propagation latency.
    #[must_use]
    pub const fn tolerance(self) -> u64 {
        match self {
            Self::Polkadot | Self::Ethereum | Self::Bitcoin => 1,
            Self::Cosmos => 2,
            Self::Solana | Self::Arbitrum => 10,
        }
    }

    /// Probe options for a node of this chain.
    #[must_use]
    pub fn options(self, url: Url, reference_url: Option<Url>) -> RpcNodeOptions {
        RpcNodeOptions {
            name: self.name().to_string(),
            family: self.family(),
            url,
            reference_url,
            tolerance: self.tolerance(),
        }
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

//! Static chain table shared by the validation and display logic.

use crate::{
    address,
    error::{PolicyConfigError, PolicyViolation},
};
use alloy_chains::NamedChain;
use serde::Serialize;
use std::fmt;
use trontrust_config::{ChainVariant, Config};

/// Label used when a chain id is not in [`CHAINS`].
pub const UNKNOWN_NETWORK: &str = "Unknown";

/// TRON mainnet, derived from the last four bytes of the genesis block id.
pub const TRON_MAINNET: u64 = 728_126_428;
/// TRON Shasta testnet.
pub const TRON_SHASTA: u64 = 2_494_104_990;

/// The address format a chain expects.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChainFamily {
    Tron,
    Evm,
}

impl ChainFamily {
    pub const fn for_variant(variant: ChainVariant) -> Self {
        match variant {
            ChainVariant::Tron => Self::Tron,
            ChainVariant::Evm => Self::Evm,
        }
    }
}

impl fmt::Display for ChainFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tron => f.write_str("tron"),
            Self::Evm => f.write_str("evm"),
        }
    }
}

/// Everything the service knows about a network.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainDescriptor {
    pub id: u64,
    pub label: &'static str,
    pub is_testnet: bool,
    pub family: ChainFamily,
    /// Native currency symbol.
    pub symbol: &'static str,
    /// Decimals of the native currency.
    pub decimals: u8,
    /// Public HTTP API used for balance queries when none is configured.
    #[serde(skip)]
    pub balance_api: Option<&'static str>,
}

/// All supported networks.
pub static CHAINS: &[ChainDescriptor] = &[
    ChainDescriptor {
        id: TRON_MAINNET,
        label: "TRON Mainnet",
        is_testnet: false,
        family: ChainFamily::Tron,
        symbol: "TRX",
        decimals: 6,
        balance_api: Some("https://api.trongrid.io"),
    },
    ChainDescriptor {
        id: TRON_SHASTA,
        label: "TRON Shasta Testnet",
        is_testnet: true,
        family: ChainFamily::Tron,
        symbol: "TRX",
        decimals: 6,
        balance_api: Some("https://api.shasta.trongrid.io"),
    },
    ChainDescriptor {
        id: NamedChain::Mainnet as u64,
        label: "Ethereum",
        is_testnet: false,
        family: ChainFamily::Evm,
        symbol: "ETH",
        decimals: 18,
        balance_api: None,
    },
    ChainDescriptor {
        id: NamedChain::Polygon as u64,
        label: "Polygon",
        is_testnet: false,
        family: ChainFamily::Evm,
        symbol: "POL",
        decimals: 18,
        balance_api: None,
    },
    ChainDescriptor {
        id: NamedChain::Arbitrum as u64,
        label: "Arbitrum",
        is_testnet: false,
        family: ChainFamily::Evm,
        symbol: "ETH",
        decimals: 18,
        balance_api: None,
    },
    ChainDescriptor {
        id: NamedChain::Optimism as u64,
        label: "Optimism",
        is_testnet: false,
        family: ChainFamily::Evm,
        symbol: "ETH",
        decimals: 18,
        balance_api: None,
    },
    ChainDescriptor {
        id: NamedChain::Base as u64,
        label: "Base",
        is_testnet: false,
        family: ChainFamily::Evm,
        symbol: "ETH",
        decimals: 18,
        balance_api: None,
    },
];

/// Returns the descriptor for `chain_id`, if it is in the table.
pub fn lookup(chain_id: u64) -> Option<&'static ChainDescriptor> {
    CHAINS.iter().find(|chain| chain.id == chain_id)
}

/// Returns the display name of `chain_id`, [`UNKNOWN_NETWORK`] if it is not in the table.
pub fn network_label(chain_id: u64) -> &'static str {
    lookup(chain_id).map_or(UNKNOWN_NETWORK, |chain| chain.label)
}

/// Which chains and address formats the product variant accepts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChainPolicy {
    variant: ChainVariant,
    allowed: Vec<&'static ChainDescriptor>,
}

impl ChainPolicy {
    /// Allows every chain of the variant's family.
    pub fn for_variant(variant: ChainVariant) -> Self {
        let family = ChainFamily::for_variant(variant);
        let allowed = CHAINS.iter().filter(|chain| chain.family == family).collect();
        Self { variant, allowed }
    }

    /// Builds the policy from `variant` and the optional `allowed_chains` subset.
    pub fn from_config(config: &Config) -> Result<Self, PolicyConfigError> {
        let mut policy = Self::for_variant(config.variant);
        if let Some(ids) = &config.allowed_chains {
            if ids.is_empty() {
                return Err(PolicyConfigError::EmptyAllowList);
            }
            let mut allowed = Vec::with_capacity(ids.len());
            for &chain_id in ids {
                let chain = policy
                    .allowed
                    .iter()
                    .copied()
                    .find(|chain| chain.id == chain_id)
                    .ok_or(PolicyConfigError::UnknownChain { chain_id, variant: config.variant })?;
                if !allowed.contains(&chain) {
                    allowed.push(chain);
                }
            }
            policy.allowed = allowed;
        }
        Ok(policy)
    }

    pub fn variant(&self) -> ChainVariant {
        self.variant
    }

    pub fn family(&self) -> ChainFamily {
        ChainFamily::for_variant(self.variant)
    }

    /// The allow-listed chains, in table order.
    pub fn chains(&self) -> &[&'static ChainDescriptor] {
        &self.allowed
    }

    /// Returns the descriptor of `chain_id` if it is allow-listed.
    pub fn check_chain(&self, chain_id: u64) -> Result<&'static ChainDescriptor, PolicyViolation> {
        self.allowed
            .iter()
            .copied()
            .find(|chain| chain.id == chain_id)
            .ok_or(PolicyViolation::DisallowedChain { chain_id, variant: self.variant })
    }

    pub fn check_address(&self, address: &str) -> Result<(), PolicyViolation> {
        Ok(address::validate(self.family(), address)?)
    }

    /// Validates a connected account observation.
    ///
    /// A missing chain id is a violation; it is never assumed to be the variant's mainnet.
    pub fn check(
        &self,
        address: Option<&str>,
        chain_id: Option<u64>,
    ) -> Result<&'static ChainDescriptor, PolicyViolation> {
        let address = address.filter(|a| !a.is_empty()).ok_or(PolicyViolation::MissingAddress)?;
        let chain_id = chain_id.ok_or(PolicyViolation::MissingChainId)?;
        let chain = self.check_chain(chain_id)?;
        self.check_address(address)?;
        Ok(chain)
    }
}

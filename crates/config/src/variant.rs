use crate::error::UnknownVariant;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// The product variant, which decides the chain family the page accepts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChainVariant {
    /// TRON mainnet and the Shasta testnet only.
    #[default]
    Tron,
    /// The generic multi-chain EVM variant.
    Evm,
}

impl ChainVariant {
    /// All known variants.
    pub const ALL: [Self; 2] = [Self::Tron, Self::Evm];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Tron => "tron",
            Self::Evm => "evm",
        }
    }
}

impl fmt::Display for ChainVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChainVariant {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tron" => Ok(Self::Tron),
            "evm" | "ethereum" => Ok(Self::Evm),
            _ => Err(UnknownVariant(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_variant() {
        assert_eq!("tron".parse::<ChainVariant>().unwrap(), ChainVariant::Tron);
        assert_eq!("EVM".parse::<ChainVariant>().unwrap(), ChainVariant::Evm);
        assert_eq!("ethereum".parse::<ChainVariant>().unwrap(), ChainVariant::Evm);

        let err = "solana".parse::<ChainVariant>().unwrap_err();
        assert_eq!(err.to_string(), "unknown chain variant `solana`, expected one of: tron, evm");
    }

    #[test]
    fn display_round_trips() {
        for variant in ChainVariant::ALL {
            assert_eq!(variant.to_string().parse::<ChainVariant>().unwrap(), variant);
        }
    }
}

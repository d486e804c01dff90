//! Native balance lookups for the connected address.

use crate::{
    chains::{ChainDescriptor, ChainFamily},
    error::BalanceError,
};
use alloy_primitives::{U256, utils::format_units};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::{fmt, str::FromStr, sync::Arc, time::Duration};
use trontrust_config::{ChainVariant, Config};
use url::Url;

/// A native currency amount.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Balance {
    pub raw: U256,
    pub decimals: u8,
    pub symbol: &'static str,
}

impl Balance {
    pub fn new(raw: U256, chain: &ChainDescriptor) -> Self {
        Self { raw, decimals: chain.decimals, symbol: chain.symbol }
    }

    /// The amount in whole units, without trailing zeros.
    pub fn formatted(&self) -> String {
        let Ok(units) = format_units(self.raw, self.decimals) else {
            return self.raw.to_string();
        };
        match units.split_once('.') {
            Some((int, frac)) => {
                let frac = frac.trim_end_matches('0');
                if frac.is_empty() { int.to_string() } else { format!("{int}.{frac}") }
            }
            None => units,
        }
    }
}

impl fmt::Display for Balance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.formatted(), self.symbol)
    }
}

/// Where balances come from.
#[async_trait]
pub trait BalanceSource: Send + Sync {
    async fn balance(
        &self,
        address: &str,
        chain: &'static ChainDescriptor,
    ) -> Result<Balance, BalanceError>;
}

/// Builds the balance source for `config`, `None` when refreshing is disabled.
pub fn from_config(config: &Config) -> Result<Option<Arc<dyn BalanceSource>>, BalanceError> {
    if config.balance_refresh_interval().is_none() {
        return Ok(None);
    }
    let timeout = config.api_timeout();
    let source: Arc<dyn BalanceSource> = match config.variant {
        ChainVariant::Tron => Arc::new(TronGridBalance::new(config.balance_endpoint.clone(), timeout)?),
        ChainVariant::Evm => match &config.balance_endpoint {
            Some(endpoint) => Arc::new(JsonRpcBalance::new(endpoint.clone(), timeout)?),
            None => {
                warn!(
                    target: "trontrust::coordinator",
                    "balance refresh needs `balance_endpoint` for the evm variant, disabling"
                );
                return Ok(None);
            }
        },
    };
    Ok(Some(source))
}

fn client(timeout: Duration) -> Result<reqwest::Client, BalanceError> {
    reqwest::Client::builder().timeout(timeout).build().map_err(BalanceError::Client)
}

/// TronGrid `GET /v1/accounts/{address}`.
#[derive(Clone, Debug)]
pub struct TronGridBalance {
    client: reqwest::Client,
    endpoint: Option<Url>,
}

#[derive(Deserialize)]
struct TronGridAccounts {
    #[serde(default)]
    data: Vec<TronGridAccount>,
}

#[derive(Deserialize)]
struct TronGridAccount {
    /// Balance in sun.
    #[serde(default)]
    balance: u64,
}

impl TronGridBalance {
    /// Queries `endpoint`, or each chain's public TronGrid host when unset.
    pub fn new(endpoint: Option<Url>, timeout: Duration) -> Result<Self, BalanceError> {
        Ok(Self { client: client(timeout)?, endpoint })
    }
}

#[async_trait]
impl BalanceSource for TronGridBalance {
    async fn balance(
        &self,
        address: &str,
        chain: &'static ChainDescriptor,
    ) -> Result<Balance, BalanceError> {
        if chain.family != ChainFamily::Tron {
            return Err(BalanceError::NoEndpoint(chain.label));
        }
        let base = match &self.endpoint {
            Some(url) => url.as_str(),
            None => chain.balance_api.ok_or(BalanceError::NoEndpoint(chain.label))?,
        };
        let url = format!("{}/v1/accounts/{address}", base.trim_end_matches('/'));

        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(BalanceError::Status(response.status().as_u16()));
        }
        let accounts: TronGridAccounts = response.json().await?;
        // Accounts that never received TRX are not activated and come back empty.
        let sun = accounts.data.first().map_or(0, |account| account.balance);
        Ok(Balance::new(U256::from(sun), chain))
    }
}

/// `eth_getBalance` against a JSON-RPC node.
#[derive(Clone, Debug)]
pub struct JsonRpcBalance {
    client: reqwest::Client,
    endpoint: Url,
}

#[derive(Deserialize)]
struct RpcResponse {
    result: Option<String>,
    error: Option<RpcError>,
}

#[derive(Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

impl JsonRpcBalance {
    pub fn new(endpoint: Url, timeout: Duration) -> Result<Self, BalanceError> {
        Ok(Self { client: client(timeout)?, endpoint })
    }
}

#[async_trait]
impl BalanceSource for JsonRpcBalance {
    async fn balance(
        &self,
        address: &str,
        chain: &'static ChainDescriptor,
    ) -> Result<Balance, BalanceError> {
        let request = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "eth_getBalance",
            "params": [address, "latest"],
        });
        let response = self.client.post(self.endpoint.clone()).json(&request).send().await?;
        if !response.status().is_success() {
            return Err(BalanceError::Status(response.status().as_u16()));
        }
        let response: RpcResponse = response.json().await?;
        if let Some(RpcError { code, message }) = response.error {
            return Err(BalanceError::Rpc { code, message });
        }
        let result = response.result.ok_or_else(|| BalanceError::Decode("missing result".into()))?;
        let raw = U256::from_str(&result).map_err(|err| BalanceError::Decode(err.to_string()))?;
        Ok(Balance::new(raw, chain))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chains::{TRON_MAINNET, lookup};

    #[test]
    fn formats_without_trailing_zeros() {
        let trx = lookup(TRON_MAINNET).unwrap();
        assert_eq!(Balance::new(U256::from(1_500_000u64), trx).to_string(), "1.5 TRX");
        assert_eq!(Balance::new(U256::ZERO, trx).to_string(), "0 TRX");
        assert_eq!(Balance::new(U256::from(42_000_000u64), trx).to_string(), "42 TRX");

        let eth = lookup(1).unwrap();
        let wei = U256::from(10u64).pow(U256::from(18u64)) / U256::from(4u64);
        assert_eq!(Balance::new(wei, eth).to_string(), "0.25 ETH");
    }

    #[test]
    fn disabled_without_refresh_interval() {
        assert!(from_config(&Config::default()).unwrap().is_none());

        let config = Config {
            variant: ChainVariant::Evm,
            balance_refresh_secs: Some(30),
            ..Default::default()
        };
        assert!(from_config(&config).unwrap().is_none());

        let config = Config { balance_refresh_secs: Some(30), ..Default::default() };
        assert!(from_config(&config).unwrap().is_some());
    }
}

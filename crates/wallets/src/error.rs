use crate::api::ApiOperation;
use std::time::Duration;
use trontrust_config::ChainVariant;

/// Errors raised by a [`WalletSdk`](crate::WalletSdk) strategy.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SdkError {
    #[error("wallet SDK is not initialized: {0}")]
    NotInitialized(String),
    #[error("wallet SDK did not complete `{operation}` within {timeout:?}")]
    Timeout { operation: &'static str, timeout: Duration },
    #[error("{operation} rejected by wallet: {reason}")]
    Rejected { operation: &'static str, reason: String },
    #[error("wallet SDK error: {0}")]
    Other(String),
}

impl SdkError {
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }
}

/// Errors returned by the backend API client.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("request to `{}` failed: {source}", .operation.route())]
    Transport {
        operation: ApiOperation,
        #[source]
        source: reqwest::Error,
    },
    #[error(
        "`{}` returned HTTP {status}{}",
        .operation.route(),
        .message.as_deref().map(|msg| format!(": {msg}")).unwrap_or_default()
    )]
    Status { operation: ApiOperation, status: u16, message: Option<String> },
    #[error("`{}` rejected the request: {message}", .operation.route())]
    Rejected { operation: ApiOperation, message: String },
    #[error("invalid response from `{}`: {source}", .operation.route())]
    Decode {
        operation: ApiOperation,
        #[source]
        source: serde_json::Error,
    },
}

/// Errors returned by a [`BalanceSource`](crate::balance::BalanceSource).
#[derive(Debug, thiserror::Error)]
pub enum BalanceError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("balance request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("balance endpoint returned HTTP {0}")]
    Status(u16),
    #[error("node error {code}: {message}")]
    Rpc { code: i64, message: String },
    #[error("invalid balance response: {0}")]
    Decode(String),
    #[error("no balance endpoint configured for {0}")]
    NoEndpoint(&'static str),
}

/// Why an address string was refused for the active chain family.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum AddressError {
    #[error("address is empty")]
    Empty,
    #[error("address `{address}` does not start with `{expected}`")]
    WrongPrefix { address: String, expected: &'static str },
    #[error("address `{address}` is not valid: {reason}")]
    Invalid { address: String, reason: String },
}

/// A wallet observation that the chain policy refuses.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum PolicyViolation {
    #[error("wallet reported a connection without an address")]
    MissingAddress,
    #[error("wallet did not report a chain id")]
    MissingChainId,
    #[error("chain {chain_id} is not supported by the {variant} variant")]
    DisallowedChain { chain_id: u64, variant: ChainVariant },
    #[error(transparent)]
    MalformedAddress(#[from] AddressError),
}

/// Invalid chain policy settings.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum PolicyConfigError {
    #[error("chain {chain_id} is not part of the {variant} chain table")]
    UnknownChain { chain_id: u64, variant: ChainVariant },
    #[error("`allowed_chains` must not be empty")]
    EmptyAllowList,
}

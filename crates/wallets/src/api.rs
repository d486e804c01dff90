//! Client for the backend that records connected wallets.

use crate::{error::ApiError, session::WalletSession};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use trontrust_config::Config;

const TARGET: &str = "trontrust::api";

/// The two backend calls.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiOperation {
    SaveSession,
    RemoveSession,
}

impl ApiOperation {
    /// Route appended to the API base URL.
    pub const fn route(self) -> &'static str {
        match self {
            Self::SaveSession => "connect-wallet",
            Self::RemoveSession => "disconnect-wallet",
        }
    }
}

impl fmt::Display for ApiOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.route())
    }
}

/// Response body shared by both endpoints.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Body of `disconnect-wallet`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisconnectRequest {
    pub address: String,
}

/// Backend bookkeeping of the connected wallet.
#[async_trait]
pub trait WalletApi: Send + Sync {
    async fn save_session(&self, session: &WalletSession) -> Result<(), ApiError>;

    async fn remove_session(&self, address: &str) -> Result<(), ApiError>;
}

/// [`WalletApi`] over HTTP.
#[derive(Clone, Debug)]
pub struct HttpWalletApi {
    client: reqwest::Client,
    connect_url: String,
    disconnect_url: String,
}

impl HttpWalletApi {
    pub fn new(config: &Config) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(config.api_timeout())
            .user_agent(concat!("trontrust/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(ApiError::Client)?;
        Ok(Self {
            client,
            connect_url: config.api_endpoint(ApiOperation::SaveSession.route()),
            disconnect_url: config.api_endpoint(ApiOperation::RemoveSession.route()),
        })
    }

    fn url(&self, operation: ApiOperation) -> &str {
        match operation {
            ApiOperation::SaveSession => &self.connect_url,
            ApiOperation::RemoveSession => &self.disconnect_url,
        }
    }

    async fn post<T: Serialize + Sync + ?Sized>(
        &self,
        operation: ApiOperation,
        body: &T,
    ) -> Result<(), ApiError> {
        let url = self.url(operation);
        trace!(target: TARGET, %url, "posting");

        let transport = |source| ApiError::Transport { operation, source };
        let response = self.client.post(url).json(body).send().await.map_err(transport)?;
        let status = response.status();
        let bytes = response.bytes().await.map_err(transport)?;

        if !status.is_success() {
            let message = serde_json::from_slice::<ApiResponse>(&bytes).ok().and_then(|r| r.error);
            return Err(ApiError::Status { operation, status: status.as_u16(), message });
        }

        let response: ApiResponse = serde_json::from_slice(&bytes)
            .map_err(|source| ApiError::Decode { operation, source })?;
        if !response.success {
            return Err(ApiError::Rejected {
                operation,
                message: response.error.unwrap_or_else(|| "unknown error".to_string()),
            });
        }
        debug!(target: TARGET, %operation, "backend accepted request");
        Ok(())
    }
}

#[async_trait]
impl WalletApi for HttpWalletApi {
    async fn save_session(&self, session: &WalletSession) -> Result<(), ApiError> {
        self.post(ApiOperation::SaveSession, session).await
    }

    async fn remove_session(&self, address: &str) -> Result<(), ApiError> {
        self.post(ApiOperation::RemoveSession, &DisconnectRequest { address: address.to_string() })
            .await
    }
}

use serde::{Deserialize, Serialize};
use trontrust_config::{ChainVariant, Config};
use uuid::Uuid;

use crate::{
    chains::{ChainDescriptor, ChainPolicy},
    coordinator::UserAction,
    sdk::OpenOptions,
    wallet_browser::queue::Identified,
};

/// Envelope of every `/api` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum BridgeResponse<T> {
    Ok { data: T },
    Error { message: String },
}

impl<T> BridgeResponse<T> {
    pub fn ok(data: T) -> Self {
        Self::Ok { data }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error { message: message.into() }
    }
}

/// What the page should do next.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum CommandKind {
    Open {
        #[serde(default)]
        options: OpenOptions,
    },
    Disconnect,
}

impl CommandKind {
    pub fn operation(&self) -> &'static str {
        match self {
            Self::Open { .. } => "open",
            Self::Disconnect => "disconnect",
        }
    }
}

/// An SDK call forwarded to the page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeCommand {
    pub id: Uuid,
    #[serde(flatten)]
    pub kind: CommandKind,
}

impl Identified for BridgeCommand {
    fn id(&self) -> Uuid {
        self.id
    }
}

/// The page's answer to a [`BridgeCommand`]. `error` is set when the wallet refused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandResponse {
    pub id: Uuid,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionRequest {
    pub action: UserAction,
}

/// Settings the page needs to set up its wallet connector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageConfig {
    pub variant: ChainVariant,
    pub chains: Vec<ChainDescriptor>,
    pub project_id: Option<String>,
    pub app_name: String,
    pub app_description: String,
    pub app_url: Option<String>,
    pub app_icons: Vec<String>,
}

impl PageConfig {
    pub fn new(config: &Config, policy: &ChainPolicy) -> Self {
        Self {
            variant: policy.variant(),
            chains: policy.chains().iter().map(|chain| **chain).collect(),
            project_id: config.project_id.clone(),
            app_name: config.app_name.clone(),
            app_description: config.app_description.clone(),
            app_url: config.app_url.as_ref().map(ToString::to_string),
            app_icons: config.app_icons.clone(),
        }
    }
}

impl Default for PageConfig {
    fn default() -> Self {
        let config = Config::default();
        Self::new(&config, &ChainPolicy::for_variant(config.variant))
    }
}

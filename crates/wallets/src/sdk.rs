//! The wallet SDK capability consumed by the coordinator.

use crate::{error::SdkError, serde_helpers::lenient_chain_id};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Buffer size of the SDK event channels.
pub const EVENT_CAPACITY: usize = 64;

/// Connection change reported by the wallet.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountEvent {
    pub is_connected: bool,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default, deserialize_with = "lenient_chain_id")]
    pub chain_id: Option<u64>,
    /// Wallet or provider name, e.g. `TronLink`.
    #[serde(default)]
    pub wallet_type: Option<String>,
    #[serde(default)]
    pub user_agent: Option<String>,
}

impl AccountEvent {
    pub fn connected(address: impl Into<String>, chain_id: u64) -> Self {
        Self {
            is_connected: true,
            address: Some(address.into()),
            chain_id: Some(chain_id),
            ..Default::default()
        }
    }

    pub fn disconnected() -> Self {
        Self::default()
    }
}

/// Chain switch reported by the wallet.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkEvent {
    #[serde(default, deserialize_with = "lenient_chain_id")]
    pub chain_id: Option<u64>,
}

/// Connect modal visibility.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModalEvent {
    pub open: bool,
}

/// Options forwarded to [`WalletSdk::open`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenOptions {
    /// Modal view to show first, if the connector supports views.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub view: Option<String>,
}

/// A wallet connection SDK.
///
/// Implementations are interchangeable strategies: a browser wallet reached through the local
/// bridge, or an in-memory double in tests.
#[async_trait]
pub trait WalletSdk: Send + Sync {
    /// Name used as the session's wallet type when the wallet does not report one.
    fn name(&self) -> &str;

    /// Prepares the SDK. Called once at start and retried by the next connect on failure.
    async fn init(&self) -> Result<(), SdkError> {
        Ok(())
    }

    /// Shows the connect UI.
    async fn open(&self, options: OpenOptions) -> Result<(), SdkError>;

    async fn disconnect(&self) -> Result<(), SdkError>;

    fn subscribe_account(&self) -> broadcast::Receiver<AccountEvent>;

    fn subscribe_network(&self) -> broadcast::Receiver<NetworkEvent>;

    /// Modal open/closed notifications, if the SDK reports them.
    fn subscribe_state(&self) -> Option<broadcast::Receiver<ModalEvent>> {
        None
    }
}

/// Broadcast senders backing the `subscribe_*` methods of an SDK strategy.
#[derive(Clone, Debug)]
pub struct SdkEvents {
    account: broadcast::Sender<AccountEvent>,
    network: broadcast::Sender<NetworkEvent>,
    modal: broadcast::Sender<ModalEvent>,
}

impl Default for SdkEvents {
    fn default() -> Self {
        Self::new(EVENT_CAPACITY)
    }
}

impl SdkEvents {
    pub fn new(capacity: usize) -> Self {
        Self {
            account: broadcast::channel(capacity).0,
            network: broadcast::channel(capacity).0,
            modal: broadcast::channel(capacity).0,
        }
    }

    /// Publishes an account event. Returns `false` if nobody is subscribed.
    pub fn emit_account(&self, event: AccountEvent) -> bool {
        self.account.send(event).is_ok()
    }

    pub fn emit_network(&self, event: NetworkEvent) -> bool {
        self.network.send(event).is_ok()
    }

    pub fn emit_modal(&self, event: ModalEvent) -> bool {
        self.modal.send(event).is_ok()
    }

    pub fn subscribe_account(&self) -> broadcast::Receiver<AccountEvent> {
        self.account.subscribe()
    }

    pub fn subscribe_network(&self) -> broadcast::Receiver<NetworkEvent> {
        self.network.subscribe()
    }

    pub fn subscribe_modal(&self) -> broadcast::Receiver<ModalEvent> {
        self.modal.subscribe()
    }
}

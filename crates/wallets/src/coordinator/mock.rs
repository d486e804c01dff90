//! In-memory doubles for the coordinator's collaborators.

use crate::{
    api::{ApiOperation, WalletApi},
    balance::{Balance, BalanceSource},
    chains::ChainDescriptor,
    error::{ApiError, BalanceError, SdkError},
    sdk::{AccountEvent, ModalEvent, NetworkEvent, OpenOptions, SdkEvents, WalletSdk},
    session::WalletSession,
};
use alloy_primitives::U256;
use async_trait::async_trait;
use std::sync::{
    Mutex,
    atomic::{AtomicUsize, Ordering},
};
use tokio::sync::broadcast;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum SdkCall {
    Init,
    Open,
    Disconnect,
}

/// A wallet SDK whose events are emitted by the test.
#[derive(Debug, Default)]
pub(crate) struct MockSdk {
    events: SdkEvents,
    calls: Mutex<Vec<SdkCall>>,
    init_error: Mutex<Option<SdkError>>,
    open_error: Mutex<Option<SdkError>>,
    disconnect_error: Mutex<Option<SdkError>>,
}

impl MockSdk {
    pub(crate) fn fail_init(&self, err: Option<SdkError>) {
        *self.init_error.lock().unwrap() = err;
    }

    pub(crate) fn fail_open(&self, err: Option<SdkError>) {
        *self.open_error.lock().unwrap() = err;
    }

    pub(crate) fn fail_disconnect(&self, err: Option<SdkError>) {
        *self.disconnect_error.lock().unwrap() = err;
    }

    pub(crate) fn calls(&self, call: SdkCall) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| **c == call).count()
    }

    pub(crate) fn emit_account(&self, event: AccountEvent) {
        self.events.emit_account(event);
    }

    pub(crate) fn emit_network(&self, event: NetworkEvent) {
        self.events.emit_network(event);
    }

    pub(crate) fn emit_modal(&self, event: ModalEvent) {
        self.events.emit_modal(event);
    }

    fn record(&self, call: SdkCall, error: &Mutex<Option<SdkError>>) -> Result<(), SdkError> {
        self.calls.lock().unwrap().push(call);
        match error.lock().unwrap().clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl WalletSdk for MockSdk {
    fn name(&self) -> &str {
        "mock"
    }

    async fn init(&self) -> Result<(), SdkError> {
        self.record(SdkCall::Init, &self.init_error)
    }

    async fn open(&self, _options: OpenOptions) -> Result<(), SdkError> {
        self.record(SdkCall::Open, &self.open_error)
    }

    async fn disconnect(&self) -> Result<(), SdkError> {
        self.record(SdkCall::Disconnect, &self.disconnect_error)
    }

    fn subscribe_account(&self) -> broadcast::Receiver<AccountEvent> {
        self.events.subscribe_account()
    }

    fn subscribe_network(&self) -> broadcast::Receiver<NetworkEvent> {
        self.events.subscribe_network()
    }

    fn subscribe_state(&self) -> Option<broadcast::Receiver<ModalEvent>> {
        Some(self.events.subscribe_modal())
    }
}

/// Records every backend call, optionally failing them with an HTTP status.
#[derive(Debug, Default)]
pub(crate) struct RecordingApi {
    saved: Mutex<Vec<WalletSession>>,
    removed: Mutex<Vec<String>>,
    fail_status: Mutex<Option<u16>>,
}

impl RecordingApi {
    pub(crate) fn fail_with(&self, status: Option<u16>) {
        *self.fail_status.lock().unwrap() = status;
    }

    pub(crate) fn saved(&self) -> Vec<WalletSession> {
        self.saved.lock().unwrap().clone()
    }

    pub(crate) fn removed(&self) -> Vec<String> {
        self.removed.lock().unwrap().clone()
    }

    fn result(&self, operation: ApiOperation) -> Result<(), ApiError> {
        match *self.fail_status.lock().unwrap() {
            Some(status) => Err(ApiError::Status {
                operation,
                status,
                message: Some("internal error".to_string()),
            }),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl WalletApi for RecordingApi {
    async fn save_session(&self, session: &WalletSession) -> Result<(), ApiError> {
        self.saved.lock().unwrap().push(session.clone());
        self.result(ApiOperation::SaveSession)
    }

    async fn remove_session(&self, address: &str) -> Result<(), ApiError> {
        self.removed.lock().unwrap().push(address.to_string());
        self.result(ApiOperation::RemoveSession)
    }
}

/// Always reports the same raw balance.
#[derive(Debug)]
pub(crate) struct FixedBalance {
    raw: u64,
    queries: AtomicUsize,
}

impl FixedBalance {
    pub(crate) fn new(raw: u64) -> Self {
        Self { raw, queries: AtomicUsize::new(0) }
    }

    pub(crate) fn queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BalanceSource for FixedBalance {
    async fn balance(
        &self,
        _address: &str,
        chain: &'static ChainDescriptor,
    ) -> Result<Balance, BalanceError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        Ok(Balance::new(U256::from(self.raw), chain))
    }
}

//! Wallet connection lifecycle.
//!
//! The [`Coordinator`] owns the current [`WalletSession`] and is the only thing that mutates it.
//! Every input (user actions, SDK events, finished background calls and timer expiries) goes
//! through one of its handlers, one at a time; [`CoordinatorService`] is the loop that feeds them.
//!
//! Slow work never blocks a handler. SDK calls, backend calls and balance lookups run as spawned
//! tasks that report back through an [`Outcome`], which is checked against the current state before
//! it is applied, so results that arrive after the session changed are dropped.

use crate::{
    api::{ApiOperation, WalletApi},
    balance::{Balance, BalanceSource},
    chains::{ChainDescriptor, ChainPolicy},
    error::{ApiError, BalanceError, PolicyViolation, SdkError},
    sdk::{AccountEvent, ModalEvent, NetworkEvent, OpenOptions, WalletSdk},
    session::{SessionIds, WalletSession},
};
use serde::{Deserialize, Serialize};
use std::{fmt, sync::Arc, time::Duration};
use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
    time::{Instant, MissedTickBehavior},
};
use trontrust_config::Config;

mod service;
pub use service::{CoordinatorHandle, CoordinatorService};

#[cfg(test)]
pub(crate) mod mock;


const TARGET: &str = "trontrust::coordinator";

/// Why a connect attempt or an active connection ended in [`ConnectionState::Error`].
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ConnectError {
    #[error("wallet SDK unavailable: {0}")]
    SdkUnavailable(#[source] SdkError),
    #[error("could not open wallet connect: {0}")]
    OpenFailed(#[source] SdkError),
    #[error(transparent)]
    Policy(#[from] PolicyViolation),
}

/// Primary connection state.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum ConnectionState {
    #[default]
    Idle,
    Connecting,
    Connected {
        session: WalletSession,
    },
    Error {
        reason: ConnectError,
    },
}

impl ConnectionState {
    pub fn status(&self) -> ConnectionStatus {
        match self {
            Self::Idle => ConnectionStatus::Idle,
            Self::Connecting => ConnectionStatus::Connecting,
            Self::Connected { .. } => ConnectionStatus::Connected,
            Self::Error { .. } => ConnectionStatus::Error,
        }
    }

    pub fn session(&self) -> Option<&WalletSession> {
        match self {
            Self::Connected { session } => Some(session),
            _ => None,
        }
    }
}

/// [`ConnectionState`] without its payload.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    #[default]
    Idle,
    Connecting,
    Connected,
    Error,
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Error => "error",
        };
        f.write_str(s)
    }
}

/// Secondary status of the backend bookkeeping. Never affects [`ConnectionState`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum ApiStatus {
    #[default]
    Idle,
    Pending {
        operation: ApiOperation,
    },
    Synced {
        operation: ApiOperation,
    },
    Failed {
        operation: ApiOperation,
        message: String,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// A dismissible message that expires on its own.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
    #[serde(skip)]
    pub expires_at: Instant,
}

/// What the page and the CLI render.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CoordinatorSnapshot {
    pub status: ConnectionStatus,
    pub session: Option<WalletSession>,
    pub error: Option<String>,
    pub api_status: ApiStatus,
    pub notice: Option<Notice>,
    /// Formatted native balance, e.g. `12.5 TRX`.
    pub balance: Option<String>,
}

/// User intents, from the page or the terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserAction {
    Connect,
    Disconnect,
    DismissNotice,
}

/// Timings and identity of a coordinator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CoordinatorSettings {
    /// Recorded on every log event.
    pub component: String,
    pub modal_grace: Duration,
    pub notice_timeout: Duration,
    pub balance_refresh: Option<Duration>,
}

impl Default for CoordinatorSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl CoordinatorSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            component: format!("wallet-connect/{}", config.variant),
            modal_grace: config.modal_grace_period(),
            notice_timeout: config.notice_timeout(),
            balance_refresh: config.balance_refresh_interval(),
        }
    }
}

/// Completion of work spawned by the coordinator.
#[derive(Debug)]
pub enum Outcome {
    Open { attempt: u64, initialized: bool, result: Result<(), ConnectError> },
    Disconnect { address: String, result: Result<(), SdkError> },
    Api { operation: ApiOperation, address: String, result: Result<(), ApiError> },
    Balance { address: String, chain_id: u64, result: Result<Balance, BalanceError> },
}

/// The connection state machine.
pub struct Coordinator {
    settings: CoordinatorSettings,
    policy: ChainPolicy,
    sdk: Arc<dyn WalletSdk>,
    api: Arc<dyn WalletApi>,
    balances: Option<Arc<dyn BalanceSource>>,
    state: ConnectionState,
    sdk_ready: bool,
    /// Incremented on every connect so outdated `open` results can be told apart.
    attempt: u64,
    session_ids: SessionIds,
    api_status: ApiStatus,
    notice: Option<Notice>,
    balance: Option<Balance>,
    modal_deadline: Option<Instant>,
    balance_task: Option<JoinHandle<()>>,
    outcomes: mpsc::UnboundedSender<Outcome>,
    snapshots: watch::Sender<CoordinatorSnapshot>,
}

impl fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Coordinator")
            .field("component", &self.settings.component)
            .field("sdk", &self.sdk.name())
            .field("state", &self.state)
            .field("api_status", &self.api_status)
            .finish_non_exhaustive()
    }
}

impl Coordinator {
    /// Creates a coordinator in [`ConnectionState::Idle`].
    ///
    /// The returned receiver yields the [`Outcome`]s of spawned work; pass each one to
    /// [`on_outcome`](Self::on_outcome).
    pub fn new(
        settings: CoordinatorSettings,
        policy: ChainPolicy,
        sdk: Arc<dyn WalletSdk>,
        api: Arc<dyn WalletApi>,
    ) -> (Self, mpsc::UnboundedReceiver<Outcome>) {
        let (outcomes, outcomes_rx) = mpsc::unbounded_channel();
        let coordinator = Self {
            settings,
            policy,
            sdk,
            api,
            balances: None,
            state: ConnectionState::Idle,
            sdk_ready: false,
            attempt: 0,
            session_ids: SessionIds::new(),
            api_status: ApiStatus::Idle,
            notice: None,
            balance: None,
            modal_deadline: None,
            balance_task: None,
            outcomes,
            snapshots: watch::Sender::new(CoordinatorSnapshot::default()),
        };
        (coordinator, outcomes_rx)
    }

    /// Refreshes the connected wallet's balance with `source` while connected.
    pub fn with_balance_source(mut self, source: Option<Arc<dyn BalanceSource>>) -> Self {
        self.balances = source;
        self
    }

    pub fn state(&self) -> &ConnectionState {
        &self.state
    }

    pub fn session(&self) -> Option<&WalletSession> {
        self.state.session()
    }

    pub fn api_status(&self) -> &ApiStatus {
        &self.api_status
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn balance(&self) -> Option<&Balance> {
        self.balance.as_ref()
    }

    pub fn policy(&self) -> &ChainPolicy {
        &self.policy
    }

    pub fn sdk(&self) -> &Arc<dyn WalletSdk> {
        &self.sdk
    }

    pub fn subscribe(&self) -> watch::Receiver<CoordinatorSnapshot> {
        self.snapshots.subscribe()
    }

    pub fn snapshot(&self) -> CoordinatorSnapshot {
        CoordinatorSnapshot {
            status: self.state.status(),
            session: self.state.session().cloned(),
            error: match &self.state {
                ConnectionState::Error { reason } => Some(reason.to_string()),
                _ => None,
            },
            api_status: self.api_status.clone(),
            notice: self.notice.clone(),
            balance: self.balance.as_ref().map(ToString::to_string),
        }
    }

    /// Initializes the SDK. A failure is logged and retried by the next [`connect`](Self::connect).
    pub async fn initialize(&mut self) {
        match self.sdk.init().await {
            Ok(()) => {
                self.sdk_ready = true;
                debug!(target: TARGET, component = %self.settings.component, sdk = self.sdk.name(), "wallet SDK initialized");
            }
            Err(err) => {
                warn!(target: TARGET, component = %self.settings.component, %err, "wallet SDK initialization failed");
            }
        }
    }

    pub fn on_action(&mut self, action: UserAction) {
        match action {
            UserAction::Connect => self.connect(),
            UserAction::Disconnect => self.disconnect(),
            UserAction::DismissNotice => self.dismiss_notice(),
        }
    }

    /// Starts a connect attempt from `Idle` or `Error`.
    pub fn connect(&mut self) {
        match self.state {
            ConnectionState::Connecting | ConnectionState::Connected { .. } => {
                debug!(target: TARGET, component = %self.settings.component, state = %self.state.status(), "connect ignored");
                return;
            }
            ConnectionState::Idle | ConnectionState::Error { .. } => {}
        }

        self.attempt += 1;
        self.modal_deadline = None;
        self.transition(ConnectionState::Connecting);

        let attempt = self.attempt;
        let needs_init = !self.sdk_ready;
        let sdk = self.sdk.clone();
        let outcomes = self.outcomes.clone();
        tokio::spawn(async move {
            let result = async {
                if needs_init {
                    sdk.init().await.map_err(ConnectError::SdkUnavailable)?;
                }
                sdk.open(OpenOptions::default()).await.map_err(ConnectError::OpenFailed)
            }
            .await;
            let initialized = !matches!(result, Err(ConnectError::SdkUnavailable(_)));
            let _ = outcomes.send(Outcome::Open { attempt, initialized, result });
        });
    }

    /// Disconnects the wallet. A no-op while `Idle`.
    pub fn disconnect(&mut self) {
        match self.state.status() {
            ConnectionStatus::Idle => {
                debug!(target: TARGET, component = %self.settings.component, "disconnect while idle ignored");
            }
            ConnectionStatus::Error => self.transition(ConnectionState::Idle),
            ConnectionStatus::Connecting => {
                self.spawn_sdk_disconnect();
                self.modal_deadline = None;
                self.transition(ConnectionState::Idle);
            }
            ConnectionStatus::Connected => {
                let Some(address) = self.session().map(|s| s.address().to_string()) else { return };
                let sdk = self.sdk.clone();
                let outcomes = self.outcomes.clone();
                tokio::spawn(async move {
                    let result = sdk.disconnect().await;
                    let _ = outcomes.send(Outcome::Disconnect { address, result });
                });
            }
        }
    }

    pub fn on_account_event(&mut self, event: AccountEvent) {
        if !event.is_connected {
            if let ConnectionState::Connected { session } = &self.state {
                info!(target: TARGET, component = %self.settings.component, address = session.address(), "wallet reported disconnect");
                self.end_session();
            } else {
                trace!(target: TARGET, component = %self.settings.component, "disconnect event without session ignored");
            }
            return;
        }

        let Some(address) = event.address.filter(|address| !address.is_empty()) else {
            return self.reject(PolicyViolation::MissingAddress);
        };
        let chain = match self.policy.check(Some(&address), event.chain_id) {
            Ok(chain) => chain,
            Err(violation) => return self.reject(violation),
        };

        let current = self.state.session().map(|s| (s.address() == address, s.chain_id()));
        match current {
            Some((true, chain_id)) if chain_id == chain.id => {
                trace!(target: TARGET, component = %self.settings.component, %address, "duplicate account event ignored");
            }
            Some((true, _)) => self.switch_chain(chain),
            Some((false, _)) => {
                if let Some(previous) = self.session().map(|s| s.address().to_string()) {
                    info!(target: TARGET, component = %self.settings.component, %previous, %address, "wallet switched account");
                    self.stop_balance_refresh();
                    self.remove_session(previous);
                }
                self.establish(address, chain, event.wallet_type, event.user_agent);
            }
            None => self.establish(address, chain, event.wallet_type, event.user_agent),
        }
    }

    pub fn on_network_event(&mut self, event: NetworkEvent) {
        let Some(current) = self.session().map(WalletSession::chain_id) else {
            trace!(target: TARGET, component = %self.settings.component, ?event, "network event without session ignored");
            return;
        };
        let Some(chain_id) = event.chain_id else {
            return self.reject(PolicyViolation::MissingChainId);
        };
        if chain_id == current {
            return;
        }
        match self.policy.check_chain(chain_id) {
            Ok(chain) => self.switch_chain(chain),
            Err(violation) => self.reject(violation),
        }
    }

    /// Tracks the connect modal. Closing it while connecting starts the grace period after which
    /// the attempt counts as cancelled.
    pub fn on_modal_event(&mut self, event: ModalEvent) {
        if event.open {
            self.modal_deadline = None;
        } else if self.state == ConnectionState::Connecting {
            let deadline = Instant::now() + self.settings.modal_grace;
            debug!(target: TARGET, component = %self.settings.component, grace = ?self.settings.modal_grace, "connect modal closed");
            self.modal_deadline = Some(deadline);
        }
    }

    /// The earliest instant at which [`on_tick`](Self::on_tick) has something to do.
    pub fn next_deadline(&self) -> Option<Instant> {
        let notice = self.notice.as_ref().map(|notice| notice.expires_at);
        match (self.modal_deadline, notice) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Applies timer expiries up to `now`.
    pub fn on_tick(&mut self, now: Instant) {
        if self.modal_deadline.is_some_and(|deadline| deadline <= now) {
            self.modal_deadline = None;
            if self.state == ConnectionState::Connecting {
                info!(target: TARGET, component = %self.settings.component, "connect cancelled by user");
                self.transition(ConnectionState::Idle);
            }
        }
        if self.notice.as_ref().is_some_and(|notice| notice.expires_at <= now) {
            self.notice = None;
            self.publish();
        }
    }

    pub fn dismiss_notice(&mut self) {
        if self.notice.take().is_some() {
            self.publish();
        }
    }

    pub fn on_outcome(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Open { attempt, initialized, result } => {
                if initialized {
                    self.sdk_ready = true;
                }
                if attempt != self.attempt || self.state != ConnectionState::Connecting {
                    trace!(target: TARGET, component = %self.settings.component, attempt, "outdated open result ignored");
                    return;
                }
                match result {
                    Ok(()) => {}
                    Err(ConnectError::OpenFailed(SdkError::Rejected { reason, .. })) => {
                        info!(target: TARGET, component = %self.settings.component, %reason, "connect cancelled by user");
                        self.modal_deadline = None;
                        self.transition(ConnectionState::Idle);
                    }
                    Err(reason) => {
                        warn!(target: TARGET, component = %self.settings.component, %reason, "connect failed");
                        self.modal_deadline = None;
                        self.transition(ConnectionState::Error { reason });
                    }
                }
            }
            Outcome::Disconnect { address, result } => {
                if self.session().is_none_or(|session| session.address() != address) {
                    trace!(target: TARGET, component = %self.settings.component, %address, "outdated disconnect result ignored");
                    return;
                }
                match result {
                    Ok(()) => self.end_session(),
                    Err(err) => {
                        warn!(target: TARGET, component = %self.settings.component, %err, "wallet disconnect failed");
                        self.post_notice(NoticeLevel::Warning, format!("Disconnect failed: {err}"));
                    }
                }
            }
            Outcome::Api { operation, address, result } => {
                let current = self.session().map(WalletSession::address);
                let stale = match current {
                    Some(active) => active != address,
                    None => operation != ApiOperation::RemoveSession,
                };
                if stale {
                    debug!(target: TARGET, component = %self.settings.component, %operation, %address, "stale backend response discarded");
                    return;
                }
                match result {
                    Ok(()) => {
                        debug!(target: TARGET, component = %self.settings.component, %operation, %address, "backend synced");
                        self.api_status = ApiStatus::Synced { operation };
                        self.publish();
                    }
                    Err(err) => {
                        warn!(target: TARGET, component = %self.settings.component, %operation, %err, "backend sync failed");
                        self.api_status = ApiStatus::Failed { operation, message: err.to_string() };
                        self.post_notice(NoticeLevel::Error, format!("Backend sync failed: {err}"));
                    }
                }
            }
            Outcome::Balance { address, chain_id, result } => {
                if self.session().is_none_or(|s| s.address() != address || s.chain_id() != chain_id) {
                    return;
                }
                match result {
                    Ok(balance) => {
                        if self.balance.as_ref() != Some(&balance) {
                            debug!(target: TARGET, component = %self.settings.component, %balance, "balance updated");
                            self.balance = Some(balance);
                            self.publish();
                        }
                    }
                    Err(err) => {
                        debug!(target: TARGET, component = %self.settings.component, %err, "balance refresh failed");
                    }
                }
            }
        }
    }

    fn establish(
        &mut self,
        address: String,
        chain: &'static ChainDescriptor,
        wallet_type: Option<String>,
        user_agent: Option<String>,
    ) {
        let wallet_type = wallet_type.unwrap_or_else(|| self.sdk.name().to_string());
        let session =
            WalletSession::new(address, chain, wallet_type, self.session_ids.next(), user_agent);
        info!(
            target: TARGET,
            component = %self.settings.component,
            address = session.address(),
            network = session.network(),
            session_id = %session.session_id(),
            "wallet connected"
        );

        self.modal_deadline = None;
        self.balance = None;
        let address = session.address().to_string();
        self.mark_pending(ApiOperation::SaveSession);
        self.save_session(session.clone());
        self.transition(ConnectionState::Connected { session });
        self.start_balance_refresh(address, chain);
    }

    fn switch_chain(&mut self, chain: &'static ChainDescriptor) {
        let ConnectionState::Connected { session } = &mut self.state else { return };
        info!(
            target: TARGET,
            component = %self.settings.component,
            from = session.chain_id(),
            to = chain.id,
            network = chain.label,
            "wallet switched network"
        );
        session.switch_chain(chain);
        let session = session.clone();

        self.stop_balance_refresh();
        self.mark_pending(ApiOperation::SaveSession);
        self.save_session(session.clone());
        self.start_balance_refresh(session.address().to_string(), chain);
        self.publish();
    }

    /// Leaves `Connected` for `Idle`, removing the session from the backend.
    fn end_session(&mut self) {
        let Some(address) = self.session().map(|s| s.address().to_string()) else { return };
        self.stop_balance_refresh();
        self.mark_pending(ApiOperation::RemoveSession);
        self.remove_session(address);
        self.transition(ConnectionState::Idle);
    }

    /// Forces the wallet off after a policy violation.
    fn reject(&mut self, violation: PolicyViolation) {
        warn!(target: TARGET, component = %self.settings.component, %violation, "policy violation, disconnecting wallet");
        self.spawn_sdk_disconnect();
        if let Some(previous) = self.session().map(|s| s.address().to_string()) {
            self.mark_pending(ApiOperation::RemoveSession);
            self.remove_session(previous);
        }
        self.stop_balance_refresh();
        self.modal_deadline = None;
        self.transition(ConnectionState::Error { reason: violation.into() });
    }

    fn transition(&mut self, next: ConnectionState) {
        let from = self.state.status();
        let to = next.status();
        if from != to {
            info!(target: TARGET, component = %self.settings.component, %from, %to, "state transition");
        }
        self.state = next;
        self.publish();
    }

    fn publish(&self) {
        self.snapshots.send_replace(self.snapshot());
    }

    fn post_notice(&mut self, level: NoticeLevel, message: String) {
        let expires_at = Instant::now() + self.settings.notice_timeout;
        self.notice = Some(Notice { level, message, expires_at });
        self.publish();
    }

    /// Only for calls whose result will still be applied once the caller's transition is done.
    fn mark_pending(&mut self, operation: ApiOperation) {
        self.api_status = ApiStatus::Pending { operation };
    }

    fn save_session(&self, session: WalletSession) {
        let operation = ApiOperation::SaveSession;
        let api = self.api.clone();
        let outcomes = self.outcomes.clone();
        tokio::spawn(async move {
            let result = api.save_session(&session).await;
            let address = session.address().to_string();
            let _ = outcomes.send(Outcome::Api { operation, address, result });
        });
    }

    /// Best effort: a failure only shows up in [`ApiStatus`] and as a notice.
    fn remove_session(&self, address: String) {
        let operation = ApiOperation::RemoveSession;
        let api = self.api.clone();
        let outcomes = self.outcomes.clone();
        tokio::spawn(async move {
            let result = api.remove_session(&address).await;
            let _ = outcomes.send(Outcome::Api { operation, address, result });
        });
    }

    fn spawn_sdk_disconnect(&self) {
        let sdk = self.sdk.clone();
        let component = self.settings.component.clone();
        tokio::spawn(async move {
            if let Err(err) = sdk.disconnect().await {
                warn!(target: TARGET, %component, %err, "wallet disconnect failed");
            }
        });
    }

    fn start_balance_refresh(&mut self, address: String, chain: &'static ChainDescriptor) {
        let (Some(source), Some(period)) = (self.balances.clone(), self.settings.balance_refresh)
        else {
            return;
        };
        let outcomes = self.outcomes.clone();
        self.balance_task = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                let result = source.balance(&address, chain).await;
                let outcome = Outcome::Balance { address: address.clone(), chain_id: chain.id, result };
                if outcomes.send(outcome).is_err() {
                    break;
                }
            }
        }));
    }

    fn stop_balance_refresh(&mut self) {
        if let Some(task) = self.balance_task.take() {
            task.abort();
        }
        self.balance = None;
    }

    #[cfg(test)]
    pub(crate) fn balance_refresh_running(&self) -> bool {
        self.balance_task.as_ref().is_some_and(|task| !task.is_finished())
    }
}

impl Drop for Coordinator {
    fn drop(&mut self) {
        if let Some(task) = self.balance_task.take() {
            task.abort();
        }
    }
}

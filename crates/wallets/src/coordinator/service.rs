use super::{Coordinator, CoordinatorSnapshot, Outcome, TARGET, UserAction};
use crate::sdk::{AccountEvent, ModalEvent, NetworkEvent};
use std::future;
use tokio::{
    sync::{
        broadcast::{self, error::RecvError},
        mpsc, oneshot, watch,
    },
    task::JoinHandle,
    time::{Instant, sleep_until},
};

/// Event loop driving a [`Coordinator`].
///
/// Everything the coordinator reacts to arrives here and is handled one event at a time, so the
/// coordinator never needs a lock.
pub struct CoordinatorService {
    coordinator: Coordinator,
    outcomes: mpsc::UnboundedReceiver<Outcome>,
    actions: mpsc::UnboundedReceiver<UserAction>,
    account: Option<broadcast::Receiver<AccountEvent>>,
    network: Option<broadcast::Receiver<NetworkEvent>>,
    modal: Option<broadcast::Receiver<ModalEvent>>,
    shutdown: oneshot::Receiver<()>,
}

impl CoordinatorService {
    /// Subscribes to the coordinator's SDK and spawns the loop.
    ///
    /// Subscriptions are taken before this returns, so no SDK event emitted afterwards is missed.
    pub fn spawn(
        coordinator: Coordinator,
        outcomes: mpsc::UnboundedReceiver<Outcome>,
    ) -> CoordinatorHandle {
        let (actions_tx, actions) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown) = oneshot::channel();
        let snapshots = coordinator.subscribe();

        let sdk = coordinator.sdk().clone();
        let service = Self {
            account: Some(sdk.subscribe_account()),
            network: Some(sdk.subscribe_network()),
            modal: sdk.subscribe_state(),
            coordinator,
            outcomes,
            actions,
            shutdown,
        };
        let task = tokio::spawn(service.run());

        CoordinatorHandle { actions: actions_tx, snapshots, shutdown: Some(shutdown_tx), task }
    }

    async fn run(mut self) {
        self.coordinator.initialize().await;
        info!(target: TARGET, coordinator = ?self.coordinator, "coordinator started");

        loop {
            let deadline = self.coordinator.next_deadline();
            tokio::select! {
                biased;

                _ = &mut self.shutdown => break,

                Some(action) = self.actions.recv() => {
                    debug!(target: TARGET, ?action, "user action");
                    self.coordinator.on_action(action);
                }

                Some(outcome) = self.outcomes.recv() => self.coordinator.on_outcome(outcome),

                event = recv(&mut self.account) => match event {
                    Ok(event) => self.coordinator.on_account_event(event),
                    Err(err) => closed_or_lagged(&mut self.account, err, "account"),
                },

                event = recv(&mut self.network) => match event {
                    Ok(event) => self.coordinator.on_network_event(event),
                    Err(err) => closed_or_lagged(&mut self.network, err, "network"),
                },

                event = recv(&mut self.modal) => match event {
                    Ok(event) => self.coordinator.on_modal_event(event),
                    Err(err) => closed_or_lagged(&mut self.modal, err, "modal"),
                },

                _ = sleep_until_opt(deadline) => self.coordinator.on_tick(Instant::now()),
            }
        }

        info!(target: TARGET, "coordinator stopped");
    }
}

async fn recv<T: Clone>(rx: &mut Option<broadcast::Receiver<T>>) -> Result<T, RecvError> {
    match rx {
        Some(rx) => rx.recv().await,
        None => future::pending().await,
    }
}

fn closed_or_lagged<T>(rx: &mut Option<broadcast::Receiver<T>>, err: RecvError, stream: &str) {
    match err {
        RecvError::Lagged(skipped) => {
            warn!(target: TARGET, stream, skipped, "coordinator fell behind on SDK events");
        }
        RecvError::Closed => {
            debug!(target: TARGET, stream, "SDK event stream closed");
            *rx = None;
        }
    }
}

async fn sleep_until_opt(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => future::pending().await,
    }
}

/// Handle to a running [`CoordinatorService`].
#[derive(Debug)]
pub struct CoordinatorHandle {
    actions: mpsc::UnboundedSender<UserAction>,
    snapshots: watch::Receiver<CoordinatorSnapshot>,
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl CoordinatorHandle {
    /// Queues a user action. Returns `false` if the service has stopped.
    pub fn send(&self, action: UserAction) -> bool {
        self.actions.send(action).is_ok()
    }

    pub fn actions(&self) -> mpsc::UnboundedSender<UserAction> {
        self.actions.clone()
    }

    pub fn snapshots(&self) -> watch::Receiver<CoordinatorSnapshot> {
        self.snapshots.clone()
    }

    /// Stops the loop and waits for it to finish. Dropping the coordinator aborts its balance
    /// refresh.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Err(err) = (&mut self.task).await {
            error!(target: TARGET, %err, "coordinator task failed");
        }
    }
}

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use parking_lot::Mutex;
use tokio::sync::{mpsc, watch};
use uuid::Uuid;

use crate::{
    coordinator::{CoordinatorSnapshot, UserAction},
    sdk::SdkEvents,
    wallet_browser::{
        queue::RequestQueue,
        types::{BridgeCommand, CommandResponse, PageConfig},
    },
};

/// The coordinator the page talks to through `/api/state` and `/api/action`.
#[derive(Debug, Clone)]
struct Attached {
    actions: mpsc::UnboundedSender<UserAction>,
    snapshots: watch::Receiver<CoordinatorSnapshot>,
}

#[derive(Debug, Clone)]
pub(crate) struct BrowserWalletState {
    /// Required in the `X-Session-Token` header of every `/api` request.
    session_token: Arc<String>,
    page: Arc<PageConfig>,
    /// Wallet events reported by the page.
    events: SdkEvents,
    /// SDK commands waiting for the page.
    commands: Arc<Mutex<RequestQueue<BridgeCommand, CommandResponse>>>,
    coordinator: Arc<Mutex<Option<Attached>>>,
    listening: Arc<AtomicBool>,
}

impl BrowserWalletState {
    pub fn new(page: PageConfig) -> Self {
        Self {
            session_token: Arc::new(Uuid::new_v4().to_string()),
            page: Arc::new(page),
            events: SdkEvents::default(),
            commands: Arc::new(Mutex::new(RequestQueue::new())),
            coordinator: Arc::new(Mutex::new(None)),
            listening: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn session_token(&self) -> Arc<String> {
        self.session_token.clone()
    }

    pub fn page(&self) -> &PageConfig {
        &self.page
    }

    pub fn events(&self) -> &SdkEvents {
        &self.events
    }

    pub fn is_listening(&self) -> bool {
        self.listening.load(Ordering::SeqCst)
    }

    pub fn set_listening(&self, listening: bool) {
        self.listening.store(listening, Ordering::SeqCst);
    }

    pub fn attach(
        &self,
        actions: mpsc::UnboundedSender<UserAction>,
        snapshots: watch::Receiver<CoordinatorSnapshot>,
    ) {
        *self.coordinator.lock() = Some(Attached { actions, snapshots });
    }

    /// Latest coordinator snapshot, the idle default when nothing is attached.
    pub fn snapshot(&self) -> CoordinatorSnapshot {
        self.coordinator
            .lock()
            .as_ref()
            .map(|attached| attached.snapshots.borrow().clone())
            .unwrap_or_default()
    }

    /// Forwards `action` to the coordinator. Returns `false` if none is attached or it stopped.
    pub fn send_action(&self, action: UserAction) -> bool {
        self.coordinator.lock().as_ref().is_some_and(|attached| attached.actions.send(action).is_ok())
    }

    pub fn add_command(&self, command: BridgeCommand) {
        self.commands.lock().add_request(command);
    }

    pub fn has_command(&self, id: &Uuid) -> bool {
        self.commands.lock().has_request(id)
    }

    pub fn read_next_command(&self) -> Option<BridgeCommand> {
        self.commands.lock().read_request().cloned()
    }

    pub fn remove_command(&self, id: &Uuid) {
        self.commands.lock().remove_request(id);
    }

    /// Stores the page's answer and retires the command.
    pub fn add_command_response(&self, response: CommandResponse) {
        let id = response.id;
        let mut commands = self.commands.lock();
        commands.add_response(id, response);
        commands.remove_request(&id);
    }

    /// Takes the response to `id`, if the page answered.
    pub fn take_command_response(&self, id: &Uuid) -> Option<CommandResponse> {
        self.commands.lock().get_response(id)
    }

    pub fn pending_commands(&self) -> usize {
        self.commands.lock().len()
    }
}

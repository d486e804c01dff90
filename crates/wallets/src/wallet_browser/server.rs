use std::{net::SocketAddr, sync::Arc, time::Duration};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::{
    net::TcpListener,
    sync::{broadcast, mpsc, oneshot, watch},
    time::Instant,
};
use uuid::Uuid;

use crate::{
    coordinator::{CoordinatorSnapshot, UserAction},
    error::SdkError,
    sdk::{AccountEvent, ModalEvent, NetworkEvent, OpenOptions, WalletSdk},
    wallet_browser::{
        error::BrowserWalletError,
        router::build_router,
        state::BrowserWalletState,
        types::{BridgeCommand, CommandKind, PageConfig},
    },
};

const TARGET: &str = "trontrust::bridge";

/// How often a pending command checks for the page's answer.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Local HTTP bridge to a wallet running in the user's browser.
///
/// Serves the connect page, relays `open`/`disconnect` to it as queued commands and turns the
/// wallet events it reports into [`WalletSdk`] subscriptions.
#[derive(Debug, Clone)]
pub struct BrowserWalletServer {
    port: u16,
    open_browser: bool,
    timeout: Duration,
    state: Arc<BrowserWalletState>,
    shutdown_tx: Arc<Mutex<Option<oneshot::Sender<()>>>>,
}

impl BrowserWalletServer {
    /// Create a new browser wallet server. Port `0` binds an ephemeral port on start.
    pub fn new(port: u16, open_browser: bool, timeout: Duration, page: PageConfig) -> Self {
        Self {
            port,
            open_browser,
            timeout,
            state: Arc::new(BrowserWalletState::new(page)),
            shutdown_tx: Arc::new(Mutex::new(None)),
        }
    }

    /// The bound port once started.
    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn open_browser(&self) -> bool {
        self.open_browser
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    /// The token the page must send in `X-Session-Token`.
    pub fn session_token(&self) -> String {
        self.state.session_token().to_string()
    }

    pub fn is_running(&self) -> bool {
        self.state.is_listening()
    }

    /// Number of commands the page has not answered yet.
    pub fn pending_commands(&self) -> usize {
        self.state.pending_commands()
    }

    /// Binds `127.0.0.1` and starts serving. Opens the page in the default browser if enabled.
    pub async fn start(&mut self) -> Result<(), BrowserWalletError> {
        if self.is_running() {
            return Err(BrowserWalletError::AlreadyRunning(self.port));
        }

        let addr = SocketAddr::from(([127, 0, 0, 1], self.port));
        let bind_err = |source| BrowserWalletError::Bind { port: addr.port(), source };
        let listener = TcpListener::bind(addr).await.map_err(bind_err)?;
        self.port = listener.local_addr().map_err(bind_err)?.port();

        let router = build_router(self.state.clone());
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        *self.shutdown_tx.lock() = Some(shutdown_tx);

        let state = self.state.clone();
        state.set_listening(true);
        tokio::spawn(async move {
            let server = axum::serve(listener, router).with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            });
            if let Err(err) = server.await {
                error!(target: TARGET, %err, "browser bridge stopped with error");
            }
            state.set_listening(false);
        });

        let url = self.url();
        info!(target: TARGET, %url, "browser bridge listening");
        if self.open_browser
            && let Err(err) = open::that(&url)
        {
            warn!(target: TARGET, %err, %url, "could not open browser, open the url manually");
        }
        Ok(())
    }

    /// Stops serving. Pending commands time out.
    pub async fn stop(&self) -> Result<(), BrowserWalletError> {
        let tx = self.shutdown_tx.lock().take().ok_or(BrowserWalletError::NotRunning)?;
        let _ = tx.send(());
        self.state.set_listening(false);
        info!(target: TARGET, "browser bridge stopped");
        Ok(())
    }

    /// Connects the page's `/api/state` and `/api/action` routes to a running coordinator.
    pub fn attach(
        &self,
        actions: mpsc::UnboundedSender<UserAction>,
        snapshots: watch::Receiver<CoordinatorSnapshot>,
    ) {
        self.state.attach(actions, snapshots);
    }

    /// Queues `kind` for the page and waits for its answer.
    async fn request(&self, kind: CommandKind) -> Result<(), SdkError> {
        let operation = kind.operation();
        if !self.is_running() {
            return Err(SdkError::NotInitialized("browser bridge is not running".to_string()));
        }

        let id = Uuid::new_v4();
        debug!(target: TARGET, %id, operation, "queueing command for the page");
        self.state.add_command(BridgeCommand { id, kind });

        let deadline = Instant::now() + self.timeout;
        loop {
            if let Some(response) = self.state.take_command_response(&id) {
                return match response.error {
                    None => Ok(()),
                    Some(reason) => Err(SdkError::Rejected { operation, reason }),
                };
            }
            if Instant::now() >= deadline {
                self.state.remove_command(&id);
                return Err(SdkError::Timeout { operation, timeout: self.timeout });
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }
}

#[async_trait]
impl WalletSdk for BrowserWalletServer {
    fn name(&self) -> &str {
        "browser"
    }

    async fn init(&self) -> Result<(), SdkError> {
        if self.is_running() {
            Ok(())
        } else {
            Err(SdkError::NotInitialized("browser bridge is not running".to_string()))
        }
    }

    async fn open(&self, options: OpenOptions) -> Result<(), SdkError> {
        self.request(CommandKind::Open { options }).await
    }

    async fn disconnect(&self) -> Result<(), SdkError> {
        self.request(CommandKind::Disconnect).await
    }

    fn subscribe_account(&self) -> broadcast::Receiver<AccountEvent> {
        self.state.events().subscribe_account()
    }

    fn subscribe_network(&self) -> broadcast::Receiver<NetworkEvent> {
        self.state.events().subscribe_network()
    }

    fn subscribe_state(&self) -> Option<broadcast::Receiver<ModalEvent>> {
        Some(self.state.events().subscribe_modal())
    }
}

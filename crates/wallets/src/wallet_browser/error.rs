#[derive(Debug, thiserror::Error)]
pub enum BrowserWalletError {
    #[error("failed to bind browser bridge to port {port}: {source}")]
    Bind {
        port: u16,
        #[source]
        source: std::io::Error,
    },
    #[error("browser bridge is already running on port {0}")]
    AlreadyRunning(u16),
    #[error("browser bridge is not running")]
    NotRunning,
}

use eyre::Result;
use tracing_subscriber::{EnvFilter, fmt};

/// Common setup for all CLI tools. Does not include [tracing subscriber](subscriber).
pub fn common_setup() {
    crate::handler::install();
}

/// Initializes a tracing subscriber for logging.
///
/// `RUST_LOG` takes precedence over `default_directive`.
pub fn subscriber(default_directive: &str, ansi: bool) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(default_directive))?;
    fmt()
        .with_env_filter(filter)
        .with_ansi(ansi)
        .with_target(true)
        .try_init()
        .map_err(|err| eyre::eyre!("failed to install log subscriber: {err}"))
}

/// Builds the multi-threaded runtime the long-running commands execute on.
pub fn tokio_runtime() -> Result<tokio::runtime::Runtime> {
    Ok(tokio::runtime::Builder::new_multi_thread().enable_all().build()?)
}

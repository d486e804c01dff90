use clap::Parser;
use eyre::{Context, Result};
use serde::Serialize;
use std::{path::PathBuf, sync::Arc};
use tokio::sync::watch;
use trontrust_config::{
    ChainVariant, Config,
    figment::{
        self, Metadata, Profile, Provider,
        error::Kind::InvalidType,
        value::{Dict, Map, Value},
    },
};
use trontrust_wallets::{
    BrowserWalletServer, ChainPolicy, Coordinator, CoordinatorService, CoordinatorSettings,
    CoordinatorSnapshot, HttpWalletApi, balance,
    coordinator::{ApiStatus, ConnectionStatus},
    wallet_browser::types::PageConfig,
};
use url::Url;
use yansi::Paint;

/// CLI arguments for `trontrust serve`.
///
/// Every option set here overrides the value from `trontrust.toml` and the environment.
#[derive(Clone, Debug, Default, Parser, Serialize)]
pub struct ServeArgs {
    /// Path to the config file. Defaults to `trontrust.toml` in the working directory.
    #[arg(long, short, value_name = "PATH")]
    #[serde(skip)]
    pub config: Option<PathBuf>,

    /// The product variant, deciding which chains are accepted.
    #[arg(long, value_name = "VARIANT")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variant: Option<ChainVariant>,

    /// Restrict the variant to these chain ids.
    #[arg(long = "chain", value_name = "CHAIN_ID", value_delimiter = ',')]
    #[serde(rename = "allowed_chains", skip_serializing_if = "Option::is_none")]
    pub chains: Option<Vec<u64>>,

    /// Port of the local bridge serving the connect page. `0` picks a free port.
    #[arg(long, short, value_name = "PORT")]
    #[serde(rename = "bridge_port", skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    /// Base URL of the backend API.
    #[arg(long, value_name = "URL")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_base_url: Option<Url>,

    /// Refresh the connected wallet's balance every N seconds.
    #[arg(long, value_name = "SECS")]
    #[serde(rename = "balance_refresh_secs", skip_serializing_if = "Option::is_none")]
    pub balance_refresh: Option<u64>,

    /// Node used for balance queries.
    #[arg(long, value_name = "URL")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub balance_endpoint: Option<Url>,

    /// Do not open the connect page in the default browser.
    #[arg(long)]
    #[serde(skip)]
    pub no_browser: bool,
}

impl ServeArgs {
    /// Loads the config, with these arguments merged on top.
    pub fn load_config(&self) -> Result<Config> {
        let figment = match &self.config {
            Some(path) => Config::figment_with_file(path),
            None => Config::figment(),
        };
        Ok(Config::try_from(figment.merge(self))?)
    }

    pub async fn run(self) -> Result<()> {
        let config = self.load_config()?;
        let policy = ChainPolicy::from_config(&config)?;
        debug!(?config, "loaded config");

        let mut server = BrowserWalletServer::new(
            config.bridge_port,
            config.open_browser,
            config.sdk_timeout(),
            PageConfig::new(&config, &policy),
        );
        server.start().await?;

        let api = Arc::new(HttpWalletApi::new(&config)?);
        let balances = balance::from_config(&config)?;
        let (coordinator, outcomes) = Coordinator::new(
            CoordinatorSettings::from_config(&config),
            policy,
            Arc::new(server.clone()),
            api,
        );
        let handle =
            CoordinatorService::spawn(coordinator.with_balance_source(balances), outcomes);
        server.attach(handle.actions(), handle.snapshots());

        println!(
            "\n{} {}\n{}\n",
            "Connect page:".bold(),
            server.url().cyan(),
            format!("Backend: {}", config.api_base_url).dim()
        );

        report_until_ctrl_c(handle.snapshots()).await;

        info!("shutting down");
        handle.shutdown().await;
        server.stop().await.wrap_err("failed to stop the browser bridge")?;
        Ok(())
    }
}

/// Prints a line for every status or backend change until Ctrl-C.
async fn report_until_ctrl_c(mut snapshots: watch::Receiver<CoordinatorSnapshot>) {
    let mut last = snapshots.borrow_and_update().clone();
    loop {
        tokio::select! {
            res = tokio::signal::ctrl_c() => {
                if let Err(err) = res {
                    warn!(%err, "failed to listen for ctrl-c");
                }
                break;
            }
            changed = snapshots.changed() => {
                if changed.is_err() {
                    warn!("coordinator stopped unexpectedly");
                    break;
                }
                let snapshot = snapshots.borrow_and_update().clone();
                if let Some(line) = describe_change(&last, &snapshot) {
                    println!("{line}");
                }
                last = snapshot;
            }
        }
    }
}

/// A human readable line for what changed between two snapshots, if worth reporting.
fn describe_change(prev: &CoordinatorSnapshot, next: &CoordinatorSnapshot) -> Option<String> {
    if prev.status != next.status || prev.session != next.session {
        return Some(match (next.status, &next.session, &next.error) {
            (ConnectionStatus::Connected, Some(session), _) => format!(
                "{} {} on {} ({})",
                "connected".green().bold(),
                session.address(),
                session.network(),
                session.wallet_type()
            ),
            (ConnectionStatus::Error, _, Some(error)) => {
                format!("{} {error}", "error".red().bold())
            }
            (status, ..) => status.to_string(),
        });
    }
    if prev.api_status != next.api_status
        && let ApiStatus::Failed { operation, message } = &next.api_status
    {
        return Some(format!("{} {operation}: {message}", "backend sync failed".yellow()));
    }
    if prev.balance != next.balance
        && let Some(balance) = &next.balance
    {
        return Some(format!("balance {balance}"));
    }
    None
}

// Make these args a `figment::Provider` so that they can be merged into the `Config`
impl Provider for ServeArgs {
    fn metadata(&self) -> Metadata {
        Metadata::named("Serve Args Provider")
    }

    fn data(&self) -> Result<Map<Profile, Dict>, figment::Error> {
        let value = Value::serialize(self)?;
        let error = InvalidType(value.to_actual(), "map".into());
        let mut dict = value.into_dict().ok_or(error)?;

        if self.no_browser {
            dict.insert("open_browser".to_string(), false.into());
        }

        Ok(Map::from([(Config::selected_profile(), dict)]))
    }
}

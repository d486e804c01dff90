//! # trontrust-config
//!
//! Layered configuration for the wallet connect service.
//!
//! Values are resolved, in ascending priority, from the built-in defaults, the `trontrust.toml`
//! file (one table per profile, `[default]` unless `TRONTRUST_PROFILE` selects another) and
//! `TRONTRUST_`-prefixed environment variables.

#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![cfg_attr(docsrs, feature(doc_cfg))]

#[macro_use]
extern crate tracing;

use figment::{
    Figment, Metadata, Profile, Provider,
    providers::{Env, Format, Serialized, Toml},
    value::{Dict, Map},
};
use serde::{Deserialize, Serialize};
use std::{
    path::{Path, PathBuf},
    time::Duration,
};
use url::Url;

pub mod error;
pub use error::{ConfigError, ExtractConfigError, UnknownVariant};

mod variant;
pub use variant::ChainVariant;

// reexport so cli types can implement `figment::Provider` to merge command line overrides
pub use figment;

/// Wallet connect service configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// The selected profile. **(default: _default_ `default`)**
    ///
    /// **Note:** This field is never serialized nor deserialized. When a `Config` is merged into
    /// a `Figment` as a `Provider`, this profile is selected on the `Figment`. When a `Config` is
    /// extracted, this field is set to the profile selected on the `Figment`.
    #[serde(skip)]
    pub profile: Profile,
    /// Which chain family the page accepts.
    pub variant: ChainVariant,
    /// Restricts the variant's chain table to these ids. `None` allows the whole table.
    pub allowed_chains: Option<Vec<u64>>,
    /// Base URL of the backend API; `connect-wallet` and `disconnect-wallet` are appended.
    pub api_base_url: Url,
    /// Timeout for a single backend request, in seconds.
    pub api_timeout_secs: u64,
    /// Relay project id handed to the page's wallet connector, if it needs one.
    pub project_id: Option<String>,
    /// Name shown by the wallet when it asks the user to approve the connection.
    pub app_name: String,
    pub app_description: String,
    pub app_url: Option<Url>,
    pub app_icons: Vec<String>,
    /// Port of the local browser bridge. `0` picks an ephemeral port.
    pub bridge_port: u16,
    /// Whether to open the connect page in the default browser on start.
    pub open_browser: bool,
    /// How long to wait for the page to acknowledge an SDK command, in seconds.
    pub sdk_timeout_secs: u64,
    /// Grace period after the wallet modal closes before a pending connect is abandoned.
    pub modal_grace_ms: u64,
    /// Lifetime of a transient notice, in milliseconds.
    pub notice_timeout_ms: u64,
    /// Balance refresh period while connected. Disabled when unset.
    pub balance_refresh_secs: Option<u64>,
    /// Node endpoint used for balance queries (TronGrid HTTP API or EVM JSON-RPC).
    pub balance_endpoint: Option<Url>,
}

impl Config {
    /// The default profile: "default"
    pub const DEFAULT_PROFILE: Profile = Profile::Default;

    /// File name of config toml file
    pub const FILE_NAME: &'static str = "trontrust.toml";

    /// Environment variable prefix for all settings.
    pub const ENV_PREFIX: &'static str = "TRONTRUST_";

    /// Default backend, matching the companion API's development server.
    pub const DEFAULT_API_BASE_URL: &'static str = "http://localhost:5000/api";

    /// Default port of the local browser bridge.
    pub const DEFAULT_BRIDGE_PORT: u16 = 9545;

    /// Returns the current `Config`.
    ///
    /// See [`figment`](Self::figment) for more details.
    #[track_caller]
    pub fn load() -> Self {
        Self::from_provider(Self::figment())
    }

    /// Returns the current `Config`, looking up `trontrust.toml` in `root`.
    #[track_caller]
    pub fn load_with_root(root: impl AsRef<Path>) -> Self {
        Self::from_provider(Self::figment_with_root(root.as_ref()))
    }

    /// Extract a `Config` from `provider`, panicking if extraction fails.
    ///
    /// # Panics
    ///
    /// If extraction fails, prints an error message indicating the failure and panics. For a
    /// version that doesn't panic, use [`Config::try_from()`].
    #[track_caller]
    pub fn from_provider<T: Provider>(provider: T) -> Self {
        trace!("load config with provider: {:?}", provider.metadata());
        Self::try_from(provider).unwrap_or_else(|err| panic!("{}", err))
    }

    /// Attempts to extract a `Config` from `provider`, returning the result.
    ///
    /// # Example
    ///
    /// ```rust
    /// use figment::providers::{Format, Toml};
    /// use trontrust_config::Config;
    ///
    /// // Use the default `Figment`, but allow values from `other.toml`
    /// // to supersede its values.
    /// let figment = Config::figment().merge(Toml::file("other.toml").nested());
    ///
    /// let config = Config::try_from(figment);
    /// ```
    pub fn try_from<T: Provider>(provider: T) -> Result<Self, ExtractConfigError> {
        let figment = Figment::from(provider);
        let mut config = figment.extract::<Self>().map_err(ExtractConfigError::new)?;
        config.profile = figment.profile().clone();
        Ok(config)
    }

    /// Returns the default figment.
    ///
    /// The default figment reads from the following sources, in ascending priority order:
    ///
    ///   1. [`Config::default()`] (see [defaults](#defaults))
    ///   2. `trontrust.toml` _or_ filename in `TRONTRUST_CONFIG` environment variable
    ///   3. `TRONTRUST_` prefixed environment variables
    ///
    /// The profile selected is the value set in the `TRONTRUST_PROFILE` environment variable. If
    /// it is not set, it defaults to `default`.
    pub fn figment() -> Figment {
        Self::figment_with_root(Path::new("."))
    }

    /// Returns the default figment, looking up the toml file relative to `root`.
    pub fn figment_with_root(root: impl AsRef<Path>) -> Figment {
        let toml = std::env::var_os("TRONTRUST_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|| root.as_ref().join(Self::FILE_NAME));
        Self::figment_with_file(toml)
    }

    /// Returns the default figment, reading settings from the toml file at `path`.
    ///
    /// A missing file is not an error; only defaults and environment variables apply then.
    pub fn figment_with_file(path: impl AsRef<Path>) -> Figment {
        Figment::from(Self::default())
            .merge(Toml::file(path.as_ref()).nested())
            .merge(Env::prefixed(Self::ENV_PREFIX).ignore(&["PROFILE", "CONFIG"]).global())
            .select(Self::selected_profile())
    }

    /// Returns the selected profile.
    ///
    /// If the `TRONTRUST_PROFILE` env variable is not set, this returns the `DEFAULT_PROFILE`.
    pub fn selected_profile() -> Profile {
        Profile::from_env_or("TRONTRUST_PROFILE", Self::DEFAULT_PROFILE)
    }

    /// Timeout applied to every backend request.
    pub fn api_timeout(&self) -> Duration {
        Duration::from_secs(self.api_timeout_secs)
    }

    /// How long an SDK command may stay unacknowledged by the page.
    pub fn sdk_timeout(&self) -> Duration {
        Duration::from_secs(self.sdk_timeout_secs)
    }

    pub fn modal_grace_period(&self) -> Duration {
        Duration::from_millis(self.modal_grace_ms)
    }

    pub fn notice_timeout(&self) -> Duration {
        Duration::from_millis(self.notice_timeout_ms)
    }

    /// The balance refresh period, `None` when refreshing is disabled.
    ///
    /// A period of zero seconds is treated as disabled.
    pub fn balance_refresh_interval(&self) -> Option<Duration> {
        self.balance_refresh_secs.filter(|secs| *secs > 0).map(Duration::from_secs)
    }

    /// Returns the endpoint URL for the given backend route, e.g. `connect-wallet`.
    pub fn api_endpoint(&self, route: &str) -> String {
        format!("{}/{}", self.api_base_url.as_str().trim_end_matches('/'), route)
    }
}

impl Provider for Config {
    fn metadata(&self) -> Metadata {
        Metadata::named("TronTrust Config")
    }

    #[track_caller]
    fn data(&self) -> Result<Map<Profile, Dict>, figment::Error> {
        Serialized::defaults(self).data()
    }

    fn profile(&self) -> Option<Profile> {
        Some(self.profile.clone())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            profile: Self::DEFAULT_PROFILE,
            variant: ChainVariant::default(),
            allowed_chains: None,
            api_base_url: Url::parse(Self::DEFAULT_API_BASE_URL)
                .expect("default api url is valid"),
            api_timeout_secs: 10,
            project_id: None,
            app_name: "TronTrust".to_string(),
            app_description: "Wallet security verification".to_string(),
            app_url: None,
            app_icons: Vec::new(),
            bridge_port: Self::DEFAULT_BRIDGE_PORT,
            open_browser: true,
            sdk_timeout_secs: 30,
            modal_grace_ms: 1_500,
            notice_timeout_ms: 5_000,
            balance_refresh_secs: None,
            balance_endpoint: None,
        }
    }
}

//! # trontrust-wallets
//!
//! Wallet connection coordination for the TronTrust connect page.
//!
//! The [`Coordinator`] is a small state machine that sits between a [`WalletSdk`] (the thing that
//! actually talks to the user's wallet) and a [`WalletApi`] (the backend that records connected
//! addresses). It enforces the product variant's [`ChainPolicy`] and keeps backend failures from
//! ever disturbing the wallet connection itself.

#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![cfg_attr(docsrs, feature(doc_cfg))]

#[macro_use]
extern crate tracing;

pub mod address;
pub mod api;
pub mod balance;
pub mod chains;
pub mod coordinator;
pub mod error;
pub mod sdk;
pub mod session;

mod serde_helpers;

#[cfg(feature = "browser")]
pub mod wallet_browser;

pub use api::{HttpWalletApi, WalletApi};
pub use chains::{ChainDescriptor, ChainFamily, ChainPolicy};
pub use coordinator::{
    ConnectionState, Coordinator, CoordinatorHandle, CoordinatorService, CoordinatorSettings,
    CoordinatorSnapshot, UserAction,
};
pub use error::{AddressError, ApiError, BalanceError, PolicyViolation, SdkError};
pub use sdk::{AccountEvent, ModalEvent, NetworkEvent, OpenOptions, WalletSdk};
pub use session::WalletSession;

#[cfg(feature = "browser")]
pub use wallet_browser::server::BrowserWalletServer;

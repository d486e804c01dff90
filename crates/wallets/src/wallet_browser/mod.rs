//! Browser wallet strategy: a local HTTP bridge between the coordinator and a wallet extension
//! running in the user's browser.

pub mod error;
pub mod server;
pub mod types;

mod app;
mod handlers;
mod queue;
mod router;
mod state;

pub use router::SESSION_TOKEN_HEADER;

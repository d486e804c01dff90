use crate::chains::ChainDescriptor;
use serde::Serialize;
use std::{
    fmt,
    time::{SystemTime, UNIX_EPOCH},
};

/// Locally generated session correlator, a millisecond timestamp.
///
/// Only used to tell sessions apart in logs and on the page, never as a credential.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct SessionId(u64);

impl SessionId {
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Hands out strictly increasing [`SessionId`]s.
#[derive(Debug, Default)]
pub struct SessionIds {
    last: u64,
}

impl SessionIds {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current unix time in milliseconds, bumped past the previous id if the clock
    /// has not advanced or went backwards.
    pub fn next(&mut self) -> SessionId {
        self.last = unix_millis().max(self.last + 1);
        SessionId(self.last)
    }
}

/// Informational data recorded with a session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionMetadata {
    pub user_agent: Option<String>,
    /// Creation time, unix milliseconds.
    pub timestamp: u64,
}

/// The currently connected wallet.
///
/// `network` is private and only ever set from the chain descriptor together with `chain_id`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletSession {
    address: String,
    chain_id: u64,
    network: &'static str,
    wallet_type: String,
    session_id: SessionId,
    metadata: SessionMetadata,
}

impl WalletSession {
    pub fn new(
        address: impl Into<String>,
        chain: &ChainDescriptor,
        wallet_type: impl Into<String>,
        session_id: SessionId,
        user_agent: Option<String>,
    ) -> Self {
        Self {
            address: address.into(),
            chain_id: chain.id,
            network: chain.label,
            wallet_type: wallet_type.into(),
            session_id,
            metadata: SessionMetadata { user_agent, timestamp: unix_millis() },
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub fn network(&self) -> &'static str {
        self.network
    }

    pub fn wallet_type(&self) -> &str {
        &self.wallet_type
    }

    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    pub fn metadata(&self) -> &SessionMetadata {
        &self.metadata
    }

    /// Moves the session to another chain, keeping its id.
    pub fn switch_chain(&mut self, chain: &ChainDescriptor) {
        self.chain_id = chain.id;
        self.network = chain.label;
    }
}

pub(crate) fn unix_millis() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map_or(0, |elapsed| elapsed.as_millis() as u64)
}

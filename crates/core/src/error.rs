//! Error of chord_core

use std::net::SocketAddr;

/// A wrap `Result` contains custom errors.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors collections in chord-core.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error("Invalid hexadecimal identifier: {0}")]
    BadHexIdentifier(String),

    #[error("Identifier must be {expected} hex characters, got {got}")]
    BadIdentifierLength { expected: usize, got: usize },

    #[error("IOError: {0}")]
    IOError(#[from] std::io::Error),

    #[error("Failed on lock dht state")]
    DHTSyncLockError,

    #[error("Failed on read successors")]
    FailedToReadSuccessors,

    #[error("Failed on write successors")]
    FailedToWriteSuccessors,

    #[error("Unexpected PeerRingAction, {0:?}")]
    PeerRingUnexpectedAction(crate::dht::PeerRingAction),

    #[error("Peer {addr} is unreachable: {reason}")]
    PeerUnreachable { addr: SocketAddr, reason: String },

    #[error("Peer {addr} rejected the call: {reason}")]
    RemoteRejected { addr: SocketAddr, reason: String },

    #[error("Successor list length mismatch, local r = {local}, remote r = {remote}")]
    SuccessorCapacityMismatch { local: u8, remote: u8 },

    #[error("Successor list length {0} is out of range")]
    InvalidSuccessorCapacity(u8),

    #[error("Lookup of {0} did not converge")]
    LookupNotFound(crate::dht::Did),

    #[error("Join ring via {0} failed, no successor found")]
    JoinFailed(SocketAddr),

    #[error("Invalid file name: {0:?}")]
    InvalidFileName(String),
}

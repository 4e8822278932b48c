//! The seam between the ring logic and the wire.
use std::net::SocketAddr;

use async_trait::async_trait;
use serde::Deserialize;
use serde::Serialize;

use crate::dht::Did;
use crate::dht::NodeIp;
use crate::error::Result;

/// Answer of one routing step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hop {
    /// The callee knows the owner.
    Found(NodeIp),
    /// The callee does not, ask this node next.
    Next(NodeIp),
}

impl Hop {
    /// Build from the `(found, node)` pair carried on the wire.
    pub fn new(found: bool, node: NodeIp) -> Self {
        if found {
            Self::Found(node)
        } else {
            Self::Next(node)
        }
    }

    /// Node carried by either variant.
    pub fn node(&self) -> NodeIp {
        match self {
            Self::Found(n) | Self::Next(n) => *n,
        }
    }

    /// Whether the owner was found.
    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }
}

/// Successor list of a remote node together with its configured length `r`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuccessorList {
    /// Entries, immediate successor first.
    pub nodes: Vec<NodeIp>,
    /// Configured `r` of the callee.
    pub capacity: u8,
}

/// Outbound calls a node makes to its peers.
///
/// Every method fails with [Error::PeerUnreachable](crate::error::Error::PeerUnreachable)
/// when the peer cannot be reached, after the implementation has retried on its own.
/// Callers treat that as "this peer may be dead".
#[async_trait]
pub trait ChordTransport: Send + Sync {
    /// Full lookup of `did` run by the peer at `addr`.
    async fn find(&self, addr: SocketAddr, did: Did) -> Result<Option<NodeIp>>;

    /// One routing step of `did` at the peer.
    async fn find_successor(&self, addr: SocketAddr, did: Did) -> Result<Hop>;

    /// Predecessor known by the peer.
    async fn find_predecessor(&self, addr: SocketAddr) -> Result<Option<NodeIp>>;

    /// Successor list of the peer.
    async fn find_all_successors(&self, addr: SocketAddr) -> Result<SuccessorList>;

    /// Tell the peer that `node` may be its predecessor.
    async fn notify(&self, addr: SocketAddr, node: NodeIp) -> Result<()>;

    /// Ship a file to the peer.
    async fn store_file(&self, addr: SocketAddr, name: &str, data: Vec<u8>) -> Result<()>;

    /// Liveness probe.
    async fn ping(&self, addr: SocketAddr) -> Result<()>;
}

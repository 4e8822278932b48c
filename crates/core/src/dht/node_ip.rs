//! Directory entry of a ring member.
use std::net::SocketAddr;

use serde::Deserialize;
use serde::Serialize;

use super::did::BiasId;
use super::Did;

/// NodeIp pairs an identifier with the address the node is reachable at.
/// It is immutable once built and ordered on the ring by `did` only, see [NodeIp::bias].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeIp {
    /// Identifier of the node.
    #[serde(rename = "ID")]
    pub did: Did,
    /// Listening address of the node.
    #[serde(rename = "Address")]
    pub address: SocketAddr,
}

impl NodeIp {
    /// Build an entry with an explicit identifier.
    pub fn new(did: Did, address: SocketAddr) -> Self {
        Self { did, address }
    }

    /// Build an entry whose identifier is the hash of its address.
    pub fn from_address(address: SocketAddr) -> Self {
        Self {
            did: Did::from_name(&address.to_string()),
            address,
        }
    }

    /// Clockwise distance of this node observed from `base`.
    pub fn bias(&self, base: Did) -> BiasId {
        BiasId::new(base, self.did)
    }
}

impl std::fmt::Display for NodeIp {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}  {}", self.did, self.address)
    }
}

impl From<NodeIp> for Did {
    fn from(node: NodeIp) -> Did {
        node.did
    }
}

//! Request and reply types of the `Node.RPC*` methods.
//!
//! Field names on the wire are PascalCase (`IDToFind`, `FoundNodeIPs`, ...), file
//! content travels as base64.
use std::str::FromStr;

use chord_core::dht::Did;
use chord_core::dht::NodeIp;
use chord_core::swarm::transport::Hop;
use chord_core::swarm::transport::SuccessorList;
use serde::Deserialize;
use serde::Serialize;

use crate::error::Error;
use crate::error::Result;

/// Params of `Node.RPCFind`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FindRequest {
    /// Identifier as hex.
    #[serde(rename = "IDToFind")]
    pub id_to_find: String,
}

/// Params of `Node.RPCFindSuccessor`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FindSuccessorRequest {
    /// Identifier as hex.
    #[serde(rename = "IDToFind")]
    pub id_to_find: String,
}

/// Params of `Node.RPCFindPredecessor`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FindPredecessorRequest {}

/// Params of `Node.RPCFindAllSuccessors`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FindAllSuccessorsRequest {}

/// Params of `Node.RPCNotify`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotifyRequest {
    /// The predecessor candidate.
    #[serde(rename = "NodeIPNotify")]
    pub node_ip_notify: NodeIp,
}

/// Params of `Node.RPCStoreFile`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreFileRequest {
    /// Bare file name.
    #[serde(rename = "FileName")]
    pub file_name: String,
    /// Content, base64 encoded.
    #[serde(rename = "FileData")]
    pub file_data: String,
}

/// Reply of `Node.RPCFind`, `Node.RPCFindSuccessor` and `Node.RPCFindPredecessor`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FindResponse {
    /// Whether the answer is definitive.
    #[serde(rename = "Found")]
    pub found: bool,
    /// The node found, or the next hop when not found.
    #[serde(rename = "FoundNodeIPs", default)]
    pub found_node_ips: Vec<NodeIp>,
}

/// Reply of `Node.RPCFindAllSuccessors`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FindAllSuccessorsResponse {
    /// Always true.
    #[serde(rename = "Found")]
    pub found: bool,
    /// Successor list of the callee.
    #[serde(rename = "FoundNodeIPs", default)]
    pub found_node_ips: Vec<NodeIp>,
    /// Configured successor list length of the callee.
    #[serde(rename = "Capacity")]
    pub capacity: u8,
}

/// Reply of `Node.RPCNotify`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotifyResponse {}

/// Reply of `Node.RPCStoreFile`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreFileResponse {}

fn parse_did(s: &str) -> Result<Did> {
    Did::from_str(s).map_err(|_| Error::InvalidIdentifier(s.to_string()))
}

impl FindRequest {
    /// Request for `did`.
    pub fn new(did: Did) -> Self {
        Self {
            id_to_find: did.to_string(),
        }
    }

    /// Identifier to look up.
    pub fn did(&self) -> Result<Did> {
        parse_did(&self.id_to_find)
    }
}

impl FindSuccessorRequest {
    /// Request for `did`.
    pub fn new(did: Did) -> Self {
        Self {
            id_to_find: did.to_string(),
        }
    }

    /// Identifier to route.
    pub fn did(&self) -> Result<Did> {
        parse_did(&self.id_to_find)
    }
}

impl StoreFileRequest {
    /// Encode `data` for the wire.
    pub fn new(file_name: &str, data: &[u8]) -> Self {
        Self {
            file_name: file_name.to_string(),
            file_data: base64::encode(data),
        }
    }

    /// Decoded content.
    pub fn data(&self) -> Result<Vec<u8>> {
        Ok(base64::decode(&self.file_data)?)
    }
}

impl From<Option<NodeIp>> for FindResponse {
    fn from(node: Option<NodeIp>) -> Self {
        Self {
            found: node.is_some(),
            found_node_ips: node.into_iter().collect(),
        }
    }
}

impl From<Hop> for FindResponse {
    fn from(hop: Hop) -> Self {
        Self {
            found: hop.is_found(),
            found_node_ips: vec![hop.node()],
        }
    }
}

impl FindResponse {
    /// The node carried by a definitive answer.
    pub fn into_found(self) -> Option<NodeIp> {
        if self.found {
            self.found_node_ips.first().copied()
        } else {
            None
        }
    }

    /// A routing step. Both variants must carry a node.
    pub fn into_hop(self) -> Result<Hop> {
        let node = self.found_node_ips.first().copied().ok_or(Error::EmptyReply)?;
        Ok(Hop::new(self.found, node))
    }
}

impl From<SuccessorList> for FindAllSuccessorsResponse {
    fn from(list: SuccessorList) -> Self {
        Self {
            found: true,
            found_node_ips: list.nodes,
            capacity: list.capacity,
        }
    }
}

impl From<FindAllSuccessorsResponse> for SuccessorList {
    fn from(resp: FindAllSuccessorsResponse) -> Self {
        Self {
            nodes: resp.found_node_ips,
            capacity: resp.capacity,
        }
    }
}

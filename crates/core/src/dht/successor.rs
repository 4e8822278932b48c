//! Successor list for PeerRing
use std::sync::Arc;
use std::sync::RwLock;
use std::sync::RwLockReadGuard;
use std::sync::RwLockWriteGuard;

use crate::dht::did::BiasId;
use crate::dht::Did;
use crate::dht::NodeIp;
use crate::error::Error;
use crate::error::Result;

/// A sequence of successors for a node on the ring.
/// It's necessary to have multiple successors to prevent a single point of failure.
/// The successors are distinct, never include the owner, and are kept in clockwise
/// order from the owner, so the first one is the immediate successor.
/// An empty sequence means the owner is its own successor.
#[derive(Debug, Clone)]
pub struct SuccessorSeq {
    /// The owner.
    node: NodeIp,
    /// Max successor num, `r`.
    max: u8,
    successors: Arc<RwLock<Vec<NodeIp>>>,
}

/// Read access to a successor list.
pub trait SuccessorReader {
    /// No successor other than the owner is known.
    fn is_empty(&self) -> Result<bool>;
    /// The list holds `r` entries.
    fn is_full(&self) -> Result<bool>;
    /// Entry at `index`, if any.
    fn get(&self, index: usize) -> Result<Option<NodeIp>>;
    /// Number of entries.
    fn len(&self) -> Result<usize>;
    /// Immediate successor, the owner itself when the list is empty.
    fn head(&self) -> Result<NodeIp>;
    /// Furthest successor, the owner itself when the list is empty.
    fn last(&self) -> Result<NodeIp>;
    /// Snapshot of the entries.
    fn list(&self) -> Result<Vec<NodeIp>>;
    /// Whether a node is in the list.
    fn contains(&self, did: Did) -> Result<bool>;
}

/// Write access to a successor list.
pub trait SuccessorWriter {
    /// Insert a node at its ring position. Returns the node if it was kept.
    fn update(&self, successor: NodeIp) -> Result<Option<NodeIp>>;
    /// Insert several nodes, returning those that were kept.
    fn extend(&self, succ_list: &[NodeIp]) -> Result<Vec<NodeIp>>;
    /// Rebuild the list as `head` followed by the successor list of `head`, cut where
    /// it reaches the owner again.
    fn refresh(&self, head: NodeIp, remote: &[NodeIp]) -> Result<()>;
    /// Drop a node, shifting the following entries left.
    fn remove(&self, did: Did) -> Result<()>;
}

impl SuccessorSeq {
    /// Create an empty sequence owned by `node` holding at most `max` entries.
    pub fn new(node: NodeIp, max: u8) -> Self {
        Self {
            node,
            max,
            successors: Arc::new(RwLock::new(vec![])),
        }
    }

    /// Configured length `r`.
    pub fn capacity(&self) -> u8 {
        self.max
    }

    fn successors(&self) -> Result<RwLockReadGuard<Vec<NodeIp>>> {
        self.successors
            .read()
            .map_err(|_| Error::FailedToReadSuccessors)
    }

    fn successors_mut(&self) -> Result<RwLockWriteGuard<Vec<NodeIp>>> {
        self.successors
            .write()
            .map_err(|_| Error::FailedToWriteSuccessors)
    }

    /// Calculate bias of the Did on the ring.
    pub fn bias(&self, did: Did) -> BiasId {
        BiasId::new(self.node.did, did)
    }
}

impl SuccessorReader for SuccessorSeq {
    fn contains(&self, did: Did) -> Result<bool> {
        Ok(self.successors()?.iter().any(|n| n.did == did))
    }

    fn is_empty(&self) -> Result<bool> {
        Ok(self.successors()?.is_empty())
    }

    fn is_full(&self) -> Result<bool> {
        Ok(self.successors()?.len() >= self.max as usize)
    }

    fn get(&self, index: usize) -> Result<Option<NodeIp>> {
        Ok(self.successors()?.get(index).copied())
    }

    fn len(&self) -> Result<usize> {
        Ok(self.successors()?.len())
    }

    fn head(&self) -> Result<NodeIp> {
        Ok(self.successors()?.first().copied().unwrap_or(self.node))
    }

    fn last(&self) -> Result<NodeIp> {
        Ok(self.successors()?.last().copied().unwrap_or(self.node))
    }

    fn list(&self) -> Result<Vec<NodeIp>> {
        Ok(self.successors()?.clone())
    }
}

impl SuccessorWriter for SuccessorSeq {
    fn update(&self, successor: NodeIp) -> Result<Option<NodeIp>> {
        if self.contains(successor.did)? || successor.did == self.node.did {
            return Ok(None);
        }

        if self.is_full()? && self.bias(successor.did) >= self.bias(self.last()?.did) {
            return Ok(None);
        }

        let mut succs = self.successors_mut()?;
        succs.push(successor);
        succs.sort_by_key(|n| self.bias(n.did));
        succs.truncate(self.max.into());
        if succs.contains(&successor) {
            Ok(Some(successor))
        } else {
            Ok(None)
        }
    }

    fn extend(&self, succ_list: &[NodeIp]) -> Result<Vec<NodeIp>> {
        let mut ret = vec![];
        for s in succ_list {
            if let Some(r) = self.update(*s)? {
                ret.push(r);
            }
        }
        Ok(ret)
    }

    fn refresh(&self, head: NodeIp, remote: &[NodeIp]) -> Result<()> {
        let mut fresh: Vec<NodeIp> = Vec::with_capacity(self.max.into());
        for n in std::iter::once(&head).chain(remote.iter()) {
            // Entries past the owner wrapped around the ring.
            if fresh.len() >= self.max as usize || n.did == self.node.did {
                break;
            }
            if fresh.iter().any(|f| f.did == n.did) {
                continue;
            }
            fresh.push(*n);
        }
        *self.successors_mut()? = fresh;
        Ok(())
    }

    fn remove(&self, did: Did) -> Result<()> {
        self.successors_mut()?.retain(|v| v.did != did);
        Ok(())
    }
}

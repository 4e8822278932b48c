//! Chord algorithm implement.
#![warn(missing_docs)]
use std::str::FromStr;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

use async_trait::async_trait;
use serde::Deserialize;
use serde::Serialize;

use super::did::BiasId;
use super::successor::SuccessorSeq;
use super::types::Chord;
use super::types::ChordStorage;
use super::FingerTable;
use super::NodeIp;
use crate::consts::ID_BITS;
use crate::consts::MAX_SUCCESSORS;
use crate::consts::MIN_SUCCESSORS;
use crate::dht::Did;
use crate::dht::SuccessorReader;
use crate::dht::SuccessorWriter;
use crate::error::Error;
use crate::error::Result;
use crate::storage::KvStorageInterface;
use crate::storage::MemStorage;

/// `BucketStorage` maps the hex identifier of a key to the locally stored file name.
pub type BucketStorage = Box<dyn KvStorageInterface<String> + Send + Sync>;

/// PeerRing holds the routing state of one node on the ring.
/// All nodes form a clockwise ring in the order of [Did].
/// PeerRing implemented [Chord] algorithm.
/// PeerRing implemented [ChordStorage] protocol for the bucket.
pub struct PeerRing {
    /// Identifier and address of current node.
    pub node: NodeIp,
    /// [FingerTable] help node to find successor quickly.
    pub finger: Arc<Mutex<FingerTable>>,
    /// The next `r` nodes on the ring, for fault tolerance.
    /// The head should be same as the first element in finger table once fixed.
    pub successor_seq: SuccessorSeq,
    /// The previous node on the ring.
    pub predecessor: Arc<Mutex<Option<NodeIp>>>,
    /// Keys stored on this node, see [BucketStorage].
    pub bucket: BucketStorage,
}

/// `PeerRing` use this to describe the result of [Chord] algorithm. Sometimes it's a
/// direct result, sometimes it's an action that is continued externally.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PeerRingAction {
    /// No result, the whole manipulation is done internally.
    None,
    /// Found some node.
    Some(NodeIp),
    /// Trigger a remote action on the given node.
    RemoteAction(NodeIp, RemoteAction),
}

/// Some of the process needs to be done remotely. This enum is used to describe that.
/// The async layer ([Swarm](crate::swarm::Swarm) and [Stabilizer](super::Stabilizer))
/// performs the call and feeds the result back into `PeerRing`.
///
/// In the following comments, `node_a` is the node declared in [PeerRingAction].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RemoteAction {
    /// Ask `node_a` for the successor of a did.
    FindSuccessor(Did),
    /// Run a full lookup of `target`, then store the result at finger `index`.
    FindSuccessorForFix {
        /// Finger entry to refresh.
        index: usize,
        /// `(self + 2^index) mod 2^160`.
        target: Did,
    },
    /// Ship bucket entries that now belong to `node_a`, the new predecessor.
    SyncBucketWithPredecessor(Vec<(Did, String)>),
    /// Fetch successor list from `node_a`.
    QueryForSuccessorList,
}

/// Information about successor and predecessor
#[derive(Debug, PartialEq, Eq, Deserialize, Serialize, Clone)]
pub struct TopoInfo {
    /// Current node
    pub node: NodeIp,
    /// Successor list
    pub successors: Vec<NodeIp>,
    /// Predecessor
    pub predecessor: Option<NodeIp>,
    /// Finger table entries, `None` for unknown
    pub fingers: Vec<Option<NodeIp>>,
}

impl TryFrom<&PeerRing> for TopoInfo {
    type Error = Error;
    fn try_from(dht: &PeerRing) -> Result<TopoInfo> {
        let successors = dht.successors().list()?;
        let predecessor = *dht.lock_predecessor()?;
        let fingers = dht.lock_finger()?.list().clone();
        Ok(TopoInfo {
            node: dht.node,
            successors,
            predecessor,
            fingers,
        })
    }
}

impl PeerRing {
    /// Create a PeerRing with an in-memory bucket.
    pub fn new(node: NodeIp, succ_max: u8) -> Result<Self> {
        Self::new_with_storage(node, succ_max, Box::new(MemStorage::new()))
    }

    /// Same as new, but with a given bucket storage.
    pub fn new_with_storage(node: NodeIp, succ_max: u8, bucket: BucketStorage) -> Result<Self> {
        if !(MIN_SUCCESSORS..=MAX_SUCCESSORS).contains(&succ_max) {
            return Err(Error::InvalidSuccessorCapacity(succ_max));
        }
        Ok(Self {
            successor_seq: SuccessorSeq::new(node, succ_max),
            predecessor: Arc::new(Mutex::new(None)),
            finger: Arc::new(Mutex::new(FingerTable::new(node.did, ID_BITS))),
            bucket,
            node,
        })
    }

    /// Did of current node.
    pub fn did(&self) -> Did {
        self.node.did
    }

    /// Return successor sequence
    pub fn successors(&self) -> SuccessorSeq {
        self.successor_seq.clone()
    }

    /// Lock and return MutexGuard of finger table.
    pub fn lock_finger(&self) -> Result<MutexGuard<FingerTable>> {
        self.finger.lock().map_err(|_| Error::DHTSyncLockError)
    }

    /// Lock and return MutexGuard of predecessor.
    pub fn lock_predecessor(&self) -> Result<MutexGuard<Option<NodeIp>>> {
        self.predecessor.lock().map_err(|_| Error::DHTSyncLockError)
    }

    /// Bootstrap a singleton ring: every finger points to current node and the
    /// successor list is empty, so the node is its own successor.
    pub fn create_ring(&self) -> Result<()> {
        self.lock_finger()?.fill(self.node);
        *self.lock_predecessor()? = None;
        Ok(())
    }

    /// Record `node` as the immediate successor, in both successor list and finger 0.
    pub fn set_successor(&self, node: NodeIp) -> Result<()> {
        if node.did == self.did() {
            return Ok(());
        }
        self.successors().update(node)?;
        self.lock_finger()?.set(0, node);
        Ok(())
    }

    /// Store the result of a finger fix.
    pub fn set_finger(&self, index: usize, node: NodeIp) -> Result<()> {
        self.lock_finger()?.set(index, node);
        Ok(())
    }

    /// Remove a node from finger table, successor list and predecessor.
    /// If successor_seq become empty, try setting the closest finger to it.
    pub fn remove(&self, did: Did) -> Result<()> {
        let mut finger = self.lock_finger()?;
        let successor = self.successors();
        let mut predecessor = self.lock_predecessor()?;
        if predecessor.map(|p| p.did) == Some(did) {
            *predecessor = None;
        }
        finger.remove(did);
        successor.remove(did)?;
        if successor.is_empty()? {
            if let Some(x) = finger.first() {
                successor.update(x)?;
            }
        }
        Ok(())
    }

    /// Drop the predecessor only if it is still `did`.
    /// Returns whether it was cleared.
    pub fn clear_predecessor_if(&self, did: Did) -> Result<bool> {
        let mut predecessor = self.lock_predecessor()?;
        if predecessor.map(|p| p.did) == Some(did) {
            *predecessor = None;
            return Ok(true);
        }
        Ok(false)
    }

    /// Furthest known node strictly between current node and `did`.
    /// Both successor list and finger table are scanned from the longest reach downward.
    /// Nodes in `avoid` are skipped. Falls back to the first usable successor, and to the
    /// head of the successor list when nothing qualifies.
    pub fn closest_preceding_node(&self, did: Did, avoid: &[Did]) -> Result<NodeIp> {
        let successors = self.successors().list()?;
        let from_succ = successors
            .iter()
            .rev()
            .find(|n| n.did.is_between(self.did(), did) && !avoid.contains(&n.did))
            .copied();
        let from_finger = self.lock_finger()?.closest_preceding_node(did, avoid);

        let closest = match (from_succ, from_finger) {
            (Some(s), Some(f)) => Some(if self.bias(s.did) >= self.bias(f.did) { s } else { f }),
            (s, f) => s.or(f),
        };

        match closest {
            Some(n) => Ok(n),
            None => Ok(successors
                .iter()
                .find(|n| !avoid.contains(&n.did))
                .copied()
                .unwrap_or(self.successors().head()?)),
        }
    }

    /// Same as [Chord::find_successor], but nodes in `avoid` are treated as gone: the
    /// first successor not in `avoid` stands in for the immediate successor.
    pub fn find_successor_avoiding(&self, did: Did, avoid: &[Did]) -> Result<PeerRingAction> {
        let successors = self.successors();
        let succ = if successors.is_empty()? {
            self.node
        } else {
            match successors.list()?.into_iter().find(|n| !avoid.contains(&n.did)) {
                Some(n) => n,
                // Every successor failed, nothing left to route through.
                None => {
                    return Ok(PeerRingAction::RemoteAction(
                        successors.head()?,
                        RemoteAction::FindSuccessor(did),
                    ))
                }
            }
        };

        let ret = if succ.did == self.did() || did.is_between_right_inclusive(self.did(), succ.did)
        {
            // Singleton ring, or the did is owned by the successor.
            PeerRingAction::Some(succ)
        } else {
            let closest = self.closest_preceding_node(did, avoid)?;
            PeerRingAction::RemoteAction(closest, RemoteAction::FindSuccessor(did))
        };

        tracing::debug!(
            "find_successor: self: {}, did: {}, successor: {}, result: {:?}",
            self.did(),
            did,
            succ,
            ret
        );
        Ok(ret)
    }

    /// Calculate bias of the Did on the ring.
    pub fn bias(&self, did: Did) -> BiasId {
        BiasId::new(self.did(), did)
    }
}

impl Chord<PeerRingAction> for PeerRing {
    /// Join a ring through `succ`, the successor of current node found by a peer.
    ///
    /// Returns a [RemoteAction::QueryForSuccessorList] so the caller can fill the rest
    /// of the successor list from `succ`.
    fn join(&self, succ: NodeIp) -> Result<PeerRingAction> {
        if succ.did == self.did() {
            return Ok(PeerRingAction::None);
        }
        self.set_successor(succ)?;
        Ok(PeerRingAction::RemoteAction(
            succ,
            RemoteAction::QueryForSuccessorList,
        ))
    }

    /// Find the successor of a Did.
    /// May return a remote action for the successor is recorded in another node.
    fn find_successor(&self, did: Did) -> Result<PeerRingAction> {
        self.find_successor_avoiding(did, &[])
    }

    /// Handle notification from a node that thinks it is the predecessor of current node.
    /// It's accepted when no predecessor is known or it lies strictly between the current
    /// predecessor and current node. A node is never its own predecessor.
    ///
    /// On change, returns [RemoteAction::SyncBucketWithPredecessor] (possibly with no
    /// entries) addressed to the new predecessor.
    fn notify(&self, node: NodeIp) -> Result<PeerRingAction> {
        if node.did == self.did() {
            return Ok(PeerRingAction::None);
        }
        let mut predecessor = self.lock_predecessor()?;
        let accept = match *predecessor {
            Some(pre) if pre.did == node.did => false,
            Some(pre) => node.did.is_between(pre.did, self.did()),
            None => true,
        };
        if !accept {
            return Ok(PeerRingAction::None);
        }
        tracing::info!("predecessor of {} changed to {}", self.did(), node);
        *predecessor = Some(node);
        Ok(PeerRingAction::RemoteAction(
            node,
            RemoteAction::SyncBucketWithPredecessor(vec![]),
        ))
    }

    /// Advance the fix finger cursor and describe which finger to refresh.
    /// Only one finger is fixed at a time.
    fn fix_fingers(&self) -> Result<PeerRingAction> {
        let mut finger = self.lock_finger()?;
        let index = finger.fix_finger_index;
        finger.fix_finger_index = (index + 1) % finger.size();
        let target = self.did().finger_start(index);
        Ok(PeerRingAction::RemoteAction(
            self.node,
            RemoteAction::FindSuccessorForFix { index, target },
        ))
    }

    /// A function to provide topological information about the chord.
    fn topo_info(&self) -> Result<TopoInfo> {
        self.try_into()
    }
}

#[async_trait]
impl ChordStorage<PeerRingAction> for PeerRing {
    /// Record `name` under `key` in the bucket.
    async fn bucket_put(&self, key: Did, name: &str) -> Result<()> {
        self.bucket.put(&key.to_string(), &name.to_string()).await
    }

    async fn bucket_get(&self, key: Did) -> Result<Option<String>> {
        self.bucket.get(&key.to_string()).await
    }

    async fn bucket_remove(&self, key: Did) -> Result<()> {
        self.bucket.remove(&key.to_string()).await
    }

    async fn bucket_list(&self) -> Result<Vec<(Did, String)>> {
        let mut ret = vec![];
        for (k, v) in self.bucket.get_all().await? {
            ret.push((Did::from_str(&k)?, v));
        }
        ret.sort_by_key(|(k, _)| self.bias(*k));
        Ok(ret)
    }

    /// Collect bucket entries whose key is no longer in `(predecessor, self]`.
    /// Entries stay in the bucket until the caller has shipped them.
    async fn sync_bucket_with_predecessor(&self, predecessor: NodeIp) -> Result<PeerRingAction> {
        let data: Vec<(Did, String)> = self
            .bucket_list()
            .await?
            .into_iter()
            .filter(|(k, _)| !k.is_between_right_inclusive(predecessor.did, self.did()))
            .collect();

        if data.is_empty() {
            Ok(PeerRingAction::None)
        } else {
            Ok(PeerRingAction::RemoteAction(
                predecessor,
                RemoteAction::SyncBucketWithPredecessor(data),
            ))
        }
    }
}

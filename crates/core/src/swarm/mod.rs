#![warn(missing_docs)]
//! Ring membership and lookups over a [ChordTransport].

mod builder;
pub mod transport;

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::task::JoinHandle;

pub use builder::SwarmBuilder;
pub use builder::DEFAULT_DATA_DIR;

use crate::consts::MAX_LOOKUP_HOPS;
use crate::dht::Chord;
use crate::dht::ChordStorage;
use crate::dht::Did;
use crate::dht::NodeIp;
use crate::dht::PeerRing;
use crate::dht::PeerRingAction;
use crate::dht::PeerRingRemoteAction;
use crate::dht::SuccessorReader;
use crate::dht::SuccessorWriter;
use crate::dht::TopoInfo;
use crate::error::Error;
use crate::error::Result;
use crate::storage::FileStore;
use crate::swarm::transport::ChordTransport;
use crate::swarm::transport::Hop;
use crate::swarm::transport::SuccessorList;

/// A running ring member: the routing state, the local files and the transport
/// used to reach other members.
pub struct Swarm {
    pub(crate) dht: Arc<PeerRing>,
    pub(crate) files: FileStore,
    pub(crate) transport: Arc<dyn ChordTransport>,
}

impl Swarm {
    /// Get did of self.
    pub fn did(&self) -> Did {
        self.dht.did()
    }

    /// Identifier and address of self.
    pub fn node(&self) -> NodeIp {
        self.dht.node
    }

    /// Get DHT(Distributed Hash Table) of self.
    pub fn dht(&self) -> Arc<PeerRing> {
        self.dht.clone()
    }

    /// Node scoped file storage.
    pub fn files(&self) -> &FileStore {
        &self.files
    }

    /// Transport used for outbound calls.
    pub fn transport(&self) -> Arc<dyn ChordTransport> {
        self.transport.clone()
    }

    /// Snapshot of the routing state.
    pub fn topo_info(&self) -> Result<TopoInfo> {
        self.dht.topo_info()
    }

    /// Bootstrap a singleton ring.
    pub fn create_ring(&self) -> Result<()> {
        tracing::info!("creating ring at {}", self.node());
        self.dht.create_ring()
    }

    /// Join the ring `addr` belongs to by asking it for our successor.
    pub async fn join_ring(&self, addr: SocketAddr) -> Result<()> {
        tracing::info!("joining ring via {}", addr);
        self.dht.create_ring()?;
        let succ = self
            .transport
            .find(addr, self.did())
            .await?
            .ok_or(Error::JoinFailed(addr))?;
        if succ.did == self.did() {
            // Someone else already sits on our identifier.
            return Err(Error::JoinFailed(addr));
        }

        match self.dht.join(succ)? {
            PeerRingAction::RemoteAction(next, PeerRingRemoteAction::QueryForSuccessorList) => {
                if let Err(e) = self.refresh_successors(next).await {
                    tracing::warn!("failed to pull successor list from {}: {}", next, e);
                }
            }
            act => return Err(Error::PeerRingUnexpectedAction(act)),
        }
        tracing::info!("joined ring, successor {}", succ);
        Ok(())
    }

    /// Rebuild the successor list as `head` followed by the successor list of `head`.
    /// Lists of a different configured length are refused.
    pub async fn refresh_successors(&self, head: NodeIp) -> Result<()> {
        let SuccessorList { nodes, capacity } =
            self.transport.find_all_successors(head.address).await?;
        let local = self.dht.successors().capacity();
        if capacity != local {
            return Err(Error::SuccessorCapacityMismatch {
                local,
                remote: capacity,
            });
        }
        self.dht.successors().refresh(head, &nodes)
    }

    /// Iterative lookup of the node owning `did`.
    ///
    /// Starts from self and follows `FindSuccessor` hops until one reports the owner.
    /// A hop that cannot be reached is skipped and the next one is recomputed from
    /// local routing state. Gives up with [Error::LookupNotFound] after
    /// [MAX_LOOKUP_HOPS] iterations.
    pub async fn find(&self, did: Did) -> Result<NodeIp> {
        let mut failed: Vec<Did> = vec![];
        let mut hop = self.node();

        for _ in 0..MAX_LOOKUP_HOPS {
            let step = if hop.did == self.did() {
                self.local_hop(did, &failed)?
            } else {
                match self.transport.find_successor(hop.address, did).await {
                    Ok(step) => step,
                    Err(e) => {
                        tracing::warn!("lookup of {} skips hop {}: {}", did, hop, e);
                        failed.push(hop.did);
                        self.dht.lock_finger()?.remove(hop.did);
                        hop = self.node();
                        continue;
                    }
                }
            };

            match step {
                Hop::Found(owner) => {
                    tracing::debug!("lookup of {} found {}", did, owner);
                    return Ok(owner);
                }
                Hop::Next(next) if failed.contains(&next.did) => {
                    hop = match self.route_around(hop, did, &failed).await {
                        Some(Hop::Found(owner)) => return Ok(owner),
                        Some(Hop::Next(n)) => n,
                        None => self.node(),
                    }
                }
                Hop::Next(next) => hop = next,
            }
        }
        Err(Error::LookupNotFound(did))
    }

    /// `via` keeps routing into a node known to be dead. Continue with the first
    /// live entry of its successor list instead.
    async fn route_around(&self, via: NodeIp, did: Did, failed: &[Did]) -> Option<Hop> {
        let nodes = if via.did == self.did() {
            self.dht.successors().list().ok()?
        } else {
            self.transport
                .find_all_successors(via.address)
                .await
                .ok()?
                .nodes
        };
        let live = nodes.into_iter().find(|n| !failed.contains(&n.did))?;
        Some(Hop::new(
            did.is_between_right_inclusive(via.did, live.did),
            live,
        ))
    }

    fn local_hop(&self, did: Did, avoid: &[Did]) -> Result<Hop> {
        match self.dht.find_successor_avoiding(did, avoid)? {
            PeerRingAction::Some(n) => Ok(Hop::Found(n)),
            PeerRingAction::RemoteAction(n, PeerRingRemoteAction::FindSuccessor(_)) => {
                Ok(Hop::Next(n))
            }
            act => Err(Error::PeerRingUnexpectedAction(act)),
        }
    }

    /// Node responsible for `key`, the successor of its hash.
    pub async fn owner(&self, key: &str) -> Result<NodeIp> {
        self.find(Did::from_name(key)).await
    }

    /// Place a file on the node owning its name. Returns that node.
    pub async fn store_file(&self, name: &str, data: Vec<u8>) -> Result<NodeIp> {
        FileStore::validate_name(name)?;
        let owner = self.owner(name).await?;
        if owner.did == self.did() {
            self.handle_store_file(name, &data).await?;
        } else {
            self.transport.store_file(owner.address, name, data).await?;
        }
        Ok(owner)
    }

    /// Serve `RPCFind`: a full lookup on behalf of a peer or client.
    pub async fn handle_find(&self, did: Did) -> Result<Option<NodeIp>> {
        match self.find(did).await {
            Ok(n) => Ok(Some(n)),
            Err(Error::LookupNotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Serve `RPCFindSuccessor`: one routing step from local state.
    pub fn handle_find_successor(&self, did: Did) -> Result<Hop> {
        self.local_hop(did, &[])
    }

    /// Serve `RPCFindPredecessor`.
    pub fn handle_find_predecessor(&self) -> Result<Option<NodeIp>> {
        Ok(*self.dht.lock_predecessor()?)
    }

    /// Serve `RPCFindAllSuccessors`.
    pub fn handle_find_all_successors(&self) -> Result<SuccessorList> {
        let successors = self.dht.successors();
        Ok(SuccessorList {
            nodes: successors.list()?,
            capacity: successors.capacity(),
        })
    }

    /// Serve `RPCNotify`. When the predecessor changes, keys it now owns are moved
    /// to it in a background task, so the caller gets its reply without waiting on
    /// the transfer. The returned handle resolves once that task is done.
    pub async fn handle_notify(&self, node: NodeIp) -> Result<Option<JoinHandle<()>>> {
        match self.dht.notify(node)? {
            PeerRingAction::None => Ok(None),
            PeerRingAction::RemoteAction(
                pred,
                PeerRingRemoteAction::SyncBucketWithPredecessor(_),
            ) => {
                let dht = self.dht.clone();
                let files = self.files.clone();
                let transport = self.transport.clone();
                Ok(Some(tokio::spawn(async move {
                    if let Err(e) = relocate_to_predecessor(&dht, &files, &*transport, pred).await
                    {
                        tracing::warn!("relocation to {} stopped: {}", pred, e);
                    }
                })))
            }
            act => Err(Error::PeerRingUnexpectedAction(act)),
        }
    }

    /// Serve `RPCStoreFile`: write the file and record it in the bucket.
    pub async fn handle_store_file(&self, name: &str, data: &[u8]) -> Result<()> {
        self.files.write(name, data).await?;
        self.dht.bucket_put(Did::from_name(name), name).await
    }
}

/// Ship bucket entries outside `(predecessor, self]` to `predecessor`.
/// An entry is dropped locally only once it was shipped.
async fn relocate_to_predecessor(
    dht: &PeerRing,
    files: &FileStore,
    transport: &dyn ChordTransport,
    predecessor: NodeIp,
) -> Result<()> {
    let data = match dht.sync_bucket_with_predecessor(predecessor).await? {
        PeerRingAction::None => return Ok(()),
        PeerRingAction::RemoteAction(_, PeerRingRemoteAction::SyncBucketWithPredecessor(data)) => {
            data
        }
        act => return Err(Error::PeerRingUnexpectedAction(act)),
    };

    for (key, name) in data {
        let content = match files.read(&name).await {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!("cannot read {} for relocation: {}", name, e);
                continue;
            }
        };
        match transport
            .store_file(predecessor.address, &name, content)
            .await
        {
            Ok(()) => {
                dht.bucket_remove(key).await?;
                files.remove(&name).await?;
                tracing::info!("moved {} to {}", name, predecessor);
            }
            Err(e) => tracing::warn!("failed to move {} to {}: {}", name, predecessor, e),
        }
    }
    Ok(())
}

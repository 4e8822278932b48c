//! DHT types about `Storage` and `PeerRing`.
#![warn(missing_docs)]
use async_trait::async_trait;

use super::chord::TopoInfo;
use super::did::Did;
use super::NodeIp;
use crate::error::Result;

/// Chord is a distributed hash table (DHT) algorithm that maps keys onto the nodes
/// of a peer-to-peer ring. You may want to browse its
/// [wiki](https://en.wikipedia.org/wiki/Chord_(peer-to-peer)) before you read this.
///
/// Methods here only read and write local routing state. When the answer depends on
/// another node they return an `Action` describing the remote step, and the async
/// layer is responsible for carrying it out.
pub trait Chord<Action> {
    /// Join a ring through `succ`, the successor of current node found by a peer.
    fn join(&self, succ: NodeIp) -> Result<Action>;

    /// Ask the local routing state for the successor of Did.
    /// May return a remote action for the successor is recorded in another node.
    fn find_successor(&self, did: Did) -> Result<Action>;

    /// Notify current node that `node` may be its predecessor.
    fn notify(&self, node: NodeIp) -> Result<Action>;

    /// Fix finger table by finding the successor for each finger.
    /// According to the paper, this method should be called periodically.
    /// According to the paper, only one finger should be fixed at a time.
    fn fix_fingers(&self) -> Result<Action>;

    /// A function to provide topological information about the chord.
    fn topo_info(&self) -> Result<TopoInfo>;
}

/// ChordStorage keeps the bucket of a node: the keys in `(predecessor, self]` and the
/// names of the files stored for them.
///
/// When the predecessor changes, the keys it now owns have to move. The outer layer
/// takes the returned action to ship them.
#[async_trait]
pub trait ChordStorage<Action>: Chord<Action> {
    /// Record a stored file under its key.
    async fn bucket_put(&self, key: Did, name: &str) -> Result<()>;
    /// Get the file name stored under `key`.
    async fn bucket_get(&self, key: Did) -> Result<Option<String>>;
    /// Forget a key.
    async fn bucket_remove(&self, key: Did) -> Result<()>;
    /// All entries, in ring order starting from current node.
    async fn bucket_list(&self) -> Result<Vec<(Did, String)>>;
    /// Collect entries that belong to a new predecessor.
    async fn sync_bucket_with_predecessor(&self, predecessor: NodeIp) -> Result<Action>;
}

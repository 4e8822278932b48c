#![warn(missing_docs)]
//! Implementation of the ring's DHT
//! which is based on CHORD, ref: <https://pdos.csail.mit.edu/papers/ton:chord/paper-ton.pdf>
//! With high probability, the number of nodes that must be contacted to find a successor in an N-node network is O(log N).

mod chord;
pub mod did;
/// Finger table of a node
pub mod finger;
pub mod node_ip;
mod stabilization;
pub mod successor;
pub mod types;

pub use chord::BucketStorage;
pub use chord::PeerRing;
pub use chord::PeerRingAction;
pub use chord::RemoteAction as PeerRingRemoteAction;
pub use chord::TopoInfo;
pub use did::Did;
pub use finger::FingerTable;
pub use node_ip::NodeIp;
pub use stabilization::StabilizeIntervals;
pub use stabilization::Stabilizer;
pub use successor::SuccessorReader;
pub use successor::SuccessorSeq;
pub use successor::SuccessorWriter;
pub use types::Chord;
pub use types::ChordStorage;

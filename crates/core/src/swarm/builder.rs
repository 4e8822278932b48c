#![warn(missing_docs)]
//! This module provider [SwarmBuilder] and it's interface for
//! [Swarm]

use std::path::PathBuf;
use std::sync::Arc;

use crate::dht::BucketStorage;
use crate::dht::NodeIp;
use crate::dht::PeerRing;
use crate::error::Result;
use crate::storage::FileStore;
use crate::storage::MemStorage;
use crate::swarm::transport::ChordTransport;
use crate::swarm::Swarm;

/// Default directory holding the node scoped file directories.
pub const DEFAULT_DATA_DIR: &str = "./chord-data";

/// Creates a SwarmBuilder to configure a Swarm.
pub struct SwarmBuilder {
    node: NodeIp,
    transport: Arc<dyn ChordTransport>,
    dht_succ_max: u8,
    bucket: Option<BucketStorage>,
    data_dir: PathBuf,
}

impl SwarmBuilder {
    /// Creates new instance of [SwarmBuilder]
    pub fn new(node: NodeIp, transport: Arc<dyn ChordTransport>) -> Self {
        SwarmBuilder {
            node,
            transport,
            dht_succ_max: 3,
            bucket: None,
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
        }
    }

    /// Sets up the maximum length of successors in the DHT.
    pub fn dht_succ_max(mut self, succ_max: u8) -> Self {
        self.dht_succ_max = succ_max;
        self
    }

    /// Sets up the storage of the bucket. Defaults to [MemStorage].
    pub fn bucket(mut self, bucket: BucketStorage) -> Self {
        self.bucket = Some(bucket);
        self
    }

    /// Sets up the directory files are stored under.
    pub fn data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.data_dir = data_dir.into();
        self
    }

    /// Try build for `Swarm`.
    pub fn build(self) -> Result<Swarm> {
        let bucket = self.bucket.unwrap_or_else(|| Box::new(MemStorage::new()));
        let dht = Arc::new(PeerRing::new_with_storage(
            self.node,
            self.dht_succ_max,
            bucket,
        )?);
        let files = FileStore::new(&self.data_dir, self.node.did);

        Ok(Swarm {
            dht,
            files,
            transport: self.transport,
        })
    }
}

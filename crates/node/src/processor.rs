//! Processor of a chord node: the swarm, its stabilizer and the operations the
//! endpoint and the control plane call.
use std::net::SocketAddr;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::Error;
use crate::error::Result;
use crate::native::config::Settings;
use crate::prelude::chord_core::swarm::DEFAULT_DATA_DIR;
use crate::prelude::Did;
use crate::prelude::NodeIp;
use crate::prelude::StabilizeIntervals;
use crate::prelude::Stabilizer;
use crate::prelude::Swarm;
use crate::prelude::SwarmBuilder;
use crate::prelude::TopoInfo;
use crate::transport::HttpTransport;

/// Builder of [Processor].
pub struct ProcessorBuilder {
    node: NodeIp,
    successors: u8,
    data_dir: PathBuf,
    intervals: StabilizeIntervals,
    rpc_timeout: Duration,
}

/// Processor for chord-node rpc server
#[derive(Clone)]
pub struct Processor {
    /// a swarm instance
    pub swarm: Arc<Swarm>,
    stabilizer: Arc<Stabilizer>,
    intervals: StabilizeIntervals,
}

impl ProcessorBuilder {
    /// Start from validated [Settings].
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            node: NodeIp::new(settings.did(), settings.bind),
            successors: settings.successors,
            data_dir: settings.data_dir.clone(),
            intervals: settings.intervals,
            rpc_timeout: settings.rpc_timeout,
        }
    }

    /// Start from a bare node entry with default periods of one second.
    pub fn new(node: NodeIp, successors: u8) -> Self {
        let second = Duration::from_secs(1);
        Self {
            node,
            successors,
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            intervals: StabilizeIntervals {
                stabilize: second,
                fix_fingers: second,
                check_predecessor: second,
            },
            rpc_timeout: second,
        }
    }

    /// Set the directory files are stored under.
    pub fn data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.data_dir = data_dir.into();
        self
    }

    /// Set the periods of the maintenance tasks.
    pub fn intervals(mut self, intervals: StabilizeIntervals) -> Self {
        self.intervals = intervals;
        self
    }

    /// Set the timeout of one outbound call attempt.
    pub fn rpc_timeout(mut self, timeout: Duration) -> Self {
        self.rpc_timeout = timeout;
        self
    }

    /// Build the [Processor].
    pub fn build(self) -> Result<Processor> {
        let transport = Arc::new(HttpTransport::new(self.rpc_timeout));
        let swarm = Arc::new(
            SwarmBuilder::new(self.node, transport)
                .dht_succ_max(self.successors)
                .data_dir(self.data_dir)
                .build()?,
        );
        let stabilizer = Arc::new(Stabilizer::new(swarm.clone()));
        Ok(Processor {
            swarm,
            stabilizer,
            intervals: self.intervals,
        })
    }
}

impl Processor {
    /// Get current did
    pub fn did(&self) -> Did {
        self.swarm.did()
    }

    /// Identifier and address of this node.
    pub fn node(&self) -> NodeIp {
        self.swarm.node()
    }

    /// Create a new ring, or join the ring `join` belongs to.
    pub async fn bootstrap(&self, join: Option<SocketAddr>) -> Result<()> {
        match join {
            None => self.swarm.create_ring()?,
            Some(addr) => self.swarm.join_ring(addr).await?,
        }
        Ok(())
    }

    /// Run stabilization daemon until `token` is cancelled.
    pub async fn listen(&self, token: CancellationToken) {
        self.stabilizer
            .clone()
            .wait(self.intervals, token)
            .await
    }

    /// Node owning the file `name`. `None` when the lookup did not converge.
    pub async fn lookup(&self, name: &str) -> Result<Option<NodeIp>> {
        Ok(self.swarm.handle_find(Did::from_name(name)).await?)
    }

    /// Read the local file at `path` and place it on the node owning its bare name.
    pub async fn store_file(&self, path: &Path) -> Result<(String, NodeIp)> {
        if !path.is_file() {
            return Err(Error::LocalFileNotFound(path.display().to_string()));
        }
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| Error::LocalFileNotFound(path.display().to_string()))?;
        let data = tokio::fs::read(path)
            .await
            .map_err(|e| Error::OpenFileError(e.to_string()))?;
        let owner = self.swarm.store_file(&name, data).await?;
        tracing::info!("stored {} at {}", name, owner);
        Ok((name, owner))
    }

    /// Snapshot of the routing state.
    pub fn topo_info(&self) -> Result<TopoInfo> {
        Ok(self.swarm.topo_info()?)
    }
}

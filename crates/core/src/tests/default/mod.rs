use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::DashSet;
use tempfile::TempDir;

use crate::dht::Did;
use crate::dht::NodeIp;
use crate::dht::Stabilizer;
use crate::dht::SuccessorReader;
use crate::error::Error;
use crate::error::Result;
use crate::swarm::transport::ChordTransport;
use crate::swarm::transport::Hop;
use crate::swarm::transport::SuccessorList;
use crate::swarm::Swarm;
use crate::swarm::SwarmBuilder;

mod test_lookup;
mod test_stabilization;

/// In-memory network. Calls go straight to the handlers of the registered swarm;
/// a node that is not registered, or was killed, is unreachable. Calls to a stalled
/// node never return.
#[derive(Default)]
pub struct DummyNetwork {
    nodes: DashMap<SocketAddr, Arc<Swarm>>,
    stalled: DashSet<SocketAddr>,
}

impl DummyNetwork {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn get(&self, addr: SocketAddr) -> Result<Arc<Swarm>> {
        self.nodes
            .get(&addr)
            .map(|s| s.value().clone())
            .ok_or(Error::PeerUnreachable {
                addr,
                reason: "connection refused".to_string(),
            })
    }

    pub fn register(&self, swarm: Arc<Swarm>) {
        self.nodes.insert(swarm.node().address, swarm);
    }

    pub fn kill(&self, addr: SocketAddr) {
        self.nodes.remove(&addr);
    }

    pub fn stall(&self, addr: SocketAddr) {
        self.stalled.insert(addr);
    }

    async fn reach(&self, addr: SocketAddr) -> Result<Arc<Swarm>> {
        if self.stalled.contains(&addr) {
            futures::future::pending::<()>().await;
        }
        self.get(addr)
    }
}

#[async_trait]
impl ChordTransport for DummyNetwork {
    async fn find(&self, addr: SocketAddr, did: Did) -> Result<Option<NodeIp>> {
        self.reach(addr).await?.handle_find(did).await
    }

    async fn find_successor(&self, addr: SocketAddr, did: Did) -> Result<Hop> {
        self.reach(addr).await?.handle_find_successor(did)
    }

    async fn find_predecessor(&self, addr: SocketAddr) -> Result<Option<NodeIp>> {
        self.reach(addr).await?.handle_find_predecessor()
    }

    async fn find_all_successors(&self, addr: SocketAddr) -> Result<SuccessorList> {
        self.reach(addr).await?.handle_find_all_successors()
    }

    async fn notify(&self, addr: SocketAddr, node: NodeIp) -> Result<()> {
        self.reach(addr).await?.handle_notify(node).await.map(|_| ())
    }

    async fn store_file(&self, addr: SocketAddr, name: &str, data: Vec<u8>) -> Result<()> {
        self.reach(addr).await?.handle_store_file(name, &data).await
    }

    async fn ping(&self, addr: SocketAddr) -> Result<()> {
        self.reach(addr).await.map(|_| ())
    }
}

pub struct Node {
    pub swarm: Arc<Swarm>,
    pub stabilizer: Stabilizer,
}

impl Node {
    pub fn did(&self) -> Did {
        self.swarm.did()
    }

    pub fn info(&self) -> NodeIp {
        self.swarm.node()
    }

    pub fn successor(&self) -> NodeIp {
        self.swarm.dht().successors().head().unwrap()
    }

    pub fn successors(&self) -> Vec<NodeIp> {
        self.swarm.dht().successors().list().unwrap()
    }

    pub fn predecessor(&self) -> Option<NodeIp> {
        *self.swarm.dht().lock_predecessor().unwrap()
    }
}

pub fn node_addr(i: u16) -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 30000 + i))
}

pub fn prepare_node(net: &Arc<DummyNetwork>, dir: &TempDir, i: u16, succ_max: u8) -> Node {
    let info = NodeIp::from_address(node_addr(i));
    let swarm = Arc::new(
        SwarmBuilder::new(info, net.clone())
            .dht_succ_max(succ_max)
            .data_dir(dir.path())
            .build()
            .unwrap(),
    );
    net.register(swarm.clone());
    let stabilizer = Stabilizer::new(swarm.clone());
    Node { swarm, stabilizer }
}

pub async fn stabilize_round(nodes: &[Node]) {
    for n in nodes {
        n.stabilizer.stabilize().await.unwrap();
    }
}

pub async fn fix_all_fingers(nodes: &[Node]) {
    for n in nodes {
        for _ in 0..crate::consts::ID_BITS {
            n.stabilizer.fix_fingers().await.unwrap();
        }
    }
}

/// Build a converged ring of `n` nodes, node `i` joining through node 0.
/// Returned nodes are sorted by did.
pub async fn prepare_ring(net: &Arc<DummyNetwork>, dir: &TempDir, n: u16, succ_max: u8) -> Vec<Node> {
    let mut nodes = vec![];
    let first = prepare_node(net, dir, 0, succ_max);
    first.swarm.create_ring().unwrap();
    nodes.push(first);

    for i in 1..n {
        let node = prepare_node(net, dir, i, succ_max);
        node.swarm.join_ring(nodes[0].info().address).await.unwrap();
        nodes.push(node);
        stabilize_round(&nodes).await;
        stabilize_round(&nodes).await;
    }
    for _ in 0..n {
        stabilize_round(&nodes).await;
    }
    nodes.sort_by_key(|n| n.did());
    nodes
}

/// Expected owner of `key` among live nodes sorted by did.
pub fn expected_owner(sorted: &[&Node], key: Did) -> NodeIp {
    sorted
        .iter()
        .find(|n| key <= n.did())
        .unwrap_or(&sorted[0])
        .info()
}

/// Walk successors from `start` and return the visited nodes, stopping at the first repeat.
pub fn walk_ring(nodes: &[&Node], start: usize) -> Vec<Did> {
    let mut visited = vec![];
    let mut cur = nodes[start];
    loop {
        if visited.contains(&cur.did()) {
            break;
        }
        visited.push(cur.did());
        let next = cur.successor();
        match nodes.iter().find(|n| n.did() == next.did) {
            Some(n) => cur = n,
            None => break,
        }
    }
    visited
}

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::native::endpoint;
use crate::prelude::NodeIp;
use crate::prelude::StabilizeIntervals;
use crate::processor::Processor;
use crate::processor::ProcessorBuilder;

mod test_endpoint;
mod test_frontend;

pub const FAST: StabilizeIntervals = StabilizeIntervals {
    stabilize: Duration::from_millis(30),
    fix_fingers: Duration::from_millis(10),
    check_predecessor: Duration::from_millis(30),
};

/// A node serving on a real listener of 127.0.0.1.
pub struct TestNode {
    pub processor: Arc<Processor>,
    pub token: CancellationToken,
    server: JoinHandle<()>,
    stabilizer: Option<JoinHandle<()>>,
}

impl TestNode {
    pub fn addr(&self) -> SocketAddr {
        self.processor.node().address
    }

    /// Head of the successor list, the node itself on a singleton ring.
    pub fn successor(&self) -> NodeIp {
        let info = self.processor.topo_info().unwrap();
        info.successors.first().copied().unwrap_or(info.node)
    }

    pub fn successors(&self) -> Vec<NodeIp> {
        self.processor.topo_info().unwrap().successors
    }

    pub fn predecessor(&self) -> Option<NodeIp> {
        self.processor.topo_info().unwrap().predecessor
    }

    /// Start the maintenance loops.
    pub fn stabilize(&mut self) {
        let processor = self.processor.clone();
        let token = self.token.clone();
        self.stabilizer = Some(tokio::spawn(async move { processor.listen(token).await }));
    }

    /// Stop serving, the port is closed afterwards.
    pub async fn kill(self) {
        self.token.cancel();
        self.server.await.unwrap();
        if let Some(h) = self.stabilizer {
            h.await.unwrap();
        }
    }
}

/// Bind a listener on a free port and serve a processor created for it.
pub async fn prepare_node(data_dir: &Path, r: u8, join: Option<SocketAddr>) -> TestNode {
    let listener = endpoint::bind("127.0.0.1:0".parse().unwrap()).unwrap();
    let addr = listener.local_addr().unwrap();
    let processor = Arc::new(
        ProcessorBuilder::new(NodeIp::from_address(addr), r)
            .data_dir(data_dir)
            .intervals(FAST)
            .rpc_timeout(Duration::from_millis(300))
            .build()
            .unwrap(),
    );
    let token = CancellationToken::new();
    let server = {
        let processor = processor.clone();
        let token = token.clone();
        tokio::spawn(async move {
            endpoint::run_http_api(listener, processor, token)
                .await
                .unwrap()
        })
    };
    processor.bootstrap(join).await.unwrap();
    TestNode {
        processor,
        token,
        server,
        stabilizer: None,
    }
}

/// Poll `cond` until it holds, panic after `timeout`.
pub async fn wait_until<F>(timeout: Duration, cond: F)
where F: Fn() -> bool {
    let polled = tokio::time::timeout(timeout, async {
        while !cond() {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await;
    assert!(polled.is_ok(), "condition not reached within {:?}", timeout);
}

//! Outbound calls over HTTP JSON-RPC.
use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;

use crate::prelude::chord_core::error::Error as CoreError;
use crate::prelude::chord_core::error::Result as CoreResult;
use crate::prelude::chord_core::swarm::transport::Hop;
use crate::prelude::chord_core::swarm::transport::SuccessorList;
use crate::prelude::chord_rpc::jsonrpc::Client;
use crate::prelude::chord_rpc::jsonrpc::RpcError;
use crate::prelude::ChordTransport;
use crate::prelude::Did;
use crate::prelude::NodeIp;

/// [ChordTransport] backed by [Client], one client per peer.
pub struct HttpTransport {
    timeout: Duration,
    clients: DashMap<SocketAddr, Client>,
}

impl HttpTransport {
    /// Every attempt of every call, dial included, is bounded by `timeout`.
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            clients: DashMap::new(),
        }
    }

    fn client(&self, addr: SocketAddr) -> CoreResult<Client> {
        if let Some(c) = self.clients.get(&addr) {
            return Ok(c.clone());
        }
        let c = Client::with_timeout(&Client::endpoint_of(addr), self.timeout)
            .map_err(|e| unreachable(addr, e))?;
        self.clients.insert(addr, c.clone());
        Ok(c)
    }
}

fn unreachable(addr: SocketAddr, e: RpcError) -> CoreError {
    CoreError::PeerUnreachable {
        addr,
        reason: e.to_string(),
    }
}

/// Transport failures mean the peer may be dead, anything else is a refusal.
fn map_err(addr: SocketAddr) -> impl Fn(RpcError) -> CoreError {
    move |e| {
        if e.is_transport() {
            unreachable(addr, e)
        } else {
            CoreError::RemoteRejected {
                addr,
                reason: e.to_string(),
            }
        }
    }
}

fn rejected(addr: SocketAddr, e: impl std::fmt::Display) -> CoreError {
    CoreError::RemoteRejected {
        addr,
        reason: e.to_string(),
    }
}

#[async_trait]
impl ChordTransport for HttpTransport {
    async fn find(&self, addr: SocketAddr, did: Did) -> CoreResult<Option<NodeIp>> {
        let resp = self.client(addr)?.find(did).await.map_err(map_err(addr))?;
        Ok(resp.into_found())
    }

    async fn find_successor(&self, addr: SocketAddr, did: Did) -> CoreResult<Hop> {
        let resp = self
            .client(addr)?
            .find_successor(did)
            .await
            .map_err(map_err(addr))?;
        resp.into_hop().map_err(|e| rejected(addr, e))
    }

    async fn find_predecessor(&self, addr: SocketAddr) -> CoreResult<Option<NodeIp>> {
        let resp = self
            .client(addr)?
            .find_predecessor()
            .await
            .map_err(map_err(addr))?;
        Ok(resp.into_found())
    }

    async fn find_all_successors(&self, addr: SocketAddr) -> CoreResult<SuccessorList> {
        let resp = self
            .client(addr)?
            .find_all_successors()
            .await
            .map_err(map_err(addr))?;
        Ok(resp.into())
    }

    async fn notify(&self, addr: SocketAddr, node: NodeIp) -> CoreResult<()> {
        self.client(addr)?
            .notify(node)
            .await
            .map_err(map_err(addr))?;
        Ok(())
    }

    async fn store_file(&self, addr: SocketAddr, name: &str, data: Vec<u8>) -> CoreResult<()> {
        self.client(addr)?
            .store_file(name, &data)
            .await
            .map_err(map_err(addr))?;
        Ok(())
    }

    /// A TCP dial bounded by the call timeout.
    async fn ping(&self, addr: SocketAddr) -> CoreResult<()> {
        match tokio::time::timeout(self.timeout, tokio::net::TcpStream::connect(addr)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(CoreError::PeerUnreachable {
                addr,
                reason: e.to_string(),
            }),
            Err(_) => Err(CoreError::PeerUnreachable {
                addr,
                reason: "dial timed out".to_string(),
            }),
        }
    }
}

use async_trait::async_trait;
use chord_rpc::handler::HandleRpc;
use chord_rpc::types::*;
use jsonrpc_core::Result;

use crate::error::Error;
use crate::processor::Processor;

fn invalid_params(e: impl std::fmt::Display) -> jsonrpc_core::Error {
    jsonrpc_core::Error::invalid_params(e.to_string())
}

fn internal(e: chord_core::error::Error) -> jsonrpc_core::Error {
    Error::InternalError(e).into()
}

#[async_trait]
impl HandleRpc<FindRequest, FindResponse> for Processor {
    async fn handle_rpc(&self, req: FindRequest) -> Result<FindResponse> {
        let did = req.did().map_err(invalid_params)?;
        let found = self.swarm.handle_find(did).await.map_err(internal)?;
        Ok(found.into())
    }
}

#[async_trait]
impl HandleRpc<FindSuccessorRequest, FindResponse> for Processor {
    async fn handle_rpc(&self, req: FindSuccessorRequest) -> Result<FindResponse> {
        let did = req.did().map_err(invalid_params)?;
        let hop = self.swarm.handle_find_successor(did).map_err(internal)?;
        Ok(hop.into())
    }
}

#[async_trait]
impl HandleRpc<FindPredecessorRequest, FindResponse> for Processor {
    async fn handle_rpc(&self, _req: FindPredecessorRequest) -> Result<FindResponse> {
        let pred = self.swarm.handle_find_predecessor().map_err(internal)?;
        Ok(pred.into())
    }
}

#[async_trait]
impl HandleRpc<FindAllSuccessorsRequest, FindAllSuccessorsResponse> for Processor {
    async fn handle_rpc(&self, _req: FindAllSuccessorsRequest) -> Result<FindAllSuccessorsResponse> {
        let list = self.swarm.handle_find_all_successors().map_err(internal)?;
        Ok(list.into())
    }
}

#[async_trait]
impl HandleRpc<NotifyRequest, NotifyResponse> for Processor {
    async fn handle_rpc(&self, req: NotifyRequest) -> Result<NotifyResponse> {
        // Relocation, if any, keeps running after the reply.
        self.swarm
            .handle_notify(req.node_ip_notify)
            .await
            .map_err(internal)?;
        Ok(NotifyResponse {})
    }
}

#[async_trait]
impl HandleRpc<StoreFileRequest, StoreFileResponse> for Processor {
    async fn handle_rpc(&self, req: StoreFileRequest) -> Result<StoreFileResponse> {
        let data = req.data().map_err(invalid_params)?;
        self.swarm
            .handle_store_file(&req.file_name, &data)
            .await
            .map_err(internal)?;
        tracing::info!("received {} ({} bytes)", req.file_name, data.len());
        Ok(StoreFileResponse {})
    }
}

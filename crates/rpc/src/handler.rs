//! Server side dispatch of `Node.RPC*` calls.
use std::sync::Arc;

use async_trait::async_trait;
use jsonrpc_core::types::error::Error;
use jsonrpc_core::types::error::ErrorCode;
use jsonrpc_core::Result;

use crate::method::Method;
use crate::types::*;

/// Used for processor to match rpc request and response.
#[async_trait]
pub trait HandleRpc<Req, Resp> {
    /// Handle rpc request and return response.
    async fn handle_rpc(&self, req: Req) -> Result<Resp>;
}

/// Provide handle_request method for the node rpc api.
#[derive(Clone)]
pub struct NodeRpcHandler;

async fn dispatch<P, Req, Resp>(processor: &P, params: serde_json::Value) -> Result<serde_json::Value>
where
    P: HandleRpc<Req, Resp> + Sync,
    Req: serde::de::DeserializeOwned + Send,
    Resp: serde::Serialize,
{
    let req = serde_json::from_value::<Req>(params).map_err(|e| Error::invalid_params(e.to_string()))?;
    let resp = processor.handle_rpc(req).await?;
    serde_json::to_value(resp).map_err(|_| Error::new(ErrorCode::ParseError))
}

impl NodeRpcHandler {
    /// Handle rpc request.
    pub async fn handle_request<P>(
        &self,
        processor: Arc<P>,
        method: String,
        params: serde_json::Value,
    ) -> Result<serde_json::Value>
    where
        P: HandleRpc<FindRequest, FindResponse>
            + HandleRpc<FindSuccessorRequest, FindResponse>
            + HandleRpc<FindPredecessorRequest, FindResponse>
            + HandleRpc<FindAllSuccessorsRequest, FindAllSuccessorsResponse>
            + HandleRpc<NotifyRequest, NotifyResponse>
            + HandleRpc<StoreFileRequest, StoreFileResponse>
            + Send
            + Sync,
    {
        let method = Method::try_from(method.as_str()).map_err(|_| Error {
            code: ErrorCode::MethodNotFound,
            message: format!("method {} is not found", method),
            data: None,
        })?;
        // Methods without arguments may be called with no params at all.
        let params = match params {
            serde_json::Value::Null => serde_json::json!({}),
            p => p,
        };
        let p = processor.as_ref();

        match method {
            Method::Find => dispatch::<P, FindRequest, FindResponse>(p, params).await,
            Method::FindSuccessor => {
                dispatch::<P, FindSuccessorRequest, FindResponse>(p, params).await
            }
            Method::FindPredecessor => {
                dispatch::<P, FindPredecessorRequest, FindResponse>(p, params).await
            }
            Method::FindAllSuccessors => {
                dispatch::<P, FindAllSuccessorsRequest, FindAllSuccessorsResponse>(p, params).await
            }
            Method::Notify => dispatch::<P, NotifyRequest, NotifyResponse>(p, params).await,
            Method::StoreFile => {
                dispatch::<P, StoreFileRequest, StoreFileResponse>(p, params).await
            }
        }
    }
}

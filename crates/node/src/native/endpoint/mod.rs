//! chord-node service run with `Swarm` and chord stabilization.
#![warn(missing_docs)]
mod http_error;

use std::net::SocketAddr;
use std::net::TcpListener;
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::routing::post;
use axum::Router;
use jsonrpc_core::MetaIoHandler;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;

use self::http_error::HttpError;
use crate::error::Error;
use crate::error::Result;
use crate::processor::Processor;

/// JSON-RPC state
#[derive(Clone)]
pub struct JsonRpcState<M>
where M: jsonrpc_core::Middleware<Arc<Processor>>
{
    processor: Arc<Processor>,
    io_handler: MetaIoHandler<Arc<Processor>, M>,
}

/// Status state
#[derive(Clone)]
pub struct StatusState {
    processor: Arc<Processor>,
}

struct NodeRpcMiddleware;

/// Largest accepted request body. `RPCStoreFile` carries whole files, base64 encoded.
pub const MAX_REQUEST_BODY: usize = 64 * 1024 * 1024;

/// Bind the listening socket of the node. Failing here is fatal for the node.
pub fn bind(addr: SocketAddr) -> Result<TcpListener> {
    let listener = TcpListener::bind(addr).map_err(|e| Error::BindError {
        addr,
        reason: e.to_string(),
    })?;
    listener
        .set_nonblocking(true)
        .map_err(|e| Error::BindError {
            addr,
            reason: e.to_string(),
        })?;
    Ok(listener)
}

/// Serve `Node.RPC*` calls on `listener` until `token` is cancelled.
/// Each connection is handled on its own task.
pub async fn run_http_api(
    listener: TcpListener,
    processor: Arc<Processor>,
    token: CancellationToken,
) -> anyhow::Result<()> {
    let binding_addr = listener.local_addr()?;

    let jsonrpc_handler = MetaIoHandler::with_middleware(NodeRpcMiddleware);
    let jsonrpc_state = Arc::new(JsonRpcState {
        processor: processor.clone(),
        io_handler: jsonrpc_handler,
    });

    let status_state = Arc::new(StatusState { processor });

    let axum_make_service = Router::new()
        .route("/", post(jsonrpc_io_handler).with_state(jsonrpc_state))
        .route("/status", get(status_handler).with_state(status_state))
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY))
        .layer(CorsLayer::permissive())
        .layer(axum::middleware::from_fn(node_info_header))
        .into_make_service();

    tracing::info!("JSON-RPC endpoint: http://{binding_addr}");
    axum::Server::from_tcp(listener)?
        .serve(axum_make_service)
        .with_graceful_shutdown(async move { token.cancelled().await })
        .await?;
    tracing::info!("JSON-RPC endpoint {binding_addr} stopped");
    Ok(())
}

async fn jsonrpc_io_handler<M>(
    State(state): State<Arc<JsonRpcState<M>>>,
    body: String,
) -> std::result::Result<JsonResponse, HttpError>
where
    M: jsonrpc_core::Middleware<Arc<Processor>>,
{
    let r = state
        .io_handler
        .handle_request(&body, state.processor.clone())
        .await
        .ok_or(HttpError::BadRequest)?;
    Ok(JsonResponse(r))
}

async fn node_info_header<B>(
    req: http::Request<B>,
    next: axum::middleware::Next<B>,
) -> axum::response::Response {
    let mut res = next.run(req).await;
    let headers = res.headers_mut();

    if let Ok(version) = http::HeaderValue::from_str(crate::util::build_version().as_str()) {
        headers.insert("X-NODE-VERSION", version);
    }
    res
}

/// Routing state of the node, as served on `/status`.
#[derive(Debug, Clone, Serialize)]
pub struct NodeStatus {
    /// This node.
    pub node: crate::prelude::NodeIp,
    /// Known predecessor.
    pub predecessor: Option<crate::prelude::NodeIp>,
    /// Successor list, immediate successor first.
    pub successors: Vec<crate::prelude::NodeIp>,
}

async fn status_handler(
    State(state): State<Arc<StatusState>>,
) -> std::result::Result<axum::Json<NodeStatus>, HttpError> {
    let info = state
        .processor
        .topo_info()
        .map_err(|_| HttpError::Internal)?;
    Ok(axum::Json(NodeStatus {
        node: info.node,
        predecessor: info.predecessor,
        successors: info.successors,
    }))
}

/// JSON response struct
#[derive(Debug, Clone)]
pub struct JsonResponse(String);

impl IntoResponse for JsonResponse {
    fn into_response(self) -> axum::response::Response {
        ([("content-type", "application/json")], self.0).into_response()
    }
}

mod jsonrpc_middleware_impl {
    use std::future::Future;

    use chord_rpc::handler::NodeRpcHandler;
    use jsonrpc_core::futures_util::future;
    use jsonrpc_core::futures_util::future::Either;
    use jsonrpc_core::futures_util::FutureExt;
    use jsonrpc_core::middleware::NoopCallFuture;
    use jsonrpc_core::middleware::NoopFuture;
    use jsonrpc_core::*;

    use super::*;

    impl Middleware<Arc<Processor>> for NodeRpcMiddleware {
        type Future = NoopFuture;
        type CallFuture = NoopCallFuture;

        fn on_call<F, X>(
            &self,
            call: Call,
            meta: Arc<Processor>,
            next: F,
        ) -> Either<Self::CallFuture, X>
        where
            F: Fn(Call, Arc<Processor>) -> X + Send + Sync,
            X: Future<Output = Option<Output>> + Send + 'static,
        {
            match call {
                Call::MethodCall(req) => {
                    let fut = NodeRpcHandler
                        .handle_request(meta, req.method, req.params.into())
                        .then(move |res| {
                            future::ready(Some(Output::from(res, req.id, req.jsonrpc)))
                        });
                    Either::Left(Box::pin(fut))
                }
                _ => Either::Left(Box::pin(next(call, meta))),
            }
        }
    }
}

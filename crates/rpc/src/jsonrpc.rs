//! chord-rpc client

use std::time::Duration;

use chord_core::dht::Did;
use chord_core::dht::NodeIp;
use reqwest::Client as HttpClient;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::method::Method;
use crate::types::*;

/// Attempts made for one call before the peer is reported unreachable.
pub const CALL_ATTEMPTS: usize = 3;

/// Default per attempt timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(1000);

/// Wrap json_client send request between nodes.
#[derive(Clone)]
pub struct Client {
    client: HttpClient,
    endpoint_url: String,
}

/// The errors returned by the client.
#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    /// An error returned by the server.
    #[error("Server returned rpc error {0}")]
    JsonClientError(jsonrpc_core::Error),
    /// Failure to parse server response.
    #[error("Failed to parse server response as {0}: {1}")]
    ParseError(String, Box<dyn std::error::Error + Send + Sync>),
    /// Request timed out.
    #[error("Request timed out")]
    Timeout,
    /// The peer answered with a non success HTTP status, such as 413 for a body
    /// over its limit. The peer is alive, so this is not retried.
    #[error("Server replied with HTTP status {0}")]
    HttpStatus(u16),
    /// A general client error.
    #[error("Client error: {0}")]
    Client(String),
}

impl RpcError {
    /// Dial or transport failure, worth another attempt.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Timeout | Self::Client(_))
    }
}

impl From<reqwest::Error> for RpcError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else {
            Self::Client(e.to_string())
        }
    }
}

/// A wrap `Result` contains ClientError.
type Result<T> = std::result::Result<T, RpcError>;

impl Client {
    /// Creates a new Client instance with the specified endpoint URL
    pub fn new(endpoint_url: &str) -> Self {
        Self {
            client: HttpClient::default(),
            endpoint_url: endpoint_url.to_string(),
        }
    }

    /// Client whose every attempt, dial included, is bounded by `timeout`.
    pub fn with_timeout(endpoint_url: &str, timeout: Duration) -> Result<Self> {
        let client = HttpClient::builder()
            .connect_timeout(timeout)
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            endpoint_url: endpoint_url.to_string(),
        })
    }

    /// Endpoint of the node at `addr`.
    pub fn endpoint_of(addr: std::net::SocketAddr) -> String {
        format!("http://{addr}")
    }

    /// Call `method`, retrying up to [CALL_ATTEMPTS] times on transport failure.
    /// An error reply from the server is returned at once.
    pub async fn call_method<T>(&self, method: Method, req: &impl Serialize) -> Result<T>
    where T: DeserializeOwned {
        let mut attempt = 1;
        loop {
            match self.call_method_once(method, req).await {
                Err(e) if e.is_transport() && attempt < CALL_ATTEMPTS => {
                    tracing::debug!(
                        "{} to {} failed on attempt {}: {}",
                        method.as_str(),
                        self.endpoint_url,
                        attempt,
                        e
                    );
                    attempt += 1;
                }
                ret => return ret,
            }
        }
    }

    async fn call_method_once<T>(&self, method: Method, req: &impl Serialize) -> Result<T>
    where T: DeserializeOwned {
        use jsonrpc_core::*;

        let params = serde_json::to_value(req)
            .map_err(|e| RpcError::Client(e.to_string()))?
            .as_object()
            .ok_or(RpcError::Client("params should be an object".to_string()))?
            .clone();

        let jsonrpc_request = Request::Single(Call::MethodCall(MethodCall {
            jsonrpc: Some(Version::V2),
            method: method.to_string(),
            params: Params::Map(params),
            id: Id::Num(1),
        }));

        let result = self.do_jsonrpc_request(&jsonrpc_request).await?;
        serde_json::from_value(result).map_err(|e| RpcError::ParseError(e.to_string(), Box::new(e)))
    }

    async fn do_jsonrpc_request(&self, req: &jsonrpc_core::Request) -> Result<serde_json::Value> {
        let body = serde_json::to_string(req).map_err(|e| RpcError::Client(e.to_string()))?;

        let req = self
            .client
            .post(self.endpoint_url.as_str())
            .header("content-type", "application/json")
            .header("accept", "application/json")
            .body(body);

        let resp = req.send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(RpcError::HttpStatus(status.as_u16()));
        }
        let resp = resp.bytes().await?;

        let jsonrpc_resp = jsonrpc_core::Response::from_json(&String::from_utf8_lossy(&resp))
            .map_err(|e| RpcError::ParseError(e.to_string(), Box::new(e)))?;

        match jsonrpc_resp {
            jsonrpc_core::Response::Single(resp) => match resp {
                jsonrpc_core::Output::Success(success) => Ok(success.result),
                jsonrpc_core::Output::Failure(failure) => {
                    Err(RpcError::JsonClientError(failure.error))
                }
            },
            jsonrpc_core::Response::Batch(_) => Err(RpcError::Client(
                "Batch response is not supported".to_string(),
            )),
        }
    }

    /// Ask the node to run a full lookup of `did`.
    pub async fn find(&self, did: Did) -> Result<FindResponse> {
        self.call_method(Method::Find, &FindRequest::new(did)).await
    }

    /// Ask the node for one routing step towards `did`.
    pub async fn find_successor(&self, did: Did) -> Result<FindResponse> {
        self.call_method(Method::FindSuccessor, &FindSuccessorRequest::new(did))
            .await
    }

    /// Ask the node for its predecessor.
    pub async fn find_predecessor(&self) -> Result<FindResponse> {
        self.call_method(Method::FindPredecessor, &FindPredecessorRequest {})
            .await
    }

    /// Ask the node for its successor list.
    pub async fn find_all_successors(&self) -> Result<FindAllSuccessorsResponse> {
        self.call_method(Method::FindAllSuccessors, &FindAllSuccessorsRequest {})
            .await
    }

    /// Tell the node that `node` may be its predecessor.
    pub async fn notify(&self, node: NodeIp) -> Result<NotifyResponse> {
        self.call_method(Method::Notify, &NotifyRequest {
            node_ip_notify: node,
        })
        .await
    }

    /// Ship a file to the node.
    pub async fn store_file(&self, name: &str, data: &[u8]) -> Result<StoreFileResponse> {
        self.call_method(Method::StoreFile, &StoreFileRequest::new(name, data))
            .await
    }
}

//! Error of chord_rpc

/// A wrap `Result` contains custom errors.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors enum mapping global custom errors.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    #[error("Invalid method.")]
    InvalidMethod,
    #[error("Rpc error: {0}")]
    RpcError(#[from] crate::jsonrpc::RpcError),
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),
    #[error("Invalid file data: {0}")]
    InvalidFileData(#[from] base64::DecodeError),
    #[error("Reply claims a node but carries none.")]
    EmptyReply,
}

//! A bunch of wrap errors.
use std::net::SocketAddr;

use crate::prelude::chord_core;
use crate::prelude::chord_rpc;

/// A wrap `Result` contains custom errors.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors enum mapping global custom errors.
/// The error type can be expressed in decimal, where the high decs represent
/// the error category and the low decs represent the error type.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
#[repr(u32)]
pub enum Error {
    #[error("Connect remote rpc server failed: {0}.")]
    RemoteRpcError(String) = 100,
    #[error("Unknown rpc error.")]
    UnknownRpcError = 101,
    #[error("Internal rpc services error: {0}.")]
    InternalRpcError(#[from] jsonrpc_core::Error) = 102,
    #[error("Decode error.")]
    DecodeError = 300,
    #[error("Invalid did: {0}")]
    InvalidDid(String) = 500,
    #[error("Invalid method.")]
    InvalidMethod = 501,
    #[error("Internal error: {0}.")]
    InternalError(chord_core::error::Error) = 502,
    #[error("Failed to bind {addr}: {reason}")]
    BindError { addr: SocketAddr, reason: String } = 600,
    #[error("Invalid data")]
    InvalidData = 802,
    #[error("Please use a valid IP address for {flag}, got {value:?}")]
    InvalidAddress { flag: &'static str, value: String } = 804,
    #[error("Invalid logging level: {0}")]
    InvalidLoggingLevel(String) = 809,
    #[error("Create File Error: {0}")]
    CreateFileError(String) = 900,
    #[error("Open File Error: {0}")]
    OpenFileError(String) = 901,
    #[error("Cannot find home directory")]
    HomeDirError = 903,
    #[error("Cannot find parent directory")]
    ParentDirError = 904,
    #[error("IO error: {0}")]
    IOError(#[from] std::io::Error) = 905,
    #[error("Serde yaml error: {0}")]
    SerdeYamlError(#[from] serde_yaml::Error) = 1001,
    #[error("Core error: {0}")]
    CoreError(#[from] chord_core::error::Error) = 1102,
    #[error("Missing required option {0}")]
    MissingOption(&'static str) = 1500,
    #[error("Please use a number between 1024 and 65535 as a port number for {flag}, got {value}")]
    InvalidPort { flag: &'static str, value: u32 } = 1501,
    #[error("Please use a number between 1 and 60000 as a value for {flag}, got {value}")]
    InvalidInterval { flag: &'static str, value: u64 } = 1502,
    #[error("Please use a number between 1 and 32 as a value for -r, got {0}")]
    InvalidSuccessorLength(u32) = 1503,
    #[error("Please use an identifier of 40 hex characters for -i: {0}")]
    InvalidIdentifier(chord_core::error::Error) = 1504,
    #[error("Please use either both -ja and -jp, or neither of them")]
    PartialJoinTarget = 1505,
    #[error("The join target {0} is this node itself")]
    JoinTargetIsSelf(SocketAddr) = 1506,
    #[error("Illegal file name {0:?}, make sure there is no \"-\"")]
    IllegalFileName(String) = 1600,
    #[error("File {0} does not exist")]
    LocalFileNotFound(String) = 1601,
    #[error("File location of {0} is not found")]
    FileLocationNotFound(String) = 1602,
}

impl Error {
    fn discriminant(&self) -> u32 {
        // SAFETY: Because `Self` is marked `repr(u32)`, its layout is a `repr(C)` `union`
        // between `repr(C)` structs, each of which has the `u32` discriminant as its first
        // field, so we can read the discriminant without offsetting the pointer.
        // ref: https://doc.rust-lang.org/std/mem/fn.discriminant.html
        unsafe { *<*const _>::from(self).cast::<u32>() }
    }

    pub fn code(&self) -> u32 {
        self.discriminant()
    }
}

impl From<Error> for jsonrpc_core::Error {
    fn from(e: Error) -> Self {
        Self {
            code: jsonrpc_core::ErrorCode::ServerError(e.code().into()),
            message: e.to_string(),
            data: None,
        }
    }
}

impl From<chord_rpc::error::Error> for Error {
    fn from(e: chord_rpc::error::Error) -> Self {
        match e {
            chord_rpc::error::Error::InvalidMethod => Error::InvalidMethod,
            chord_rpc::error::Error::RpcError(v) => Error::RemoteRpcError(v.to_string()),
            chord_rpc::error::Error::InvalidIdentifier(s) => Error::InvalidDid(s),
            chord_rpc::error::Error::InvalidFileData(_) => Error::InvalidData,
            chord_rpc::error::Error::EmptyReply => Error::DecodeError,
            _ => Error::UnknownRpcError,
        }
    }
}

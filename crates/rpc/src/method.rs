//! Rpc methods.
#![warn(missing_docs)]

use super::error::Error;
use super::error::Result;

/// supported methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum Method {
    /// Full lookup run by the callee
    Find,
    /// One routing step
    FindSuccessor,
    /// Predecessor of the callee
    FindPredecessor,
    /// Successor list of the callee
    FindAllSuccessors,
    /// Predecessor candidate announcement
    Notify,
    /// Store a file on the callee
    StoreFile,
}

impl Method {
    /// Return method's name as `&str`
    pub fn as_str(&self) -> &str {
        match self {
            Method::Find => "Node.RPCFind",
            Method::FindSuccessor => "Node.RPCFindSuccessor",
            Method::FindPredecessor => "Node.RPCFindPredecessor",
            Method::FindAllSuccessors => "Node.RPCFindAllSuccessors",
            Method::Notify => "Node.RPCNotify",
            Method::StoreFile => "Node.RPCStoreFile",
        }
    }
}

#[allow(clippy::to_string_trait_impl)]
impl ToString for Method {
    fn to_string(&self) -> String {
        self.as_str().to_owned()
    }
}

impl TryFrom<&str> for Method {
    type Error = crate::error::Error;

    fn try_from(value: &str) -> Result<Self> {
        Ok(match value {
            "Node.RPCFind" => Self::Find,
            "Node.RPCFindSuccessor" => Self::FindSuccessor,
            "Node.RPCFindPredecessor" => Self::FindPredecessor,
            "Node.RPCFindAllSuccessors" => Self::FindAllSuccessors,
            "Node.RPCNotify" => Self::Notify,
            "Node.RPCStoreFile" => Self::StoreFile,
            _ => return Err(Error::InvalidMethod),
        })
    }
}

//! Wire contract between chord ring nodes.
//!
//! Calls are JSON-RPC 2.0 over HTTP POST, method names follow the `Node.RPC*` scheme
//! and params are objects with the field names defined in [types].
pub mod error;
pub mod handler;
pub mod jsonrpc;
pub mod method;
pub mod types;

/// Re-exported crates the callers build on.
pub mod prelude {
    pub use chord_core;
    pub use jsonrpc_core;
    pub use reqwest;
}

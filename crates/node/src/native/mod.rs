//! Native runtime of the node: configuration and the HTTP endpoint.
pub mod config;
pub mod endpoint;

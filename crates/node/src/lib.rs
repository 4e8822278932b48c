//! A Chord ring node.
//!
//! [processor::Processor] owns the [chord_core::swarm::Swarm] and its stabilizer,
//! [native::endpoint] serves the `Node.RPC*` methods over HTTP, [transport] carries the
//! outbound calls and [frontend] is the line oriented control plane.
pub mod error;
pub mod frontend;
pub mod logging;
pub mod native;
pub mod prelude;
pub mod processor;
mod rpc_impl;
pub mod transport;
pub mod util;

//! Chord ring core.
//!
//! A node joins a 160-bit identifier ring, keeps its routing state (finger table,
//! successor list and predecessor) correct under churn with three periodic tasks,
//! and answers "who owns this key" with an iterative, bounded lookup.
//! The wire transport is abstracted behind [swarm::transport::ChordTransport].
pub mod consts;
pub mod dht;
pub mod error;
pub mod storage;
pub mod swarm;
#[cfg(test)]
mod tests;

pub use async_trait::async_trait;

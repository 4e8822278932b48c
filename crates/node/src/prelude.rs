//! A prelude is provided which imports the data types a node is driven with.
pub use chord_core;
pub use chord_rpc;

pub use self::chord_core::dht::Did;
pub use self::chord_core::dht::NodeIp;
pub use self::chord_core::dht::StabilizeIntervals;
pub use self::chord_core::dht::Stabilizer;
pub use self::chord_core::dht::TopoInfo;
pub use self::chord_core::swarm::transport::ChordTransport;
pub use self::chord_core::swarm::Swarm;
pub use self::chord_core::swarm::SwarmBuilder;

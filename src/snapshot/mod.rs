mod collect;
mod graph;
mod parse;

pub use collect::load_snapshot;
#[cfg(test)]
pub use collect::snapshot_from_json;
#[cfg(test)]
pub use graph::GeoLocation;
pub use graph::{Histogram, Metric, NetworkClass, PeerRecord, Snapshot};

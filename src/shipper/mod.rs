pub mod batch;
pub mod registry;
pub mod stats;
pub mod sweeper;

pub use batch::{Batch, BatchLimits, Destination, LogEvent};
pub use registry::{BatchRegistry, DropReason, EventOutcome, SourceSnapshot, SweepReport};
pub use stats::{ShipperStats, StatsSnapshot};
pub use sweeper::Sweeper;

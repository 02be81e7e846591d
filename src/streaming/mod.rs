//! Sector streaming: view targets, the show/hide work queue and background generation

pub mod queue;
pub mod sector_loader;
pub mod streamer;
pub mod view;

pub use queue::{SectorOp, SectorWork, WorkQueue};
pub use sector_loader::{GenerationResult, SectorLoader};
pub use streamer::{SectorState, SectorStreamer};
pub use view::{DistanceMetric, StreamingConfig, sectors_in_view};

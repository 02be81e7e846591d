//! Error types for the world core

use thiserror::Error;

use crate::voxel::sector::{BlockPos, SectorCoord};

/// Main error type for the world core
///
/// Every mutation that returns one of these has left the world exactly as it
/// was before the call.
#[derive(Debug, Error)]
pub enum Error {
    /// The sector governing a position has never been generated or registered.
    #[error("sector {0} is not loaded")]
    NotLoaded(SectorCoord),

    /// Attempt to remove or overwrite an indestructible block.
    #[error("block at {0} is indestructible")]
    Protected(BlockPos),

    #[error("invalid block: {0}")]
    InvalidBlock(String),

    /// Placement beyond the horizontal enclosure of a bounded world.
    #[error("position {0} is outside the world enclosure")]
    OutsideEnclosure(BlockPos),

    #[error("corrupt save: {0}")]
    CorruptSave(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

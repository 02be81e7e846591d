//! Blockworld - a sector-streamed voxel world core

pub mod core;
pub mod math;
pub mod persistence;
pub mod streaming;
pub mod terrain;
pub mod voxel;

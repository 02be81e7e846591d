//! Procedural terrain generation

pub mod config;
pub mod generator;
pub mod strata;
pub mod trees;

pub use config::{EnclosureConfig, GeneratorConfig};
pub use generator::{GeneratedSector, SectorBuilder, TerrainGenerator};

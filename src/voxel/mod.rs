//! Voxel data structures and operations

pub mod block;
pub mod block_map;
pub mod query;
pub mod sector;
pub mod visibility;
pub mod world;

pub use block::{BlockProperties, BlockType};
pub use block_map::BlockMap;
pub use query::{Boundary, Collision, DEFAULT_HIT_DISTANCE, Hit};
pub use sector::{BlockPos, FACES, MAX_SECTOR, MIN_SECTOR, SECTOR_SIZE, SectorCoord, sector_of};
pub use visibility::{RenderEvent, VisibilityEngine};
pub use world::{World, WorldStats};

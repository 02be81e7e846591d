//! Read-only spatial queries: block picking and collision.
//!
//! Everything here borrows the block map immutably and never mutates it.

use super::block_map::BlockMap;
use super::sector::{BlockPos, FACES, sector_of};
use crate::core::types::Vec3;
use crate::math::Ray;

/// Default reach of block picking, in blocks
pub const DEFAULT_HIT_DISTANCE: f32 = 16.0;

/// Ray samples per block during picking
pub const HIT_STEPS_PER_BLOCK: u32 = 8;

/// Overlap with a neighbouring block tolerated before collision pushes back.
/// At 0 touching terrain collides; at 0.5 or more entities fall through.
pub const COLLISION_PAD: f32 = 0.25;

/// Lowest height an entity can reach in a world without terrain
pub const VIRTUAL_FLOOR_Y: f32 = -1.25;

/// Result of block picking.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Hit {
    /// First solid block along the ray
    pub block: BlockPos,
    /// Last empty block sampled before it; `None` when the ray starts inside
    /// a solid block
    pub previous: Option<BlockPos>,
}

/// Outcome of collision resolution.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Collision {
    pub position: Vec3,
    /// The entity rests on something (floor face or virtual floor)
    pub grounded: bool,
    /// A floor or ceiling was hit; vertical velocity should be zeroed
    pub stop_vertical: bool,
}

/// Hard limit applied after block collision.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Boundary {
    /// No terrain: entities cannot sink below `y`
    VirtualFloor { y: f32 },
    /// Entities are kept within `±half_size` in x and z
    Enclosure { half_size: f32 },
    Open,
}

/// Emptiness test. With `must_be_loaded`, unloaded space is reported as
/// solid; otherwise it is reported as empty.
pub fn is_empty(blocks: &BlockMap, pos: BlockPos, must_be_loaded: bool) -> bool {
    if must_be_loaded && !blocks.is_loaded(sector_of(pos)) {
        return false;
    }
    blocks.is_empty(pos)
}

/// Find the first block along a line of sight.
///
/// Unloaded space is treated as empty, so picking never reaches into
/// ungenerated terrain.
pub fn hit_test(blocks: &BlockMap, origin: Vec3, direction: Vec3, max_distance: f32) -> Option<Hit> {
    let ray = Ray::new(origin, direction);
    let mut previous = None;
    for block in ray.march(max_distance, HIT_STEPS_PER_BLOCK) {
        if !is_empty(blocks, block, false) {
            return Some(Hit { block, previous });
        }
        previous = Some(block);
    }
    None
}

/// Push an entity of `height` blocks out of solid terrain.
///
/// `position` is the top block of the entity; it occupies `height` blocks
/// downward from there. Each axis of each face is checked independently
/// against the rounded position, and unloaded space counts as solid.
pub fn resolve_collision(blocks: &BlockMap, position: Vec3, height: u32, boundary: Boundary) -> Collision {
    let mut p = position.to_array();
    let np = BlockPos::from_world_pos(position).as_ivec3().to_array();
    let mut grounded = false;
    let mut stop_vertical = false;

    for face in FACES {
        let f = face.to_array();
        for i in 0..3 {
            if f[i] == 0 {
                continue;
            }
            let overlap = (p[i] - np[i] as f32) * f[i] as f32;
            if overlap < COLLISION_PAD {
                continue;
            }
            for dy in 0..height as i32 {
                let mut cell = np;
                cell[1] = cell[1].wrapping_sub(dy);
                cell[i] = cell[i].wrapping_add(f[i]);
                if is_empty(blocks, BlockPos::new(cell[0], cell[1], cell[2]), true) {
                    continue;
                }
                p[i] -= (overlap - COLLISION_PAD) * f[i] as f32;
                if face.y != 0 {
                    stop_vertical = true;
                    grounded |= face.y < 0;
                }
                break;
            }
        }
    }

    match boundary {
        Boundary::VirtualFloor { y } => {
            if p[1] < y {
                p[1] = y;
                grounded = true;
                stop_vertical = true;
            }
        }
        Boundary::Enclosure { half_size } => {
            p[0] = p[0].clamp(-half_size, half_size);
            p[2] = p[2].clamp(-half_size, half_size);
        }
        Boundary::Open => {}
    }

    Collision {
        position: Vec3::from_array(p),
        grounded,
        stop_vertical,
    }
}

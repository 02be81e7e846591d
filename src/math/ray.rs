//! Ray type and block marching

use crate::core::types::Vec3;
use crate::voxel::BlockPos;

/// A ray defined by origin and unit direction
#[derive(Clone, Copy, Debug)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    /// Create a new ray. The direction is normalized; a zero direction stays zero.
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize_or_zero(),
        }
    }

    /// Get point along ray at parameter t
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// Walk the blocks crossed by the ray by fixed-size sampling.
    ///
    /// Samples are taken every `1 / steps_per_block` units for
    /// `max_distance * steps_per_block` samples, starting at the origin. Each
    /// sample is rounded to its block and consecutive repeats are skipped.
    pub fn march(&self, max_distance: f32, steps_per_block: u32) -> BlockMarch {
        let steps_per_block = steps_per_block.max(1);
        BlockMarch {
            ray: *self,
            step: 1.0 / steps_per_block as f32,
            remaining: (max_distance.max(0.0) * steps_per_block as f32) as u32,
            index: 0,
            last: None,
        }
    }
}

/// Iterator over the distinct blocks sampled along a ray.
#[derive(Clone, Debug)]
pub struct BlockMarch {
    ray: Ray,
    step: f32,
    remaining: u32,
    index: u32,
    last: Option<BlockPos>,
}

impl Iterator for BlockMarch {
    type Item = BlockPos;

    fn next(&mut self) -> Option<BlockPos> {
        while self.remaining > 0 {
            self.remaining -= 1;
            let point = self.ray.at(self.index as f32 * self.step);
            self.index += 1;
            let block = BlockPos::from_world_pos(point);
            if self.last != Some(block) {
                self.last = Some(block);
                return Some(block);
            }
        }
        None
    }
}

//! Height-to-strata lookup used by the hill generator.
//!
//! Each entry gives a column height and its layers from bottom to top. The
//! last layer is the surface; the first is repeated for any remaining depth.

use crate::voxel::BlockType;
use crate::voxel::BlockType::{Dirt, DirtWithGrass, DirtWithSnow, Sand, Snow, Water};

#[derive(Clone, Copy, Debug)]
pub struct Stratum {
    pub height: i32,
    pub layers: &'static [BlockType],
}

const fn s(height: i32, layers: &'static [BlockType]) -> Stratum {
    Stratum { height, layers }
}

const GRASS_HILL: &[BlockType] = &[Dirt, DirtWithGrass];
const SNOW_PEAK: &[BlockType] = &[Dirt, DirtWithSnow, Snow, Snow];

/// Ordered from lowest (sea) to highest (snow caps).
pub static STRATA: [Stratum; 31] = [
    s(1, &[Water]),
    s(1, &[Water]),
    s(1, &[Water]),
    s(1, &[Water]),
    s(1, &[Water]),
    s(1, &[Water]),
    s(1, &[Sand]),
    s(1, &[Sand]),
    s(2, &[Sand]),
    s(1, &[Sand]),
    s(1, &[Sand]),
    s(1, &[DirtWithGrass]),
    s(1, &[DirtWithGrass]),
    s(2, GRASS_HILL),
    s(2, GRASS_HILL),
    s(3, GRASS_HILL),
    s(4, GRASS_HILL),
    s(4, GRASS_HILL),
    s(5, GRASS_HILL),
    s(5, GRASS_HILL),
    s(6, GRASS_HILL),
    s(6, GRASS_HILL),
    s(7, &[Dirt]),
    s(8, &[Dirt]),
    s(9, &[Dirt]),
    s(10, &[Dirt, DirtWithSnow]),
    s(11, &[Dirt, DirtWithSnow, Snow]),
    s(12, SNOW_PEAK),
    s(13, SNOW_PEAK),
    s(14, SNOW_PEAK),
    s(15, SNOW_PEAK),
];

impl Stratum {
    /// Block `depth` layers below the surface (0 = surface).
    pub fn block_at_depth(&self, depth: usize) -> BlockType {
        let n = self.layers.len();
        if depth < n {
            self.layers[n - 1 - depth]
        } else {
            self.layers[0]
        }
    }

    pub fn surface(&self) -> BlockType {
        self.block_at_depth(0)
    }
}

/// Map a noise sample in [-1, 1] to a stratum.
pub fn stratum_for(noise: f64) -> &'static Stratum {
    let index = ((noise + 1.0) * 0.5 * STRATA.len() as f64) as isize;
    let index = index.clamp(0, STRATA.len() as isize - 1) as usize;
    &STRATA[index]
}

//! Tree placement and block shapes.
//!
//! Trees are placed per tree patch (a square of columns) from an RNG seeded by
//! the world seed and the patch origin. Every sector overlapping a patch
//! replays the same placements and keeps only its own blocks, so trees
//! crossing a sector border come out whole.

use super::config::GeneratorConfig;
use super::generator::SectorBuilder;
use super::strata::Stratum;
use crate::voxel::BlockType;
use crate::voxel::SectorCoord;

/// Deterministic PRNG for tree placement
pub(crate) struct SimpleRng {
    state: u64,
}

impl SimpleRng {
    pub(crate) fn new(seed: u64) -> Self {
        Self { state: seed.wrapping_add(1) }
    }

    fn next_u32(&mut self) -> u32 {
        // PCG-like state update
        self.state = self.state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        let mut h = (self.state >> 32) as u32;
        h = h.wrapping_mul(0x45d9f3b);
        h ^= h >> 16;
        h = h.wrapping_mul(0x45d9f3b);
        h ^= h >> 16;
        h
    }

    /// Integer in `min..=max`
    pub(crate) fn range_inclusive(&mut self, min: i32, max: i32) -> i32 {
        if max <= min {
            return min;
        }
        let span = (max - min + 1) as u32;
        min + (self.next_u32() % span) as i32
    }
}

/// Seed for one tree patch.
fn patch_seed(seed: u32, root_x: i32, root_z: i32) -> u64 {
    let mut h = (root_x as u32)
        .wrapping_mul(374761393)
        .wrapping_add((root_z as u32).wrapping_mul(668265263))
        .wrapping_add(seed.wrapping_mul(1274126177));
    h = (h ^ (h >> 13)).wrapping_mul(1103515245);
    h ^= h >> 16;
    ((seed as u64) << 32) | h as u64
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TreeKind {
    /// Broadleaf tree with a rounded crown
    Default,
    /// Narrow conifer on high ground
    Fir,
    /// Palm with radial fronds, on sand
    Coconut,
}

/// One tree: trunk base and total height.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TreePlacement {
    pub kind: TreeKind,
    pub x: i32,
    pub y: i32,
    pub z: i32,
    pub height: i32,
}

/// Origin (min x, min z) of every tree patch overlapping a sector.
fn patch_roots(config: &GeneratorConfig, sector: SectorCoord) -> Vec<(i32, i32)> {
    let patch = config.tree_patch_size;
    let min = sector.min_block();
    let last = sector.last_block();
    let first_x = min.x.div_euclid(patch);
    let last_x = last.x.div_euclid(patch);
    let first_z = min.z.div_euclid(patch);
    let last_z = last.z.div_euclid(patch);

    let mut roots = Vec::new();
    for px in first_x..=last_x {
        for pz in first_z..=last_z {
            if let (Some(rx), Some(rz)) = (px.checked_mul(patch), pz.checked_mul(patch)) {
                roots.push((rx, rz));
            }
        }
    }
    roots
}

fn crown_safe(v: i64) -> Option<i32> {
    i32::try_from(v).ok().filter(|v| (i32::MIN + 3..=i32::MAX - 3).contains(v))
}

/// All trees of the patch rooted at (`root_x`, `root_z`).
///
/// `surface` returns the stratum and top block height of a column.
pub fn plan_patch(
    config: &GeneratorConfig,
    root_x: i32,
    root_z: i32,
    surface: impl Fn(i32, i32) -> (&'static Stratum, i32),
) -> Vec<TreePlacement> {
    let mut rng = SimpleRng::new(patch_seed(config.seed, root_x, root_z));
    let count = rng.range_inclusive(0, config.max_trees_per_patch as i32);
    let margin = config.tree_patch_size - 7;

    let mut trees = Vec::new();
    for _ in 0..count {
        let x = root_x as i64 + 3 + rng.range_inclusive(0, margin) as i64;
        let z = root_z as i64 + 3 + rng.range_inclusive(0, margin) as i64;
        // Consumed even when the tree is rejected so later trees don't shift.
        let roll = rng.next_u32();

        // Crowns reach 3 blocks out from the trunk
        let (Some(x), Some(z)) = (crown_safe(x), crown_safe(z)) else {
            continue;
        };

        if let Some(enclosure) = &config.enclosure {
            let n = enclosure.half_size - 3;
            if x < -n + 2 || x > n - 2 || z < -n + 2 || z > n - 2 {
                continue;
            }
        }

        let (stratum, top) = surface(x, z);
        let relief = top - config.floor_level();
        let (kind, min_h, max_h) = match stratum.surface() {
            BlockType::Sand => (TreeKind::Coconut, 4, 5),
            BlockType::Dirt | BlockType::DirtWithGrass if top - config.ground_level > 6 => {
                (TreeKind::Fir, 3, 5)
            }
            BlockType::Dirt | BlockType::DirtWithGrass => (TreeKind::Default, 3, 7 - relief / 3),
            _ => continue,
        };
        let height = min_h + (roll % (max_h - min_h + 1).max(1) as u32) as i32;
        trees.push(TreePlacement { kind, x, y: top + 1, z, height });
    }
    trees
}

/// Plant every tree touching `builder`'s sector.
pub fn generate_trees(
    config: &GeneratorConfig,
    builder: &mut SectorBuilder,
    surface: impl Fn(i32, i32) -> (&'static Stratum, i32),
) {
    for (root_x, root_z) in patch_roots(config, builder.sector()) {
        for tree in plan_patch(config, root_x, root_z, &surface) {
            build_tree(builder, tree);
        }
    }
}

pub fn build_tree(builder: &mut SectorBuilder, tree: TreePlacement) {
    match tree.kind {
        TreeKind::Default => default_tree(builder, tree),
        TreeKind::Fir => fir_tree(builder, tree),
        TreeKind::Coconut => coconut_tree(builder, tree),
    }
}

fn plus(builder: &mut SectorBuilder, x: i32, y: i32, z: i32, block: BlockType) {
    builder.set(x, y, z, block);
    builder.set(x - 1, y, z, block);
    builder.set(x + 1, y, z, block);
    builder.set(x, y, z - 1, block);
    builder.set(x, y, z + 1, block);
}

fn square(builder: &mut SectorBuilder, x: i32, y: i32, z: i32, block: BlockType) {
    for dx in -1..=1 {
        for dz in -1..=1 {
            builder.set(x + dx, y, z + dz, block);
        }
    }
}

fn small_tree(builder: &mut SectorBuilder, t: TreePlacement) -> bool {
    match t.height {
        h if h <= 0 => true,
        1 => {
            plus(builder, t.x, t.y, t.z, BlockType::Leaves);
            true
        }
        2 => {
            builder.set(t.x, t.y, t.z, BlockType::Log);
            builder.set(t.x, t.y + 1, t.z, BlockType::Leaves);
            true
        }
        _ => false,
    }
}

fn default_tree(builder: &mut SectorBuilder, t: TreePlacement) {
    if small_tree(builder, t) {
        return;
    }
    let mut y = t.y;
    let trunk = if t.height >= 4 { 2 } else { 1 };
    for _ in 0..trunk {
        builder.set(t.x, y, t.z, BlockType::Log);
        y += 1;
    }
    plus(builder, t.x, y, t.z, BlockType::Leaves);
    y += 1;
    for _ in 0..(t.height - 4).max(0) {
        square(builder, t.x, y, t.z, BlockType::Leaves);
        y += 1;
    }
    plus(builder, t.x, y, t.z, BlockType::Leaves);
}

fn fir_tree(builder: &mut SectorBuilder, t: TreePlacement) {
    if small_tree(builder, t) {
        return;
    }
    let mut y = t.y;
    builder.set(t.x, y, t.z, BlockType::Log);
    y += 1;
    square(builder, t.x, y, t.z, BlockType::Leaves);
    builder.set(t.x, y, t.z, BlockType::Log);
    y += 1;
    let layers = (t.height - 2) / 2;
    for _ in 0..layers {
        plus(builder, t.x, y, t.z, BlockType::Leaves);
        builder.set(t.x, y, t.z, BlockType::Log);
        y += 1;
    }
    for _ in 0..layers {
        builder.set(t.x, y, t.z, BlockType::Leaves);
        y += 1;
    }
}

fn coconut_tree(builder: &mut SectorBuilder, t: TreePlacement) {
    let mut y = t.y;
    for _ in 0..(t.height - 1) {
        builder.set(t.x, y, t.z, BlockType::Log);
        y += 1;
    }
    let fronds = match t.height {
        h if h >= 6 => 3,
        5 => 2,
        _ => 1,
    };
    for r in 1..=fronds.min(2) {
        builder.set(t.x + r, y, t.z, BlockType::Leaves);
        builder.set(t.x - r, y, t.z, BlockType::Leaves);
        builder.set(t.x, y, t.z + r, BlockType::Leaves);
        builder.set(t.x, y, t.z - r, BlockType::Leaves);
    }
    if fronds == 3 {
        // Outer fronds droop one block.
        let y = y - 1;
        builder.set(t.x + 3, y, t.z, BlockType::Leaves);
        builder.set(t.x - 3, y, t.z, BlockType::Leaves);
        builder.set(t.x, y, t.z + 3, BlockType::Leaves);
        builder.set(t.x, y, t.z - 3, BlockType::Leaves);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terrain::strata::STRATA;
    use crate::voxel::{BlockPos, SECTOR_SIZE};

    fn grass_surface(_x: i32, _z: i32) -> (&'static Stratum, i32) {
        (&STRATA[15], 5)
    }

    #[test]
    fn test_rng_is_deterministic() {
        let mut a = SimpleRng::new(42);
        let mut b = SimpleRng::new(42);
        for _ in 0..32 {
            assert_eq!(a.range_inclusive(0, 100), b.range_inclusive(0, 100));
        }
        let mut c = SimpleRng::new(7);
        for _ in 0..32 {
            let v = c.range_inclusive(3, 5);
            assert!((3..=5).contains(&v));
        }
    }

    #[test]
    fn test_patch_plan_is_stable() {
        let config = GeneratorConfig { max_trees_per_patch: 20, ..Default::default() };
        let a = plan_patch(&config, 0, 32, grass_surface);
        let b = plan_patch(&config, 0, 32, grass_surface);
        assert_eq!(a, b);
        for tree in &a {
            assert!(tree.x >= 3 && tree.x <= 32 - 4);
            assert!(tree.z >= 35 && tree.z <= 64 - 4);
            assert_eq!(tree.y, 6);
            assert_eq!(tree.kind, TreeKind::Default);
        }
    }

    #[test]
    fn test_patches_at_world_edge_stay_in_range() {
        let config = GeneratorConfig {
            max_trees_per_patch: 20,
            enclosure: None,
            ..Default::default()
        };
        let patch = config.tree_patch_size;
        let root = i32::MAX.div_euclid(patch) * patch;
        for tree in plan_patch(&config, root, root, grass_surface) {
            assert!(tree.x <= i32::MAX - 3 && tree.z <= i32::MAX - 3);
        }
        let edge = SectorCoord::new(i32::MAX / SECTOR_SIZE, 0, i32::MIN / SECTOR_SIZE);
        assert!(!patch_roots(&config, edge).is_empty());
    }

    #[test]
    fn test_no_trees_on_water() {
        let config = GeneratorConfig { max_trees_per_patch: 20, ..Default::default() };
        let trees = plan_patch(&config, 0, 0, |_, _| (&STRATA[0], 3));
        assert!(trees.is_empty());
    }

    #[test]
    fn test_sand_grows_coconut_trees() {
        let config = GeneratorConfig { max_trees_per_patch: 20, ..Default::default() };
        let trees = plan_patch(&config, 0, 0, |_, _| (&STRATA[6], 3));
        assert!(trees.iter().all(|t| t.kind == TreeKind::Coconut));
        assert!(trees.iter().all(|t| (4..=5).contains(&t.height)));
    }

    #[test]
    fn test_default_tree_shape() {
        let sector = SectorCoord::new(0, 0, 0);
        let mut builder = SectorBuilder::new(sector);
        build_tree(
            &mut builder,
            TreePlacement { kind: TreeKind::Default, x: 8, y: 2, z: 8, height: 5 },
        );
        let blocks = builder.finish().blocks;
        assert_eq!(blocks.get(&BlockPos::new(8, 2, 8)), Some(&BlockType::Log));
        assert_eq!(blocks.get(&BlockPos::new(8, 3, 8)), Some(&BlockType::Log));
        assert_eq!(blocks.get(&BlockPos::new(9, 4, 8)), Some(&BlockType::Leaves));
        // One full square layer for height 5.
        assert_eq!(blocks.get(&BlockPos::new(9, 5, 9)), Some(&BlockType::Leaves));
        assert_eq!(blocks.get(&BlockPos::new(8, 6, 8)), Some(&BlockType::Leaves));
        assert_eq!(blocks.len(), 2 + 5 + 9 + 5);
    }

    #[test]
    fn test_tree_is_clipped_to_sector() {
        let sector = SectorCoord::new(0, 0, 0);
        let mut builder = SectorBuilder::new(sector);
        build_tree(
            &mut builder,
            TreePlacement { kind: TreeKind::Coconut, x: 0, y: 2, z: 8, height: 5 },
        );
        let blocks = builder.finish().blocks;
        assert!(blocks.keys().all(|p| sector.contains(*p)));
        assert!(!blocks.contains_key(&BlockPos::new(-1, 6, 8)));
        assert_eq!(blocks.get(&BlockPos::new(2, 6, 8)), Some(&BlockType::Leaves));
    }
}

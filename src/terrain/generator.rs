//! Noise-based procedural sector generation

use std::collections::HashMap;
use std::fmt;

use noise::{Fbm, MultiFractal, NoiseFn, Perlin};

use super::config::GeneratorConfig;
use super::strata::{Stratum, stratum_for};
use super::trees;
use crate::voxel::{BlockPos, BlockType, SectorCoord};

/// Scales of the three ore noises, rarest first
const GOLD_SCALE: f64 = 64.0;
const IRON_SCALE: f64 = 32.0;
const COAL_SCALE: f64 = 16.0;

/// Height above the floor through which hills and trees can reach
const RELIEF_RANGE: i32 = 20;

/// Blocks of one generated sector.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GeneratedSector {
    pub coord: SectorCoord,
    pub blocks: HashMap<BlockPos, BlockType>,
}

impl GeneratedSector {
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

/// Accumulates the blocks of one sector, discarding writes outside it.
/// Later writes overwrite earlier ones.
pub struct SectorBuilder {
    sector: SectorCoord,
    blocks: HashMap<BlockPos, BlockType>,
}

impl SectorBuilder {
    pub fn new(sector: SectorCoord) -> Self {
        Self {
            sector,
            blocks: HashMap::new(),
        }
    }

    pub fn sector(&self) -> SectorCoord {
        self.sector
    }

    pub fn set(&mut self, x: i32, y: i32, z: i32, block: BlockType) {
        let pos = BlockPos::new(x, y, z);
        if self.sector.contains(pos) && !block.is_air() {
            self.blocks.insert(pos, block);
        }
    }

    pub fn is_empty(&self, pos: BlockPos) -> bool {
        !self.blocks.contains_key(&pos)
    }

    pub fn finish(self) -> GeneratedSector {
        GeneratedSector {
            coord: self.sector,
            blocks: self.blocks,
        }
    }
}

fn fbm(seed: u32, octaves: usize, persistence: f64) -> Fbm<Perlin> {
    Fbm::<Perlin>::new(seed)
        .set_octaves(octaves)
        .set_persistence(persistence)
        .set_lacunarity(2.0)
}

/// Deterministic terrain generator: the same config and sector always
/// produce the same blocks, across threads and processes.
pub struct TerrainGenerator {
    config: GeneratorConfig,
    terrain: Fbm<Perlin>,
    clouds: Fbm<Perlin>,
    gold: Fbm<Perlin>,
    iron: Fbm<Perlin>,
    coal: Fbm<Perlin>,
}

impl TerrainGenerator {
    pub fn new(config: GeneratorConfig) -> Self {
        let seed = config.seed;
        Self {
            terrain: fbm(seed, 4, 0.5),
            clouds: fbm(seed.wrapping_add(1), 3, 0.5),
            gold: fbm(seed.wrapping_add(2), 2, 0.1),
            iron: fbm(seed.wrapping_add(3), 2, 0.1),
            coal: fbm(seed.wrapping_add(4), 2, 0.1),
            config,
        }
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Stratum and surface block height of column (x, z).
    pub fn column(&self, x: i32, z: i32) -> (&'static Stratum, i32) {
        let scale = self.config.terrain_scale;
        let v = self.terrain.get([x as f64 / scale, z as f64 / scale]);
        let stratum = stratum_for(v);
        (stratum, self.config.floor_level() + stratum.height)
    }

    /// Highest generated terrain block of a column, ignoring trees and clouds.
    pub fn surface_height(&self, x: i32, z: i32) -> i32 {
        if self.config.hills_enabled {
            self.column(x, z).1
        } else {
            self.config.floor_level()
        }
    }

    fn has_cloud(&self, x: i32, z: i32) -> bool {
        let scale = self.config.cloud_scale;
        let v = self.clouds.get([x as f64 / scale, z as f64 / scale]);
        ((v + 1.0) * 0.5) < self.config.cloudiness as f64
    }

    fn stone_at(&self, pos: BlockPos) -> BlockType {
        let sample = |noise: &Fbm<Perlin>, scale: f64| {
            noise.get([pos.x as f64 / scale, pos.y as f64 / scale, pos.z as f64 / scale])
        };
        let v = sample(&self.gold, GOLD_SCALE);
        if v > 0.02 && v < 0.03 {
            return BlockType::GoldOre;
        }
        let v = sample(&self.iron, IRON_SCALE);
        if v > 0.015 && v < 0.03 {
            return BlockType::IronOre;
        }
        let v = sample(&self.coal, COAL_SCALE);
        if v > 0.01 && v < 0.03 {
            return BlockType::CoalOre;
        }
        BlockType::Stone
    }

    /// Generate every block of one sector.
    pub fn generate(&self, sector: SectorCoord) -> GeneratedSector {
        let mut builder = SectorBuilder::new(sector);

        if self.config.enclosure.is_some() {
            self.enclosure(&mut builder);
        }
        if self.config.hills_enabled {
            self.hills(&mut builder);
        } else {
            self.floor(&mut builder);
        }
        if self.config.cloudiness > 0.0 {
            self.clouds(&mut builder);
        }
        if self.config.hills_enabled && self.config.max_trees_per_patch > 0 {
            self.trees(&mut builder);
        }
        if self.config.enclosure.is_none() {
            self.underground(&mut builder);
        }

        let generated = builder.finish();
        log::debug!("Generated sector {} ({} blocks)", sector, generated.len());
        generated
    }

    fn enclosure(&self, builder: &mut SectorBuilder) {
        let Some(enclosure) = self.config.enclosure else {
            return;
        };
        let floor = self.config.floor_level();
        let height = enclosure.wall_height;
        let sector = builder.sector();
        if !sector.contains_y_range(floor, floor + height) {
            return;
        }
        let n = enclosure.half_size;
        for (x, z) in sector.columns() {
            if !enclosure.contains_column(x, z) {
                continue;
            }
            builder.set(x, floor, z, BlockType::Bedstone);
            if x == -n || x == n || z == -n || z == n {
                for dy in 0..height {
                    builder.set(x, floor + dy, z, BlockType::Bedstone);
                }
            }
        }
    }

    fn interior(&self, x: i32, z: i32) -> bool {
        self.config
            .enclosure
            .is_none_or(|e| e.interior_column(x, z))
    }

    fn floor(&self, builder: &mut SectorBuilder) {
        let floor = self.config.floor_level();
        let sector = builder.sector();
        if !sector.contains_y_range(floor, floor) {
            return;
        }
        for (x, z) in sector.columns() {
            if self.interior(x, z) {
                builder.set(x, floor, z, BlockType::DirtWithGrass);
            }
        }
    }

    fn hills(&self, builder: &mut SectorBuilder) {
        let floor = self.config.floor_level();
        let sector = builder.sector();
        if !sector.contains_y_range(floor, floor + RELIEF_RANGE) {
            return;
        }
        for (x, z) in sector.columns() {
            if !self.interior(x, z) {
                continue;
            }
            let (stratum, top) = self.column(x, z);
            for depth in 0..stratum.height {
                builder.set(x, top - depth, z, stratum.block_at_depth(depth as usize));
            }
        }
    }

    fn clouds(&self, builder: &mut SectorBuilder) {
        let y = self.config.cloud_level();
        let sector = builder.sector();
        if !sector.contains_y_range(y, y) {
            return;
        }
        for (x, z) in sector.columns() {
            if !self.config.column_allowed(x, z) {
                continue;
            }
            if builder.is_empty(BlockPos::new(x, y, z)) && self.has_cloud(x, z) {
                builder.set(x, y, z, BlockType::Cloud);
            }
        }
    }

    fn trees(&self, builder: &mut SectorBuilder) {
        let ground = self.config.ground_level;
        if !builder.sector().contains_y_range(ground, ground + RELIEF_RANGE) {
            return;
        }
        trees::generate_trees(&self.config, builder, |x, z| self.column(x, z));
    }

    fn underground(&self, builder: &mut SectorBuilder) {
        let floor = self.config.floor_level();
        let sector = builder.sector();
        if sector.min_block().y > floor {
            return;
        }
        for pos in sector.positions() {
            if pos.y <= floor {
                builder.set(pos.x, pos.y, pos.z, self.stone_at(pos));
            }
        }
    }
}

impl fmt::Debug for TerrainGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TerrainGenerator")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terrain::config::EnclosureConfig;

    #[test]
    fn test_generation_is_deterministic() {
        let a = TerrainGenerator::new(GeneratorConfig::default());
        let b = TerrainGenerator::new(GeneratorConfig::default());
        for coord in [SectorCoord::new(0, 0, 0), SectorCoord::new(-1, 0, 2), SectorCoord::new(3, 1, -4)] {
            let first = a.generate(coord);
            assert_eq!(first, a.generate(coord));
            assert_eq!(first, b.generate(coord));
        }
    }

    #[test]
    fn test_blocks_stay_in_sector() {
        let generator = TerrainGenerator::new(GeneratorConfig::default());
        for coord in [SectorCoord::new(0, 0, 0), SectorCoord::new(-1, 0, -1), SectorCoord::new(0, 1, 0)] {
            let sector = generator.generate(coord);
            assert!(sector.blocks.keys().all(|p| coord.contains(*p)));
            assert!(sector.blocks.values().all(|b| !b.is_air()));
        }
    }

    #[test]
    fn test_flat_floor_with_stone_below() {
        let generator = TerrainGenerator::new(GeneratorConfig::flat(2));
        let sector = generator.generate(SectorCoord::new(0, 0, 0));
        // Floor at y = 0, nothing above it.
        assert_eq!(sector.len(), 16 * 16);
        for x in 0..16 {
            for z in 0..16 {
                let block = sector.blocks.get(&BlockPos::new(x, 0, z)).copied();
                assert!(matches!(
                    block,
                    Some(BlockType::Stone | BlockType::CoalOre | BlockType::IronOre | BlockType::GoldOre)
                ));
            }
        }

        let below = generator.generate(SectorCoord::new(0, -1, 0));
        assert_eq!(below.len(), 16 * 16 * 16);
    }

    #[test]
    fn test_flat_floor_inside_enclosure() {
        let config = GeneratorConfig {
            hills_enabled: false,
            cloudiness: 0.0,
            enclosure: Some(EnclosureConfig { half_size: 10, wall_height: 3 }),
            ..Default::default()
        };
        let generator = TerrainGenerator::new(config);
        let sector = generator.generate(SectorCoord::new(0, 0, 0));
        let floor = 2;
        assert_eq!(sector.blocks.get(&BlockPos::new(10, floor, 5)), Some(&BlockType::Bedstone));
        assert_eq!(sector.blocks.get(&BlockPos::new(10, floor + 2, 3)), Some(&BlockType::Bedstone));
        assert_eq!(sector.blocks.get(&BlockPos::new(10, floor + 3, 3)), None);
        assert_eq!(sector.blocks.get(&BlockPos::new(11, floor, 3)), None);
        // Inside the walls the grass floor replaces the bedstone layer.
        assert_eq!(sector.blocks.get(&BlockPos::new(3, floor, 3)), Some(&BlockType::DirtWithGrass));
        // Nothing below the floor inside an enclosure.
        let below = generator.generate(SectorCoord::new(0, -1, 0));
        assert!(below.is_empty());
    }

    #[test]
    fn test_enclosure_bounds_generation() {
        let config = GeneratorConfig {
            enclosure: Some(EnclosureConfig { half_size: 20, wall_height: 6 }),
            cloudiness: 1.0,
            max_trees_per_patch: 30,
            ..Default::default()
        };
        let generator = TerrainGenerator::new(config.clone());
        for sx in -3..3 {
            for sz in -3..3 {
                for sy in 0..2 {
                    let sector = generator.generate(SectorCoord::new(sx, sy, sz));
                    for pos in sector.blocks.keys() {
                        assert!(config.column_allowed(pos.x, pos.z), "{} escaped", pos);
                    }
                }
            }
        }
    }

    #[test]
    fn test_hills_follow_strata() {
        let config = GeneratorConfig {
            cloudiness: 0.0,
            max_trees_per_patch: 0,
            ..Default::default()
        };
        let generator = TerrainGenerator::new(config);
        let sector = generator.generate(SectorCoord::new(0, 0, 0));
        for (x, z) in SectorCoord::new(0, 0, 0).columns() {
            let (stratum, top) = generator.column(x, z);
            if top >= 16 {
                continue;
            }
            let surface = sector.blocks.get(&BlockPos::new(x, top, z)).copied();
            assert_eq!(surface, Some(stratum.surface()));
            assert!(sector.blocks.get(&BlockPos::new(x, top + 1, z)).is_none());
        }
    }

    #[test]
    fn test_clouds_at_cloud_level() {
        let config = GeneratorConfig {
            cloudiness: 1.0,
            hills_enabled: false,
            enclosure: None,
            ..Default::default()
        };
        let generator = TerrainGenerator::new(config);
        // ground 4 + altitude 20 = 24, inside sector y = 1
        let sector = generator.generate(SectorCoord::new(0, 1, 0));
        assert!(!sector.is_empty());
        assert!(sector.blocks.iter().all(|(p, b)| p.y == 24 && *b == BlockType::Cloud));
    }

    #[test]
    fn test_trees_cross_sector_borders_consistently() {
        let config = GeneratorConfig {
            cloudiness: 0.0,
            max_trees_per_patch: 30,
            enclosure: None,
            ..Default::default()
        };
        let generator = TerrainGenerator::new(config.clone());
        let mut sectors = HashMap::new();
        for seed_patch in [(0, 0), (32, 0), (0, -32)] {
            let plan = trees::plan_patch(&config, seed_patch.0, seed_patch.1, |x, z| generator.column(x, z));
            for tree in plan {
                let base = BlockPos::new(tree.x, tree.y, tree.z);
                let coord = base.sector();
                let sector = sectors
                    .entry(coord)
                    .or_insert_with(|| generator.generate(coord));
                // Another tree's crown may cover this trunk, nothing else can.
                let block = sector.blocks.get(&base).copied();
                assert!(
                    matches!(block, Some(BlockType::Log | BlockType::Leaves)),
                    "tree at {} missing, found {:?}",
                    base,
                    block
                );
            }
        }
    }
}

//! The world: block storage, visibility and streaming behind one owner

use std::sync::Arc;
use std::time::Duration;

use super::block::BlockType;
use super::block_map::BlockMap;
use super::query::{self, Boundary, Collision, DEFAULT_HIT_DISTANCE, Hit, VIRTUAL_FLOOR_Y};
use super::sector::{BlockPos, SectorCoord, sector_of};
use super::visibility::{RenderEvent, VisibilityEngine};
use crate::core::types::Vec3;
use crate::core::{Error, Result, WorldConfig};
use crate::persistence::WorldSnapshot;
use crate::streaming::{SectorState, SectorStreamer, StreamingConfig};
use crate::terrain::TerrainGenerator;

/// Cells walked upward by [`World::find_spawn`] before giving up
const MAX_SPAWN_SEARCH: i32 = 100;

/// Counters describing the current world state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WorldStats {
    pub blocks: usize,
    /// Sectors that have been generated or registered
    pub loaded_sectors: usize,
    /// Sectors in the current target set
    pub shown_sectors: usize,
    /// Blocks currently visible to the renderer
    pub shown_blocks: usize,
    /// Sector operations waiting in the queue
    pub pending_ops: usize,
    /// Sectors being generated in the background
    pub generating: usize,
}

/// Single owner of all world state.
///
/// Every block mutation goes through here so the visibility of the block and
/// its neighbours stays consistent. Mutations either succeed completely or
/// leave the world untouched.
pub struct World {
    blocks: BlockMap,
    visibility: VisibilityEngine,
    streamer: SectorStreamer,
    config: WorldConfig,
}

impl World {
    /// Create an empty world. Nothing is generated until sectors are shown.
    pub fn new(config: WorldConfig) -> Result<Self> {
        config.validate()?;
        let generator = config
            .generator
            .clone()
            .map(|generator| Arc::new(TerrainGenerator::new(generator)));
        let streamer = SectorStreamer::new(config.streaming.clone(), generator)?;
        Ok(Self {
            blocks: BlockMap::new(),
            visibility: VisibilityEngine::new(),
            streamer,
            config,
        })
    }

    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    pub fn blocks(&self) -> &BlockMap {
        &self.blocks
    }

    pub fn visibility(&self) -> &VisibilityEngine {
        &self.visibility
    }

    pub fn streamer(&self) -> &SectorStreamer {
        &self.streamer
    }

    // --- Blocks ---

    pub fn get_block(&self, pos: BlockPos) -> Option<BlockType> {
        self.blocks.get(pos)
    }

    /// Place a block, returning the one it replaced.
    ///
    /// Fails when the kind is `Air`, the sector was never loaded, the position
    /// lies outside the enclosure, or an indestructible block is in the way.
    pub fn add_block(&mut self, pos: BlockPos, block: BlockType) -> Result<Option<BlockType>> {
        if block.is_air() {
            return Err(Error::InvalidBlock(format!("cannot place {} at {}", block, pos)));
        }
        let sector = sector_of(pos);
        if !self.blocks.is_loaded(sector) {
            return Err(Error::NotLoaded(sector));
        }
        if let Some(enclosure) = self.config.generator.as_ref().and_then(|g| g.enclosure) {
            if !enclosure.contains_column(pos.x, pos.z) {
                return Err(Error::OutsideEnclosure(pos));
            }
        }
        if self.blocks.get(pos).is_some_and(BlockType::is_indestructible) {
            return Err(Error::Protected(pos));
        }

        let previous = self.blocks.set(pos, block)?;
        self.visibility
            .refresh(&self.blocks, pos, self.streamer.shown_sectors());
        Ok(previous)
    }

    /// Remove a block, returning it. Removing air is a no-op.
    pub fn remove_block(&mut self, pos: BlockPos) -> Result<Option<BlockType>> {
        match self.blocks.get(pos) {
            None => Ok(None),
            Some(block) if block.is_indestructible() => Err(Error::Protected(pos)),
            Some(_) => {
                let removed = self.blocks.remove(pos);
                self.visibility
                    .refresh(&self.blocks, pos, self.streamer.shown_sectors());
                Ok(removed)
            }
        }
    }

    /// Number of stored blocks.
    pub fn count_blocks(&self) -> usize {
        self.blocks.len()
    }

    /// Number of sectors holding at least one block.
    pub fn sector_count(&self) -> usize {
        self.blocks.sector_count()
    }

    // --- Streaming ---

    pub fn update_player(&mut self, position: Vec3) -> bool {
        self.streamer
            .update_player(position, &mut self.blocks, &mut self.visibility)
    }

    /// Make `targets` (nearest first) the set of shown sectors.
    pub fn show_only_sectors(&mut self, targets: &[SectorCoord]) {
        self.streamer
            .show_only_sectors(targets, &mut self.blocks, &mut self.visibility);
    }

    /// Generate a sector now without showing it. No-op if already loaded.
    pub fn load_sector(&mut self, sector: SectorCoord) {
        self.streamer
            .load_now(sector, &mut self.blocks, &mut self.visibility);
    }

    /// Generate many sectors in parallel. Returns how many were new.
    pub fn pregenerate(&mut self, sectors: &[SectorCoord]) -> usize {
        self.streamer
            .pregenerate(sectors, &mut self.blocks, &mut self.visibility)
    }

    /// Run at most `budget` block show/hide operations.
    pub fn process_queue(&mut self, budget: usize) -> usize {
        self.streamer
            .process_queue(budget, &mut self.blocks, &mut self.visibility)
    }

    /// One tick of queue work with the configured budget.
    pub fn tick(&mut self) -> usize {
        let budget = self.config.streaming.queue_budget;
        self.process_queue(budget)
    }

    pub fn process_queue_for(&mut self, duration: Duration) -> usize {
        self.streamer
            .process_queue_for(duration, &mut self.blocks, &mut self.visibility)
    }

    /// Finish background generation and drain the queue completely.
    pub fn process_entire_queue(&mut self) -> usize {
        self.streamer
            .process_entire_queue(&mut self.blocks, &mut self.visibility)
    }

    pub fn pending_count(&self) -> usize {
        self.streamer.pending_count()
    }

    pub fn shown_count(&self) -> usize {
        self.visibility.shown_count()
    }

    pub fn state_of(&self, sector: SectorCoord) -> SectorState {
        self.streamer.state_of(sector, &self.blocks)
    }

    /// Drain the render events recorded since the last call.
    pub fn take_render_events(&mut self) -> Vec<RenderEvent> {
        self.visibility.take_events()
    }

    pub fn stats(&self) -> WorldStats {
        WorldStats {
            blocks: self.blocks.len(),
            loaded_sectors: self.blocks.loaded_count(),
            shown_sectors: self.streamer.shown_sectors().len(),
            shown_blocks: self.visibility.shown_count(),
            pending_ops: self.streamer.pending_count(),
            generating: self.streamer.generating_count(),
        }
    }

    // --- Queries ---

    /// True if `pos` holds no block. With `must_be_loaded`, positions in
    /// unloaded sectors are reported as not empty.
    pub fn is_empty(&self, pos: BlockPos, must_be_loaded: bool) -> bool {
        query::is_empty(&self.blocks, pos, must_be_loaded)
    }

    /// Like [`is_empty`](Self::is_empty) but reports unloaded sectors as an error.
    pub fn check_empty(&self, pos: BlockPos) -> Result<bool> {
        self.blocks.check_empty(pos)
    }

    /// Pick the first block along a ray within reach.
    pub fn hit_test(&self, origin: Vec3, direction: Vec3) -> Option<Hit> {
        self.hit_test_within(origin, direction, DEFAULT_HIT_DISTANCE)
    }

    pub fn hit_test_within(&self, origin: Vec3, direction: Vec3, max_distance: f32) -> Option<Hit> {
        query::hit_test(&self.blocks, origin, direction, max_distance)
    }

    /// Hard limit applied to entities after block collision.
    pub fn boundary(&self) -> Boundary {
        match &self.config.generator {
            None => Boundary::VirtualFloor { y: VIRTUAL_FLOOR_Y },
            Some(generator) => match generator.enclosure {
                Some(enclosure) => Boundary::Enclosure {
                    half_size: enclosure.half_size as f32,
                },
                None => Boundary::Open,
            },
        }
    }

    /// Correct an entity position against blocks and the world boundary.
    pub fn resolve_collision(&self, position: Vec3, height: u32) -> Collision {
        query::resolve_collision(&self.blocks, position, height, self.boundary())
    }

    /// Lowest standing position in column (x, z) at or above `start_y` with
    /// `height` free cells, loading sectors on the way.
    ///
    /// `None` if no such gap is found within a bounded climb.
    pub fn find_spawn(&mut self, x: i32, z: i32, start_y: i32, height: u32) -> Option<Vec3> {
        let height = height.max(1) as i32;
        let mut free = 0;
        for y in start_y..start_y.saturating_add(MAX_SPAWN_SEARCH) {
            let pos = BlockPos::new(x, y, z);
            self.load_sector(pos.sector());
            if !self.blocks.is_empty(pos) {
                free = 0;
                continue;
            }
            free += 1;
            if free == height {
                return Some(Vec3::new(x as f32, (y - height + 1) as f32, z as f32));
            }
        }
        None
    }

    // --- Persistence ---

    /// Capture the generator settings, loaded sectors and every block.
    pub fn snapshot(&self) -> WorldSnapshot {
        WorldSnapshot::new(
            self.config.generator.clone(),
            self.blocks.loaded_sectors().copied(),
            self.blocks.iter(),
        )
    }

    /// Build a new world from a snapshot.
    ///
    /// Nothing is shown until the caller requests sectors. Fails with
    /// [`Error::CorruptSave`] when the snapshot is inconsistent.
    pub fn restore(snapshot: &WorldSnapshot, streaming: StreamingConfig) -> Result<World> {
        let result = Self::try_restore(snapshot, streaming);
        if let Err(e) = &result {
            log::warn!("Rejected world restore: {}", e);
        }
        result
    }

    fn try_restore(snapshot: &WorldSnapshot, streaming: StreamingConfig) -> Result<World> {
        if let Some(generator) = &snapshot.generator {
            generator
                .validate()
                .map_err(|e| Error::CorruptSave(format!("generator settings: {}", e)))?;
        }

        let mut blocks = BlockMap::new();
        for &sector in &snapshot.sectors {
            blocks.mark_loaded(sector);
        }
        for &(pos, block) in &snapshot.blocks {
            if block.is_air() {
                return Err(Error::CorruptSave(format!("air stored at {}", pos)));
            }
            if blocks.set(pos, block)?.is_some() {
                return Err(Error::CorruptSave(format!("duplicate block at {}", pos)));
            }
            // Blocks imply their sector was generated.
            blocks.mark_loaded(pos.sector());
        }

        let config = WorldConfig {
            generator: snapshot.generator.clone(),
            streaming,
        };
        let mut world = World::new(config)?;
        world.blocks = blocks;
        log::debug!(
            "Restored world ({} sectors, {} blocks)",
            world.blocks.loaded_count(),
            world.blocks.len()
        );
        Ok(world)
    }
}

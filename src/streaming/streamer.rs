//! Distance-based sector show/hide scheduling

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use rayon::prelude::*;

use super::queue::{SectorOp, SectorWork, WorkQueue};
use super::sector_loader::{GenerationResult, SectorLoader};
use super::view::{StreamingConfig, sectors_in_view};
use crate::core::Result;
use crate::core::types::Vec3;
use crate::terrain::{GeneratedSector, TerrainGenerator};
use crate::voxel::visibility::is_exposed;
use crate::voxel::{BlockMap, BlockPos, BlockType, SectorCoord, VisibilityEngine};

/// Lifecycle of a sector as seen by the streamer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SectorState {
    /// Never generated
    Unrequested,
    /// Generation submitted to the background loader
    Generating,
    /// Loaded and in the current target set
    Shown,
    /// Loaded but not in the current target set
    Hidden,
}

/// Queue work bound to the world state it runs against.
struct Drain<'a> {
    blocks: &'a BlockMap,
    visibility: &'a mut VisibilityEngine,
    shown: &'a HashSet<SectorCoord>,
}

impl SectorWork for Drain<'_> {
    fn expand(&mut self, sector: SectorCoord, op: SectorOp) -> Vec<BlockPos> {
        let blocks = self.blocks;
        let visibility = &*self.visibility;
        match op {
            SectorOp::Show => blocks
                .blocks_in_sector(sector)
                .filter(|pos| !visibility.is_shown(*pos) && is_exposed(blocks, *pos))
                .collect(),
            SectorOp::Hide => blocks
                .blocks_in_sector(sector)
                .filter(|pos| visibility.is_shown(*pos))
                .collect(),
        }
    }

    fn execute(&mut self, sector: SectorCoord, op: SectorOp, pos: BlockPos) {
        match op {
            SectorOp::Show => {
                if let Some(block) = VisibilityEngine::should_show(self.blocks, pos, self.shown) {
                    self.visibility.show(pos, block);
                }
            }
            SectorOp::Hide => {
                if !self.shown.contains(&sector) {
                    self.visibility.hide(pos);
                }
            }
        }
    }
}

/// Decides which sectors are shown, generates them on first use and feeds
/// block show/hide work through a budgeted queue.
///
/// The streamer does not own the block map or the visibility engine; the
/// owning world passes them in on every call.
pub struct SectorStreamer {
    config: StreamingConfig,
    generator: Option<Arc<TerrainGenerator>>,
    loader: Option<SectorLoader>,
    /// Current target set
    shown: HashSet<SectorCoord>,
    /// Sectors submitted to the loader and not yet registered
    generating: HashSet<SectorCoord>,
    queue: WorkQueue,
    player_sector: Option<SectorCoord>,
}

impl SectorStreamer {
    pub fn new(config: StreamingConfig, generator: Option<Arc<TerrainGenerator>>) -> Result<Self> {
        let loader = match &generator {
            Some(generator) if config.background_generation => Some(SectorLoader::new(
                Arc::clone(generator),
                config.max_concurrent_generation,
            )?),
            _ => None,
        };
        Ok(Self {
            config,
            generator,
            loader,
            shown: HashSet::new(),
            generating: HashSet::new(),
            queue: WorkQueue::new(),
            player_sector: None,
        })
    }

    pub fn config(&self) -> &StreamingConfig {
        &self.config
    }

    pub fn generator(&self) -> Option<&Arc<TerrainGenerator>> {
        self.generator.as_ref()
    }

    pub fn state_of(&self, sector: SectorCoord, blocks: &BlockMap) -> SectorState {
        if self.generating.contains(&sector) {
            SectorState::Generating
        } else if !blocks.is_loaded(sector) {
            SectorState::Unrequested
        } else if self.shown.contains(&sector) {
            SectorState::Shown
        } else {
            SectorState::Hidden
        }
    }

    pub fn shown_sectors(&self) -> &HashSet<SectorCoord> {
        &self.shown
    }

    pub fn is_sector_shown(&self, sector: SectorCoord) -> bool {
        self.shown.contains(&sector)
    }

    /// Sector operations waiting or in progress.
    pub fn pending_count(&self) -> usize {
        self.queue.len()
    }

    pub fn generating_count(&self) -> usize {
        self.generating.len()
    }

    pub fn player_sector(&self) -> Option<SectorCoord> {
        self.player_sector
    }

    /// Recompute the target set if the player moved to another sector.
    ///
    /// Returns true if the target set was recomputed.
    pub fn update_player(&mut self, position: Vec3, blocks: &mut BlockMap, visibility: &mut VisibilityEngine) -> bool {
        let sector = SectorCoord::from_world_pos(position);
        if self.player_sector == Some(sector) {
            return false;
        }
        self.player_sector = Some(sector);
        let targets = sectors_in_view(sector, self.config.view_radius(), self.config.metric);
        log::debug!("Player entered sector {}, {} sectors in view", sector, targets.len());
        self.show_only_sectors(&targets, blocks, visibility);
        true
    }

    /// Make `targets` (nearest first) the shown set.
    ///
    /// New targets are shown in list order, generating them if needed;
    /// sectors no longer targeted are hidden. Unchanged sectors are left alone.
    pub fn show_only_sectors(
        &mut self,
        targets: &[SectorCoord],
        blocks: &mut BlockMap,
        visibility: &mut VisibilityEngine,
    ) {
        let after: HashSet<SectorCoord> = targets.iter().copied().collect();
        let mut hide: Vec<SectorCoord> = self.shown.difference(&after).copied().collect();
        hide.sort_unstable();

        let mut seen = HashSet::new();
        for &sector in targets {
            if !self.shown.contains(&sector) && seen.insert(sector) {
                self.show_sector(sector, blocks, visibility);
            }
        }
        for sector in hide {
            self.hide_sector(sector, blocks);
        }
    }

    pub fn show_sector(&mut self, sector: SectorCoord, blocks: &mut BlockMap, visibility: &mut VisibilityEngine) {
        self.shown.insert(sector);
        if blocks.is_loaded(sector) {
            self.queue.push(sector, SectorOp::Show);
            return;
        }
        if self.generating.contains(&sector) {
            return;
        }
        if let Some(loader) = self.loader.as_mut() {
            if loader.request(sector) {
                self.generating.insert(sector);
                return;
            }
        }
        self.load_now(sector, blocks, visibility);
    }

    pub fn hide_sector(&mut self, sector: SectorCoord, blocks: &BlockMap) {
        self.shown.remove(&sector);
        if blocks.is_loaded(sector) {
            self.queue.push(sector, SectorOp::Hide);
        }
    }

    /// Generate and register a sector on the calling thread. No-op if loaded.
    pub fn load_now(&mut self, sector: SectorCoord, blocks: &mut BlockMap, visibility: &mut VisibilityEngine) {
        if blocks.is_loaded(sector) {
            return;
        }
        let generated = match &self.generator {
            Some(generator) => generator.generate(sector).blocks,
            None => HashMap::new(),
        };
        self.register(sector, generated, blocks, visibility);
    }

    /// Add a generated sector to the world. Returns false if it was already loaded.
    pub fn register(
        &mut self,
        sector: SectorCoord,
        generated: impl IntoIterator<Item = (BlockPos, BlockType)>,
        blocks: &mut BlockMap,
        visibility: &mut VisibilityEngine,
    ) -> bool {
        self.generating.remove(&sector);
        if !blocks.insert_sector(sector, generated) {
            return false;
        }
        log::debug!("Registered sector {} ({} blocks)", sector, blocks.sector_len(sector));
        visibility.refresh_border(blocks, sector, &self.shown);
        if self.shown.contains(&sector) {
            self.queue.push(sector, SectorOp::Show);
        }
        true
    }

    /// Generate many sectors in parallel and register them. Returns the
    /// number of sectors newly registered.
    pub fn pregenerate(
        &mut self,
        sectors: &[SectorCoord],
        blocks: &mut BlockMap,
        visibility: &mut VisibilityEngine,
    ) -> usize {
        let mut missing: Vec<SectorCoord> = sectors
            .iter()
            .copied()
            .filter(|s| !blocks.is_loaded(*s) && !self.generating.contains(s))
            .collect();
        missing.sort_unstable();
        missing.dedup();

        let generated: Vec<GeneratedSector> = match &self.generator {
            Some(generator) => missing.par_iter().map(|&sector| generator.generate(sector)).collect(),
            None => missing
                .iter()
                .map(|&coord| GeneratedSector { coord, ..Default::default() })
                .collect(),
        };

        let mut registered = 0;
        for sector in generated {
            if self.register(sector.coord, sector.blocks, blocks, visibility) {
                registered += 1;
            }
        }
        log::debug!("Pregenerated {} sectors", registered);
        registered
    }

    /// Register sectors finished by the background loader.
    pub fn poll_generation(&mut self, blocks: &mut BlockMap, visibility: &mut VisibilityEngine) -> usize {
        let Some(loader) = self.loader.as_mut() else {
            return 0;
        };
        let results = loader.poll_results();
        let count = results.len();
        for result in results {
            self.apply_generation(result, blocks, visibility);
        }
        count
    }

    /// Block until every in-flight background generation is registered.
    pub fn finish_generation(&mut self, blocks: &mut BlockMap, visibility: &mut VisibilityEngine) {
        loop {
            let Some(result) = self.loader.as_mut().and_then(SectorLoader::wait_result) else {
                break;
            };
            self.apply_generation(result, blocks, visibility);
        }
        // Anything the loader can no longer deliver goes back to unrequested.
        for sector in std::mem::take(&mut self.generating) {
            log::error!("Generation of sector {} was lost", sector);
            self.shown.remove(&sector);
        }
    }

    fn apply_generation(&mut self, result: GenerationResult, blocks: &mut BlockMap, visibility: &mut VisibilityEngine) {
        match result {
            GenerationResult::Generated(sector) => {
                self.register(sector.coord, sector.blocks, blocks, visibility);
            }
            GenerationResult::Failed(sector, error) => {
                log::error!("Failed to generate sector {}: {}", sector, error);
                self.generating.remove(&sector);
                // Let the next target recomputation request it again.
                self.shown.remove(&sector);
            }
        }
    }

    fn drain_while(
        &mut self,
        blocks: &BlockMap,
        visibility: &mut VisibilityEngine,
        proceed: impl FnMut(usize) -> bool,
    ) -> usize {
        let mut work = Drain {
            blocks,
            visibility,
            shown: &self.shown,
        };
        self.queue.drain_while(&mut work, proceed)
    }

    /// Run at most `budget` block operations.
    pub fn process_queue(&mut self, budget: usize, blocks: &mut BlockMap, visibility: &mut VisibilityEngine) -> usize {
        self.poll_generation(blocks, visibility);
        let executed = self.drain_while(blocks, visibility, |done| done < budget);
        log::trace!("Processed {} block operations, {} sector ops left", executed, self.queue.len());
        executed
    }

    /// Run block operations until `duration` has elapsed or the queue is empty.
    pub fn process_queue_for(
        &mut self,
        duration: Duration,
        blocks: &mut BlockMap,
        visibility: &mut VisibilityEngine,
    ) -> usize {
        self.poll_generation(blocks, visibility);
        let start = Instant::now();
        self.drain_while(blocks, visibility, |_| start.elapsed() < duration)
    }

    /// Wait for background generation, then drain the whole queue.
    pub fn process_entire_queue(&mut self, blocks: &mut BlockMap, visibility: &mut VisibilityEngine) -> usize {
        self.finish_generation(blocks, visibility);
        self.drain_while(blocks, visibility, |_| true)
    }
}

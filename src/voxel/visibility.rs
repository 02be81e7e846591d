//! Exposure culling and render event tracking
//!
//! A block is *exposed* when at least one of its six face neighbours is
//! absent from the block map. Only exposed blocks of shown sectors are handed
//! to the renderer; everything else stays in the block map untouched.

use std::collections::{HashMap, HashSet};

use super::block::BlockType;
use super::block_map::BlockMap;
use super::sector::{BlockPos, SECTOR_SIZE, SectorCoord, sector_of};
use crate::core::types::IVec3;

/// Change to the set of render-visible blocks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RenderEvent {
    Shown { pos: BlockPos, block: BlockType },
    Hidden { pos: BlockPos },
}

impl RenderEvent {
    pub fn pos(&self) -> BlockPos {
        match *self {
            RenderEvent::Shown { pos, .. } | RenderEvent::Hidden { pos } => pos,
        }
    }
}

/// True if any face neighbour of `pos` is empty.
///
/// Neighbours in unloaded sectors count as empty.
pub fn is_exposed(blocks: &BlockMap, pos: BlockPos) -> bool {
    pos.neighbors().any(|n| blocks.is_empty(n))
}

/// The set of blocks currently visible to the renderer, plus an outbox of
/// changes not yet collected.
#[derive(Debug, Default)]
pub struct VisibilityEngine {
    shown: HashMap<BlockPos, BlockType>,
    events: Vec<RenderEvent>,
}

impl VisibilityEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make a block visible. Returns true if the shown set changed.
    ///
    /// Showing an already shown block with a different kind replaces it
    /// (hidden, then shown again).
    pub fn show(&mut self, pos: BlockPos, block: BlockType) -> bool {
        match self.shown.insert(pos, block) {
            Some(previous) if previous == block => false,
            Some(_) => {
                self.events.push(RenderEvent::Hidden { pos });
                self.events.push(RenderEvent::Shown { pos, block });
                true
            }
            None => {
                self.events.push(RenderEvent::Shown { pos, block });
                true
            }
        }
    }

    /// Make a block invisible. Returns true if it was shown.
    pub fn hide(&mut self, pos: BlockPos) -> bool {
        if self.shown.remove(&pos).is_some() {
            self.events.push(RenderEvent::Hidden { pos });
            true
        } else {
            false
        }
    }

    /// Whether `pos` should be visible given the current block map and the
    /// set of shown sectors.
    pub fn should_show(
        blocks: &BlockMap,
        pos: BlockPos,
        shown_sectors: &HashSet<SectorCoord>,
    ) -> Option<BlockType> {
        let block = blocks.get(pos)?;
        (shown_sectors.contains(&sector_of(pos)) && is_exposed(blocks, pos)).then_some(block)
    }

    /// Bring one position in line with the visibility rule.
    pub fn sync(&mut self, blocks: &BlockMap, pos: BlockPos, shown_sectors: &HashSet<SectorCoord>) {
        match Self::should_show(blocks, pos, shown_sectors) {
            Some(block) => {
                self.show(pos, block);
            }
            None => {
                self.hide(pos);
            }
        }
    }

    /// Re-evaluate `pos` and its six neighbours after a change at `pos`.
    pub fn refresh(&mut self, blocks: &BlockMap, pos: BlockPos, shown_sectors: &HashSet<SectorCoord>) {
        self.sync(blocks, pos, shown_sectors);
        for neighbor in pos.neighbors() {
            self.sync(blocks, neighbor, shown_sectors);
        }
    }

    /// Hide blocks on the faces of `sector` that the sector's arrival has
    /// enclosed. Only the one-block shell around the sector can change.
    pub fn refresh_border(
        &mut self,
        blocks: &BlockMap,
        sector: SectorCoord,
        shown_sectors: &HashSet<SectorCoord>,
    ) {
        let min = sector.min_block();
        // The shell planes wrap at the edge of the world like block neighbours do
        let below = min.offset(IVec3::splat(-1));
        let above = sector.last_block().offset(IVec3::ONE);
        for a in 0..SECTOR_SIZE {
            for b in 0..SECTOR_SIZE {
                let shell = [
                    BlockPos::new(below.x, min.y + a, min.z + b),
                    BlockPos::new(above.x, min.y + a, min.z + b),
                    BlockPos::new(min.x + a, below.y, min.z + b),
                    BlockPos::new(min.x + a, above.y, min.z + b),
                    BlockPos::new(min.x + a, min.y + b, below.z),
                    BlockPos::new(min.x + a, min.y + b, above.z),
                ];
                for pos in shell {
                    if self.is_shown(pos) {
                        self.sync(blocks, pos, shown_sectors);
                    }
                }
            }
        }
    }

    pub fn is_shown(&self, pos: BlockPos) -> bool {
        self.shown.contains_key(&pos)
    }

    pub fn shown_block(&self, pos: BlockPos) -> Option<BlockType> {
        self.shown.get(&pos).copied()
    }

    pub fn shown_count(&self) -> usize {
        self.shown.len()
    }

    pub fn shown_in_sector(&self, sector: SectorCoord) -> impl Iterator<Item = BlockPos> + '_ {
        self.shown
            .keys()
            .copied()
            .filter(move |pos| sector_of(*pos) == sector)
    }

    pub fn iter(&self) -> impl Iterator<Item = (BlockPos, BlockType)> + '_ {
        self.shown.iter().map(|(pos, block)| (*pos, *block))
    }

    /// Drain pending render events in the order they occurred.
    pub fn take_events(&mut self) -> Vec<RenderEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn pending_events(&self) -> usize {
        self.events.len()
    }
}

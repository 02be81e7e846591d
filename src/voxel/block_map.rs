//! Sparse block storage with a per-sector index

use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};

use super::block::BlockType;
use super::sector::{BlockPos, SectorCoord, sector_of};
use crate::core::{Error, Result};

/// Sparse map of every non-air block in the world.
///
/// Alongside the blocks it keeps an index from sector to the positions stored
/// in that sector, and the set of sectors that have been generated (or
/// registered empty). An absent entry in a loaded sector is air; an absent
/// entry in an unloaded sector is unknown.
#[derive(Debug, Default)]
pub struct BlockMap {
    /// Block kind per position; never contains `Air`
    blocks: HashMap<BlockPos, BlockType>,
    /// Positions stored per sector; empty entries are dropped
    sectors: HashMap<SectorCoord, HashSet<BlockPos>>,
    /// Sectors that have been generated or registered
    loaded: HashSet<SectorCoord>,
}

impl BlockMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, pos: BlockPos) -> Option<BlockType> {
        self.blocks.get(&pos).copied()
    }

    pub fn contains(&self, pos: BlockPos) -> bool {
        self.blocks.contains_key(&pos)
    }

    /// Insert or overwrite a block, returning the previous one.
    ///
    /// Does not mark the sector loaded and performs no protection check.
    pub fn set(&mut self, pos: BlockPos, block: BlockType) -> Result<Option<BlockType>> {
        if block.is_air() {
            return Err(Error::InvalidBlock(format!("cannot store air at {}", pos)));
        }
        let previous = self.blocks.insert(pos, block);
        if previous.is_none() {
            self.sectors.entry(sector_of(pos)).or_default().insert(pos);
        }
        Ok(previous)
    }

    /// Remove a block. No-op when absent.
    pub fn remove(&mut self, pos: BlockPos) -> Option<BlockType> {
        let removed = self.blocks.remove(&pos)?;
        let sector = sector_of(pos);
        if let Entry::Occupied(mut entry) = self.sectors.entry(sector) {
            entry.get_mut().remove(&pos);
            if entry.get().is_empty() {
                entry.remove();
            }
        }
        Some(removed)
    }

    /// True iff no block is stored at `pos`. Unloaded space counts as empty.
    pub fn is_empty(&self, pos: BlockPos) -> bool {
        !self.blocks.contains_key(&pos)
    }

    /// Like [`is_empty`](Self::is_empty) but refuses to answer for unloaded sectors.
    pub fn check_empty(&self, pos: BlockPos) -> Result<bool> {
        let sector = sector_of(pos);
        if !self.loaded.contains(&sector) {
            return Err(Error::NotLoaded(sector));
        }
        Ok(self.is_empty(pos))
    }

    pub fn is_loaded(&self, sector: SectorCoord) -> bool {
        self.loaded.contains(&sector)
    }

    /// Mark a sector loaded. Returns false if it already was.
    pub fn mark_loaded(&mut self, sector: SectorCoord) -> bool {
        self.loaded.insert(sector)
    }

    pub fn loaded_sectors(&self) -> impl Iterator<Item = &SectorCoord> {
        self.loaded.iter()
    }

    pub fn loaded_count(&self) -> usize {
        self.loaded.len()
    }

    /// Register a generated sector in bulk.
    ///
    /// Returns false without touching anything if the sector is already
    /// loaded. Air entries and entries outside `sector` are skipped.
    pub fn insert_sector(
        &mut self,
        sector: SectorCoord,
        blocks: impl IntoIterator<Item = (BlockPos, BlockType)>,
    ) -> bool {
        if !self.loaded.insert(sector) {
            return false;
        }
        let index = self.sectors.entry(sector).or_default();
        for (pos, block) in blocks {
            if block.is_air() || sector_of(pos) != sector {
                continue;
            }
            if self.blocks.insert(pos, block).is_none() {
                index.insert(pos);
            }
        }
        if index.is_empty() {
            self.sectors.remove(&sector);
        }
        true
    }

    /// Positions stored in a sector.
    pub fn blocks_in_sector(&self, sector: SectorCoord) -> impl Iterator<Item = BlockPos> + '_ {
        self.sectors
            .get(&sector)
            .into_iter()
            .flat_map(|positions| positions.iter().copied())
    }

    /// Number of blocks stored in a sector.
    pub fn sector_len(&self, sector: SectorCoord) -> usize {
        self.sectors.get(&sector).map_or(0, HashSet::len)
    }

    /// Total number of stored blocks.
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty_map(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Number of sectors holding at least one block.
    pub fn sector_count(&self) -> usize {
        self.sectors.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (BlockPos, BlockType)> + '_ {
        self.blocks.iter().map(|(pos, block)| (*pos, *block))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_remove() {
        let mut map = BlockMap::new();
        let pos = BlockPos::new(1, 2, 3);
        assert!(map.is_empty(pos));

        assert_eq!(map.set(pos, BlockType::Dirt).unwrap(), None);
        assert_eq!(map.get(pos), Some(BlockType::Dirt));
        assert!(!map.is_empty(pos));

        assert_eq!(map.set(pos, BlockType::Sand).unwrap(), Some(BlockType::Dirt));
        assert_eq!(map.len(), 1);

        assert_eq!(map.remove(pos), Some(BlockType::Sand));
        assert_eq!(map.remove(pos), None);
        assert!(map.is_empty(pos));
        assert_eq!(map.sector_count(), 0);
    }

    #[test]
    fn test_air_is_never_stored() {
        let mut map = BlockMap::new();
        let err = map.set(BlockPos::new(0, 0, 0), BlockType::Air).unwrap_err();
        assert!(matches!(err, Error::InvalidBlock(_)));
        assert_eq!(map.len(), 0);
    }

    #[test]
    fn test_sector_index_tracks_mutations() {
        let mut map = BlockMap::new();
        map.set(BlockPos::new(0, 0, 0), BlockType::Stone).unwrap();
        map.set(BlockPos::new(15, 0, 0), BlockType::Stone).unwrap();
        map.set(BlockPos::new(16, 0, 0), BlockType::Stone).unwrap();
        map.set(BlockPos::new(-1, 0, 0), BlockType::Stone).unwrap();

        assert_eq!(map.sector_len(SectorCoord::new(0, 0, 0)), 2);
        assert_eq!(map.sector_len(SectorCoord::new(1, 0, 0)), 1);
        assert_eq!(map.sector_len(SectorCoord::new(-1, 0, 0)), 1);
        assert_eq!(map.sector_count(), 3);

        map.remove(BlockPos::new(16, 0, 0));
        assert_eq!(map.sector_len(SectorCoord::new(1, 0, 0)), 0);
        assert_eq!(map.sector_count(), 2);

        // Overwrite must not double-count.
        map.set(BlockPos::new(0, 0, 0), BlockType::Dirt).unwrap();
        assert_eq!(map.sector_len(SectorCoord::new(0, 0, 0)), 2);
    }

    #[test]
    fn test_check_empty_requires_loaded_sector() {
        let mut map = BlockMap::new();
        let pos = BlockPos::new(3, 3, 3);
        assert!(matches!(map.check_empty(pos), Err(Error::NotLoaded(_))));
        assert!(map.is_empty(pos));

        map.mark_loaded(SectorCoord::new(0, 0, 0));
        assert!(map.check_empty(pos).unwrap());
    }

    #[test]
    fn test_insert_sector_is_idempotent() {
        let mut map = BlockMap::new();
        let sector = SectorCoord::new(0, 0, 0);
        let blocks = vec![
            (BlockPos::new(0, 0, 0), BlockType::Stone),
            (BlockPos::new(1, 0, 0), BlockType::Stone),
            (BlockPos::new(2, 0, 0), BlockType::Air),
            (BlockPos::new(99, 0, 0), BlockType::Stone),
        ];
        assert!(map.insert_sector(sector, blocks.clone()));
        assert_eq!(map.len(), 2);
        assert!(map.is_loaded(sector));

        map.remove(BlockPos::new(0, 0, 0));
        assert!(!map.insert_sector(sector, blocks));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_empty_sector_can_be_loaded() {
        let mut map = BlockMap::new();
        let sector = SectorCoord::new(2, -1, 0);
        assert!(map.insert_sector(sector, std::iter::empty()));
        assert!(map.is_loaded(sector));
        assert_eq!(map.sector_count(), 0);
        assert_eq!(map.loaded_count(), 1);
    }
}

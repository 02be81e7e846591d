//! Block positions and sector coordinates
//!
//! The world is partitioned into cubic sectors of `SECTOR_SIZE` blocks per
//! side. A sector is the unit of generation, streaming and show/hide.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::types::{IVec3, Vec3};

/// Number of blocks per sector side
pub const SECTOR_SIZE: i32 = 16;

/// The six face directions of a block: +Y, -Y, -X, +X, +Z, -Z
pub const FACES: [IVec3; 6] = [
    IVec3::new(0, 1, 0),
    IVec3::new(0, -1, 0),
    IVec3::new(-1, 0, 0),
    IVec3::new(1, 0, 0),
    IVec3::new(0, 0, 1),
    IVec3::new(0, 0, -1),
];

/// Integer position of a block. Blocks are unit cubes centred on their position.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlockPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl BlockPos {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Block containing a world-space point (round to nearest).
    pub fn from_world_pos(pos: Vec3) -> Self {
        Self {
            x: pos.x.round() as i32,
            y: pos.y.round() as i32,
            z: pos.z.round() as i32,
        }
    }

    /// Shift by `delta`. Coordinates wrap at the edge of the `i32` range.
    pub fn offset(self, delta: IVec3) -> Self {
        Self::new(
            self.x.wrapping_add(delta.x),
            self.y.wrapping_add(delta.y),
            self.z.wrapping_add(delta.z),
        )
    }

    /// The six face-adjacent positions, in `FACES` order.
    pub fn neighbors(self) -> impl Iterator<Item = BlockPos> {
        FACES.into_iter().map(move |face| self.offset(face))
    }

    /// Sector containing this block.
    pub fn sector(self) -> SectorCoord {
        sector_of(self)
    }

    pub fn as_vec3(self) -> Vec3 {
        Vec3::new(self.x as f32, self.y as f32, self.z as f32)
    }

    pub fn as_ivec3(self) -> IVec3 {
        IVec3::new(self.x, self.y, self.z)
    }
}

impl From<IVec3> for BlockPos {
    fn from(v: IVec3) -> Self {
        Self::new(v.x, v.y, v.z)
    }
}

impl fmt::Display for BlockPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// Smallest sector coordinate whose blocks are representable
pub const MIN_SECTOR: i32 = i32::MIN.div_euclid(SECTOR_SIZE);
/// Largest sector coordinate whose blocks are representable
pub const MAX_SECTOR: i32 = i32::MAX.div_euclid(SECTOR_SIZE);

/// Integer coordinate identifying a sector in the world grid
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SectorCoord {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl SectorCoord {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Sector containing a world-space point.
    pub fn from_world_pos(pos: Vec3) -> Self {
        sector_of(BlockPos::from_world_pos(pos))
    }

    /// Minimum block (inclusive) of this sector.
    pub fn min_block(self) -> BlockPos {
        BlockPos::new(
            self.x.wrapping_mul(SECTOR_SIZE),
            self.y.wrapping_mul(SECTOR_SIZE),
            self.z.wrapping_mul(SECTOR_SIZE),
        )
    }

    /// Maximum block (inclusive) of this sector.
    pub fn last_block(self) -> BlockPos {
        self.min_block().offset(IVec3::splat(SECTOR_SIZE - 1))
    }

    /// True if every block of the sector has an `i32` position.
    pub fn in_range(self) -> bool {
        [self.x, self.y, self.z]
            .iter()
            .all(|c| (MIN_SECTOR..=MAX_SECTOR).contains(c))
    }

    pub fn contains(self, pos: BlockPos) -> bool {
        sector_of(pos) == self
    }

    /// True if any plane `y` in `ymin..=ymax` crosses this sector.
    pub fn contains_y_range(self, ymin: i32, ymax: i32) -> bool {
        let min = self.y as i64 * SECTOR_SIZE as i64;
        let max = min + SECTOR_SIZE as i64 - 1;
        min <= (ymax as i64) && (ymin as i64) <= max
    }

    /// World-space centre of the sector.
    pub fn center(self) -> Vec3 {
        // Blocks are centred on integer coordinates, so the sector spans
        // [min - 0.5, max - 0.5).
        let half = SECTOR_SIZE as f32 * 0.5;
        self.min_block().as_vec3() + Vec3::splat(half - 0.5)
    }

    /// Shift by a sector delta, or `None` past the edge of the world.
    pub fn checked_offset(self, dx: i32, dy: i32, dz: i32) -> Option<Self> {
        let s = Self::new(
            self.x.checked_add(dx)?,
            self.y.checked_add(dy)?,
            self.z.checked_add(dz)?,
        );
        s.in_range().then_some(s)
    }

    /// Iterate every block position of the sector.
    pub fn positions(self) -> impl Iterator<Item = BlockPos> {
        let min = self.min_block();
        (0..SECTOR_SIZE).flat_map(move |dx| {
            (0..SECTOR_SIZE).flat_map(move |dy| {
                (0..SECTOR_SIZE).map(move |dz| BlockPos::new(min.x + dx, min.y + dy, min.z + dz))
            })
        })
    }

    /// Iterate every (x, z) column of the sector.
    pub fn columns(self) -> impl Iterator<Item = (i32, i32)> {
        let min = self.min_block();
        (0..SECTOR_SIZE).flat_map(move |dx| (0..SECTOR_SIZE).map(move |dz| (min.x + dx, min.z + dz)))
    }
}

impl fmt::Display for SectorCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}, {}]", self.x, self.y, self.z)
    }
}

/// Sector containing a block (floor division per axis).
pub fn sector_of(pos: BlockPos) -> SectorCoord {
    SectorCoord::new(
        pos.x.div_euclid(SECTOR_SIZE),
        pos.y.div_euclid(SECTOR_SIZE),
        pos.z.div_euclid(SECTOR_SIZE),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sector_of_positive() {
        assert_eq!(sector_of(BlockPos::new(0, 0, 0)), SectorCoord::new(0, 0, 0));
        assert_eq!(sector_of(BlockPos::new(15, 15, 15)), SectorCoord::new(0, 0, 0));
        assert_eq!(sector_of(BlockPos::new(16, 31, 32)), SectorCoord::new(1, 1, 2));
    }

    #[test]
    fn test_sector_of_negative_floors() {
        assert_eq!(sector_of(BlockPos::new(-1, -1, -1)), SectorCoord::new(-1, -1, -1));
        assert_eq!(sector_of(BlockPos::new(-16, -17, -15)), SectorCoord::new(-1, -2, -1));
    }

    #[test]
    fn test_min_max_block() {
        let sector = SectorCoord::new(-1, 0, 2);
        assert_eq!(sector.min_block(), BlockPos::new(-16, 0, 32));
        assert_eq!(sector.last_block(), BlockPos::new(-1, 15, 47));
        assert!(sector.contains(BlockPos::new(-16, 0, 32)));
        assert!(sector.contains(BlockPos::new(-1, 15, 47)));
        assert!(!sector.contains(BlockPos::new(0, 15, 47)));
    }

    #[test]
    fn test_block_from_world_pos_rounds() {
        assert_eq!(BlockPos::from_world_pos(Vec3::new(0.4, 1.6, -0.4)), BlockPos::new(0, 2, 0));
        assert_eq!(BlockPos::from_world_pos(Vec3::new(-0.6, 0.0, 2.49)), BlockPos::new(-1, 0, 2));
    }

    #[test]
    fn test_sector_from_world_pos() {
        assert_eq!(SectorCoord::from_world_pos(Vec3::new(8.0, 6.0, 8.0)), SectorCoord::new(0, 0, 0));
        assert_eq!(SectorCoord::from_world_pos(Vec3::new(-0.6, 0.0, 15.6)), SectorCoord::new(-1, 0, 1));
    }

    #[test]
    fn test_neighbors() {
        let n: Vec<_> = BlockPos::new(0, 0, 0).neighbors().collect();
        assert_eq!(n.len(), 6);
        assert!(n.contains(&BlockPos::new(0, 1, 0)));
        assert!(n.contains(&BlockPos::new(0, 0, -1)));
    }

    #[test]
    fn test_positions_cover_sector() {
        let sector = SectorCoord::new(1, -1, 0);
        let positions: Vec<_> = sector.positions().collect();
        assert_eq!(positions.len(), (SECTOR_SIZE * SECTOR_SIZE * SECTOR_SIZE) as usize);
        assert!(positions.iter().all(|p| sector.contains(*p)));
        assert_eq!(sector.columns().count(), (SECTOR_SIZE * SECTOR_SIZE) as usize);
    }

    #[test]
    fn test_edge_of_world_sectors() {
        let far = BlockPos::new(i32::MAX, i32::MIN, 0);
        let sector = far.sector();
        assert_eq!(sector, SectorCoord::new(MAX_SECTOR, MIN_SECTOR, 0));
        assert!(sector.in_range());
        assert_eq!(sector.last_block().x, i32::MAX);
        assert_eq!(sector.min_block().y, i32::MIN);
        assert!(sector.contains(far));
        assert!(sector.contains_y_range(i32::MIN, i32::MIN));

        assert_eq!(sector.checked_offset(1, 0, 0), None);
        assert_eq!(sector.checked_offset(0, -1, 0), None);
        assert_eq!(sector.checked_offset(-1, 1, 0), Some(SectorCoord::new(MAX_SECTOR - 1, MIN_SECTOR + 1, 0)));
        assert!(!SectorCoord::new(MAX_SECTOR + 1, 0, 0).in_range());

        // Block neighbours wrap instead of overflowing
        assert_eq!(far.offset(IVec3::X), BlockPos::new(i32::MIN, i32::MIN, 0));
        assert_eq!(far.neighbors().count(), 6);
    }

    #[test]
    fn test_contains_y_range() {
        let sector = SectorCoord::new(0, 1, 0); // y in 16..32
        assert!(sector.contains_y_range(10, 16));
        assert!(sector.contains_y_range(31, 40));
        assert!(!sector.contains_y_range(0, 15));
        assert!(!sector.contains_y_range(32, 50));
    }
}

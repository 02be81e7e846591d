//! World snapshot and its binary encoding
//!
//! On disk a snapshot is `MAGIC`, a little-endian `u16` format version and
//! an LZ4 block (size prepended) holding an rkyv archive of [`SnapshotRecord`].

use rkyv::{Archive, Deserialize, Serialize};

use crate::core::{Error, Result};
use crate::terrain::{EnclosureConfig, GeneratorConfig};
use crate::voxel::{BlockPos, BlockType, SectorCoord};

pub const MAGIC: [u8; 4] = *b"BWLD";
pub const FORMAT_VERSION: u16 = 1;

const HEADER_LEN: usize = MAGIC.len() + 2;

/// Everything needed to rebuild a world: the generator settings, the sectors
/// that have been generated and every stored block.
///
/// Positions and sectors are kept sorted so equal worlds produce equal
/// snapshots.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WorldSnapshot {
    pub generator: Option<GeneratorConfig>,
    pub sectors: Vec<SectorCoord>,
    pub blocks: Vec<(BlockPos, BlockType)>,
}

impl WorldSnapshot {
    /// Build a snapshot from unordered parts.
    pub fn new(
        generator: Option<GeneratorConfig>,
        sectors: impl IntoIterator<Item = SectorCoord>,
        blocks: impl IntoIterator<Item = (BlockPos, BlockType)>,
    ) -> Self {
        let mut sectors: Vec<SectorCoord> = sectors.into_iter().collect();
        sectors.sort_unstable();
        sectors.dedup();
        let mut blocks: Vec<(BlockPos, BlockType)> = blocks.into_iter().collect();
        blocks.sort_unstable();
        Self {
            generator,
            sectors,
            blocks,
        }
    }

    /// Encode into the compressed on-disk format.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let record = SnapshotRecord::from(self);
        let archived = rkyv::to_bytes::<rkyv::rancor::Error>(&record)
            .map_err(|e| Error::Io(std::io::Error::other(e.to_string())))?;
        let compressed = lz4_flex::compress_prepend_size(&archived);

        let mut bytes = Vec::with_capacity(HEADER_LEN + compressed.len());
        bytes.extend_from_slice(&MAGIC);
        bytes.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
        bytes.extend_from_slice(&compressed);
        Ok(bytes)
    }

    /// Decode bytes produced by [`to_bytes`](Self::to_bytes).
    ///
    /// Any malformed input is reported as [`Error::CorruptSave`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_LEN || bytes[..MAGIC.len()] != MAGIC {
            return Err(Error::CorruptSave("not a world save".into()));
        }
        let version = u16::from_le_bytes([bytes[4], bytes[5]]);
        if version != FORMAT_VERSION {
            return Err(Error::CorruptSave(format!(
                "unsupported format version {} (expected {})",
                version, FORMAT_VERSION
            )));
        }

        let decompressed = lz4_flex::decompress_size_prepended(&bytes[HEADER_LEN..])
            .map_err(|e| Error::CorruptSave(format!("LZ4 decompression failed: {}", e)))?;

        // rkyv validation needs the archive at an aligned address.
        let mut aligned = rkyv::util::AlignedVec::<16>::with_capacity(decompressed.len());
        aligned.extend_from_slice(&decompressed);

        let archived = rkyv::access::<ArchivedSnapshotRecord, rkyv::rancor::Error>(&aligned)
            .map_err(|e| Error::CorruptSave(e.to_string()))?;
        let record = rkyv::deserialize::<SnapshotRecord, rkyv::rancor::Error>(archived)
            .map_err(|e| Error::CorruptSave(e.to_string()))?;

        record.into_snapshot()
    }
}

/// Flat archived form of a snapshot. Block kinds are stored as their `u8` id.
#[derive(Archive, Deserialize, Serialize)]
struct SnapshotRecord {
    generator: Option<GeneratorRecord>,
    sectors: Vec<[i32; 3]>,
    blocks: Vec<BlockRecord>,
}

#[derive(Archive, Deserialize, Serialize)]
struct BlockRecord {
    x: i32,
    y: i32,
    z: i32,
    kind: u8,
}

#[derive(Archive, Deserialize, Serialize)]
struct GeneratorRecord {
    seed: u32,
    ground_level: i32,
    hills_enabled: bool,
    cloudiness: f32,
    cloud_altitude: i32,
    max_trees_per_patch: u32,
    tree_patch_size: i32,
    /// `(half_size, wall_height)`
    enclosure: Option<(i32, i32)>,
    terrain_scale: f64,
    cloud_scale: f64,
}

impl From<&GeneratorConfig> for GeneratorRecord {
    fn from(config: &GeneratorConfig) -> Self {
        Self {
            seed: config.seed,
            ground_level: config.ground_level,
            hills_enabled: config.hills_enabled,
            cloudiness: config.cloudiness,
            cloud_altitude: config.cloud_altitude,
            max_trees_per_patch: config.max_trees_per_patch,
            tree_patch_size: config.tree_patch_size,
            enclosure: config.enclosure.map(|e| (e.half_size, e.wall_height)),
            terrain_scale: config.terrain_scale,
            cloud_scale: config.cloud_scale,
        }
    }
}

impl From<GeneratorRecord> for GeneratorConfig {
    fn from(record: GeneratorRecord) -> Self {
        Self {
            seed: record.seed,
            ground_level: record.ground_level,
            hills_enabled: record.hills_enabled,
            cloudiness: record.cloudiness,
            cloud_altitude: record.cloud_altitude,
            max_trees_per_patch: record.max_trees_per_patch,
            tree_patch_size: record.tree_patch_size,
            enclosure: record.enclosure.map(|(half_size, wall_height)| EnclosureConfig {
                half_size,
                wall_height,
            }),
            terrain_scale: record.terrain_scale,
            cloud_scale: record.cloud_scale,
        }
    }
}

impl From<&WorldSnapshot> for SnapshotRecord {
    fn from(snapshot: &WorldSnapshot) -> Self {
        Self {
            generator: snapshot.generator.as_ref().map(GeneratorRecord::from),
            sectors: snapshot.sectors.iter().map(|s| [s.x, s.y, s.z]).collect(),
            blocks: snapshot
                .blocks
                .iter()
                .map(|(pos, block)| BlockRecord {
                    x: pos.x,
                    y: pos.y,
                    z: pos.z,
                    kind: block.id(),
                })
                .collect(),
        }
    }
}

impl SnapshotRecord {
    fn into_snapshot(self) -> Result<WorldSnapshot> {
        let mut blocks = Vec::with_capacity(self.blocks.len());
        for record in self.blocks {
            let pos = BlockPos::new(record.x, record.y, record.z);
            let block = BlockType::try_from(record.kind)
                .map_err(|_| Error::CorruptSave(format!("unknown block id {} at {}", record.kind, pos)))?;
            if block.is_air() {
                return Err(Error::CorruptSave(format!("air stored at {}", pos)));
            }
            blocks.push((pos, block));
        }
        Ok(WorldSnapshot::new(
            self.generator.map(GeneratorConfig::from),
            self.sectors.into_iter().map(|[x, y, z]| SectorCoord::new(x, y, z)),
            blocks,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> WorldSnapshot {
        WorldSnapshot::new(
            Some(GeneratorConfig {
                seed: 99,
                ..Default::default()
            }),
            [SectorCoord::new(1, 0, 0), SectorCoord::new(0, 0, 0), SectorCoord::new(0, 0, 0)],
            [
                (BlockPos::new(17, 3, 2), BlockType::Brick),
                (BlockPos::new(0, 0, 0), BlockType::Bedstone),
                (BlockPos::new(-4, 9, 1), BlockType::GoldOre),
            ],
        )
    }

    #[test]
    fn test_new_sorts_and_dedups() {
        let snapshot = sample();
        assert_eq!(snapshot.sectors, vec![SectorCoord::new(0, 0, 0), SectorCoord::new(1, 0, 0)]);
        assert_eq!(snapshot.blocks[0].0, BlockPos::new(-4, 9, 1));
    }

    #[test]
    fn test_bytes_roundtrip() {
        let snapshot = sample();
        let bytes = snapshot.to_bytes().unwrap();
        assert_eq!(&bytes[..4], &MAGIC);
        assert_eq!(WorldSnapshot::from_bytes(&bytes).unwrap(), snapshot);

        let sandbox = WorldSnapshot::default();
        let bytes = sandbox.to_bytes().unwrap();
        assert_eq!(WorldSnapshot::from_bytes(&bytes).unwrap(), sandbox);
    }

    #[test]
    fn test_rejects_bad_header() {
        let mut bytes = sample().to_bytes().unwrap();
        assert!(matches!(WorldSnapshot::from_bytes(&bytes[..3]), Err(Error::CorruptSave(_))));

        bytes[0] = b'X';
        assert!(matches!(WorldSnapshot::from_bytes(&bytes), Err(Error::CorruptSave(_))));

        let mut bytes = sample().to_bytes().unwrap();
        bytes[4] = 0xff;
        assert!(matches!(WorldSnapshot::from_bytes(&bytes), Err(Error::CorruptSave(_))));
    }

    #[test]
    fn test_rejects_truncated_payload() {
        let bytes = sample().to_bytes().unwrap();
        let truncated = &bytes[..bytes.len() - 5];
        assert!(matches!(WorldSnapshot::from_bytes(truncated), Err(Error::CorruptSave(_))));
    }

    fn encode(record: &SnapshotRecord) -> Vec<u8> {
        let archived = rkyv::to_bytes::<rkyv::rancor::Error>(record).unwrap();
        let mut bytes = MAGIC.to_vec();
        bytes.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
        bytes.extend_from_slice(&lz4_flex::compress_prepend_size(&archived));
        bytes
    }

    #[test]
    fn test_rejects_unknown_and_air_ids() {
        for kind in [0u8, BlockType::COUNT as u8, 255] {
            let record = SnapshotRecord {
                generator: None,
                sectors: vec![[0, 0, 0]],
                blocks: vec![BlockRecord { x: 1, y: 2, z: 3, kind }],
            };
            let err = WorldSnapshot::from_bytes(&encode(&record)).unwrap_err();
            assert!(matches!(err, Error::CorruptSave(_)), "kind {}", kind);
        }
    }
}

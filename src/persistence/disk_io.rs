//! Async file helpers for world saves

use std::path::{Path, PathBuf};

use super::snapshot::WorldSnapshot;
use crate::core::Result;

/// Extension used for world save files
pub const SAVE_EXTENSION: &str = "bws";

/// Path of a named save slot under `base_dir`.
pub fn world_path(base_dir: &Path, name: &str) -> PathBuf {
    base_dir.join(format!("{}.{}", name, SAVE_EXTENSION))
}

/// Write a snapshot to `path`, creating parent directories as needed.
pub async fn save_world(path: &Path, snapshot: &WorldSnapshot) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }

    let bytes = snapshot.to_bytes()?;
    tokio::fs::write(path, &bytes).await?;
    log::debug!("Saved world to {} ({} bytes)", path.display(), bytes.len());
    Ok(())
}

/// Read a snapshot from `path`. `Ok(None)` if the file does not exist.
pub async fn load_world(path: &Path) -> Result<Option<WorldSnapshot>> {
    if !path.exists() {
        return Ok(None);
    }

    let bytes = tokio::fs::read(path).await?;
    let snapshot = WorldSnapshot::from_bytes(&bytes)?;
    log::debug!(
        "Loaded world from {} ({} sectors, {} blocks)",
        path.display(),
        snapshot.sectors.len(),
        snapshot.blocks.len()
    );
    Ok(Some(snapshot))
}

/// Delete a save. Missing files are not an error.
pub async fn delete_world(path: &Path) -> Result<()> {
    if path.exists() {
        tokio::fs::remove_file(path).await?;
    }
    Ok(())
}

pub async fn world_exists(path: &Path) -> bool {
    tokio::fs::try_exists(path).await.unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Error;
    use crate::terrain::GeneratorConfig;
    use crate::voxel::{BlockPos, BlockType, SectorCoord};

    fn snapshot() -> WorldSnapshot {
        WorldSnapshot::new(
            Some(GeneratorConfig::flat(2)),
            [SectorCoord::new(0, 0, 0)],
            [(BlockPos::new(1, 0, 1), BlockType::Cobblestone)],
        )
    }

    #[test]
    fn test_world_path() {
        let path = world_path(Path::new("/tmp/saves"), "slot1");
        assert_eq!(path, PathBuf::from("/tmp/saves/slot1.bws"));
    }

    #[tokio::test]
    async fn test_save_and_load_world() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("world.bws");

        assert!(!world_exists(&path).await);
        save_world(&path, &snapshot()).await.unwrap();
        assert!(world_exists(&path).await);

        let loaded = load_world(&path).await.unwrap().expect("save not found");
        assert_eq!(loaded, snapshot());

        delete_world(&path).await.unwrap();
        assert!(!world_exists(&path).await);
        delete_world(&path).await.unwrap();
    }

    #[tokio::test]
    async fn test_load_missing_world() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = load_world(&dir.path().join("missing.bws")).await.unwrap();
        assert!(loaded.is_none());
    }

    #[tokio::test]
    async fn test_load_corrupt_world() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.bws");
        tokio::fs::write(&path, b"definitely not a save").await.unwrap();

        let err = load_world(&path).await.unwrap_err();
        assert!(matches!(err, Error::CorruptSave(_)));
    }
}

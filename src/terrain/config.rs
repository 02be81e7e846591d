//! Terrain generator configuration.

use serde::{Deserialize, Serialize};

use crate::core::{Error, Result};

/// Hard horizontal boundary of a generated world.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnclosureConfig {
    /// Half width in x and z; walls stand at `±half_size`.
    pub half_size: i32,
    /// Wall height in blocks, counted from the floor.
    pub wall_height: i32,
}

impl Default for EnclosureConfig {
    fn default() -> Self {
        Self {
            half_size: 80,
            wall_height: 12,
        }
    }
}

impl EnclosureConfig {
    /// True if column (x, z) lies inside or on the walls.
    pub fn contains_column(&self, x: i32, z: i32) -> bool {
        let n = self.half_size;
        (-n..=n).contains(&x) && (-n..=n).contains(&z)
    }

    /// True if column (x, z) lies strictly inside the walls.
    pub fn interior_column(&self, x: i32, z: i32) -> bool {
        let n = self.half_size;
        x > -n && x < n && z > -n && z < n
    }
}

/// Parameters of the procedural terrain. Generation is a pure function of
/// this config and a sector coordinate.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub seed: u32,
    /// Reference height; the floor sits two blocks below it.
    pub ground_level: i32,
    /// Noise-driven hills (true) or a flat grass floor (false).
    pub hills_enabled: bool,
    /// Fraction of sky covered by clouds, 0 = clear, 1 = overcast.
    pub cloudiness: f32,
    /// Cloud layer height above `ground_level`.
    pub cloud_altitude: i32,
    /// Upper bound on trees placed per tree patch.
    pub max_trees_per_patch: u32,
    /// Side of the square column area sharing one tree RNG.
    pub tree_patch_size: i32,
    pub enclosure: Option<EnclosureConfig>,
    /// Horizontal scale of the hill noise (larger = smoother)
    pub terrain_scale: f64,
    /// Horizontal scale of the cloud noise
    pub cloud_scale: f64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            seed: 12345,
            ground_level: 4,
            hills_enabled: true,
            cloudiness: 0.35,
            cloud_altitude: 20,
            max_trees_per_patch: 6,
            tree_patch_size: 32,
            enclosure: Some(EnclosureConfig::default()),
            terrain_scale: 38.0,
            cloud_scale: 20.0,
        }
    }
}

impl GeneratorConfig {
    /// Flat floor, no clouds, no trees, no walls.
    pub fn flat(ground_level: i32) -> Self {
        Self {
            ground_level,
            hills_enabled: false,
            cloudiness: 0.0,
            max_trees_per_patch: 0,
            enclosure: None,
            ..Default::default()
        }
    }

    /// Height of the floor layer.
    pub fn floor_level(&self) -> i32 {
        self.ground_level - 2
    }

    pub fn cloud_level(&self) -> i32 {
        self.ground_level + self.cloud_altitude
    }

    /// True if column (x, z) may hold generated or placed blocks.
    pub fn column_allowed(&self, x: i32, z: i32) -> bool {
        self.enclosure.is_none_or(|e| e.contains_column(x, z))
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.cloudiness) {
            return Err(Error::Config(format!(
                "cloudiness must be within [0, 1], got {}",
                self.cloudiness
            )));
        }
        if self.tree_patch_size < 8 {
            return Err(Error::Config(format!(
                "tree_patch_size must be at least 8, got {}",
                self.tree_patch_size
            )));
        }
        if !(self.terrain_scale > 0.0 && self.cloud_scale > 0.0) {
            return Err(Error::Config("noise scales must be positive".into()));
        }
        if let Some(enclosure) = &self.enclosure {
            if enclosure.half_size < 8 {
                return Err(Error::Config(format!(
                    "enclosure half_size must be at least 8, got {}",
                    enclosure.half_size
                )));
            }
            if enclosure.wall_height < 1 {
                return Err(Error::Config("enclosure wall_height must be positive".into()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(GeneratorConfig::default().validate().is_ok());
        assert!(GeneratorConfig::flat(2).validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_values() {
        let cloudy = GeneratorConfig { cloudiness: -0.1, ..Default::default() };
        assert!(matches!(cloudy.validate(), Err(Error::Config(_))));

        let tiny_patch = GeneratorConfig { tree_patch_size: 4, ..Default::default() };
        assert!(tiny_patch.validate().is_err());

        let tiny_enclosure = GeneratorConfig {
            enclosure: Some(EnclosureConfig { half_size: 2, wall_height: 3 }),
            ..Default::default()
        };
        assert!(tiny_enclosure.validate().is_err());

        let flat_noise = GeneratorConfig { terrain_scale: 0.0, ..Default::default() };
        assert!(flat_noise.validate().is_err());
    }

    #[test]
    fn test_enclosure_columns() {
        let e = EnclosureConfig { half_size: 10, wall_height: 4 };
        assert!(e.contains_column(10, -10));
        assert!(!e.interior_column(10, 0));
        assert!(e.interior_column(9, -9));
        assert!(!e.contains_column(11, 0));
    }

    #[test]
    fn test_column_allowed_without_enclosure() {
        let config = GeneratorConfig::flat(0);
        assert!(config.column_allowed(100_000, -100_000));
    }
}

//! View range: which sectors should be shown around the player.

use serde::{Deserialize, Serialize};

use crate::core::{Error, Result};
use crate::voxel::{SECTOR_SIZE, SectorCoord};

/// Shape of the shown region around the player's sector.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    /// `|dx| + |dy| + |dz| <= r + r / 2`, clipped to the `r` cube
    #[default]
    Manhattan,
    /// `dx² + dy² + dz² <= r²`
    Spherical,
}

impl DistanceMetric {
    /// Distance of a sector offset under this metric, or `None` when the
    /// offset lies outside `radius`.
    pub fn distance(self, dx: i32, dy: i32, dz: i32, radius: i32) -> Option<i32> {
        if dx.abs() > radius || dy.abs() > radius || dz.abs() > radius {
            return None;
        }
        match self {
            DistanceMetric::Manhattan => {
                let d = dx.abs() + dy.abs() + dz.abs();
                (d <= radius + radius / 2).then_some(d)
            }
            DistanceMetric::Spherical => {
                let d = dx * dx + dy * dy + dz * dz;
                (d <= radius * radius).then_some(d)
            }
        }
    }
}

/// Streaming and scheduling parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamingConfig {
    /// Distance in blocks up to which sectors are shown
    pub view_distance: f32,
    pub metric: DistanceMetric,
    /// Block show/hide operations executed per `process_queue` tick
    pub queue_budget: usize,
    /// Generate sectors on background workers instead of inline
    pub background_generation: bool,
    /// Upper bound on sectors generated at once in the background
    pub max_concurrent_generation: usize,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            view_distance: 60.0,
            metric: DistanceMetric::Manhattan,
            queue_budget: 512,
            background_generation: false,
            max_concurrent_generation: 2,
        }
    }
}

impl StreamingConfig {
    /// View distance in whole sectors.
    pub fn view_radius(&self) -> i32 {
        (self.view_distance.max(0.0) as i32) / SECTOR_SIZE
    }

    pub fn validate(&self) -> Result<()> {
        if !self.view_distance.is_finite() || self.view_distance < 0.0 {
            return Err(Error::Config(format!(
                "view_distance must be a non-negative number, got {}",
                self.view_distance
            )));
        }
        if self.queue_budget == 0 {
            return Err(Error::Config("queue_budget must be positive".into()));
        }
        if self.max_concurrent_generation == 0 {
            return Err(Error::Config("max_concurrent_generation must be positive".into()));
        }
        Ok(())
    }
}

/// Sectors in view of `center`, nearest first.
///
/// Ties are broken by coordinate so the order is fully deterministic.
/// Sectors past the edge of the world are left out.
pub fn sectors_in_view(center: SectorCoord, radius: i32, metric: DistanceMetric) -> Vec<SectorCoord> {
    let mut sectors = Vec::new();
    for dx in -radius..=radius {
        for dy in -radius..=radius {
            for dz in -radius..=radius {
                let Some(d) = metric.distance(dx, dy, dz, radius) else {
                    continue;
                };
                if let Some(sector) = center.checked_offset(dx, dy, dz) {
                    sectors.push((d, sector));
                }
            }
        }
    }
    sectors.sort_unstable();
    sectors.into_iter().map(|(_, sector)| sector).collect()
}

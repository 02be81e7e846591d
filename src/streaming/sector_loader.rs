//! Background sector generation on a dedicated tokio runtime

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use tokio::runtime::Runtime;
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinSet};

use crate::core::Result;
use crate::terrain::{GeneratedSector, TerrainGenerator};
use crate::voxel::SectorCoord;

/// Outcome of one background generation
#[derive(Debug)]
pub enum GenerationResult {
    Generated(GeneratedSector),
    Failed(SectorCoord, String),
}

impl GenerationResult {
    pub fn coord(&self) -> SectorCoord {
        match self {
            GenerationResult::Generated(sector) => sector.coord,
            GenerationResult::Failed(coord, _) => *coord,
        }
    }
}

/// Generates sectors off the simulation thread.
///
/// Requests go to a worker task that keeps at most `max_concurrent`
/// generations running, each on a blocking thread. Results are collected with
/// [`poll_results`](Self::poll_results) and must be registered by the caller.
pub struct SectorLoader {
    request_tx: mpsc::UnboundedSender<SectorCoord>,
    result_rx: mpsc::UnboundedReceiver<GenerationResult>,
    /// Sectors requested but not yet returned
    pending: HashSet<SectorCoord>,
    runtime: Option<Runtime>,
}

/// Output of one blocking generation job, tagged with its sector.
type GenerationTask = (SectorCoord, std::result::Result<GeneratedSector, JoinError>);

impl SectorLoader {
    pub fn new(generator: Arc<TerrainGenerator>, max_concurrent: usize) -> Result<Self> {
        let (request_tx, request_rx) = mpsc::unbounded_channel::<SectorCoord>();
        let (result_tx, result_rx) = mpsc::unbounded_channel::<GenerationResult>();

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("sector-loader")
            .build()?;

        runtime.spawn(Self::worker_loop(generator, max_concurrent.max(1), request_rx, result_tx));

        Ok(Self {
            request_tx,
            result_rx,
            pending: HashSet::new(),
            runtime: Some(runtime),
        })
    }

    async fn worker_loop(
        generator: Arc<TerrainGenerator>,
        max_concurrent: usize,
        mut request_rx: mpsc::UnboundedReceiver<SectorCoord>,
        result_tx: mpsc::UnboundedSender<GenerationResult>,
    ) {
        let mut active: JoinSet<GenerationTask> = JoinSet::new();
        let mut waiting: VecDeque<SectorCoord> = VecDeque::new();
        let mut open = true;

        loop {
            tokio::select! {
                request = request_rx.recv(), if open => match request {
                    Some(coord) => waiting.push_back(coord),
                    None => open = false,
                },

                Some(joined) = active.join_next(), if !active.is_empty() => {
                    let result = match joined {
                        Ok((_, Ok(sector))) => GenerationResult::Generated(sector),
                        Ok((coord, Err(e))) => GenerationResult::Failed(coord, e.to_string()),
                        Err(e) => {
                            log::error!("Sector loader task failed: {}", e);
                            continue;
                        }
                    };
                    if result_tx.send(result).is_err() {
                        // Receiver dropped: the loader is gone.
                        break;
                    }
                }

                else => {}
            }

            while active.len() < max_concurrent {
                let Some(coord) = waiting.pop_front() else {
                    break;
                };
                let generator = Arc::clone(&generator);
                active.spawn(async move {
                    let result = tokio::task::spawn_blocking(move || generator.generate(coord)).await;
                    (coord, result)
                });
            }

            if !open && waiting.is_empty() && active.is_empty() {
                break;
            }
        }
    }

    /// Request generation of a sector.
    ///
    /// Returns `false` if the sector is already pending or the worker is gone.
    pub fn request(&mut self, coord: SectorCoord) -> bool {
        if self.pending.contains(&coord) {
            return false;
        }
        if self.request_tx.send(coord).is_err() {
            log::error!("Sector loader worker stopped; cannot generate {}", coord);
            return false;
        }
        self.pending.insert(coord);
        true
    }

    /// Collect finished generations without blocking.
    pub fn poll_results(&mut self) -> Vec<GenerationResult> {
        let mut results = Vec::new();
        while let Ok(result) = self.result_rx.try_recv() {
            self.pending.remove(&result.coord());
            results.push(result);
        }
        results
    }

    /// Block until the next generation finishes. `None` if nothing is pending.
    ///
    /// Must not be called from inside an async context.
    pub fn wait_result(&mut self) -> Option<GenerationResult> {
        if self.pending.is_empty() {
            return None;
        }
        let result = self.result_rx.blocking_recv()?;
        self.pending.remove(&result.coord());
        Some(result)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn is_pending(&self, coord: SectorCoord) -> bool {
        self.pending.contains(&coord)
    }
}

impl Drop for SectorLoader {
    fn drop(&mut self) {
        // Generation is pure; in-flight work can be abandoned.
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terrain::GeneratorConfig;

    fn flat_loader() -> SectorLoader {
        let generator = Arc::new(TerrainGenerator::new(GeneratorConfig::flat(2)));
        SectorLoader::new(generator, 2).unwrap()
    }

    #[test]
    fn test_pending_tracking() {
        let mut loader = flat_loader();
        let coord = SectorCoord::new(5, 0, 15);

        assert!(loader.request(coord));
        assert!(loader.is_pending(coord));
        assert!(!loader.request(coord));
        assert_eq!(loader.pending_count(), 1);
    }

    #[test]
    fn test_generates_in_background() {
        let mut loader = flat_loader();
        let coords = [SectorCoord::new(0, 0, 0), SectorCoord::new(1, 0, 0), SectorCoord::new(0, 0, 1)];
        for coord in coords {
            loader.request(coord);
        }

        let mut received = Vec::new();
        while let Some(result) = loader.wait_result() {
            match result {
                GenerationResult::Generated(sector) => {
                    assert_eq!(sector.len(), 16 * 16);
                    received.push(sector.coord);
                }
                GenerationResult::Failed(coord, e) => panic!("{} failed: {}", coord, e),
            }
        }
        received.sort();
        let mut expected = coords.to_vec();
        expected.sort();
        assert_eq!(received, expected);
        assert_eq!(loader.pending_count(), 0);
        assert!(loader.poll_results().is_empty());
    }

    #[test]
    fn test_wait_without_requests() {
        let mut loader = flat_loader();
        assert!(loader.wait_result().is_none());
    }
}

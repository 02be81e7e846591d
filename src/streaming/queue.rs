//! Sector show/hide work queue drained under a per-tick budget
//!
//! Sector operations are queued FIFO with at most one queued operation per
//! sector: a newer request replaces the queued one in place. When an
//! operation reaches the head it is expanded into per-block micro-operations,
//! which are executed a bounded number at a time and re-validated against the
//! current world state when they run.

use std::collections::{HashMap, VecDeque};

use crate::voxel::{BlockPos, SectorCoord};

/// What to do with a sector's blocks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SectorOp {
    Show,
    Hide,
}

/// Executes queued work against the world.
pub trait SectorWork {
    /// Block positions an operation will touch, computed when it starts.
    fn expand(&mut self, sector: SectorCoord, op: SectorOp) -> Vec<BlockPos>;

    /// Perform one micro-operation. Must tolerate stale positions.
    fn execute(&mut self, sector: SectorCoord, op: SectorOp, pos: BlockPos);
}

/// Operation currently being worked through.
#[derive(Debug)]
struct ActiveOp {
    sector: SectorCoord,
    op: SectorOp,
    remaining: Vec<BlockPos>,
}

#[derive(Debug, Default)]
pub struct WorkQueue {
    order: VecDeque<SectorCoord>,
    queued: HashMap<SectorCoord, SectorOp>,
    active: Option<ActiveOp>,
}

impl WorkQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an operation. Returns false if it replaced an already queued
    /// operation for the same sector.
    pub fn push(&mut self, sector: SectorCoord, op: SectorOp) -> bool {
        if let Some(queued) = self.queued.get_mut(&sector) {
            log::trace!("Queue: {:?} supersedes {:?} for {}", op, *queued, sector);
            *queued = op;
            return false;
        }
        self.queued.insert(sector, op);
        self.order.push_back(sector);
        true
    }

    /// Queued (not yet started) operation for a sector.
    pub fn queued(&self, sector: SectorCoord) -> Option<SectorOp> {
        self.queued.get(&sector).copied()
    }

    /// Sector operations not yet finished, including the one in progress.
    pub fn len(&self) -> usize {
        self.queued.len() + usize::from(self.active.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Micro-operations left in the operation in progress.
    pub fn active_remaining(&self) -> usize {
        self.active.as_ref().map_or(0, |a| a.remaining.len())
    }

    pub fn clear(&mut self) {
        self.order.clear();
        self.queued.clear();
        self.active = None;
    }

    fn pop_front(&mut self) -> Option<(SectorCoord, SectorOp)> {
        let sector = self.order.pop_front()?;
        let op = self.queued.remove(&sector)?;
        Some((sector, op))
    }

    /// Run micro-operations while `proceed(executed)` returns true.
    /// Expanding an operation is not counted.
    pub fn drain_while(&mut self, work: &mut impl SectorWork, mut proceed: impl FnMut(usize) -> bool) -> usize {
        let mut executed = 0;
        while proceed(executed) {
            let Some(active) = self.active.as_mut() else {
                let Some((sector, op)) = self.pop_front() else {
                    break;
                };
                let remaining = work.expand(sector, op);
                log::trace!("Queue: {:?} {} ({} blocks)", op, sector, remaining.len());
                self.active = Some(ActiveOp { sector, op, remaining });
                continue;
            };
            match active.remaining.pop() {
                Some(pos) => {
                    work.execute(active.sector, active.op, pos);
                    executed += 1;
                }
                None => self.active = None,
            }
        }
        executed
    }

    /// Run at most `budget` micro-operations.
    pub fn drain(&mut self, budget: usize, work: &mut impl SectorWork) -> usize {
        self.drain_while(work, |executed| executed < budget)
    }
}

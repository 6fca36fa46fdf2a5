use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use math::BitVec;
use primitive::{PrimId, Segment};

use crate::partition::{PartitionArena, PartitionList};
use crate::piece::PieceState;
use crate::region::RegionId;
use crate::scene::Scene;
use crate::seg::{SegId, SegStore};
use crate::stats::Stats;

/// Buffers used while shooting one ray. They are owned by a `Resource` between rays and moved
/// out for the duration of a shot, so a hit callback can shoot again with the same resource.
#[derive(Debug)]
pub(crate) struct RayScratch {
    /// Primitives already tested on this ray.
    pub solidbits: BitVec,
    /// Piece primitives reaching behind the backing floor.
    pub backbits: BitVec,
    pub regiontable: Vec<RegionId>,
    pub segs: SegStore,
    /// Segments found in the current cell, not woven yet.
    pub waiting: Vec<SegId>,
    pub finished: Vec<SegId>,
    pub arena: PartitionArena,
    pub input: PartitionList,
    pub output: PartitionList,
    /// Piece primitives holding hits not yet turned into segments.
    pub pending: Vec<PrimId>,
    pub new_segs: Vec<Segment>,
}

impl RayScratch {
    fn new(nprims: usize) -> Self {
        RayScratch {
            solidbits: BitVec::new(nprims),
            backbits: BitVec::new(nprims),
            regiontable: vec![],
            segs: SegStore::new(),
            waiting: vec![],
            finished: vec![],
            arena: PartitionArena::default(),
            input: PartitionList::default(),
            output: PartitionList::default(),
            pending: vec![],
            new_segs: vec![],
        }
    }

    fn reset(&mut self) {
        self.solidbits.clear();
        self.backbits.clear();
        self.regiontable.clear();
        self.segs.clear();
        self.waiting.clear();
        self.finished.clear();
        self.arena.clear();
        self.input.clear();
        self.output.clear();
        self.pending.clear();
        self.new_segs.clear();
    }
}

/// Per-worker state for shooting rays at one `Scene`: piece states, scratch buffers and
/// statistics. Never shared between threads while in use.
#[derive(Debug)]
pub struct Resource {
    scene_id: u64,
    cpu: usize,
    nprims: usize,
    seqno: u64,
    pub(crate) pieces: Vec<PieceState>,
    spare: Vec<RayScratch>,
    pub(crate) stats: Stats,
}

impl Resource {
    pub fn new(scene: &Scene, cpu: usize) -> Self {
        let pieces = scene
            .piece_prims()
            .iter()
            .map(|&p| PieceState::new(p, scene.prim(p).piece_count()))
            .collect();
        Resource {
            scene_id: scene.id(),
            cpu,
            nprims: scene.prims().len(),
            seqno: 0,
            pieces,
            spare: vec![],
            stats: Stats::default(),
        }
    }

    pub fn cpu(&self) -> usize {
        self.cpu
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    /// Returns the statistics gathered so far and starts counting from zero.
    pub fn take_stats(&mut self) -> Stats {
        std::mem::take(&mut self.stats)
    }

    pub fn belongs_to(&self, scene: &Scene) -> bool {
        self.scene_id == scene.id()
    }

    /// The piece state kept for `prim`, if it is piece-enabled.
    pub fn piece_state(&self, prim: PrimId) -> Option<&PieceState> {
        self.pieces.iter().find(|p| p.prim() == prim)
    }

    pub(crate) fn next_seqno(&mut self) -> u64 {
        self.seqno += 1;
        self.seqno
    }

    pub(crate) fn take_scratch(&mut self) -> RayScratch {
        match self.spare.pop() {
            Some(mut scratch) => {
                scratch.reset();
                scratch
            }
            None => RayScratch::new(self.nprims),
        }
    }

    pub(crate) fn return_scratch(&mut self, scratch: RayScratch) {
        self.spare.push(scratch);
    }
}

/// Hands out `Resource`s to worker threads and keeps the ones handed back for reuse.
pub struct ResourcePool<'s> {
    scene: &'s Scene,
    free: Mutex<Vec<Resource>>,
    created: AtomicUsize,
}

impl<'s> ResourcePool<'s> {
    pub fn new(scene: &'s Scene) -> Self {
        ResourcePool {
            scene,
            free: Mutex::new(vec![]),
            created: AtomicUsize::new(0),
        }
    }

    pub fn scene(&self) -> &'s Scene {
        self.scene
    }

    pub fn acquire(&self) -> Resource {
        let reused = self
            .free
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop();
        reused.unwrap_or_else(|| {
            let cpu = self.created.fetch_add(1, Ordering::Relaxed);
            log::trace!("creating resource #{}", cpu);
            Resource::new(self.scene, cpu)
        })
    }

    pub fn release(&self, res: Resource) {
        debug_assert!(res.belongs_to(self.scene));
        self.free
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(res);
    }

    /// Number of resources created so far.
    pub fn created(&self) -> usize {
        self.created.load(Ordering::Relaxed)
    }

    /// Sum of the statistics of every resource currently in the pool.
    pub fn total_stats(&self) -> Stats {
        self.free
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(Resource::stats)
            .sum()
    }
}

//! Walks a ray from cell to cell through a `CutterTree`.

use cutter::{CellId, CutterTree, NodeId};
use geometry::{InvDir, Ray};
use math::float::Float;

use crate::config::TraceConfig;
use crate::error::StuckError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Tree,
    /// The tree is exhausted; the infinite cell is next.
    InfiniteNext,
    Done,
}

/// Traversal state of one ray.
///
/// Distances are parameters of the shot ray. `newray` is the ray re-anchored at the point where
/// the current cell was located, clipped to that cell; distances along it convert back to the
/// shot ray by adding `dist_corr`.
#[derive(Debug, Clone)]
pub(crate) struct Traversal<'a> {
    tree: &'a CutterTree,
    ray: Ray,
    inv: InvDir,
    offset: f64,
    max_push: usize,
    phase: Phase,
    last_cell: Option<NodeId>,
    pub box_start: f64,
    pub box_end: f64,
    pub model_end: f64,
    pub box_num: usize,
    /// Pushes past stagnant cells over the whole ray.
    pub pushes: u64,
    pub newray: Ray,
    pub dist_corr: f64,
}

impl<'a> Traversal<'a> {
    /// Starts at `box_start` and leaves the tree past `model_end`.
    pub fn new(
        tree: &'a CutterTree,
        ray: Ray,
        inv: InvDir,
        config: &TraceConfig,
        box_start: f64,
        model_end: f64,
    ) -> Self {
        Traversal {
            tree,
            ray,
            inv,
            offset: config.offset_dist,
            max_push: config.max_push,
            phase: Phase::Tree,
            last_cell: None,
            box_start,
            box_end: box_start,
            model_end,
            box_num: 0,
            pushes: 0,
            newray: ray,
            dist_corr: 0.0,
        }
    }

    /// A ray that misses the model box but may still hit unbounded primitives: only the
    /// infinite cell is visited.
    pub fn infinite_only(tree: &'a CutterTree, ray: Ray, inv: InvDir, config: &TraceConfig) -> Self {
        let mut trav = Self::new(
            tree,
            ray,
            inv,
            config,
            config.backing_dist,
            f64::INFINITY,
        );
        trav.phase = Phase::InfiniteNext;
        trav
    }

    /// Moves to the next cell along the ray. `Ok(None)` once the ray has left the model and
    /// the infinite cell (if any) was visited.
    ///
    /// An `Err` means the ray kept landing in the same cell; the rest of the tree is skipped,
    /// but the traversal stays usable and still yields the infinite cell.
    pub fn advance(&mut self) -> Result<Option<CellId>, StuckError> {
        match self.phase {
            Phase::Done => return Ok(None),
            Phase::InfiniteNext => return Ok(Some(self.enter_infinite())),
            Phase::Tree => (),
        }
        self.box_num += 1;
        let model = self.tree.model_bbox();
        let mut pushes = 0;
        let mut t0 = self.box_start + self.offset;
        loop {
            let p = self.ray.position_at(t0);
            if model.departing(&self.inv.step, p) {
                return Ok(self.escape());
            }
            let (id, cell) = self.tree.locate(p);
            let local = Ray::new(p, self.ray.dir);
            // A point already past its cell's box, or a repeat of the last cell, is stagnant.
            let clipped = match self.last_cell {
                _ if cell.bbox.departing(&self.inv.step, p) => None,
                Some(last) if last == id => None,
                _ => cell.bbox.clip(&local, &self.inv),
            };
            if let Some(iv) = clipped {
                self.last_cell = Some(id);
                self.dist_corr = t0;
                self.newray = local.with_extent(iv.min, iv.max);
                self.box_start = self.box_start.max(t0 + iv.min);
                self.box_end = t0 + iv.max;
                return Ok(Some(CellId::Node(id)));
            }

            pushes += 1;
            self.pushes += 1;
            let base = self.box_end.max(t0);
            let delta = (2.0 * base.ulp()).max(1.0);
            self.box_start = base + delta;
            self.box_end = self.box_start + delta;
            log::trace!(
                "push {} in cell {:?}: box now [{}, {}]",
                pushes,
                id,
                self.box_start,
                self.box_end
            );
            if pushes > self.max_push {
                self.phase = self.after_tree();
                return Err(StuckError {
                    cell: id,
                    pushes,
                    box_num: self.box_num,
                    box_start: self.box_start,
                    box_end: self.box_end,
                });
            }
            if self.box_start > self.model_end {
                return Ok(self.escape());
            }
            t0 = self.box_start + self.offset;
        }
    }

    fn after_tree(&self) -> Phase {
        match self.tree.has_infinite() {
            true => Phase::InfiniteNext,
            false => Phase::Done,
        }
    }

    fn escape(&mut self) -> Option<CellId> {
        self.phase = self.after_tree();
        match self.phase {
            Phase::InfiniteNext => Some(self.enter_infinite()),
            _ => None,
        }
    }

    fn enter_infinite(&mut self) -> CellId {
        self.phase = Phase::Done;
        self.box_num += 1;
        self.newray = self.ray;
        self.dist_corr = 0.0;
        self.box_end = f64::INFINITY;
        CellId::Infinite
    }
}

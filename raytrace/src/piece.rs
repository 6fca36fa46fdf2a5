use cutter::CellId;
use geometry::{BBox, InvDir, Ray};
use math::BitVec;
use primitive::{HitTable, PrimId};

/// Hits of one piece-enabled primitive, gathered cell by cell as a ray passes through its
/// bounding box. Kept per worker and reused for every ray; `seqno` tells which ray the contents
/// belong to.
#[derive(Debug, Clone)]
pub struct PieceState {
    prim: PrimId,
    seqno: u64,
    /// One bit per piece already tested on this ray.
    pub shot: BitVec,
    pub hits: HitTable,
    /// Where the current ray enters and leaves the primitive's bounding box.
    pub min_dist: f64,
    pub max_dist: f64,
    /// Cell being processed, for diagnostics.
    pub cell: Option<CellId>,
}

impl PieceState {
    pub fn new(prim: PrimId, piece_count: usize) -> Self {
        PieceState {
            prim,
            seqno: 0,
            shot: BitVec::new(piece_count),
            hits: HitTable::new(),
            min_dist: 0.0,
            max_dist: 0.0,
            cell: None,
        }
    }

    pub fn prim(&self) -> PrimId {
        self.prim
    }

    pub fn seqno(&self) -> u64 {
        self.seqno
    }

    /// True if the state was last touched by ray `seqno`.
    pub fn is_current(&self, seqno: u64) -> bool {
        self.seqno == seqno
    }

    /// Forgets the previous ray and clips `ray` against `bbox`, the primitive's bounds. Returns
    /// false if the ray misses them; the state then holds no usable interval.
    ///
    /// `dist_corr` converts distances along `ray` back to the shot ray.
    pub fn begin(&mut self, seqno: u64, bbox: &BBox, ray: &Ray, inv: &InvDir, dist_corr: f64) -> bool {
        self.seqno = seqno;
        self.shot.clear();
        self.hits.clear();
        match bbox.clip(ray, inv) {
            Some(iv) => {
                self.min_dist = iv.min + dist_corr;
                self.max_dist = iv.max + dist_corr;
                true
            }
            None => false,
        }
    }

    /// True once a cell ending at `box_end` lies past the primitive, so no further piece can
    /// add hits.
    pub fn is_complete(&self, box_end: f64) -> bool {
        box_end > self.max_dist
    }
}

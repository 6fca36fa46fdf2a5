use std::fmt::{Display, Formatter};

use primitive::{Hit, PrimId, Segment};

/// Handle of a segment in the per-ray `SegStore`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SegId(pub usize);

/// A primitive's segment, with distances in the parameter of the ray being shot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Seg {
    pub prim: PrimId,
    pub inhit: Hit,
    pub outhit: Hit,
}

impl Seg {
    pub fn new(prim: PrimId, seg: Segment) -> Self {
        Seg {
            prim,
            inhit: seg.inhit,
            outhit: seg.outhit,
        }
    }
}

impl Display for Seg {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} [{} .. {}]", self.prim, self.inhit, self.outhit)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum End {
    In,
    Out,
}

/// Refers to one end of a stored segment. Partition boundaries are such references, so fusing
/// two boundaries means writing one distance into the other's hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HitRef {
    pub seg: SegId,
    pub end: End,
}

impl HitRef {
    pub fn entry(seg: SegId) -> Self {
        HitRef { seg, end: End::In }
    }
    pub fn exit(seg: SegId) -> Self {
        HitRef { seg, end: End::Out }
    }
}

/// Owns the segments found for one ray. Cleared, not freed, between rays.
#[derive(Debug, Default)]
pub struct SegStore {
    segs: Vec<Seg>,
}

impl SegStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, seg: Seg) -> SegId {
        self.segs.push(seg);
        SegId(self.segs.len() - 1)
    }

    pub fn get(&self, id: SegId) -> &Seg {
        &self.segs[id.0]
    }

    pub fn get_mut(&mut self, id: SegId) -> &mut Seg {
        &mut self.segs[id.0]
    }

    pub fn hit(&self, h: HitRef) -> &Hit {
        let seg = self.get(h.seg);
        match h.end {
            End::In => &seg.inhit,
            End::Out => &seg.outhit,
        }
    }

    pub fn dist(&self, h: HitRef) -> f64 {
        self.hit(h).dist
    }

    pub fn set_dist(&mut self, h: HitRef, dist: f64) {
        let seg = self.get_mut(h.seg);
        match h.end {
            End::In => seg.inhit.dist = dist,
            End::Out => seg.outhit.dist = dist,
        }
    }

    pub fn clear(&mut self) {
        self.segs.clear();
    }
}

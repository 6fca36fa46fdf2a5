mod hit;
mod mesh;
mod simple;

use std::fmt::{Display, Formatter};

use geometry::{BBox, Ray};
use math::hcm::Vec3;
use math::BitVec;

pub use hit::{Hit, HitTable, Segment};
pub use mesh::*;
pub use simple::*;

/// Index of a primitive in a scene's primitive table. Also its bit in per-ray dedup vectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PrimId(pub usize);

impl PrimId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl Display for PrimId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "prim#{}", self.0)
    }
}

/// An optional capability of a primitive that the engine may require.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    PieceShot,
    PieceHitsegs,
}

impl Display for Capability {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Capability::PieceShot => write!(f, "piece_shot"),
            Capability::PieceHitsegs => write!(f, "piece_hitsegs"),
        }
    }
}

/// Represents the capabilities of a solid primitive: it has a bounding box, and can report the
/// segments along which a ray is inside it.
/// - See `simple.rs` for `Sphere`, `Cuboid` and the unbounded `HalfSpace`.
/// - See `mesh.rs` for `TriangleMesh`, which can be split into pieces (one per triangle).
///
/// All intersection routines treat the ray as an infinite line: hits behind `ray.origin` are
/// reported with negative distances.
pub trait Primitive: Send + Sync {
    fn summary(&self) -> String;
    fn bbox(&self) -> BBox;

    /// True for primitives that extend to infinity. These are kept out of the space partition.
    fn is_infinite(&self) -> bool {
        self.bbox().is_infinite()
    }

    /// Opts in to a bounding-box rejection before `shot()` is called.
    fn use_rpp(&self) -> bool {
        false
    }

    /// Appends the in/out segments of `ray` with this solid to `segs`, in increasing distance,
    /// and returns how many were added (0 on a miss).
    fn shot(&self, ray: &Ray, segs: &mut Vec<Segment>) -> usize;

    /// Number of independently testable pieces, or 0 if the primitive is always shot whole.
    fn piece_count(&self) -> usize {
        0
    }

    fn piece_bbox(&self, _piece: usize) -> Option<BBox> {
        None
    }

    /// Tests the listed `pieces` against `ray`, skipping any already marked in `shot`. Hits are
    /// appended to `hits` with `dist_corr` added to their distances. Returns the number of new
    /// hits.
    fn piece_shot(
        &self,
        _shot: &mut BitVec,
        _hits: &mut HitTable,
        _pieces: &[usize],
        _dist_corr: f64,
        _ray: &Ray,
    ) -> Result<usize, Capability> {
        Err(Capability::PieceShot)
    }

    /// Converts accumulated piece hits into segments, draining `hits`.
    fn piece_hitsegs(
        &self,
        _hits: &mut HitTable,
        _ray: &Ray,
        _segs: &mut Vec<Segment>,
    ) -> Result<usize, Capability> {
        Err(Capability::PieceHitsegs)
    }

    /// Outward unit surface normal at `hit`.
    fn norm(&self, hit: &Hit, ray: &Ray) -> Vec3;

    /// Surface parameterization of `hit`, each in [0, 1].
    fn uv(&self, _hit: &Hit, _ray: &Ray) -> (f64, f64) {
        (0.0, 0.0)
    }
}

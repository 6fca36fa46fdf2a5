use crate::partition::Partitions;
use crate::region::RegionId;
use crate::resource::Resource;
use crate::scene::Scene;
use crate::shoot::Shot;

/// Which of two overlapping regions keeps a partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlapClaim {
    /// Drop the partition altogether.
    Neither,
    First,
    Second,
}

/// A partition claimed by more than one region.
#[derive(Clone, Copy)]
pub struct OverlapReport<'a> {
    pub scene: &'a Scene,
    pub in_dist: f64,
    pub out_dist: f64,
    /// Every region whose boolean tree claims the partition, in evaluation order.
    pub claimants: &'a [RegionId],
    /// Region of the last partition already finalized on this ray.
    pub previous: Option<RegionId>,
}

/// Resolution used when an application does not override `Application::overlap`: air yields to
/// the other region, then the region of the previous partition is repeated if it is one of the
/// two, then the lower region id wins.
pub fn default_overlap(report: &OverlapReport<'_>, r1: RegionId, r2: RegionId) -> OverlapClaim {
    if report.scene.region(r1).is_air() {
        return OverlapClaim::Second;
    }
    match report.previous {
        Some(prev) if prev == r1 => return OverlapClaim::First,
        Some(prev) if prev == r2 => return OverlapClaim::Second,
        _ => (),
    }
    if r1 < r2 {
        OverlapClaim::First
    } else {
        OverlapClaim::Second
    }
}

/// What the caller sees once a ray is done.
pub struct HitContext<'a> {
    pub scene: &'a Scene,
    /// Free for recursive shots; the partitions below do not borrow from it.
    pub resource: &'a mut Resource,
    pub shot: &'a Shot,
    pub partitions: Partitions<'a>,
}

pub struct MissContext<'a> {
    pub scene: &'a Scene,
    pub resource: &'a mut Resource,
    pub shot: &'a Shot,
}

/// The caller side of a shot. Exactly one of `hit`/`miss` is called per successful shot, and
/// its result is what `Scene::shoot` returns.
pub trait Application {
    type Output;

    fn hit(&mut self, ctx: HitContext<'_>) -> Self::Output;
    fn miss(&mut self, ctx: MissContext<'_>) -> Self::Output;

    /// Told about every overlap before it is resolved.
    fn log_overlap(&mut self, _report: &OverlapReport<'_>) {}

    /// Decides between two regions claiming the same partition.
    fn overlap(&mut self, report: &OverlapReport<'_>, r1: RegionId, r2: RegionId) -> OverlapClaim {
        default_overlap(report, r1, r2)
    }
}

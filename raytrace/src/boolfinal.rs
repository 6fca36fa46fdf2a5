//! Boolean evaluation of woven partitions.
//!
//! Partitions move from the input list to the final list once they are known to be complete
//! and exactly one region claims them. With `onehit` set this stops as soon as enough final
//! hits exist in front of `enddist`, which lets the traversal quit early.

use itertools::Itertools;
use math::float::Float;
use math::BitVec;
use primitive::PrimId;

use crate::app::{Application, OverlapClaim, OverlapReport};
use crate::partition::{PartId, PartitionArena, PartitionList};
use crate::region::{RegionId, XorGuard};
use crate::scene::Scene;
use crate::seg::SegStore;

/// Partitions ending this close in front of the origin are dropped.
const BEHIND_RAY: f64 = 0.001;

pub(crate) struct Finalizer<'a, A> {
    pub scene: &'a Scene,
    pub segs: &'a mut SegStore,
    pub arena: &'a mut PartitionArena,
    pub input: &'a mut PartitionList,
    pub output: &'a mut PartitionList,
    pub regiontable: &'a mut Vec<RegionId>,
    pub solidbits: &'a BitVec,
    pub onehit: i32,
    pub no_booleans: bool,
    pub app: &'a mut A,
}

impl<'a, A: Application> Finalizer<'a, A> {
    /// Finalizes what it can of the input list up to `enddist`. Returns true once the
    /// `onehit` request is satisfied and tracing may stop.
    pub fn finalize(&mut self, startdist: f64, enddist: f64) -> bool {
        log::trace!("finalizing partitions in [{}, {}]", startdist, enddist);
        if enddist <= 0.0 {
            return false;
        }
        let tol = self.scene.config().tol.dist;
        let hits_needed = self.onehit.unsigned_abs() as usize;
        let mut hits_avail = 0;
        if self.onehit != 0 {
            hits_avail = 2 * self
                .output
                .ids(self.arena)
                .filter(|&id| self.counts_as_hit(id))
                .count();
            if hits_avail >= hits_needed {
                return true;
            }
        }
        if self.no_booleans {
            self.finalize_unevaluated();
            return false;
        }

        let mut cursor = self.input.head();
        while let Some(pp) = cursor {
            let next = self.arena[pp].next();
            let (inhit, outhit) = (self.arena[pp].inhit, self.arena[pp].outhit);
            let din = self.segs.dist(inhit);
            if (din - self.segs.dist(outhit)).near_zero(tol) {
                self.segs.set_dist(outhit, din);
            }
            let dout = self.segs.dist(outhit);
            if din > dout {
                log::debug!("partition [{}, {}] is inside out", din, dout);
            }
            if let Some(next) = next {
                let next_in = self.arena[next].inhit;
                let diff = dout - self.segs.dist(next_in);
                if diff != 0.0 {
                    if diff.near_zero(tol) {
                        log::debug!("fusing partition boundary at {}", dout);
                        self.segs.set_dist(next_in, dout);
                    } else if diff > 0.0 {
                        log::debug!(
                            "sorting defect: partition ending at {} overlaps the next by {}",
                            dout,
                            diff
                        );
                        return false;
                    }
                }
            }

            if dout <= BEHIND_RAY {
                self.discard(pp);
                cursor = next;
                continue;
            }
            if din - enddist > tol {
                // Later segments may still land in front of this one.
                return false;
            }
            let indefinite = dout - enddist > tol;
            if indefinite && self.onehit != 1 {
                return false;
            }

            self.collect_regions(pp);
            if indefinite && !self.eligible() {
                return false;
            }
            let claims = self.claims(pp);
            let region = match claims.len() {
                0 => {
                    cursor = next;
                    continue;
                }
                1 => claims[0],
                _ => match self.resolve_overlap(pp, &claims) {
                    Some(r) => r,
                    None => {
                        self.discard(pp);
                        cursor = next;
                        continue;
                    }
                },
            };

            self.input.remove(self.arena, pp);
            cursor = next;
            if self.claim(pp, region) {
                hits_avail += 2;
            }
            if self.onehit != 0 && hits_avail >= hits_needed {
                return true;
            }
        }
        self.onehit != 0 && hits_avail >= hits_needed
    }

    fn counts_as_hit(&self, id: PartId) -> bool {
        let part = &self.arena[id];
        if self.segs.dist(part.inhit) < 0.0 {
            return false;
        }
        !(self.onehit < 0 && part.region.map_or(false, |r| self.scene.region(r).is_air()))
    }

    fn discard(&mut self, pp: PartId) {
        self.input.remove(self.arena, pp);
        self.arena.free(pp);
    }

    /// Without booleans every partition belongs to the first region of its entry primitive.
    fn finalize_unevaluated(&mut self) {
        while let Some(pp) = self.input.head() {
            self.input.remove(self.arena, pp);
            let prim = self.segs.get(self.arena[pp].inhit.seg).prim;
            match self.scene.prim_regions(prim).first() {
                Some(&region) => {
                    self.arena[pp].region = Some(region);
                    self.output.push_back(self.arena, pp);
                }
                None => {
                    log::debug!("{} belongs to no region, dropping its partition", prim);
                    self.arena.free(pp);
                }
            }
        }
    }

    /// Fills the region table with every region using a primitive of the partition.
    fn collect_regions(&mut self, pp: PartId) {
        let (scene, segs) = (self.scene, &*self.segs);
        let regions = self.arena[pp]
            .seglist
            .iter()
            .flat_map(|&seg| {
                let prim = segs.get(seg).prim;
                let owners = scene.prim_regions(prim);
                if owners.is_empty() {
                    log::debug!("segment of {} has no owning region", prim);
                }
                owners.iter().copied()
            })
            .unique();
        self.regiontable.clear();
        self.regiontable.extend(regions);
    }

    /// True if every primitive of every involved region has been shot, so the partition
    /// cannot change any more.
    fn eligible(&self) -> bool {
        let tested = |p: PrimId| self.solidbits.test(p.index());
        self.regiontable
            .iter()
            .all(|&r| self.scene.region(r).tree().is_ready(&tested))
    }

    fn claims(&self, pp: PartId) -> Vec<RegionId> {
        let part = &self.arena[pp];
        let present = |p: PrimId| part.seglist.iter().any(|&s| self.segs.get(s).prim == p);
        self.regiontable
            .iter()
            .copied()
            .filter(|&r| {
                let region = self.scene.region(r);
                if region.all_unions() {
                    return true;
                }
                match region.tree().eval(&present) {
                    Ok(claimed) => claimed,
                    Err(XorGuard) => {
                        log::debug!("{} overlaps itself through an exclusive or", region.name());
                        true
                    }
                }
            })
            .collect()
    }

    /// Settles a partition claimed by several regions. Returns the single winner, or `None` if
    /// the partition is to be dropped.
    fn resolve_overlap(&mut self, pp: PartId, claims: &[RegionId]) -> Option<RegionId> {
        let report = OverlapReport {
            scene: self.scene,
            in_dist: self.segs.dist(self.arena[pp].inhit),
            out_dist: self.segs.dist(self.arena[pp].outhit),
            claimants: claims,
            previous: self.output.tail().and_then(|t| self.arena[t].region),
        };
        self.app.log_overlap(&report);

        let mut table = claims.iter().copied().map(Some).collect::<Vec<_>>();
        let mut last = 0;
        for i in 1..table.len() {
            let (reg, lastreg) = match (table[i], table[last]) {
                (Some(reg), Some(lastreg)) => (reg, lastreg),
                _ => continue,
            };
            let (a, b) = (self.scene.region(lastreg), self.scene.region(reg));
            let claim = if a.is_air() && !b.is_air() {
                OverlapClaim::Second
            } else if (!a.is_air() && b.is_air()) || (a.is_air() && a.aircode() == b.aircode()) {
                OverlapClaim::First
            } else {
                self.app.overlap(&report, lastreg, reg)
            };
            match claim {
                OverlapClaim::Neither => return None,
                OverlapClaim::First => table[i] = None,
                OverlapClaim::Second => {
                    table[last] = None;
                    last = i;
                }
            }
        }

        let survivors = table.into_iter().flatten().collect::<Vec<_>>();
        match survivors.as_slice() {
            [winner] => Some(*winner),
            _ => {
                log::debug!(
                    "overlap at [{}, {}] left {} regions, dropping it",
                    report.in_dist,
                    report.out_dist,
                    survivors.len()
                );
                None
            }
        }
    }

    /// Moves an unlinked partition to the final list under `region`, merging it into the last
    /// final partition when that one has the same region and ends where this one starts.
    /// Returns true if it adds countable hits.
    fn claim(&mut self, pp: PartId, region: RegionId) -> bool {
        let tol = self.scene.config().tol.dist;
        self.arena[pp].region = Some(region);
        if let Some(last) = self.output.tail() {
            let touching = (self.segs.dist(self.arena[pp].inhit)
                - self.segs.dist(self.arena[last].outhit))
            .near_zero(tol);
            if self.arena[last].region == Some(region) && touching {
                let (outhit, outflip) = (self.arena[pp].outhit, self.arena[pp].outflip);
                let (inseg, outseg) = (self.arena[pp].inhit.seg, outhit.seg);
                let merged = &mut self.arena[last];
                merged.outhit = outhit;
                merged.outflip = outflip;
                merged.add_seg(inseg);
                merged.add_seg(outseg);
                self.arena.free(pp);
                return false;
            }
        }
        self.output.push_back(self.arena, pp);
        !(self.onehit < 0 && self.scene.region(region).is_air())
    }
}

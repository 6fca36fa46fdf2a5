//! Merging segments into the distance-ordered partition list.
//!
//! Every partition boundary is the entry or exit hit of some segment. Weaving a segment splits
//! the partitions it partly covers and creates new ones for the stretches it covers alone;
//! boundaries that fall within tolerance of each other are fused by copying one distance into
//! the other hit, so neighbouring partitions meet exactly.

use math::float::Float;

use crate::partition::{PartId, Partition, PartitionArena, PartitionList};
use crate::seg::{HitRef, SegId, SegStore};

/// Segments that end further behind the origin than this never matter.
const BEHIND_START: f64 = -10.0;

pub(crate) struct Weaver<'a> {
    pub segs: &'a mut SegStore,
    pub arena: &'a mut PartitionArena,
    pub list: &'a mut PartitionList,
    pub tol: f64,
    pub no_booleans: bool,
}

impl<'a> Weaver<'a> {
    /// Weaves each waiting segment into the list, moving it to `finished` whether or not it
    /// ends up in a partition.
    pub fn weave(&mut self, waiting: &mut Vec<SegId>, finished: &mut Vec<SegId>) {
        for seg in waiting.drain(..) {
            finished.push(seg);
            self.weave_one(seg);
        }
    }

    fn dist(&self, h: HitRef) -> f64 {
        self.segs.dist(h)
    }

    fn weave_one(&mut self, seg_id: SegId) {
        let tol = self.tol;
        let seg = self.segs.get_mut(seg_id);
        if seg.inhit.dist.near_zero(tol) {
            seg.inhit.dist = 0.0;
        }
        if seg.outhit.dist.near_zero(tol) {
            seg.outhit.dist = 0.0;
        }
        let seg = *seg;
        if seg.outhit.dist < BEHIND_START {
            return;
        }
        if seg.inhit.dist.is_nan() || seg.outhit.dist.is_nan() {
            log::warn!("dropping non-finite segment {}", seg);
            return;
        }
        if seg.inhit.dist > seg.outhit.dist {
            log::warn!("dropping inside-out segment {}", seg);
            return;
        }

        let tail = match self.list.tail() {
            Some(tail) => tail,
            None => {
                self.append(Partition::spanning(seg_id));
                return;
            }
        };
        if self.no_booleans {
            self.insert_sorted(seg_id);
            return;
        }
        if (seg.inhit.dist - seg.outhit.dist).near_zero(tol) {
            self.weave_zero(seg_id);
            return;
        }
        if seg.inhit.dist >= self.dist(self.arena[tail].outhit) {
            self.append(Partition::spanning(seg_id));
            return;
        }
        self.weave_overlapping(seg_id);
    }

    fn append(&mut self, part: Partition) -> PartId {
        let id = self.arena.alloc(part);
        self.list.push_back(self.arena, id);
        id
    }

    fn insert_before(&mut self, at: PartId, part: Partition) {
        let id = self.arena.alloc(part);
        self.list.insert_before(self.arena, at, id);
    }

    /// Without booleans, partitions are just the segments sorted by entry.
    fn insert_sorted(&mut self, seg_id: SegId) {
        let entry = self.dist(HitRef::entry(seg_id));
        let at = self
            .list
            .ids(self.arena)
            .find(|&pp| entry < self.segs.dist(self.arena[pp].inhit));
        match at {
            Some(pp) => self.insert_before(pp, Partition::spanning(seg_id)),
            None => {
                self.append(Partition::spanning(seg_id));
            }
        }
    }

    /// A segment of zero thickness only gets a partition of its own where it touches none.
    fn weave_zero(&mut self, seg_id: SegId) {
        let tol = self.tol;
        let entry = self.dist(HitRef::entry(seg_id));
        let exit = self.dist(HitRef::exit(seg_id));
        let head = match self.list.head() {
            Some(head) => head,
            None => return,
        };
        if exit < self.dist(self.arena[head].inhit) {
            let id = self.arena.alloc(Partition::spanning(seg_id));
            self.list.push_front(self.arena, id);
            return;
        }
        let mut cursor = Some(head);
        while let Some(pp) = cursor {
            let pin = self.dist(self.arena[pp].inhit);
            let pout = self.dist(self.arena[pp].outhit);
            let near = |a: f64, b: f64| (a - b).near_zero(tol);
            if near(entry, pin) || near(exit, pin) || near(entry, pout) || near(exit, pout) {
                return;
            }
            if exit <= pout && entry >= pin {
                return;
            }
            cursor = self.arena[pp].next();
            let before_next = match cursor {
                None => true,
                Some(next) => exit < self.dist(self.arena[next].inhit),
            };
            if before_next {
                let id = self.arena.alloc(Partition::spanning(seg_id));
                self.list.insert_after(self.arena, pp, id);
                return;
            }
        }
    }

    /// The general case: the segment starts before the last partition ends.
    ///
    /// `lasthit` is where the not-yet-consumed part of the segment starts; it moves forward
    /// through the partitions until the segment is used up.
    fn weave_overlapping(&mut self, seg_id: SegId) {
        let tol = self.tol;
        let seg_in = HitRef::entry(seg_id);
        let seg_out = HitRef::exit(seg_id);
        let mut lasthit = seg_in;
        let mut lastflip = false;

        let mut cursor = self.list.head();
        while let Some(pp) = cursor {
            cursor = self.arena[pp].next();
            let last = self.dist(lasthit);
            let diff_se = last - self.dist(self.arena[pp].outhit);
            if diff_se > tol {
                // Starts beyond the end of this partition.
                continue;
            }
            let diff = last - self.dist(self.arena[pp].inhit);
            if diff_se > -tol && diff > tol {
                // Starts at the end of this partition: fuse.
                let pout = self.dist(self.arena[pp].outhit);
                self.segs.set_dist(lasthit, pout);
                continue;
            }

            if diff > tol {
                // Starts inside the partition: split off the stretch before the segment.
                let newpp = self.arena.dup(pp);
                self.arena[newpp].outhit = seg_in;
                self.arena[newpp].outflip = true;
                self.arena[pp].inhit = seg_in;
                self.arena[pp].inflip = false;
                self.list.insert_before(self.arena, pp, newpp);
            } else if diff > -tol {
                // Starts with the partition. Prefer the segment's entry if it is slightly
                // closer and does not reach back into the previous partition.
                let entry = self.dist(seg_in);
                let d = entry - self.dist(self.arena[pp].inhit);
                let clear_of_prev = match self.arena[pp].prev() {
                    None => true,
                    Some(prev) => self.dist(self.arena[prev].outhit) <= entry,
                };
                if clear_of_prev && d.near_zero(tol) && d < 0.0 {
                    self.arena[pp].inhit = seg_in;
                    self.arena[pp].inflip = false;
                }
            } else {
                // Starts before the partition: the segment alone covers the gap.
                let pin = self.arena[pp].inhit;
                let mut newpp = Partition::new(lasthit, lastflip, seg_out, false, seg_id);
                let d = self.dist(seg_out) - self.dist(pin);
                if d < -tol {
                    self.insert_before(pp, newpp);
                    return;
                }
                if d < tol {
                    let pin_dist = self.dist(pin);
                    self.segs.set_dist(seg_out, pin_dist);
                    self.insert_before(pp, newpp);
                    return;
                }
                newpp.outhit = pin;
                newpp.outflip = true;
                self.insert_before(pp, newpp);
            }

            // The segment and `pp` now start together.
            let d = self.dist(seg_out) - self.dist(self.arena[pp].outhit);
            if d > tol {
                // Extends past the partition; carry on with the rest.
                self.arena[pp].add_seg(seg_id);
                lasthit = self.arena[pp].outhit;
                lastflip = true;
                continue;
            }
            if d > -tol {
                self.arena[pp].add_seg(seg_id);
                return;
            }
            // Ends inside the partition: split at the segment's exit.
            let newpp = self.arena.dup(pp);
            self.arena[newpp].add_seg(seg_id);
            self.arena[newpp].outhit = seg_out;
            self.arena[newpp].outflip = false;
            self.arena[pp].inhit = seg_out;
            self.arena[pp].inflip = true;
            self.list.insert_before(self.arena, pp, newpp);
            return;
        }

        // Whatever is left extends past the last partition.
        self.append(Partition::new(lasthit, lastflip, seg_out, false, seg_id));
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::seg::Seg;
    use primitive::{Hit, PrimId, Segment};

    pub(crate) struct Fixture {
        pub segs: SegStore,
        pub arena: PartitionArena,
        pub list: PartitionList,
        pub finished: Vec<SegId>,
    }

    impl Fixture {
        pub fn new() -> Self {
            Fixture {
                segs: SegStore::new(),
                arena: PartitionArena::default(),
                list: PartitionList::default(),
                finished: vec![],
            }
        }

        pub fn add(&mut self, prim: usize, a: f64, b: f64) -> SegId {
            self.segs.push(Seg::new(
                PrimId(prim),
                Segment::new(Hit::new(a, 0), Hit::new(b, 1)),
            ))
        }

        pub fn weave(&mut self, segs: &[(usize, f64, f64)], no_booleans: bool) {
            let mut waiting = segs
                .iter()
                .map(|&(p, a, b)| self.add(p, a, b))
                .collect::<Vec<_>>();
            Weaver {
                segs: &mut self.segs,
                arena: &mut self.arena,
                list: &mut self.list,
                tol: 0.0005,
                no_booleans,
            }
            .weave(&mut waiting, &mut self.finished);
            assert!(waiting.is_empty());
        }

        /// (in, out, prims, inflip, outflip) for each partition.
        pub fn dump(&self) -> Vec<(f64, f64, Vec<usize>, bool, bool)> {
            self.list
                .ids(&self.arena)
                .map(|id| {
                    let p = &self.arena[id];
                    let mut prims = p
                        .seglist
                        .iter()
                        .map(|&s| self.segs.get(s).prim.0)
                        .collect::<Vec<_>>();
                    prims.sort_unstable();
                    (
                        self.segs.dist(p.inhit),
                        self.segs.dist(p.outhit),
                        prims,
                        p.inflip,
                        p.outflip,
                    )
                })
                .collect()
        }

        pub fn spans(&self) -> Vec<(f64, f64)> {
            self.dump().into_iter().map(|(a, b, ..)| (a, b)).collect()
        }
    }

    #[test]
    fn disjoint_segments_are_sorted() {
        let mut f = Fixture::new();
        f.weave(&[(0, 10.0, 12.0), (1, 2.0, 4.0), (2, 6.0, 8.0)], false);
        assert_eq!(f.spans(), vec![(2.0, 4.0), (6.0, 8.0), (10.0, 12.0)]);
        assert_eq!(f.finished.len(), 3);
    }

    #[test]
    fn overlap_splits_into_three() {
        let mut f = Fixture::new();
        f.weave(&[(0, 1.0, 5.0), (1, 3.0, 8.0)], false);
        assert_eq!(
            f.dump(),
            vec![
                (1.0, 3.0, vec![0], false, true),
                (3.0, 5.0, vec![0, 1], false, false),
                (5.0, 8.0, vec![1], true, false),
            ]
        );
    }

    #[test]
    fn contained_segment_splits_partition() {
        let mut f = Fixture::new();
        f.weave(&[(0, 1.0, 9.0), (1, 3.0, 5.0)], false);
        assert_eq!(
            f.dump(),
            vec![
                (1.0, 3.0, vec![0], false, true),
                (3.0, 5.0, vec![0, 1], false, false),
                (5.0, 9.0, vec![0], true, false),
            ]
        );
    }

    #[test]
    fn enclosing_segment_wraps_partition() {
        let mut f = Fixture::new();
        f.weave(&[(0, 4.0, 6.0), (1, 2.0, 8.0)], false);
        assert_eq!(
            f.dump(),
            vec![
                (2.0, 4.0, vec![1], false, true),
                (4.0, 6.0, vec![0, 1], false, false),
                (6.0, 8.0, vec![1], true, false),
            ]
        );
    }

    #[test]
    fn touching_boundaries_are_fused() {
        let mut f = Fixture::new();
        f.weave(&[(0, 1.0, 5.0), (2, 10.0, 12.0), (1, 5.0002, 8.0)], false);
        assert_eq!(f.spans(), vec![(1.0, 5.0), (5.0, 8.0), (10.0, 12.0)]);

        let mut f = Fixture::new();
        f.weave(&[(0, 5.0, 9.0), (1, 1.0, 4.9998)], false);
        assert_eq!(f.spans(), vec![(1.0, 5.0), (5.0, 9.0)]);
    }

    #[test]
    fn identical_segments_share_a_partition() {
        let mut f = Fixture::new();
        f.weave(&[(0, 1.0, 5.0), (1, 1.0, 5.0)], false);
        assert_eq!(f.dump(), vec![(1.0, 5.0, vec![0, 1], false, false)]);
    }

    #[test]
    fn drops_bad_segments() {
        let mut f = Fixture::new();
        f.weave(
            &[
                (0, -30.0, -20.0),
                (1, 5.0, 3.0),
                (2, f64::NAN, 4.0),
                (3, 1.0, 2.0),
            ],
            false,
        );
        assert_eq!(f.spans(), vec![(1.0, 2.0)]);
        assert_eq!(f.finished.len(), 4, "dropped segments are still finished");
    }

    #[test]
    fn near_zero_distances_snap_to_zero() {
        let mut f = Fixture::new();
        f.weave(&[(0, -0.0003, 4.0)], false);
        assert_eq!(f.spans(), vec![(0.0, 4.0)]);
    }

    #[test]
    fn zero_thickness_segments() {
        let mut f = Fixture::new();
        f.weave(&[(0, 2.0, 4.0), (1, 6.0, 8.0)], false);
        // Inside, or on a boundary of, an existing partition: ignored.
        f.weave(&[(2, 3.0, 3.0), (3, 6.0, 6.0)], false);
        assert_eq!(f.spans(), vec![(2.0, 4.0), (6.0, 8.0)]);
        // In a gap, before everything, and after everything.
        f.weave(&[(4, 5.0, 5.0), (5, 1.0, 1.0), (6, 9.0, 9.0)], false);
        assert_eq!(
            f.spans(),
            vec![(1.0, 1.0), (2.0, 4.0), (5.0, 5.0), (6.0, 8.0), (9.0, 9.0)]
        );
    }

    #[test]
    fn no_booleans_keeps_segments_whole() {
        let mut f = Fixture::new();
        f.weave(&[(0, 3.0, 8.0), (1, 1.0, 5.0), (2, 4.0, 4.5)], true);
        assert_eq!(f.spans(), vec![(1.0, 5.0), (3.0, 8.0), (4.0, 4.5)]);
    }

    #[test]
    fn stays_sorted_under_many_overlaps() {
        let mut f = Fixture::new();
        let segs = [
            (0, 0.5, 7.0),
            (1, 3.0, 4.0),
            (2, 2.0, 12.0),
            (3, 11.0, 15.0),
            (4, 6.0, 6.0005),
            (5, 1.0, 14.0),
        ];
        f.weave(&segs, false);
        let spans = f.spans();
        for w in spans.windows(2) {
            assert!(w[0].1 <= w[1].0, "{:?} overlaps {:?}", w[0], w[1]);
        }
        for (a, b) in spans.iter() {
            assert!(a <= b, "inside-out partition {} {}", a, b);
        }
        assert_eq!(spans.first().map(|s| s.0), Some(0.5));
        assert_eq!(spans.last().map(|s| s.1), Some(15.0));
    }
}

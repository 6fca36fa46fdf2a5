use std::ops::{Index, IndexMut};

use geometry::Ray;
use math::hcm::{Point3, Vec3};
use primitive::PrimId;

use crate::region::RegionId;
use crate::scene::Scene;
use crate::seg::{HitRef, Seg, SegId, SegStore};

/// Handle of a partition in a `PartitionArena`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PartId(pub usize);

/// An interval of the ray bounded by two segment hits. `inflip`/`outflip` mark boundaries taken
/// from the far side of a segment, whose surface normal must be reversed.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Partition {
    pub inhit: HitRef,
    pub inflip: bool,
    pub outhit: HitRef,
    pub outflip: bool,
    pub region: Option<RegionId>,
    pub seglist: Vec<SegId>,
    prev: Option<PartId>,
    next: Option<PartId>,
}

impl Partition {
    pub fn new(inhit: HitRef, inflip: bool, outhit: HitRef, outflip: bool, seg: SegId) -> Self {
        Partition {
            inhit,
            inflip,
            outhit,
            outflip,
            region: None,
            seglist: vec![seg],
            prev: None,
            next: None,
        }
    }

    /// A partition covering exactly one segment.
    pub fn spanning(seg: SegId) -> Self {
        Self::new(HitRef::entry(seg), false, HitRef::exit(seg), false, seg)
    }

    pub fn add_seg(&mut self, seg: SegId) {
        if !self.seglist.contains(&seg) {
            self.seglist.push(seg);
        }
    }

    pub fn prev(&self) -> Option<PartId> {
        self.prev
    }

    pub fn next(&self) -> Option<PartId> {
        self.next
    }
}

/// Storage for the partitions of one ray. Freed slots are reused.
#[derive(Debug, Default)]
pub(crate) struct PartitionArena {
    slots: Vec<Partition>,
    free: Vec<PartId>,
}

impl PartitionArena {
    pub fn alloc(&mut self, part: Partition) -> PartId {
        match self.free.pop() {
            Some(id) => {
                self.slots[id.0] = part;
                id
            }
            None => {
                self.slots.push(part);
                PartId(self.slots.len() - 1)
            }
        }
    }

    /// Copies a partition, without its list links.
    pub fn dup(&mut self, id: PartId) -> PartId {
        let mut copy = self.slots[id.0].clone();
        copy.prev = None;
        copy.next = None;
        self.alloc(copy)
    }

    /// The slot must already be unlinked from any list.
    pub fn free(&mut self, id: PartId) {
        self.slots[id.0].seglist.clear();
        self.free.push(id);
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
    }
}

impl Index<PartId> for PartitionArena {
    type Output = Partition;
    fn index(&self, id: PartId) -> &Partition {
        &self.slots[id.0]
    }
}

impl IndexMut<PartId> for PartitionArena {
    fn index_mut(&mut self, id: PartId) -> &mut Partition {
        &mut self.slots[id.0]
    }
}

/// A doubly linked list threaded through a `PartitionArena`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct PartitionList {
    head: Option<PartId>,
    tail: Option<PartId>,
    len: usize,
}

impl PartitionList {
    pub fn head(&self) -> Option<PartId> {
        self.head
    }

    pub fn tail(&self) -> Option<PartId> {
        self.tail
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn push_back(&mut self, arena: &mut PartitionArena, id: PartId) {
        match self.tail {
            Some(tail) => self.insert_after(arena, tail, id),
            None => {
                arena[id].prev = None;
                arena[id].next = None;
                self.head = Some(id);
                self.tail = Some(id);
                self.len = 1;
            }
        }
    }

    pub fn push_front(&mut self, arena: &mut PartitionArena, id: PartId) {
        match self.head {
            Some(head) => self.insert_before(arena, head, id),
            None => self.push_back(arena, id),
        }
    }

    pub fn insert_before(&mut self, arena: &mut PartitionArena, at: PartId, id: PartId) {
        let prev = arena[at].prev;
        arena[id].prev = prev;
        arena[id].next = Some(at);
        arena[at].prev = Some(id);
        match prev {
            Some(p) => arena[p].next = Some(id),
            None => self.head = Some(id),
        }
        self.len += 1;
    }

    pub fn insert_after(&mut self, arena: &mut PartitionArena, at: PartId, id: PartId) {
        let next = arena[at].next;
        arena[id].prev = Some(at);
        arena[id].next = next;
        arena[at].next = Some(id);
        match next {
            Some(n) => arena[n].prev = Some(id),
            None => self.tail = Some(id),
        }
        self.len += 1;
    }

    pub fn remove(&mut self, arena: &mut PartitionArena, id: PartId) {
        let (prev, next) = (arena[id].prev, arena[id].next);
        match prev {
            Some(p) => arena[p].next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => arena[n].prev = prev,
            None => self.tail = prev,
        }
        arena[id].prev = None;
        arena[id].next = None;
        self.len -= 1;
    }

    pub fn ids<'a>(&self, arena: &'a PartitionArena) -> impl Iterator<Item = PartId> + 'a {
        std::iter::successors(self.head, move |&id| arena[id].next)
    }

    pub fn clear(&mut self) {
        *self = PartitionList::default();
    }
}

/// Surface detail at one partition boundary, computed on request by the owning primitive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitPoint {
    pub dist: f64,
    pub point: Point3,
    /// Unit normal, reversed where the boundary is the far side of its segment.
    pub normal: Vec3,
    pub uv: (f64, f64),
    pub prim: PrimId,
}

#[derive(Clone, Copy)]
struct View<'a> {
    scene: &'a Scene,
    ray: &'a Ray,
    segs: &'a SegStore,
    arena: &'a PartitionArena,
}

/// The finished, distance-ordered partitions of one ray, as handed to `Application::hit`.
#[derive(Clone, Copy)]
pub struct Partitions<'a> {
    view: View<'a>,
    list: &'a PartitionList,
    finished: &'a [SegId],
}

impl<'a> Partitions<'a> {
    pub(crate) fn new(
        scene: &'a Scene,
        ray: &'a Ray,
        segs: &'a SegStore,
        arena: &'a PartitionArena,
        list: &'a PartitionList,
        finished: &'a [SegId],
    ) -> Self {
        Partitions {
            view: View {
                scene,
                ray,
                segs,
                arena,
            },
            list,
            finished,
        }
    }

    /// The ray that was shot, with unit direction.
    pub fn ray(&self) -> &'a Ray {
        self.view.ray
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = PartitionRef<'a>> + 'a {
        let view = self.view;
        self.list
            .ids(view.arena)
            .map(move |id| PartitionRef {
                view,
                part: &view.arena[id],
            })
    }

    pub fn first(&self) -> Option<PartitionRef<'a>> {
        self.iter().next()
    }

    /// Every segment the weaver consumed, including ones no partition ended up using.
    pub fn segments(&self) -> impl Iterator<Item = &'a Seg> + 'a {
        let segs = self.view.segs;
        self.finished.iter().map(move |&id| segs.get(id))
    }
}

/// One finished partition.
#[derive(Clone, Copy)]
pub struct PartitionRef<'a> {
    view: View<'a>,
    part: &'a Partition,
}

impl<'a> PartitionRef<'a> {
    pub fn in_dist(&self) -> f64 {
        self.view.segs.dist(self.part.inhit)
    }

    pub fn out_dist(&self) -> f64 {
        self.view.segs.dist(self.part.outhit)
    }

    pub fn thickness(&self) -> f64 {
        self.out_dist() - self.in_dist()
    }

    pub fn inflip(&self) -> bool {
        self.part.inflip
    }

    pub fn outflip(&self) -> bool {
        self.part.outflip
    }

    /// The owning region; always set on partitions handed to `hit`.
    pub fn region(&self) -> Option<RegionId> {
        self.part.region
    }

    pub fn region_name(&self) -> Option<&'a str> {
        self.part
            .region
            .map(|r| self.view.scene.region(r).name())
    }

    /// Primitives whose segments lie in this partition.
    pub fn prims(&self) -> impl Iterator<Item = PrimId> + 'a {
        let segs = self.view.segs;
        self.part.seglist.iter().map(move |&s| segs.get(s).prim)
    }

    pub fn inhit(&self) -> HitPoint {
        self.hit_point(self.part.inhit, self.part.inflip)
    }

    pub fn outhit(&self) -> HitPoint {
        self.hit_point(self.part.outhit, self.part.outflip)
    }

    fn hit_point(&self, h: HitRef, flip: bool) -> HitPoint {
        let prim = self.view.segs.get(h.seg).prim;
        let hit = self.view.segs.hit(h);
        let shape = self.view.scene.prim(prim);
        let normal = shape.norm(hit, self.view.ray);
        HitPoint {
            dist: hit.dist,
            point: self.view.ray.position_at(hit.dist),
            normal: if flip { -normal } else { normal },
            uv: shape.uv(hit, self.view.ray),
            prim,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(list: &PartitionList, arena: &PartitionArena) -> Vec<PartId> {
        list.ids(arena).collect()
    }

    #[test]
    fn list_links_stay_consistent() {
        let mut arena = PartitionArena::default();
        let mut list = PartitionList::default();
        let a = arena.alloc(Partition::spanning(SegId(0)));
        let b = arena.alloc(Partition::spanning(SegId(1)));
        let c = arena.alloc(Partition::spanning(SegId(2)));
        let d = arena.alloc(Partition::spanning(SegId(3)));
        list.push_back(&mut arena, b);
        list.push_front(&mut arena, a);
        list.insert_after(&mut arena, b, d);
        list.insert_before(&mut arena, d, c);
        assert_eq!(collect(&list, &arena), vec![a, b, c, d]);
        assert_eq!(list.len(), 4);
        assert_eq!((list.head(), list.tail()), (Some(a), Some(d)));

        list.remove(&mut arena, a);
        list.remove(&mut arena, d);
        assert_eq!(collect(&list, &arena), vec![b, c]);
        assert_eq!(arena[b].prev(), None);
        assert_eq!(arena[c].next(), None);
        list.remove(&mut arena, b);
        list.remove(&mut arena, c);
        assert!(list.is_empty());
        assert_eq!(list.head(), None);
    }

    #[test]
    fn freed_slots_are_reused() {
        let mut arena = PartitionArena::default();
        let a = arena.alloc(Partition::spanning(SegId(0)));
        let b = arena.dup(a);
        assert_ne!(a, b);
        assert_eq!(arena[b].seglist, vec![SegId(0)]);
        arena.free(a);
        let c = arena.alloc(Partition::spanning(SegId(7)));
        assert_eq!(c, a);
        assert_eq!(arena[c].seglist, vec![SegId(7)]);
    }

    #[test]
    fn segments_are_added_once() {
        let mut p = Partition::spanning(SegId(0));
        p.add_seg(SegId(1));
        p.add_seg(SegId(0));
        assert_eq!(p.seglist, vec![SegId(0), SegId(1)]);
    }
}

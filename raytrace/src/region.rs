use std::fmt::{Display, Formatter};

use primitive::PrimId;

/// Index of a region in its scene. Lower ids win undecided overlaps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegionId(pub usize);

impl Display for RegionId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "region#{}", self.0)
    }
}

/// Boolean combination of primitives, evaluated per partition: a leaf is true when the
/// partition contains a segment of that primitive.
#[derive(Debug, Clone, PartialEq)]
pub enum BoolTree {
    Nop,
    Solid(PrimId),
    Union(Box<BoolTree>, Box<BoolTree>),
    Intersect(Box<BoolTree>, Box<BoolTree>),
    Subtract(Box<BoolTree>, Box<BoolTree>),
    Xor(Box<BoolTree>, Box<BoolTree>),
}

/// Both sides of an exclusive-or were true: the region overlaps itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct XorGuard;

impl BoolTree {
    pub fn solid(prim: usize) -> Self {
        BoolTree::Solid(PrimId(prim))
    }
    pub fn union(self, rhs: Self) -> Self {
        BoolTree::Union(Box::new(self), Box::new(rhs))
    }
    pub fn intersect(self, rhs: Self) -> Self {
        BoolTree::Intersect(Box::new(self), Box::new(rhs))
    }
    pub fn subtract(self, rhs: Self) -> Self {
        BoolTree::Subtract(Box::new(self), Box::new(rhs))
    }
    pub fn xor(self, rhs: Self) -> Self {
        BoolTree::Xor(Box::new(self), Box::new(rhs))
    }

    /// Unions all the given primitives; `Nop` if there are none.
    pub fn union_of(prims: impl IntoIterator<Item = usize>) -> Self {
        prims
            .into_iter()
            .map(BoolTree::solid)
            .reduce(BoolTree::union)
            .unwrap_or(BoolTree::Nop)
    }

    /// Collects the leaf primitives, in tree order, possibly with repeats.
    pub fn prims(&self) -> Vec<PrimId> {
        let mut prims = vec![];
        self.collect_prims(&mut prims);
        prims
    }

    fn collect_prims(&self, out: &mut Vec<PrimId>) {
        match self {
            BoolTree::Nop => (),
            BoolTree::Solid(p) => out.push(*p),
            BoolTree::Union(l, r)
            | BoolTree::Intersect(l, r)
            | BoolTree::Subtract(l, r)
            | BoolTree::Xor(l, r) => {
                l.collect_prims(out);
                r.collect_prims(out);
            }
        }
    }

    /// True if the tree is nothing but unions of solids.
    pub fn is_all_unions(&self) -> bool {
        match self {
            BoolTree::Solid(_) => true,
            BoolTree::Union(l, r) => l.is_all_unions() && r.is_all_unions(),
            _ => false,
        }
    }

    /// Evaluates the tree with leaves answered by `present`. Short-circuits like the logical
    /// operators do, so a guard in an unvisited branch is not reported.
    pub fn eval(&self, present: &impl Fn(PrimId) -> bool) -> Result<bool, XorGuard> {
        match self {
            BoolTree::Nop => Ok(false),
            BoolTree::Solid(p) => Ok(present(*p)),
            BoolTree::Union(l, r) => Ok(l.eval(present)? || r.eval(present)?),
            BoolTree::Intersect(l, r) => Ok(l.eval(present)? && r.eval(present)?),
            BoolTree::Subtract(l, r) => Ok(l.eval(present)? && !r.eval(present)?),
            BoolTree::Xor(l, r) => match (l.eval(present)?, r.eval(present)?) {
                (true, true) => Err(XorGuard),
                (a, b) => Ok(a || b),
            },
        }
    }

    /// True once every leaf primitive has been shot, per `tested`.
    pub fn is_ready(&self, tested: &impl Fn(PrimId) -> bool) -> bool {
        match self {
            BoolTree::Nop => true,
            BoolTree::Solid(p) => tested(*p),
            BoolTree::Union(l, r)
            | BoolTree::Intersect(l, r)
            | BoolTree::Subtract(l, r)
            | BoolTree::Xor(l, r) => l.is_ready(tested) && r.is_ready(tested),
        }
    }
}

/// A named, boolean-evaluated combination of primitives that claims ray intervals.
///
/// A nonzero `aircode` marks an air region: air loses overlaps to solid material, and callers
/// counting hits with a negative `onehit` skip it.
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    name: String,
    aircode: u32,
    tree: BoolTree,
    all_unions: bool,
}

impl Region {
    pub fn new(name: &str, tree: BoolTree) -> Self {
        Self::air(name, 0, tree)
    }

    pub fn air(name: &str, aircode: u32, tree: BoolTree) -> Self {
        let all_unions = tree.is_all_unions();
        Region {
            name: name.to_string(),
            aircode,
            tree,
            all_unions,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn aircode(&self) -> u32 {
        self.aircode
    }
    pub fn is_air(&self) -> bool {
        self.aircode != 0
    }
    pub fn tree(&self) -> &BoolTree {
        &self.tree
    }
    /// Any partition touching an all-unions region belongs to it, no evaluation needed.
    pub fn all_unions(&self) -> bool {
        self.all_unions
    }
}

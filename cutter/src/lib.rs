mod builder;
mod error;

use std::fmt::{Display, Formatter};

use geometry::BBox;
use math::hcm::Point3;
use primitive::PrimId;

pub use builder::{CutConfig, CutterBuilder};
pub use error::{Result, TreeError};

/// Index of a node in a `CutterTree`'s arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub usize);

/// Identifies a cell a ray can be in: a leaf of the tree, or the synthetic all-space cell that
/// holds the unbounded primitives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CellId {
    Node(NodeId),
    Infinite,
}

/// The pieces of one piece-enabled primitive that overlap a cell.
#[derive(Debug, Clone, PartialEq)]
pub struct PieceList {
    pub prim: PrimId,
    pub pieces: Vec<usize>,
}

/// A leaf cell: its bounds and the candidates whose bounding boxes overlap it.
#[derive(Debug, Clone, PartialEq)]
pub struct BoxNode {
    pub bbox: BBox,
    /// Primitives that are shot whole.
    pub solids: Vec<PrimId>,
    /// Piece-enabled primitives, with only the pieces overlapping this cell.
    pub pieces: Vec<PieceList>,
}

impl BoxNode {
    pub fn new(bbox: BBox) -> Self {
        BoxNode {
            bbox,
            solids: vec![],
            pieces: vec![],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.solids.is_empty() && self.pieces.is_empty()
    }

    /// Number of candidate tests this cell implies: whole solids plus individual pieces.
    pub fn candidate_count(&self) -> usize {
        self.solids.len() + self.pieces.iter().map(|p| p.pieces.len()).sum::<usize>()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CutterNode {
    /// Points with `p[axis] < point` belong to `left`, all others to `right`.
    Cut {
        axis: usize,
        point: f64,
        left: NodeId,
        right: NodeId,
    },
    Box(BoxNode),
}

/// Binary space partition of a prepared model. Immutable once built; shared by every ray.
#[derive(Debug, Clone)]
pub struct CutterTree {
    nodes: Vec<CutterNode>,
    root: NodeId,
    model: BBox,
    infinite: BoxNode,
}

impl CutterTree {
    /// Assembles a tree from an arena of nodes, checking that it is well formed: indices in
    /// range, valid axes and split values, and no node reachable twice.
    ///
    /// `infinite` lists the unbounded primitives, which live outside the partition.
    pub fn new(
        nodes: Vec<CutterNode>,
        root: NodeId,
        model: BBox,
        infinite: Vec<PrimId>,
    ) -> Result<Self> {
        if nodes.is_empty() {
            return Err(TreeError::Empty);
        }
        let count = nodes.len();
        if root.0 >= count {
            return Err(TreeError::RootOutOfRange {
                root: root.0,
                count,
            });
        }
        let mut visited = vec![false; count];
        let mut stack = vec![root];
        while let Some(NodeId(id)) = stack.pop() {
            if std::mem::replace(&mut visited[id], true) {
                return Err(TreeError::NotATree(id));
            }
            if let CutterNode::Cut {
                axis,
                point,
                left,
                right,
            } = &nodes[id]
            {
                if *axis >= 3 {
                    return Err(TreeError::BadAxis {
                        node: id,
                        axis: *axis,
                    });
                }
                if !point.is_finite() {
                    return Err(TreeError::BadSplit { node: id });
                }
                for child in [left, right] {
                    if child.0 >= count {
                        return Err(TreeError::ChildOutOfRange {
                            node: id,
                            child: child.0,
                            count,
                        });
                    }
                    stack.push(*child);
                }
            }
        }
        let mut infinite_cell = BoxNode::new(BBox::infinite());
        infinite_cell.solids = infinite;
        Ok(CutterTree {
            nodes,
            root,
            model,
            infinite: infinite_cell,
        })
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Bounds of all finite primitives.
    pub fn model_bbox(&self) -> BBox {
        self.model
    }

    pub fn infinite_cell(&self) -> &BoxNode {
        &self.infinite
    }

    pub fn has_infinite(&self) -> bool {
        !self.infinite.is_empty()
    }

    pub fn node(&self, id: NodeId) -> &CutterNode {
        &self.nodes[id.0]
    }

    pub fn cell(&self, id: CellId) -> Option<&BoxNode> {
        match id {
            CellId::Infinite => Some(&self.infinite),
            CellId::Node(n) => match &self.nodes[n.0] {
                CutterNode::Box(b) => Some(b),
                CutterNode::Cut { .. } => None,
            },
        }
    }

    /// Walks from the root to the leaf whose region contains `p`. Points outside the model land
    /// in the nearest boundary leaf.
    pub fn locate(&self, p: Point3) -> (NodeId, &BoxNode) {
        let mut id = self.root;
        loop {
            match &self.nodes[id.0] {
                CutterNode::Cut {
                    axis,
                    point,
                    left,
                    right,
                } => {
                    id = if p[*axis] < *point { *left } else { *right };
                }
                CutterNode::Box(b) => return (id, b),
            }
        }
    }

    /// Iterates over all leaf cells, reachable or not.
    pub fn cells(&self) -> impl Iterator<Item = (NodeId, &BoxNode)> {
        self.nodes.iter().enumerate().filter_map(|(i, n)| match n {
            CutterNode::Box(b) => Some((NodeId(i), b)),
            CutterNode::Cut { .. } => None,
        })
    }

    pub fn height(&self) -> usize {
        let mut height = 0;
        let mut stack = vec![(self.root, 1)];
        while let Some((id, depth)) = stack.pop() {
            height = height.max(depth);
            if let CutterNode::Cut { left, right, .. } = &self.nodes[id.0] {
                stack.push((*left, depth + 1));
                stack.push((*right, depth + 1));
            }
        }
        height
    }

    /// Checks every piece index against the owning primitive's piece count.
    pub fn check_pieces(&self, piece_count: impl Fn(PrimId) -> usize) -> Result<()> {
        for (NodeId(node), cell) in self.cells() {
            for list in cell.pieces.iter() {
                let count = piece_count(list.prim);
                if let Some(&piece) = list.pieces.iter().find(|&&p| p >= count) {
                    return Err(TreeError::PieceOutOfRange {
                        node,
                        prim: list.prim,
                        piece,
                        count,
                    });
                }
            }
        }
        Ok(())
    }
}

impl Display for CutterTree {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let cells = self.cells().count();
        let empty = self.cells().filter(|(_, c)| c.is_empty()).count();
        write!(
            f,
            "cutter{{ {} nodes, {} cells ({} empty), height = {}, {} infinite, model = {} }}",
            self.nodes.len(),
            cells,
            empty,
            self.height(),
            self.infinite.solids.len(),
            self.model
        )
    }
}

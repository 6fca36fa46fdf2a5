use std::sync::Arc;

use geometry::BBox;
use primitive::{PrimId, Primitive};

use crate::{BoxNode, CutterNode, CutterTree, NodeId, PieceList, Result};

/// Limits for the bisection of the model box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CutConfig {
    /// No cell is split below this depth.
    pub max_depth: usize,
    /// Beyond depth 6, cells with this many candidates or fewer are left alone.
    pub cut_len: usize,
    /// Axes on which a cell is narrower than this are not split.
    pub min_width: f64,
}

impl Default for CutConfig {
    fn default() -> Self {
        CutConfig {
            max_depth: 32,
            cut_len: 4,
            min_width: 2.0,
        }
    }
}

/// Builds a `CutterTree` over a primitive table by recursive bisection.
///
/// Axes are tried round-robin starting from the depth. A cut is placed at the primitive (or piece)
/// bounding-box face nearest the cell center, or at the center itself if no face is close; it is
/// kept only if at least one side ends up with fewer candidates than the parent.
pub struct CutterBuilder {
    config: CutConfig,
    prim_boxes: Vec<BBox>,
    piece_boxes: Vec<Vec<BBox>>,
    nodes: Vec<CutterNode>,
}

const SHALLOW_DEPTH: usize = 6;

impl CutterBuilder {
    pub fn new(config: CutConfig) -> Self {
        CutterBuilder {
            config,
            prim_boxes: vec![],
            piece_boxes: vec![],
            nodes: vec![],
        }
    }

    pub fn build(mut self, prims: &[Arc<dyn Primitive>]) -> Result<CutterTree> {
        self.prim_boxes = prims.iter().map(|p| p.bbox()).collect();
        self.piece_boxes = prims
            .iter()
            .map(|p| {
                (0..p.piece_count())
                    .map(|i| p.piece_bbox(i).unwrap_or_else(|| p.bbox()))
                    .collect()
            })
            .collect();

        let mut infinite = vec![];
        let mut model = BBox::empty();
        let mut root_cell = BoxNode::new(BBox::empty());
        for (i, prim) in prims.iter().enumerate() {
            let id = PrimId(i);
            if prim.is_infinite() {
                infinite.push(id);
                continue;
            }
            model = geometry::bbox::union(model, self.prim_boxes[i]);
            match self.piece_boxes[i].len() {
                0 => root_cell.solids.push(id),
                n => root_cell.pieces.push(PieceList {
                    prim: id,
                    pieces: (0..n).collect(),
                }),
            }
        }
        root_cell.bbox = model;

        let root = self.split(root_cell, 0);
        let tree = CutterTree::new(self.nodes, root, model, infinite)?;
        log::debug!("built {}", tree);
        Ok(tree)
    }

    fn split(&mut self, cell: BoxNode, depth: usize) -> NodeId {
        let count = cell.candidate_count();
        let done = count <= 1
            || depth >= self.config.max_depth
            || (depth >= SHALLOW_DEPTH && count <= self.config.cut_len)
            || cell.bbox.is_empty();
        if !done {
            for attempt in 0..3 {
                let axis = (depth + attempt) % 3;
                let (lo, hi) = (cell.bbox.min()[axis], cell.bbox.max()[axis]);
                if hi - lo < self.config.min_width {
                    continue;
                }
                let point = self.choose_point(&cell, axis);
                let left = self.populate(&cell, axis, point, false);
                let right = self.populate(&cell, axis, point, true);
                if left.candidate_count() >= count && right.candidate_count() >= count {
                    continue;
                }
                let left = self.split(left, depth + 1);
                let right = self.split(right, depth + 1);
                return self.push(CutterNode::Cut {
                    axis,
                    point,
                    left,
                    right,
                });
            }
        }
        self.push(CutterNode::Box(cell))
    }

    fn push(&mut self, node: CutterNode) -> NodeId {
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }

    fn candidate_boxes<'a>(&'a self, cell: &'a BoxNode) -> impl Iterator<Item = BBox> + 'a {
        let solids = cell.solids.iter().map(|s| self.prim_boxes[s.0]);
        let pieces = cell.pieces.iter().flat_map(move |list| {
            list.pieces
                .iter()
                .map(move |&p| self.piece_boxes[list.prim.0][p])
        });
        solids.chain(pieces)
    }

    fn choose_point(&self, cell: &BoxNode, axis: usize) -> f64 {
        let (lo, hi) = (cell.bbox.min()[axis], cell.bbox.max()[axis]);
        let center = (lo + hi) * 0.5;
        let reach = (hi - lo) * 0.25;
        self.candidate_boxes(cell)
            .flat_map(|b| [b.min()[axis], b.max()[axis]])
            .filter(|&v| v > lo && v < hi && (v - center).abs() <= reach)
            .min_by(|a, b| (a - center).abs().total_cmp(&(b - center).abs()))
            .unwrap_or(center)
    }

    fn populate(&self, parent: &BoxNode, axis: usize, point: f64, upper: bool) -> BoxNode {
        let bbox = parent.bbox.with_bound(axis, !upper, point);
        let mut cell = BoxNode::new(bbox);
        cell.solids = parent
            .solids
            .iter()
            .copied()
            .filter(|s| self.prim_boxes[s.0].overlaps(&bbox))
            .collect();
        cell.pieces = parent
            .pieces
            .iter()
            .filter_map(|list| {
                let pieces = list
                    .pieces
                    .iter()
                    .copied()
                    .filter(|&p| self.piece_boxes[list.prim.0][p].overlaps(&bbox))
                    .collect::<Vec<_>>();
                (!pieces.is_empty()).then(|| PieceList {
                    prim: list.prim,
                    pieces,
                })
            })
            .collect();
        cell
    }
}

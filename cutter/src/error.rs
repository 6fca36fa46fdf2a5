//! Error types for cutter trees.

use thiserror::Error;

/// Ways an assembled tree can be malformed. Every one of these is caught when the tree is
/// created, so traversal never sees a bad node.
#[derive(Error, Debug, PartialEq)]
pub enum TreeError {
    #[error("tree has no nodes")]
    Empty,
    #[error("root {root} out of range ({count} nodes)")]
    RootOutOfRange { root: usize, count: usize },
    #[error("node {node} refers to child {child}, out of range ({count} nodes)")]
    ChildOutOfRange {
        node: usize,
        child: usize,
        count: usize,
    },
    #[error("node {node} splits on axis {axis}")]
    BadAxis { node: usize, axis: usize },
    #[error("node {node} has a non-finite split value")]
    BadSplit { node: usize },
    #[error("node {0} is reachable more than once")]
    NotATree(usize),
    #[error("cell {node} lists piece {piece} of {prim}, which has {count} pieces")]
    PieceOutOfRange {
        node: usize,
        prim: primitive::PrimId,
        piece: usize,
        count: usize,
    },
}

pub type Result<T> = std::result::Result<T, TreeError>;

//! Error types for scene assembly and ray shooting.

use cutter::{NodeId, TreeError};
use math::hcm::{Point3, Vec3};
use primitive::{Capability, PrimId};
use thiserror::Error;

/// Problems found while freezing a scene. A scene that builds is safe to shoot.
#[derive(Error, Debug, PartialEq)]
pub enum SceneError {
    #[error(transparent)]
    Tree(#[from] TreeError),
    #[error("cell {node} lists {prim}, but the scene has {count} primitives")]
    UnknownPrimitive {
        node: usize,
        prim: PrimId,
        count: usize,
    },
    #[error("infinite cell lists {prim}, which is bounded")]
    BoundedInInfiniteCell { prim: PrimId },
    #[error("region {region:?} refers to {prim}, but the scene has {count} primitives")]
    RegionPrimitive {
        region: String,
        prim: PrimId,
        count: usize,
    },
    #[error("region #{0} has an empty name")]
    EmptyRegionName(usize),
    #[error("trace setting {field} = {value} is out of range")]
    BadConfig { field: &'static str, value: f64 },
}

/// Fatal for the ray being shot; the scene and the resource stay usable.
#[derive(Error, Debug, PartialEq)]
pub enum ShootError {
    #[error("ray direction {0} has no usable length")]
    BadDirection(Vec3),
    #[error("ray origin {0} is not finite")]
    BadOrigin(Point3),
    #[error("{prim} is listed with pieces but lacks {capability}")]
    MissingCapability { prim: PrimId, capability: Capability },
    #[error("recursion level {level} exceeds the limit of {max}")]
    RecursionLimit { level: usize, max: usize },
    #[error("resource was built for a different scene")]
    ResourceMismatch,
}

/// The traversal kept landing in the same cell and ran out of pushes.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("ray stuck in cell {cell:?} after {pushes} pushes (box {box_num}, box_start {box_start}, box_end {box_end})")]
pub struct StuckError {
    pub cell: NodeId,
    pub pushes: usize,
    pub box_num: usize,
    pub box_start: f64,
    pub box_end: f64,
}

pub type Result<T> = std::result::Result<T, SceneError>;

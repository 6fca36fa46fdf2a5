//! Ray shooting against solid models.
//!
//! A `Scene` freezes primitives, regions and a `CutterTree` built over them. Each worker owns a
//! `Resource` (see `ResourcePool`) and calls `Scene::shoot` with a `Shot` and an `Application`,
//! which receives the distance-ordered partitions the ray passes through, each attributed to
//! exactly one region by evaluating the regions' boolean trees.
//!
//! The stages of a shot:
//! - `advance.rs`: stepping from cell to cell through the tree,
//! - `backing.rs`: how far behind the origin piece primitives must be considered,
//! - `shoot.rs`: testing the primitives of each cell, whole or piece by piece,
//! - `weave.rs`: merging segments into partitions,
//! - `boolfinal.rs`: claiming partitions for regions, and stopping early when enough is known.

mod advance;
mod app;
mod backing;
mod boolfinal;
mod config;
mod error;
mod partition;
mod piece;
mod region;
mod resource;
mod scene;
mod seg;
mod shoot;
mod stats;
mod weave;

pub use app::{
    default_overlap, Application, HitContext, MissContext, OverlapClaim, OverlapReport,
};
pub use config::TraceConfig;
pub use error::{Result, SceneError, ShootError, StuckError};
pub use partition::{HitPoint, PartId, PartitionRef, Partitions};
pub use piece::PieceState;
pub use region::{BoolTree, Region, RegionId, XorGuard};
pub use resource::{Resource, ResourcePool};
pub use scene::Scene;
pub use seg::{Seg, SegId};
pub use shoot::Shot;
pub use stats::Stats;

use geometry::Tolerance;

use crate::error::{Result, SceneError};

/// Tuning constants of the shooting engine. The defaults suit models measured in millimeters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TraceConfig {
    pub tol: Tolerance,
    /// How far past a cell boundary the traversal point is nudged to land in the next cell.
    pub offset_dist: f64,
    /// How far behind the ray origin primitives are considered. Piece primitives whose bounds
    /// reach further back extend this per ray.
    pub backing_dist: f64,
    /// Pushes allowed in one advance before the ray is declared stuck.
    pub max_push: usize,
    /// Deepest recursion level a hit callback may shoot at.
    pub max_level: usize,
}

impl Default for TraceConfig {
    fn default() -> Self {
        TraceConfig {
            tol: Tolerance::default(),
            offset_dist: 0.01,
            backing_dist: -2.0,
            max_push: 3,
            max_level: 32,
        }
    }
}

impl TraceConfig {
    /// Rejects settings under which the traversal could stop making progress.
    pub fn check(&self) -> Result<()> {
        let bad = |field, value| Err(SceneError::BadConfig { field, value });
        if !(self.offset_dist.is_finite() && self.offset_dist > 0.0) {
            return bad("offset_dist", self.offset_dist);
        }
        if !(self.tol.dist.is_finite() && self.tol.dist > 0.0) {
            return bad("tol.dist", self.tol.dist);
        }
        if !(self.backing_dist.is_finite() && self.backing_dist <= 0.0) {
            return bad("backing_dist", self.backing_dist);
        }
        Ok(())
    }
}

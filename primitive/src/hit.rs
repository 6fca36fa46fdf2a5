use std::fmt::{Display, Formatter, Result};

use math::hcm::Vec3;

/// One intersection of a ray with a primitive's surface.
///
/// `dist` is the ray parameter of the hit. `surfno` and `vpriv` are private to the primitive that
/// produced the hit: they are handed back to its `norm()`/`uv()` so surface detail is only
/// computed for the hits a caller actually looks at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    pub dist: f64,
    pub surfno: i32,
    pub vpriv: Vec3,
}

impl Hit {
    pub fn new(dist: f64, surfno: i32) -> Self {
        Hit {
            dist,
            surfno,
            vpriv: Vec3::ZERO,
        }
    }

    pub fn with_priv(self, vpriv: Vec3) -> Self {
        Hit { vpriv, ..self }
    }
}

impl Display for Hit {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        let precision = f.precision().unwrap_or(4);
        write!(f, "hit@{:.p$}#{}", self.dist, self.surfno, p = precision)
    }
}

/// One primitive's raw entry/exit intersection with a ray.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub inhit: Hit,
    pub outhit: Hit,
}

impl Segment {
    pub fn new(inhit: Hit, outhit: Hit) -> Self {
        Segment { inhit, outhit }
    }

    pub fn thickness(&self) -> f64 {
        self.outhit.dist - self.inhit.dist
    }
}

/// Hits accumulated for a piece-enabled primitive while the ray crosses several cells.
#[derive(Debug, Clone, Default)]
pub struct HitTable {
    hits: Vec<Hit>,
}

impl HitTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, hit: Hit) {
        self.hits.push(hit);
    }

    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    pub fn clear(&mut self) {
        self.hits.clear();
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Hit> {
        self.hits.iter()
    }

    /// Sorts the hits by distance; NaN distances sort last.
    pub fn sort_by_dist(&mut self) {
        self.hits.sort_by(|a, b| a.dist.total_cmp(&b.dist));
    }

    /// Removes and returns all hits, leaving the table empty but keeping its allocation.
    pub fn drain(&mut self) -> std::vec::Drain<'_, Hit> {
        self.hits.drain(..)
    }
}

/// Distance tolerances of a prepared model, in model units (millimeters).
///
/// Two distances closer than `dist` are the same distance. `perp` bounds the cosine between two
/// directions that are treated as perpendicular.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tolerance {
    pub dist: f64,
    pub perp: f64,
}

impl Default for Tolerance {
    fn default() -> Self {
        Tolerance {
            dist: 0.0005,
            perp: 1e-6,
        }
    }
}

use std::fmt::{Display, Formatter, Result};

use math::float::SQRT_SMALL_FASTF;
use math::hcm;

/// Represents a ray:
///
///   origin + t * direction
///
/// where t spans `[t_min, t_max]`. Unlike a camera ray, `t` may be negative: a solid-modeling
/// query asks about the whole line, and the engine decides how far behind the origin to look.
///
/// `t_min`/`t_max` are filled in by bounding-box clips (`BBox::clip`) and carried along with the
/// per-cell rays handed to primitives.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: hcm::Point3,
    pub dir: hcm::Vec3,
    pub t_min: f64,
    pub t_max: f64,
}

impl Ray {
    pub fn new(origin: hcm::Point3, dir: hcm::Vec3) -> Self {
        Ray {
            origin,
            dir,
            t_min: -f64::INFINITY,
            t_max: f64::INFINITY,
        }
    }

    pub fn with_extent(self, t_min: f64, t_max: f64) -> Self {
        Ray {
            t_min,
            t_max,
            ..self
        }
    }

    /// Same ray, re-anchored at `origin`. The extent is reset to the whole line.
    pub fn with_origin(self, origin: hcm::Point3) -> Self {
        Ray::new(origin, self.dir)
    }

    pub fn position_at(&self, t: f64) -> hcm::Point3 {
        self.origin + t * self.dir
    }

    /// Returns a copy with unit-length direction, or `None` if the direction has zero, NaN or
    /// infinite length.
    pub fn normalized(self) -> Option<Self> {
        let dir = self.dir.try_hat()?;
        Some(Ray { dir, ..self })
    }

    /// Computes the inverse direction cosines and the per-axis step sign.
    pub fn inverse(&self) -> InvDir {
        let mut inv = [0.0; 3];
        let mut step = [0i8; 3];
        for axis in 0..3 {
            let d = self.dir[axis];
            if d < -SQRT_SMALL_FASTF {
                inv[axis] = 1.0 / d;
                step[axis] = -1;
            } else if d > SQRT_SMALL_FASTF {
                inv[axis] = 1.0 / d;
                step[axis] = 1;
            } else {
                inv[axis] = f64::INFINITY;
                step[axis] = 0;
            }
        }
        InvDir { inv, step }
    }
}

/// Inverse of a ray direction, along with which way the ray travels on each axis (-1, 0, +1).
/// Axes with a near-zero cosine have `step == 0` and an infinite inverse.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InvDir {
    pub inv: [f64; 3],
    pub step: [i8; 3],
}

impl Display for Ray {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        let precision = f.precision().unwrap_or(2);
        write!(
            f,
            "{:.precision$} + t{:.precision$}",
            self.origin,
            self.dir,
            precision = precision
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use math::hcm::{point3, vec3};

    #[test]
    fn inverse_marks_axis_steps() {
        let r = Ray::new(point3(0.0, 0.0, 0.0), vec3(-0.5, 0.0, 2.0));
        let inv = r.inverse();
        assert_eq!(inv.step, [-1, 0, 1]);
        assert_eq!(inv.inv[0], -2.0);
        assert!(inv.inv[1].is_infinite());
        assert_eq!(inv.inv[2], 0.5);
    }

    #[test]
    fn normalized_rejects_zero_direction() {
        let r = Ray::new(point3(1.0, 2.0, 3.0), vec3(0.0, 0.0, 0.0));
        assert!(r.normalized().is_none());
        let r = Ray::new(point3(1.0, 2.0, 3.0), vec3(0.0, 3.0, 4.0));
        let n = r.normalized().unwrap();
        assert!((n.dir.norm() - 1.0).abs() < 1e-12);
        assert_eq!(n.position_at(5.0), point3(1.0, 5.0, 7.0));
    }
}

use std::fmt::{Display, Formatter, Result};

use crate::ray::{InvDir, Ray};
use math::{
    float::{min_max, Interval},
    hcm::{Point3, Vec3},
};

/// 3D axis-aligned bounding box (a "right parallelepiped"). Boundary checks are closed on all
/// axes.
/// - Build one from 2 `Point3`s;
/// - Expand it by `b.union()` or `union(b1, b2)`;
/// - Check if it `contains()` a point or `overlaps()` another box, or `clip()` a `Ray` against it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BBox {
    min: Point3,
    max: Point3,
}

impl BBox {
    pub fn empty() -> BBox {
        BBox {
            min: Point3::new(f64::INFINITY, f64::INFINITY, f64::INFINITY),
            max: Point3::new(-f64::INFINITY, -f64::INFINITY, -f64::INFINITY),
        }
    }

    /// The box covering all of space. Unbounded primitives (half-spaces) report this.
    pub fn infinite() -> BBox {
        BBox {
            min: Point3::new(-f64::INFINITY, -f64::INFINITY, -f64::INFINITY),
            max: Point3::new(f64::INFINITY, f64::INFINITY, f64::INFINITY),
        }
    }

    pub fn new(p0: Point3, p1: Point3) -> BBox {
        let (xmin, xmax) = min_max(p0.x, p1.x);
        let (ymin, ymax) = min_max(p0.y, p1.y);
        let (zmin, zmax) = min_max(p0.z, p1.z);
        BBox {
            min: Point3::new(xmin, ymin, zmin),
            max: Point3::new(xmax, ymax, zmax),
        }
    }

    pub fn union(self, p: Point3) -> BBox {
        let mut result = self;
        for i in 0..3 {
            result.min[i] = self.min[i].min(p[i]);
            result.max[i] = self.max[i].max(p[i]);
        }
        result
    }

    /// Returns a copy with one face moved: `upper == false` replaces `min[axis]`, otherwise
    /// `max[axis]`.
    pub fn with_bound(self, axis: usize, upper: bool, value: f64) -> BBox {
        let mut result = self;
        if upper {
            result.max[axis] = value;
        } else {
            result.min[axis] = value;
        }
        result
    }

    pub fn diag(&self) -> Vec3 {
        self.max - self.min
    }

    pub fn min(&self) -> Point3 {
        self.min
    }

    pub fn max(&self) -> Point3 {
        self.max
    }

    /// True if the box has no volume and no extent on some axis (never unioned with anything).
    pub fn is_empty(&self) -> bool {
        (0..3).any(|axis| self.min[axis] > self.max[axis])
    }

    /// True if some axis is unbounded.
    pub fn is_infinite(&self) -> bool {
        (0..3).any(|axis| self.min[axis].is_infinite() || self.max[axis].is_infinite())
    }

    pub fn contains(&self, p: Point3) -> bool {
        for axis in 0..3 {
            if self.min[axis] > p[axis] {
                return false;
            }
            if self.max[axis] < p[axis] {
                return false;
            }
        }
        true
    }

    /// True if the two boxes share at least one point. Touching faces count as overlap.
    pub fn overlaps(&self, other: &BBox) -> bool {
        for axis in 0..3 {
            if self.min[axis] > other.max[axis] || self.max[axis] < other.min[axis] {
                return false;
            }
        }
        true
    }

    /// Clips the infinite line of `r` against this box. Returns the entry/exit parameters
    /// relative to `r.origin`, or `None` if the line misses. The ray's own extent is ignored.
    ///
    /// An entry parameter equal to the exit parameter means the line grazes a face (or the box
    /// is flat); that still counts as a hit.
    pub fn clip(&self, r: &Ray, inv: &InvDir) -> Option<Interval> {
        let mut rmin = -f64::INFINITY;
        let mut rmax = f64::INFINITY;
        for axis in 0..3 {
            let pt = r.origin[axis];
            let (lo, hi) = (self.min[axis], self.max[axis]);
            match inv.step[axis] {
                -1 => {
                    // Heading towards smaller numbers.
                    rmax = rmax.min((lo - pt) * inv.inv[axis]);
                    rmin = rmin.max((hi - pt) * inv.inv[axis]);
                }
                1 => {
                    rmax = rmax.min((hi - pt) * inv.inv[axis]);
                    rmin = rmin.max((lo - pt) * inv.inv[axis]);
                }
                _ => {
                    // Perpendicular to this axis: only the position matters.
                    if lo > pt || hi < pt {
                        return None;
                    }
                }
            }
        }
        if rmin > rmax {
            return None;
        }
        Some(Interval { min: rmin, max: rmax })
    }

    /// True if the point `p` has left the box on some axis in the direction the ray travels.
    /// A point outside on the side the ray is coming from has not "departed" yet.
    pub fn departing(&self, step: &[i8; 3], p: Point3) -> bool {
        (0..3).any(|axis| {
            (step[axis] <= 0 && p[axis] < self.min[axis])
                || (step[axis] >= 0 && p[axis] > self.max[axis])
        })
    }
}

impl Display for BBox {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        write!(f, "box[{} -> {}]", self.min, self.max)
    }
}

pub fn union(b0: BBox, b1: BBox) -> BBox {
    b0.union(b1.min).union(b1.max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use math::hcm::{point3, vec3};

    fn unit_box() -> BBox {
        BBox::new(point3(-1.0, -1.0, -1.0), point3(1.0, 1.0, 1.0))
    }

    #[test]
    fn clip_reports_entry_and_exit() {
        let r = Ray::new(point3(-5.0, 0.0, 0.0), vec3(1.0, 0.0, 0.0));
        let span = unit_box().clip(&r, &r.inverse()).expect("ray through box center");
        assert_eq!(span.as_pair(), (4.0, 6.0));
    }

    #[test]
    fn clip_behind_origin_is_negative() {
        let r = Ray::new(point3(5.0, 0.5, 0.0), vec3(1.0, 0.0, 0.0));
        let span = unit_box().clip(&r, &r.inverse()).unwrap();
        assert_eq!(span.as_pair(), (-6.0, -4.0));
    }

    #[test]
    fn clip_parallel_ray_checks_position() {
        let r = Ray::new(point3(-5.0, 2.0, 0.0), vec3(1.0, 0.0, 0.0));
        assert!(unit_box().clip(&r, &r.inverse()).is_none());
        let r = Ray::new(point3(-5.0, 1.0, 0.0), vec3(1.0, 0.0, 0.0));
        assert!(unit_box().clip(&r, &r.inverse()).is_some(), "grazing the face is a hit");
    }

    #[test]
    fn clip_infinite_box() {
        let r = Ray::new(point3(3.0, 2.0, 1.0), vec3(0.0, 0.6, 0.8));
        let span = BBox::infinite().clip(&r, &r.inverse()).unwrap();
        assert_eq!(span.min, -f64::INFINITY);
        assert_eq!(span.max, f64::INFINITY);
    }

    #[test]
    fn departing_respects_direction() {
        let step = [1, 0, 0];
        let b = unit_box();
        assert!(!b.departing(&step, point3(-2.0, 0.0, 0.0)), "not yet entered");
        assert!(b.departing(&step, point3(2.0, 0.0, 0.0)));
        assert!(b.departing(&step, point3(0.0, 2.0, 0.0)), "zero step checks both sides");
    }

    #[test]
    fn overlap_and_union() {
        let a = unit_box();
        let b = BBox::new(point3(1.0, 1.0, 1.0), point3(3.0, 3.0, 3.0));
        let c = BBox::new(point3(1.5, 1.5, 1.5), point3(3.0, 3.0, 3.0));
        assert!(a.overlaps(&b));
        assert!(!a.overlaps(&c));
        let u = union(a, c);
        assert_eq!(u.min(), point3(-1.0, -1.0, -1.0));
        assert_eq!(u.max(), point3(3.0, 3.0, 3.0));
        assert!(BBox::empty().is_empty());
        assert!(!u.is_empty());
        assert!(BBox::infinite().is_infinite());
    }
}

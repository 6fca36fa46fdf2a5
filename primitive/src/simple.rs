use geometry::{BBox, Ray};
use math::float::{self, SQRT_SMALL_FASTF};
use math::hcm::{make_coord_system, Point3, Vec3};
use std::f64::consts::PI;

use crate::{Hit, Primitive, Segment};

#[derive(Debug, Clone, Copy)]
pub struct Sphere {
    center: Point3,
    radius: f64,
}

impl Sphere {
    pub fn new(center: Point3, radius: f64) -> Sphere {
        assert!(radius > 0.0, "sphere radius must be positive, got {}", radius);
        Sphere { center, radius }
    }
    pub fn center(&self) -> Point3 {
        self.center
    }
    pub fn radius(&self) -> f64 {
        self.radius
    }
}

/// Axis-aligned solid box. Faces are numbered `2 * axis` (min side) and `2 * axis + 1` (max side).
#[derive(Debug, Clone, Copy)]
pub struct Cuboid {
    min: Point3,
    max: Point3,
}

impl Cuboid {
    pub fn from_points(p0: Point3, p1: Point3) -> Self {
        let (xmin, xmax) = float::min_max(p0.x, p1.x);
        let (ymin, ymax) = float::min_max(p0.y, p1.y);
        let (zmin, zmax) = float::min_max(p0.z, p1.z);
        Self {
            min: Point3::new(xmin, ymin, zmin),
            max: Point3::new(xmax, ymax, zmax),
        }
    }

    /// A cube centered at `center` with edge length `size`.
    pub fn cube(center: Point3, size: f64) -> Self {
        let half = Vec3::new(1.0, 1.0, 1.0) * (size * 0.5);
        Self::from_points(center - half, center + half)
    }
}

/// The unbounded solid `{ p : dot(p, normal) <= offset }`.
///
/// Surface numbers: 0 is the bounding plane, 1 and 2 are the entry/exit "at infinity" for rays
/// that never cross the plane in that direction.
#[derive(Debug, Clone, Copy)]
pub struct HalfSpace {
    normal: Vec3,
    offset: f64,
}

impl HalfSpace {
    /// `normal` points out of the solid and need not be unit length.
    pub fn new(normal: Vec3, offset: f64) -> Self {
        let len = normal.norm();
        assert!(len > 0.0 && len.is_finite(), "bad half-space normal {}", normal);
        HalfSpace {
            normal: normal / len,
            offset: offset / len,
        }
    }

    /// The half-space below the plane through `point` with outward `normal`.
    pub fn through(point: Point3, normal: Vec3) -> Self {
        let n = normal.hat();
        Self::new(n, Vec3::from(point).dot(n))
    }
}

// Implementation of the `Primitive` trait for the implementations above.

impl Primitive for Sphere {
    fn summary(&self) -> String {
        format!("Sphere{{ {}, radius = {} }}", self.center, self.radius)
    }
    fn bbox(&self) -> BBox {
        let half_diagonal = Vec3::new(1.0, 1.0, 1.0) * self.radius;
        BBox::new(self.center - half_diagonal, self.center + half_diagonal)
    }
    fn shot(&self, r: &Ray, segs: &mut Vec<Segment>) -> usize {
        // r = o + td
        // sphere: (p-c)(p-c) = radius^2
        // t^2 d^2 + (o-c)^2 + 2t d * (o-c) = radius^2
        let f = r.origin - self.center; // vector connecting the sphere center to ray origin.
        let a = r.dir.norm_squared();
        let b_prime = -f.dot(r.dir);
        let delta = self.radius * self.radius - (f + b_prime / a * r.dir).norm_squared();
        if delta < 0.0 {
            return 0;
        }
        let c = f.norm_squared() - self.radius * self.radius;
        let q = b_prime + b_prime.signum() * (delta * a).sqrt();
        let (t0, t1) = match q == 0.0 {
            // Tangent ray through a center-perpendicular: both roots at the foot point.
            true => (0.0, 0.0),
            false => float::min_max(c / q, q / a),
        };
        segs.push(Segment::new(Hit::new(t0, 0), Hit::new(t1, 1)));
        1
    }
    fn norm(&self, hit: &Hit, r: &Ray) -> Vec3 {
        let pos = r.position_at(hit.dist);
        (pos - self.center) / self.radius
    }
    fn uv(&self, hit: &Hit, r: &Ray) -> (f64, f64) {
        let normal = self.norm(hit, r);
        let theta = normal.y.clamp(-1.0, 1.0).acos();
        let phi = normal.z.atan2(normal.x) + PI;
        (phi / (2.0 * PI), theta / PI)
    }
}

impl Primitive for Cuboid {
    fn summary(&self) -> String {
        format!("Cuboid{{{} <-> {}}}", self.min, self.max)
    }
    fn bbox(&self) -> BBox {
        BBox::new(self.min, self.max)
    }

    fn shot(&self, r: &Ray, segs: &mut Vec<Segment>) -> usize {
        #[derive(Debug, Clone, Copy)]
        struct Face {
            t: f64,
            surfno: i32,
        }

        let mut enter = Face {
            t: -f64::INFINITY,
            surfno: -1,
        };
        let mut leave = Face {
            t: f64::INFINITY,
            surfno: -1,
        };
        for axis in 0..3 {
            let d = r.dir[axis];
            let o = r.origin[axis];
            if d.abs() < SQRT_SMALL_FASTF {
                if o < self.min[axis] || o > self.max[axis] {
                    return 0;
                }
                continue;
            }
            let inv_dir = 1.0 / d;
            let mut near = Face {
                t: (self.min[axis] - o) * inv_dir,
                surfno: 2 * axis as i32,
            };
            let mut far = Face {
                t: (self.max[axis] - o) * inv_dir,
                surfno: 2 * axis as i32 + 1,
            };
            if near.t > far.t {
                std::mem::swap(&mut near, &mut far);
            }
            // Shrinks [enter, leave] by intersecting it with [near, far].
            if near.t > enter.t {
                enter = near;
            }
            if far.t < leave.t {
                leave = far;
            }
            if leave.t < enter.t {
                return 0;
            }
        }
        if enter.surfno < 0 || leave.surfno < 0 {
            // Degenerate direction; nothing finite to report.
            return 0;
        }
        segs.push(Segment::new(
            Hit::new(enter.t, enter.surfno),
            Hit::new(leave.t, leave.surfno),
        ));
        1
    }

    fn norm(&self, hit: &Hit, _r: &Ray) -> Vec3 {
        let axis = (hit.surfno / 2) as usize;
        let mut normal = Vec3::ZERO;
        normal[axis] = if hit.surfno % 2 == 0 { -1.0 } else { 1.0 };
        normal
    }

    fn uv(&self, hit: &Hit, r: &Ray) -> (f64, f64) {
        let axis = (hit.surfno / 2) as usize;
        let (ua, va) = ((axis + 1) % 3, (axis + 2) % 3);
        let p = r.position_at(hit.dist);
        let diag = self.max - self.min;
        let u = (p[ua] - self.min[ua]) / diag[ua];
        let v = (p[va] - self.min[va]) / diag[va];
        (u.clamp(0.0, 1.0), v.clamp(0.0, 1.0))
    }
}

impl Primitive for HalfSpace {
    fn summary(&self) -> String {
        format!("HalfSpace{{ n = {}, d = {} }}", self.normal, self.offset)
    }
    fn bbox(&self) -> BBox {
        BBox::infinite()
    }
    fn is_infinite(&self) -> bool {
        true
    }
    fn shot(&self, r: &Ray, segs: &mut Vec<Segment>) -> usize {
        // Positive when the origin is outside the solid.
        let norm_dist = Vec3::from(r.origin).dot(self.normal) - self.offset;
        let slant = r.dir.dot(self.normal);
        let (inhit, outhit) = if slant.abs() < SQRT_SMALL_FASTF {
            if norm_dist > 0.0 {
                return 0;
            }
            (
                Hit::new(-f64::INFINITY, 1),
                Hit::new(f64::INFINITY, 2),
            )
        } else {
            let s = -norm_dist / slant;
            if slant < 0.0 {
                (Hit::new(s, 0), Hit::new(f64::INFINITY, 2))
            } else {
                (Hit::new(-f64::INFINITY, 1), Hit::new(s, 0))
            }
        };
        segs.push(Segment::new(inhit, outhit));
        1
    }
    fn norm(&self, hit: &Hit, r: &Ray) -> Vec3 {
        match hit.surfno {
            1 => -r.dir,
            2 => r.dir,
            _ => self.normal,
        }
    }
    fn uv(&self, hit: &Hit, r: &Ray) -> (f64, f64) {
        if !hit.dist.is_finite() {
            return (0.0, 0.0);
        }
        // Tiles the plane every 1000 units.
        let (u_axis, v_axis) = make_coord_system(self.normal);
        let p = Vec3::from(r.position_at(hit.dist));
        let u = (p.dot(u_axis) / 1000.0).rem_euclid(1.0);
        let v = (p.dot(v_axis) / 1000.0).rem_euclid(1.0);
        (u, v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use math::hcm::{point3, vec3};

    #[test]
    fn sphere_reports_both_walls() {
        let s = Sphere::new(Point3::ORIGIN, 5.0);
        let r = Ray::new(point3(-10.0, 0.0, 0.0), vec3(1.0, 0.0, 0.0));
        let mut segs = vec![];
        assert_eq!(s.shot(&r, &mut segs), 1);
        assert!((segs[0].inhit.dist - 5.0).abs() < 1e-9, "{:?}", segs[0]);
        assert!((segs[0].outhit.dist - 15.0).abs() < 1e-9, "{:?}", segs[0]);
        let n = s.norm(&segs[0].inhit, &r);
        assert!((n - vec3(-1.0, 0.0, 0.0)).norm() < 1e-9, "normal = {}", n);
    }

    #[test]
    fn sphere_hit_behind_origin_is_negative() {
        let s = Sphere::new(Point3::ORIGIN, 1.0);
        let r = Ray::new(point3(0.0, 0.0, 0.0), vec3(0.0, 0.0, 1.0));
        let mut segs = vec![];
        s.shot(&r, &mut segs);
        assert!((segs[0].inhit.dist + 1.0).abs() < 1e-9);
        assert!((segs[0].outhit.dist - 1.0).abs() < 1e-9);
    }

    #[test]
    fn cuboid_numbers_faces() {
        let c = Cuboid::cube(Point3::ORIGIN, 2.0);
        let r = Ray::new(point3(0.2, -5.0, 0.3), vec3(0.0, 1.0, 0.0));
        let mut segs = vec![];
        assert_eq!(c.shot(&r, &mut segs), 1);
        let seg = segs[0];
        assert_eq!((seg.inhit.dist, seg.inhit.surfno), (4.0, 2));
        assert_eq!((seg.outhit.dist, seg.outhit.surfno), (6.0, 3));
        assert_eq!(c.norm(&seg.inhit, &r), vec3(0.0, -1.0, 0.0));
        assert_eq!(c.norm(&seg.outhit, &r), vec3(0.0, 1.0, 0.0));
        let (u, v) = c.uv(&seg.inhit, &r);
        assert!((u - 0.65).abs() < 1e-12 && (v - 0.6).abs() < 1e-12, "uv = {:?}", (u, v));
    }

    #[test]
    fn cuboid_parallel_miss() {
        let c = Cuboid::cube(Point3::ORIGIN, 2.0);
        let r = Ray::new(point3(-5.0, 3.0, 0.0), vec3(1.0, 0.0, 0.0));
        let mut segs = vec![];
        assert_eq!(c.shot(&r, &mut segs), 0);
        assert!(segs.is_empty());
    }

    #[test]
    fn half_space_entry_and_exit() {
        // Solid below z = 1.
        let h = HalfSpace::through(point3(0.0, 0.0, 1.0), Vec3::Z);
        let mut segs = vec![];
        let down = Ray::new(point3(0.0, 0.0, 5.0), vec3(0.0, 0.0, -1.0));
        h.shot(&down, &mut segs);
        assert_eq!(segs[0].inhit.dist, 4.0);
        assert_eq!(segs[0].outhit.dist, f64::INFINITY);
        assert_eq!(h.norm(&segs[0].inhit, &down), Vec3::Z);

        segs.clear();
        let up = Ray::new(point3(0.0, 0.0, 5.0), vec3(0.0, 0.0, 1.0));
        h.shot(&up, &mut segs);
        assert_eq!(segs[0].inhit.dist, -f64::INFINITY);
        assert_eq!(segs[0].outhit.dist, -4.0);

        segs.clear();
        let parallel_outside = Ray::new(point3(0.0, 0.0, 5.0), vec3(1.0, 0.0, 0.0));
        assert_eq!(h.shot(&parallel_outside, &mut segs), 0);
        assert!(h.is_infinite());
    }
}

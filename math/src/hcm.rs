use std::{
    fmt,
    ops::{Add, AddAssign, Div, Index, IndexMut, Mul, Neg, Sub},
};

pub fn vec3(x: f64, y: f64, z: f64) -> Vec3 {
    Vec3::new(x, y, z)
}

pub fn point3(x: f64, y: f64, z: f64) -> Point3 {
    Point3::new(x, y, z)
}

/// Represents a 3D vector. Each component is a `f64` number.
/// Components can be accessed using `v.x` `v.y` `v.z`,
/// or indices `v[i]` where i is 0, 1, or 2.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// A location in model space, in millimeters.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Point3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl fmt::Display for Vec3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let precision = f.precision().unwrap_or(2);
        write!(
            f,
            "({:.p$}, {:.p$}, {:.p$})",
            self.x,
            self.y,
            self.z,
            p = precision
        )
    }
}
impl fmt::Display for Point3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let precision = f.precision().unwrap_or(2);
        write!(
            f,
            "[{:.p$}, {:.p$}, {:.p$}]",
            self.x,
            self.y,
            self.z,
            p = precision
        )
    }
}

/// Axis access (`v[0]` is x) and component-wise checks shared by points and vectors.
macro_rules! coordinates {
    ($t:ty) => {
        impl $t {
            pub fn has_nan(self) -> bool {
                self.x.is_nan() || self.y.is_nan() || self.z.is_nan()
            }
            pub fn is_finite(self) -> bool {
                self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
            }
        }
        impl Index<usize> for $t {
            type Output = f64;
            fn index(&self, axis: usize) -> &f64 {
                match axis {
                    0 => &self.x,
                    1 => &self.y,
                    2 => &self.z,
                    _ => panic!("axis {} out of range", axis),
                }
            }
        }
        impl IndexMut<usize> for $t {
            fn index_mut(&mut self, axis: usize) -> &mut f64 {
                match axis {
                    0 => &mut self.x,
                    1 => &mut self.y,
                    2 => &mut self.z,
                    _ => panic!("axis {} out of range", axis),
                }
            }
        }
    };
}

coordinates!(Vec3);
coordinates!(Point3);

impl Vec3 {
    pub const fn new(x: f64, y: f64, z: f64) -> Vec3 {
        Vec3 { x, y, z }
    }
    pub const X: Vec3 = Self::new(1.0, 0.0, 0.0);
    pub const Y: Vec3 = Self::new(0.0, 1.0, 0.0);
    pub const Z: Vec3 = Self::new(0.0, 0.0, 1.0);
    pub const ZERO: Vec3 = Self::new(0.0, 0.0, 0.0);

    pub fn dot(self, v: Vec3) -> f64 {
        self.x * v.x + self.y * v.y + self.z * v.z
    }
    pub fn cross(self, v: Vec3) -> Vec3 {
        // x1 y1 z1
        // x2 y2 z2
        // i  j  k
        Vec3::new(
            self.y * v.z - self.z * v.y,
            self.z * v.x - self.x * v.z,
            self.x * v.y - self.y * v.x,
        )
    }

    pub fn norm_squared(self) -> f64 {
        self.dot(self)
    }
    pub fn norm(self) -> f64 {
        f64::sqrt(self.norm_squared())
    }
    pub fn is_zero(self) -> bool {
        self.norm_squared() == 0.0
    }

    /// Returns a normalized (unit-length) `self` vector.
    /// Panics if the vector length is zero, NaN or infinite.
    pub fn hat(self) -> Vec3 {
        let norm2 = self.norm_squared();
        assert!(norm2 != 0.0 && norm2.is_finite());
        let inv_sqrt = 1.0 / self.norm();
        self * inv_sqrt
    }

    /// Returns the normalized vector, or `None` if `self` has zero, NaN or infinite length.
    /// ```
    /// use math::hcm::{vec3, Vec3};
    /// assert_eq!(vec3(0.0, 3.0, 0.0).try_hat(), Some(Vec3::Y));
    /// assert_eq!(Vec3::ZERO.try_hat(), None);
    /// ```
    pub fn try_hat(self) -> Option<Self> {
        let inv_length = 1.0 / self.norm();
        (inv_length.is_finite() && inv_length != 0.0).then(|| inv_length * self)
    }

    /// Chooses from `self` or `-self`, whichever faces a surface having given `normal`.
    pub fn facing(self, normal: Self) -> Self {
        if self.dot(normal).is_sign_negative() {
            self
        } else {
            -self
        }
    }

}

impl Add for Vec3 {
    type Output = Self;
    fn add(self, other: Self) -> Vec3 {
        Vec3::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }
}
impl AddAssign for Vec3 {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}
impl Add<Point3> for Vec3 {
    type Output = Point3;
    fn add(self, other: Point3) -> Point3 {
        Point3::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }
}

impl Sub for Vec3 {
    type Output = Self;
    fn sub(self, other: Self) -> Vec3 {
        Vec3::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }
}
impl Neg for Vec3 {
    type Output = Self;
    fn neg(self) -> Vec3 {
        Vec3::new(-self.x, -self.y, -self.z)
    }
}

impl Mul<f64> for Vec3 {
    type Output = Self;
    fn mul(self, s: f64) -> Vec3 {
        Vec3::new(self.x * s, self.y * s, self.z * s)
    }
}
impl Mul<Vec3> for f64 {
    type Output = Vec3;
    fn mul(self, v: Vec3) -> Vec3 {
        v * self
    }
}
impl Div<f64> for Vec3 {
    type Output = Self;
    fn div(self, s: f64) -> Vec3 {
        Vec3::new(self.x / s, self.y / s, self.z / s)
    }
}

// Implementation of Points
impl Point3 {
    pub const fn new(x: f64, y: f64, z: f64) -> Point3 {
        Point3 { x, y, z }
    }
    pub const ORIGIN: Point3 = Point3::new(0.0, 0.0, 0.0);
    pub fn distance_to(self, p: Self) -> f64 {
        (self - p).norm()
    }
}

impl Add<Vec3> for Point3 {
    type Output = Point3;
    fn add(self, v: Vec3) -> Point3 {
        Point3::new(self.x + v.x, self.y + v.y, self.z + v.z)
    }
}

impl Sub for Point3 {
    type Output = Vec3;
    fn sub(self, from: Point3) -> Vec3 {
        Vec3::new(self.x - from.x, self.y - from.y, self.z - from.z)
    }
}
impl Sub<Vec3> for Point3 {
    type Output = Point3;
    fn sub(self, t: Vec3) -> Point3 {
        Point3::new(self.x - t.x, self.y - t.y, self.z - t.z)
    }
}

// Explicit conversion between Vec3 and Point3.
// -------------------------------------------------------------------------------------------------
impl From<Vec3> for Point3 {
    fn from(v: Vec3) -> Self {
        Point3::new(v.x, v.y, v.z)
    }
}

impl From<Point3> for Vec3 {
    fn from(p: Point3) -> Self {
        Vec3::new(p.x, p.y, p.z)
    }
}

/// Builds an orthonormal basis `(u, v)` perpendicular to the given unit vector `w`.
pub fn make_coord_system(w: Vec3) -> (Vec3, Vec3) {
    let helper = match w.x.abs() > 0.9 {
        true => Vec3::Y,
        false => Vec3::X,
    };
    let u = helper.cross(w).hat();
    let v = w.cross(u);
    (u, v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cross_is_perpendicular() {
        let a = vec3(1.0, 2.5, -0.5);
        let b = vec3(-3.0, 0.1, 2.0);
        let c = a.cross(b);
        assert!(c.dot(a).abs() < 1e-12, "c = {}, a = {}", c, a);
        assert!(c.dot(b).abs() < 1e-12, "c = {}, b = {}", c, b);
    }

    #[test]
    fn coord_system_is_orthonormal() {
        let w = vec3(-0.3, 0.5, 1.0).hat();
        let (u, v) = make_coord_system(w);
        assert!(u.dot(w).abs() < 1e-12);
        assert!(v.dot(w).abs() < 1e-12);
        assert!(u.dot(v).abs() < 1e-12);
        assert!((v.norm() - 1.0).abs() < 1e-12, "v = {}", v);
    }

    #[test]
    fn point_vector_arithmetic() {
        let p = point3(1.0, 2.0, 3.0);
        let q = p + Vec3::X * 2.0;
        assert_eq!(q - p, vec3(2.0, 0.0, 0.0));
        assert_eq!(p.distance_to(q), 2.0);
    }
}

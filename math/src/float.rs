/// Represents intervals on the real-number axis. Any `Interval`s covers at least 1 point.
/// There is no difference between open/closed intervals.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Interval {
    pub min: f64,
    pub max: f64,
}

/// Smallest magnitude whose square is still representable; direction cosines below this are
/// treated as exactly zero.
pub const SQRT_SMALL_FASTF: f64 = 1.0e-39;

pub trait Float: Sized {
    /// Computes `x / y` if y is nonzero; returns `None` if y is zero.
    fn try_divide(self, divisor: Self) -> Option<Self>;
    /// Returns true if `self` is within `tol` of zero (inclusive).
    fn near_zero(self, tol: Self) -> bool;
    /// Distance from `self` to the next representable value away from zero.
    fn ulp(self) -> Self;
}

impl Float for f64 {
    /// Computes `x / y` if y is nonzero; returns `None` if y is zero.
    /// ```
    /// use math::float::Float;
    /// assert_eq!(1.0f64.try_divide(0.0), None);
    /// assert_eq!(1.0f64.try_divide(2.5), Some(0.4));
    /// assert_eq!(0.0f64.try_divide(2.5), Some(0.0));
    /// ```
    fn try_divide(self, divisor: Self) -> Option<Self> {
        if divisor == 0.0 {
            None
        } else {
            Some(self / divisor)
        }
    }

    /// ```
    /// use math::float::Float;
    /// assert!(0.0004f64.near_zero(0.0005));
    /// assert!((-0.0005f64).near_zero(0.0005));
    /// assert!(!0.001f64.near_zero(0.0005));
    /// ```
    fn near_zero(self, tol: Self) -> bool {
        self >= -tol && self <= tol
    }

    /// ```
    /// use math::float::Float;
    /// assert_eq!(1.0f64.ulp(), f64::EPSILON);
    /// assert!(1.0e6f64.ulp() > 1.0f64.ulp());
    /// assert!(f64::INFINITY.ulp().is_nan());
    /// ```
    fn ulp(self) -> Self {
        if !self.is_finite() {
            return f64::NAN;
        }
        let magnitude = self.abs();
        f64::from_bits(magnitude.to_bits() + 1) - magnitude
    }
}

impl Interval {
    /// Constructs an `Interval` with `a` and `b` being the endpoint.
    /// A comparison is made to determine which one is lesser / greater.
    pub fn new(a: f64, b: f64) -> Self {
        assert!(!a.is_nan());
        assert!(!b.is_nan());
        let (a, b) = min_max(a, b);
        Interval { min: a, max: b }
    }

    pub fn length(&self) -> f64 {
        self.max - self.min
    }

    pub fn contains(&self, x: f64) -> bool {
        x >= self.min && x <= self.max
    }

    /// Returns the left and right ends as a pair.
    pub fn as_pair(&self) -> (f64, f64) {
        (self.min, self.max)
    }
}

pub fn min_max(a: f64, b: f64) -> (f64, f64) {
    if a < b {
        (a, b)
    } else {
        (b, a)
    }
}

#[macro_export]
macro_rules! assert_le {
    ($left:expr, $right:expr) => {
        if $left > $right {
            panic!(
                "Assertion failed: {} <= {} (values: {} vs. {})",
                stringify!($left),
                stringify!($right),
                $left,
                $right
            )
        }
    };
}

#[macro_export]
macro_rules! assert_lt {
    ($left:expr, $right:expr) => {
        if $left >= $right {
            panic!(
                "Assertion failed: {} < {} (values: {} vs. {})",
                stringify!($left),
                stringify! {$right},
                $left,
                $right
            )
        }
    };
}

#[macro_export]
macro_rules! assert_ge {
    ($left:expr, $right:expr) => {
        if $left < $right {
            panic!(
                "Assertion failed: {} >= {} (values: {} vs. {})",
                stringify!($left),
                stringify!($right),
                $left,
                $right
            )
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_sorts_endpoints() {
        let i = Interval::new(3.0, -1.0);
        assert_eq!(i.as_pair(), (-1.0, 3.0));
        assert_eq!(i.length(), 4.0);
        assert!(i.contains(0.0));
        assert!(!i.contains(3.5));
    }
}

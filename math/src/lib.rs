/// Defines useful functions for common math operations, tools and constants:
/// - 1D interval,
/// - Tolerance-aware comparisons and ULP stepping on `f64`,
/// - Macros to check if two math quantities are less than / greater than (or equal to) each other.
pub mod float;

/// Homogeneous-coordinate maths module.
/// - Types: 3D points and vectors in double precision.
/// - Function `make_coord_system()` to build an orthogonal base from a `Vec3`.
pub mod hcm;

/// Provides `BitVec`, a fixed-length bit set used for per-ray dedup marks.
pub mod bitv;

pub use bitv::BitVec;

/// Defines the `BBox` axis-aligned bounding-box type and its ray clip.
pub mod bbox;
/// Defines `Ray` and its inverse direction `InvDir`.
pub mod ray;
pub mod tolerance;

pub use bbox::BBox;
pub use ray::{InvDir, Ray};
pub use tolerance::Tolerance;

//! Planar geometry in millimetres.

mod bounding_box;
pub mod clipping;
mod mirroring;
mod region;
pub mod shapes;

pub use bounding_box::BoundingBox;
pub use clipping::GeometryError;
pub use mirroring::Mirroring;
pub use region::{ring_contains_point, Polygon, Region, RING_EPSILON};

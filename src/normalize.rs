//! Placement edits of a motif region.
//!
//! Every edit returns a new region; mirrors and rotations move the result so its bounding box minimum is at (0, 0).

use std::f64::consts::FRAC_PI_2;

use log::{debug, trace};
use thiserror::Error;

use crate::geometry::{BoundingBox, Mirroring, Region};
use crate::{Position, Vector};

/// Smallest width a region is considered to have when rescaling, mm.
pub const MIN_WIDTH: f64 = 1e-6;

#[derive(Error, Debug, PartialEq)]
pub enum NormalizeError {
    #[error("Invalid target width: {0}")]
    InvalidTargetWidth(f64),
}

/// Moves the region so its bounding box minimum is at (0, 0). Idempotent.
pub fn translate_to_origin(region: &Region) -> Region {
    region.translate_to_origin()
}

/// Flips about the horizontal axis (y → −y).
pub fn mirror_horizontal(region: &Region) -> Region {
    region
        .mirror(Mirroring {
            x: false,
            y: true,
        })
        .translate_to_origin()
}

/// Flips about the vertical axis (x → −x).
pub fn mirror_vertical(region: &Region) -> Region {
    region
        .mirror(Mirroring {
            x: true,
            y: false,
        })
        .translate_to_origin()
}

/// Rotates by +90° about the origin, which reads as a clockwise turn in a y-down view.
pub fn rotate_90(region: &Region) -> Region {
    region
        .rotate(FRAC_PI_2, Position::origin())
        .translate_to_origin()
}

/// Scales the region uniformly about the origin so it is `target_width` wide, after moving its left edge to x = 0.
pub fn rescale_to_width(region: &Region, target_width: f64) -> Result<Region, NormalizeError> {
    if !target_width.is_finite() || target_width <= 0.0 {
        return Err(NormalizeError::InvalidTargetWidth(target_width));
    }
    if region.is_empty() {
        return Ok(Region::empty());
    }

    let bbox = region.bounding_box();
    let width = bbox.width().max(MIN_WIDTH);
    let scale = target_width / width;
    trace!("rescale, width: {}, target: {}, scale: {}", width, target_width, scale);

    Ok(region
        .translate(Vector::new(-bbox.min.x, 0.0))
        .scale(scale))
}

/// Offset that centers the region on `rectangle`. The region itself is left unchanged.
pub fn center_offset(region: &Region, rectangle: &BoundingBox) -> Vector {
    if region.is_empty() {
        debug!("Centering an empty region");
        return Vector::zeros();
    }
    rectangle.center() - region.bounding_box().center()
}

/// Brings imported vector artwork into the placement convention: scaled to `target_width`, mirrored through the
/// origin and moved to (0, 0).
pub fn import_svg_motif(region: &Region, target_width: f64) -> Result<Region, NormalizeError> {
    let scaled = rescale_to_width(region, target_width)?;

    Ok(scaled
        .mirror(Mirroring::BOTH)
        .translate_to_origin())
}

use log::info;
use nalgebra::Point2;

use super::extrude::extrude_region;
use super::{Mesh, MeshError};
use crate::config::PanelConfig;
use crate::geometry::clipping::difference;
use crate::geometry::shapes::rectangle;
use crate::geometry::{BoundingBox, Region};
use crate::Vector;

/// Builds the negative relief of a placed motif: the panel with the motif cut out, extruded to the frame height,
/// turned 270° about +Z and moved to the origin.
#[profiling::function]
pub fn build_relief_mesh(motif: &Region, offset: Vector, panel: &PanelConfig) -> Result<Mesh, MeshError> {
    if !(panel.width.is_finite() && panel.width > 0.0 && panel.height.is_finite() && panel.height > 0.0) {
        return Err(MeshError::InvalidPanel(panel.width, panel.height));
    }

    let placed = motif.translate(offset);
    let frame = Region::from_polygon(rectangle(&BoundingBox::new(
        Point2::new(0.0, 0.0),
        Point2::new(panel.width, panel.height),
    )));

    let negative = difference(&frame, &placed)?;
    if negative.is_empty() {
        return Err(MeshError::NothingToExport);
    }
    info!(
        "negative region: {} part(s), area: {:.3} mm²",
        negative.part_count(),
        negative.area()
    );

    let mut mesh = extrude_region(&negative, panel.frame_height)?;
    mesh.rotate_z(270.0_f64.to_radians());
    mesh.translate_to_origin();

    info!(
        "relief mesh: {} vertices, {} triangles",
        mesh.vertex_count(),
        mesh.triangle_count()
    );

    Ok(mesh)
}

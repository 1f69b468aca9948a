use log::trace;
use nalgebra::Point3;

use super::triangulate::triangulate;
use super::{Mesh, MeshError};
use crate::geometry::{Polygon, Region};

/// Extrudes a polygon from z = 0 to z = `height` into a closed solid.
pub fn extrude_polygon(polygon: &Polygon, height: f64) -> Result<Mesh, MeshError> {
    if !height.is_finite() || height <= 0.0 {
        return Err(MeshError::InvalidHeight(height));
    }

    let triangulation = triangulate(polygon)?;
    let count = triangulation.vertices.len() as u32;

    // bottom vertices first, then the top ones in the same order
    let mut vertices = Vec::with_capacity(triangulation.vertices.len() * 2);
    vertices.extend(
        triangulation
            .vertices
            .iter()
            .map(|position| Point3::new(position.x, position.y, 0.0)),
    );
    vertices.extend(
        triangulation
            .vertices
            .iter()
            .map(|position| Point3::new(position.x, position.y, height)),
    );

    let mut triangles = Vec::with_capacity(triangulation.triangles.len() * 2 + polygon.vertex_count() * 2);
    for [a, b, c] in &triangulation.triangles {
        // bottom faces down
        triangles.push([*a, *c, *b]);
        triangles.push([a + count, b + count, c + count]);
    }

    // walls; the material is on the left of every ring, exterior and holes alike
    let mut start = 0u32;
    for ring in polygon.rings() {
        let length = ring.len() as u32;
        for i in 0..length {
            let a = start + i;
            let b = start + (i + 1) % length;
            triangles.push([a, b, b + count]);
            triangles.push([a, b + count, a + count]);
        }
        start += length;
    }

    trace!("extruded {} vertices, {} triangles", vertices.len(), triangles.len());

    Ok(Mesh {
        vertices,
        triangles,
    })
}

/// Extrudes every part of the region and merges the results.
#[profiling::function]
pub fn extrude_region(region: &Region, height: f64) -> Result<Mesh, MeshError> {
    let mut mesh = Mesh::default();
    for polygon in &region.polygons {
        mesh.merge(extrude_polygon(polygon, height)?);
    }
    Ok(mesh)
}

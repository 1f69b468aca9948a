//! Closed triangle meshes and the relief frame built from a motif.

use nalgebra::{Point3, Rotation3, Vector3};
use thiserror::Error;

use crate::geometry::GeometryError;

pub mod export;
mod extrude;
mod relief;
mod triangulate;

pub use extrude::{extrude_polygon, extrude_region};
pub use relief::build_relief_mesh;
pub use triangulate::{triangulate, Triangulation};

#[derive(Error, Debug)]
pub enum MeshError {
    #[error("Nothing to export")]
    NothingToExport,
    #[error("Triangulation failed: {0}")]
    Triangulation(String),
    #[error("Invalid extrusion height: {0}")]
    InvalidHeight(f64),
    #[error("Invalid panel size: {0} x {1}")]
    InvalidPanel(f64, f64),
    #[error(transparent)]
    Geometry(#[from] GeometryError),
}

/// Indexed triangle mesh; triangles are counter-clockwise seen from outside.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    pub vertices: Vec<Point3<f64>>,
    pub triangles: Vec<[u32; 3]>,
}

impl Mesh {
    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// Appends another mesh, re-indexing its triangles.
    pub fn merge(&mut self, other: Mesh) {
        let offset = self.vertices.len() as u32;
        self.vertices.extend(other.vertices);
        self.triangles.extend(
            other
                .triangles
                .into_iter()
                .map(|[a, b, c]| [a + offset, b + offset, c + offset]),
        );
    }

    pub fn triangle_vertices(&self, triangle: &[u32; 3]) -> [Point3<f64>; 3] {
        triangle.map(|index| self.vertices[index as usize])
    }

    /// Minimum and maximum corner, `None` for a mesh without vertices.
    pub fn bounds(&self) -> Option<(Point3<f64>, Point3<f64>)> {
        let first = self.vertices.first()?;
        Some(self.vertices.iter().fold((*first, *first), |(min, max), vertex| {
            (min.inf(vertex), max.sup(vertex))
        }))
    }

    /// Counter-clockwise rotation about +Z through the origin.
    pub fn rotate_z(&mut self, radians: f64) {
        let rotation = Rotation3::from_axis_angle(&Vector3::z_axis(), radians);
        for vertex in &mut self.vertices {
            *vertex = rotation * *vertex;
        }
    }

    pub fn translate(&mut self, offset: Vector3<f64>) {
        for vertex in &mut self.vertices {
            *vertex += offset;
        }
    }

    /// Moves the mesh so its minimum corner is at the origin.
    pub fn translate_to_origin(&mut self) {
        if let Some((min, _)) = self.bounds() {
            self.translate(-min.coords);
        }
    }

    /// Enclosed volume, positive for outward facing triangles.
    pub fn volume(&self) -> f64 {
        self.triangles
            .iter()
            .map(|triangle| {
                let [a, b, c] = self.triangle_vertices(triangle);
                a.coords.dot(&b.coords.cross(&c.coords)) / 6.0
            })
            .sum()
    }

    /// Every edge is used exactly once in each direction.
    pub fn is_closed(&self) -> bool {
        use std::collections::HashMap;

        let mut edges: HashMap<(u32, u32), i32> = HashMap::new();
        for [a, b, c] in &self.triangles {
            for (from, to) in [(*a, *b), (*b, *c), (*c, *a)] {
                *edges.entry((from, to)).or_default() += 1;
            }
        }

        !edges.is_empty()
            && edges
                .iter()
                .all(|((from, to), count)| *count == 1 && edges.get(&(*to, *from)) == Some(&1))
    }
}

#[cfg(test)]
mod tests {
    use std::f64::consts::FRAC_PI_2;

    use super::*;

    /// Unit tetrahedron with outward facing triangles.
    fn tetrahedron() -> Mesh {
        Mesh {
            vertices: vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
                Point3::new(0.0, 0.0, 1.0),
            ],
            triangles: vec![[0, 2, 1], [0, 1, 3], [1, 2, 3], [0, 3, 2]],
        }
    }

    #[test]
    fn test_tetrahedron() {
        // given
        let mesh = tetrahedron();

        // expect
        assert!(mesh.is_closed());
        assert!((mesh.volume() - 1.0 / 6.0).abs() < 1e-12);
    }

    #[test]
    fn test_open_mesh() {
        // given
        let mut mesh = tetrahedron();
        mesh.triangles.pop();

        // expect
        assert!(!mesh.is_closed());
    }

    #[test]
    fn test_merge_reindexes() {
        // given
        let mut mesh = tetrahedron();
        let mut other = tetrahedron();
        other.translate(Vector3::new(5.0, 0.0, 0.0));

        // when
        mesh.merge(other);

        // then
        assert_eq!(mesh.vertex_count(), 8);
        assert_eq!(mesh.triangles[4], [4, 6, 5]);
        assert!(mesh.is_closed());
        assert!((mesh.volume() - 2.0 / 6.0).abs() < 1e-12);
    }

    #[test]
    fn test_rotate_and_translate_to_origin() {
        // given
        let mut mesh = tetrahedron();

        // when
        mesh.rotate_z(FRAC_PI_2);
        mesh.translate_to_origin();

        // then
        let (min, max) = mesh.bounds().unwrap();
        assert!(min.coords.norm() < 1e-12);
        assert!((max - Point3::new(1.0, 1.0, 1.0)).norm() < 1e-12);
        // (1, 0, 0) turned to (0, 1, 0), then shifted by +1 in x
        assert!((mesh.vertices[1] - Point3::new(1.0, 1.0, 0.0)).norm() < 1e-12);
        assert!((mesh.volume() - 1.0 / 6.0).abs() < 1e-12);
    }
}

use std::collections::HashMap;

use log::{debug, warn};

use super::MeshError;
use crate::geometry::Polygon;
use crate::types::signed_area;
use crate::Position;

/// Relative difference between the triangle area and the polygon area above which a triangulation is rejected.
const AREA_TOLERANCE: f64 = 1e-6;

/// Triangles over a polygon. `vertices` starts with the polygon's ring vertices in order (exterior, then holes),
/// followed by any vertex the triangulator had to add. Triangles are counter-clockwise.
#[derive(Debug, Clone)]
pub struct Triangulation {
    pub vertices: Vec<Position>,
    pub triangles: Vec<[u32; 3]>,
}

impl Triangulation {
    pub fn area(&self) -> f64 {
        self.triangles
            .iter()
            .map(|triangle| signed_area(&triangle.map(|index| self.vertices[index as usize])))
            .sum()
    }
}

fn ring_vertices(polygon: &Polygon) -> Vec<Position> {
    polygon
        .rings()
        .flatten()
        .copied()
        .collect()
}

/// Orders each triangle counter-clockwise and drops the degenerate ones.
fn counter_clockwise(vertices: &[Position], triangles: impl Iterator<Item = [u32; 3]>) -> Vec<[u32; 3]> {
    triangles
        .filter_map(|[a, b, c]| {
            let area = signed_area(&[vertices[a as usize], vertices[b as usize], vertices[c as usize]]);
            match area {
                area if area > 0.0 => Some([a, b, c]),
                area if area < 0.0 => Some([a, c, b]),
                _ => None,
            }
        })
        .collect()
}

fn earcut(polygon: &Polygon) -> Result<Triangulation, String> {
    let vertices = ring_vertices(polygon);

    let coordinates: Vec<f64> = vertices
        .iter()
        .flat_map(|vertex| [vertex.x, vertex.y])
        .collect();

    let mut hole_indices = Vec::with_capacity(polygon.holes.len());
    let mut start = polygon.exterior.len();
    for hole in &polygon.holes {
        hole_indices.push(start);
        start += hole.len();
    }

    let indices = earcutr::earcut(&coordinates, &hole_indices, 2).map_err(|error| format!("{:?}", error))?;
    if indices.is_empty() {
        return Err("no triangles".to_string());
    }

    let triangles = counter_clockwise(
        &vertices,
        indices
            .chunks_exact(3)
            .map(|chunk| [chunk[0] as u32, chunk[1] as u32, chunk[2] as u32]),
    );

    Ok(Triangulation {
        vertices,
        triangles,
    })
}

fn tessellate(polygon: &Polygon) -> Result<Triangulation, String> {
    use lyon::math::point;
    use lyon::path::Path;
    use lyon::tessellation::{BuffersBuilder, FillOptions, FillRule, FillTessellator, FillVertex, VertexBuffers};

    let mut path_builder = Path::builder();
    for ring in polygon.rings() {
        if let Some(first) = ring.first() {
            path_builder.begin(point(first.x as f32, first.y as f32));
            for position in &ring[1..] {
                path_builder.line_to(point(position.x as f32, position.y as f32));
            }
            path_builder.close();
        }
    }
    let path = path_builder.build();

    let mut geometry: VertexBuffers<[f32; 2], u32> = VertexBuffers::new();
    let mut tessellator = FillTessellator::new();

    tessellator
        .tessellate_path(
            &path,
            &FillOptions::default().with_fill_rule(FillRule::EvenOdd),
            &mut BuffersBuilder::new(&mut geometry, |vertex: FillVertex| vertex.position().to_array()),
        )
        .map_err(|error| format!("{:?}", error))?;

    // the tessellator works in f32; map its vertices back onto the ring vertices where they coincide
    let mut vertices = ring_vertices(polygon);
    let mut known: HashMap<(u32, u32), u32> = HashMap::new();
    for (index, vertex) in vertices.iter().enumerate() {
        known
            .entry(((vertex.x as f32).to_bits(), (vertex.y as f32).to_bits()))
            .or_insert(index as u32);
    }

    let mapping: Vec<u32> = geometry
        .vertices
        .iter()
        .map(|[x, y]| {
            *known
                .entry((x.to_bits(), y.to_bits()))
                .or_insert_with(|| {
                    vertices.push(Position::new(*x as f64, *y as f64));
                    (vertices.len() - 1) as u32
                })
        })
        .collect();

    let triangles = counter_clockwise(
        &vertices,
        geometry
            .indices
            .chunks_exact(3)
            .map(|chunk| [mapping[chunk[0] as usize], mapping[chunk[1] as usize], mapping[chunk[2] as usize]]),
    );

    if triangles.is_empty() {
        return Err("no triangles".to_string());
    }

    Ok(Triangulation {
        vertices,
        triangles,
    })
}

fn area_matches(triangulation: &Triangulation, expected: f64) -> bool {
    let area = triangulation.area();
    (area - expected).abs() <= AREA_TOLERANCE * expected.abs().max(1.0)
}

/// Earcut first; the fill tessellator when earcut fails or does not cover the polygon.
pub fn triangulate(polygon: &Polygon) -> Result<Triangulation, MeshError> {
    let expected = polygon.area();

    match earcut(polygon) {
        Ok(triangulation) if area_matches(&triangulation, expected) => return Ok(triangulation),
        Ok(triangulation) => {
            debug!(
                "Earcut area mismatch, area: {}, expected: {}, falling back",
                triangulation.area(),
                expected
            );
        }
        Err(cause) => {
            debug!("Earcut failed, cause: {}, falling back", cause);
        }
    }

    match tessellate(polygon) {
        Ok(triangulation) => Ok(triangulation),
        Err(cause) => {
            warn!("Triangulation failed, polygon vertices: {}", polygon.vertex_count());
            Err(MeshError::Triangulation(cause))
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::geometry::shapes::{annulus, disk};

    fn square(min: f64, max: f64) -> Vec<Position> {
        vec![
            Position::new(min, min),
            Position::new(max, min),
            Position::new(max, max),
            Position::new(min, max),
        ]
    }

    #[test]
    fn test_square_with_hole() {
        // given
        let polygon = Polygon::new(square(0.0, 10.0), vec![square(4.0, 6.0)]);

        // when
        let triangulation = triangulate(&polygon).unwrap();

        // then
        assert_eq!(triangulation.vertices.len(), 8);
        assert!((triangulation.area() - 96.0).abs() < 1e-9);
        assert_eq!(triangulation.triangles.len(), 8);
    }

    #[rstest]
    #[case::disk(disk(Position::new(3.0, 3.0), 2.0))]
    #[case::annulus(annulus(Position::new(3.0, 3.0), 2.0, 1.0).unwrap())]
    fn test_triangles_are_counter_clockwise(#[case] polygon: Polygon) {
        // when
        let triangulation = triangulate(&polygon).unwrap();

        // then
        assert!(triangulation.triangles.iter().all(|triangle| {
            signed_area(&triangle.map(|index| triangulation.vertices[index as usize])) > 0.0
        }));
        assert!((triangulation.area() - polygon.area()).abs() < 1e-9);
    }

    #[test]
    fn test_tessellator_fallback_maps_ring_vertices() {
        // given
        let polygon = Polygon::new(square(0.0, 10.0), vec![square(4.0, 6.0)]);

        // when
        let triangulation = tessellate(&polygon).unwrap();

        // then
        assert_eq!(&triangulation.vertices[..8], ring_vertices(&polygon).as_slice());
        assert_eq!(triangulation.vertices.len(), 8);
        assert!((triangulation.area() - 96.0).abs() < 1e-6);
    }
}

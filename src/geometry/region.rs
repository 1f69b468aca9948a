use log::trace;

use super::{BoundingBox, Mirroring};
use crate::spacial::deduplicate::DedupEpsilon;
use crate::types::{signed_area, Winding};
use crate::{Position, Vector};

/// Vertices closer than this are merged when a ring is built.
pub const RING_EPSILON: f64 = 1e-9;

/// A simple polygon with optional holes, in millimetres.
///
/// Rings are open (the first vertex is not repeated). The exterior is kept counter-clockwise and holes
/// clockwise, which is what the non-zero fill rule of the boolean operations expects.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Polygon {
    pub exterior: Vec<Position>,
    pub holes: Vec<Vec<Position>>,
}

impl Polygon {
    pub fn new(exterior: Vec<Position>, holes: Vec<Vec<Position>>) -> Self {
        let mut polygon = Self {
            exterior: exterior.dedup_with_epsilon(RING_EPSILON),
            holes: holes
                .into_iter()
                .map(|hole| hole.dedup_with_epsilon(RING_EPSILON))
                .filter(|hole| hole.len() >= 3)
                .collect(),
        };
        polygon.orient();
        polygon
    }

    pub fn from_exterior(exterior: Vec<Position>) -> Self {
        Self::new(exterior, vec![])
    }

    /// Exterior counter-clockwise, holes clockwise.
    pub fn orient(&mut self) {
        if Winding::from_vertices(&self.exterior) == Winding::Clockwise {
            self.exterior.reverse();
        }
        for hole in self.holes.iter_mut() {
            if Winding::from_vertices(hole) == Winding::CounterClockwise {
                hole.reverse();
            }
        }
    }

    /// A polygon needs an exterior with at least 3 distinct vertices and a non-zero area.
    pub fn is_degenerate(&self) -> bool {
        self.exterior.len() < 3 || signed_area(&self.exterior).abs() < f64::EPSILON
    }

    pub fn area(&self) -> f64 {
        let holes: f64 = self
            .holes
            .iter()
            .map(|hole| signed_area(hole).abs())
            .sum();
        signed_area(&self.exterior).abs() - holes
    }

    pub fn rings(&self) -> impl Iterator<Item = &Vec<Position>> {
        std::iter::once(&self.exterior).chain(self.holes.iter())
    }

    pub fn vertex_count(&self) -> usize {
        self.rings().map(|ring| ring.len()).sum()
    }

    pub fn bounding_box(&self) -> BoundingBox {
        BoundingBox::from_points(&self.exterior)
    }

    /// Inside the exterior and outside every hole.
    pub fn contains_point(&self, point: Position) -> bool {
        ring_contains_point(&self.exterior, point) && !self.holes.iter().any(|hole| ring_contains_point(hole, point))
    }

    /// `true` when no two non-adjacent edges of any ring intersect and no hole crosses the exterior.
    pub fn is_simple(&self) -> bool {
        let rings: Vec<&Vec<Position>> = self.rings().collect();
        for (index, ring) in rings.iter().enumerate() {
            if ring_self_intersects(ring) {
                trace!("ring {} self-intersects", index);
                return false;
            }
            for other in rings.iter().skip(index + 1) {
                if rings_cross(ring, other) {
                    trace!("ring {} crosses another ring", index);
                    return false;
                }
            }
        }
        true
    }

    fn map_positions<F>(&self, f: F) -> Polygon
    where
        F: Fn(Position) -> Position,
    {
        let mut polygon = Polygon {
            exterior: self
                .exterior
                .iter()
                .map(|position| f(*position))
                .collect(),
            holes: self
                .holes
                .iter()
                .map(|hole| {
                    hole.iter()
                        .map(|position| f(*position))
                        .collect()
                })
                .collect(),
        };
        polygon.orient();
        polygon
    }
}

/// A planar region made of zero or more disjoint polygons, in millimetres.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Region {
    pub polygons: Vec<Polygon>,
}

impl Region {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_polygon(polygon: Polygon) -> Self {
        Self::from_polygons(vec![polygon])
    }

    /// Degenerate polygons are discarded.
    pub fn from_polygons(polygons: Vec<Polygon>) -> Self {
        Self {
            polygons: polygons
                .into_iter()
                .filter(|polygon| !polygon.is_degenerate())
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.polygons.is_empty()
    }

    /// Number of connected parts.
    pub fn part_count(&self) -> usize {
        self.polygons.len()
    }

    pub fn area(&self) -> f64 {
        self.polygons
            .iter()
            .map(Polygon::area)
            .sum()
    }

    pub fn bounding_box(&self) -> BoundingBox {
        let mut bbox = BoundingBox::default();
        for polygon in &self.polygons {
            bbox.expand(&polygon.bounding_box());
        }
        bbox
    }

    pub fn contains_point(&self, point: Position) -> bool {
        self.polygons
            .iter()
            .any(|polygon| polygon.contains_point(point))
    }

    pub fn translate(&self, offset: Vector) -> Region {
        self.map_positions(|position| position + offset)
    }

    /// Uniform scale about the origin.
    pub fn scale(&self, factor: f64) -> Region {
        self.map_positions(|position| Position::new(position.x * factor, position.y * factor))
    }

    /// Mirror through the origin on the flagged axes.
    pub fn mirror(&self, mirroring: Mirroring) -> Region {
        let [sx, sy] = mirroring.as_f64();
        self.map_positions(|position| Position::new(position.x * sx, position.y * sy))
    }

    /// Counter-clockwise rotation (y-up) about `origin`.
    pub fn rotate(&self, radians: f64, origin: Position) -> Region {
        self.map_positions(|position| crate::spacial::rotate_about(position, origin, radians))
    }

    /// Moves the region so the minimum corner of its bounding box is at (0, 0).
    pub fn translate_to_origin(&self) -> Region {
        if self.is_empty() {
            return self.clone();
        }
        let bbox = self.bounding_box();
        self.translate(Vector::new(-bbox.min.x, -bbox.min.y))
    }

    pub fn into_polygons(self) -> Vec<Polygon> {
        self.polygons
    }

    fn map_positions<F>(&self, f: F) -> Region
    where
        F: Fn(Position) -> Position,
    {
        Region {
            polygons: self
                .polygons
                .iter()
                .map(|polygon| polygon.map_positions(&f))
                .collect(),
        }
    }
}

impl From<Polygon> for Region {
    fn from(value: Polygon) -> Self {
        Region::from_polygon(value)
    }
}

/// Even-odd ray cast.
pub fn ring_contains_point(ring: &[Position], point: Position) -> bool {
    let mut inside = false;
    let count = ring.len();
    if count < 3 {
        return false;
    }
    let mut j = count - 1;
    for i in 0..count {
        let a = ring[i];
        let b = ring[j];
        if (a.y > point.y) != (b.y > point.y) {
            let x_intersection = (b.x - a.x) * (point.y - a.y) / (b.y - a.y) + a.x;
            if point.x < x_intersection {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

fn orientation(a: Position, b: Position, c: Position) -> f64 {
    (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
}

fn segments_intersect(p1: Position, p2: Position, q1: Position, q2: Position) -> bool {
    let d1 = orientation(q1, q2, p1);
    let d2 = orientation(q1, q2, p2);
    let d3 = orientation(p1, p2, q1);
    let d4 = orientation(p1, p2, q2);

    ((d1 > 0.0 && d2 < 0.0) || (d1 < 0.0 && d2 > 0.0)) && ((d3 > 0.0 && d4 < 0.0) || (d3 < 0.0 && d4 > 0.0))
}

fn edges(ring: &[Position]) -> impl Iterator<Item = (Position, Position)> + '_ {
    (0..ring.len()).map(move |i| (ring[i], ring[(i + 1) % ring.len()]))
}

fn ring_self_intersects(ring: &[Position]) -> bool {
    let count = ring.len();
    for i in 0..count {
        let (a1, a2) = (ring[i], ring[(i + 1) % count]);
        for j in (i + 2)..count {
            // the last edge shares a vertex with the first one
            if i == 0 && j == count - 1 {
                continue;
            }
            let (b1, b2) = (ring[j], ring[(j + 1) % count]);
            if segments_intersect(a1, a2, b1, b2) {
                return true;
            }
        }
    }
    false
}

fn rings_cross(a: &[Position], b: &[Position]) -> bool {
    edges(a).any(|(a1, a2)| edges(b).any(|(b1, b2)| segments_intersect(a1, a2, b1, b2)))
}

use std::f64::consts::{FRAC_PI_2, PI, TAU};

use super::clipping::{union_all, GeometryError};
use super::region::{Polygon, Region};
use super::BoundingBox;
use crate::Position;

/// Segments used to approximate a full circle.
pub const CIRCLE_SEGMENTS: usize = 128;

/// Points on a circular arc, `steps` segments from `start_radians` to `end_radians` inclusive.
pub fn arc_points(center: Position, radius: f64, start_radians: f64, end_radians: f64, steps: usize) -> Vec<Position> {
    let steps = steps.max(1);
    let step = (end_radians - start_radians) / steps as f64;
    (0..=steps)
        .map(|i| {
            let angle = start_radians + step * i as f64;
            Position::new(center.x + radius * angle.cos(), center.y + radius * angle.sin())
        })
        .collect()
}

pub fn disk(center: Position, radius: f64) -> Polygon {
    let vertices = (0..CIRCLE_SEGMENTS)
        .map(|i| {
            let angle = TAU * i as f64 / CIRCLE_SEGMENTS as f64;
            Position::new(center.x + radius * angle.cos(), center.y + radius * angle.sin())
        })
        .collect();
    Polygon::from_exterior(vertices)
}

/// A disk with a concentric hole; a hole that is not smaller than the disk yields nothing.
pub fn annulus(center: Position, outer_radius: f64, inner_radius: f64) -> Option<Polygon> {
    if inner_radius <= 0.0 {
        return Some(disk(center, outer_radius));
    }
    if inner_radius >= outer_radius {
        return None;
    }
    let hole = disk(center, inner_radius).exterior;
    Some(Polygon::new(disk(center, outer_radius).exterior, vec![hole]))
}

pub fn rectangle(bounds: &BoundingBox) -> Polygon {
    Polygon::from_exterior(bounds.vertices())
}

/// Stadium inscribed in `bounds`: the radius is half the shorter side and the straight edges run along the longer one.
pub fn stadium(bounds: &BoundingBox) -> Polygon {
    let center = bounds.center();
    let (width, height) = (bounds.width(), bounds.height());
    let radius = width.min(height) / 2.0;

    if width > height {
        let half = width / 2.0 - radius;
        capsule(
            Position::new(center.x - half, center.y),
            Position::new(center.x + half, center.y),
            height,
        )
    } else if height > width {
        let half = height / 2.0 - radius;
        capsule(
            Position::new(center.x, center.y - half),
            Position::new(center.x, center.y + half),
            width,
        )
    } else {
        disk(center, radius)
    }
}

/// A stroke of `width` from `start` to `end` with round caps.
///
/// A zero-length stroke is a disk.
pub fn capsule(start: Position, end: Position, width: f64) -> Polygon {
    let radius = width / 2.0;
    let delta = end - start;
    if delta.norm() < f64::EPSILON {
        return disk(start, radius);
    }

    let direction = delta.y.atan2(delta.x);
    let half = CIRCLE_SEGMENTS / 2;

    let mut vertices = arc_points(end, radius, direction - FRAC_PI_2, direction + FRAC_PI_2, half);
    vertices.extend(arc_points(start, radius, direction + FRAC_PI_2, direction + FRAC_PI_2 + PI, half));

    Polygon::from_exterior(vertices)
}

/// Union of capsules along consecutive points.
pub fn thick_polyline(points: &[Position], width: f64) -> Result<Region, GeometryError> {
    let capsules: Vec<Region> = match points {
        [] => vec![],
        [single] => vec![Region::from_polygon(disk(*single, width / 2.0))],
        _ => points
            .windows(2)
            .map(|pair| Region::from_polygon(capsule(pair[0], pair[1], width)))
            .collect(),
    };

    union_all(&capsules)
}

#[cfg(test)]
mod tests {
    use nalgebra::Point2;
    use rstest::rstest;

    use super::*;

    const POLYGON_TOLERANCE: f64 = 0.01;

    #[test]
    fn test_disk_area_close_to_circle() {
        // given
        let radius: f64 = 2.0;

        // when
        let polygon = disk(Position::new(1.0, 1.0), radius);

        // then
        let expected = PI * radius * radius;
        assert!((polygon.area() - expected).abs() / expected < POLYGON_TOLERANCE);
        assert_eq!(polygon.exterior.len(), CIRCLE_SEGMENTS);
    }

    #[test]
    fn test_annulus_area() {
        // when
        let polygon = annulus(Position::origin(), 1.0, 0.5).unwrap();

        // then
        let expected = PI * (1.0 - 0.25);
        assert_eq!(polygon.holes.len(), 1);
        assert!((polygon.area() - expected).abs() / expected < POLYGON_TOLERANCE);
    }

    #[test]
    fn test_annulus_with_oversized_hole() {
        assert!(annulus(Position::origin(), 1.0, 1.0).is_none());
    }

    #[rstest]
    #[case(4.0, 2.0)]
    #[case(2.0, 4.0)]
    #[case(3.0, 3.0)]
    fn test_stadium_is_inscribed(#[case] width: f64, #[case] height: f64) {
        // given
        let bounds = BoundingBox::new(Point2::new(1.0, 1.0), Point2::new(1.0 + width, 1.0 + height));

        // when
        let polygon = stadium(&bounds);

        // then
        let result = polygon.bounding_box();
        assert!(bounds.contains(&result, 1e-9));
        assert!((result.width() - width).abs() < 1e-3);
        assert!((result.height() - height).abs() < 1e-3);

        let radius = width.min(height) / 2.0;
        let expected = width * height - (4.0 - PI) * radius * radius;
        assert!((polygon.area() - expected).abs() / expected < POLYGON_TOLERANCE);
    }

    #[test]
    fn test_capsule_area() {
        // given
        let start = Position::new(0.0, 0.0);
        let end = Position::new(10.0, 0.0);

        // when
        let polygon = capsule(start, end, 1.0);

        // then
        let expected = 10.0 + PI * 0.25;
        assert!((polygon.area() - expected).abs() / expected < POLYGON_TOLERANCE);
        assert!(polygon.is_simple());
    }

    #[test]
    fn test_zero_length_capsule_is_disk() {
        let polygon = capsule(Position::new(2.0, 2.0), Position::new(2.0, 2.0), 1.0);

        assert_eq!(polygon.exterior.len(), CIRCLE_SEGMENTS);
    }

    #[test]
    fn test_thick_polyline_is_one_part() {
        // given
        let points = vec![
            Position::new(0.0, 0.0),
            Position::new(5.0, 0.0),
            Position::new(5.0, 5.0),
        ];

        // when
        let region = thick_polyline(&points, 0.5).unwrap();

        // then
        assert_eq!(region.part_count(), 1);
        let bbox = region.bounding_box();
        assert!((bbox.min.x - -0.25).abs() < 1e-3);
        assert!((bbox.max.y - 5.25).abs() < 1e-3);
    }

    #[test]
    fn test_arc_points_include_both_ends() {
        let points = arc_points(Position::origin(), 1.0, 0.0, FRAC_PI_2, 4);

        assert_eq!(points.len(), 5);
        assert!((points[4].x - 0.0).abs() < 1e-12);
        assert!((points[4].y - 1.0).abs() < 1e-12);
    }
}

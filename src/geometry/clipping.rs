//! Boolean operations on regions.
//!
//! All operations run on an integer grid of 1/1000 mm using the non-zero fill rule. Results are rebuilt into
//! oriented polygons, holes are assigned to the innermost exterior that contains them.

use clipper2::{difference as clip_difference, intersect as clip_intersect, union as clip_union, FillRule, Milli};
use log::{debug, trace};
use thiserror::Error;

use super::region::{ring_contains_point, Polygon, Region};
use super::BoundingBox;
use crate::spacial::ToTuple2;
use crate::types::signed_area;
use crate::Position;

/// Rings with an absolute area below this (mm²) are considered slivers and dropped.
const SLIVER_AREA: f64 = 1e-9;

/// Slack for bounding box containment, rings of a boolean result may share edges with their container.
const CONTAINMENT_EPSILON: f64 = 1e-9;

type Paths = Vec<Vec<(f64, f64)>>;

#[derive(Error, Debug)]
pub enum GeometryError {
    #[error("Boolean operation failed: {0}")]
    BooleanOperation(String),
}

fn ring_to_path(ring: &[Position]) -> Vec<(f64, f64)> {
    ring.iter()
        .map(|position| position.to_tuple())
        .collect()
}

fn region_to_paths(region: &Region) -> Paths {
    region
        .polygons
        .iter()
        .flat_map(|polygon| polygon.rings().map(|ring| ring_to_path(ring)))
        .collect()
}

/// Union of every polygon of every region.
#[profiling::function]
pub fn union_all(regions: &[Region]) -> Result<Region, GeometryError> {
    let subject: Paths = regions
        .iter()
        .flat_map(region_to_paths)
        .collect();

    if subject.is_empty() {
        return Ok(Region::empty());
    }

    trace!("union of {} paths", subject.len());

    let result = clip_union::<Milli>(subject, Paths::new(), FillRule::NonZero)
        .map_err(|error| GeometryError::BooleanOperation(format!("{:?}", error)))?;

    Ok(paths_to_region(result.into()))
}

pub fn union(a: &Region, b: &Region) -> Result<Region, GeometryError> {
    union_all(&[a.clone(), b.clone()])
}

/// `subject` minus `clip`.
#[profiling::function]
pub fn difference(subject: &Region, clip: &Region) -> Result<Region, GeometryError> {
    if subject.is_empty() {
        return Ok(Region::empty());
    }
    if clip.is_empty() {
        return union_all(std::slice::from_ref(subject));
    }

    let result = clip_difference::<Milli>(region_to_paths(subject), region_to_paths(clip), FillRule::NonZero)
        .map_err(|error| GeometryError::BooleanOperation(format!("{:?}", error)))?;

    Ok(paths_to_region(result.into()))
}

pub fn intersection(a: &Region, b: &Region) -> Result<Region, GeometryError> {
    if a.is_empty() || b.is_empty() {
        return Ok(Region::empty());
    }

    let result = clip_intersect::<Milli>(region_to_paths(a), region_to_paths(b), FillRule::NonZero)
        .map_err(|error| GeometryError::BooleanOperation(format!("{:?}", error)))?;

    Ok(paths_to_region(result.into()))
}

/// Zero-width union of raw rings, turning self-intersecting or badly wound input into valid polygons.
///
/// Rings are used as given, without re-orientation, so a figure-eight ring yields both of its lobes.
pub fn repair(rings: &[Vec<Position>]) -> Result<Region, GeometryError> {
    let subject: Paths = rings
        .iter()
        .filter(|ring| ring.len() >= 3)
        .map(|ring| ring_to_path(ring))
        .collect();

    if subject.is_empty() {
        return Ok(Region::empty());
    }

    let result = clip_union::<Milli>(subject, Paths::new(), FillRule::NonZero)
        .map_err(|error| GeometryError::BooleanOperation(format!("{:?}", error)))?;

    let region = paths_to_region(result.into());
    debug!("repaired {} ring(s) into {} polygon(s)", rings.len(), region.part_count());
    Ok(region)
}

/// `true` when most of `inner`'s vertices lie inside `outer`.
///
/// Rings from a boolean result never cross, but they may touch at single vertices.
fn ring_inside(inner: &[Position], outer: &[Position]) -> bool {
    let inside = inner
        .iter()
        .filter(|position| ring_contains_point(outer, **position))
        .count();
    inside * 2 > inner.len()
}

/// Rebuilds polygons from a flat list of boolean-result rings.
///
/// A ring nested inside an even number of other rings is an exterior, an odd number makes it a hole of the
/// smallest ring one level up.
pub fn paths_to_region(paths: Paths) -> Region {
    let rings: Vec<Vec<Position>> = paths
        .into_iter()
        .map(|path| {
            path.into_iter()
                .map(|(x, y)| Position::new(x, y))
                .collect::<Vec<_>>()
        })
        .filter(|ring| ring.len() >= 3 && signed_area(ring).abs() > SLIVER_AREA)
        .collect();

    let areas: Vec<f64> = rings
        .iter()
        .map(|ring| signed_area(ring).abs())
        .collect();
    let bounds: Vec<BoundingBox> = rings
        .iter()
        .map(|ring| BoundingBox::from_points(ring))
        .collect();

    // containers[i] = indices of rings that contain ring i
    let containers: Vec<Vec<usize>> = (0..rings.len())
        .map(|i| {
            (0..rings.len())
                .filter(|&j| {
                    j != i
                        && areas[j] > areas[i]
                        && bounds[j].contains(&bounds[i], CONTAINMENT_EPSILON)
                        && ring_inside(&rings[i], &rings[j])
                })
                .collect()
        })
        .collect();

    let mut exteriors: Vec<(usize, Vec<Vec<Position>>)> = vec![];
    let mut holes: Vec<usize> = vec![];
    for (index, container) in containers.iter().enumerate() {
        if container.len() % 2 == 0 {
            exteriors.push((index, vec![]));
        } else {
            holes.push(index);
        }
    }

    for hole in holes {
        let depth = containers[hole].len();
        let parent = containers[hole]
            .iter()
            .copied()
            .filter(|candidate| containers[*candidate].len() == depth - 1)
            .min_by(|a, b| areas[*a].total_cmp(&areas[*b]));

        match parent.and_then(|parent| exteriors.iter_mut().find(|(index, _)| *index == parent)) {
            Some((_, exterior_holes)) => exterior_holes.push(rings[hole].clone()),
            None => trace!("hole {} has no exterior, dropped", hole),
        }
    }

    Region::from_polygons(
        exteriors
            .into_iter()
            .map(|(index, holes)| Polygon::new(rings[index].clone(), holes))
            .collect(),
    )
}

//! Reconstruction of fabrication primitives as planar regions in millimetres.
//!
//! Every primitive is interpreted on its own. A malformed primitive is logged and contributes nothing; it never
//! aborts the layer it belongs to.

use log::{debug, trace, warn};

use crate::config::ImportOptions;
use crate::geometry::clipping::{difference, repair, union, union_all};
use crate::geometry::shapes::{annulus, capsule, disk, rectangle, stadium, thick_polyline};
use crate::geometry::{BoundingBox, GeometryError, Region};
use crate::primitive::{
    AmGroupPrimitive, ArcPrimitive, CirclePrimitive, FabPrimitive, LinePrimitive, ObroundPrimitive, OutlinePrimitive,
    RectanglePrimitive, RegionPrimitive, WithBoundingBox,
};
use crate::types::Exposure;
use crate::{Position, Vector};

/// Steps used to sample an arc before it is thickened.
pub const ARC_STEPS: usize = 48;

/// Deepest macro group nesting that is expanded.
pub const MAX_GROUP_DEPTH: usize = 16;

/// Stroke width of outline previews, mm.
pub const OUTLINE_STROKE_WIDTH: f64 = 0.05;

/// Interprets one primitive. `unit_scale` converts the primitive's units to millimetres.
pub fn primitive_to_region(primitive: &FabPrimitive, unit_scale: f64, options: &ImportOptions) -> Region {
    let interpreter = Interpreter {
        unit_scale,
        options,
    };

    interpreter
        .interpret(primitive, 0)
        .unwrap_or_else(|error| {
            warn!("Skipping {} primitive, cause: {}", primitive.kind(), error);
            Region::empty()
        })
}

struct Interpreter<'a> {
    unit_scale: f64,
    options: &'a ImportOptions,
}

fn usable(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

impl Interpreter<'_> {
    fn position(&self, position: Position) -> Position {
        position * self.unit_scale
    }

    /// A scaled width, falling back to the default trace width.
    fn stroke_width(&self, width: Option<f64>) -> f64 {
        width
            .map(|width| width * self.unit_scale)
            .filter(|width| usable(*width))
            .unwrap_or(self.options.default_trace_width)
    }

    fn interpret(&self, primitive: &FabPrimitive, depth: usize) -> Result<Region, GeometryError> {
        match primitive {
            FabPrimitive::Circle(circle) => Ok(self.circle(circle)),
            FabPrimitive::Rectangle(rectangle) => self.rectangle(rectangle),
            FabPrimitive::Obround(obround) => self.obround(obround),
            FabPrimitive::Line(line) => Ok(self.line(line)),
            FabPrimitive::Arc(arc) => self.arc(arc),
            FabPrimitive::Region(region) => self.region(region),
            FabPrimitive::AmGroup(group) => self.group(group, depth),
            FabPrimitive::Outline(outline) => self.outline(outline),
            FabPrimitive::Unsupported {
                kind,
            } => {
                trace!("Ignoring unsupported primitive: {}", kind);
                Ok(Region::empty())
            }
        }
    }

    fn circle(&self, circle: &CirclePrimitive) -> Region {
        if !circle.flashed {
            trace!("Ignoring unflashed circle at {:?}", circle.center);
            return Region::empty();
        }

        let radius = circle.diameter * self.unit_scale / 2.0;
        if !usable(radius) {
            debug!("Ignoring circle with diameter {}", circle.diameter);
            return Region::empty();
        }
        let hole_radius = circle
            .hole_diameter
            .map(|diameter| diameter * self.unit_scale / 2.0)
            .filter(|radius| usable(*radius))
            .unwrap_or(0.0);

        match annulus(self.position(circle.center), radius, hole_radius) {
            Some(polygon) => Region::from_polygon(polygon),
            None => {
                debug!("Circle hole covers the whole circle, center: {:?}", circle.center);
                Region::empty()
            }
        }
    }

    /// Scaled pad bounds, or the default pad size about the center when the primitive has none.
    fn pad_bounds(&self, primitive_bounds: Option<BoundingBox>, center: Position) -> BoundingBox {
        match primitive_bounds {
            Some(bounds) => BoundingBox::new(self.position(bounds.min), self.position(bounds.max)),
            None => {
                let center = self.position(center);
                let half = Vector::new(self.options.default_pad_size, self.options.default_pad_size) / 2.0;
                debug!("Pad without usable size at {:?}, using the default pad size", center);
                BoundingBox::new(center - half, center + half)
            }
        }
    }

    /// Subtracts the hole then rotates about the pad center.
    fn finish_pad(
        &self,
        shape: Region,
        center: Position,
        hole_diameter: Option<f64>,
        rotation: f64,
    ) -> Result<Region, GeometryError> {
        let hole_radius = hole_diameter
            .map(|diameter| diameter * self.unit_scale / 2.0)
            .filter(|radius| usable(*radius));

        let shape = match hole_radius {
            Some(radius) => difference(&shape, &Region::from_polygon(disk(center, radius)))?,
            None => shape,
        };

        Ok(match rotation != 0.0 {
            true => shape.rotate(rotation.to_radians(), center),
            false => shape,
        })
    }

    fn rectangle(&self, primitive: &RectanglePrimitive) -> Result<Region, GeometryError> {
        if !primitive.flashed {
            trace!("Ignoring unflashed rectangle at {:?}", primitive.center);
            return Ok(Region::empty());
        }

        let bounds = self.pad_bounds(primitive.bounding_box(), primitive.center);
        let shape = Region::from_polygon(rectangle(&bounds));

        self.finish_pad(shape, bounds.center(), primitive.hole_diameter, primitive.rotation)
    }

    fn obround(&self, obround: &ObroundPrimitive) -> Result<Region, GeometryError> {
        let bounds = self.pad_bounds(obround.bounding_box(), obround.center);
        let shape = Region::from_polygon(stadium(&bounds));

        self.finish_pad(shape, bounds.center(), obround.hole_diameter, obround.rotation)
    }

    fn line(&self, line: &LinePrimitive) -> Region {
        let width = self.stroke_width(line.width);

        Region::from_polygon(capsule(self.position(line.start), self.position(line.end), width))
    }

    fn arc(&self, arc: &ArcPrimitive) -> Result<Region, GeometryError> {
        if !usable(arc.radius) {
            debug!("Ignoring arc with radius {}", arc.radius);
            return Ok(Region::empty());
        }
        let width = self.stroke_width(arc.width);

        let points: Vec<Position> = arc
            .points(ARC_STEPS)
            .into_iter()
            .map(|point| self.position(point))
            .collect();

        thick_polyline(&points, width)
    }

    fn region(&self, region: &RegionPrimitive) -> Result<Region, GeometryError> {
        let rings: Vec<Vec<Position>> = region
            .contours
            .iter()
            .filter(|contour| contour.len() >= 3)
            .map(|contour| {
                contour
                    .iter()
                    .map(|point| self.position(*point))
                    .collect()
            })
            .collect();

        if rings.is_empty() {
            debug!("Ignoring region without a contour of 3 or more vertices");
            return Ok(Region::empty());
        }

        let repaired = repair(&rings)?;
        if repaired.is_empty() {
            warn!("Region is empty after repair, dropping it");
        }
        Ok(repaired)
    }

    fn group(&self, group: &AmGroupPrimitive, depth: usize) -> Result<Region, GeometryError> {
        if depth >= MAX_GROUP_DEPTH {
            warn!("Macro group nesting exceeds {} levels, skipping", MAX_GROUP_DEPTH);
            return Ok(Region::empty());
        }

        let mut result = Region::empty();
        for member in &group.members {
            let shape = match self.interpret(&member.primitive, depth + 1) {
                Ok(shape) => shape,
                Err(error) => {
                    warn!("Skipping macro member {}, cause: {}", member.primitive.kind(), error);
                    continue;
                }
            };
            if shape.is_empty() {
                continue;
            }

            result = match member.exposure {
                Exposure::Add => union(&result, &shape)?,
                Exposure::CutOut => difference(&result, &shape)?,
            };
        }

        Ok(result)
    }

    fn outline(&self, outline: &OutlinePrimitive) -> Result<Region, GeometryError> {
        let strokes: Vec<Region> = outline
            .primitives
            .iter()
            .filter_map(|primitive| match primitive {
                FabPrimitive::Line(line) => Some(Region::from_polygon(capsule(
                    self.position(line.start),
                    self.position(line.end),
                    OUTLINE_STROKE_WIDTH,
                ))),
                _ => None,
            })
            .collect();

        union_all(&strokes)
    }
}

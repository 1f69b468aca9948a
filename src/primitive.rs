//! Fabrication primitives, in the units of the layer they were read from.

use nalgebra::Point2;

use crate::geometry::shapes::arc_points;
use crate::geometry::BoundingBox;
use crate::types::Exposure;
use crate::{Position, Vector};

#[derive(Debug, Clone, PartialEq)]
pub enum FabPrimitive {
    Circle(CirclePrimitive),
    Rectangle(RectanglePrimitive),
    Obround(ObroundPrimitive),
    Line(LinePrimitive),
    Arc(ArcPrimitive),
    Region(RegionPrimitive),
    AmGroup(AmGroupPrimitive),
    Outline(OutlinePrimitive),
    /// Anything without a planar interpretation, e.g. thermal or moiré macro primitives.
    Unsupported {
        kind: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct CirclePrimitive {
    pub center: Position,
    pub diameter: f64,
    pub hole_diameter: Option<f64>,
    /// Only flashed circles are pads; an unflashed circle contributes nothing.
    pub flashed: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RectanglePrimitive {
    pub center: Position,
    pub width: f64,
    pub height: f64,
    /// Degrees, counter-clockwise about `center`.
    pub rotation: f64,
    pub hole_diameter: Option<f64>,
    pub flashed: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObroundPrimitive {
    pub center: Position,
    pub width: f64,
    pub height: f64,
    /// Degrees, counter-clockwise about `center`.
    pub rotation: f64,
    pub hole_diameter: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LinePrimitive {
    pub start: Position,
    pub end: Position,
    pub width: Option<f64>,
}

/// A counter-clockwise arc from `start_angle` to `end_angle`, both in degrees.
///
/// An `end_angle` below `start_angle` wraps past 360°.
#[derive(Debug, Clone, PartialEq)]
pub struct ArcPrimitive {
    pub center: Position,
    pub radius: f64,
    pub start_angle: f64,
    pub end_angle: f64,
    pub width: Option<f64>,
}

impl ArcPrimitive {
    /// `steps` segments from the start angle to the (wrapped) end angle.
    pub fn points(&self, steps: usize) -> Vec<Position> {
        let start = self.start_angle;
        let mut end = self.end_angle;
        if end < start {
            end += 360.0;
        }
        arc_points(self.center, self.radius, start.to_radians(), end.to_radians(), steps)
    }
}

/// A filled area bounded by one or more contours.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionPrimitive {
    pub contours: Vec<Vec<Position>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MacroMember {
    pub exposure: Exposure,
    pub primitive: FabPrimitive,
}

/// The primitives of one aperture macro flash. Cut-out members clear the members before them.
#[derive(Debug, Clone, PartialEq)]
pub struct AmGroupPrimitive {
    pub members: Vec<MacroMember>,
}

/// Preview geometry; only straight lines are drawn.
#[derive(Debug, Clone, PartialEq)]
pub struct OutlinePrimitive {
    pub primitives: Vec<FabPrimitive>,
}

impl FabPrimitive {
    pub fn kind(&self) -> &str {
        match self {
            FabPrimitive::Circle(_) => "Circle",
            FabPrimitive::Rectangle(_) => "Rectangle",
            FabPrimitive::Obround(_) => "Obround",
            FabPrimitive::Line(_) => "Line",
            FabPrimitive::Arc(_) => "Arc",
            FabPrimitive::Region(_) => "Region",
            FabPrimitive::AmGroup(_) => "AMGroup",
            FabPrimitive::Outline(_) => "Outline",
            FabPrimitive::Unsupported {
                kind,
            } => kind,
        }
    }

    /// A copy moved by `offset`.
    pub fn translated(&self, offset: Vector) -> FabPrimitive {
        match self {
            FabPrimitive::Circle(circle) => FabPrimitive::Circle(CirclePrimitive {
                center: circle.center + offset,
                ..circle.clone()
            }),
            FabPrimitive::Rectangle(rectangle) => FabPrimitive::Rectangle(RectanglePrimitive {
                center: rectangle.center + offset,
                ..rectangle.clone()
            }),
            FabPrimitive::Obround(obround) => FabPrimitive::Obround(ObroundPrimitive {
                center: obround.center + offset,
                ..obround.clone()
            }),
            FabPrimitive::Line(line) => FabPrimitive::Line(LinePrimitive {
                start: line.start + offset,
                end: line.end + offset,
                width: line.width,
            }),
            FabPrimitive::Arc(arc) => FabPrimitive::Arc(ArcPrimitive {
                center: arc.center + offset,
                ..arc.clone()
            }),
            FabPrimitive::Region(region) => FabPrimitive::Region(RegionPrimitive {
                contours: region
                    .contours
                    .iter()
                    .map(|contour| {
                        contour
                            .iter()
                            .map(|position| position + offset)
                            .collect()
                    })
                    .collect(),
            }),
            FabPrimitive::AmGroup(group) => FabPrimitive::AmGroup(AmGroupPrimitive {
                members: group
                    .members
                    .iter()
                    .map(|member| MacroMember {
                        exposure: member.exposure,
                        primitive: member.primitive.translated(offset),
                    })
                    .collect(),
            }),
            FabPrimitive::Outline(outline) => FabPrimitive::Outline(OutlinePrimitive {
                primitives: outline
                    .primitives
                    .iter()
                    .map(|primitive| primitive.translated(offset))
                    .collect(),
            }),
            FabPrimitive::Unsupported {
                kind,
            } => FabPrimitive::Unsupported {
                kind: kind.clone(),
            },
        }
    }
}

/// Bounds of a primitive, `None` when its dimensions are unusable (non-finite or non-positive).
pub trait WithBoundingBox {
    fn bounding_box(&self) -> Option<BoundingBox>;
}

fn usable(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

fn centered_box(center: Position, width: f64, height: f64) -> Option<BoundingBox> {
    if !usable(width) || !usable(height) || !center.x.is_finite() || !center.y.is_finite() {
        return None;
    }
    Some(BoundingBox::new(
        Point2::new(center.x - width / 2.0, center.y - height / 2.0),
        Point2::new(center.x + width / 2.0, center.y + height / 2.0),
    ))
}

impl WithBoundingBox for CirclePrimitive {
    fn bounding_box(&self) -> Option<BoundingBox> {
        centered_box(self.center, self.diameter, self.diameter)
    }
}

/// Unrotated bounds; rotation is applied to the built shape.
impl WithBoundingBox for RectanglePrimitive {
    fn bounding_box(&self) -> Option<BoundingBox> {
        centered_box(self.center, self.width, self.height)
    }
}

impl WithBoundingBox for ObroundPrimitive {
    fn bounding_box(&self) -> Option<BoundingBox> {
        centered_box(self.center, self.width, self.height)
    }
}

impl WithBoundingBox for LinePrimitive {
    fn bounding_box(&self) -> Option<BoundingBox> {
        let radius = self.width.unwrap_or(0.0).max(0.0) / 2.0;
        let mut bbox = BoundingBox::from_points(&[self.start, self.end]);
        bbox.min -= Vector::new(radius, radius);
        bbox.max += Vector::new(radius, radius);
        Some(bbox)
    }
}

impl WithBoundingBox for ArcPrimitive {
    fn bounding_box(&self) -> Option<BoundingBox> {
        // the whole circle; tight enough for layer extents
        let extent = self.radius + self.width.unwrap_or(0.0).max(0.0) / 2.0;
        centered_box(self.center, extent * 2.0, extent * 2.0)
    }
}

impl WithBoundingBox for RegionPrimitive {
    fn bounding_box(&self) -> Option<BoundingBox> {
        let points: Vec<Position> = self
            .contours
            .iter()
            .flatten()
            .copied()
            .collect();
        match points.is_empty() {
            true => None,
            false => Some(BoundingBox::from_points(&points)),
        }
    }
}

fn combined(primitives: impl Iterator<Item = Option<BoundingBox>>) -> Option<BoundingBox> {
    let mut bbox = BoundingBox::default();
    for primitive_bbox in primitives.flatten() {
        bbox.expand(&primitive_bbox);
    }
    match bbox.is_empty() {
        true => None,
        false => Some(bbox),
    }
}

impl WithBoundingBox for AmGroupPrimitive {
    fn bounding_box(&self) -> Option<BoundingBox> {
        combined(
            self.members
                .iter()
                .filter(|member| member.exposure == Exposure::Add)
                .map(|member| member.primitive.bounding_box()),
        )
    }
}

impl WithBoundingBox for OutlinePrimitive {
    fn bounding_box(&self) -> Option<BoundingBox> {
        combined(
            self.primitives
                .iter()
                .map(WithBoundingBox::bounding_box),
        )
    }
}

impl WithBoundingBox for FabPrimitive {
    fn bounding_box(&self) -> Option<BoundingBox> {
        match self {
            FabPrimitive::Circle(primitive) => primitive.bounding_box(),
            FabPrimitive::Rectangle(primitive) => primitive.bounding_box(),
            FabPrimitive::Obround(primitive) => primitive.bounding_box(),
            FabPrimitive::Line(primitive) => primitive.bounding_box(),
            FabPrimitive::Arc(primitive) => primitive.bounding_box(),
            FabPrimitive::Region(primitive) => primitive.bounding_box(),
            FabPrimitive::AmGroup(primitive) => primitive.bounding_box(),
            FabPrimitive::Outline(primitive) => primitive.bounding_box(),
            FabPrimitive::Unsupported {
                ..
            } => None,
        }
    }
}

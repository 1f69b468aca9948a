use crate::Position;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Winding {
    Clockwise,
    /// Positive signed area
    CounterClockwise,
}

impl Winding {
    /// Winding of a ring in a y-up coordinate system.
    pub fn from_vertices(vertices: &[Position]) -> Self {
        if signed_area(vertices) < 0.0 {
            Winding::Clockwise
        } else {
            Winding::CounterClockwise
        }
    }
}

/// Shoelace area; positive for counter-clockwise rings.
pub fn signed_area(vertices: &[Position]) -> f64 {
    let mut sum = 0.0;
    for i in 0..vertices.len() {
        let j = (i + 1) % vertices.len();
        sum += vertices[i].x * vertices[j].y - vertices[j].x * vertices[i].y;
    }
    sum / 2.0
}

/// Polarity of a macro sub-primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Exposure {
    CutOut,
    Add,
}

impl From<bool> for Exposure {
    fn from(value: bool) -> Self {
        match value {
            true => Exposure::Add,
            false => Exposure::CutOut,
        }
    }
}

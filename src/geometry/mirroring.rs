/// Axis flags for a mirror through the origin; `x` negates x coordinates, `y` negates y coordinates.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Mirroring {
    pub x: bool,
    pub y: bool,
}

impl Mirroring {
    /// Mirror through the origin on both axes.
    pub const BOTH: Mirroring = Mirroring {
        x: true,
        y: true,
    };

    pub fn as_f64(&self) -> [f64; 2] {
        [if self.x { -1.0 } else { 1.0 }, if self.y { -1.0 } else { 1.0 }]
    }
}

impl From<[bool; 2]> for Mirroring {
    fn from(value: [bool; 2]) -> Self {
        Self {
            x: value[0],
            y: value[1],
        }
    }
}

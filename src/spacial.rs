pub type Vector = nalgebra::Vector2<f64>;
pub type Position = nalgebra::Point2<f64>;

pub trait ToVector {
    fn to_vector(self) -> Vector;
}

impl ToVector for Position {
    fn to_vector(self) -> Vector {
        Vector::new(self.x, self.y)
    }
}

/// Conversion into the `(x, y)` tuples used by the clipping backend.
pub trait ToTuple2 {
    fn to_tuple(self) -> (f64, f64);
}

impl ToTuple2 for Position {
    fn to_tuple(self) -> (f64, f64) {
        (self.x, self.y)
    }
}

/// Rotate a position about `origin` by `radians`, counter-clockwise in a y-up system.
pub fn rotate_about(position: Position, origin: Position, radians: f64) -> Position {
    let (sin_theta, cos_theta) = radians.sin_cos();
    let x = position.x - origin.x;
    let y = position.y - origin.y;

    Position::new(
        x * cos_theta - y * sin_theta + origin.x,
        x * sin_theta + y * cos_theta + origin.y,
    )
}

pub mod deduplicate {
    use crate::Position;

    pub trait DedupEpsilon {
        /// Removes vertices that coincide with their predecessor, including a trailing vertex that repeats the
        /// first one (closed ring notation).
        fn dedup_with_epsilon(self, epsilon: f64) -> Self;
    }

    fn coincident(a: &Position, b: &Position, epsilon: f64) -> bool {
        (a.x - b.x).abs() < epsilon && (a.y - b.y).abs() < epsilon
    }

    impl DedupEpsilon for Vec<Position> {
        fn dedup_with_epsilon(mut self, epsilon: f64) -> Self {
            if self.len() < 2 {
                return self;
            }

            self.dedup_by(|b, a| coincident(a, b, epsilon));

            while self.len() > 1 && coincident(&self[0], &self[self.len() - 1], epsilon) {
                self.pop();
            }

            self
        }
    }

}

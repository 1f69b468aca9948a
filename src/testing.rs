use std::io::BufWriter;

use gerber_types::{Command, GerberCode};

pub fn dump_gerber_source(commands: &[Command]) {
    let gerber_source = gerber_commands_to_source(commands);

    println!("Gerber source:\n{}", gerber_source);
}

pub fn gerber_commands_to_source(commands: &[Command]) -> String {
    let mut buf = BufWriter::new(Vec::new());
    for command in commands {
        command
            .serialize(&mut buf)
            .expect("Could not generate Gerber code");
    }
    let bytes = buf.into_inner().unwrap();
    String::from_utf8(bytes).unwrap()
}

pub mod gerber {
    use gerber_types::{
        Aperture, ApertureDefinition, Circle, Command, CoordinateFormat, CoordinateNumber, Coordinates, DCode,
        ExtendedCode, Operation, Unit,
    };

    pub fn format() -> CoordinateFormat {
        CoordinateFormat::new(2, 4)
    }

    pub fn coordinates(x: f64, y: f64) -> Coordinates {
        Coordinates::new(
            CoordinateNumber::try_from(x).unwrap(),
            CoordinateNumber::try_from(y).unwrap(),
            format(),
        )
    }

    /// A layer of round pads, all flashed with aperture D10.
    pub fn pad_layer_commands(unit: Unit, pads: &[(f64, f64)], diameter: f64) -> Vec<Command> {
        let mut commands = vec![
            Command::ExtendedCode(ExtendedCode::CoordinateFormat(format())),
            Command::ExtendedCode(ExtendedCode::Unit(unit)),
            Command::ExtendedCode(ExtendedCode::ApertureDefinition(ApertureDefinition::new(
                10,
                Aperture::Circle(Circle::new(diameter)),
            ))),
            DCode::SelectAperture(10).into(),
        ];
        for (x, y) in pads {
            commands.push(DCode::Operation(Operation::Flash(coordinates(*x, *y))).into());
        }
        commands
    }

    /// A single straight track, drawn with a round aperture D10.
    pub fn track_layer_commands(unit: Unit, start: (f64, f64), end: (f64, f64), width: f64) -> Vec<Command> {
        vec![
            Command::ExtendedCode(ExtendedCode::CoordinateFormat(format())),
            Command::ExtendedCode(ExtendedCode::Unit(unit)),
            Command::ExtendedCode(ExtendedCode::ApertureDefinition(ApertureDefinition::new(
                10,
                Aperture::Circle(Circle::new(width)),
            ))),
            DCode::SelectAperture(10).into(),
            DCode::Operation(Operation::Move(coordinates(start.0, start.1))).into(),
            DCode::Operation(Operation::Interpolate(coordinates(end.0, end.1), None)).into(),
        ]
    }
}

pub mod geometry {
    use std::f64::consts::PI;

    use crate::geometry::{Polygon, Region};
    use crate::Position;

    /// generate star points, starting with the point at the top of the star, alternating between outer and inner
    /// radius, counter-clockwise
    pub fn calculate_star_points(outer_radius: f64, inner_radius: f64, center: Position) -> Vec<Position> {
        let angle_step = (2.0 * PI) / 10.0; // 36 degrees in radians

        (0..10)
            .map(|i| {
                let radius = if i % 2 == 0 { outer_radius } else { inner_radius };
                let angle = angle_step * i as f64 + PI / 2.0;

                Position::new(center.x + radius * angle.cos(), center.y + radius * angle.sin())
            })
            .collect()
    }

    /// A five-pointed star motif.
    pub fn star_region(outer_radius: f64, inner_radius: f64, center: Position) -> Region {
        Region::from_polygon(Polygon::from_exterior(calculate_star_points(
            outer_radius,
            inner_radius,
            center,
        )))
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn star_points() {
            // when
            let points = calculate_star_points(1.0, 0.5, Position::origin());

            // then
            assert_eq!(points.len(), 10);
            assert!((points[0] - Position::new(0.0, 1.0)).norm() < 1e-12);
            assert!((points[5] - Position::new(0.0, -0.5)).norm() < 1e-12);
            // the second point is left of the top one
            assert!(points[1].x < 0.0);
        }

        #[test]
        fn star_region_area() {
            // given
            let (outer, inner) = (2.0, 1.0);
            // ten triangles between consecutive outer and inner points
            let expected = 10.0 * 0.5 * outer * inner * (PI / 5.0).sin();

            // when
            let region = star_region(outer, inner, Position::new(5.0, 5.0));

            // then
            assert_eq!(region.part_count(), 1);
            assert!((region.area() - expected).abs() < 1e-9);
        }
    }
}

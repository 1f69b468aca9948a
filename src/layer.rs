use std::collections::{HashMap, HashSet};
use std::io::{BufReader, Read};
use std::ops::Range;

use gerber_types::{
    Aperture, ApertureBlock, ApertureDefinition, ApertureMacro, Circle, Command, CoordinateOffset, Coordinates, DCode,
    ExtendedCode, FunctionCode, GCode, InterpolationMode, MacroContent, MacroDecimal, Operation, QuadrantMode,
    StepAndRepeat, Unit, VariableDefinition,
};
use log::{debug, error, info, trace, warn};
use nalgebra::{Point2, Vector2};
use thiserror::Error;

use crate::expressions::{
    evaluate_expression, macro_boolean_to_bool, macro_decimal_pair_to_f64, macro_decimal_to_f64, macro_integer_to_u32,
    ExpressionEvaluationError, MacroContext,
};
use crate::geometry::shapes::CIRCLE_SEGMENTS;
use crate::geometry::BoundingBox;
use crate::primitive::{
    AmGroupPrimitive, ArcPrimitive, CirclePrimitive, FabPrimitive, LinePrimitive, MacroMember, ObroundPrimitive,
    OutlinePrimitive, RectanglePrimitive, RegionPrimitive, WithBoundingBox,
};
use crate::spacial::{rotate_about, ToVector};
use crate::types::Exposure;
use crate::Position;

/// Segments used when an arc is part of a region contour.
const REGION_ARC_STEPS: usize = 48;

/// Deepest aperture block nesting that is replayed.
pub const MAX_BLOCK_DEPTH: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LayerUnits {
    #[default]
    Millimeters,
    Inches,
}

impl LayerUnits {
    pub fn scale_to_mm(&self) -> f64 {
        match self {
            LayerUnits::Millimeters => 1.0,
            LayerUnits::Inches => 25.4,
        }
    }
}

#[derive(Error, Debug)]
pub enum LayerError {
    #[error("Unable to parse '{name}': {reason}")]
    Parse { name: String, reason: String },
}

/// One fabrication file, reduced to primitives in its declared units.
#[derive(Clone, Debug)]
pub struct FabricationLayer {
    name: String,
    units: LayerUnits,
    primitives: Vec<FabPrimitive>,
    bounding_box: BoundingBox,
}

impl FabricationLayer {
    pub fn from_commands(name: impl Into<String>, commands: &[Command]) -> Self {
        let name = name.into();
        let units = FabricationLayer::find_units(commands);
        let primitives = FabricationLayer::build_primitives(commands);
        let bounding_box = FabricationLayer::calculate_bounding_box(&primitives);

        info!(
            "layer '{}': {} primitive(s), units: {:?}",
            name,
            primitives.len(),
            units
        );

        Self {
            name,
            units,
            primitives,
            bounding_box,
        }
    }

    /// Parses Gerber source.
    pub fn parse<R: Read>(name: impl Into<String>, reader: R) -> Result<Self, LayerError> {
        let name = name.into();
        let doc = gerber_parser::parse(BufReader::new(reader)).map_err(|cause| LayerError::Parse {
            name: name.clone(),
            reason: format!("{:?}", cause),
        })?;
        let commands = doc.into_commands();

        Ok(FabricationLayer::from_commands(name, &commands))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn units(&self) -> LayerUnits {
        self.units
    }

    pub fn primitives(&self) -> &[FabPrimitive] {
        &self.primitives
    }

    /// It's possible to have a gerber file with no primitives
    pub fn is_empty(&self) -> bool {
        self.bounding_box.is_empty()
    }

    /// In layer units.
    pub fn bounding_box(&self) -> &BoundingBox {
        &self.bounding_box
    }

    /// The layer's draws as one preview-only outline.
    pub fn outline_preview(&self) -> FabPrimitive {
        FabPrimitive::Outline(OutlinePrimitive {
            primitives: self
                .primitives
                .iter()
                .filter(|primitive| matches!(primitive, FabPrimitive::Line(_) | FabPrimitive::Arc(_)))
                .cloned()
                .collect(),
        })
    }

    /// The last unit command wins, millimeters when there is none.
    fn find_units(commands: &[Command]) -> LayerUnits {
        commands
            .iter()
            .filter_map(|command| match command {
                Command::ExtendedCode(ExtendedCode::Unit(Unit::Inches)) => Some(LayerUnits::Inches),
                Command::ExtendedCode(ExtendedCode::Unit(Unit::Millimeters)) => Some(LayerUnits::Millimeters),
                _ => None,
            })
            .last()
            .unwrap_or_default()
    }

    fn update_position(current_pos: &mut Point2<f64>, coords: &Coordinates, offset: Vector2<f64>) {
        let (x, y) = (
            coords
                .x
                .map(|value| value.into())
                .map(|value: f64| value + offset.x)
                .unwrap_or(current_pos.x),
            coords
                .y
                .map(|value| value.into())
                .map(|value: f64| value + offset.y)
                .unwrap_or(current_pos.y),
        );

        *current_pos = Point2::new(x, y);
    }

    fn calculate_bounding_box(primitives: &[FabPrimitive]) -> BoundingBox {
        let mut bbox = BoundingBox::default();

        for primitive_bbox in primitives
            .iter()
            .filter_map(WithBoundingBox::bounding_box)
        {
            bbox.expand(&primitive_bbox);
        }

        trace!("layer bbox: {:?}", bbox);

        bbox
    }

    fn build_primitives(commands: &[Command]) -> Vec<FabPrimitive> {
        #[derive(Debug)]
        struct StepRepeatState {
            initial_position: Point2<f64>,
            start_index: usize,

            repeat_x: u32,
            repeat_y: u32,
            distance_x: f64,
            distance_y: f64,

            x_index: u32,
            y_index: u32,
        }

        let mut macro_definitions: HashMap<String, &ApertureMacro> = HashMap::default();

        // First pass: collect aperture macros
        for cmd in commands.iter() {
            if let Command::ExtendedCode(ExtendedCode::ApertureMacro(macro_def)) = cmd {
                macro_definitions.insert(macro_def.name.clone(), macro_def);
            }
        }

        // Second pass: collect aperture definitions, instantiate macros with their arguments

        let mut apertures: HashMap<i32, ApertureKind> = HashMap::default();

        // pushed on AB 'open', popped and stored as an aperture on the matching AB 'close'
        let mut aperture_block_discovery_stack: Vec<ApertureBlockDiscovery> = Vec::new();
        #[derive(Debug, Clone)]
        struct ApertureBlockDiscovery {
            code: i32,
            start: usize,
        }

        for (index, command) in commands.iter().enumerate() {
            match command {
                Command::ExtendedCode(ExtendedCode::ApertureBlock(ApertureBlock::Open {
                    code,
                })) => {
                    let discovery = ApertureBlockDiscovery {
                        code: *code,
                        start: index,
                    };
                    trace!("aperture block discovery started. discovery: {:?}", discovery);
                    aperture_block_discovery_stack.push(discovery);
                }
                Command::ExtendedCode(ExtendedCode::ApertureBlock(ApertureBlock::Close)) => {
                    if let Some(discovery) = aperture_block_discovery_stack.pop() {
                        let block = BlockAperture {
                            code: discovery.code,
                            // excludes the AB 'open/close' commands themselves
                            range: Range {
                                start: discovery.start + 1,
                                end: index - 1,
                            },
                        };
                        trace!("aperture block discovery completed. block: {:?}", block);
                        apertures.insert(discovery.code, ApertureKind::Block(block));
                    } else {
                        error!("Aperture block close without matching open");
                    }
                }
                Command::ExtendedCode(ExtendedCode::ApertureDefinition(ApertureDefinition {
                    code,
                    aperture,
                })) => match aperture {
                    Aperture::Macro(macro_name, args) => {
                        if let Some(macro_def) = macro_definitions.get(macro_name) {
                            let members = instantiate_macro(macro_def, args.as_deref());
                            trace!("macro {} members: {:?}", macro_name, members);
                            apertures.insert(*code, ApertureKind::Macro(members));
                        } else {
                            error!(
                                "Aperture definition references unknown macro. macro_name: {}",
                                macro_name
                            );
                        }
                    }
                    _ => {
                        apertures.insert(*code, ApertureKind::Standard(aperture.clone()));
                    }
                },
                _ => {}
            }
        }
        info!("macros: {:?}", macro_definitions.len());

        debug!("aperture codes: {:?}", apertures.keys());
        info!("apertures: {:?}", apertures.len());

        // Third pass: collect all primitives, handle regions, aperture-block replay and step-repeat blocks

        let mut layer_primitives = Vec::new();
        let mut current_pos = Point2::new(0.0, 0.0);

        let mut current_aperture: Option<&ApertureKind> = None;
        let mut interpolation_mode = InterpolationMode::Linear;
        let mut quadrant_mode = QuadrantMode::Single;

        let mut aperture_selection_errors: HashSet<i32> = HashSet::new();

        let mut region = RegionBuilder::default();

        let mut index = 0;

        // set to some when a step-repeat block is open
        let mut step_repeat_state: Option<StepRepeatState> = None;
        // not using an option here to keep the math simple
        let mut step_repeat_offset: Vector2<f64> = Vector2::new(0.0, 0.0);

        #[derive(Debug, Clone)]
        struct ApertureBlockReplayState<'a> {
            block: &'a BlockAperture,
            initial_position: Point2<f64>,
            initial_index: usize,
            initial_offset: Vector2<f64>,
            initial_interpolation_mode: InterpolationMode,
            initial_quadrant_mode: QuadrantMode,
        }

        let mut aperture_block_replay_stack: Vec<ApertureBlockReplayState> = vec![];
        let mut aperture_block_offset: Vector2<f64> = Vector2::new(0.0, 0.0);

        loop {
            if let Some(state) = aperture_block_replay_stack.last() {
                if index > state.block.range.end {
                    trace!("completed aperture block replay");

                    // The current point is undefined after a block flash, resetting it to the flash position keeps
                    // the following commands consistent.
                    current_pos = state.initial_position;
                    interpolation_mode = state.initial_interpolation_mode;
                    quadrant_mode = state.initial_quadrant_mode;
                    aperture_block_offset = state.initial_offset;
                    // the block may be flashed again before another Dxx code
                    current_aperture = apertures.get(&state.block.code);

                    // skip the flash itself, otherwise we'd repeat forever
                    index = state.initial_index + 1;
                    aperture_block_replay_stack.pop();
                }
            }

            let Some(cmd) = commands.get(index) else { break };
            let offset = step_repeat_offset + aperture_block_offset;

            match cmd {
                Command::ExtendedCode(ExtendedCode::ApertureBlock(ApertureBlock::Open {
                    code,
                })) => {
                    // the block was discovered in the second pass, skip over its definition
                    if let Some(ApertureKind::Block(block)) = apertures.get(code) {
                        // +1 for the AB close itself, +1 again so we start on the command after it.
                        index = block.range.end + 2;
                        trace!("AB (open), skipping to: {:?}", index);
                        continue;
                    } else {
                        error!("AB (open) without a discovered aperture block. code: {}", code);
                    }
                }
                Command::ExtendedCode(ExtendedCode::ApertureBlock(ApertureBlock::Close)) => {
                    // only reachable for an unmatched close
                    error!("AB (close) encountered outside of a block definition");
                }
                Command::ExtendedCode(ExtendedCode::StepAndRepeat(StepAndRepeat::Open {
                    repeat_x,
                    repeat_y,
                    distance_x,
                    distance_y,
                })) => {
                    if !aperture_block_replay_stack.is_empty() {
                        trace!("SR (open) during AB replay");
                    } else if step_repeat_state.is_some() {
                        error!("Step repeat open without matching close");
                    } else {
                        let state = StepRepeatState {
                            initial_position: current_pos,
                            repeat_x: *repeat_x,
                            repeat_y: *repeat_y,
                            distance_x: *distance_x,
                            distance_y: *distance_y,
                            start_index: index + 1,
                            x_index: 0,
                            y_index: 0,
                        };
                        trace!("Step-and-repeat open, state: {:?}", state);
                        step_repeat_state = Some(state);
                    }
                }
                Command::ExtendedCode(ExtendedCode::StepAndRepeat(StepAndRepeat::Close)) => {
                    if !aperture_block_replay_stack.is_empty() {
                        trace!("SR (close) during AB replay");
                    } else if let Some(state) = &mut step_repeat_state {
                        let mut complete = false;
                        state.y_index += 1;
                        if state.y_index >= state.repeat_y {
                            state.y_index = 0;

                            state.x_index += 1;
                            if state.x_index >= state.repeat_x {
                                complete = true;
                            }
                        }

                        // every repetition starts from the same current point
                        current_pos = state.initial_position;

                        if complete {
                            trace!("Step-and-repeat close");
                            step_repeat_offset = Vector2::new(0.0, 0.0);
                            step_repeat_state = None;
                        } else {
                            step_repeat_offset = Vector2::new(
                                state.distance_x * state.x_index as f64,
                                state.distance_y * state.y_index as f64,
                            );

                            trace!("Step-and-repeat continue, state: {:?}", state);

                            index = state.start_index;
                            continue;
                        }
                    } else {
                        error!("Step repeat close without matching open");
                    }
                }
                Command::FunctionCode(FunctionCode::GCode(GCode::InterpolationMode(mode))) => {
                    interpolation_mode = *mode;
                }
                Command::FunctionCode(FunctionCode::GCode(GCode::QuadrantMode(mode))) => {
                    quadrant_mode = *mode;
                }
                Command::FunctionCode(FunctionCode::GCode(GCode::RegionMode(enabled))) => {
                    if *enabled {
                        // G36
                        region.begin();
                    } else if let Some(primitive) = region.end() {
                        // G37
                        layer_primitives.push(primitive);
                    }
                }
                Command::FunctionCode(FunctionCode::DCode(DCode::SelectAperture(code))) => {
                    current_aperture = apertures.get(code);
                    if current_aperture.is_none() {
                        aperture_selection_errors.insert(*code);
                    }
                }
                Command::FunctionCode(FunctionCode::DCode(DCode::Operation(operation))) => match operation {
                    Operation::Move(coords) => {
                        Self::update_position(&mut current_pos, coords, offset);
                        if region.is_open() {
                            // a move starts a new contour
                            region.close_contour();
                        }
                    }
                    Operation::Interpolate(coords, center_offset) => {
                        let start = current_pos;
                        let mut end = current_pos;
                        Self::update_position(&mut end, coords, offset);

                        let arc = match interpolation_mode {
                            InterpolationMode::Linear => None,
                            InterpolationMode::ClockwiseCircular | InterpolationMode::CounterclockwiseCircular => {
                                let clockwise = matches!(interpolation_mode, InterpolationMode::ClockwiseCircular);
                                match center_offset {
                                    Some(center_offset) => Some(circular_arc(
                                        start,
                                        end,
                                        center_offset,
                                        clockwise,
                                        quadrant_mode,
                                    )),
                                    None => {
                                        warn!("Circular interpolation without center offset, drawing a line");
                                        None
                                    }
                                }
                            }
                        };

                        if region.is_open() {
                            match arc {
                                Some(arc) => region.push_arc(start, &arc),
                                None => region.push_line(start, end),
                            }
                        } else {
                            let width = current_aperture.and_then(ApertureKind::stroke_width);
                            if current_aperture.is_some() && width.is_none() {
                                warn!("Unsupported aperture for interpolation, using the default width");
                            }
                            let primitive = match arc {
                                Some(mut arc) => {
                                    arc.width = width;
                                    FabPrimitive::Arc(arc)
                                }
                                None => FabPrimitive::Line(LinePrimitive {
                                    start,
                                    end,
                                    width,
                                }),
                            };
                            layer_primitives.push(primitive);
                        }
                        current_pos = end;
                    }
                    Operation::Flash(coords, ..) => {
                        if region.is_open() {
                            warn!("Flash operation found within region - ignoring");
                        } else {
                            Self::update_position(&mut current_pos, coords, offset);

                            match current_aperture {
                                Some(ApertureKind::Macro(members)) => {
                                    let group = FabPrimitive::AmGroup(AmGroupPrimitive {
                                        members: members.clone(),
                                    });
                                    let primitive = group.translated(current_pos.to_vector());
                                    trace!("flashing macro primitive: {:?}", primitive);
                                    layer_primitives.push(primitive);
                                }
                                Some(ApertureKind::Standard(aperture)) => {
                                    if let Some(primitive) = flash_standard_aperture(aperture, current_pos) {
                                        layer_primitives.push(primitive);
                                    }
                                }
                                Some(ApertureKind::Block(block))
                                    if aperture_block_replay_stack
                                        .iter()
                                        .any(|state| state.block.code == block.code) =>
                                {
                                    warn!("Aperture block D{} flashes itself, skipping the flash", block.code);
                                }
                                Some(ApertureKind::Block(block)) if aperture_block_replay_stack.len() >= MAX_BLOCK_DEPTH => {
                                    warn!(
                                        "Aperture block nesting exceeds {} levels, skipping D{}",
                                        MAX_BLOCK_DEPTH, block.code
                                    );
                                }
                                Some(ApertureKind::Block(block)) => {
                                    trace!("flashing block aperture: {:?}", block);

                                    let state = ApertureBlockReplayState {
                                        block,
                                        initial_position: current_pos,
                                        initial_index: index,
                                        initial_offset: aperture_block_offset,
                                        initial_interpolation_mode: interpolation_mode,
                                        initial_quadrant_mode: quadrant_mode,
                                    };
                                    aperture_block_replay_stack.push(state);

                                    aperture_block_offset = current_pos.to_vector();
                                    index = block.range.start;
                                    continue;
                                }
                                None => {
                                    warn!("Flash without a selected aperture");
                                }
                            }
                        }
                    }
                },
                _ => {}
            }

            index += 1;
        }

        if region.is_open() {
            warn!("Region not closed at end of file, discarding");
        }

        if !aperture_selection_errors.is_empty() {
            error!(
                "Selecting some apertures failed; Check gerber file content and parser errors. aperture_codes: {:?}",
                aperture_selection_errors
            );
        }

        info!("layer_primitives: {:?}", layer_primitives.len());
        trace!("layer_primitives: {:?}", layer_primitives);

        layer_primitives
    }
}

#[derive(Debug, Clone)]
struct BlockAperture {
    code: i32,
    range: Range<usize>,
}

#[derive(Debug)]
enum ApertureKind {
    Standard(Aperture),
    Macro(Vec<MacroMember>),
    Block(BlockAperture),
}

impl ApertureKind {
    /// Stroke width when the aperture is used for a draw.
    fn stroke_width(&self) -> Option<f64> {
        match self {
            ApertureKind::Standard(Aperture::Circle(Circle {
                diameter, ..
            })) => Some(*diameter),
            ApertureKind::Standard(Aperture::Rectangle(rect)) | ApertureKind::Standard(Aperture::Obround(rect)) => {
                Some(rect.x.min(rect.y))
            }
            ApertureKind::Standard(Aperture::Polygon(polygon)) => Some(polygon.diameter),
            _ => None,
        }
    }
}

/// Collects `G36`/`G37` contours.
#[derive(Debug, Default)]
struct RegionBuilder {
    open: bool,
    contours: Vec<Vec<Position>>,
    current: Vec<Position>,
}

impl RegionBuilder {
    fn begin(&mut self) {
        self.open = true;
        self.contours.clear();
        self.current.clear();
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn close_contour(&mut self) {
        let contour = std::mem::take(&mut self.current);
        if contour.len() >= 3 {
            self.contours.push(contour);
        } else if !contour.is_empty() {
            debug!("Discarding region contour with {} vertices", contour.len());
        }
    }

    fn start_if_empty(&mut self, start: Position) {
        if self.current.is_empty() {
            self.current.push(start);
        }
    }

    fn push_line(&mut self, start: Position, end: Position) {
        self.start_if_empty(start);
        self.current.push(end);
    }

    fn push_arc(&mut self, start: Position, arc: &ArcPrimitive) {
        self.start_if_empty(start);
        let mut points = arc.points(REGION_ARC_STEPS);
        // arcs stored counter-clockwise; a clockwise draw walks them backwards
        if let (Some(first), Some(last)) = (points.first(), points.last()) {
            if (last - start).norm() < (first - start).norm() {
                points.reverse();
            }
        }
        self.current
            .extend(points.into_iter().skip(1));
    }

    fn end(&mut self) -> Option<FabPrimitive> {
        if !self.open {
            warn!("Region end without region start");
            return None;
        }
        self.close_contour();
        self.open = false;

        let contours = std::mem::take(&mut self.contours);
        if contours.is_empty() {
            warn!("Region without any contour of 3 or more vertices");
            return None;
        }
        Some(FabPrimitive::Region(RegionPrimitive {
            contours,
        }))
    }
}

/// Angle of `point` seen from `center`, in degrees.
fn angle_degrees(center: Position, point: Position) -> f64 {
    (point.y - center.y)
        .atan2(point.x - center.x)
        .to_degrees()
}

/// Counter-clockwise sweep from `from` to `to`, in degrees, in `[0, 360)`.
fn ccw_sweep(from: f64, to: f64) -> f64 {
    (to - from).rem_euclid(360.0)
}

/// In single quadrant mode the offsets are unsigned; the center is the candidate for which the arc is at most
/// 90° and the start and end radii agree best.
fn single_quadrant_center(start: Position, end: Position, i: f64, j: f64, clockwise: bool) -> Position {
    let candidates = [(1.0, 1.0), (-1.0, 1.0), (1.0, -1.0), (-1.0, -1.0)].map(|(sx, sy)| {
        Position::new(start.x + sx * i.abs(), start.y + sy * j.abs())
    });

    let score = |center: &Position| -> f64 {
        let (from, to) = (angle_degrees(*center, start), angle_degrees(*center, end));
        let sweep = match clockwise {
            true => ccw_sweep(to, from),
            false => ccw_sweep(from, to),
        };
        let radius_error = ((start - center).norm() - (end - center).norm()).abs();
        match sweep <= 90.0 + 1e-6 {
            true => radius_error,
            false => f64::MAX,
        }
    };

    candidates
        .iter()
        .copied()
        .min_by(|a, b| score(a).total_cmp(&score(b)))
        .unwrap_or(start)
}

/// A draw from `start` to `end`, as a counter-clockwise arc primitive.
///
/// Clockwise draws swap their end points; a draw that ends where it started is a full circle.
fn circular_arc(
    start: Position,
    end: Position,
    center_offset: &CoordinateOffset,
    clockwise: bool,
    quadrant_mode: QuadrantMode,
) -> ArcPrimitive {
    let i: f64 = center_offset
        .x
        .map(|x| x.into())
        .unwrap_or(0.0);
    let j: f64 = center_offset
        .y
        .map(|y| y.into())
        .unwrap_or(0.0);

    let center = match quadrant_mode {
        QuadrantMode::Multi => Position::new(start.x + i, start.y + j),
        QuadrantMode::Single => single_quadrant_center(start, end, i, j, clockwise),
    };
    let radius = (start - center).norm();

    let (from, to) = match clockwise {
        true => (angle_degrees(center, end), angle_degrees(center, start)),
        false => (angle_degrees(center, start), angle_degrees(center, end)),
    };

    let full_circle = (end - start).norm() < 1e-9 && matches!(quadrant_mode, QuadrantMode::Multi);
    let end_angle = match full_circle {
        true => from + 360.0,
        false => to,
    };

    ArcPrimitive {
        center,
        radius,
        start_angle: from,
        end_angle,
        width: None,
    }
}

fn flash_standard_aperture(aperture: &Aperture, position: Position) -> Option<FabPrimitive> {
    match aperture {
        Aperture::Circle(Circle {
            diameter,
            hole_diameter,
        }) => Some(FabPrimitive::Circle(CirclePrimitive {
            center: position,
            diameter: *diameter,
            hole_diameter: *hole_diameter,
            flashed: true,
        })),
        Aperture::Rectangle(rect) => Some(FabPrimitive::Rectangle(RectanglePrimitive {
            center: position,
            width: rect.x,
            height: rect.y,
            rotation: 0.0,
            hole_diameter: rect.hole_diameter,
            flashed: true,
        })),
        Aperture::Obround(rect) => Some(FabPrimitive::Obround(ObroundPrimitive {
            center: position,
            width: rect.x,
            height: rect.y,
            rotation: 0.0,
            hole_diameter: rect.hole_diameter,
        })),
        Aperture::Polygon(polygon) => {
            let radius = polygon.diameter / 2.0;
            let vertices_count = polygon.vertices as usize;
            if vertices_count < 3 {
                warn!("Polygon aperture with {} vertices", vertices_count);
                return None;
            }
            let rotation = polygon
                .rotation
                .unwrap_or(0.0)
                .to_radians();

            // vertices start at angle 0 and run counter-clockwise
            let vertices: Vec<Position> = (0..vertices_count)
                .map(|i| {
                    let angle = std::f64::consts::TAU * i as f64 / vertices_count as f64 + rotation;
                    Position::new(position.x + radius * angle.cos(), position.y + radius * angle.sin())
                })
                .collect();

            let mut contours = vec![vertices];
            if let Some(hole_diameter) = polygon.hole_diameter.filter(|diameter| *diameter > 0.0) {
                // clockwise, so the non-zero fill leaves it open
                let hole_radius = hole_diameter / 2.0;
                contours.push(
                    (0..CIRCLE_SEGMENTS)
                        .rev()
                        .map(|i| {
                            let angle = std::f64::consts::TAU * i as f64 / CIRCLE_SEGMENTS as f64;
                            Position::new(
                                position.x + hole_radius * angle.cos(),
                                position.y + hole_radius * angle.sin(),
                            )
                        })
                        .collect(),
                );
            }

            Some(FabPrimitive::Region(RegionPrimitive {
                contours,
            }))
        }
        Aperture::Macro(code, _args) => {
            // supported macros were instantiated when the aperture was defined
            warn!("Unsupported macro aperture: {:?}, code: {}", aperture, code);
            None
        }
    }
}

/// Evaluates a macro with the arguments of one aperture definition.
fn instantiate_macro(macro_def: &ApertureMacro, args: Option<&[MacroDecimal]>) -> Vec<MacroMember> {
    let mut macro_context = MacroContext::default();

    if let Some(args) = args {
        for (index, arg) in args.iter().enumerate() {
            let arg_number = (index + 1) as u32;

            let value = match arg {
                MacroDecimal::Value(value) => Ok(*value),
                MacroDecimal::Variable(variable) => Ok(macro_context.get(variable)),
                MacroDecimal::Expression(expression) => evaluate_expression(expression, &macro_context),
            };

            value
                .and_then(|value| macro_context.put(arg_number, value))
                .inspect_err(|error| {
                    error!("Error setting variable {}: {}", arg_number, error);
                })
                .ok();
        }
    }

    trace!("initial macro_context: {:?}", macro_context);

    let mut members = vec![];
    for content in &macro_def.content {
        trace!("macro_content: {:?}", content);

        match macro_content_member(content, &mut macro_context) {
            Err(cause) => {
                error!("Error processing macro content: {:?}, cause: {}", content, cause);
            }
            Ok(Some(member)) => members.push(member),
            Ok(None) => {}
        }
    }
    trace!("final macro_context: {:?}", macro_context);

    members
}

fn rotate(x: f64, y: f64, degrees: f64) -> Position {
    rotate_about(Position::new(x, y), Position::origin(), degrees.to_radians())
}

/// Macro primitives rotate about the macro origin.
fn macro_content_member(
    content: &MacroContent,
    macro_context: &mut MacroContext,
) -> Result<Option<MacroMember>, ExpressionEvaluationError> {
    let member = |exposure: bool, primitive: FabPrimitive| {
        Some(MacroMember {
            exposure: Exposure::from(exposure),
            primitive,
        })
    };

    match content {
        MacroContent::Circle(circle) => {
            let diameter = macro_decimal_to_f64(&circle.diameter, macro_context)?;
            let (center_x, center_y) = macro_decimal_pair_to_f64(&circle.center, macro_context)?;
            let angle = match &circle.angle {
                Some(angle) => macro_decimal_to_f64(angle, macro_context)?,
                None => 0.0,
            };

            Ok(member(
                macro_boolean_to_bool(&circle.exposure, macro_context)?,
                FabPrimitive::Circle(CirclePrimitive {
                    center: rotate(center_x, center_y, angle),
                    diameter,
                    hole_diameter: None,
                    flashed: true,
                }),
            ))
        }
        MacroContent::VectorLine(vector_line) => {
            let (start_x, start_y) = macro_decimal_pair_to_f64(&vector_line.start, macro_context)?;
            let (end_x, end_y) = macro_decimal_pair_to_f64(&vector_line.end, macro_context)?;
            let width = macro_decimal_to_f64(&vector_line.width, macro_context)?;
            let angle = macro_decimal_to_f64(&vector_line.angle, macro_context)?;

            let start = rotate(start_x, start_y, angle);
            let end = rotate(end_x, end_y, angle);

            let delta = end - start;
            let length = delta.norm();
            if length == 0.0 || width <= 0.0 {
                return Ok(None);
            }

            // square ends
            let perpendicular = Vector2::new(-delta.y, delta.x) / length * (width / 2.0);
            let corners = vec![
                start - perpendicular,
                end - perpendicular,
                end + perpendicular,
                start + perpendicular,
            ];

            Ok(member(
                macro_boolean_to_bool(&vector_line.exposure, macro_context)?,
                FabPrimitive::Region(RegionPrimitive {
                    contours: vec![corners],
                }),
            ))
        }
        MacroContent::CenterLine(center_line) => {
            let (center_x, center_y) = macro_decimal_pair_to_f64(&center_line.center, macro_context)?;
            let (length, width) = macro_decimal_pair_to_f64(&center_line.dimensions, macro_context)?;
            let angle = macro_decimal_to_f64(&center_line.angle, macro_context)?;

            Ok(member(
                macro_boolean_to_bool(&center_line.exposure, macro_context)?,
                FabPrimitive::Rectangle(RectanglePrimitive {
                    center: rotate(center_x, center_y, angle),
                    width: length,
                    height: width,
                    rotation: angle,
                    hole_diameter: None,
                    flashed: true,
                }),
            ))
        }
        MacroContent::Outline(outline) => {
            if outline.points.len() < 3 {
                warn!("Outline with less than 3 points. outline: {:?}", outline);
                return Ok(None);
            }

            let angle = macro_decimal_to_f64(&outline.angle, macro_context)?;
            let vertices = outline
                .points
                .iter()
                .map(|point| macro_decimal_pair_to_f64(point, macro_context).map(|(x, y)| rotate(x, y, angle)))
                .collect::<Result<Vec<_>, _>>()?;

            Ok(member(
                macro_boolean_to_bool(&outline.exposure, macro_context)?,
                FabPrimitive::Region(RegionPrimitive {
                    contours: vec![vertices],
                }),
            ))
        }
        MacroContent::Polygon(polygon) => {
            let (center_x, center_y) = macro_decimal_pair_to_f64(&polygon.center, macro_context)?;
            let vertices_count = macro_integer_to_u32(&polygon.vertices, macro_context)? as usize;
            let diameter = macro_decimal_to_f64(&polygon.diameter, macro_context)?;
            let angle = macro_decimal_to_f64(&polygon.angle, macro_context)?;

            if vertices_count < 3 {
                warn!("Polygon with less than 3 vertices. polygon: {:?}", polygon);
                return Ok(None);
            }

            let radius = diameter / 2.0;
            let vertices = (0..vertices_count)
                .map(|i| {
                    let vertex_angle = std::f64::consts::TAU * i as f64 / vertices_count as f64;
                    rotate(
                        center_x + radius * vertex_angle.cos(),
                        center_y + radius * vertex_angle.sin(),
                        angle,
                    )
                })
                .collect();

            Ok(member(
                macro_boolean_to_bool(&polygon.exposure, macro_context)?,
                FabPrimitive::Region(RegionPrimitive {
                    contours: vec![vertices],
                }),
            ))
        }
        MacroContent::Moire(_) => Ok(Some(MacroMember {
            exposure: Exposure::Add,
            primitive: FabPrimitive::Unsupported {
                kind: "Moire".to_string(),
            },
        })),
        MacroContent::Thermal(_) => Ok(Some(MacroMember {
            exposure: Exposure::Add,
            primitive: FabPrimitive::Unsupported {
                kind: "Thermal".to_string(),
            },
        })),
        MacroContent::VariableDefinition(VariableDefinition {
            number,
            expression,
        }) => {
            let value = evaluate_expression(expression, macro_context)?;
            macro_context.put(*number, value)?;
            Ok(None)
        }
        MacroContent::Comment(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use std::f64::consts::PI;

    use gerber_types::{
        ApertureMacro, CenterLinePrimitive, CirclePrimitive as MacroCircle, CoordinateFormat, CoordinateNumber,
        MacroBoolean, Rectangular,
    };

    use super::*;
    use crate::testing::dump_gerber_source;

    fn format() -> CoordinateFormat {
        CoordinateFormat::new(2, 4)
    }

    fn coords(x: f64, y: f64) -> Coordinates {
        Coordinates::new(
            CoordinateNumber::try_from(x).unwrap(),
            CoordinateNumber::try_from(y).unwrap(),
            format(),
        )
    }

    fn offset(i: f64, j: f64) -> CoordinateOffset {
        CoordinateOffset::new(
            CoordinateNumber::try_from(i).unwrap(),
            CoordinateNumber::try_from(j).unwrap(),
            format(),
        )
    }

    fn preamble(unit: Unit) -> Vec<Command> {
        vec![
            Command::ExtendedCode(ExtendedCode::CoordinateFormat(format())),
            Command::ExtendedCode(ExtendedCode::Unit(unit)),
        ]
    }

    fn define(code: i32, aperture: Aperture) -> Command {
        Command::ExtendedCode(ExtendedCode::ApertureDefinition(ApertureDefinition::new(code, aperture)))
    }

    fn flash(x: f64, y: f64) -> Command {
        DCode::Operation(Operation::Flash(coords(x, y))).into()
    }

    fn move_to(x: f64, y: f64) -> Command {
        DCode::Operation(Operation::Move(coords(x, y))).into()
    }

    fn line_to(x: f64, y: f64) -> Command {
        DCode::Operation(Operation::Interpolate(coords(x, y), None)).into()
    }

    #[test]
    fn test_flash_circle_and_rectangle() {
        // given
        let mut commands = preamble(Unit::Millimeters);
        commands.extend([
            define(10, Aperture::Circle(Circle::new(1.0))),
            define(11, Aperture::Rectangle(Rectangular::new(2.0, 1.0))),
            DCode::SelectAperture(10).into(),
            flash(1.0, 1.0),
            DCode::SelectAperture(11).into(),
            flash(5.0, 5.0),
        ]);
        dump_gerber_source(&commands);

        // when
        let layer = FabricationLayer::from_commands("top.gtl", &commands);

        // then
        assert_eq!(layer.units(), LayerUnits::Millimeters);
        assert_eq!(layer.primitives().len(), 2);
        assert!(matches!(
            &layer.primitives()[0],
            FabPrimitive::Circle(CirclePrimitive { diameter, flashed: true, .. }) if *diameter == 1.0
        ));
        assert!(matches!(
            &layer.primitives()[1],
            FabPrimitive::Rectangle(RectanglePrimitive { width, height, flashed: true, .. })
                if *width == 2.0 && *height == 1.0
        ));
        assert_eq!(layer.bounding_box().min, Point2::new(0.5, 0.5));
        assert_eq!(layer.bounding_box().max, Point2::new(6.0, 5.5));
    }

    #[test]
    fn test_draw_with_circle_aperture() {
        // given
        let mut commands = preamble(Unit::Inches);
        commands.extend([
            define(10, Aperture::Circle(Circle::new(0.01))),
            DCode::SelectAperture(10).into(),
            GCode::InterpolationMode(InterpolationMode::Linear).into(),
            move_to(0.0, 0.0),
            line_to(1.0, 0.0),
        ]);

        // when
        let layer = FabricationLayer::from_commands("bottom.gbl", &commands);

        // then
        assert_eq!(layer.units(), LayerUnits::Inches);
        assert_eq!(layer.primitives(), &[FabPrimitive::Line(LinePrimitive {
            start: Point2::new(0.0, 0.0),
            end: Point2::new(1.0, 0.0),
            width: Some(0.01),
        })]);
    }

    #[test]
    fn test_counter_clockwise_quarter_arc() {
        // given
        let mut commands = preamble(Unit::Millimeters);
        commands.extend([
            define(10, Aperture::Circle(Circle::new(0.2))),
            DCode::SelectAperture(10).into(),
            GCode::QuadrantMode(QuadrantMode::Multi).into(),
            move_to(1.0, 0.0),
            GCode::InterpolationMode(InterpolationMode::CounterclockwiseCircular).into(),
            DCode::Operation(Operation::Interpolate(coords(0.0, 1.0), Some(offset(-1.0, 0.0)))).into(),
        ]);

        // when
        let layer = FabricationLayer::from_commands("arc.gbr", &commands);

        // then
        let FabPrimitive::Arc(arc) = &layer.primitives()[0] else {
            panic!("expected an arc");
        };
        assert_eq!(arc.center, Point2::new(0.0, 0.0));
        assert!((arc.radius - 1.0).abs() < 1e-9);
        assert!((arc.start_angle - 0.0).abs() < 1e-9);
        assert!((arc.end_angle - 90.0).abs() < 1e-9);
        assert_eq!(arc.width, Some(0.2));
    }

    #[test]
    fn test_clockwise_arc_swaps_ends() {
        // given
        let mut commands = preamble(Unit::Millimeters);
        commands.extend([
            define(10, Aperture::Circle(Circle::new(0.2))),
            DCode::SelectAperture(10).into(),
            GCode::QuadrantMode(QuadrantMode::Multi).into(),
            move_to(0.0, 1.0),
            GCode::InterpolationMode(InterpolationMode::ClockwiseCircular).into(),
            DCode::Operation(Operation::Interpolate(coords(1.0, 0.0), Some(offset(0.0, -1.0)))).into(),
        ]);

        // when
        let layer = FabricationLayer::from_commands("arc.gbr", &commands);

        // then
        let FabPrimitive::Arc(arc) = &layer.primitives()[0] else {
            panic!("expected an arc");
        };
        assert!((arc.start_angle - 0.0).abs() < 1e-9);
        assert!((arc.end_angle - 90.0).abs() < 1e-9);
    }

    #[test]
    fn test_single_quadrant_arc_picks_center() {
        // given
        let mut commands = preamble(Unit::Millimeters);
        commands.extend([
            define(10, Aperture::Circle(Circle::new(0.2))),
            DCode::SelectAperture(10).into(),
            GCode::QuadrantMode(QuadrantMode::Single).into(),
            move_to(1.0, 0.0),
            GCode::InterpolationMode(InterpolationMode::CounterclockwiseCircular).into(),
            DCode::Operation(Operation::Interpolate(coords(0.0, 1.0), Some(offset(1.0, 0.0)))).into(),
        ]);

        // when
        let layer = FabricationLayer::from_commands("arc.gbr", &commands);

        // then
        let FabPrimitive::Arc(arc) = &layer.primitives()[0] else {
            panic!("expected an arc");
        };
        assert!((arc.center - Point2::new(0.0, 0.0)).norm() < 1e-9);
    }

    #[test]
    fn test_full_circle_draw() {
        // given
        let mut commands = preamble(Unit::Millimeters);
        commands.extend([
            define(10, Aperture::Circle(Circle::new(0.1))),
            DCode::SelectAperture(10).into(),
            GCode::QuadrantMode(QuadrantMode::Multi).into(),
            move_to(2.0, 0.0),
            GCode::InterpolationMode(InterpolationMode::CounterclockwiseCircular).into(),
            DCode::Operation(Operation::Interpolate(coords(2.0, 0.0), Some(offset(-1.0, 0.0)))).into(),
        ]);

        // when
        let layer = FabricationLayer::from_commands("circle.gbr", &commands);

        // then
        let FabPrimitive::Arc(arc) = &layer.primitives()[0] else {
            panic!("expected an arc");
        };
        assert!((arc.end_angle - arc.start_angle - 360.0).abs() < 1e-9);
    }

    #[test]
    fn test_region_with_two_contours() {
        // given
        let mut commands = preamble(Unit::Millimeters);
        commands.extend([
            GCode::InterpolationMode(InterpolationMode::Linear).into(),
            GCode::RegionMode(true).into(),
            move_to(0.0, 0.0),
            line_to(1.0, 0.0),
            line_to(1.0, 1.0),
            line_to(0.0, 1.0),
            line_to(0.0, 0.0),
            move_to(5.0, 5.0),
            line_to(6.0, 5.0),
            line_to(6.0, 6.0),
            line_to(5.0, 5.0),
            GCode::RegionMode(false).into(),
        ]);

        // when
        let layer = FabricationLayer::from_commands("region.gbr", &commands);

        // then
        let FabPrimitive::Region(region) = &layer.primitives()[0] else {
            panic!("expected a region");
        };
        assert_eq!(region.contours.len(), 2);
        assert_eq!(region.contours[0].len(), 5);
        assert_eq!(region.contours[0][0], Point2::new(0.0, 0.0));
        assert_eq!(region.contours[1].len(), 4);
    }

    #[test]
    fn test_region_with_arc_segment() {
        // given
        let mut commands = preamble(Unit::Millimeters);
        commands.extend([
            GCode::QuadrantMode(QuadrantMode::Multi).into(),
            GCode::RegionMode(true).into(),
            move_to(0.0, 0.0),
            GCode::InterpolationMode(InterpolationMode::Linear).into(),
            line_to(2.0, 0.0),
            GCode::InterpolationMode(InterpolationMode::CounterclockwiseCircular).into(),
            DCode::Operation(Operation::Interpolate(coords(0.0, 0.0), Some(offset(-1.0, 0.0)))).into(),
            GCode::RegionMode(false).into(),
        ]);

        // when
        let layer = FabricationLayer::from_commands("region.gbr", &commands);

        // then
        let FabPrimitive::Region(region) = &layer.primitives()[0] else {
            panic!("expected a region");
        };
        let contour = &region.contours[0];
        // start, line end, then the arc samples after its start point
        assert_eq!(contour.len(), 2 + REGION_ARC_STEPS);
        assert!(contour
            .iter()
            .all(|point| point.y >= -1e-9));
        assert!((contour.last().unwrap() - Point2::new(0.0, 0.0)).norm() < 1e-9);
    }

    #[test]
    fn test_macro_flash() {
        // given
        let mut commands = preamble(Unit::Millimeters);
        commands.extend([
            Command::ExtendedCode(ExtendedCode::ApertureMacro(ApertureMacro {
                name: "PAD".to_string(),
                content: vec![
                    MacroContent::Comment("$1 = size".to_string()),
                    MacroContent::Circle(MacroCircle {
                        exposure: MacroBoolean::Value(true),
                        diameter: MacroDecimal::Expression("$1x2".to_string()),
                        center: (MacroDecimal::Value(0.0), MacroDecimal::Value(0.0)),
                        angle: None,
                    }),
                    MacroContent::CenterLine(CenterLinePrimitive {
                        exposure: MacroBoolean::Value(false),
                        dimensions: (MacroDecimal::Variable(1), MacroDecimal::Value(0.1)),
                        center: (MacroDecimal::Value(0.0), MacroDecimal::Value(0.0)),
                        angle: MacroDecimal::Value(90.0),
                    }),
                ],
            })),
            define(20, Aperture::Macro("PAD".to_string(), Some(vec![MacroDecimal::Value(0.5)]))),
            DCode::SelectAperture(20).into(),
            flash(3.0, 4.0),
        ]);
        dump_gerber_source(&commands);

        // when
        let layer = FabricationLayer::from_commands("macro.gbr", &commands);

        // then
        let FabPrimitive::AmGroup(group) = &layer.primitives()[0] else {
            panic!("expected a macro group");
        };
        assert_eq!(group.members.len(), 2);
        assert_eq!(group.members[0].exposure, Exposure::Add);
        assert_eq!(group.members[0].primitive, FabPrimitive::Circle(CirclePrimitive {
            center: Point2::new(3.0, 4.0),
            diameter: 1.0,
            hole_diameter: None,
            flashed: true,
        }));
        assert_eq!(group.members[1].exposure, Exposure::CutOut);
        let FabPrimitive::Rectangle(rectangle) = &group.members[1].primitive else {
            panic!("expected a rectangle");
        };
        assert_eq!(rectangle.rotation, 90.0);
        assert_eq!(rectangle.width, 0.5);
    }

    #[test]
    fn test_step_and_repeat() {
        // given
        let mut commands = preamble(Unit::Millimeters);
        commands.extend([
            define(10, Aperture::Circle(Circle::new(0.5))),
            DCode::SelectAperture(10).into(),
            Command::ExtendedCode(ExtendedCode::StepAndRepeat(StepAndRepeat::Open {
                repeat_x: 3,
                repeat_y: 2,
                distance_x: 2.0,
                distance_y: 1.0,
            })),
            flash(0.0, 0.0),
            Command::ExtendedCode(ExtendedCode::StepAndRepeat(StepAndRepeat::Close)),
        ]);

        // when
        let layer = FabricationLayer::from_commands("sr.gbr", &commands);

        // then
        let centers: Vec<_> = layer
            .primitives()
            .iter()
            .filter_map(|primitive| match primitive {
                FabPrimitive::Circle(circle) => Some((circle.center.x, circle.center.y)),
                _ => None,
            })
            .collect();
        assert_eq!(centers, vec![(0.0, 0.0), (0.0, 1.0), (2.0, 0.0), (2.0, 1.0), (4.0, 0.0), (4.0, 1.0)]);
    }

    #[test]
    fn test_aperture_block_flash() {
        // given
        let _ = env_logger::builder().is_test(true).try_init();

        // and
        let mut commands = preamble(Unit::Millimeters);
        commands.extend([
            define(10, Aperture::Circle(Circle::new(0.5))),
            Command::ExtendedCode(ExtendedCode::ApertureBlock(ApertureBlock::Open {
                code: 100,
            })),
            DCode::SelectAperture(10).into(),
            flash(0.0, 0.0),
            flash(1.0, 0.0),
            Command::ExtendedCode(ExtendedCode::ApertureBlock(ApertureBlock::Close)),
            DCode::SelectAperture(100).into(),
            flash(10.0, 10.0),
            flash(20.0, 10.0),
        ]);

        // when
        let layer = FabricationLayer::from_commands("block.gbr", &commands);

        // then
        let centers: Vec<_> = layer
            .primitives()
            .iter()
            .filter_map(|primitive| match primitive {
                FabPrimitive::Circle(circle) => Some((circle.center.x, circle.center.y)),
                _ => None,
            })
            .collect();
        assert_eq!(centers, vec![(10.0, 10.0), (11.0, 10.0), (20.0, 10.0), (21.0, 10.0)]);
    }

    #[test]
    fn test_self_flashing_aperture_block_terminates() {
        // given
        let _ = env_logger::builder().is_test(true).try_init();

        // and
        let mut commands = preamble(Unit::Millimeters);
        commands.extend([
            define(10, Aperture::Circle(Circle::new(0.5))),
            Command::ExtendedCode(ExtendedCode::ApertureBlock(ApertureBlock::Open {
                code: 100,
            })),
            DCode::SelectAperture(10).into(),
            flash(0.0, 0.0),
            DCode::SelectAperture(100).into(),
            flash(1.0, 0.0),
            Command::ExtendedCode(ExtendedCode::ApertureBlock(ApertureBlock::Close)),
            DCode::SelectAperture(100).into(),
            flash(10.0, 10.0),
        ]);

        // when
        let layer = FabricationLayer::from_commands("recursive_block.gbr", &commands);

        // then
        let centers: Vec<_> = layer
            .primitives()
            .iter()
            .filter_map(|primitive| match primitive {
                FabPrimitive::Circle(circle) => Some((circle.center.x, circle.center.y)),
                _ => None,
            })
            .collect();
        assert_eq!(centers, vec![(10.0, 10.0)]);
    }

    #[test]
    fn test_polygon_aperture_becomes_region() {
        // given
        let mut commands = preamble(Unit::Millimeters);
        commands.extend([
            define(
                10,
                Aperture::Polygon(gerber_types::Polygon::new(2.0, 6)),
            ),
            DCode::SelectAperture(10).into(),
            flash(0.0, 0.0),
        ]);

        // when
        let layer = FabricationLayer::from_commands("poly.gbr", &commands);

        // then
        let FabPrimitive::Region(region) = &layer.primitives()[0] else {
            panic!("expected a region");
        };
        assert_eq!(region.contours[0].len(), 6);
        assert!((region.contours[0][1].y - (PI / 3.0).sin()).abs() < 1e-9);
    }

    #[test]
    fn test_outline_preview_collects_draws() {
        // given
        let mut commands = preamble(Unit::Millimeters);
        commands.extend([
            define(10, Aperture::Circle(Circle::new(0.1))),
            DCode::SelectAperture(10).into(),
            move_to(0.0, 0.0),
            line_to(10.0, 0.0),
            line_to(10.0, 10.0),
            flash(5.0, 5.0),
        ]);
        let layer = FabricationLayer::from_commands("edge.gko", &commands);

        // when
        let preview = layer.outline_preview();

        // then
        let FabPrimitive::Outline(outline) = preview else {
            panic!("expected an outline");
        };
        assert_eq!(outline.primitives.len(), 2);
    }

    #[test]
    fn test_parse_source() {
        // given
        let source = "%FSLAX24Y24*%\n%MOMM*%\n%ADD10C,0.5*%\nD10*\nX010000Y010000D03*\nM02*\n";

        // when
        let layer = FabricationLayer::parse("pad.gbr", source.as_bytes()).unwrap();

        // then
        assert_eq!(layer.name(), "pad.gbr");
        assert_eq!(layer.primitives().len(), 1);
    }
}

//! Vector artwork import.
//!
//! Every `<path d="…">` of an SVG document is flattened, its sub-paths are resampled at an even spacing and closed,
//! and the path is filled with the non-zero rule. The filled paths are then unioned. Transforms and non-path shapes
//! are ignored.

use std::fs;
use std::path::Path;

use lyon::extra::parser::{ParserOptions, PathParser, Source};
use lyon::path::builder::Build;
use lyon::path::iterator::PathIterator;
use lyon::path::PathEvent;
use log::{debug, info, trace};
use quick_xml::events::Event;
use quick_xml::Reader;
use thiserror::Error;

use crate::config::ImportOptions;
use crate::geometry::clipping::{repair, union_all};
use crate::geometry::{GeometryError, Region};
use crate::normalize::{import_svg_motif, NormalizeError};
use crate::Position;

/// Minimum number of samples per sub-path.
pub const MIN_SAMPLES: usize = 8;

const FLATTEN_TOLERANCE: f32 = 0.01;

#[derive(Error, Debug)]
pub enum SvgError {
    #[error("XML error: {0}")]
    Xml(String),
    #[error("Invalid path data: {0}")]
    PathData(String),
    #[error("No closed geometry in SVG")]
    NoGeometry,
    #[error(transparent)]
    Geometry(#[from] GeometryError),
    #[error(transparent)]
    Normalize(#[from] NormalizeError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// The `d` attribute of every `path` element, in document order.
pub fn path_data(source: &str) -> Result<Vec<String>, SvgError> {
    let mut reader = Reader::from_str(source);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut paths = vec![];

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref element)) | Ok(Event::Empty(ref element))
                if element.local_name().as_ref() == b"path" =>
            {
                for attribute in element.attributes() {
                    let attribute = attribute.map_err(|error| SvgError::Xml(error.to_string()))?;
                    if attribute.key.local_name().as_ref() == b"d" {
                        let value = std::str::from_utf8(&attribute.value)
                            .map_err(|error| SvgError::Xml(error.to_string()))?;
                        paths.push(value.to_string());
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(error) => return Err(SvgError::Xml(error.to_string())),
            _ => {}
        }
        buf.clear();
    }

    Ok(paths)
}

fn sub_paths(d: &str) -> Result<Vec<Vec<Position>>, SvgError> {
    let mut builder = lyon::path::Path::builder().with_svg();
    PathParser::new()
        .parse(&ParserOptions::DEFAULT, &mut Source::new(d.chars()), &mut builder)
        .map_err(|error| SvgError::PathData(format!("{:?}", error)))?;
    let path = builder.build();

    let mut polylines = vec![];
    let mut current: Vec<Position> = vec![];
    for event in path.iter().flattened(FLATTEN_TOLERANCE) {
        match event {
            PathEvent::Begin { at } => {
                current = vec![Position::new(at.x as f64, at.y as f64)];
            }
            PathEvent::Line { to, .. } => {
                current.push(Position::new(to.x as f64, to.y as f64));
            }
            PathEvent::End { .. } => {
                polylines.push(std::mem::take(&mut current));
            }
            _ => {}
        }
    }

    Ok(polylines)
}

/// Drops the closing vertex when the polyline ends where it started.
fn open_ring(mut polyline: Vec<Position>) -> Vec<Position> {
    if polyline.len() > 1 && polyline.first() == polyline.last() {
        polyline.pop();
    }
    polyline
}

/// Resamples a closed ring at an even arc-length spacing, with at least [`MIN_SAMPLES`] samples.
///
/// Returns an empty ring when the input has no length.
pub fn resample_ring(ring: &[Position], spacing: f64) -> Vec<Position> {
    if ring.len() < 2 {
        return vec![];
    }

    let segments: Vec<(Position, Position)> = ring
        .iter()
        .zip(ring.iter().cycle().skip(1))
        .map(|(start, end)| (*start, *end))
        .collect();
    let length: f64 = segments
        .iter()
        .map(|(start, end)| (end - start).norm())
        .sum();
    if length <= f64::EPSILON {
        return vec![];
    }

    let count = ((length / spacing).ceil() as usize).max(MIN_SAMPLES);
    let step = length / count as f64;

    let mut samples = Vec::with_capacity(count);
    let mut segment = 0;
    let mut walked = 0.0;
    for index in 0..count {
        let distance = index as f64 * step;
        loop {
            let (start, end) = segments[segment];
            let segment_length = (end - start).norm();
            if distance <= walked + segment_length || segment == segments.len() - 1 {
                let t = if segment_length > 0.0 {
                    ((distance - walked) / segment_length).clamp(0.0, 1.0)
                } else {
                    0.0
                };
                samples.push(start + (end - start) * t);
                break;
            }
            walked += segment_length;
            segment += 1;
        }
    }

    samples
}

/// Fills one path element, every sub-path closed and resampled.
pub fn path_to_region(d: &str, spacing: f64) -> Result<Region, SvgError> {
    let rings: Vec<Vec<Position>> = sub_paths(d)?
        .into_iter()
        .map(|polyline| resample_ring(&open_ring(polyline), spacing))
        .filter(|ring| ring.len() >= 3)
        .collect();

    trace!("path with {} ring(s)", rings.len());
    Ok(repair(&rings)?)
}

/// Union of all filled paths of an SVG document, in SVG user units. Empty when nothing encloses an area.
pub fn svg_to_region(source: &str, spacing: f64) -> Result<Region, SvgError> {
    let regions = path_data(source)?
        .iter()
        .map(|d| path_to_region(d, spacing))
        .collect::<Result<Vec<_>, _>>()?;

    let regions: Vec<Region> = regions
        .into_iter()
        .filter(|region| !region.is_empty())
        .collect();
    debug!("{} path(s) with area", regions.len());

    Ok(union_all(&regions)?)
}

/// Loads SVG artwork as a motif: filled, scaled to the configured width, mirrored and moved to the origin.
pub fn load_svg(path: &Path, options: &ImportOptions) -> Result<Region, SvgError> {
    let source = fs::read_to_string(path)?;
    let region = svg_to_region(&source, options.svg_sample_spacing)?;
    if region.is_empty() {
        return Err(SvgError::NoGeometry);
    }

    let motif = import_svg_motif(&region, options.svg_target_width)?;
    info!(
        "SVG loaded, path: {}, parts: {}, size: {:?}",
        path.display(),
        motif.part_count(),
        motif.bounding_box().size()
    );
    Ok(motif)
}

//! Combines fabrication layers into one region in millimetres, oriented for printing.

use std::fs::File;
use std::path::{Path, PathBuf};

use log::{info, warn};
use thiserror::Error;

use crate::config::ImportOptions;
use crate::geometry::clipping::union_all;
use crate::geometry::{GeometryError, Mirroring, Region};
use crate::interpreter::primitive_to_region;
use crate::layer::FabricationLayer;

#[derive(Error, Debug)]
pub enum CompositeError {
    #[error("No geometry produced")]
    NoGeometry,
    #[error(transparent)]
    Geometry(#[from] GeometryError),
}

/// Names pre-selected when a fabrication set is opened.
const DEFAULT_LAYER_KEYS: [&str; 9] = [
    "top",
    "bottom",
    "copper",
    "cu",
    "mask",
    "soldermask",
    "solder_mask",
    "silk",
    "legend",
];

/// Whether a layer file is selected by default, based on its name.
pub fn default_layer_selection(name: &str) -> bool {
    let name = name.to_lowercase();
    DEFAULT_LAYER_KEYS
        .iter()
        .any(|key| name.contains(key))
}

/// Union of every primitive of the layer, scaled to millimetres.
pub fn layer_to_region(layer: &FabricationLayer, options: &ImportOptions) -> Result<Region, GeometryError> {
    let unit_scale = layer.units().scale_to_mm();

    let shapes: Vec<Region> = layer
        .primitives()
        .iter()
        .map(|primitive| primitive_to_region(primitive, unit_scale, options))
        .filter(|region| !region.is_empty())
        .collect();

    union_all(&shapes)
}

/// Moves the region to the origin, mirrors it through the origin on both axes and moves it back to the origin.
pub fn orient_for_print(region: &Region) -> Region {
    region
        .translate_to_origin()
        .mirror(Mirroring::BOTH)
        .translate_to_origin()
}

/// Keeps the layer regions with geometry. Layers whose interpretation failed are logged and excluded.
fn usable_layer_regions<'a>(results: impl IntoIterator<Item = (&'a str, Result<Region, GeometryError>)>) -> Vec<Region> {
    let mut regions = vec![];

    for (name, result) in results {
        let region = match result {
            Ok(region) => region,
            Err(error) => {
                warn!("Excluding layer '{}', cause: {}", name, error);
                continue;
            }
        };
        if region.is_empty() {
            info!("Layer '{}' has no geometry, excluding it", name);
            continue;
        }
        info!(
            "Layer '{}': {} part(s), area: {:.3} mm²",
            name,
            region.part_count(),
            region.area()
        );
        regions.push(region);
    }

    regions
}

/// Union of all layers, oriented for printing. Empty layers and layers whose geometry fails are excluded.
#[profiling::function]
pub fn combine_layers(layers: &[FabricationLayer], options: &ImportOptions) -> Result<Region, CompositeError> {
    let regions = usable_layer_regions(
        layers
            .iter()
            .map(|layer| (layer.name(), layer_to_region(layer, options))),
    );

    let combined = union_all(&regions)?;
    if combined.is_empty() {
        return Err(CompositeError::NoGeometry);
    }

    Ok(orient_for_print(&combined))
}

fn file_name(path: &Path) -> Option<&str> {
    path.file_name()
        .and_then(|name| name.to_str())
}

/// Parses the files whose names are in `selected`. Unreadable or unparsable files are logged and skipped.
pub fn load_layers(files: &[PathBuf], selected: &[String]) -> Vec<FabricationLayer> {
    files
        .iter()
        .filter(|path| file_name(path).is_some_and(|name| selected.iter().any(|selected| selected == name)))
        .filter_map(|path| {
            let name = file_name(path).unwrap_or_default();
            let file = File::open(path)
                .inspect_err(|error| warn!("Unable to open {}: {}", path.display(), error))
                .ok()?;

            FabricationLayer::parse(name, file)
                .inspect_err(|error| warn!("{}", error))
                .ok()
        })
        .collect()
}

/// Loads the selected files and combines them.
pub fn load_gerber_files(
    files: &[PathBuf],
    selected: &[String],
    options: &ImportOptions,
) -> Result<Region, CompositeError> {
    let layers = load_layers(files, selected);
    info!("Loaded {} of {} file(s)", layers.len(), files.len());

    combine_layers(&layers, options)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use gerber_types::Unit;
    use rstest::rstest;

    use super::*;
    use crate::testing::gerber::pad_layer_commands;
    use crate::testing::gerber_commands_to_source;
    use crate::Position;

    #[rstest]
    #[case("board-F_Cu.gtl", true)]
    #[case("TOP.GBR", true)]
    #[case("board-B_Mask.gbs", true)]
    #[case("legend.gto", true)]
    #[case("board-Edge_Cuts.gm1", true)]
    #[case("drill.drl", false)]
    #[case("outline.gko", false)]
    fn test_default_layer_selection(#[case] name: &str, #[case] expected: bool) {
        assert_eq!(default_layer_selection(name), expected);
    }

    #[test]
    fn test_combine_mixed_units() {
        // given
        let millimeters = FabricationLayer::from_commands(
            "top.gtl",
            &pad_layer_commands(Unit::Millimeters, &[(10.0, 10.0)], 2.0),
        );
        let inches = FabricationLayer::from_commands(
            "bottom.gbl",
            &pad_layer_commands(Unit::Inches, &[(0.0, 0.0)], 0.1),
        );

        // when
        let region = combine_layers(&[millimeters, inches], &ImportOptions::default()).unwrap();

        // then
        assert_eq!(region.part_count(), 2);
        let bbox = region.bounding_box();
        assert!(bbox.min.x.abs() < 1e-9 && bbox.min.y.abs() < 1e-9);
        // 10 mm apart, plus the two radii
        assert!((bbox.width() - (10.0 + 1.0 + 1.27)).abs() < 0.01);
    }

    #[test]
    fn test_orientation_mirrors_both_axes() {
        // given
        let small = 0.5;
        let large = 2.0;
        let small_layer = FabricationLayer::from_commands("top.gtl", &pad_layer_commands(Unit::Millimeters, &[(0.0, 0.0)], small));
        let large_layer =
            FabricationLayer::from_commands("top_silk.gto", &pad_layer_commands(Unit::Millimeters, &[(10.0, 10.0)], large));

        // when
        let region = combine_layers(&[small_layer, large_layer], &ImportOptions::default()).unwrap();

        // then
        // the small pad was bottom-left and ends up top-right
        let bbox = region.bounding_box();
        let small_center = Position::new(bbox.max.x - small / 2.0, bbox.max.y - small / 2.0);
        let large_center = Position::new(large / 2.0, large / 2.0);
        assert!(region.contains_point(small_center));
        assert!(region.contains_point(large_center));
    }

    #[test]
    fn test_empty_layers() {
        // given
        let layer = FabricationLayer::from_commands("empty.gbr", &pad_layer_commands(Unit::Millimeters, &[], 1.0));

        // when
        let result = combine_layers(&[layer], &ImportOptions::default());

        // then
        assert!(matches!(result, Err(CompositeError::NoGeometry)));
    }

    #[test]
    fn test_failed_layer_is_excluded() {
        // given
        let pad = Region::from_polygon(crate::geometry::shapes::disk(Position::new(1.0, 1.0), 1.0));
        let results = vec![
            ("top.gtl", Ok(pad)),
            ("broken.gbl", Err(GeometryError::BooleanOperation("overflow".to_string()))),
            ("empty.gto", Ok(Region::empty())),
        ];

        // when
        let regions = usable_layer_regions(results);

        // then
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].part_count(), 1);
    }

    #[test]
    fn test_load_selected_files() {
        // given
        let directory = tempfile::tempdir().unwrap();
        let selected_path = directory.path().join("top.gtl");
        let unselected_path = directory.path().join("bottom.gbl");
        let broken_path = directory.path().join("broken.gbr");
        let missing_path = directory.path().join("missing.gbr");

        fs::write(
            &selected_path,
            gerber_commands_to_source(&pad_layer_commands(Unit::Millimeters, &[(1.0, 1.0)], 1.0)),
        )
        .unwrap();
        fs::write(
            &unselected_path,
            gerber_commands_to_source(&pad_layer_commands(Unit::Millimeters, &[(50.0, 1.0)], 1.0)),
        )
        .unwrap();
        fs::write(&broken_path, "this is not gerber").unwrap();

        let files = vec![selected_path, unselected_path, broken_path, missing_path];
        let selected = vec!["top.gtl".to_string(), "broken.gbr".to_string(), "missing.gbr".to_string()];

        // when
        let region = load_gerber_files(&files, &selected, &ImportOptions::default()).unwrap();

        // then
        assert_eq!(region.part_count(), 1);
        assert!(region.bounding_box().width() < 1.1);
    }
}

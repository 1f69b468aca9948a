//! Panel, printer and import settings.
//!
//! All settings have defaults matching an Elegoo Mars 2 class printer and a 128 x 81 mm frame panel.

/// The printable panel that a motif is cut out of.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PanelConfig {
    /// mm
    pub width: f64,
    /// mm
    pub height: f64,
    /// Extrusion height of the relief frame, mm
    pub frame_height: f64,
}

impl Default for PanelConfig {
    fn default() -> Self {
        let printer = PrinterProfile::default();
        Self {
            width: printer.width_px as f64 * printer.pixel_size,
            height: printer.height_px as f64 * printer.pixel_size,
            frame_height: 2.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PrinterProfile {
    pub width_px: u32,
    pub height_px: u32,
    /// mm per pixel
    pub pixel_size: f32,
    /// mm
    pub layer_height: f32,
    /// seconds
    pub exposure: f32,
}

impl Default for PrinterProfile {
    fn default() -> Self {
        Self {
            width_px: 2560,
            height_px: 1620,
            pixel_size: 0.05,
            layer_height: 0.05,
            exposure: 2.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ImportOptions {
    /// Stroke width for draws without a usable width, mm
    pub default_trace_width: f64,
    /// Pad size used when a pad has no usable bounds, mm
    pub default_pad_size: f64,
    /// Distance between resampled points on SVG paths, in SVG user units
    pub svg_sample_spacing: f64,
    /// Width that imported SVG artwork is scaled to, mm
    pub svg_target_width: f64,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            default_trace_width: 0.25,
            default_pad_size: 0.8,
            svg_sample_spacing: 1.0,
            svg_target_width: 40.0,
        }
    }
}

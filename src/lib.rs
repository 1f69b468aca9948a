//! Fabrication layers and vector artwork in, relief frames and MSLA print jobs out.
//!
//! Gerber layers are interpreted into polygon regions ([`layer`], [`interpreter`]), combined ([`compositor`]) and
//! placed ([`normalize`]). The placed motif is cut out of a panel and extruded ([`mesh`]). Separately, rasterized layer
//! images are encoded into a CTB job ([`print_job`]).

pub mod archive;
pub mod compositor;
pub mod config;
mod expressions;
pub mod geometry;
pub mod interpreter;
pub mod layer;
pub mod mesh;
pub mod normalize;
mod output;
pub mod primitive;
pub mod print_job;
pub mod spacial;
pub mod svg;
pub mod types;

/// re-export 'gerber_parser' crate
pub use gerber_parser;
/// re-export 'gerber_types' crate
pub use gerber_types;
/// re-export 'image' crate, print job layers are `image::GrayImage`s
pub use image;

pub use archive::{collect_gerber_files, GerberSource};
pub use compositor::{combine_layers, load_gerber_files};
pub use config::{ImportOptions, PanelConfig, PrinterProfile};
pub use geometry::{BoundingBox, Polygon, Region};
pub use layer::FabricationLayer;
pub use mesh::export::export_mesh;
pub use mesh::{build_relief_mesh, Mesh};
pub use print_job::{encode_front_back, write_ctb};
pub use spacial::{Position, Vector};

#[cfg(any(test, feature = "testing"))]
pub mod testing;

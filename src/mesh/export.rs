//! STL and 3MF output of a mesh.
//!
//! Files are assembled in memory and written atomically.

use std::io::{Cursor, Write};
use std::path::Path;

use log::info;
use nalgebra::Vector3;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use quick_xml::Writer;
use thiserror::Error;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use super::Mesh;
use crate::output::write_atomically;

const CONTENT_TYPES_PATH: &str = "[Content_Types].xml";
const RELS_PATH: &str = "_rels/.rels";
const MODEL_PATH: &str = "3D/3dmodel.model";

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
  <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
  <Default Extension="model" ContentType="application/vnd.ms-package.3dmanufacturing-3dmodel+xml"/>
</Types>"#;

const RELS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Target="/3D/3dmodel.model" Id="rel0" Type="http://schemas.microsoft.com/3dmanufacturing/2013/01/3dmodel"/>
</Relationships>"#;

const CORE_NAMESPACE: &str = "http://schemas.microsoft.com/3dmanufacturing/core/2015/02";

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Unsupported mesh format: '{0}'")]
    UnsupportedFormat(String),
    #[error("Mesh has no triangles")]
    EmptyMesh,
    #[error("STL error: {0}")]
    Stl(String),
    #[error("XML error: {0}")]
    Xml(String),
    #[error("Zip error: {0}")]
    Zip(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeshFormat {
    Stl,
    ThreeMf,
}

impl MeshFormat {
    /// Selected by the (case-insensitive) file extension.
    pub fn from_path(path: &Path) -> Result<Self, ExportError> {
        let extension = path
            .extension()
            .and_then(|extension| extension.to_str())
            .map(|extension| extension.to_lowercase())
            .unwrap_or_default();

        match extension.as_str() {
            "stl" => Ok(MeshFormat::Stl),
            "3mf" => Ok(MeshFormat::ThreeMf),
            _ => Err(ExportError::UnsupportedFormat(extension)),
        }
    }
}

/// Binary STL.
pub fn stl_bytes(mesh: &Mesh) -> Result<Vec<u8>, ExportError> {
    let triangles: Vec<stl_io::Triangle> = mesh
        .triangles
        .iter()
        .map(|triangle| {
            let [a, b, c] = mesh.triangle_vertices(triangle);
            let normal = (b - a)
                .cross(&(c - a))
                .try_normalize(f64::EPSILON)
                .unwrap_or_else(Vector3::zeros);

            stl_io::Triangle {
                normal: stl_io::Normal::new([normal.x as f32, normal.y as f32, normal.z as f32]),
                vertices: [a, b, c].map(|vertex| stl_io::Vertex::new([vertex.x as f32, vertex.y as f32, vertex.z as f32])),
            }
        })
        .collect();

    let mut bytes = Vec::new();
    stl_io::write_stl(&mut bytes, triangles.iter()).map_err(|error| ExportError::Stl(error.to_string()))?;

    Ok(bytes)
}

fn xml_error(error: impl std::fmt::Display) -> ExportError {
    ExportError::Xml(error.to_string())
}

/// The 3MF model part.
pub fn model_xml(mesh: &Mesh) -> Result<Vec<u8>, ExportError> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);

    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(xml_error)?;

    let mut model = BytesStart::new("model");
    model.push_attribute(("unit", "millimeter"));
    model.push_attribute(("xml:lang", "en-US"));
    model.push_attribute(("xmlns", CORE_NAMESPACE));
    writer
        .write_event(Event::Start(model))
        .map_err(xml_error)?;

    writer
        .write_event(Event::Start(BytesStart::new("resources")))
        .map_err(xml_error)?;

    let mut object = BytesStart::new("object");
    object.push_attribute(("id", "1"));
    object.push_attribute(("type", "model"));
    writer
        .write_event(Event::Start(object))
        .map_err(xml_error)?;
    writer
        .write_event(Event::Start(BytesStart::new("mesh")))
        .map_err(xml_error)?;

    writer
        .write_event(Event::Start(BytesStart::new("vertices")))
        .map_err(xml_error)?;
    for vertex in &mesh.vertices {
        let mut element = BytesStart::new("vertex");
        element.push_attribute(("x", vertex.x.to_string().as_str()));
        element.push_attribute(("y", vertex.y.to_string().as_str()));
        element.push_attribute(("z", vertex.z.to_string().as_str()));
        writer
            .write_event(Event::Empty(element))
            .map_err(xml_error)?;
    }
    writer
        .write_event(Event::End(BytesEnd::new("vertices")))
        .map_err(xml_error)?;

    writer
        .write_event(Event::Start(BytesStart::new("triangles")))
        .map_err(xml_error)?;
    for [v1, v2, v3] in &mesh.triangles {
        let mut element = BytesStart::new("triangle");
        element.push_attribute(("v1", v1.to_string().as_str()));
        element.push_attribute(("v2", v2.to_string().as_str()));
        element.push_attribute(("v3", v3.to_string().as_str()));
        writer
            .write_event(Event::Empty(element))
            .map_err(xml_error)?;
    }
    writer
        .write_event(Event::End(BytesEnd::new("triangles")))
        .map_err(xml_error)?;

    for name in ["mesh", "object", "resources"] {
        writer
            .write_event(Event::End(BytesEnd::new(name)))
            .map_err(xml_error)?;
    }

    writer
        .write_event(Event::Start(BytesStart::new("build")))
        .map_err(xml_error)?;
    let mut item = BytesStart::new("item");
    item.push_attribute(("objectid", "1"));
    writer
        .write_event(Event::Empty(item))
        .map_err(xml_error)?;
    for name in ["build", "model"] {
        writer
            .write_event(Event::End(BytesEnd::new(name)))
            .map_err(xml_error)?;
    }

    Ok(writer.into_inner())
}

fn zip_error(error: impl std::fmt::Display) -> ExportError {
    ExportError::Zip(error.to_string())
}

/// A 3MF package: content types, relationships and the model.
pub fn three_mf_bytes(mesh: &Mesh) -> Result<Vec<u8>, ExportError> {
    let model = model_xml(mesh)?;

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();

    for (path, content) in [
        (CONTENT_TYPES_PATH, CONTENT_TYPES.as_bytes()),
        (RELS_PATH, RELS.as_bytes()),
        (MODEL_PATH, model.as_slice()),
    ] {
        zip.start_file(path, options)
            .map_err(zip_error)?;
        zip.write_all(content)?;
    }

    let cursor = zip.finish().map_err(zip_error)?;
    Ok(cursor.into_inner())
}

/// Writes the mesh in the format selected by the path's extension.
#[profiling::function]
pub fn export_mesh(mesh: &Mesh, path: &Path) -> Result<MeshFormat, ExportError> {
    let format = MeshFormat::from_path(path)?;
    if mesh.is_empty() {
        return Err(ExportError::EmptyMesh);
    }

    let bytes = match format {
        MeshFormat::Stl => stl_bytes(mesh)?,
        MeshFormat::ThreeMf => three_mf_bytes(mesh)?,
    };
    write_atomically(path, &bytes)?;

    info!(
        "exported {:?}, triangles: {}, path: {}",
        format,
        mesh.triangle_count(),
        path.display()
    );

    Ok(format)
}

#[cfg(test)]
mod tests {
    use std::io::Read;

    use nalgebra::Point3;
    use rstest::rstest;

    use super::*;

    fn tetrahedron() -> Mesh {
        Mesh {
            vertices: vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
                Point3::new(0.0, 0.0, 1.0),
            ],
            triangles: vec![[0, 2, 1], [0, 1, 3], [1, 2, 3], [0, 3, 2]],
        }
    }

    #[rstest]
    #[case("frame.stl", Some(MeshFormat::Stl))]
    #[case("FRAME.STL", Some(MeshFormat::Stl))]
    #[case("frame.3mf", Some(MeshFormat::ThreeMf))]
    #[case("frame.obj", None)]
    #[case("frame", None)]
    fn test_format_from_path(#[case] path: &str, #[case] expected: Option<MeshFormat>) {
        assert_eq!(MeshFormat::from_path(Path::new(path)).ok(), expected);
    }

    #[test]
    fn test_stl_round_trip() {
        // given
        let directory = tempfile::tempdir().unwrap();
        let path = directory.path().join("frame.stl");

        // when
        let format = export_mesh(&tetrahedron(), &path).unwrap();

        // then
        assert_eq!(format, MeshFormat::Stl);
        let mut file = std::fs::File::open(&path).unwrap();
        let stl = stl_io::read_stl(&mut file).unwrap();
        assert_eq!(stl.faces.len(), 4);
        assert_eq!(stl.vertices.len(), 4);
    }

    #[test]
    fn test_three_mf_package() {
        // given
        let directory = tempfile::tempdir().unwrap();
        let path = directory.path().join("frame.3mf");

        // when
        export_mesh(&tetrahedron(), &path).unwrap();

        // then
        let mut archive = zip::ZipArchive::new(std::fs::File::open(&path).unwrap()).unwrap();
        assert!(archive.by_name(CONTENT_TYPES_PATH).is_ok());
        assert!(archive.by_name(RELS_PATH).is_ok());

        let mut model = String::new();
        archive
            .by_name(MODEL_PATH)
            .unwrap()
            .read_to_string(&mut model)
            .unwrap();
        assert!(model.contains(r#"unit="millimeter""#));
        assert_eq!(model.matches("<vertex ").count(), 4);
        assert_eq!(model.matches("<triangle ").count(), 4);
        assert!(model.contains(r#"<item objectid="1"/>"#));
    }

    #[test]
    fn test_unsupported_format_writes_nothing() {
        // given
        let directory = tempfile::tempdir().unwrap();
        let path = directory.path().join("frame.obj");

        // when
        let result = export_mesh(&tetrahedron(), &path);

        // then
        assert!(matches!(result, Err(ExportError::UnsupportedFormat(_))));
        assert!(!path.exists());
    }

    #[test]
    fn test_empty_mesh() {
        // given
        let directory = tempfile::tempdir().unwrap();
        let path = directory.path().join("frame.stl");

        // expect
        assert!(matches!(export_mesh(&Mesh::default(), &path), Err(ExportError::EmptyMesh)));
        assert!(!path.exists());
    }
}

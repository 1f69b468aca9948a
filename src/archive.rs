//! Collects fabrication files from a single file or a zip archive.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use tempfile::TempDir;
use thiserror::Error;
use zip::ZipArchive;

pub const GERBER_EXTENSIONS: [&str; 14] = [
    "gbr", "ger", "gtl", "gbl", "gto", "gbo", "gts", "gbs", "gtp", "gbp", "gko", "gml", "gdl", "gm1",
];
pub const DRILL_EXTENSIONS: [&str; 2] = ["drl", "xln"];

#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("Input not found: {0}")]
    NotFound(PathBuf),
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Fabrication files ready to be parsed. When they came from an archive they live in a temporary directory that is
/// removed when this is dropped.
#[derive(Debug)]
pub struct GerberSource {
    files: Vec<PathBuf>,
    extracted: Option<TempDir>,
}

impl GerberSource {
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    /// File names, in the same order as [`Self::files`].
    pub fn file_names(&self) -> Vec<String> {
        self.files
            .iter()
            .filter_map(|path| path.file_name())
            .map(|name| name.to_string_lossy().into_owned())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// The extraction directory, if the files came from an archive.
    pub fn extracted_to(&self) -> Option<&Path> {
        self.extracted
            .as_ref()
            .map(|directory| directory.path())
    }
}

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|extension| extension.to_str())
        .map(|extension| extension.to_lowercase())
        .is_some_and(|extension| extensions.contains(&extension.as_str()))
}

/// Whether a file is a Gerber or drill file, by extension.
pub fn is_fabrication_file(path: &Path) -> bool {
    has_extension(path, &GERBER_EXTENSIONS) || has_extension(path, &DRILL_EXTENSIONS)
}

fn collect_recursive(directory: &Path, files: &mut Vec<PathBuf>) -> io::Result<()> {
    for entry in fs::read_dir(directory)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_recursive(&path, files)?;
        } else if is_fabrication_file(&path) {
            files.push(path);
        }
    }
    Ok(())
}

fn extract(path: &Path) -> Result<GerberSource, ArchiveError> {
    let directory = tempfile::Builder::new()
        .prefix("gerber_")
        .tempdir()?;

    let extracted = File::open(path)
        .map_err(|error| error.to_string())
        .and_then(|file| ZipArchive::new(file).map_err(|error| error.to_string()))
        .and_then(|mut archive| {
            archive
                .extract(directory.path())
                .map_err(|error| error.to_string())
        });

    if let Err(reason) = extracted {
        warn!("Unable to extract archive, path: {}, reason: {}", path.display(), reason);
        return Ok(GerberSource {
            files: vec![],
            extracted: None,
        });
    }

    let mut files = vec![];
    collect_recursive(directory.path(), &mut files)?;
    files.sort();

    debug!("extracted {} to {}", path.display(), directory.path().display());

    Ok(GerberSource {
        files,
        extracted: Some(directory),
    })
}

/// A `.zip` path is extracted and searched for fabrication files, any other path is taken as a single file.
///
/// A corrupt archive is logged and yields no files; a missing path is an error.
pub fn collect_gerber_files(path: &Path) -> Result<GerberSource, ArchiveError> {
    if !path.exists() {
        return Err(ArchiveError::NotFound(path.to_path_buf()));
    }

    let source = match has_extension(path, &["zip"]) {
        true => extract(path)?,
        false => GerberSource {
            files: vec![path.to_path_buf()],
            extracted: None,
        },
    };

    info!("Collected {} file(s) from {}", source.files.len(), path.display());
    Ok(source)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use rstest::rstest;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    use super::*;

    fn write_zip(path: &Path, entries: &[(&str, &str)]) {
        let mut zip = ZipWriter::new(File::create(path).unwrap());
        for (name, content) in entries {
            zip.start_file(*name, SimpleFileOptions::default())
                .unwrap();
            zip.write_all(content.as_bytes()).unwrap();
        }
        zip.finish().unwrap();
    }

    #[rstest]
    #[case("board-F_Cu.gbr", true)]
    #[case("BOARD.GTL", true)]
    #[case("board.gm1", true)]
    #[case("board.drl", true)]
    #[case("board.XLN", true)]
    #[case("readme.txt", false)]
    #[case("board", false)]
    fn test_is_fabrication_file(#[case] name: &str, #[case] expected: bool) {
        assert_eq!(is_fabrication_file(Path::new(name)), expected);
    }

    #[test]
    fn test_single_file() {
        // given
        let directory = tempfile::tempdir().unwrap();
        let path = directory.path().join("top.gtl");
        fs::write(&path, "%MOMM*%\nM02*\n").unwrap();

        // when
        let source = collect_gerber_files(&path).unwrap();

        // then
        assert_eq!(source.files(), &[path]);
        assert!(source.extracted_to().is_none());
    }

    #[test]
    fn test_archive_is_extracted_and_filtered() {
        // given
        let directory = tempfile::tempdir().unwrap();
        let path = directory.path().join("board.zip");
        write_zip(&path, &[
            ("board-F_Cu.gtl", "M02*"),
            ("gerbers/board-B_Cu.gbl", "M02*"),
            ("board.drl", "M30"),
            ("readme.txt", "hello"),
        ]);

        // when
        let source = collect_gerber_files(&path).unwrap();

        // then
        let mut names = source.file_names();
        names.sort();
        assert_eq!(names, vec!["board-B_Cu.gbl", "board-F_Cu.gtl", "board.drl"]);

        let extracted = source
            .extracted_to()
            .unwrap()
            .to_path_buf();
        assert!(source
            .files()
            .iter()
            .all(|file| file.starts_with(&extracted)));

        // and the extraction directory goes away with the source
        drop(source);
        assert!(!extracted.exists());
    }

    #[test]
    fn test_corrupt_archive_yields_no_files() {
        // given
        let directory = tempfile::tempdir().unwrap();
        let path = directory.path().join("broken.zip");
        fs::write(&path, b"not a zip file").unwrap();

        // when
        let source = collect_gerber_files(&path).unwrap();

        // then
        assert!(source.is_empty());
    }

    #[test]
    fn test_missing_path() {
        // given
        let directory = tempfile::tempdir().unwrap();
        let path = directory.path().join("missing.zip");

        // expect
        assert!(matches!(collect_gerber_files(&path), Err(ArchiveError::NotFound(_))));
    }
}

use std::io::{self, Write};
use std::path::Path;

use log::debug;
use tempfile::NamedTempFile;

/// Writes `bytes` to a temporary file next to `path` and moves it into place, so `path` either keeps its previous
/// content or holds the complete new content.
pub fn write_atomically(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut file = NamedTempFile::new_in(directory)?;
    file.write_all(bytes)?;
    file.as_file().sync_all()?;
    file.persist(path)
        .map_err(|error| error.error)?;

    debug!("wrote {} bytes to {}", bytes.len(), path.display());
    Ok(())
}

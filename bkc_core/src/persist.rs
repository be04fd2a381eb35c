//! Atomic replacement of the calendar file.

use std::{
    io::{self, Write},
    path::Path,
};

use tempfile::NamedTempFile;

use crate::error::{Error, Result};

/// Write `contents` to `path` so that readers see either the old or the new file.
///
/// The data goes to a temporary file next to `path` first, which is renamed
/// over `path` once it is complete. The temporary file is removed on failure.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let persistence = |source: io::Error| Error::Persistence {
        path: path.to_path_buf(),
        source,
    };
    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut file = NamedTempFile::new_in(directory).map_err(persistence)?;
    file.write_all(contents).map_err(persistence)?;
    file.as_file().sync_all().map_err(persistence)?;
    file.persist(path).map_err(|err| persistence(err.error))?;
    Ok(())
}

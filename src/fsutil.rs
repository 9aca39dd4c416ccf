//! Namespace provider: filesystem access for the task tree.
//!
//! Queue construction and lazy script reads go through these helpers so
//! that I/O faults surface as crate errors instead of partial trees. Any
//! failure here is fatal to the run.

use std::path::{Path, PathBuf};

use crate::{Error, Result};

/// Check whether a path exists.
pub fn exists(path: &Path) -> bool {
    path.exists()
}

/// Check whether a path is a directory.
pub fn is_directory(path: &Path) -> bool {
    path.is_dir()
}

/// List the entries of a directory.
///
/// Returns the full path of every entry, unsorted and unfiltered; the
/// queue builder applies its own ordering and suffix filter. Enumeration
/// failure is an error, never a partial listing.
pub fn list_entries(dir: &Path) -> Result<Vec<PathBuf>> {
    let read = std::fs::read_dir(dir).map_err(|e| Error::ListDir {
        path: dir.display().to_string(),
        source: e,
    })?;

    let mut entries = Vec::new();
    for entry in read {
        let entry = entry.map_err(|e| Error::ListDir {
            path: dir.display().to_string(),
            source: e,
        })?;
        entries.push(entry.path());
    }
    Ok(entries)
}

/// Read a script file to a string.
pub fn read_text(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| Error::ReadScript {
        path: path.display().to_string(),
        source: e,
    })
}

//! Dataset naming and shared-file access.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use crate::error::PlotfileError;

/// Name of the shared metadata file at the top of every dataset.
pub const HEADER_FILE: &str = "Header";

/// `<root><step>` with `step` zero-padded to at least `digits` digits.
///
/// Steps wider than `digits` are printed in full.
pub fn concatenate(root: &str, step: i64, digits: usize) -> String {
    format!("{root}{step:0digits$}")
}

/// Directory of level `level` inside dataset `dir`.
pub fn level_dir(dir: &Path, level: usize) -> PathBuf {
    dir.join(format!("Level_{level}"))
}

/// Name of rank `rank`'s data file within a level directory.
pub(crate) fn data_file_name(rank: usize) -> String {
    format!("Cell_D_{rank:05}")
}

/// Open `<dir>/Header` for appending. Coordinator only.
pub fn append_header(dir: &Path) -> Result<File, PlotfileError> {
    let path = dir.join(HEADER_FILE);
    OpenOptions::new()
        .append(true)
        .open(&path)
        .map_err(|e| PlotfileError::MetadataOpen {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
}

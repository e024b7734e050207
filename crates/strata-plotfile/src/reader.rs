//! Loading a dataset back into memory.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufReader, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use strata_grid::{Fab, GridError, MultiFab};

use crate::cell_header::CellHeader;
use crate::error::PlotfileError;
use crate::fab_io::read_fab;
use crate::header::PlotHeader;
use crate::path::{level_dir, HEADER_FILE};

/// One level of a loaded dataset.
#[derive(Clone, Debug)]
pub struct LevelData {
    /// The level's box table.
    pub cell_header: CellHeader,
    /// One FAB per box, in box-array order.
    pub fabs: Vec<Fab>,
}

impl LevelData {
    /// Copy components `src_comp..src_comp + ncomp` into the valid regions
    /// of `dst`'s local FABs wherever the loaded boxes overlap them.
    pub fn fill(
        &self,
        dst: &mut MultiFab,
        src_comp: usize,
        dst_comp: usize,
        ncomp: usize,
    ) -> Result<(), GridError> {
        let valid: Vec<_> = dst.box_array().boxes().to_vec();
        for (i, dfab) in dst.iter_mut() {
            for src in &self.fabs {
                if let Some(overlap) = valid[i].intersect(&src.bx()) {
                    dfab.copy_from(src, &overlap, src_comp, dst_comp, ncomp)?;
                }
            }
        }
        Ok(())
    }
}

/// A dataset loaded from disk.
#[derive(Clone, Debug)]
pub struct PlotfileData {
    /// Directory it was read from.
    pub dir: PathBuf,
    /// Parsed shared header.
    pub header: PlotHeader,
    /// Per-level data, coarsest first.
    pub levels: Vec<LevelData>,
}

impl PlotfileData {
    /// Position of component `name` in the dataset.
    pub fn var_index(&self, name: &str) -> Option<usize> {
        self.header.var_names.iter().position(|n| n == name)
    }
}

/// Read the dataset at `dir`: header, box tables, and every data record.
pub fn read_plotfile(dir: &Path) -> Result<PlotfileData, PlotfileError> {
    let header_path = dir.join(HEADER_FILE);
    let text = fs::read_to_string(&header_path).map_err(|e| PlotfileError::io(&header_path, e))?;
    let header = PlotHeader::parse(&text, &header_path)?;

    let mut levels = Vec::with_capacity(header.levels.len());
    for l in 0..header.levels.len() {
        let ldir = level_dir(dir, l);
        let cell_path = ldir.join("Cell_H");
        let text = fs::read_to_string(&cell_path).map_err(|e| PlotfileError::io(&cell_path, e))?;
        let cell_header = CellHeader::parse(&text, &cell_path)?;
        if cell_header.ncomp != header.var_names.len() {
            return Err(PlotfileError::malformed(
                &cell_path,
                format!(
                    "{} components but the header names {}",
                    cell_header.ncomp,
                    header.var_names.len()
                ),
            ));
        }

        let mut readers: HashMap<&str, BufReader<File>> = HashMap::new();
        let mut fabs = Vec::with_capacity(cell_header.boxes.len());
        for (bx, loc) in cell_header.boxes.iter().zip(&cell_header.fabs) {
            let path = ldir.join(&loc.file);
            let reader = match readers.entry(loc.file.as_str()) {
                std::collections::hash_map::Entry::Occupied(e) => e.into_mut(),
                std::collections::hash_map::Entry::Vacant(e) => {
                    let file = File::open(&path).map_err(|err| PlotfileError::io(&path, err))?;
                    e.insert(BufReader::new(file))
                }
            };
            reader
                .seek(SeekFrom::Start(loc.offset))
                .map_err(|e| PlotfileError::io(&path, e))?;
            let fab = read_fab(reader).map_err(|e| PlotfileError::io(&path, e))?;
            if fab.bx() != *bx {
                return Err(PlotfileError::malformed(
                    &path,
                    format!("record at {} holds {} but Cell_H lists {bx}", loc.offset, fab.bx()),
                ));
            }
            fabs.push(fab);
        }
        drop(readers);
        levels.push(LevelData { cell_header, fabs });
    }

    Ok(PlotfileData {
        dir: dir.to_path_buf(),
        header,
        levels,
    })
}

//! The native multi-level dataset writer.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use strata_comm::Communicator;
use strata_core::IndexBox;
use strata_eb::EbIndexSpace;
use strata_grid::Fab;
use tracing::debug;

use crate::cell_header::{CellHeader, FabOnDisk};
use crate::error::PlotfileError;
use crate::fab_io::write_fab;
use crate::header::PlotHeader;
use crate::path::{data_file_name, level_dir, HEADER_FILE};
use crate::request::{DatasetWriter, HeaderFormat, PlotRequest, WriteSummary};
use crate::wire::{decode_report, encode_report, share_outcome, BoxEntry, RankReport};

/// Name of the component holding cut-cell volume fractions.
pub const VFRAC_NAME: &str = "vfrac";

/// Writes datasets in the layout described in the crate docs.
#[derive(Clone, Copy, Debug, Default)]
pub struct PlotfileWriter {
    format: HeaderFormat,
}

impl PlotfileWriter {
    /// A writer producing `format`.
    pub fn new(format: HeaderFormat) -> Self {
        Self { format }
    }

    /// The configured format.
    pub fn format(&self) -> HeaderFormat {
        self.format
    }
}

impl DatasetWriter for PlotfileWriter {
    fn write(
        &self,
        request: &PlotRequest<'_>,
        comm: &dyn Communicator,
    ) -> Result<WriteSummary, PlotfileError> {
        if self.format == HeaderFormat::Hdf5 {
            return Err(PlotfileError::NotImplemented {
                feature: "HDF5 plotfile".into(),
            });
        }
        request.validate()?;

        // Decided once per call: every level gets the same component list.
        let eb = request.eb.filter(|eb| eb.has_cut_cells());
        let mut var_names = request.var_names.to_vec();
        if eb.is_some() {
            var_names.push(VFRAC_NAME.to_string());
        }
        let nlevels = request.levels.len();

        let created = comm
            .is_coordinator()
            .then(|| create_dirs(request.dir, nlevels));
        share_outcome(comm, created)?;

        let mut bytes_written = 0;
        let local = write_local(request, eb, comm.rank(), &mut bytes_written);
        let report: RankReport = local.as_ref().map(Clone::clone).map_err(ToString::to_string);
        let gathered = comm.gather_bytes(encode_report(&report))?;
        let outcome = gathered.map(|payloads| write_metadata(request, &var_names, &payloads));
        share_outcome(comm, outcome).map_err(|e| match local {
            Err(own) => own,
            Ok(_) => e,
        })?;

        if comm.is_coordinator() {
            debug!(
                dir = %request.dir.display(),
                nlevels,
                nvars = var_names.len(),
                cut_cells = eb.is_some(),
                "dataset written"
            );
        }
        Ok(WriteSummary {
            dir: request.dir.to_path_buf(),
            var_names,
            nlevels,
            cut_cell_variant: eb.is_some(),
            bytes_written,
        })
    }
}

fn create_dirs(dir: &Path, nlevels: usize) -> Result<(), PlotfileError> {
    for l in 0..nlevels {
        let path = level_dir(dir, l);
        fs::create_dir_all(&path).map_err(|e| PlotfileError::MetadataOpen {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
    }
    Ok(())
}

/// Write this rank's boxes for every level.
fn write_local(
    request: &PlotRequest<'_>,
    eb: Option<&EbIndexSpace>,
    rank: usize,
    bytes_written: &mut u64,
) -> Result<Vec<Vec<BoxEntry>>, PlotfileError> {
    let mut levels = Vec::with_capacity(request.levels.len());
    for (l, mf) in request.levels.iter().enumerate() {
        let mut entries = Vec::with_capacity(mf.local_len());
        if mf.local_len() > 0 {
            let path = level_dir(request.dir, l).join(data_file_name(rank));
            let file = File::create(&path).map_err(|e| PlotfileError::io(&path, e))?;
            let mut w = BufWriter::new(file);
            let ncomp = mf.ncomp();
            let nout = ncomp + usize::from(eb.is_some());
            let mut offset = 0u64;
            for (i, fab) in mf.iter() {
                let valid = mf.box_array().boxes()[i];
                let mut out = Fab::new(valid, nout);
                out.copy_from(fab, &valid, 0, 0, ncomp)?;
                if let Some(eb) = eb {
                    let vf = eb.volume_fractions(&request.geoms[l], &valid);
                    out.comp_mut(ncomp).copy_from_slice(vf.comp(0));
                }
                let (mins, maxs) = bounds(&out, &valid);
                let n = write_fab(&mut w, &out).map_err(|e| PlotfileError::io(&path, e))?;
                entries.push(BoxEntry {
                    index: i,
                    offset,
                    mins,
                    maxs,
                });
                offset += n;
            }
            w.flush().map_err(|e| PlotfileError::io(&path, e))?;
            *bytes_written += offset;
        }
        levels.push(entries);
    }
    Ok(levels)
}

fn bounds(fab: &Fab, valid: &IndexBox) -> (Vec<f64>, Vec<f64>) {
    (0..fab.ncomp())
        .map(|c| fab.min_max(c, valid).unwrap_or((0.0, 0.0)))
        .unzip()
}

/// Coordinator: assemble box tables from every rank's report and write
/// `Cell_H` per level plus the shared `Header`.
fn write_metadata(
    request: &PlotRequest<'_>,
    var_names: &[String],
    payloads: &[Vec<u8>],
) -> Result<(), PlotfileError> {
    let nlevels = request.levels.len();
    let mut slots: Vec<Vec<Option<(FabOnDisk, Vec<f64>, Vec<f64>)>>> = request
        .levels
        .iter()
        .map(|mf| vec![None; mf.box_array().len()])
        .collect();
    for (rank, payload) in payloads.iter().enumerate() {
        let levels = decode_report(payload)?
            .map_err(|reason| PlotfileError::Remote { rank, reason })?;
        for (l, entries) in levels.into_iter().enumerate().take(nlevels) {
            for e in entries {
                let slot = slots[l].get_mut(e.index).ok_or_else(|| PlotfileError::Request {
                    detail: format!("rank {rank} wrote unknown box {} on level {l}", e.index),
                })?;
                let loc = FabOnDisk {
                    file: data_file_name(rank),
                    offset: e.offset,
                };
                *slot = Some((loc, e.mins, e.maxs));
            }
        }
    }

    for (l, level_slots) in slots.into_iter().enumerate() {
        let boxes = request.levels[l].box_array().boxes().to_vec();
        let mut fabs = Vec::with_capacity(boxes.len());
        let mut mins = Vec::with_capacity(boxes.len());
        let mut maxs = Vec::with_capacity(boxes.len());
        for (i, slot) in level_slots.into_iter().enumerate() {
            let (loc, lo, hi) = slot.ok_or_else(|| PlotfileError::Request {
                detail: format!("no rank wrote box {i} on level {l}"),
            })?;
            fabs.push(loc);
            mins.push(lo);
            maxs.push(hi);
        }
        let cell_h = CellHeader {
            ncomp: var_names.len(),
            ngrow: 0,
            boxes,
            fabs,
            mins,
            maxs,
        };
        write_metadata_file(&level_dir(request.dir, l).join("Cell_H"), &cell_h.to_text())?;
    }

    let box_lists: Vec<&[IndexBox]> = request
        .levels
        .iter()
        .map(|mf| mf.box_array().boxes())
        .collect();
    let header = PlotHeader::describe(
        var_names.to_vec(),
        request.time,
        request.geoms,
        request.ref_ratios,
        request.level_steps,
        &box_lists,
    );
    write_metadata_file(&request.dir.join(HEADER_FILE), &header.to_text())
}

fn write_metadata_file(path: &Path, text: &str) -> Result<(), PlotfileError> {
    let mut file = File::create(path).map_err(|e| PlotfileError::MetadataOpen {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    file.write_all(text.as_bytes())
        .map_err(|e| PlotfileError::io(path, e))
}

//! Top-level checkpoint metadata.
//!
//! A checkpoint directory holds one dataset per state type, in a
//! subdirectory named after the type, plus a `Header` recording what the
//! hierarchy needs to resume: cumulative time, per-level steps and time
//! steps, and the state type names.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use crate::cell_header::parse_num;
use crate::error::PlotfileError;
use crate::path::HEADER_FILE;

const CHECKPOINT_TAG: &str = "Checkpoint-V1";

/// Hierarchy state needed to resume from a checkpoint.
#[derive(Clone, Debug, PartialEq)]
pub struct CheckpointHeader {
    /// Index of the finest level.
    pub finest_level: usize,
    /// Cumulative simulated time.
    pub cum_time: f64,
    /// Step counter of each level.
    pub level_steps: Vec<i64>,
    /// Time step of each level.
    pub dt_level: Vec<f64>,
    /// Names of the saved state types, in registration order.
    pub state_types: Vec<String>,
}

impl CheckpointHeader {
    /// Render as text.
    pub fn to_text(&self) -> String {
        let mut s = String::new();
        let _ = writeln!(s, "{CHECKPOINT_TAG}");
        let _ = writeln!(s, "{}", self.finest_level);
        let _ = writeln!(s, "{}", self.cum_time);
        let _ = writeln!(s, "{}", words(&self.level_steps));
        let _ = writeln!(s, "{}", words(&self.dt_level));
        let _ = writeln!(s, "{}", self.state_types.len());
        for name in &self.state_types {
            let _ = writeln!(s, "{name}");
        }
        s
    }

    /// Parse text produced by [`CheckpointHeader::to_text`].
    pub fn parse(text: &str, path: &Path) -> Result<Self, PlotfileError> {
        let mut lines = text.lines();
        let mut next = |what: &str| {
            lines
                .next()
                .ok_or_else(|| PlotfileError::malformed(path, format!("missing {what}")))
        };
        let tag = next("format tag")?;
        if tag != CHECKPOINT_TAG {
            return Err(PlotfileError::malformed(path, format!("unknown format tag '{tag}'")));
        }
        let finest_level: usize = parse_num(next("finest level")?, path)?;
        let cum_time: f64 = parse_num(next("cumulative time")?, path)?;
        let level_steps = next("level steps")?
            .split_whitespace()
            .map(|w| parse_num::<i64>(w, path))
            .collect::<Result<Vec<_>, _>>()?;
        let dt_level = next("level time steps")?
            .split_whitespace()
            .map(|w| parse_num::<f64>(w, path))
            .collect::<Result<Vec<_>, _>>()?;
        let ntypes: usize = parse_num(next("state type count")?, path)?;
        let mut state_types = Vec::with_capacity(ntypes);
        for _ in 0..ntypes {
            state_types.push(next("state type name")?.to_string());
        }
        if level_steps.len() != finest_level + 1 || dt_level.len() != finest_level + 1 {
            return Err(PlotfileError::malformed(
                path,
                format!(
                    "finest level {finest_level} but {} steps and {} time steps",
                    level_steps.len(),
                    dt_level.len()
                ),
            ));
        }
        Ok(Self {
            finest_level,
            cum_time,
            level_steps,
            dt_level,
            state_types,
        })
    }
}

/// Dataset directory of state type `name` inside checkpoint `dir`.
pub fn state_dir(dir: &Path, name: &str) -> PathBuf {
    dir.join(name)
}

/// Write `<dir>/Header`. Coordinator only; `dir` must exist.
pub fn write_checkpoint_header(dir: &Path, header: &CheckpointHeader) -> Result<(), PlotfileError> {
    let path = dir.join(HEADER_FILE);
    fs::write(&path, header.to_text()).map_err(|e| PlotfileError::MetadataOpen {
        path: path.display().to_string(),
        reason: e.to_string(),
    })
}

/// Read `<dir>/Header`.
pub fn read_checkpoint_header(dir: &Path) -> Result<CheckpointHeader, PlotfileError> {
    let path = dir.join(HEADER_FILE);
    let text = fs::read_to_string(&path).map_err(|e| PlotfileError::io(&path, e))?;
    CheckpointHeader::parse(&text, &path)
}

fn words<T: std::fmt::Display>(items: &[T]) -> String {
    items.iter().map(ToString::to_string).collect::<Vec<_>>().join(" ")
}

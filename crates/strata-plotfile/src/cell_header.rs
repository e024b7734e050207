//! Per-level box table: `Level_<l>/Cell_H`.

use std::fmt::Write as _;
use std::path::Path;

use strata_core::IndexBox;

use crate::error::PlotfileError;

/// Location of one box's record within a level's data files.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FabOnDisk {
    /// Data file name relative to the level directory.
    pub file: String,
    /// Byte offset of the record.
    pub offset: u64,
}

/// Contents of a `Cell_H` file.
#[derive(Clone, Debug, PartialEq)]
pub struct CellHeader {
    /// Components per box.
    pub ncomp: usize,
    /// Ghost width of the stored data.
    pub ngrow: usize,
    /// Boxes in box-array order.
    pub boxes: Vec<IndexBox>,
    /// Record location of each box.
    pub fabs: Vec<FabOnDisk>,
    /// Per-box, per-component minimum.
    pub mins: Vec<Vec<f64>>,
    /// Per-box, per-component maximum.
    pub maxs: Vec<Vec<f64>>,
}

const VERSION: u32 = 1;
const HOW: u32 = 0;
const FAB_PREFIX: &str = "FabOnDisk:";

impl CellHeader {
    /// Render as text.
    pub fn to_text(&self) -> String {
        let mut s = String::new();
        let _ = writeln!(s, "{VERSION}");
        let _ = writeln!(s, "{HOW}");
        let _ = writeln!(s, "{}", self.ncomp);
        let _ = writeln!(s, "{}", self.ngrow);
        let _ = writeln!(s, "({} 0", self.boxes.len());
        for bx in &self.boxes {
            let _ = writeln!(s, "{bx}");
        }
        let _ = writeln!(s, ")");
        let _ = writeln!(s, "{}", self.fabs.len());
        for f in &self.fabs {
            let _ = writeln!(s, "{FAB_PREFIX} {} {}", f.file, f.offset);
        }
        for table in [&self.mins, &self.maxs] {
            let _ = writeln!(s);
            let _ = writeln!(s, "{},{}", table.len(), self.ncomp);
            for row in table {
                for v in row {
                    let _ = write!(s, "{v},");
                }
                let _ = writeln!(s);
            }
        }
        s
    }

    /// Parse text produced by [`CellHeader::to_text`]; `path` is used in
    /// diagnostics only.
    pub fn parse(text: &str, path: &Path) -> Result<Self, PlotfileError> {
        let bad = |detail: String| PlotfileError::malformed(path, detail);
        let mut lines = text.lines();
        let mut next = |what: &str| {
            lines
                .next()
                .ok_or_else(|| PlotfileError::malformed(path, format!("missing {what}")))
        };

        let version: u32 = parse_num(next("version")?, path)?;
        if version != VERSION {
            return Err(bad(format!("unsupported version {version}")));
        }
        let _how: u32 = parse_num(next("layout")?, path)?;
        let ncomp: usize = parse_num(next("component count")?, path)?;
        let ngrow: usize = parse_num(next("ghost width")?, path)?;

        let open = next("box list")?;
        let nboxes: usize = open
            .strip_prefix('(')
            .and_then(|r| r.split_whitespace().next())
            .ok_or_else(|| bad(format!("bad box list opener '{open}'")))
            .and_then(|n| parse_num(n, path))?;
        let mut boxes = Vec::with_capacity(nboxes);
        for _ in 0..nboxes {
            let line = next("box")?;
            boxes.push(line.parse::<IndexBox>().map_err(bad)?);
        }
        if next("box list closer")?.trim() != ")" {
            return Err(bad("unterminated box list".into()));
        }

        let nfabs: usize = parse_num(next("record count")?, path)?;
        let mut fabs = Vec::with_capacity(nfabs);
        for _ in 0..nfabs {
            let line = next("record location")?;
            let mut parts = line
                .strip_prefix(FAB_PREFIX)
                .ok_or_else(|| bad(format!("expected '{FAB_PREFIX}', found '{line}'")))?
                .split_whitespace();
            let (Some(file), Some(offset)) = (parts.next(), parts.next()) else {
                return Err(bad(format!("incomplete record location '{line}'")));
            };
            fabs.push(FabOnDisk {
                file: file.to_string(),
                offset: parse_num(offset, path)?,
            });
        }

        let mut tables = [Vec::new(), Vec::new()];
        for table in &mut tables {
            next("blank separator")?;
            let dims = next("table dimensions")?;
            let rows: usize = dims
                .split(',')
                .next()
                .ok_or_else(|| bad(format!("bad table dimensions '{dims}'")))
                .and_then(|n| parse_num(n, path))?;
            for _ in 0..rows {
                let row = next("table row")?
                    .split(',')
                    .filter(|v| !v.is_empty())
                    .map(|v| parse_num::<f64>(v, path))
                    .collect::<Result<Vec<_>, _>>()?;
                table.push(row);
            }
        }
        let [mins, maxs] = tables;

        if fabs.len() != boxes.len() || mins.len() != boxes.len() || maxs.len() != boxes.len() {
            return Err(bad(format!(
                "{} boxes but {} records, {} min rows, {} max rows",
                boxes.len(),
                fabs.len(),
                mins.len(),
                maxs.len()
            )));
        }
        Ok(Self {
            ncomp,
            ngrow,
            boxes,
            fabs,
            mins,
            maxs,
        })
    }
}

pub(crate) fn parse_num<T>(s: &str, path: &Path) -> Result<T, PlotfileError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    s.trim()
        .parse()
        .map_err(|e| PlotfileError::malformed(path, format!("bad number '{s}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_core::IntVect;

    fn sample() -> CellHeader {
        CellHeader {
            ncomp: 2,
            ngrow: 0,
            boxes: vec![
                IndexBox::new(IntVect::zero(), IntVect::splat(3)),
                IndexBox::new(IntVect::new([4, 0, 0]), IntVect::new([7, 3, 3])),
            ],
            fabs: vec![
                FabOnDisk {
                    file: "Cell_D_00000".into(),
                    offset: 0,
                },
                FabOnDisk {
                    file: "Cell_D_00001".into(),
                    offset: 0,
                },
            ],
            mins: vec![vec![0.0, -1.25], vec![0.5, 1e-300]],
            maxs: vec![vec![1.0, 2.0], vec![0.1 + 0.2, 7.0]],
        }
    }

    #[test]
    fn text_parses_back_exactly() {
        let h = sample();
        let back = CellHeader::parse(&h.to_text(), Path::new("Cell_H")).unwrap();
        assert_eq!(back, h);
    }

    #[test]
    fn count_mismatch_is_malformed() {
        let mut h = sample();
        h.fabs.pop();
        let err = CellHeader::parse(&h.to_text(), Path::new("Cell_H")).unwrap_err();
        assert!(matches!(err, PlotfileError::Malformed { .. }));
    }

    #[test]
    fn layout_starts_with_version_and_components() {
        let text = sample().to_text();
        let head: Vec<&str> = text.lines().take(5).collect();
        assert_eq!(head, vec!["1", "0", "2", "0", "(2 0"]);
        assert!(text.contains("FabOnDisk: Cell_D_00001 0"));
    }
}

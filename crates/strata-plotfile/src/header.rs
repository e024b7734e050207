//! Shared dataset metadata: `<dir>/Header`.

use std::fmt::Write as _;
use std::path::Path;

use strata_core::{IndexBox, IntVect, SPACEDIM};
use strata_grid::{CoordSys, Geometry};

use crate::cell_header::parse_num;
use crate::error::PlotfileError;

/// Format tag on the first line of every header.
pub const FORMAT_TAG: &str = "HyperCLaw-V1.1";

/// Per-level section of a [`PlotHeader`].
#[derive(Clone, Debug, PartialEq)]
pub struct LevelHeader {
    /// Level index.
    pub level: usize,
    /// Time of the level's data.
    pub time: f64,
    /// Level step counter.
    pub step: i64,
    /// Physical `[lo, hi]` extent of every box, per direction.
    pub box_extents: Vec<[[f64; 2]; SPACEDIM]>,
    /// Box table prefix relative to the dataset, e.g. `Level_0/Cell`.
    pub path: String,
}

/// Contents of a dataset `Header`.
#[derive(Clone, Debug, PartialEq)]
pub struct PlotHeader {
    /// Component names.
    pub var_names: Vec<String>,
    /// Dataset time.
    pub time: f64,
    /// Index of the finest level.
    pub finest_level: usize,
    /// Physical lower corner.
    pub prob_lo: [f64; SPACEDIM],
    /// Physical upper corner.
    pub prob_hi: [f64; SPACEDIM],
    /// Refinement ratio below each level but the finest.
    pub ref_ratios: Vec<IntVect>,
    /// Index domain of each level.
    pub domains: Vec<IndexBox>,
    /// Step counter of each level.
    pub level_steps: Vec<i64>,
    /// Cell size of each level.
    pub cell_sizes: Vec<[f64; SPACEDIM]>,
    /// Coordinate system.
    pub coord: CoordSys,
    /// Boundary width.
    pub bwidth: usize,
    /// Per-level sections.
    pub levels: Vec<LevelHeader>,
}

impl PlotHeader {
    /// Describe a dataset over `geoms` whose levels hold `box_arrays`.
    pub fn describe(
        var_names: Vec<String>,
        time: f64,
        geoms: &[Geometry],
        ref_ratios: &[IntVect],
        level_steps: &[i64],
        box_arrays: &[&[IndexBox]],
    ) -> Self {
        let coarse = &geoms[0];
        let levels = box_arrays
            .iter()
            .enumerate()
            .map(|(l, boxes)| LevelHeader {
                level: l,
                time,
                step: level_steps[l],
                box_extents: boxes.iter().map(|b| physical_extent(&geoms[l], b)).collect(),
                path: format!("Level_{l}/Cell"),
            })
            .collect();
        Self {
            var_names,
            time,
            finest_level: geoms.len() - 1,
            prob_lo: coarse.prob_lo(),
            prob_hi: coarse.prob_hi(),
            ref_ratios: ref_ratios[..geoms.len() - 1].to_vec(),
            domains: geoms.iter().map(Geometry::domain).collect(),
            level_steps: level_steps.to_vec(),
            cell_sizes: geoms.iter().map(Geometry::cell_size).collect(),
            coord: coarse.coord_sys(),
            bwidth: 0,
            levels,
        }
    }

    /// Render as text.
    pub fn to_text(&self) -> String {
        let mut s = String::new();
        let _ = writeln!(s, "{FORMAT_TAG}");
        let _ = writeln!(s, "{}", self.var_names.len());
        for name in &self.var_names {
            let _ = writeln!(s, "{name}");
        }
        let _ = writeln!(s, "{SPACEDIM}");
        let _ = writeln!(s, "{}", self.time);
        let _ = writeln!(s, "{}", self.finest_level);
        let _ = writeln!(s, "{}", join(&self.prob_lo));
        let _ = writeln!(s, "{}", join(&self.prob_hi));
        let _ = writeln!(s, "{}", join(&self.ref_ratios));
        let _ = writeln!(s, "{}", join(&self.domains));
        let _ = writeln!(s, "{}", join(&self.level_steps));
        for dx in &self.cell_sizes {
            let _ = writeln!(s, "{}", join(dx));
        }
        let _ = writeln!(s, "{}", self.coord.code());
        let _ = writeln!(s, "{}", self.bwidth);
        for lev in &self.levels {
            let _ = writeln!(s, "{} {} {}", lev.level, lev.box_extents.len(), lev.time);
            let _ = writeln!(s, "{}", lev.step);
            for ext in &lev.box_extents {
                for [lo, hi] in ext {
                    let _ = writeln!(s, "{lo} {hi}");
                }
            }
            let _ = writeln!(s, "{}", lev.path);
        }
        s
    }

    /// Parse text produced by [`PlotHeader::to_text`]. Lines after the
    /// last level section, such as those appended by level post-write
    /// hooks, are ignored.
    pub fn parse(text: &str, path: &Path) -> Result<Self, PlotfileError> {
        let bad = |detail: String| PlotfileError::malformed(path, detail);
        let mut lines = text.lines();
        let mut next = |what: &str| {
            lines
                .next()
                .ok_or_else(|| PlotfileError::malformed(path, format!("missing {what}")))
        };

        let tag = next("format tag")?;
        if tag != FORMAT_TAG {
            return Err(bad(format!("unknown format tag '{tag}'")));
        }
        let nvars: usize = parse_num(next("variable count")?, path)?;
        let mut var_names = Vec::with_capacity(nvars);
        for _ in 0..nvars {
            var_names.push(next("variable name")?.to_string());
        }
        let dim: usize = parse_num(next("dimensionality")?, path)?;
        if dim != SPACEDIM {
            return Err(bad(format!("dataset is {dim}-dimensional")));
        }
        let time: f64 = parse_num(next("time")?, path)?;
        let finest_level: usize = parse_num(next("finest level")?, path)?;
        let nlevels = finest_level + 1;
        let prob_lo = triple(next("prob_lo")?, path)?;
        let prob_hi = triple(next("prob_hi")?, path)?;
        let ref_ratios = split_parse::<IntVect>(next("refinement ratios")?, path)?;
        let domains = split_parse::<IndexBox>(next("domains")?, path)?;
        let level_steps = split_words::<i64>(next("level steps")?, path)?;
        let mut cell_sizes = Vec::with_capacity(nlevels);
        for _ in 0..nlevels {
            cell_sizes.push(triple(next("cell size")?, path)?);
        }
        let code: i32 = parse_num(next("coordinate system")?, path)?;
        let coord =
            CoordSys::from_code(code).ok_or_else(|| bad(format!("unknown coordinate system {code}")))?;
        let bwidth: usize = parse_num(next("boundary width")?, path)?;

        let mut levels = Vec::with_capacity(nlevels);
        for _ in 0..nlevels {
            let line = next("level section")?;
            let words: Vec<&str> = line.split_whitespace().collect();
            let [level, nboxes, lev_time] = words.as_slice() else {
                return Err(bad(format!("bad level section '{line}'")));
            };
            let level: usize = parse_num(level, path)?;
            let nboxes: usize = parse_num(nboxes, path)?;
            let lev_time: f64 = parse_num(lev_time, path)?;
            let step: i64 = parse_num(next("level step")?, path)?;
            let mut box_extents = Vec::with_capacity(nboxes);
            for _ in 0..nboxes {
                let mut ext = [[0.0; 2]; SPACEDIM];
                for pair in &mut ext {
                    let vals = split_words::<f64>(next("box extent")?, path)?;
                    let [lo, hi] = vals.as_slice() else {
                        return Err(bad("box extent needs two values".into()));
                    };
                    *pair = [*lo, *hi];
                }
                box_extents.push(ext);
            }
            levels.push(LevelHeader {
                level,
                time: lev_time,
                step,
                box_extents,
                path: next("level path")?.to_string(),
            });
        }

        if domains.len() != nlevels || level_steps.len() != nlevels || ref_ratios.len() + 1 < nlevels
        {
            return Err(bad(format!(
                "{nlevels} levels but {} domains, {} steps, {} ratios",
                domains.len(),
                level_steps.len(),
                ref_ratios.len()
            )));
        }
        Ok(Self {
            var_names,
            time,
            finest_level,
            prob_lo,
            prob_hi,
            ref_ratios,
            domains,
            level_steps,
            cell_sizes,
            coord,
            bwidth,
            levels,
        })
    }
}

fn physical_extent(geom: &Geometry, bx: &IndexBox) -> [[f64; 2]; SPACEDIM] {
    let cell = bx.convert(strata_core::IndexType::Cell);
    let lo = geom.node_position(&cell.lo());
    let hi = geom.node_position(&(cell.hi() + IntVect::unit()));
    std::array::from_fn(|d| [lo[d], hi[d]])
}

fn join<T: std::fmt::Display>(items: &[T]) -> String {
    items.iter().map(ToString::to_string).collect::<Vec<_>>().join(" ")
}

fn split_words<T>(line: &str, path: &Path) -> Result<Vec<T>, PlotfileError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    line.split_whitespace().map(|w| parse_num(w, path)).collect()
}

fn triple(line: &str, path: &Path) -> Result<[f64; SPACEDIM], PlotfileError> {
    let vals = split_words::<f64>(line, path)?;
    <[f64; SPACEDIM]>::try_from(vals.as_slice())
        .map_err(|_| PlotfileError::malformed(path, format!("expected {SPACEDIM} values in '{line}'")))
}

/// Split a line of parenthesized items separated by single spaces at the
/// top nesting level.
fn split_parse<T>(line: &str, path: &Path) -> Result<Vec<T>, PlotfileError>
where
    T: std::str::FromStr<Err = String>,
{
    let mut out = Vec::new();
    let mut depth = 0usize;
    let mut start = None;
    for (i, ch) in line.char_indices() {
        match ch {
            '(' => {
                if depth == 0 {
                    start = Some(i);
                }
                depth += 1;
            }
            ')' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    if let Some(s) = start.take() {
                        out.push(
                            line[s..=i]
                                .parse()
                                .map_err(|e| PlotfileError::malformed(path, e))?,
                        );
                    }
                }
            }
            _ => {}
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_level_header() -> PlotHeader {
        let g0 = Geometry::new(
            IndexBox::from_extent(IntVect::splat(8)),
            [0.0; 3],
            [1.0; 3],
            CoordSys::Cartesian,
        );
        let g1 = g0.refine(&IntVect::splat(2));
        let b0 = [g0.domain()];
        let b1 = [
            IndexBox::new(IntVect::splat(4), IntVect::splat(7)),
            IndexBox::new(IntVect::new([8, 4, 4]), IntVect::new([11, 7, 7])),
        ];
        PlotHeader::describe(
            vec!["density".into(), "magvel".into()],
            0.125,
            &[g0, g1],
            &[IntVect::splat(2)],
            &[4, 8],
            &[&b0, &b1],
        )
    }

    #[test]
    fn header_parses_back() {
        let h = two_level_header();
        let back = PlotHeader::parse(&h.to_text(), Path::new("Header")).unwrap();
        assert_eq!(back, h);
    }

    #[test]
    fn appended_lines_are_ignored() {
        let h = two_level_header();
        let text = format!("{}extra line written later\n", h.to_text());
        assert_eq!(PlotHeader::parse(&text, Path::new("Header")).unwrap(), h);
    }

    #[test]
    fn extents_are_physical() {
        let h = two_level_header();
        let ext = h.levels[1].box_extents[0];
        assert_eq!(ext[0], [0.25, 0.5]);
        assert_eq!(h.levels[1].path, "Level_1/Cell");
        assert_eq!(h.cell_sizes[1], [0.0625; 3]);
    }

    #[test]
    fn names_follow_the_count_line() {
        let text = two_level_header().to_text();
        let lines: Vec<&str> = text.lines().take(4).collect();
        assert_eq!(lines, vec![FORMAT_TAG, "2", "density", "magvel"]);
    }

    #[test]
    fn wrong_tag_is_rejected() {
        let err = PlotHeader::parse("NotAHeader\n", Path::new("Header")).unwrap_err();
        assert!(matches!(err, PlotfileError::Malformed { .. }));
    }
}

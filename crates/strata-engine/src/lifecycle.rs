//! Invocation handling, build description, and embedded-boundary setup.

use std::fmt;
use std::path::{Path, PathBuf};

use strata_amr::AmrHierarchy;
use strata_core::RunError;
use strata_eb::{EbConfig, EbGrowCells, EbIndexSpace, EbSupport};
use strata_plotfile::HeaderFormat;
use tracing::info;

use crate::table::ParamTable;

// ── Invocation ─────────────────────────────────────────────────────

/// Positional arguments split into an inputs file and overrides.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Invocation {
    /// The inputs file, if one was named.
    pub inputs: Option<PathBuf>,
    /// `key=value` overrides, in the order given.
    pub overrides: Vec<String>,
}

impl Invocation {
    /// Classify positional arguments. An argument containing `=` is an
    /// override; the first one without is the inputs file.
    pub fn classify<S: AsRef<str>>(args: &[S]) -> Result<Self, RunError> {
        if args.is_empty() {
            return Err(RunError::usage(
                "no inputs file or parameter overrides given; usage: strata <inputs> [key=value ...]",
            ));
        }
        let mut inv = Self::default();
        for arg in args.iter().map(AsRef::as_ref) {
            if arg.contains('=') {
                inv.overrides.push(arg.to_string());
            } else if let Some(first) = &inv.inputs {
                return Err(RunError::usage(format!(
                    "second inputs file '{arg}' given after '{}'",
                    first.display()
                )));
            } else {
                inv.inputs = Some(PathBuf::from(arg));
            }
        }
        Ok(inv)
    }

    /// Load the inputs file, if any, and apply every override.
    pub fn load(&self) -> Result<ParamTable, RunError> {
        let mut table = match &self.inputs {
            Some(path) => ParamTable::load(path)?,
            None => ParamTable::new(),
        };
        for arg in &self.overrides {
            table.apply_override(arg)?;
        }
        Ok(table)
    }
}

// ── BuildInfo ──────────────────────────────────────────────────────

/// What was built, printed by `--describe` and recorded in plots.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BuildInfo {
    /// Package name.
    pub package: &'static str,
    /// Package version.
    pub version: &'static str,
    /// Target triple.
    pub target: &'static str,
    /// Build profile.
    pub profile: &'static str,
    /// Abbreviated commit the binary was built from, or `"unknown"`.
    pub git_sha: &'static str,
    /// Enabled cargo features.
    pub features: Vec<&'static str>,
    /// Spatial dimensionality.
    pub spacedim: usize,
}

impl BuildInfo {
    /// Provenance text for a plot's `job_info` file.
    pub fn job_info(&self, inputs: Option<&Path>) -> String {
        let inputs = inputs.map_or_else(|| "none".to_string(), |p| p.display().to_string());
        format!("{self}inputs file: {inputs}\n")
    }
}

impl fmt::Display for BuildInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} {}", self.package, self.version)?;
        writeln!(f, "target: {}", self.target)?;
        writeln!(f, "profile: {}", self.profile)?;
        writeln!(f, "git: {}", self.git_sha)?;
        let features = if self.features.is_empty() {
            "none".to_string()
        } else {
            self.features.join(", ")
        };
        writeln!(f, "features: {features}")?;
        writeln!(f, "dimensions: {}", self.spacedim)
    }
}

// ── Embedded boundary ──────────────────────────────────────────────

/// Cut-cell information the run provides: area and volume fractions.
pub const EB_SUPPORT: EbSupport = EbSupport::Full;

/// Ghost cells the geometry covers at each support level.
pub const EB_GROW_CELLS: EbGrowCells = EbGrowCells::uniform(5);

/// Build the embedded boundary for `hierarchy`'s deepest configured
/// level. Must run before the hierarchy creates its levels.
///
/// Returns `None` for an all-regular geometry, which has no cut cells and
/// needs no extra ghost cells.
pub fn build_eb(config: &EbConfig, hierarchy: &AmrHierarchy) -> Result<Option<EbIndexSpace>, RunError> {
    let max_level = hierarchy.max_level();
    let eb = EbIndexSpace::build(config, hierarchy.max_level_geom(), max_level, max_level)?
        .with_support(EB_SUPPORT, EB_GROW_CELLS);
    if !eb.has_cut_cells() {
        return Ok(None);
    }
    info!(
        geom_type = %config.geom_type,
        grow = eb.required_grow(),
        "embedded boundary active"
    );
    Ok(Some(eb))
}

/// Map the `amr.plot_format` name onto a writer encoding.
pub fn header_format(name: &str) -> Result<HeaderFormat, RunError> {
    match name {
        "native" => Ok(HeaderFormat::Native),
        "hdf5" => Ok(HeaderFormat::Hdf5),
        other => Err(RunError::usage(format!(
            "unknown plot format '{other}', expected 'native' or 'hdf5'"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_arguments_are_refused() {
        let err = Invocation::classify::<&str>(&[]).unwrap_err();
        assert!(matches!(err, RunError::Usage { .. }));
    }

    #[test]
    fn arguments_split_on_equals() {
        let inv = Invocation::classify(&["max_step=3", "inputs.toml", "amr.plot_int=1"]).unwrap();
        assert_eq!(inv.inputs, Some(PathBuf::from("inputs.toml")));
        assert_eq!(inv.overrides, vec!["max_step=3", "amr.plot_int=1"]);
        assert!(Invocation::classify(&["a.toml", "b.toml"]).is_err());
    }

    #[test]
    fn overrides_alone_build_a_table() {
        let inv = Invocation::classify(&["max_step=0"]).unwrap();
        let table = inv.load().unwrap();
        assert_eq!(table.query::<i64>("max_step").unwrap(), Some(0));
        assert!(table.inputs().is_none());
    }

    #[test]
    fn missing_inputs_file_is_io() {
        let inv = Invocation::classify(&["/nonexistent/inputs.toml"]).unwrap();
        assert!(matches!(inv.load(), Err(RunError::Io { .. })));
    }

    #[test]
    fn describe_lists_every_field() {
        let info = BuildInfo {
            package: "strata",
            version: "0.1.0",
            target: "x86_64-unknown-linux-gnu",
            profile: "release",
            git_sha: "3f2a9c1",
            features: vec![],
            spacedim: 3,
        };
        let text = info.to_string();
        assert!(text.starts_with("strata 0.1.0\n"));
        assert!(text.contains("features: none"));
        assert!(text.contains("git: 3f2a9c1\n"));
        let job = info.job_info(Some(Path::new("in.toml")));
        assert!(job.contains("git: 3f2a9c1\n"));
        assert!(job.ends_with("inputs file: in.toml\n"));
    }

    #[test]
    fn plot_formats() {
        assert_eq!(header_format("native").unwrap(), HeaderFormat::Native);
        assert_eq!(header_format("hdf5").unwrap(), HeaderFormat::Hdf5);
        assert!(header_format("netcdf").is_err());
    }
}

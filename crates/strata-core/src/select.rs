//! Plot-variable filters and the full/small output discriminator.

use indexmap::IndexSet;

/// Which flavor of plot output an event produces.
///
/// Both flavors share every structural step; they differ only in the
/// variable filter consulted, whether derived quantities are included,
/// the output root, and console labels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PlotKind {
    /// Regular plot output: state variables plus derived quantities.
    Full,
    /// Reduced plot output: state variables only.
    Small,
}

impl PlotKind {
    /// `true` for [`PlotKind::Full`].
    pub fn is_regular(self) -> bool {
        matches!(self, Self::Full)
    }

    /// Console label, e.g. `"PLOTFILE"`.
    pub fn label(self) -> &'static str {
        match self {
            Self::Full => "PLOTFILE",
            Self::Small => "SMALL PLOTFILE",
        }
    }

    /// Lower-case noun used in timing lines, e.g. `"plotfile"`.
    pub fn noun(self) -> &'static str {
        match self {
            Self::Full => "plotfile",
            Self::Small => "small plotfile",
        }
    }
}

/// A name filter over plottable variables.
///
/// Built from a configured list where the single keywords `ALL` and
/// `NONE` select everything or nothing.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub enum VarSet {
    /// Every variable passes.
    All,
    /// No variable passes.
    #[default]
    None,
    /// Exactly the listed variables pass.
    Names(IndexSet<String>),
}

impl VarSet {
    /// Keyword selecting every variable.
    pub const ALL: &'static str = "ALL";
    /// Keyword selecting no variable.
    pub const NONE: &'static str = "NONE";

    /// Interpret a configured list of names.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let names: Vec<String> = names.into_iter().map(|s| s.as_ref().to_string()).collect();
        match names.as_slice() {
            [] => Self::None,
            [only] if only == Self::ALL => Self::All,
            [only] if only == Self::NONE => Self::None,
            _ => Self::Names(names.into_iter().collect()),
        }
    }

    /// `true` if `name` passes the filter.
    pub fn contains(&self, name: &str) -> bool {
        match self {
            Self::All => true,
            Self::None => false,
            Self::Names(set) => set.contains(name),
        }
    }

    /// `true` if no variable can pass.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::All => false,
            Self::None => true,
            Self::Names(set) => set.is_empty(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keywords_select_everything_or_nothing() {
        assert_eq!(VarSet::from_names(["ALL"]), VarSet::All);
        assert_eq!(VarSet::from_names(["NONE"]), VarSet::None);
        assert_eq!(VarSet::from_names(Vec::<String>::new()), VarSet::None);
        assert!(VarSet::All.contains("anything"));
        assert!(!VarSet::None.contains("anything"));
    }

    #[test]
    fn explicit_names_filter() {
        let set = VarSet::from_names(["density", "temp"]);
        assert!(set.contains("temp"));
        assert!(!set.contains("xmom"));
        assert!(!set.is_empty());
    }

    #[test]
    fn labels_distinguish_kinds() {
        assert!(PlotKind::Full.is_regular());
        assert!(!PlotKind::Small.is_regular());
        assert_eq!(PlotKind::Small.label(), "SMALL PLOTFILE");
    }
}

//! The merged parameter table.
//!
//! An inputs file is a TOML document; dotted keys give each subsystem its
//! prefix (`amr.max_level`, `eb2.geom_type`). Inline `key=value`
//! overrides are applied on top, in order, so later ones win.

use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use toml::{Table, Value};

use crate::error::ParamError;

/// Parameters from an inputs file and inline overrides.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ParamTable {
    root: Table,
    inputs: Option<PathBuf>,
}

impl ParamTable {
    /// An empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `text`; `path` is recorded as the inputs file.
    pub fn from_toml(text: &str, path: &Path) -> Result<Self, ParamError> {
        let root = text.parse::<Table>().map_err(|e| ParamError::Syntax {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            root,
            inputs: Some(path.to_path_buf()),
        })
    }

    /// Read and parse the inputs file at `path`.
    pub fn load(path: &Path) -> Result<Self, ParamError> {
        let text = fs::read_to_string(path).map_err(|e| ParamError::File {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_toml(&text, path)
    }

    /// The inputs file this table was read from, if any.
    pub fn inputs(&self) -> Option<&Path> {
        self.inputs.as_deref()
    }

    /// Apply one `key=value` override. The value is read as a TOML value;
    /// whitespace-separated TOML values become an array and anything else
    /// is taken as a bare string.
    pub fn apply_override(&mut self, arg: &str) -> Result<(), ParamError> {
        let Some((key, raw)) = arg.split_once('=') else {
            return Err(ParamError::Override {
                arg: arg.to_string(),
                reason: "expected key=value".into(),
            });
        };
        self.set(key.trim(), parse_value(raw.trim())).map_err(|e| match e {
            ParamError::Override { reason, .. } => ParamError::Override {
                arg: arg.to_string(),
                reason,
            },
            other => other,
        })
    }

    /// Set dotted `key` to `value`, creating intermediate tables.
    pub fn set(&mut self, key: &str, value: Value) -> Result<(), ParamError> {
        let parts = split_key(key)?;
        let (last, parents) = parts.split_last().ok_or_else(|| bad_key(key, "empty key"))?;
        let mut table = &mut self.root;
        for part in parents {
            let entry = table
                .entry(part.to_string())
                .or_insert_with(|| Value::Table(Table::new()));
            table = match entry {
                Value::Table(t) => t,
                _ => return Err(bad_key(key, format!("'{part}' is not a table"))),
            };
        }
        table.insert(last.to_string(), value);
        Ok(())
    }

    /// Value at dotted `key`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        let mut parts = key.split('.');
        let first = parts.next()?;
        parts.try_fold(self.root.get(first)?, |v, part| v.as_table()?.get(part))
    }

    /// `true` if `key` is set.
    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Set `key` to `value` unless it is already set. Returns `true` if
    /// the default was applied.
    pub fn add_default(&mut self, key: &str, value: impl Into<Value>) -> Result<bool, ParamError> {
        if self.contains(key) {
            return Ok(false);
        }
        self.set(key, value.into())?;
        Ok(true)
    }

    /// Typed value at `key`, or `None` if unset.
    pub fn query<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, ParamError> {
        self.get(key)
            .map(|v| {
                v.clone().try_into().map_err(|e: toml::de::Error| ParamError::Type {
                    key: key.to_string(),
                    reason: e.message().to_string(),
                })
            })
            .transpose()
    }

    /// Typed value at `key`, or `default` if unset.
    pub fn query_or<T: DeserializeOwned>(&self, key: &str, default: T) -> Result<T, ParamError> {
        Ok(self.query(key)?.unwrap_or(default))
    }

    /// Deserialize every parameter under `prefix` into `T`. Missing
    /// parameters take `T`'s defaults; an absent prefix yields
    /// `T::default()`.
    pub fn section<T: DeserializeOwned + Default>(&self, prefix: &str) -> Result<T, ParamError> {
        match self.get(prefix) {
            None => Ok(T::default()),
            Some(Value::Table(t)) => Value::Table(t.clone()).try_into().map_err(|e: toml::de::Error| {
                ParamError::Type {
                    key: prefix.to_string(),
                    reason: e.message().to_string(),
                }
            }),
            Some(_) => Err(ParamError::Type {
                key: prefix.to_string(),
                reason: "expected a table of parameters".into(),
            }),
        }
    }
}

fn split_key(key: &str) -> Result<Vec<&str>, ParamError> {
    let parts: Vec<&str> = key.split('.').collect();
    if parts.iter().any(|p| p.is_empty()) {
        return Err(bad_key(key, "empty key segment"));
    }
    Ok(parts)
}

fn bad_key(key: &str, reason: impl Into<String>) -> ParamError {
    ParamError::Override {
        arg: key.to_string(),
        reason: reason.into(),
    }
}

fn parse_toml_value(raw: &str) -> Option<Value> {
    format!("v = {raw}").parse::<Table>().ok()?.remove("v")
}

fn parse_value(raw: &str) -> Value {
    if let Some(v) = parse_toml_value(raw) {
        return v;
    }
    let tokens: Vec<&str> = raw.split_whitespace().collect();
    if tokens.len() > 1 {
        if let Some(items) = tokens.iter().map(|t| parse_toml_value(t)).collect::<Option<Vec<_>>>() {
            return Value::Array(items);
        }
    }
    Value::String(raw.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Default, Deserialize, PartialEq)]
    #[serde(default)]
    struct Section {
        max_level: usize,
        n_cell: Vec<i32>,
        plot_file: String,
    }

    fn table() -> ParamTable {
        ParamTable::from_toml(
            "max_step = 10\n[amr]\nmax_level = 1\nplot_file = \"plt\"\n",
            Path::new("inputs.toml"),
        )
        .unwrap()
    }

    #[test]
    fn overrides_win_and_parse_as_toml() {
        let mut t = table();
        t.apply_override("max_step=20").unwrap();
        t.apply_override("amr.n_cell=16 16 8").unwrap();
        t.apply_override("eb2.geom_type=sphere").unwrap();
        assert_eq!(t.query::<i64>("max_step").unwrap(), Some(20));
        assert_eq!(t.query::<Vec<i32>>("amr.n_cell").unwrap(), Some(vec![16, 16, 8]));
        assert_eq!(t.query::<String>("eb2.geom_type").unwrap().as_deref(), Some("sphere"));
        assert_eq!(t.inputs(), Some(Path::new("inputs.toml")));
    }

    #[test]
    fn section_fills_defaults() {
        let t = table();
        let s: Section = t.section("amr").unwrap();
        assert_eq!(s.max_level, 1);
        assert!(s.n_cell.is_empty());
        assert_eq!(t.section::<Section>("nowhere").unwrap(), Section::default());
    }

    #[test]
    fn add_default_keeps_existing_values() {
        let mut t = table();
        assert!(t.add_default("eb2.geom_type", "all_regular").unwrap());
        assert!(!t.add_default("max_step", 3).unwrap());
        assert_eq!(t.query::<i64>("max_step").unwrap(), Some(10));
        assert!(t.contains("eb2.geom_type"));
    }

    #[test]
    fn type_mismatch_names_the_key() {
        let t = table();
        let err = t.query::<i64>("amr.plot_file").unwrap_err();
        assert!(matches!(err, ParamError::Type { ref key, .. } if key == "amr.plot_file"));
    }

    #[test]
    fn malformed_overrides_are_rejected() {
        let mut t = table();
        assert!(matches!(t.apply_override("noequals"), Err(ParamError::Override { .. })));
        assert!(matches!(t.apply_override("amr..x=1"), Err(ParamError::Override { .. })));
        assert!(matches!(
            t.apply_override("max_step.x=1"),
            Err(ParamError::Override { ref arg, .. }) if arg == "max_step.x=1"
        ));
    }

    #[test]
    fn missing_file_is_an_io_failure() {
        let err = ParamTable::load(Path::new("/nonexistent/inputs.toml")).unwrap_err();
        assert!(matches!(err, ParamError::File { .. }));
        assert_eq!(strata_core::RunError::from(err).exit_code(), 3);
    }
}

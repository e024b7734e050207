//! State and derive descriptor registries.
//!
//! A [`DescriptorList`] enumerates every state type a level carries: its
//! name, index type, ghost width, and per-component names. A
//! [`DeriveList`] enumerates the quantities that can be computed on demand
//! from state but are never stored.

use indexmap::IndexMap;

use crate::id::StateTypeId;
use crate::index::IndexType;

/// Description of one registered state type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StateDescriptor {
    name: String,
    index_type: IndexType,
    ngrow: usize,
    comp_names: Vec<String>,
}

impl StateDescriptor {
    /// Describe a state type with the given component names.
    pub fn new(
        name: impl Into<String>,
        index_type: IndexType,
        ngrow: usize,
        comp_names: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            name: name.into(),
            index_type,
            ngrow,
            comp_names: comp_names.into_iter().map(Into::into).collect(),
        }
    }

    /// Name of the state type (e.g. `"State"`).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Index type of the stored data.
    pub fn index_type(&self) -> IndexType {
        self.index_type
    }

    /// Ghost cells carried by the state data.
    pub fn ngrow(&self) -> usize {
        self.ngrow
    }

    /// Number of components.
    pub fn ncomp(&self) -> usize {
        self.comp_names.len()
    }

    /// Name of component `comp`, if in range.
    pub fn comp_name(&self, comp: usize) -> Option<&str> {
        self.comp_names.get(comp).map(String::as_str)
    }

    /// All component names in storage order.
    pub fn comp_names(&self) -> &[String] {
        &self.comp_names
    }
}

/// Ordered registry of state types.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DescriptorList {
    descs: Vec<StateDescriptor>,
}

impl DescriptorList {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a state type, returning its ID.
    pub fn add(&mut self, desc: StateDescriptor) -> StateTypeId {
        let id = StateTypeId(self.descs.len() as u32);
        self.descs.push(desc);
        id
    }

    /// Look up a state type.
    pub fn get(&self, id: StateTypeId) -> Option<&StateDescriptor> {
        self.descs.get(id.index())
    }

    /// Look up a state type by name.
    pub fn find(&self, name: &str) -> Option<(StateTypeId, &StateDescriptor)> {
        self.iter().find(|(_, d)| d.name() == name)
    }

    /// Number of registered state types.
    pub fn len(&self) -> usize {
        self.descs.len()
    }

    /// `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.descs.is_empty()
    }

    /// Iterate in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (StateTypeId, &StateDescriptor)> {
        self.descs
            .iter()
            .enumerate()
            .map(|(i, d)| (StateTypeId(i as u32), d))
    }
}

/// A derived quantity computed on demand from state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeriveRec {
    name: String,
    var_names: Vec<String>,
    index_type: IndexType,
}

impl DeriveRec {
    /// A cell-centered derive whose components carry `var_names`.
    pub fn new(
        name: impl Into<String>,
        var_names: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            name: name.into(),
            var_names: var_names.into_iter().map(Into::into).collect(),
            index_type: IndexType::Cell,
        }
    }

    /// A single-component derive whose only variable shares its name.
    pub fn scalar(name: impl Into<String>) -> Self {
        let name = name.into();
        Self::new(name.clone(), [name])
    }

    /// Name used to request the derive.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of components produced.
    pub fn num_derive(&self) -> usize {
        self.var_names.len()
    }

    /// Name of output component `i`.
    pub fn variable_name(&self, i: usize) -> Option<&str> {
        self.var_names.get(i).map(String::as_str)
    }

    /// All output component names.
    pub fn variable_names(&self) -> &[String] {
        &self.var_names
    }

    /// Index type of the produced data.
    pub fn index_type(&self) -> IndexType {
        self.index_type
    }
}

/// Ordered registry of derived quantities, keyed by name.
#[derive(Clone, Debug, Default)]
pub struct DeriveList {
    recs: IndexMap<String, DeriveRec>,
}

impl DeriveList {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a derive. A later registration under the same name
    /// replaces the earlier one but keeps its position.
    pub fn add(&mut self, rec: DeriveRec) {
        self.recs.insert(rec.name().to_string(), rec);
    }

    /// Look up a derive by name.
    pub fn get(&self, name: &str) -> Option<&DeriveRec> {
        self.recs.get(name)
    }

    /// Number of registered derives.
    pub fn len(&self) -> usize {
        self.recs.len()
    }

    /// `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.recs.is_empty()
    }

    /// Iterate in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &DeriveRec> {
        self.recs.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptor_ids_follow_registration_order() {
        let mut list = DescriptorList::new();
        let a = list.add(StateDescriptor::new("State", IndexType::Cell, 2, ["rho", "e"]));
        let b = list.add(StateDescriptor::new("Nodal", IndexType::Node, 0, ["phi"]));
        assert_eq!(a, StateTypeId(0));
        assert_eq!(b, StateTypeId(1));
        assert_eq!(list.get(a).unwrap().ncomp(), 2);
        assert_eq!(list.find("Nodal").unwrap().0, b);
        assert!(list.get(StateTypeId(2)).is_none());
    }

    #[test]
    fn derive_replacement_keeps_position() {
        let mut list = DeriveList::new();
        list.add(DeriveRec::scalar("magvel"));
        list.add(DeriveRec::new("velocity", ["u", "v", "w"]));
        list.add(DeriveRec::new("magvel", ["speed"]));
        let names: Vec<&str> = list.iter().map(DeriveRec::name).collect();
        assert_eq!(names, vec!["magvel", "velocity"]);
        assert_eq!(list.get("magvel").unwrap().variable_name(0), Some("speed"));
        assert_eq!(list.get("velocity").unwrap().num_derive(), 3);
    }
}

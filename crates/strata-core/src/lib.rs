//! Core types for the Strata adaptive-mesh-refinement driver.
//!
//! This is the leaf crate with zero internal dependencies. It defines the
//! index-space vocabulary shared by every other crate (integer vectors,
//! index boxes, index types), the state and derive descriptor registries,
//! plot-variable selections, and the run-level error taxonomy.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod descriptor;
pub mod error;
pub mod id;
pub mod index;
pub mod select;

pub use descriptor::{DeriveList, DeriveRec, DescriptorList, StateDescriptor};
pub use error::RunError;
pub use id::StateTypeId;
pub use index::{IndexBox, IndexType, IntVect, SPACEDIM};
pub use select::{PlotKind, VarSet};

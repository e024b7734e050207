//! The level hierarchy.
//!
//! [`AmrHierarchy`] owns every refinement level, the per-level step
//! counters and time steps, and the cumulative simulated time. It builds
//! levels through a [`LevelBuilder`], advances them with sub-cycling
//! through the [`LevelPhysics`] trait, and reports scheduled output
//! events to an [`OutputSink`]. Consumers that only read the hierarchy
//! (the output composer, checkpointing) see it through [`HierarchyView`].
//!
//! Refinement is static: each finer level covers a centered fraction of
//! its parent. Regridding rebuilds the finer levels and moves their data
//! onto the new layout.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod hierarchy;
pub mod level;
pub mod refine;
mod restart;
pub mod view;

pub use config::AmrConfig;
pub use error::AmrError;
pub use hierarchy::AmrHierarchy;
pub use level::{LevelBuilder, LevelContext, LevelPhysics};
pub use view::{HierarchyView, OutputSink};

//! Distributed block-structured field containers.
//!
//! A level's domain is tiled by a [`BoxArray`]; a [`DistributionMapping`]
//! assigns each box to a rank; a [`MultiFab`] holds the multi-component
//! [`Fab`] data blocks for the boxes its rank owns. Nothing here performs
//! halo exchange: ghost cells are carried but filled by the level physics.
//!
//! [`FabArena`] accounts every byte of FAB storage so the driver can
//! report a heap high-water mark.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod arena;
pub mod box_array;
pub mod distribution;
pub mod error;
pub mod fab;
pub mod geometry;
pub mod multifab;

pub use arena::FabArena;
pub use box_array::BoxArray;
pub use distribution::{DistributionMapping, DistributionStrategy};
pub use error::GridError;
pub use fab::Fab;
pub use geometry::{CoordSys, Geometry};
pub use multifab::MultiFab;

//! Embedded-boundary (cut-cell) geometry.
//!
//! An [`EbIndexSpace`] is built once per run from an [`EbConfig`], before
//! the level hierarchy exists. It answers which cells are cut by the
//! boundary and with what volume and face-area fractions. The
//! `all_regular` geometry has no boundary at all, and writers skip the
//! cut-cell variant for it.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod index_space;
pub mod shape;
pub mod support;

pub use config::EbConfig;
pub use error::EbError;
pub use index_space::EbIndexSpace;
pub use shape::EbShape;
pub use support::{EbGrowCells, EbSupport};

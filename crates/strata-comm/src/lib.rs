//! Process-group collectives for the Strata AMR driver.
//!
//! A run is one logical thread of control replicated across a fixed set of
//! ranks. Every rank enters the same collectives in the same order; rank 0
//! is the coordinator that owns shared metadata writes and receives
//! reductions.
//!
//! - [`Communicator`] is the seam every collaborator talks through.
//! - [`SerialComm`] is the single-rank group.
//! - [`ThreadGroup`] builds an in-process group whose ranks run on threads,
//!   connected by crossbeam channels.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod comm;
pub mod error;
pub mod serial;
pub mod thread;

pub use comm::{Communicator, COORDINATOR};
pub use error::CommError;
pub use serial::SerialComm;
pub use thread::{ThreadComm, ThreadGroup};

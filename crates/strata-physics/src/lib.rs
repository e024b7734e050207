//! Reference level physics.
//!
//! A pointwise relaxation model: temperature relaxes towards a fixed hot
//! spot, momentum decays, density keeps its perturbed initial value. It
//! gives the driver real state to step and write; it is not a solver.
//!
//! Each level carries two state types:
//!
//! | Type    | Index type | Components                               |
//! |---------|------------|------------------------------------------|
//! | `State` | cell       | `density`, `xmom`, `ymom`, `zmom`, `temp` |
//! | `Nodal` | node       | `phi_nd`                                 |
//!
//! and derives `x_velocity`, `y_velocity`, `z_velocity`, `magvel`,
//! `kineng`, and the three-component `velocity` (`u`, `v`, `w`).

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod derive;
pub mod error;
pub mod level;

pub use config::PhysicsConfig;
pub use error::PhysicsError;
pub use level::{RelaxationBuilder, RelaxationLevel, NODAL_TYPE, STATE_TYPE};

//! `physics.*` parameters.

use serde::Deserialize;

use crate::error::PhysicsError;

/// Parameters of the relaxation model.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    /// Base density.
    pub rho0: f64,
    /// Relative amplitude of the random initial density perturbation.
    pub perturbation: f64,
    /// Seed of the perturbation.
    pub seed: u64,
    /// Initial velocity.
    pub velocity: [f64; 3],
    /// Background temperature.
    pub t_ambient: f64,
    /// Peak temperature of the hot spot.
    pub t_hot: f64,
    /// Gaussian radius of the hot spot.
    pub hot_radius: f64,
    /// Temperature relaxation rate.
    pub relax_rate: f64,
    /// Momentum damping rate.
    pub damping: f64,
    /// Safety factor on the estimated time step.
    pub cfl: f64,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            rho0: 1.0,
            perturbation: 0.01,
            seed: 0,
            velocity: [1.0, 0.5, 0.0],
            t_ambient: 300.0,
            t_hot: 600.0,
            hot_radius: 0.2,
            relax_rate: 1.0,
            damping: 0.5,
            cfl: 0.5,
        }
    }
}

impl PhysicsConfig {
    /// Check every parameter.
    pub fn validate(&self) -> Result<(), PhysicsError> {
        let positive: [(&'static str, f64); 4] = [
            ("rho0", self.rho0),
            ("hot_radius", self.hot_radius),
            ("t_ambient", self.t_ambient),
            ("cfl", self.cfl),
        ];
        for (field, v) in positive {
            if !(v.is_finite() && v > 0.0) {
                return Err(PhysicsError::InvalidParameter {
                    field,
                    reason: format!("must be positive and finite, got {v}"),
                });
            }
        }
        if !(0.0..1.0).contains(&self.perturbation) {
            return Err(PhysicsError::InvalidParameter {
                field: "perturbation",
                reason: format!("must lie in [0, 1), got {}", self.perturbation),
            });
        }
        if self.relax_rate < 0.0 || self.damping < 0.0 {
            return Err(PhysicsError::InvalidParameter {
                field: "relax_rate",
                reason: "rates must be non-negative".into(),
            });
        }
        Ok(())
    }

    /// Temperature profile the state relaxes towards, at `x` in a domain
    /// centered on `center`.
    pub fn target_temp(&self, x: [f64; 3], center: [f64; 3]) -> f64 {
        let r2: f64 = (0..3).map(|d| (x[d] - center[d]).powi(2)).sum();
        self.t_ambient + (self.t_hot - self.t_ambient) * (-r2 / self.hot_radius.powi(2)).exp()
    }
}

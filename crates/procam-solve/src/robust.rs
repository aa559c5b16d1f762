//! Robust loss kernels for iteratively re-weighted least squares.

use procam_core::Real;
use serde::{Deserialize, Serialize};

/// IRLS loss kernel.
///
/// The classic IRLS procedure: evaluate residuals `r_i` for the current
/// parameters, compute weights with [`RobustKernel::loss_and_weight`], and
/// scale each correspondence's contribution by its weight before re-solving
/// the linearized system.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub enum RobustKernel {
    /// Pure L2 (quadratic) loss.
    #[default]
    None,
    /// Huber loss: quadratic below `delta`, linear above.
    Huber { delta: Real },
    /// Cauchy loss with a scale parameter.
    Cauchy { scale: Real },
}

impl RobustKernel {
    /// Loss `rho(r²)` and IRLS weight `w(r)` for a squared residual.
    pub fn loss_and_weight(self, r2: Real) -> (Real, Real) {
        match self {
            RobustKernel::None => (r2, 1.0),
            RobustKernel::Huber { delta } => {
                let r = r2.sqrt();
                if r <= delta {
                    (r2, 1.0)
                } else {
                    (2.0 * delta * r - delta * delta, delta / r)
                }
            }
            RobustKernel::Cauchy { scale } => {
                let t = r2 / (scale * scale);
                (scale * scale * (1.0 + t).ln(), 1.0 / (1.0 + t))
            }
        }
    }
}

//! A small dense solver for convex quadratic programs
//!
//! ```text
//! minimize    ½ zᵀ Q z + cᵀ z
//! subject to  G z <= h
//! ```
//!
//! using a primal-dual interior-point method with Mehrotra predictor-corrector steps. Problems
//! here have a handful of variables and constraints, so everything is dense. Every call to
//! `solve` builds its own iterates; nothing is shared between calls.

use nalgebra::linalg::{Cholesky, LU};
use nalgebra::{DMatrix, DVector, Dyn};
use serde::{Deserialize, Serialize};

use crate::{GeomError, Result};

/// How hard to try before giving up on a solve.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverSettings {
    /// Relative tolerance on the primal residual, dual residual, and duality gap.
    pub tolerance: f64,
    /// Each iteration is one Newton step. Hitting this fails the solve.
    pub max_iterations: usize,
    /// How far towards the boundary of the positive orthant a step may go, in (0, 1).
    pub step_fraction: f64,
}

impl Default for SolverSettings {
    fn default() -> SolverSettings {
        SolverSettings {
            tolerance: 1e-9,
            max_iterations: 100,
            step_fraction: 0.99,
        }
    }
}

impl SolverSettings {
    pub fn validate(&self) -> Result<()> {
        if !(self.tolerance > 0.0 && self.tolerance.is_finite()) {
            return Err(GeomError::InvalidSettings(format!(
                "tolerance must be positive, not {}",
                self.tolerance
            )));
        }
        if self.max_iterations == 0 {
            return Err(GeomError::InvalidSettings(
                "max_iterations must be at least 1".to_string(),
            ));
        }
        if !(self.step_fraction > 0.0 && self.step_fraction < 1.0) {
            return Err(GeomError::InvalidSettings(format!(
                "step_fraction must be in (0, 1), not {}",
                self.step_fraction
            )));
        }
        Ok(())
    }

    /// Settings to retry with after a `SolverDiverged`.
    pub fn relaxed(&self) -> SolverSettings {
        SolverSettings {
            tolerance: self.tolerance * 100.0,
            max_iterations: self.max_iterations * 2,
            step_fraction: self.step_fraction,
        }
    }
}

pub struct QuadraticProgram {
    /// Positive semidefinite, n x n
    pub q: DMatrix<f64>,
    pub c: DVector<f64>,
    /// m x n
    pub g: DMatrix<f64>,
    pub h: DVector<f64>,
}

#[derive(Clone, Debug)]
pub struct Solution {
    pub z: DVector<f64>,
    pub objective: f64,
    /// Newton steps taken
    pub iterations: usize,
}

impl QuadraticProgram {
    pub fn new(
        q: DMatrix<f64>,
        c: DVector<f64>,
        g: DMatrix<f64>,
        h: DVector<f64>,
    ) -> Result<QuadraticProgram> {
        let n = c.len();
        if q.shape() != (n, n) || g.shape() != (h.len(), n) {
            return Err(GeomError::InvalidProblem(format!(
                "Q is {:?}, c has {} entries, G is {:?}, h has {} entries",
                q.shape(),
                n,
                g.shape(),
                h.len()
            )));
        }
        Ok(QuadraticProgram { q, c, g, h })
    }

    fn objective(&self, z: &DVector<f64>) -> f64 {
        0.5 * z.dot(&(&self.q * z)) + self.c.dot(z)
    }

    /// `warm_start` only seeds the primal variables; it doesn't need to be feasible. Callers
    /// must make sure the constraints have a solution, since an infeasible problem just shows up
    /// as divergence here.
    pub fn solve(
        &self,
        settings: &SolverSettings,
        warm_start: Option<&DVector<f64>>,
    ) -> Result<Solution> {
        settings.validate()?;
        let n = self.c.len();
        let m = self.h.len();

        if m == 0 {
            let z = Factorization::new(self.q.clone())
                .and_then(|f| f.solve(&(-&self.c)))
                .ok_or(GeomError::SolverDiverged {
                    iterations: 0,
                    gap: f64::INFINITY,
                })?;
            return Ok(Solution {
                objective: self.objective(&z),
                z,
                iterations: 0,
            });
        }

        let mut z = match warm_start {
            Some(z0) if z0.len() != n => {
                return Err(GeomError::InvalidProblem(format!(
                    "warm start has {} entries, but there are {} variables",
                    z0.len(),
                    n
                )));
            }
            Some(z0) => z0.clone(),
            None => DVector::zeros(n),
        };
        let gz = &self.g * &z;
        let mut s = DVector::from_fn(m, |i, _| (self.h[i] - gz[i]).max(1.0));
        let mut lambda = DVector::from_element(m, 1.0);

        let tol = settings.tolerance;
        let primal_scale = 1.0 + self.h.amax();
        let dual_scale = 1.0 + self.c.amax();
        let mut gap;
        let mut iterations = 0;

        loop {
            let r_d = &self.q * &z + &self.c + self.g.tr_mul(&lambda);
            let r_p = &self.g * &z + &s - &self.h;
            let objective = self.objective(&z);
            gap = s.dot(&lambda);
            if !gap.is_finite() || !objective.is_finite() {
                break;
            }
            if r_p.amax() <= tol * primal_scale
                && r_d.amax() <= tol * dual_scale
                && gap <= tol * (1.0 + objective.abs())
            {
                debug!(
                    "QP with {} variables and {} constraints converged after {} iterations",
                    n, m, iterations
                );
                return Ok(Solution {
                    z,
                    objective,
                    iterations,
                });
            }
            if iterations == settings.max_iterations {
                break;
            }

            let mu = gap / (m as f64);
            let w = lambda.component_div(&s);
            let weighted_g = DMatrix::from_fn(m, n, |i, j| w[i] * self.g[(i, j)]);
            let kkt = match Factorization::new(&self.q + self.g.tr_mul(&weighted_g)) {
                Some(f) => f,
                None => break,
            };

            // Predictor: aim straight for complementarity
            let r_c = s.component_mul(&lambda);
            let affine = match self.newton_step(&kkt, &s, &lambda, &r_d, &r_p, &r_c) {
                Some(step) => step,
                None => break,
            };
            let alpha_aff = max_step(&s, &affine.ds)
                .min(max_step(&lambda, &affine.dlambda))
                .min(1.0);
            let mu_aff = (&s + alpha_aff * &affine.ds).dot(&(&lambda + alpha_aff * &affine.dlambda))
                / (m as f64);
            let sigma = (mu_aff / mu).powi(3).min(1.0);

            // Corrector: recenter and account for the second-order term the predictor dropped
            let r_c = r_c + affine.ds.component_mul(&affine.dlambda);
            let r_c = r_c.add_scalar(-sigma * mu);
            let step = match self.newton_step(&kkt, &s, &lambda, &r_d, &r_p, &r_c) {
                Some(step) => step,
                None => break,
            };
            let alpha = (settings.step_fraction
                * max_step(&s, &step.ds).min(max_step(&lambda, &step.dlambda)))
            .min(1.0);

            z += alpha * step.dz;
            s += alpha * step.ds;
            lambda += alpha * step.dlambda;
            iterations += 1;
        }

        warn!(
            "QP with {} variables and {} constraints gave up after {} iterations, gap {:e}",
            n, m, iterations, gap
        );
        Err(GeomError::SolverDiverged { iterations, gap })
    }

    /// Solves the linearized KKT conditions
    ///
    /// ```text
    /// Q dz + Gᵀ dλ = -r_d
    /// G dz + ds    = -r_p
    /// Λ ds + S dλ  = -r_c
    /// ```
    ///
    /// by eliminating `ds` and `dλ`, leaving `(Q + Gᵀ S⁻¹ Λ G) dz = ...`, which is already
    /// factored in `kkt`.
    fn newton_step(
        &self,
        kkt: &Factorization,
        s: &DVector<f64>,
        lambda: &DVector<f64>,
        r_d: &DVector<f64>,
        r_p: &DVector<f64>,
        r_c: &DVector<f64>,
    ) -> Option<Step> {
        let t = (lambda.component_mul(r_p) - r_c).component_div(s);
        let rhs = -r_d - self.g.tr_mul(&t);
        let dz = kkt.solve(&rhs)?;
        let g_dz = &self.g * &dz;
        let dlambda = t + lambda.component_mul(&g_dz).component_div(s);
        let ds = -r_p - g_dz;
        Some(Step { dz, ds, dlambda })
    }
}

struct Step {
    dz: DVector<f64>,
    ds: DVector<f64>,
    dlambda: DVector<f64>,
}

enum Factorization {
    Cholesky(Cholesky<f64, Dyn>),
    Lu(LU<f64, Dyn, Dyn>),
}

impl Factorization {
    /// Cholesky when the matrix is positive definite, else LU. None if it's singular.
    fn new(matrix: DMatrix<f64>) -> Option<Factorization> {
        if matrix.iter().any(|x| !x.is_finite()) {
            return None;
        }
        match matrix.clone().cholesky() {
            Some(chol) => Some(Factorization::Cholesky(chol)),
            None => {
                let lu = matrix.lu();
                if lu.is_invertible() {
                    Some(Factorization::Lu(lu))
                } else {
                    None
                }
            }
        }
    }

    fn solve(&self, rhs: &DVector<f64>) -> Option<DVector<f64>> {
        let x = match self {
            Factorization::Cholesky(chol) => chol.solve(rhs),
            Factorization::Lu(lu) => lu.solve(rhs)?,
        };
        if x.iter().all(|v| v.is_finite()) {
            Some(x)
        } else {
            None
        }
    }
}

/// The largest step `alpha` keeping `v + alpha * dv` nonnegative. Infinite if nothing shrinks.
fn max_step(v: &DVector<f64>, dv: &DVector<f64>) -> f64 {
    v.iter()
        .zip(dv.iter())
        .filter(|(_, d)| **d < 0.0)
        .map(|(x, d)| -x / d)
        .fold(f64::INFINITY, f64::min)
}

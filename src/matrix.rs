use serde::{Deserialize, Serialize};

use crate::STATE_DIM;

/// Pivots below this magnitude are treated as singular.
const PIVOT_EPSILON: f64 = 1e-10;
/// Jitter used when a Cholesky diagonal loses positivity to rounding.
const CHOLESKY_JITTER: f64 = 1e-9;

pub type Vector = [f64; STATE_DIM];

/// Dense square matrix sized for the bandit context. The per-action design
/// matrices start as identity and only ever accumulate rank-1 outer
/// products, so they stay symmetric positive-definite up to rounding.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Matrix {
    rows: [[f64; STATE_DIM]; STATE_DIM],
}

impl Matrix {
    pub fn identity() -> Self {
        let mut rows = [[0.0; STATE_DIM]; STATE_DIM];
        for (i, row) in rows.iter_mut().enumerate() {
            row[i] = 1.0;
        }
        Self { rows }
    }

    pub fn rows(&self) -> &[[f64; STATE_DIM]; STATE_DIM] {
        &self.rows
    }

    /// `self += x · xᵀ`
    pub fn add_outer(&mut self, x: &Vector) {
        for i in 0..STATE_DIM {
            for j in 0..STATE_DIM {
                self.rows[i][j] += x[i] * x[j];
            }
        }
    }

    /// `self + lambda · I`
    pub fn ridged(&self, lambda: f64) -> Self {
        let mut out = *self;
        for i in 0..STATE_DIM {
            out.rows[i][i] += lambda;
        }
        out
    }

    pub fn mul_vec(&self, v: &Vector) -> Vector {
        let mut out = [0.0; STATE_DIM];
        for i in 0..STATE_DIM {
            for j in 0..STATE_DIM {
                out[i] += self.rows[i][j] * v[j];
            }
        }
        out
    }

    /// Gauss-Jordan inverse with partial pivoting. Returns `None` when a
    /// pivot degenerates, so callers can regularize instead of consuming a
    /// garbage inverse.
    pub fn invert(&self) -> Option<Self> {
        let n = STATE_DIM;
        let mut aug = [[0.0; 2 * STATE_DIM]; STATE_DIM];
        for i in 0..n {
            aug[i][..n].copy_from_slice(&self.rows[i]);
            aug[i][n + i] = 1.0;
        }

        for i in 0..n {
            let mut max_row = i;
            for k in (i + 1)..n {
                if aug[k][i].abs() > aug[max_row][i].abs() {
                    max_row = k;
                }
            }
            aug.swap(i, max_row);

            let pivot = aug[i][i];
            if pivot.abs() < PIVOT_EPSILON || !pivot.is_finite() {
                return None;
            }
            for j in 0..(2 * n) {
                aug[i][j] /= pivot;
            }

            for k in 0..n {
                if k != i {
                    let factor = aug[k][i];
                    for j in 0..(2 * n) {
                        aug[k][j] -= factor * aug[i][j];
                    }
                }
            }
        }

        let mut rows = [[0.0; STATE_DIM]; STATE_DIM];
        for i in 0..n {
            for j in 0..n {
                let val = aug[i][n + j];
                if !val.is_finite() {
                    return None;
                }
                rows[i][j] = val;
            }
        }
        Some(Self { rows })
    }

    /// Lower-triangular Cholesky factor `L` with `L·Lᵀ ≈ self`. Total: a
    /// diagonal that loses positivity to rounding is repaired with a small
    /// jitter, which degrades one posterior sample rather than the call.
    pub fn cholesky(&self) -> Self {
        let mut l = [[0.0; STATE_DIM]; STATE_DIM];
        for i in 0..STATE_DIM {
            for j in 0..=i {
                let mut sum = self.rows[i][j];
                for k in 0..j {
                    sum -= l[i][k] * l[j][k];
                }
                if i == j {
                    l[i][i] = if sum > 0.0 {
                        sum.sqrt()
                    } else {
                        CHOLESKY_JITTER.sqrt()
                    };
                } else {
                    let diag = l[j][j];
                    l[i][j] = if diag.abs() > PIVOT_EPSILON {
                        sum / diag
                    } else {
                        0.0
                    };
                }
            }
        }
        Self { rows: l }
    }
}

pub fn dot(a: &Vector, b: &Vector) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

pub fn scale(v: &Vector, factor: f64) -> Vector {
    let mut out = *v;
    for val in out.iter_mut() {
        *val *= factor;
    }
    out
}

pub fn add(a: &Vector, b: &Vector) -> Vector {
    let mut out = *a;
    for (lhs, rhs) in out.iter_mut().zip(b.iter()) {
        *lhs += rhs;
    }
    out
}

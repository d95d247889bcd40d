//! Natural cubic spline interpolation for CDS par-spread curves.
//!
//! Curves are sampled at a handful of quoted tenors and evaluated at
//! arbitrary bond maturities, so queries outside the node range are
//! common; those extrapolate with the boundary segment's polynomial.

use thiserror::Error;

/// Errors returned during spline construction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SplineError {
    /// x and y arrays have different lengths
    #[error("x and y must have the same length ({x_len} vs {y_len})")]
    LengthMismatch {
        /// Length of the abscissa array
        x_len: usize,
        /// Length of the ordinate array
        y_len: usize,
    },

    /// Fewer than two nodes were supplied
    #[error("at least 2 nodes are required, got {0}")]
    TooFewNodes(usize),

    /// Abscissas are not strictly increasing
    #[error("x must be strictly increasing")]
    NotIncreasing,

    /// A node value is NaN or infinite
    #[error("x and y must be finite")]
    NonFinite,
}

/// Natural cubic spline over strictly increasing nodes.
///
/// With two nodes the spline degenerates to linear interpolation. Second
/// derivatives at the endpoints are zero; evaluation outside the node
/// range continues the first or last segment's cubic.
#[derive(Debug, Clone)]
pub struct NaturalCubicSpline {
    x: Vec<f64>,
    y: Vec<f64>,
    /// Second derivatives at the nodes.
    m: Vec<f64>,
}

impl NaturalCubicSpline {
    /// Fit a natural cubic spline through `(x, y)` nodes.
    pub fn new(x: Vec<f64>, y: Vec<f64>) -> Result<Self, SplineError> {
        if x.len() != y.len() {
            return Err(SplineError::LengthMismatch {
                x_len: x.len(),
                y_len: y.len(),
            });
        }
        if x.len() < 2 {
            return Err(SplineError::TooFewNodes(x.len()));
        }
        if x.windows(2).any(|w| w[1] <= w[0]) {
            return Err(SplineError::NotIncreasing);
        }
        if x.iter().chain(y.iter()).any(|v| !v.is_finite()) {
            return Err(SplineError::NonFinite);
        }

        let m = solve_second_derivatives(&x, &y);
        Ok(Self { x, y, m })
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.x.len()
    }

    /// True when the spline has no nodes (cannot occur for a constructed spline).
    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    /// Evaluate the spline at `xq`.
    pub fn value(&self, xq: f64) -> f64 {
        let i = self.segment(xq);
        let h = self.x[i + 1] - self.x[i];
        let a = (self.x[i + 1] - xq) / h;
        let b = (xq - self.x[i]) / h;
        a * self.y[i]
            + b * self.y[i + 1]
            + ((a * a * a - a) * self.m[i] + (b * b * b - b) * self.m[i + 1]) * h * h / 6.0
    }

    /// Segment index for `xq`, clamped to the boundary segments so that
    /// out-of-range queries extrapolate with the end polynomials.
    fn segment(&self, xq: f64) -> usize {
        let n = self.x.len();
        if xq <= self.x[0] {
            return 0;
        }
        if xq >= self.x[n - 1] {
            return n - 2;
        }
        let idx = self.x.partition_point(|v| *v <= xq);
        idx.clamp(1, n - 1) - 1
    }
}

/// Solve the tridiagonal system for node second derivatives with natural
/// boundary conditions (Thomas algorithm).
fn solve_second_derivatives(x: &[f64], y: &[f64]) -> Vec<f64> {
    let n = x.len();
    let mut m = vec![0.0; n];
    if n == 2 {
        return m;
    }

    // Interior equations: (h[i-1]/6) m[i-1] + ((h[i-1]+h[i])/3) m[i]
    //                   + (h[i]/6) m[i+1] = d[i], with m[0] = m[n-1] = 0.
    let mut diag = vec![0.0; n];
    let mut rhs = vec![0.0; n];
    for i in 1..n - 1 {
        let h_prev = x[i] - x[i - 1];
        let h_next = x[i + 1] - x[i];
        diag[i] = (h_prev + h_next) / 3.0;
        rhs[i] = (y[i + 1] - y[i]) / h_next - (y[i] - y[i - 1]) / h_prev;
    }

    // Forward elimination.
    let mut upper = vec![0.0; n];
    for i in 1..n - 1 {
        upper[i] = (x[i + 1] - x[i]) / 6.0;
    }
    for i in 2..n - 1 {
        let lower = (x[i] - x[i - 1]) / 6.0;
        let factor = lower / diag[i - 1];
        diag[i] -= factor * upper[i - 1];
        rhs[i] -= factor * rhs[i - 1];
    }

    // Back substitution.
    for i in (1..n - 1).rev() {
        m[i] = (rhs[i] - upper[i] * m[i + 1]) / diag[i];
    }
    m
}

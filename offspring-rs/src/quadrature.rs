//! Gaussian quadrature rules for the Poisson mixture likelihoods, computed
//! with the Golub-Welsch algorithm: nodes are the eigenvalues of the
//! symmetric tridiagonal Jacobi matrix of the orthogonal-polynomial
//! recurrence, weights come from the first components of its eigenvectors.

use nalgebra::{DMatrix, linalg::SymmetricEigen};

pub struct QuadratureRule {
    pub nodes: Vec<f64>,
    pub weights: Vec<f64>,
}

fn golub_welsch(diag: &[f64], offdiag: &[f64], moment0: f64) -> QuadratureRule {
    let n = diag.len();
    let mut jacobi = DMatrix::zeros(n, n);
    for (i, &d) in diag.iter().enumerate() {
        jacobi[(i, i)] = d;
    }
    for (i, &b) in offdiag.iter().enumerate() {
        jacobi[(i, i + 1)] = b;
        jacobi[(i + 1, i)] = b;
    }
    let eigen = SymmetricEigen::new(jacobi);
    let mut rule: Vec<(f64, f64)> = (0..n)
        .map(|j| {
            let first = eigen.eigenvectors[(0, j)];
            (eigen.eigenvalues[j], moment0 * first * first)
        })
        .collect();
    rule.sort_by(|a, b| a.0.total_cmp(&b.0));
    QuadratureRule {
        nodes: rule.iter().map(|r| r.0).collect(),
        weights: rule.iter().map(|r| r.1).collect(),
    }
}

/// Gauss-Hermite rule: integrates f(t)·exp(-t²) over the real line.
pub fn gauss_hermite(n: usize) -> QuadratureRule {
    let diag = vec![0.0; n];
    let offdiag: Vec<f64> = (1..n).map(|i| (i as f64 / 2.0).sqrt()).collect();
    golub_welsch(&diag, &offdiag, std::f64::consts::PI.sqrt())
}

/// Gauss-Laguerre rule: integrates f(u)·exp(-u) over [0, ∞).
pub fn gauss_laguerre(n: usize) -> QuadratureRule {
    let diag: Vec<f64> = (0..n).map(|i| 2.0 * i as f64 + 1.0).collect();
    let offdiag: Vec<f64> = (1..n).map(|i| i as f64).collect();
    golub_welsch(&diag, &offdiag, 1.0)
}

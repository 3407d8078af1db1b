//! Small dense numerical kernels shared by the model fits: a Nelder-Mead
//! simplex minimizer and observed-information standard errors from a
//! central-difference Hessian.

use nalgebra::DMatrix;

pub struct NelderMead {
    pub max_iters: usize,
    pub tol: f64,
    pub initial_step: f64,
}

impl Default for NelderMead {
    fn default() -> Self {
        Self {
            max_iters: 500,
            tol: 1e-10,
            initial_step: 0.5,
        }
    }
}

pub struct Minimum {
    pub point: Vec<f64>,
    pub value: f64,
}

impl NelderMead {
    /// Minimizes `f` starting from `x0`. Returns `None` when the simplex
    /// fails to collapse within `max_iters`.
    pub fn minimize<F>(&self, f: F, x0: &[f64]) -> Option<Minimum>
    where
        F: Fn(&[f64]) -> f64,
    {
        let dim = x0.len();
        let mut simplex: Vec<Vec<f64>> = Vec::with_capacity(dim + 1);
        simplex.push(x0.to_vec());
        for i in 0..dim {
            let mut v = x0.to_vec();
            v[i] += self.initial_step;
            simplex.push(v);
        }
        let mut values: Vec<f64> = simplex.iter().map(|v| f(v)).collect();

        for _ in 0..self.max_iters {
            // Order best to worst.
            let mut order: Vec<usize> = (0..simplex.len()).collect();
            order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));
            simplex = order.iter().map(|&i| simplex[i].clone()).collect();
            values = order.iter().map(|&i| values[i]).collect();

            let best = values[0];
            let worst = values[dim];
            if (worst - best).abs() <= self.tol * (1.0 + best.abs()) && best.is_finite() {
                return Some(Minimum {
                    point: simplex[0].clone(),
                    value: best,
                });
            }

            // Centroid of all but the worst vertex.
            let mut centroid = vec![0.0; dim];
            for v in simplex.iter().take(dim) {
                for (c, &x) in centroid.iter_mut().zip(v) {
                    *c += x / dim as f64;
                }
            }

            let reflect = |scale: f64| -> Vec<f64> {
                centroid
                    .iter()
                    .zip(&simplex[dim])
                    .map(|(&c, &w)| c + scale * (c - w))
                    .collect()
            };

            let xr = reflect(1.0);
            let fr = f(&xr);
            if fr < values[0] {
                // Try expanding past the reflected point.
                let xe = reflect(2.0);
                let fe = f(&xe);
                if fe < fr {
                    simplex[dim] = xe;
                    values[dim] = fe;
                } else {
                    simplex[dim] = xr;
                    values[dim] = fr;
                }
            } else if fr < values[dim - 1] {
                simplex[dim] = xr;
                values[dim] = fr;
            } else {
                let xc = reflect(-0.5);
                let fc = f(&xc);
                if fc < values[dim] {
                    simplex[dim] = xc;
                    values[dim] = fc;
                } else {
                    // Shrink toward the best vertex.
                    for i in 1..=dim {
                        let shrunk: Vec<f64> = simplex[0]
                            .iter()
                            .zip(&simplex[i])
                            .map(|(&b, &x)| b + 0.5 * (x - b))
                            .collect();
                        values[i] = f(&shrunk);
                        simplex[i] = shrunk;
                    }
                }
            }
        }
        None
    }
}

/// Central-difference Hessian of `f` at `x`.
pub fn hessian<F>(f: F, x: &[f64]) -> DMatrix<f64>
where
    F: Fn(&[f64]) -> f64,
{
    let dim = x.len();
    let step: Vec<f64> = x.iter().map(|&xi| 1e-4 * xi.abs().max(1e-2)).collect();
    let mut h = DMatrix::zeros(dim, dim);
    let fx = f(x);
    for i in 0..dim {
        let mut up = x.to_vec();
        let mut down = x.to_vec();
        up[i] += step[i];
        down[i] -= step[i];
        h[(i, i)] = (f(&up) - 2.0 * fx + f(&down)) / (step[i] * step[i]);
    }
    for i in 0..dim {
        for j in (i + 1)..dim {
            let mut pp = x.to_vec();
            let mut pm = x.to_vec();
            let mut mp = x.to_vec();
            let mut mm = x.to_vec();
            pp[i] += step[i];
            pp[j] += step[j];
            pm[i] += step[i];
            pm[j] -= step[j];
            mp[i] -= step[i];
            mp[j] += step[j];
            mm[i] -= step[i];
            mm[j] -= step[j];
            let v = (f(&pp) - f(&pm) - f(&mp) + f(&mm)) / (4.0 * step[i] * step[j]);
            h[(i, j)] = v;
            h[(j, i)] = v;
        }
    }
    h
}

/// Standard errors from the observed information matrix: the square roots of
/// the diagonal of the inverse Hessian of the negative log-likelihood.
/// `None` when the Hessian is singular or yields a non-positive variance.
pub fn std_errors_from_information(information: &DMatrix<f64>) -> Option<(Vec<f64>, DMatrix<f64>)> {
    let cov = information.clone().try_inverse()?;
    let mut errs = Vec::with_capacity(cov.nrows());
    for i in 0..cov.nrows() {
        let var = cov[(i, i)];
        if !var.is_finite() || var < 0.0 {
            return None;
        }
        errs.push(var.sqrt());
    }
    Some((errs, cov))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimizes_quadratic() {
        let f = |x: &[f64]| (x[0] - 2.0).powi(2) + (x[1] + 1.0).powi(2) + 3.0;
        let min = NelderMead::default().minimize(f, &[0.0, 0.0]).unwrap();
        assert!((min.point[0] - 2.0).abs() < 1e-4);
        assert!((min.point[1] + 1.0).abs() < 1e-4);
        assert!((min.value - 3.0).abs() < 1e-8);
    }

    #[test]
    fn test_minimizes_rosenbrock() {
        let f = |x: &[f64]| (1.0 - x[0]).powi(2) + 100.0 * (x[1] - x[0] * x[0]).powi(2);
        let nm = NelderMead {
            max_iters: 5000,
            ..NelderMead::default()
        };
        let min = nm.minimize(f, &[-1.2, 1.0]).unwrap();
        assert!((min.point[0] - 1.0).abs() < 1e-3);
        assert!((min.point[1] - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_hessian_of_quadratic() {
        // f = x^2 + 3xy + 5y^2 has constant Hessian [[2, 3], [3, 10]].
        let f = |x: &[f64]| x[0] * x[0] + 3.0 * x[0] * x[1] + 5.0 * x[1] * x[1];
        let h = hessian(f, &[0.7, -0.3]);
        assert!((h[(0, 0)] - 2.0).abs() < 1e-3);
        assert!((h[(0, 1)] - 3.0).abs() < 1e-3);
        assert!((h[(1, 1)] - 10.0).abs() < 1e-3);
    }

    #[test]
    fn test_std_errors_reject_singular() {
        let singular = DMatrix::from_row_slice(2, 2, &[1.0, 1.0, 1.0, 1.0]);
        assert!(std_errors_from_information(&singular).is_none());
    }

    #[test]
    fn test_std_errors_diagonal() {
        let info = DMatrix::from_row_slice(2, 2, &[4.0, 0.0, 0.0, 25.0]);
        let (errs, _) = std_errors_from_information(&info).unwrap();
        assert!((errs[0] - 0.5).abs() < 1e-12);
        assert!((errs[1] - 0.2).abs() < 1e-12);
    }
}

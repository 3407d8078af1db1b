//! Negative-binomial maximum likelihood in the ecological (mu, k)
//! parameterization: mean mu and dispersion k, variance mu + mu²/k.

use statrs::function::gamma::ln_gamma;

use crate::error::{Error, Result};
use crate::models::{
    FitResult, ModelFamily, OffspringParams, ParameterEstimate, frequency_table, ln_factorial,
};
use crate::optim::{NelderMead, hessian, std_errors_from_information};
use crate::sample::OffspringSample;

/// Above this the dispersion is indistinguishable from Poisson and the
/// likelihood surface is flat in k; the fit is reported as non-converged.
const K_MAX: f64 = 1e4;
const K_MIN: f64 = 1e-6;

pub(crate) fn log_likelihood(table: &[(u64, u64)], mu: f64, k: f64) -> f64 {
    let ln_k_frac = (k / (k + mu)).ln();
    let ln_mu_frac = (mu / (k + mu)).ln();
    table
        .iter()
        .map(|&(x, freq)| {
            let ll = ln_gamma(x as f64 + k) - ln_gamma(k) - ln_factorial(x)
                + k * ln_k_frac
                + x as f64 * ln_mu_frac;
            freq as f64 * ll
        })
        .sum()
}

fn fail(reason: &str) -> Error {
    Error::FitConvergence {
        family: ModelFamily::NegBinomial,
        reason: reason.to_string(),
    }
}

pub fn fit(sample: &OffspringSample) -> Result<FitResult> {
    let mean = sample.mean();
    if mean == 0.0 {
        return Err(fail("no secondary transmissions observed"));
    }
    let table = frequency_table(sample);

    // Moment estimate of k seeds the optimizer; underdispersed samples get
    // a large seed and run into the dispersion bound below.
    let variance = sample.variance();
    let k_seed = if variance > mean {
        (mean * mean / (variance - mean)).clamp(1e-2, 1e2)
    } else {
        1e2
    };

    let objective = |theta: &[f64]| {
        let mu = theta[0].exp();
        let k = theta[1].exp();
        if !mu.is_finite() || !k.is_finite() || k <= 0.0 {
            return f64::MAX;
        }
        let ll = log_likelihood(&table, mu, k);
        if ll.is_finite() { -ll } else { f64::MAX }
    };

    let start = [mean.ln(), k_seed.ln()];
    let minimum = NelderMead::default()
        .minimize(objective, &start)
        .ok_or_else(|| fail("optimizer did not converge"))?;

    let mu = minimum.point[0].exp();
    let k = minimum.point[1].exp();
    if !(K_MIN..=K_MAX).contains(&k) {
        return Err(fail("dispersion estimate diverged"));
    }

    let neg_ll = |theta: &[f64]| -log_likelihood(&table, theta[0], theta[1]);
    let information = hessian(neg_ll, &[mu, k]);
    let (std_errs, _cov) = std_errors_from_information(&information)
        .ok_or_else(|| fail("observed information matrix is singular"))?;

    Ok(FitResult {
        family: ModelFamily::NegBinomial,
        estimates: vec![
            ParameterEstimate {
                name: "mu",
                value: mu,
                std_err: std_errs[0],
            },
            ParameterEstimate {
                name: "k",
                value: k,
                std_err: std_errs[1],
            },
        ],
        log_likelihood: -minimum.value,
        n_obs: sample.len(),
        offspring: OffspringParams {
            r: mu,
            r_std_err: std_errs[0],
            k,
        },
    })
}
